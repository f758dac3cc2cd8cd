//! Error taxonomy of the planning engine.

use uuid::Uuid;

/// Kind of record a [`EngineError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Event,
    Plan,
    ActiveJob,
    ProposedJob,
    Ride,
    Car,
    Worker,
    AdorationSlot,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Event => "event",
            Self::Plan => "plan",
            Self::ActiveJob => "active job",
            Self::ProposedJob => "proposed job",
            Self::Ride => "ride",
            Self::Car => "car",
            Self::Worker => "worker",
            Self::AdorationSlot => "adoration slot",
        };
        f.write_str(s)
    }
}

/// Errors returned by engine operations.
///
/// Validation variants are raised before any write, inside the operation's
/// transaction, so a failed call leaves storage untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("proposed job {proposed_job_id} is already scheduled in plan {plan_id}")]
    DuplicateAssignment { proposed_job_id: Uuid, plan_id: Uuid },

    #[error("adoration slot {slot_id} is full ({capacity} of {capacity} places taken)")]
    CapacityExceeded { slot_id: Uuid, capacity: i32 },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },

    #[error("no active event")]
    NoActiveEvent,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
