//! Adoration schedule: bookable slots with capacity, and the time-adjacency
//! neighbor lists shown to each worker.

pub mod adjacency;
pub mod slots;

use serde::{Deserialize, Serialize};

pub use adjacency::{AdorationAssignment, for_worker_day, resolve_adjacency};
pub use slots::{
    BulkFailure, BulkOutcome, BulkSlotRequest, SlotEdit, UserSlotView, bulk_delete,
    bulk_update_location, cancel_signup, create_slots_bulk, delete_slot, edit_slot, signup,
    slots_for_day_admin, slots_for_day_user,
};

/// Default neighbor window, in minutes.
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

/// How neighbor lists collapse repeated workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborDedup {
    /// Two entries with the same first and last name are one person.
    #[default]
    ByName,
    /// Only the same worker ID is collapsed.
    ByIdentity,
}

/// Parameters of neighbor resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyConfig {
    /// A slot ending (or starting) at most this many minutes away from
    /// another counts as adjacent.
    pub window_minutes: i64,
    pub dedup: NeighborDedup,
}

impl Default for AdjacencyConfig {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_WINDOW_MINUTES,
            dedup: NeighborDedup::default(),
        }
    }
}
