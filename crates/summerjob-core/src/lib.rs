//! Planning engine for summer job days.
//!
//! Keeps worker, job and ride assignments of a plan consistent, runs the
//! adoration slot schedule, and projects both into each worker's day view.

pub mod adoration;
pub mod assignment;
pub mod context;
pub mod error;
pub mod events;
pub mod my_plan;
pub mod planned;
pub mod plans;
pub mod resync;
pub mod rides;

pub use context::{ActiveEventCache, EventContext};
pub use error::{EngineError, EngineResult, Entity};
