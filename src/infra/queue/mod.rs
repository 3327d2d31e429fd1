//! Pending-job containers.

pub mod priority;
pub mod sequence;

pub use priority::{PriorityEntry, PrioritySelector};
pub use sequence::Sequence;
