//! Infrastructure containers backing the scheduler.

pub mod queue;

pub use queue::{PrioritySelector, Sequence};
