//! Shared utilities.

pub mod id;
pub mod telemetry;

pub use id::random_id;
pub use telemetry::init_tracing;
