//! Unit tests for individual components

mod config_test;
mod error_test;
mod events_test;
mod runtime_test;
mod selector_test;
mod util_test;
