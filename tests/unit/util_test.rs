//! Tests for utility functions

use prometheus_job_scheduler::core::JobId;
use prometheus_job_scheduler::util::{init_tracing, random_id};

#[test]
fn test_random_id_is_uuid() {
    let id = random_id();
    assert_eq!(id.len(), 36);
    assert_eq!(id.matches('-').count(), 4);
}

#[test]
fn test_random_job_ids_differ() {
    let ids: std::collections::HashSet<JobId> = (0..100).map(|_| JobId::random()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn test_job_id_serializes_as_string() {
    let id = JobId::from("nightly-report");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"nightly-report\"");
    let back: JobId = serde_json::from_str("\"nightly-report\"").unwrap();
    assert_eq!(back, id);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized twice without panicking");
}
