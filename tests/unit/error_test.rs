//! Tests for error types

use std::time::Duration;

use prometheus_job_scheduler::core::{
    CancelReason, JobError, JobId, SchedulerError,
};

#[test]
fn test_scheduler_error_display() {
    assert_eq!(SchedulerError::Destroyed.to_string(), "scheduler destroyed");
    assert_eq!(
        SchedulerError::DuplicateId(JobId::from("job-7")).to_string(),
        "duplicate job id: job-7"
    );
    assert!(SchedulerError::InvalidConfig("concurrency must be greater than 0".into())
        .to_string()
        .contains("concurrency"));
}

#[test]
fn test_job_error_display() {
    assert_eq!(
        JobError::TimedOut(Duration::from_millis(20)).to_string(),
        "job timed out after 20ms"
    );
    assert_eq!(
        JobError::Panicked("index out of bounds".into()).to_string(),
        "job panicked: index out of bounds"
    );
    let failed: JobError = anyhow::anyhow!("disk full").into();
    assert_eq!(failed.to_string(), "disk full");
}

#[test]
fn test_cancellation_classification() {
    assert!(JobError::Destroyed.is_cancellation());
    assert!(JobError::Cancelled("caller".into()).is_cancellation());
    assert!(!JobError::Panicked("x".into()).is_cancellation());
    assert!(!JobError::from(anyhow::anyhow!("x")).is_cancellation());
}

#[test]
fn test_cancel_reason_maps_to_job_error() {
    assert!(matches!(
        JobError::from(CancelReason::Aborted(None)),
        JobError::Aborted(None)
    ));
    assert!(matches!(
        JobError::from(CancelReason::External("gone".into())),
        JobError::Cancelled(msg) if msg == "gone"
    ));
    assert!(matches!(
        JobError::from(CancelReason::Destroyed),
        JobError::Destroyed
    ));
}
