//! Tests for listener registration through the scheduler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use prometheus_job_scheduler::config::SchedulerConfig;
use prometheus_job_scheduler::core::{
    CancelToken, EventBus, EventKind, JobError, JobScheduler, SchedulerEvent, SubmitOptions,
};

async fn noop(_token: CancelToken) -> Result<(), JobError> {
    Ok(())
}

fn counting(count: &Arc<AtomicUsize>) -> impl Fn(&SchedulerEvent) + Send + Sync + 'static {
    let count = Arc::clone(count);
    move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_off_stops_delivery() {
    let s = JobScheduler::new(SchedulerConfig::new().with_concurrency(1)).unwrap();
    let added = Arc::new(AtomicUsize::new(0));
    let id = s.on(EventKind::Added, counting(&added));

    s.submit(noop, SubmitOptions::new());
    assert!(s.off(EventKind::Added, id));
    assert!(!s.off(EventKind::Added, id));
    s.submit(noop, SubmitOptions::new());
    s.wait_idle().await;

    assert_eq!(added.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remove_all_listeners_for_one_kind() {
    let s = JobScheduler::new(SchedulerConfig::new().with_concurrency(1)).unwrap();
    let added = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    s.on(EventKind::Added, counting(&added));
    s.on(EventKind::Completed, counting(&completed));

    s.remove_all_listeners(Some(EventKind::Added));
    s.submit(noop, SubmitOptions::new());
    s.wait_idle().await;

    assert_eq!(added.load(Ordering::SeqCst), 0);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_listener_does_not_stall_dispatch() {
    let s = JobScheduler::new(SchedulerConfig::new().with_concurrency(1)).unwrap();
    let completed = Arc::new(AtomicUsize::new(0));
    s.on(EventKind::Next, |_| panic!("listener bug"));
    s.on(EventKind::Completed, counting(&completed));

    for _ in 0..3 {
        s.submit(noop, SubmitOptions::new());
    }
    s.wait_idle().await;
    assert_eq!(completed.load(Ordering::SeqCst), 3);
}

#[test]
fn test_bus_delivers_in_registration_order() {
    let bus = EventBus::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for n in 0..3 {
        let order = Arc::clone(&order);
        bus.on(EventKind::Resumed, move |_| order.lock().push(n));
    }
    bus.emit(&SchedulerEvent::Resumed);
    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn test_event_accessors() {
    let id = "job-1".into();
    let event = SchedulerEvent::Added { id };
    assert_eq!(event.kind(), EventKind::Added);
    assert_eq!(event.job_id().map(|id| id.as_str()), Some("job-1"));
    assert!(SchedulerEvent::Next { id: None }.job_id().is_none());
    assert!(SchedulerEvent::Idle.job_id().is_none());
}
