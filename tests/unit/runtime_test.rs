//! Tests for tokio spawner utilities

use std::time::Duration;

use prometheus_job_scheduler::config::SchedulerConfig;
use prometheus_job_scheduler::core::{
    CancelToken, JobError, JobScheduler, SchedulerError, SubmitOptions,
};
use prometheus_job_scheduler::runtime::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(start_paused = true)]
async fn test_spawn_timer_fires_once() {
    let spawner = TokioSpawner::current().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    spawner.spawn_timer(Duration::from_millis(30), move || {
        let _ = tx.send(());
    });
    rx.await.expect("timer fired");
}

#[tokio::test(start_paused = true)]
async fn test_aborted_timer_never_fires() {
    let spawner = TokioSpawner::current().unwrap();
    let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();

    let timer = spawner.spawn_timer(Duration::from_millis(30), move || {
        let _ = tx.send(());
    });
    timer.abort();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_no_runtime() {
    assert!(matches!(
        TokioSpawner::current(),
        Err(SchedulerError::NoRuntime)
    ));
    assert!(matches!(
        JobScheduler::new(SchedulerConfig::new()),
        Err(SchedulerError::NoRuntime)
    ));
}

#[test]
fn test_scheduler_on_owned_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let spawner = TokioSpawner::from_runtime(&runtime);
    let scheduler =
        JobScheduler::with_spawner(SchedulerConfig::new().with_concurrency(2), spawner).unwrap();

    for i in 0..4 {
        scheduler.submit(
            |_token: CancelToken| async move { Ok::<(), JobError>(()) },
            SubmitOptions::new().with_priority(i),
        );
    }
    runtime.block_on(scheduler.wait_idle());
    assert_eq!(scheduler.stats().completed, 4);
}
