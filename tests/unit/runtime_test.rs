//! Tests for execution pool adapters

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_task_wiring::config::{ModelConfig, TaskSchedulerType};
use prometheus_task_wiring::core::{NoOpMetricsRegistry, SchedulerError, Task, WiringModel};
use prometheus_task_wiring::runtime::{TaskPool, TokioSpawner, WorkerThreadPool};
use prometheus_task_wiring::util::SystemClock;

use crate::common::assert_eventually;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_execute() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner
        .execute(Box::new(move || {
            tx.send(123).unwrap();
        }))
        .unwrap();

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_rejects_after_shutdown() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());
    spawner.shutdown();
    let err = spawner.execute(Box::new(|| {})).unwrap_err();
    assert!(matches!(err, SchedulerError::PoolShutdown(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sequential_scheduler_on_tokio() {
    let spawner = Arc::new(TokioSpawner::new(tokio::runtime::Handle::current()));
    let model = WiringModel::from_parts(
        ModelConfig::default(),
        spawner,
        Arc::new(NoOpMetricsRegistry),
        Arc::new(SystemClock),
    );
    let scheduler = model
        .scheduler_builder("on_tokio")
        .with_type(TaskSchedulerType::Sequential)
        .with_flushing_enabled(true)
        .build::<()>()
        .unwrap();

    let handled = Arc::new(AtomicUsize::new(0));
    for _ in 0..20 {
        let handled = Arc::clone(&handled);
        scheduler.put(Task::from_fn(move || {
            handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    let flusher = scheduler.clone();
    tokio::task::spawn_blocking(move || flusher.flush())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 20);
}

#[test]
fn test_worker_pool_from_config() {
    let config = ModelConfig {
        pool_threads: 3,
        pool_thread_prefix: "cfg-pool".into(),
    };
    let pool = WorkerThreadPool::from_config(&config).unwrap();
    assert_eq!(pool.worker_count(), 3);

    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let ran = Arc::clone(&ran);
        pool.execute(Box::new(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
    }
    assert_eventually(Duration::from_secs(5), "all jobs run", || {
        ran.load(Ordering::SeqCst) == 10
    });
    pool.shutdown();
}
