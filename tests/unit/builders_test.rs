//! Tests for the scheduler builder

use std::sync::Arc;
use std::time::Duration;

use prometheus_task_wiring::config::{SchedulerSettings, TaskSchedulerType};
use prometheus_task_wiring::core::{
    BackpressureObjectCounter, ObjectCounter, SchedulerError, Task,
};

use crate::common::test_model;

#[test]
fn test_busy_fraction_on_concurrent_rejected_before_registration() {
    let (model, metrics) = test_model(2);
    let err = model
        .scheduler_builder("fanout")
        .with_type(TaskSchedulerType::Concurrent)
        .with_busy_fraction_metric_enabled(true)
        .build::<()>()
        .unwrap_err();

    assert!(matches!(err, SchedulerError::InvalidConfig { ref name, .. } if name == "fanout"));
    assert!(model.is_empty());
    assert!(metrics.names().is_empty());
}

#[test]
fn test_busy_fraction_allowed_on_other_types() {
    let (model, metrics) = test_model(2);
    for (i, scheduler_type) in [
        TaskSchedulerType::Sequential,
        TaskSchedulerType::SequentialThread,
        TaskSchedulerType::Direct,
        TaskSchedulerType::DirectThreadsafe,
    ]
    .into_iter()
    .enumerate()
    {
        model
            .scheduler_builder(format!("timed_{i}"))
            .with_type(scheduler_type)
            .with_busy_fraction_metric_enabled(true)
            .build::<()>()
            .unwrap();
    }
    assert_eq!(metrics.names().len(), 4);
    model.stop();
}

#[test]
fn test_flush_requires_flushing_enabled() {
    let (model, _) = test_model(2);
    let scheduler = model.scheduler_builder("no_flush").build::<()>().unwrap();
    assert_eq!(scheduler.flush(), Err(SchedulerError::FlushUnsupported("no_flush".into())));
}

#[test]
fn test_squelch_requires_squelching_enabled() {
    let (model, _) = test_model(2);
    let scheduler = model.scheduler_builder("no_squelch").build::<()>().unwrap();
    assert_eq!(
        scheduler.set_squelched(true),
        Err(SchedulerError::SquelchUnsupported("no_squelch".into()))
    );
    assert!(!scheduler.is_squelched());
}

#[test]
fn test_blocking_insertion_resolution() {
    let (model, _) = test_model(2);
    let cases = [
        ("seq_unlimited", "SEQUENTIAL", false),
        ("seq_bounded", "SEQUENTIAL CAPACITY(5)", true),
        ("direct_bounded", "DIRECT CAPACITY(5)", false),
        ("external", "CONCURRENT EXTERNAL_BACK_PRESSURE", true),
    ];
    for (name, settings, blocking) in cases {
        let settings: SchedulerSettings = settings.parse().unwrap();
        let scheduler = model
            .scheduler_builder(name)
            .configure(settings)
            .build::<()>()
            .unwrap();
        assert_eq!(scheduler.is_insertion_blocking(), blocking, "{name}");
    }
}

#[test]
fn test_direct_ignores_capacity() {
    let (model, _) = test_model(2);
    let scheduler = model
        .scheduler_builder("inline")
        .with_type(TaskSchedulerType::Direct)
        .with_unhandled_task_capacity(1)
        .build::<()>()
        .unwrap();
    for _ in 0..10 {
        assert!(scheduler.offer(Task::from_fn(|| Ok(()))));
    }
}

#[test]
fn test_direct_with_external_counter_can_refuse() {
    let (model, _) = test_model(2);
    let shared = Arc::new(BackpressureObjectCounter::new("shared", 1, Duration::from_micros(50)));
    let scheduler = model
        .scheduler_builder("gated")
        .with_type(TaskSchedulerType::Direct)
        .with_on_ramp(Arc::clone(&shared) as Arc<dyn ObjectCounter>)
        .build::<()>()
        .unwrap();

    assert!(scheduler.offer(Task::from_fn(|| Ok(()))));
    assert_eq!(shared.count(), 1);
    assert!(!scheduler.offer(Task::from_fn(|| Ok(()))));
    shared.off_ramp();
    assert!(scheduler.offer(Task::from_fn(|| Ok(()))));
}

#[test]
fn test_unprocessed_count_zero_without_counter() {
    let (model, _) = test_model(2);
    let scheduler = model
        .scheduler_builder("uncounted")
        .with_type(TaskSchedulerType::Direct)
        .build::<()>()
        .unwrap();
    scheduler.put(Task::from_fn(|| Ok(())));
    assert_eq!(scheduler.unprocessed_task_count(), 0);
}
