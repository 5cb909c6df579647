//! Tests for scheduler metrics published through the registry

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::bounded;
use prometheus_task_wiring::config::TaskSchedulerType;
use prometheus_task_wiring::core::{MetricsRegistry, SchedulerError, Task};
use prometheus_task_wiring::util::{Clock, ManualClock};

use crate::common::{assert_eventually, test_model, test_model_with_clock};

#[test]
fn test_unhandled_task_gauge_tracks_queue() {
    let (model, metrics) = test_model(2);
    let scheduler = model
        .scheduler_builder("gauge")
        .with_type(TaskSchedulerType::SequentialThread)
        .with_unhandled_task_metric_enabled(true)
        .build::<()>()
        .unwrap();

    assert_eq!(metrics.sample("gauge_unhandled_task_count"), Some(0.0));

    let (release, gate) = bounded::<()>(0);
    for _ in 0..3 {
        let gate = gate.clone();
        scheduler.put(Task::from_fn(move || {
            gate.recv().ok();
            Ok(())
        }));
    }
    assert_eq!(metrics.sample("gauge_unhandled_task_count"), Some(3.0));

    for _ in 0..3 {
        release.send(()).unwrap();
    }
    assert_eventually(Duration::from_secs(5), "gauge drains", || {
        metrics.sample("gauge_unhandled_task_count") == Some(0.0)
    });
    model.stop();
}

#[test]
fn test_busy_fraction_uses_model_clock() {
    let clock = Arc::new(ManualClock::new());
    let (model, metrics) = test_model_with_clock(2, Arc::clone(&clock) as Arc<dyn Clock>);
    let scheduler = model
        .scheduler_builder("timed")
        .with_type(TaskSchedulerType::Direct)
        .with_busy_fraction_metric_enabled(true)
        .build::<()>()
        .unwrap();

    clock.advance(Duration::from_millis(600));
    let handler_clock = Arc::clone(&clock);
    scheduler.put(Task::from_fn(move || {
        handler_clock.advance(Duration::from_millis(400));
        Ok(())
    }));

    let fraction = metrics.sample("timed_busy_fraction").unwrap();
    assert!((fraction - 0.4).abs() < 1e-9, "fraction = {fraction}");

    clock.advance(Duration::from_millis(100));
    assert_eq!(metrics.sample("timed_busy_fraction"), Some(0.0));
}

#[test]
fn test_disabled_metrics_are_not_registered() {
    let (model, metrics) = test_model(2);
    let _scheduler = model.scheduler_builder("quiet").build::<()>().unwrap();
    assert!(metrics.names().is_empty());
}

#[test]
fn test_metric_name_collision_registers_nothing() {
    let (model, metrics) = test_model(2);
    metrics
        .register_gauge("clash_unhandled_task_count", "pre-existing", Box::new(|| 0.0))
        .unwrap();

    let err = model
        .scheduler_builder("clash")
        .with_unhandled_task_metric_enabled(true)
        .build::<()>()
        .unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateMetric("clash_unhandled_task_count".into()));
    assert!(!model.contains("clash"));
    assert_eq!(metrics.names(), vec!["clash_unhandled_task_count".to_owned()]);
}

#[test]
fn test_busy_fraction_collision_removes_earlier_gauge() {
    let (model, metrics) = test_model(2);
    metrics
        .register_gauge("late_busy_fraction", "pre-existing", Box::new(|| 0.0))
        .unwrap();

    let err = model
        .scheduler_builder("late")
        .with_type(TaskSchedulerType::Sequential)
        .with_unhandled_task_metric_enabled(true)
        .with_busy_fraction_metric_enabled(true)
        .build::<()>()
        .unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateMetric("late_busy_fraction".into()));
    assert!(!model.contains("late"));
    assert_eq!(metrics.names(), vec!["late_busy_fraction".to_owned()]);

    // The unhandled-count gauge name is free again.
    let scheduler = model
        .scheduler_builder("late")
        .with_type(TaskSchedulerType::Sequential)
        .with_unhandled_task_metric_enabled(true)
        .build::<()>()
        .unwrap();
    assert_eq!(scheduler.name(), "late");
    assert_eq!(metrics.sample("late_unhandled_task_count"), Some(0.0));
}
