//! Tests for the wiring model registry

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus_task_wiring::config::{TaskSchedulerConfig, TaskSchedulerType};
use prometheus_task_wiring::core::{SchedulerError, SchedulerHandle, Task};

use crate::common::test_model;

#[test]
fn test_registration_order_and_hyperlinks() {
    let (model, _) = test_model(2);
    for name in ["sink", "transform", "source"] {
        model
            .scheduler_builder(name)
            .with_hyperlink(format!("components/{name}.md"))
            .build::<()>()
            .unwrap();
    }
    model.scheduler_builder("plain").build::<()>().unwrap();

    assert_eq!(model.scheduler_names(), vec!["sink", "transform", "source", "plain"]);
    assert_eq!(model.hyperlink("transform").as_deref(), Some("components/transform.md"));
    assert_eq!(model.hyperlink("plain").as_deref(), Some("plain"));
    assert_eq!(model.hyperlink("missing"), None);
    assert_eq!(model.len(), 4);
    assert!(!model.is_empty());
}

#[test]
fn test_duplicate_name_rejected() {
    let (model, _) = test_model(2);
    let first = model.scheduler_builder("ingest").build::<u32>().unwrap();
    let err = model.scheduler_builder("ingest").build::<u32>().unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateName("ingest".into()));
    assert_eq!(model.len(), 1);

    let err = model.register_scheduler(first.handle(), "again").unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateName("ingest".into()));
}

#[test]
fn test_invalid_name_registers_nothing() {
    let (model, _) = test_model(2);
    let err = model.scheduler_builder("no spaces").build::<()>().unwrap_err();
    assert_eq!(err, SchedulerError::InvalidName("no spaces".into()));
    assert!(model.is_empty());
}

#[test]
fn test_independent_models_do_not_share_names() {
    let (first, _) = test_model(2);
    let (second, _) = test_model(2);
    first.scheduler_builder("ingest").build::<()>().unwrap();
    second.scheduler_builder("ingest").build::<()>().unwrap();
    assert!(first.contains("ingest") && second.contains("ingest"));
}

#[test]
fn test_build_scheduler_from_config() {
    let (model, _) = test_model(2);
    let config = TaskSchedulerConfig::parse("parsed", "SEQUENTIAL_THREAD CAPACITY(4) FLUSHABLE").unwrap();
    let scheduler = model.build_scheduler::<()>(config).unwrap();
    assert_eq!(scheduler.scheduler_type(), TaskSchedulerType::SequentialThread);
    assert!(scheduler.is_insertion_blocking());
    scheduler.flush().unwrap();
    model.stop();
}

#[test]
fn test_flush_all_visits_flushable_in_registration_order() {
    let (model, _) = test_model(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["downstream", "upstream"] {
        model
            .register_scheduler(
                Arc::new(RecordingHandle {
                    name,
                    order: Arc::clone(&order),
                }),
                name,
            )
            .unwrap();
    }
    model.scheduler_builder("unflushable").build::<()>().unwrap();

    model.flush_all().unwrap();
    assert_eq!(*order.lock(), vec!["downstream", "upstream"]);
}

#[test]
fn test_flush_all_drains_real_schedulers() {
    let (model, _) = test_model(2);
    let handled = Arc::new(AtomicUsize::new(0));
    let scheduler = model
        .scheduler_builder("slow")
        .with_type(TaskSchedulerType::Sequential)
        .with_flushing_enabled(true)
        .build::<()>()
        .unwrap();
    for _ in 0..5 {
        let handled = Arc::clone(&handled);
        scheduler.put(Task::from_fn(move || {
            thread::sleep(Duration::from_millis(2));
            handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    model.flush_all().unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 5);
    assert_eq!(model.unprocessed_task_counts(), vec![("slow".to_string(), 0)]);
}

#[test]
fn test_stop_is_idempotent_and_rejects_later_work() {
    let (model, _) = test_model(2);
    let failures = crate::common::FailureLog::default();
    let scheduler = model
        .scheduler_builder("late")
        .with_type(TaskSchedulerType::Concurrent)
        .with_flushing_enabled(true)
        .with_uncaught_exception_handler(failures.handler())
        .build::<()>()
        .unwrap();

    model.stop();
    model.stop();
    assert!(model.is_stopped());

    scheduler.put(Task::from_fn(|| Ok(())));
    assert_eq!(failures.len(), 1);
    assert!(failures.entries()[0].1.starts_with("task rejected"));
    assert_eq!(scheduler.unprocessed_task_count(), 0);
}

struct RecordingHandle {
    name: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl SchedulerHandle for RecordingHandle {
    fn name(&self) -> &str {
        self.name
    }

    fn scheduler_type(&self) -> TaskSchedulerType {
        TaskSchedulerType::Direct
    }

    fn is_flushable(&self) -> bool {
        true
    }

    fn flush(&self) -> Result<(), SchedulerError> {
        self.order.lock().push(self.name);
        Ok(())
    }

    fn unprocessed_task_count(&self) -> u64 {
        0
    }

    fn stop(&self) {}
}
