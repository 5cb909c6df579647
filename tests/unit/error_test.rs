//! Tests for error types

use prometheus_task_wiring::core::{SchedulerError, TaskFailure};

#[test]
fn test_invalid_name_error() {
    let err = SchedulerError::InvalidName("bad name".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid scheduler name `bad name`: only ASCII letters, digits and underscores are allowed"
    );
}

#[test]
fn test_duplicate_name_error() {
    let err = SchedulerError::DuplicateName("ingest".to_string());
    assert_eq!(format!("{}", err), "scheduler `ingest` is already registered");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig {
        name: "ingest".to_string(),
        reason: "busy fraction metric is not supported by CONCURRENT schedulers".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "invalid configuration for `ingest`: busy fraction metric is not supported by CONCURRENT schedulers"
    );
}

#[test]
fn test_usage_errors() {
    assert_eq!(
        SchedulerError::FlushUnsupported("a".into()).to_string(),
        "scheduler `a` does not support flushing"
    );
    assert_eq!(
        SchedulerError::SquelchUnsupported("a".into()).to_string(),
        "scheduler `a` does not support squelching"
    );
    assert_eq!(
        SchedulerError::PoolShutdown("wiring-pool".into()).to_string(),
        "pool `wiring-pool` has been shut down"
    );
}

#[test]
fn test_task_failure_includes_error_chain() {
    let source = anyhow::anyhow!("disk full").context("writing record 7");
    let failure = TaskFailure::Failed(source);
    assert_eq!(failure.to_string(), "handler returned an error: writing record 7: disk full");
}

#[test]
fn test_task_failure_panicked_and_rejected() {
    assert_eq!(TaskFailure::Panicked("boom".into()).to_string(), "handler panicked: boom");
    assert_eq!(TaskFailure::Rejected("pool gone".into()).to_string(), "task rejected: pool gone");
}
