//! Tests for configuration validation

use prometheus_task_wiring::config::{
    SchedulerSettings, TaskSchedulerConfig, TaskSchedulerType, UnhandledTaskCapacity,
};
use prometheus_task_wiring::core::SchedulerError;
use std::time::Duration;

#[test]
fn test_scheduler_config_defaults() {
    let config = TaskSchedulerConfig::new("ingest");
    assert_eq!(config.settings.scheduler_type, TaskSchedulerType::Sequential);
    assert_eq!(config.settings.unhandled_task_capacity, UnhandledTaskCapacity::Unlimited);
    assert_eq!(config.settings.sleep_duration(), Duration::from_micros(100));
    assert!(!config.settings.flushing_enabled);
    assert!(!config.settings.squelching_enabled);
    assert!(!config.settings.unhandled_task_metric_enabled);
    assert!(!config.settings.busy_fraction_metric_enabled);
    assert!(!config.settings.external_back_pressure);
    assert_eq!(config.hyperlink_or_name(), "ingest");
    assert!(config.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_name() {
    let config = TaskSchedulerConfig::new("in-gest");
    assert_eq!(config.validate(), Err(SchedulerError::InvalidName("in-gest".into())));
}

#[test]
fn test_scheduler_config_zero_capacity() {
    let config = TaskSchedulerConfig::parse("ingest", "SEQUENTIAL CAPACITY(0)").unwrap();
    assert!(matches!(config.validate(), Err(SchedulerError::InvalidConfig { .. })));
}

#[test]
fn test_scheduler_config_zero_sleep() {
    let config = TaskSchedulerConfig::parse("ingest", "SLEEP_MICROS(0)").unwrap();
    assert!(matches!(config.validate(), Err(SchedulerError::InvalidConfig { .. })));
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "name": "ingest",
        "type": "SEQUENTIAL_THREAD",
        "unhandled_task_capacity": {"bounded": 64},
        "flushing_enabled": true,
        "hyperlink": "ingest.md"
    }"#;
    let config = TaskSchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.name, "ingest");
    assert_eq!(config.settings.scheduler_type, TaskSchedulerType::SequentialThread);
    assert_eq!(config.settings.unhandled_task_capacity, UnhandledTaskCapacity::Bounded(64));
    assert!(config.settings.flushing_enabled);
    assert_eq!(config.settings.sleep_micros, 100);
    assert_eq!(config.hyperlink_or_name(), "ingest.md");
}

#[test]
fn test_scheduler_config_from_json_rejects_busy_fraction_on_concurrent() {
    let json = r#"{"name": "fanout", "type": "CONCURRENT", "busy_fraction_metric_enabled": true}"#;
    let err = TaskSchedulerConfig::from_json_str(json).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig { ref name, .. } if name == "fanout"));
}

#[test]
fn test_scheduler_config_from_json_parse_error() {
    let err = TaskSchedulerConfig::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, SchedulerError::Parse(_)));
}

#[test]
fn test_settings_string_with_every_flag() {
    let text = "CONCURRENT CAPACITY(10) FLUSHABLE SQUELCHABLE UNHANDLED_TASK_METRIC EXTERNAL_BACK_PRESSURE";
    let settings: SchedulerSettings = text.parse().unwrap();
    assert_eq!(
        settings,
        SchedulerSettings {
            scheduler_type: TaskSchedulerType::Concurrent,
            unhandled_task_capacity: UnhandledTaskCapacity::Bounded(10),
            sleep_micros: 100,
            flushing_enabled: true,
            squelching_enabled: true,
            unhandled_task_metric_enabled: true,
            busy_fraction_metric_enabled: false,
            external_back_pressure: true,
        }
    );
    assert_eq!(settings.to_string(), text);
}

#[test]
fn test_scheduler_type_names() {
    for scheduler_type in TaskSchedulerType::ALL {
        let parsed: TaskSchedulerType = scheduler_type.to_string().parse().unwrap();
        assert_eq!(parsed, scheduler_type);
    }
    assert!(TaskSchedulerType::Direct.is_direct());
    assert!(TaskSchedulerType::DirectThreadsafe.is_direct());
    assert!(!TaskSchedulerType::SequentialThread.is_direct());
    assert!(!TaskSchedulerType::Concurrent.supports_busy_fraction());
}
