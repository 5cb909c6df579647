//! Unit tests for individual components

#[path = "../common/mod.rs"]
mod common;

mod builders_test;
mod config_test;
mod error_test;
mod metrics_test;
mod model_test;
mod runtime_test;
