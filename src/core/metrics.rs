//! Metrics registry collaborator.
//!
//! Schedulers publish pull-based gauges: the registry stores a sampler
//! closure and calls it only when someone reads the metric, so nothing is
//! added to the task hot path.

use std::fmt;

use parking_lot::RwLock;
use serde::Serialize;

use super::SchedulerError;

/// Closure producing the current value of a gauge.
pub type GaugeSampler = Box<dyn Fn() -> f64 + Send + Sync>;

/// Sink for scheduler metrics.
pub trait MetricsRegistry: Send + Sync + fmt::Debug {
    /// Register a gauge sampled on read.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateMetric`] if the name is taken.
    fn register_gauge(
        &self,
        name: &str,
        description: &str,
        sampler: GaugeSampler,
    ) -> Result<(), SchedulerError>;

    /// Remove a gauge. Returns whether it was registered.
    fn unregister_gauge(&self, name: &str) -> bool;
}

/// Registry that discards every metric.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetricsRegistry;

impl MetricsRegistry for NoOpMetricsRegistry {
    fn register_gauge(&self, _: &str, _: &str, _: GaugeSampler) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn unregister_gauge(&self, _: &str) -> bool {
        false
    }
}

/// A sampled metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    /// Metric name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Value at sampling time.
    pub value: f64,
}

struct Gauge {
    name: String,
    description: String,
    sampler: GaugeSampler,
}

/// In-process registry keeping gauges in registration order.
#[derive(Default)]
pub struct InMemoryMetricsRegistry {
    gauges: RwLock<Vec<Gauge>>,
}

impl InMemoryMetricsRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample one gauge.
    #[must_use]
    pub fn sample(&self, name: &str) -> Option<f64> {
        self.gauges
            .read()
            .iter()
            .find(|g| g.name == name)
            .map(|g| (g.sampler)())
    }

    /// Registered gauge names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.gauges.read().iter().map(|g| g.name.clone()).collect()
    }

    /// Sample every gauge.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.gauges
            .read()
            .iter()
            .map(|g| MetricSample {
                name: g.name.clone(),
                description: g.description.clone(),
                value: (g.sampler)(),
            })
            .collect()
    }

    /// Sample every gauge and render the result as JSON.
    ///
    /// # Errors
    ///
    /// Fails if a sampled value cannot be represented in JSON.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}

impl fmt::Debug for InMemoryMetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryMetricsRegistry")
            .field("gauges", &self.names())
            .finish()
    }
}

impl MetricsRegistry for InMemoryMetricsRegistry {
    fn register_gauge(
        &self,
        name: &str,
        description: &str,
        sampler: GaugeSampler,
    ) -> Result<(), SchedulerError> {
        let mut gauges = self.gauges.write();
        if gauges.iter().any(|g| g.name == name) {
            return Err(SchedulerError::DuplicateMetric(name.to_owned()));
        }
        gauges.push(Gauge {
            name: name.to_owned(),
            description: description.to_owned(),
            sampler,
        });
        Ok(())
    }

    fn unregister_gauge(&self, name: &str) -> bool {
        let mut gauges = self.gauges.write();
        let before = gauges.len();
        gauges.retain(|g| g.name != name);
        gauges.len() != before
    }
}
