//! The wiring model: owner of a pipeline's schedulers and shared resources.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{MetricsRegistry, NoOpMetricsRegistry, SchedulerError, SchedulerHandle, TaskScheduler};
use crate::builders::TaskSchedulerBuilder;
use crate::config::{ModelConfig, TaskSchedulerConfig};
use crate::runtime::{TaskPool, WorkerThreadPool};
use crate::util::{Clock, SystemClock};

struct Registration {
    hyperlink: String,
    handle: Arc<dyn SchedulerHandle>,
}

struct ModelInner {
    config: ModelConfig,
    pool: Arc<dyn TaskPool>,
    metrics: Arc<dyn MetricsRegistry>,
    clock: Arc<dyn Clock>,
    /// Registration order.
    schedulers: RwLock<Vec<Registration>>,
    stopped: AtomicBool,
}

/// Registry of the schedulers making up one pipeline.
///
/// Not a global: each pipeline (or test) assembles its own model. Cheap to
/// clone; clones share the same registry.
#[derive(Clone)]
pub struct WiringModel {
    inner: Arc<ModelInner>,
}

impl WiringModel {
    /// Model with a fresh worker pool, no metrics sink and the system clock.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the pool cannot start.
    pub fn new(config: ModelConfig) -> Result<Self, SchedulerError> {
        config
            .validate()
            .map_err(|reason| SchedulerError::InvalidConfig {
                name: config.pool_thread_prefix.clone(),
                reason,
            })?;
        let pool = Arc::new(WorkerThreadPool::from_config(&config)?);
        Ok(Self::from_parts(
            config,
            pool,
            Arc::new(NoOpMetricsRegistry),
            Arc::new(SystemClock),
        ))
    }

    /// Model over caller-supplied collaborators.
    #[must_use]
    pub fn from_parts(
        config: ModelConfig,
        pool: Arc<dyn TaskPool>,
        metrics: Arc<dyn MetricsRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                config,
                pool,
                metrics,
                clock,
                schedulers: RwLock::new(Vec::new()),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Start configuring a scheduler named `name`.
    #[must_use]
    pub fn scheduler_builder(&self, name: impl Into<String>) -> TaskSchedulerBuilder {
        TaskSchedulerBuilder::new(self.clone(), name)
    }

    /// Build and register a scheduler from a complete configuration.
    ///
    /// # Errors
    ///
    /// See [`TaskSchedulerBuilder::build`].
    pub fn build_scheduler<O>(
        &self,
        config: TaskSchedulerConfig,
    ) -> Result<TaskScheduler<O>, SchedulerError>
    where
        O: Clone + Send + 'static,
    {
        TaskSchedulerBuilder::from_config(self.clone(), config).build()
    }

    /// Add a scheduler under its name with a diagnostics label.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::DuplicateName`] if the name is already registered.
    pub fn register_scheduler(
        &self,
        handle: Arc<dyn SchedulerHandle>,
        hyperlink: impl Into<String>,
    ) -> Result<(), SchedulerError> {
        let mut schedulers = self.inner.schedulers.write();
        if schedulers.iter().any(|r| r.handle.name() == handle.name()) {
            return Err(SchedulerError::DuplicateName(handle.name().to_owned()));
        }
        let hyperlink = hyperlink.into();
        debug!(scheduler = %handle.name(), hyperlink = %hyperlink, "scheduler registered");
        schedulers.push(Registration { hyperlink, handle });
        Ok(())
    }

    /// Whether a scheduler with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.schedulers.read().iter().any(|r| r.handle.name() == name)
    }

    /// Number of registered schedulers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.schedulers.read().len()
    }

    /// Whether no scheduler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scheduler names in registration order.
    #[must_use]
    pub fn scheduler_names(&self) -> Vec<String> {
        self.inner
            .schedulers
            .read()
            .iter()
            .map(|r| r.handle.name().to_owned())
            .collect()
    }

    /// Diagnostics label of a scheduler.
    #[must_use]
    pub fn hyperlink(&self, name: &str) -> Option<String> {
        self.inner
            .schedulers
            .read()
            .iter()
            .find(|r| r.handle.name() == name)
            .map(|r| r.hyperlink.clone())
    }

    /// `(name, unhandled count)` per scheduler, in registration order.
    #[must_use]
    pub fn unprocessed_task_counts(&self) -> Vec<(String, u64)> {
        self.handles()
            .iter()
            .map(|h| (h.name().to_owned(), h.unprocessed_task_count()))
            .collect()
    }

    /// Flush every flushable scheduler, in registration order.
    ///
    /// Register downstream schedulers first to drain a pipeline front to back.
    ///
    /// # Errors
    ///
    /// Propagates the first flush error.
    pub fn flush_all(&self) -> Result<(), SchedulerError> {
        for handle in self.handles().iter().filter(|h| h.is_flushable()) {
            handle.flush()?;
        }
        Ok(())
    }

    /// Stop dedicated scheduler threads, then the shared pool. Idempotent.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        for handle in self.handles() {
            handle.stop();
        }
        self.inner.pool.shutdown();
        info!(schedulers = self.len(), "wiring model stopped");
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Model configuration.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.inner.config
    }

    /// Shared execution pool.
    #[must_use]
    pub fn pool(&self) -> Arc<dyn TaskPool> {
        Arc::clone(&self.inner.pool)
    }

    /// Metrics sink.
    #[must_use]
    pub fn metrics(&self) -> Arc<dyn MetricsRegistry> {
        Arc::clone(&self.inner.metrics)
    }

    /// Time source for busy-fraction sampling.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    // Snapshot so callers never block while holding the registry lock.
    fn handles(&self) -> Vec<Arc<dyn SchedulerHandle>> {
        self.inner
            .schedulers
            .read()
            .iter()
            .map(|r| Arc::clone(&r.handle))
            .collect()
    }
}

impl fmt::Debug for WiringModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiringModel")
            .field("config", &self.inner.config)
            .field("schedulers", &self.scheduler_names())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
