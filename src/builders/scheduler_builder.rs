//! Builder assembling task schedulers from configuration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::{SchedulerSettings, TaskSchedulerConfig, TaskSchedulerType, UnhandledTaskCapacity};
use crate::core::{
    BackpressureObjectCounter, BusyTimer, ExceptionHandler, MultiObjectCounter, ObjectCounter,
    OutputWire, SchedulerCore, SchedulerError, StandardObjectCounter, TaskFailure, TaskScheduler,
    WiringModel,
};
use crate::runtime::TaskPool;

/// Handler used when none is configured: log and continue.
#[must_use]
pub fn default_exception_handler() -> ExceptionHandler {
    Arc::new(|scheduler: &str, failure: &TaskFailure| {
        error!(scheduler, failure = %failure, "uncaught exception in task handler");
    })
}

/// Configures and builds one [`TaskScheduler`] for a [`WiringModel`].
///
/// ```rust,ignore
/// let ingest = model
///     .scheduler_builder("ingest")
///     .with_type(TaskSchedulerType::Sequential)
///     .with_unhandled_task_capacity(500)
///     .with_flushing_enabled(true)
///     .build::<Record>()?;
/// ```
#[must_use = "a builder does nothing until `build` is called"]
pub struct TaskSchedulerBuilder {
    model: WiringModel,
    config: TaskSchedulerConfig,
    on_ramp: Option<Arc<dyn ObjectCounter>>,
    off_ramp: Option<Arc<dyn ObjectCounter>>,
    pool: Option<Arc<dyn TaskPool>>,
}

impl TaskSchedulerBuilder {
    /// Builder with default settings.
    pub fn new(model: WiringModel, name: impl Into<String>) -> Self {
        Self::from_config(model, TaskSchedulerConfig::new(name))
    }

    /// Builder starting from a complete configuration.
    pub fn from_config(model: WiringModel, config: TaskSchedulerConfig) -> Self {
        Self {
            model,
            config,
            on_ramp: None,
            off_ramp: None,
            pool: None,
        }
    }

    /// Replace all settings, e.g. ones parsed from a configuration string.
    pub fn configure(mut self, settings: SchedulerSettings) -> Self {
        self.config.settings = settings;
        self
    }

    /// Execution strategy.
    pub fn with_type(mut self, scheduler_type: TaskSchedulerType) -> Self {
        self.config.settings.scheduler_type = scheduler_type;
        self
    }

    /// Bound the number of unhandled tasks. Ignored by direct schedulers.
    pub fn with_unhandled_task_capacity(mut self, capacity: u64) -> Self {
        self.config.settings.unhandled_task_capacity = UnhandledTaskCapacity::Bounded(capacity);
        self
    }

    /// Remove any unhandled-task bound.
    pub fn with_unlimited_capacity(mut self) -> Self {
        self.config.settings.unhandled_task_capacity = UnhandledTaskCapacity::Unlimited;
        self
    }

    /// Sleep-poll interval for blocking on-ramps and flushes.
    pub fn with_sleep_duration(mut self, sleep: Duration) -> Self {
        self.config.settings.sleep_micros = u64::try_from(sleep.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Allow `flush`.
    pub fn with_flushing_enabled(mut self, enabled: bool) -> Self {
        self.config.settings.flushing_enabled = enabled;
        self
    }

    /// Allow `set_squelched`.
    pub fn with_squelching_enabled(mut self, enabled: bool) -> Self {
        self.config.settings.squelching_enabled = enabled;
        self
    }

    /// Publish `<name>_unhandled_task_count`.
    pub fn with_unhandled_task_metric_enabled(mut self, enabled: bool) -> Self {
        self.config.settings.unhandled_task_metric_enabled = enabled;
        self
    }

    /// Publish `<name>_busy_fraction`. Not available for CONCURRENT schedulers.
    pub fn with_busy_fraction_metric_enabled(mut self, enabled: bool) -> Self {
        self.config.settings.busy_fraction_metric_enabled = enabled;
        self
    }

    /// Make `put` blocking even without a bounded capacity.
    pub fn with_external_back_pressure(mut self, enabled: bool) -> Self {
        self.config.settings.external_back_pressure = enabled;
        self
    }

    /// Receiver of uncaught task failures.
    pub fn with_uncaught_exception_handler(
        mut self,
        handler: impl Fn(&str, &TaskFailure) + Send + Sync + 'static,
    ) -> Self {
        let handler: ExceptionHandler = Arc::new(handler);
        self.config.uncaught_exception_handler = Some(handler);
        self
    }

    /// Diagnostics label; defaults to the name.
    pub fn with_hyperlink(mut self, hyperlink: impl Into<String>) -> Self {
        self.config.hyperlink = Some(hyperlink.into());
        self
    }

    /// Shared counter also on-ramped by every task inserted here.
    pub fn with_on_ramp(mut self, counter: Arc<dyn ObjectCounter>) -> Self {
        self.on_ramp = Some(counter);
        self
    }

    /// Shared counter also off-ramped by every task handled here.
    pub fn with_off_ramp(mut self, counter: Arc<dyn ObjectCounter>) -> Self {
        self.off_ramp = Some(counter);
        self
    }

    /// Run on `pool` instead of the model's shared pool.
    pub fn with_pool(mut self, pool: Arc<dyn TaskPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Validate, assemble, publish metrics and register with the model.
    ///
    /// Nothing is registered unless every step succeeds: gauges published
    /// before a failing step are removed again.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidName`], [`SchedulerError::DuplicateName`],
    /// [`SchedulerError::InvalidConfig`], [`SchedulerError::DuplicateMetric`] or
    /// [`SchedulerError::ThreadSpawn`].
    pub fn build<O>(self) -> Result<TaskScheduler<O>, SchedulerError>
    where
        O: Clone + Send + 'static,
    {
        let Self {
            model,
            config,
            on_ramp,
            off_ramp,
            pool,
        } = self;
        config.validate()?;
        if model.contains(&config.name) {
            return Err(SchedulerError::DuplicateName(config.name));
        }

        let settings = &config.settings;
        let name = config.name.clone();
        let sleep = settings.sleep_duration();
        let direct = settings.scheduler_type.is_direct();

        let internal: Option<Arc<dyn ObjectCounter>> = match settings.unhandled_task_capacity {
            UnhandledTaskCapacity::Bounded(capacity) if !direct => Some(Arc::new(
                BackpressureObjectCounter::new(&name, capacity, sleep),
            )
                as Arc<dyn ObjectCounter>),
            _ if settings.unhandled_task_metric_enabled || settings.flushing_enabled => {
                Some(Arc::new(StandardObjectCounter::new(&name, sleep)) as Arc<dyn ObjectCounter>)
            }
            _ => None,
        };
        let on_ramp = MultiObjectCounter::compose(internal.clone(), on_ramp);
        let off_ramp = MultiObjectCounter::compose(internal.clone(), off_ramp);

        let busy_timer = settings
            .busy_fraction_metric_enabled
            .then(|| Arc::new(BusyTimer::new(model.clock())));
        let blocking_insertion =
            settings.external_back_pressure || (settings.unhandled_task_capacity.is_bounded() && !direct);

        let core = SchedulerCore {
            name: name.clone(),
            scheduler_type: settings.scheduler_type,
            on_ramp: Arc::clone(&on_ramp),
            off_ramp,
            internal,
            busy_timer: busy_timer.clone(),
            exception_handler: config
                .uncaught_exception_handler
                .clone()
                .unwrap_or_else(default_exception_handler),
            flushing_enabled: settings.flushing_enabled,
            squelching_enabled: settings.squelching_enabled,
            squelched: AtomicBool::new(false),
            blocking_insertion,
            output: OutputWire::new(&name),
        };
        let scheduler = TaskScheduler::assemble(core, pool.unwrap_or_else(|| model.pool()))?;

        let mut published = Vec::new();
        let registered = register_metrics(
            &model,
            settings,
            &name,
            &on_ramp,
            busy_timer.as_ref(),
            &mut published,
        )
        .and_then(|()| model.register_scheduler(scheduler.handle(), config.hyperlink_or_name()));
        if let Err(e) = registered {
            let metrics = model.metrics();
            for metric in &published {
                metrics.unregister_gauge(metric);
            }
            scheduler.stop();
            return Err(e);
        }

        info!(
            scheduler = %name,
            settings = %config.settings,
            blocking_insertion,
            "task scheduler built"
        );
        Ok(scheduler)
    }
}

#[allow(clippy::cast_precision_loss)]
fn register_metrics(
    model: &WiringModel,
    settings: &SchedulerSettings,
    name: &str,
    on_ramp: &Arc<dyn ObjectCounter>,
    busy_timer: Option<&Arc<BusyTimer>>,
    published: &mut Vec<String>,
) -> Result<(), SchedulerError> {
    let metrics = model.metrics();
    if settings.unhandled_task_metric_enabled {
        let counter = Arc::clone(on_ramp);
        let metric = format!("{name}_unhandled_task_count");
        metrics.register_gauge(
            &metric,
            &format!("number of unhandled tasks in {name}"),
            Box::new(move || counter.count() as f64),
        )?;
        published.push(metric);
    }
    if let Some(timer) = busy_timer {
        let timer = Arc::clone(timer);
        let metric = format!("{name}_busy_fraction");
        metrics.register_gauge(
            &metric,
            &format!("fraction of time {name} spends handling tasks"),
            Box::new(move || timer.busy_fraction()),
        )?;
        published.push(metric);
    }
    Ok(())
}
