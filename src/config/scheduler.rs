//! Task scheduler configuration structures.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{ExceptionHandler, SchedulerError};

/// Default sleep-poll interval for blocking waits, in microseconds.
pub const DEFAULT_SLEEP_MICROS: u64 = 100;

/// Execution strategy of a task scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskSchedulerType {
    /// Shared pool; tasks of one scheduler may run in parallel.
    Concurrent,
    /// Shared pool; one task at a time, strict FIFO.
    #[default]
    Sequential,
    /// Dedicated thread per scheduler; strict FIFO.
    SequentialThread,
    /// Inline on the inserting thread.
    Direct,
    /// Inline on the inserting thread, serialized across callers.
    DirectThreadsafe,
}

impl TaskSchedulerType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Concurrent,
        Self::Sequential,
        Self::SequentialThread,
        Self::Direct,
        Self::DirectThreadsafe,
    ];

    /// Whether tasks run inline on the inserting thread (no queue).
    #[must_use]
    pub const fn is_direct(self) -> bool {
        matches!(self, Self::Direct | Self::DirectThreadsafe)
    }

    /// Whether a single logical execution thread exists to time.
    #[must_use]
    pub const fn supports_busy_fraction(self) -> bool {
        !matches!(self, Self::Concurrent)
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concurrent => "CONCURRENT",
            Self::Sequential => "SEQUENTIAL",
            Self::SequentialThread => "SEQUENTIAL_THREAD",
            Self::Direct => "DIRECT",
            Self::DirectThreadsafe => "DIRECT_THREADSAFE",
        }
    }
}

impl fmt::Display for TaskSchedulerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskSchedulerType {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchedulerError::Parse(format!("unknown scheduler type `{s}`")))
    }
}

/// Maximum number of unhandled tasks a scheduler accepts before insertion blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnhandledTaskCapacity {
    /// No ceiling.
    #[default]
    Unlimited,
    /// Fixed positive ceiling.
    Bounded(u64),
}

impl UnhandledTaskCapacity {
    /// Whether a ceiling is configured.
    #[must_use]
    pub const fn is_bounded(self) -> bool {
        matches!(self, Self::Bounded(_))
    }
}

/// Name-less part of a scheduler configuration.
///
/// Also has a compact textual form, one whitespace-separated token per
/// setting, for configuring schedulers from a single string:
///
/// ```text
/// SEQUENTIAL CAPACITY(500) FLUSHABLE UNHANDLED_TASK_METRIC SLEEP_MICROS(50)
/// ```
///
/// Tokens: a scheduler type, `CAPACITY(n)`, `UNLIMITED_CAPACITY`, `FLUSHABLE`,
/// `SQUELCHABLE`, `UNHANDLED_TASK_METRIC`, `BUSY_FRACTION_METRIC`,
/// `EXTERNAL_BACK_PRESSURE` and `SLEEP_MICROS(n)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Execution strategy.
    #[serde(rename = "type")]
    pub scheduler_type: TaskSchedulerType,
    /// Unhandled-task ceiling.
    pub unhandled_task_capacity: UnhandledTaskCapacity,
    /// Sleep-poll interval for blocking on-ramps and flushes.
    pub sleep_micros: u64,
    /// Allow `flush`.
    pub flushing_enabled: bool,
    /// Allow `set_squelched`.
    pub squelching_enabled: bool,
    /// Publish `<name>_unhandled_task_count`.
    pub unhandled_task_metric_enabled: bool,
    /// Publish `<name>_busy_fraction`.
    pub busy_fraction_metric_enabled: bool,
    /// Insertion blocks even without a bounded capacity (external counter decides).
    pub external_back_pressure: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            scheduler_type: TaskSchedulerType::default(),
            unhandled_task_capacity: UnhandledTaskCapacity::default(),
            sleep_micros: DEFAULT_SLEEP_MICROS,
            flushing_enabled: false,
            squelching_enabled: false,
            unhandled_task_metric_enabled: false,
            busy_fraction_metric_enabled: false,
            external_back_pressure: false,
        }
    }
}

impl SchedulerSettings {
    /// Sleep-poll interval as a [`Duration`].
    #[must_use]
    pub const fn sleep_duration(&self) -> Duration {
        Duration::from_micros(self.sleep_micros)
    }

    /// Validate setting values and combinations.
    pub fn validate(&self) -> Result<(), String> {
        if self.unhandled_task_capacity == UnhandledTaskCapacity::Bounded(0) {
            return Err("unhandled_task_capacity must be greater than 0".into());
        }
        if self.sleep_micros == 0 {
            return Err("sleep duration must be greater than 0".into());
        }
        if self.busy_fraction_metric_enabled && !self.scheduler_type.supports_busy_fraction() {
            return Err(format!(
                "busy fraction metric is not supported by {} schedulers",
                self.scheduler_type
            ));
        }
        Ok(())
    }
}

fn parse_parenthesized(token: &str, prefix: &str) -> Option<Result<u64, SchedulerError>> {
    let inner = token.strip_prefix(prefix)?.strip_prefix('(')?.strip_suffix(')')?;
    Some(
        inner
            .trim()
            .parse::<u64>()
            .map_err(|e| SchedulerError::Parse(format!("invalid value in `{token}`: {e}"))),
    )
}

impl FromStr for SchedulerSettings {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut settings = Self::default();
        for token in s.split_whitespace() {
            let upper = token.to_ascii_uppercase();
            if let Some(capacity) = parse_parenthesized(&upper, "CAPACITY") {
                settings.unhandled_task_capacity = UnhandledTaskCapacity::Bounded(capacity?);
                continue;
            }
            if let Some(micros) = parse_parenthesized(&upper, "SLEEP_MICROS") {
                settings.sleep_micros = micros?;
                continue;
            }
            match upper.as_str() {
                "UNLIMITED_CAPACITY" => {
                    settings.unhandled_task_capacity = UnhandledTaskCapacity::Unlimited;
                }
                "FLUSHABLE" => settings.flushing_enabled = true,
                "SQUELCHABLE" => settings.squelching_enabled = true,
                "UNHANDLED_TASK_METRIC" => settings.unhandled_task_metric_enabled = true,
                "BUSY_FRACTION_METRIC" => settings.busy_fraction_metric_enabled = true,
                "EXTERNAL_BACK_PRESSURE" => settings.external_back_pressure = true,
                other => settings.scheduler_type = other.parse()?,
            }
        }
        Ok(settings)
    }
}

impl fmt::Display for SchedulerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scheduler_type)?;
        if let UnhandledTaskCapacity::Bounded(capacity) = self.unhandled_task_capacity {
            write!(f, " CAPACITY({capacity})")?;
        }
        let flags = [
            (self.flushing_enabled, "FLUSHABLE"),
            (self.squelching_enabled, "SQUELCHABLE"),
            (self.unhandled_task_metric_enabled, "UNHANDLED_TASK_METRIC"),
            (self.busy_fraction_metric_enabled, "BUSY_FRACTION_METRIC"),
            (self.external_back_pressure, "EXTERNAL_BACK_PRESSURE"),
        ];
        for (_, token) in flags.iter().filter(|(enabled, _)| *enabled) {
            write!(f, " {token}")?;
        }
        if self.sleep_micros != DEFAULT_SLEEP_MICROS {
            write!(f, " SLEEP_MICROS({})", self.sleep_micros)?;
        }
        Ok(())
    }
}

/// Complete configuration of one task scheduler.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TaskSchedulerConfig {
    /// Unique name within the model; ASCII letters, digits and underscores.
    pub name: String,
    /// Strategy, capacity and flags.
    #[serde(flatten)]
    pub settings: SchedulerSettings,
    /// Display label for diagnostics; defaults to the name.
    #[serde(default)]
    pub hyperlink: Option<String>,
    /// Receives uncaught task failures; defaults to logging them.
    #[serde(skip)]
    pub uncaught_exception_handler: Option<ExceptionHandler>,
}

impl fmt::Debug for TaskSchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSchedulerConfig")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("hyperlink", &self.hyperlink)
            .field(
                "uncaught_exception_handler",
                &self.uncaught_exception_handler.is_some(),
            )
            .finish()
    }
}

/// Check that a scheduler name is non-empty and `[A-Za-z0-9_]` only.
pub fn validate_name(name: &str) -> Result<(), SchedulerError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SchedulerError::InvalidName(name.to_owned()));
    }
    Ok(())
}

impl TaskSchedulerConfig {
    /// Configuration with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Configuration from a name and a compact settings string.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Parse`] for unknown or malformed tokens.
    pub fn parse(name: impl Into<String>, settings: &str) -> Result<Self, SchedulerError> {
        Ok(Self {
            name: name.into(),
            settings: settings.parse()?,
            ..Self::default()
        })
    }

    /// Validate the name and settings.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidName`] or [`SchedulerError::InvalidConfig`].
    pub fn validate(&self) -> Result<(), SchedulerError> {
        validate_name(&self.name)?;
        self.settings
            .validate()
            .map_err(|reason| SchedulerError::InvalidConfig {
                name: self.name.clone(),
                reason,
            })
    }

    /// Parse a configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Parse`] for malformed JSON, otherwise see
    /// [`TaskSchedulerConfig::validate`].
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::Parse(format!("scheduler config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Label used for diagnostics.
    #[must_use]
    pub fn hyperlink_or_name(&self) -> &str {
        self.hyperlink.as_deref().unwrap_or(&self.name)
    }
}
