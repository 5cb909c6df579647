//! Wiring model configuration.

use std::env;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// Environment variable overriding [`ModelConfig::pool_threads`].
pub const POOL_THREADS_ENV: &str = "WIRING_POOL_THREADS";
/// Environment variable overriding [`ModelConfig::pool_thread_prefix`].
pub const POOL_THREAD_PREFIX_ENV: &str = "WIRING_POOL_THREAD_PREFIX";

const MIN_POOL_THREADS: usize = 2;

fn default_pool_threads() -> usize {
    num_cpus::get().max(MIN_POOL_THREADS)
}

fn default_pool_thread_prefix() -> String {
    "wiring-pool".into()
}

/// Settings shared by every scheduler of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Worker threads in the shared pool used by CONCURRENT and SEQUENTIAL schedulers.
    #[serde(default = "default_pool_threads")]
    pub pool_threads: usize,
    /// Thread name prefix for pool workers.
    #[serde(default = "default_pool_thread_prefix")]
    pub pool_thread_prefix: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            pool_threads: default_pool_threads(),
            pool_thread_prefix: default_pool_thread_prefix(),
        }
    }
}

impl ModelConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_threads == 0 {
            return Err("pool_threads must be greater than 0".into());
        }
        if self.pool_thread_prefix.trim().is_empty() {
            return Err("pool_thread_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse model configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Parse`] on malformed or invalid input.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::Parse(format!("model config: {e}")))?;
        cfg.validate().map_err(SchedulerError::Parse)?;
        Ok(cfg)
    }

    /// Build configuration from the environment, loading `.env` first if present.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Parse`] if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, SchedulerError> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();
        if let Some(threads) = env_opt(POOL_THREADS_ENV) {
            cfg.pool_threads = threads
                .parse()
                .map_err(|e| SchedulerError::Parse(format!("{POOL_THREADS_ENV}=`{threads}`: {e}")))?;
        }
        if let Some(prefix) = env_opt(POOL_THREAD_PREFIX_ENV) {
            cfg.pool_thread_prefix = prefix;
        }
        cfg.validate().map_err(SchedulerError::Parse)?;
        Ok(cfg)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
