// src/config.rs
//! Worker configuration, layered from an optional TOML file and
//! `GANGSHEET__`-prefixed environment variables.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the filesystem storage backend.
    pub root: PathBuf,
    pub op_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Soft deadline per job, in seconds.
    pub soft_deadline_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("worker.worker_count", 1_i64)?
            .set_default("worker.poll_interval_ms", 500_i64)?
            .set_default("storage.root", "./storage")?
            .set_default("storage.op_timeout_secs", 30_i64)?
            .set_default("storage.retry_attempts", 3_i64)?
            .set_default("storage.retry_backoff_ms", 250_i64)?
            .set_default("limits.soft_deadline_secs", 300_i64)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("GANGSHEET").separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn retry_policy(&self) -> crate::storage::RetryPolicy {
        crate::storage::RetryPolicy {
            max_attempts: self.storage.retry_attempts,
            op_timeout: std::time::Duration::from_secs(self.storage.op_timeout_secs),
            backoff: std::time::Duration::from_millis(self.storage.retry_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = Config::load().unwrap();
        assert_eq!(config.worker.worker_count, 1);
        assert_eq!(config.storage.retry_attempts, 3);
        assert_eq!(config.limits.soft_deadline_secs, 300);
    }
}
