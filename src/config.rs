//! Application configuration, layered from an optional configuration file and
//! `VIGIL_`-prefixed environment variables.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};

/// Provides the default value for workers.
fn default_workers() -> usize {
    4
}

/// Provides the default value for queue_capacity.
fn default_queue_capacity() -> usize {
    256
}

/// Provides the default value for requeue_interval.
///
/// A single fixed delay between retries keeps behavior predictable under
/// sustained external-system outages; there is deliberately no exponential
/// growth and no jitter.
fn default_requeue_interval() -> Duration {
    Duration::from_secs(60)
}

/// Provides the default value for shutdown_timeout.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Provides the default value for operator_namespace.
fn default_operator_namespace() -> String {
    "monitoring".to_string()
}

/// Custom deserializer for Duration from seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Application configuration for Vigil.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Number of concurrent reconcile workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the reconcile request channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Fixed delay before a failed reconcile is requeued, in seconds.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_requeue_interval"
    )]
    pub requeue_interval: Duration,

    /// The maximum time to wait for graceful shutdown, in seconds.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// The namespace the operator itself runs in. Templates without an
    /// explicit namespace reference are looked up here.
    #[serde(default = "default_operator_namespace")]
    pub operator_namespace: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            requeue_interval: default_requeue_interval(),
            shutdown_timeout: default_shutdown_timeout(),
            operator_namespace: default_operator_namespace(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `<dir>/vigil.toml` (if present) merged
    /// with `VIGIL_`-prefixed environment variables.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let base = config_dir.unwrap_or(".");
        Config::builder()
            .add_source(File::with_name(&format!("{base}/vigil")).required(false))
            .add_source(Environment::with_prefix("VIGIL"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.requeue_interval, Duration::from_secs(60));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.operator_namespace, "monitoring");
    }

    #[test]
    fn test_deserialize_durations_from_seconds() {
        let json = r#"{"workers": 2, "requeue_interval": 15, "shutdown_timeout": 5}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.requeue_interval, Duration::from_secs(15));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::new(Some("/nonexistent")).unwrap();
        assert_eq!(config.workers, 4);
    }
}
