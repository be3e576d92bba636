//! # Broker Configuration
//!
//! Typed configuration tree for the dispatch broker. Every section carries
//! `#[serde(default)]`, so a source only needs to name the values it changes.
//!
//! ## Sources
//!
//! Loaded by [`ConfigManager`], lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `config/broker.yaml`
//! 3. `config/broker.<env>.yaml`
//! 4. `BROKER__<SECTION>__<FIELD>` environment variables
//!
//! ```yaml
//! router:
//!   bind_address: tcp://0.0.0.0:5678
//! workers:
//!   count: 8
//! queue:
//!   backend: pgmq
//!   database_url: postgresql://broker@localhost/broker
//! ```

pub mod error;
pub mod loader;

use crate::constants::{pacing, queues, retry, ttl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub router: RouterConfig,
    pub workers: WorkerConfig,
    pub queue: QueueConfig,
    pub correlation: CorrelationConfig,
    pub heartbeat: HeartbeatConfig,
    pub speech: SpeechConfig,
}

/// Client-facing socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub bind_address: String,
    pub recv_timeout_ms: i32,
    pub send_timeout_ms: i32,
    pub linger_ms: i32,
    pub poll_interval_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind_address: "tcp://127.0.0.1:5678".to_string(),
            recv_timeout_ms: pacing::RECV_TIMEOUT_MS,
            send_timeout_ms: pacing::SEND_TIMEOUT_MS,
            linger_ms: pacing::LINGER_MS,
            poll_interval_ms: pacing::POLL_INTERVAL_MS,
        }
    }
}

impl RouterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Worker pool sizing and pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    pub idle_backoff_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            idle_backoff_ms: pacing::WORKER_IDLE_BACKOFF_MS,
            error_backoff_ms: pacing::WORKER_ERROR_BACKOFF_MS,
        }
    }
}

impl WorkerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Durable Queue backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Memory,
    Pgmq,
}

/// Durable Queue names, lifetimes and write retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub database_url: Option<String>,
    pub work_queue: String,
    pub response_queue: String,
    pub work_ttl_secs: u64,
    pub response_ttl_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::Memory,
            database_url: None,
            work_queue: queues::WORK_QUEUE.to_string(),
            response_queue: queues::RESPONSE_QUEUE.to_string(),
            work_ttl_secs: ttl::WORK_QUEUE_SECS,
            response_ttl_secs: ttl::RESPONSE_QUEUE_SECS,
            max_attempts: retry::MAX_ATTEMPTS,
            retry_delay_ms: retry::DELAY_MS,
        }
    }
}

impl QueueConfig {
    pub fn work_ttl(&self) -> Duration {
        Duration::from_secs(self.work_ttl_secs)
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Correlation cache bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
    pub sweep_interval_secs: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: ttl::CORRELATION_SECS,
            max_entries: ttl::CORRELATION_MAX_ENTRIES,
            sweep_interval_secs: 30,
        }
    }
}

impl CorrelationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Saved voice settings selectable by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePreset {
    pub voice_type: String,
    pub pitch: f64,
    pub speaking_rate: f64,
}

/// Text-to-speech command settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// File the latest synthesised audio is written to
    pub output_path: PathBuf,
    pub default_voice: String,
    pub default_pitch: f64,
    pub default_rate: f64,
    /// Voice names clients may select
    pub voices: Vec<String>,
    pub presets: HashMap<String, VoicePreset>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("tmp/speech.mp3"),
            default_voice: "en-US-Standard-B".to_string(),
            default_pitch: 0.0,
            default_rate: 1.0,
            voices: Vec::new(),
            presets: HashMap::new(),
        }
    }
}

/// Accepted pitch range in semitones
pub const PITCH_RANGE: std::ops::RangeInclusive<f64> = -20.0..=20.0;

/// Accepted speaking rate multiplier range
pub const RATE_RANGE: std::ops::RangeInclusive<f64> = 0.25..=4.0;

impl BrokerConfig {
    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.router.bind_address.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "router.bind_address",
                "router configuration",
            ));
        }

        if self.workers.count == 0 {
            return Err(ConfigurationError::invalid_value(
                "workers.count",
                0,
                "at least one worker is required",
            ));
        }

        if self.queue.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.max_attempts",
                0,
                "at least one attempt is required",
            ));
        }

        for (field, value) in [
            ("queue.work_ttl_secs", self.queue.work_ttl_secs),
            ("queue.response_ttl_secs", self.queue.response_ttl_secs),
            ("correlation.ttl_secs", self.correlation.ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value,
                    "ttl must be greater than 0",
                ));
            }
        }

        if self.correlation.max_entries == 0 {
            return Err(ConfigurationError::invalid_value(
                "correlation.max_entries",
                0,
                "cache must hold at least one entry",
            ));
        }

        for (field, name) in [
            ("queue.work_queue", &self.queue.work_queue),
            ("queue.response_queue", &self.queue.response_queue),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    field,
                    "queue configuration",
                ));
            }
        }

        if self.queue.work_queue == self.queue.response_queue {
            return Err(ConfigurationError::invalid_value(
                "queue.response_queue",
                &self.queue.response_queue,
                "work and response queues must differ",
            ));
        }

        if self.queue.backend == QueueBackend::Pgmq
            && self
                .queue
                .database_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigurationError::missing_required_field(
                "queue.database_url",
                "pgmq queue backend",
            ));
        }

        if !PITCH_RANGE.contains(&self.speech.default_pitch) {
            return Err(ConfigurationError::invalid_value(
                "speech.default_pitch",
                self.speech.default_pitch,
                "pitch must be between -20 and 20",
            ));
        }

        if !RATE_RANGE.contains(&self.speech.default_rate) {
            return Err(ConfigurationError::invalid_value(
                "speech.default_rate",
                self.speech.default_rate,
                "rate must be between 0.25 and 4",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BrokerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.work_queue, "job_queue");
        assert_eq!(config.queue.retry_delay(), Duration::from_millis(200));
        assert_eq!(config.correlation.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = BrokerConfig::default();
        config.workers.count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. }) if field == "workers.count"
        ));
    }

    #[test]
    fn test_rejects_shared_queue_name() {
        let mut config = BrokerConfig::default();
        config.queue.response_queue = config.queue.work_queue.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pgmq_requires_database_url() {
        let mut config = BrokerConfig::default();
        config.queue.backend = QueueBackend::Pgmq;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequiredField { .. })
        ));

        config.queue.database_url = Some("postgresql://localhost/broker".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_voice_defaults() {
        let mut config = BrokerConfig::default();
        config.speech.default_rate = 5.0;
        assert!(config.validate().is_err());

        let mut config = BrokerConfig::default();
        config.speech.default_pitch = -20.5;
        assert!(config.validate().is_err());
    }
}
