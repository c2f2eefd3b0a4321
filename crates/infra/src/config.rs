//! Pipeline configuration.
//!
//! Built once at process start and passed into intake and the workers; no
//! environment lookups happen inside business logic.

use std::time::Duration;

use tracing::warn;

/// Process-wide pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pattern applied when a job is submitted without one.
    pub default_pattern: String,
    /// Artificial per-message processing delay.
    pub processing_delay: Duration,
    /// Number of validation worker instances consuming the queue.
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_pattern: "^[a-zA-Z0-9]+$".to_string(),
            processing_delay: Duration::from_millis(500),
            worker_count: 2,
        }
    }
}

impl PipelineConfig {
    /// Read configuration from the environment, falling back to defaults on
    /// missing or unparseable values.
    ///
    /// Recognized variables: `DEFAULT_PATTERN`, `PROCESSING_DELAY_MS`,
    /// `WORKER_COUNT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(pattern) = std::env::var("DEFAULT_PATTERN") {
            if !pattern.is_empty() {
                config.default_pattern = pattern;
            }
        }

        if let Ok(raw) = std::env::var("PROCESSING_DELAY_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => config.processing_delay = Duration::from_millis(ms),
                Err(_) => warn!(value = %raw, "invalid PROCESSING_DELAY_MS, using default"),
            }
        }

        if let Ok(raw) = std::env::var("WORKER_COUNT") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.worker_count = n,
                _ => warn!(value = %raw, "invalid WORKER_COUNT, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_pattern, "^[a-zA-Z0-9]+$");
        assert_eq!(config.processing_delay, Duration::from_millis(500));
        assert_eq!(config.worker_count, 2);
    }
}
