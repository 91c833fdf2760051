//! Engine-level configuration.

use std::path::Path;

use intentmatch_explain::DEFAULT_NOTIFY_THRESHOLD;
use intentmatch_rerank::{ConfigError, MatchConfig};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Strategy policy plus request deadline and notification cut-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matching: MatchConfig,

    /// Overall deadline for one match request, across every strategy attempt
    pub request_timeout_ms: u64,

    /// Minimum score for a result to be notified
    pub notify_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            request_timeout_ms: 10_000,
            notify_threshold: DEFAULT_NOTIFY_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigRead(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| EngineError::ConfigParse(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matching.validate()?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                message: "request_timeout_ms must be greater than zero.".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.notify_threshold) {
            return Err(ConfigError::Validation {
                message: "notify_threshold must be within [0, 1].".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.notify_threshold, 0.75);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"request_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.matching, MatchConfig::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = EngineConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/engine.json").unwrap_err();
        assert!(matches!(err, EngineError::ConfigRead(_)));
    }
}
