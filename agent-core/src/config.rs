//! Agent/collector startup configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Static startup configuration, loaded once and never mutated for the
/// lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Collection/report cadence. Must be strictly positive.
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    /// Address the collector listens on, or the agent dials.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    ":50051".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            listen_addr: default_listen_addr(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let raw = String::deserialize(deserializer)?;
    let parsed = humantime::parse_duration(&raw)
        .map_err(|e| D::Error::custom(format!("invalid interval {raw:?}: {e}")))?;
    if parsed.is_zero() {
        return Err(D::Error::custom("interval must be > 0"));
    }
    Ok(parsed)
}

/// Loads config from `path`, or the defaults (`interval=1s`,
/// `listen_addr=":50051"`) when `path` is empty.
pub fn load(path: &str) -> Result<Config, ConfigError> {
    if path.is_empty() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(Path::new(path))
        .map_err(|e| ConfigError::Read(path.to_string(), e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        let err = serde_json::from_str::<Config>(r#"{"interval":"0s"}"#).unwrap_err();
        assert!(err.to_string().contains("must be > 0"));
    }

    #[test]
    fn parses_interval_literal_and_defaults_listen_addr() {
        let cfg: Config = serde_json::from_str(r#"{"interval":"500ms"}"#).unwrap();
        assert_eq!(cfg.interval, Duration::from_millis(500));
        assert_eq!(cfg.listen_addr, ":50051");
    }

    #[test]
    fn empty_path_yields_defaults() {
        let cfg = load("").unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(1));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load("/nonexistent/path/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_, _)));
    }
}
