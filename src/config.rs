//! Ingestion session configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::clock::default_trace_clock;

/// Byte cap for log messages assembled from key/value args.
pub const DEFAULT_LOG_MESSAGE_CAP: usize = 4096;

/// Knobs for one ingestion session, loadable from a JSON file.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Cap, in bytes, on log messages built from key/value args. Content
    /// past the cap is truncated, never an error.
    pub log_message_cap: usize,

    /// Clock domain packets without an explicit `timestamp_clock_id` are
    /// assumed to use; also the trace time domain everything converts into.
    pub trace_clock_id: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            log_message_cap: DEFAULT_LOG_MESSAGE_CAP,
            trace_clock_id: default_trace_clock(),
        }
    }
}

impl IngestConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: IngestConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.log_message_cap, 4096);
        assert_eq!(config.trace_clock_id, default_trace_clock());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IngestConfig = serde_json::from_str(r#"{"log_message_cap": 64}"#).unwrap();
        assert_eq!(config.log_message_cap, 64);
        assert_eq!(config.trace_clock_id, default_trace_clock());
    }
}
