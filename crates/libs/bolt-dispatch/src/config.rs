use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::packet::IdentifierMode;
use crate::queue::RetentionPolicy;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    #[serde(default)]
    pub packet: PacketConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PacketConfig {
    #[serde(default)]
    pub identifier: IdentifierMode,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    pub max_entries: Option<usize>,
    pub max_age_secs: Option<u64>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            max_age_secs: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

impl QueueConfig {
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_entries: self.max_entries,
            max_age: self.max_age_secs.map(Duration::from_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl DispatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DispatchConfig::from_toml("").expect("parse");
        assert_eq!(config, DispatchConfig::default());
        assert_eq!(config.packet.identifier, IdentifierMode::Rendered);
        assert_eq!(config.queue.retention(), RetentionPolicy::unbounded());
        assert_eq!(config.queue.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn full_document() {
        let config = DispatchConfig::from_toml(
            r#"
            [packet]
            identifier = "canonical"

            [queue]
            max_entries = 10000
            max_age_secs = 3600
            sweep_interval_secs = 5
            "#,
        )
        .expect("parse");

        assert_eq!(config.packet.identifier, IdentifierMode::Canonical);
        assert_eq!(
            config.queue.retention(),
            RetentionPolicy {
                max_entries: Some(10_000),
                max_age: Some(Duration::from_secs(3600)),
            }
        );
        assert_eq!(config.queue.sweep_interval(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_unknown_keys_and_modes() {
        assert!(DispatchConfig::from_toml("[queue]\nmax_entrys = 5\n").is_err());
        assert!(DispatchConfig::from_toml("[packet]\nidentifier = \"semantic\"\n").is_err());
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[queue]\nmax_age_secs = 60").expect("write");

        let config = DispatchConfig::from_path(file.path()).expect("load");
        assert_eq!(config.queue.max_age_secs, Some(60));

        let mut bad = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(bad, "[queue\n").expect("write");
        let err = DispatchConfig::from_path(bad.path()).expect_err("invalid");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
