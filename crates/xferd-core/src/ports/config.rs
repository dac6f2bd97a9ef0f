//! Configuration handle port.
//!
//! Configuration loading itself is external; the core only consumes a
//! key/value view of it.

use std::collections::HashMap;

/// Well-known configuration keys consumed by the provisioning core.
pub mod keys {
    /// Command template for the receiving server process.
    pub const SERVER_COMMAND: &str = "server_command";
    /// Monitoring destinations handed to the launched server.
    pub const MONITOR_DESTINATIONS: &str = "monitor_destinations";
    /// Override for the local host name used in error reports.
    pub const HOSTNAME: &str = "hostname";
}

/// Port for reading configuration values.
pub trait ConfigPort: Send + Sync {
    /// Look up a configuration value by key.
    fn get(&self, key: &str) -> Option<String>;
}

/// `HashMap`-backed configuration, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigPort for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl FromIterator<(String, String)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_config_round_trips_values() {
        let config = MapConfig::new()
            .with(keys::SERVER_COMMAND, "recv-server --port {port}")
            .with(keys::HOSTNAME, "node01");
        assert_eq!(
            config.get(keys::SERVER_COMMAND).as_deref(),
            Some("recv-server --port {port}")
        );
        assert_eq!(config.get(keys::HOSTNAME).as_deref(), Some("node01"));
        assert_eq!(config.get(keys::MONITOR_DESTINATIONS), None);
    }
}
