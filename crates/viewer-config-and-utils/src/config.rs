//! Configuration management for bus components.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Relay port components subscribe to (relay broadcast-out).
pub const DEFAULT_SUBSCRIBE_PORT: u16 = 50003;

/// Relay port components publish to (relay broadcast-in).
pub const DEFAULT_PUBLISH_PORT: u16 = 50002;

const ENV_LOG_LEVEL: &str = "VIEWER_BUS_LOG_LEVEL";
const ENV_RELAY_HOST: &str = "VIEWER_BUS_RELAY_HOST";

/// Component configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Relay host.
    pub relay_host: String,
    /// Relay broadcast-out port.
    pub subscribe_port: u16,
    /// Relay broadcast-in port.
    pub publish_port: u16,
    /// Role this component answers to.
    pub logical_address: String,
    /// Instance name. Derived from the role and process id when unset.
    pub physical_address: Option<String>,
    /// Informational component type sent on every envelope.
    pub component_type: String,
    /// Upper bound on one transport receive.
    pub poll_interval_ms: u64,
    /// Whether accepted requests get an immediate RECEIVED reply.
    pub send_received: bool,
    /// How long `send` waits for a terminal reply.
    pub request_timeout_secs: u64,
    /// Owner loop period.
    pub owner_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            relay_host: "127.0.0.1".to_string(),
            subscribe_port: DEFAULT_SUBSCRIBE_PORT,
            publish_port: DEFAULT_PUBLISH_PORT,
            logical_address: "3dviewer".to_string(),
            physical_address: None,
            component_type: "viewer".to_string(),
            poll_interval_ms: 50,
            send_received: true,
            request_timeout_secs: 10,
            owner_tick_ms: 16,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = log_level;
        }
        if let Some(host) = lookup(ENV_RELAY_HOST).filter(|v| !v.trim().is_empty()) {
            self.relay_host = host;
        }
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.logical_address.trim().is_empty() {
            return Err(CoreError::Config("logical_address must not be empty".to_string()));
        }
        if self.relay_host.trim().is_empty() {
            return Err(CoreError::Config("relay_host must not be empty".to_string()));
        }
        if self.subscribe_port == 0 || self.publish_port == 0 {
            return Err(CoreError::Config("relay ports must be non-zero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config("poll_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Instance name, derived from the role and process id when unset.
    pub fn physical_address(&self) -> String {
        match &self.physical_address {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{}-{}", self.logical_address, std::process::id()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn owner_tick(&self) -> Duration {
        Duration::from_millis(self.owner_tick_ms.max(1))
    }
}
