//! Configuration model (§6 Config).
//!
//! A baked-in `default.toml` overlaid by an optional user-supplied file and
//! `ALERTENGINE__`-prefixed environment variables, following the teacher's
//! `ConfigLoader` shape.

use std::collections::HashSet;

use config::builder::DefaultState;
use config::{
    Config as ConfigRaw,
    ConfigBuilder,
    ConfigError,
    Environment,
    File,
    FileFormat,
};
use serde::Deserialize;

use crate::types::TtlState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Checker,
    Notifier,
    Heartbeat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainConfig {
    pub roles: HashSet<Role>,
    pub prometheus_address: String,
    pub prometheus_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    pub worker_pool_size: usize,
    pub check_interval_s: u64,
    pub trigger_lock_ttl_s: u64,
    pub metrics_ttl_s: i64,
    pub max_triggers_per_tick: usize,
    #[serde(default)]
    pub default_ttl_state: TtlState,
    /// Base URL of the remote metric store queried by triggers with
    /// `is_remote = true`. Absent means this engine instance checks only
    /// local (`is_remote = false`) triggers.
    #[serde(default)]
    pub remote_metric_source_url: Option<url::Url>,
    #[serde(default = "default_remote_request_timeout_s")]
    pub remote_request_timeout_s: u64,
}

fn default_remote_request_timeout_s() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub event_fetch_worker_count: usize,
    pub dispatch_tick_interval_ms: u64,
    pub sending_timeout_s: u64,
    pub resending_timeout_s: u64,
    pub default_contact_channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    pub interval_s: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub main: MainConfig,
    pub checker: CheckerConfig,
    pub notifier: NotifierConfig,
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug)]
pub struct ConfigLoader {
    builder: ConfigBuilder<DefaultState>,
}

impl ConfigLoader {
    /// Loads a fresh copy of the configuration from source.
    pub fn load(&self) -> Result<Config, ConfigError> {
        Self::deserialize(self.builder.build_cloned()?)
    }

    /// Creates a new loader configured with the baked-in defaults,
    /// optionally overlaid by a user-supplied file and always overlaid by
    /// `ALERTENGINE__`-prefixed environment variables.
    ///
    /// * `config_file`: The path of the configuration file to load.
    pub fn from_path(path: &Option<String>) -> ConfigLoader {
        let raw = include_str!("default.toml");
        let mut builder = ConfigRaw::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .add_source(
                Environment::with_prefix("ALERTENGINE")
                    .try_parsing(true)
                    .separator("__")
                    .list_separator(","),
            );
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        ConfigLoader { builder }
    }

    fn deserialize(config: ConfigRaw) -> Result<Config, ConfigError> {
        config.try_deserialize()
    }
}
