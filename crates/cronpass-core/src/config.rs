use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (cronpass.toml + CRONPASS_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CronpassConfig {
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// Gating for externally triggered passes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerConfig {
    /// When true, scheduled passes are refused (manual runs still work).
    #[serde(default)]
    pub disabled: bool,
    /// When set, the `run` command requires this password as its argument.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Built-in heartbeat job: writes the current time to `path` every `every`
/// seconds. Disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_path")]
    pub path: String,
    /// Interval in seconds.
    #[serde(default = "default_heartbeat_every")]
    pub every: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_heartbeat_path(),
            every: default_heartbeat_every(),
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cronpass/cronpass.db", home)
}

fn default_heartbeat_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cronpass/heartbeat.txt", home)
}

fn default_heartbeat_every() -> u64 {
    60
}

impl CronpassConfig {
    /// Load config from a TOML file with CRONPASS_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.cronpass/cronpass.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CronpassConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CRONPASS_").split("_"))
            .extract()
            .map_err(|e| crate::error::CronpassError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cronpass/cronpass.toml", home)
}
