//! # Configuration
//!
//! Bridge configuration is a single TOML file split into sections:
//!
//! - [`RadioLinkConfig`] - the serial port the module hangs off and how long to wait for it
//! - [`RadioSettings`] - module settings pushed by `configure` or at startup
//! - [`BrokerConfig`] - MQTT connection parameters and the topic root
//! - [`GatewayConfig`] - loop cadence and display queue size
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lorabridge::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Radio port: {}", config.radio.port);
//!     Ok(())
//! }
//! ```
//!
//! ## File format
//!
//! ```toml
//! [radio]
//! port = "/dev/ttyUSB0"
//! serial_baud = 115200
//! command_timeout_ms = 1000
//! apply_on_start = true
//!
//! [module]
//! address = 1
//! network_id = 18
//! band = 915000000
//! spreading_factor = 8
//! bandwidth = 7
//! coding_rate = 1
//! preamble = 12
//! module_baud = 115200
//!
//! [broker]
//! host = "localhost"
//! port = 1883
//! topic_root = "home/mailbox/"
//! client_id = "LoRaBridge3fa2"
//!
//! [gateway]
//! poll_interval_ms = 20
//! display_capacity = 16
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every section except `[radio]` may be omitted and falls back to defaults.

use crate::radio::RadioSettings;
use crate::validation::{validate_radio_settings, validate_topic_root};
use anyhow::{anyhow, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub radio: RadioLinkConfig,
    #[serde(default)]
    pub module: RadioSettings,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioLinkConfig {
    pub port: String,
    #[serde(default = "default_serial_baud")]
    pub serial_baud: u32,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Push the `[module]` settings to the radio before entering the gateway loop.
    #[serde(default = "default_apply_on_start")]
    pub apply_on_start: bool,
}

impl RadioLinkConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn default_serial_baud() -> u32 {
    115_200
}

fn default_command_timeout_ms() -> u64 {
    1000
}

fn default_apply_on_start() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Prefix for every published topic, e.g. `home/mailbox/`. When unset nothing is
    /// published and every field counts as delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_root: Option<String>,
    #[serde(default = "generate_client_id")]
    pub client_id: String,
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

/// `LoRaBridge` followed by four random hex digits; brokers drop a session when a second
/// client connects with the same id.
pub fn generate_client_id() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("LoRaBridge{:04x}", suffix)
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            username: None,
            password: None,
            topic_root: None,
            client_id: generate_client_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_display_capacity")]
    pub display_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    20
}

fn default_display_capacity() -> usize {
    16
}

impl GatewayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            display_capacity: default_display_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        if config.broker.client_id.trim().is_empty() {
            config.broker.client_id = generate_client_id();
        }

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Human-readable problems with the loaded values. Empty when everything checks out.
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = validate_radio_settings(&self.module)
            .into_iter()
            .map(|e| format!("[module] {}", e))
            .collect();
        if let Some(root) = self.broker.topic_root.as_deref() {
            if let Err(e) = validate_topic_root(root) {
                problems.push(format!("[broker] {}", e));
            }
        }
        if self.radio.port.trim().is_empty() {
            problems.push("[radio] port is empty".to_string());
        }
        if self.module.module_baud != self.radio.serial_baud {
            problems.push(format!(
                "[radio] serial_baud {} differs from [module] module_baud {}; the link would be lost after AT+IPR",
                self.radio.serial_baud, self.module.module_baud
            ));
        }
        problems
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            radio: RadioLinkConfig {
                port: "/dev/ttyUSB0".to_string(),
                serial_baud: default_serial_baud(),
                command_timeout_ms: default_command_timeout_ms(),
                apply_on_start: default_apply_on_start(),
            },
            module: RadioSettings::default(),
            broker: BrokerConfig {
                topic_root: Some("home/mailbox/".to_string()),
                ..BrokerConfig::default()
            },
            gateway: GatewayConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("lorabridge.log".to_string()),
            },
        }
    }
}
