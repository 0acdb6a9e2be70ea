//! Radio configuration accessors.
//!
//! Each setter is one `AT+<NAME>=<args>` transaction that succeeds only on `+OK`; each
//! getter is the matching `AT+<NAME>?` query returning the text after `=` in the reply.
//! There is no multi-field transaction on the module, so [`RadioModule::apply_settings`]
//! records the outcome of every individual setter in an [`ApplyReport`].
//!
//! | Setting | Command | Range |
//! |---|---|---|
//! | address | `AT+ADDRESS` | 0–65535 |
//! | network id | `AT+NETWORKID` | 3–15 or 18 |
//! | band | `AT+BAND` | frequency in Hz |
//! | RF parameters | `AT+PARAMETER=<sf>,<bw>,<cr>,<preamble>` | see [`RfParameters`] |
//! | password | `AT+CPIN` | 8 hex digits |
//! | RF power | `AT+CRFOP` | 0–22 dBm |
//! | baud rate | `AT+IPR` | UART baud |
//! | mode | `AT+MODE=<0..2>[,<rx ms>,<low ms>]` | see [`WorkMode`] |
use super::{ModuleResponse, RadioError, RadioModule, SerialLink};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_ADDRESS: u16 = 1;
pub const DEFAULT_NETWORK_ID: u8 = 18;
pub const DEFAULT_BAND: u32 = 915_000_000;
pub const DEFAULT_SPREADING_FACTOR: u8 = 8;
pub const DEFAULT_BANDWIDTH: u8 = 7;
pub const DEFAULT_CODING_RATE: u8 = 1;
pub const DEFAULT_PREAMBLE: u8 = 12;
pub const DEFAULT_MODULE_BAUD: u32 = 115_200;

/// Wireless work mode (`AT+MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    Transceiver,
    Sleep,
    /// Smart receiving power-saving mode with active receive and low-power durations (ms).
    SmartReceive { rx_ms: u16, low_speed_ms: u16 },
}

impl WorkMode {
    fn args(&self) -> String {
        match self {
            WorkMode::Transceiver => "0".to_string(),
            WorkMode::Sleep => "1".to_string(),
            WorkMode::SmartReceive { rx_ms, low_speed_ms } => {
                format!("2,{},{}", rx_ms, low_speed_ms)
            }
        }
    }
}

/// Modulation parameters set together by `AT+PARAMETER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfParameters {
    /// 5–11; higher is more sensitive but slower.
    #[serde(default = "default_spreading_factor")]
    pub spreading_factor: u8,
    /// 7 = 125 kHz, 8 = 250 kHz, 9 = 500 kHz.
    #[serde(default = "default_bandwidth")]
    pub bandwidth: u8,
    /// 1 = 4/5 … 4 = 4/8.
    #[serde(default = "default_coding_rate")]
    pub coding_rate: u8,
    /// 4–24 when the network id is 18, otherwise 12.
    #[serde(default = "default_preamble")]
    pub preamble: u8,
}

impl RfParameters {
    fn args(&self) -> String {
        format!(
            "{},{},{},{}",
            self.spreading_factor, self.bandwidth, self.coding_rate, self.preamble
        )
    }
}

impl Default for RfParameters {
    fn default() -> Self {
        Self {
            spreading_factor: DEFAULT_SPREADING_FACTOR,
            bandwidth: DEFAULT_BANDWIDTH,
            coding_rate: DEFAULT_CODING_RATE,
            preamble: DEFAULT_PREAMBLE,
        }
    }
}

/// The module-level configuration pushed at startup or by `configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioSettings {
    #[serde(default = "default_address")]
    pub address: u16,
    #[serde(default = "default_network_id")]
    pub network_id: u8,
    #[serde(default = "default_band")]
    pub band: u32,
    #[serde(flatten)]
    pub parameters: RfParameters,
    /// Domain password, 8 hex digits. Left unchanged on the module when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// RF output power in dBm. Left unchanged on the module when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rf_power: Option<u8>,
    /// UART rate programmed into the module (`AT+IPR`).
    #[serde(default = "default_module_baud")]
    pub module_baud: u32,
}

fn default_address() -> u16 {
    DEFAULT_ADDRESS
}
fn default_network_id() -> u8 {
    DEFAULT_NETWORK_ID
}
fn default_band() -> u32 {
    DEFAULT_BAND
}
fn default_module_baud() -> u32 {
    DEFAULT_MODULE_BAUD
}
fn default_spreading_factor() -> u8 {
    DEFAULT_SPREADING_FACTOR
}
fn default_bandwidth() -> u8 {
    DEFAULT_BANDWIDTH
}
fn default_coding_rate() -> u8 {
    DEFAULT_CODING_RATE
}
fn default_preamble() -> u8 {
    DEFAULT_PREAMBLE
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            network_id: DEFAULT_NETWORK_ID,
            band: DEFAULT_BAND,
            parameters: RfParameters::default(),
            password: None,
            rf_power: None,
            module_baud: DEFAULT_MODULE_BAUD,
        }
    }
}

/// One independently applied setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Address,
    NetworkId,
    Band,
    BaudRate,
    Parameters,
    Password,
    RfPower,
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Setting::Address => "address",
            Setting::NetworkId => "network id",
            Setting::Band => "band",
            Setting::BaudRate => "baud rate",
            Setting::Parameters => "RF parameters",
            Setting::Password => "password",
            Setting::RfPower => "RF power",
        };
        f.write_str(name)
    }
}

/// Per-setting outcome of a bulk reconfiguration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub results: Vec<(Setting, bool)>,
}

impl ApplyReport {
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|(_, ok)| *ok)
    }

    pub fn failed(&self) -> Vec<Setting> {
        self.results
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(s, _)| *s)
            .collect()
    }
}

/// Current module settings as reported by the getters; `None` is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RadioSnapshot {
    pub mode: Option<String>,
    pub band: Option<String>,
    pub parameters: Option<String>,
    pub address: Option<String>,
    pub network_id: Option<String>,
    pub password: Option<String>,
    pub rf_power: Option<String>,
    pub baud_rate: Option<String>,
}

impl<L: SerialLink> RadioModule<L> {
    /// `AT` round trip; true when the module answers `+OK`.
    pub fn test_comm(&mut self) -> Result<bool, RadioError> {
        self.expect_ok("AT")
    }

    pub fn set_mode(&mut self, mode: WorkMode) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+MODE={}", mode.args()))
    }

    pub fn get_mode(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+MODE?")
    }

    pub fn set_band(&mut self, frequency_hz: u32) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+BAND={}", frequency_hz))
    }

    pub fn get_band(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+BAND?")
    }

    pub fn set_parameters(&mut self, params: RfParameters) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+PARAMETER={}", params.args()))
    }

    pub fn get_parameters(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+PARAMETER?")
    }

    pub fn set_address(&mut self, address: u16) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+ADDRESS={}", address))
    }

    pub fn get_address(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+ADDRESS?")
    }

    pub fn set_network_id(&mut self, id: u8) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+NETWORKID={}", id))
    }

    pub fn get_network_id(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+NETWORKID?")
    }

    pub fn set_password(&mut self, password: &str) -> Result<bool, RadioError> {
        if password.contains(['\r', '\n']) {
            return Err(RadioError::PayloadHasLineBreak);
        }
        self.expect_ok(&format!("AT+CPIN={}", password))
    }

    pub fn get_password(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+CPIN?")
    }

    pub fn set_rf_power(&mut self, dbm: u8) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+CRFOP={}", dbm))
    }

    pub fn get_rf_power(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+CRFOP?")
    }

    pub fn set_baud_rate(&mut self, baud: u32) -> Result<bool, RadioError> {
        self.expect_ok(&format!("AT+IPR={}", baud))
    }

    pub fn get_baud_rate(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+IPR?")
    }

    /// Software reset. The module may answer `+OK` or go straight to `+READY`.
    pub fn reset(&mut self) -> Result<bool, RadioError> {
        Ok(match self.command("AT+RESET")? {
            Some(resp) => matches!(
                ModuleResponse::parse(&resp),
                ModuleResponse::Ok | ModuleResponse::Ready
            ),
            None => false,
        })
    }

    pub fn factory_defaults(&mut self) -> Result<bool, RadioError> {
        self.expect_ok("AT+FACTORY")
    }

    pub fn firmware_version(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+VER?")
    }

    pub fn unique_id(&mut self) -> Result<Option<String>, RadioError> {
        self.query("AT+UID?")
    }

    /// Push every configured setting, one transaction each, recording each outcome.
    /// A failed setter does not stop the remaining ones. The baud rate is always last;
    /// when it differs from the link's current rate the caller must reopen the port.
    pub fn apply_settings(&mut self, settings: &RadioSettings) -> Result<ApplyReport, RadioError> {
        let mut report = ApplyReport::default();
        report
            .results
            .push((Setting::Address, self.set_address(settings.address)?));
        report
            .results
            .push((Setting::NetworkId, self.set_network_id(settings.network_id)?));
        report
            .results
            .push((Setting::Band, self.set_band(settings.band)?));
        report.results.push((
            Setting::Parameters,
            self.set_parameters(settings.parameters)?,
        ));
        if let Some(password) = settings.password.as_deref() {
            report
                .results
                .push((Setting::Password, self.set_password(password)?));
        }
        if let Some(power) = settings.rf_power {
            report
                .results
                .push((Setting::RfPower, self.set_rf_power(power)?));
        }
        // The module switches UART rate right after acknowledging, so this goes last.
        report
            .results
            .push((Setting::BaudRate, self.set_baud_rate(settings.module_baud)?));

        if report.all_ok() {
            info!("Applied {} radio settings", report.results.len());
        } else {
            let failed: Vec<String> = report.failed().iter().map(|s| s.to_string()).collect();
            warn!(
                "Radio settings partially applied; module and config disagree on: {}",
                failed.join(", ")
            );
        }
        Ok(report)
    }

    /// Query every getter.
    pub fn read_settings(&mut self) -> Result<RadioSnapshot, RadioError> {
        Ok(RadioSnapshot {
            mode: self.get_mode()?,
            band: self.get_band()?,
            parameters: self.get_parameters()?,
            address: self.get_address()?,
            network_id: self.get_network_id()?,
            password: self.get_password()?,
            rf_power: self.get_rf_power()?,
            baud_rate: self.get_baud_rate()?,
        })
    }
}
