//! Range checks for radio module settings and broker topic roots.
//!
//! The module rejects out-of-range values with `+ERR=4` or `+ERR=18`, which only shows up
//! once the setter runs. Checking here lets `status` and startup warn the operator first.

use crate::radio::RadioSettings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("network id {0} is invalid (3-15 or 18)")]
    NetworkId(u8),

    #[error("band {0} Hz is outside 100 MHz - 1 GHz")]
    Band(u32),

    #[error("spreading factor {0} is invalid (5-11)")]
    SpreadingFactor(u8),

    #[error("bandwidth code {0} is invalid (7-9)")]
    Bandwidth(u8),

    #[error("coding rate {0} is invalid (1-4)")]
    CodingRate(u8),

    #[error("preamble {preamble} is not allowed with network id {network_id}")]
    Preamble { preamble: u8, network_id: u8 },

    #[error("password must be 8 hex digits between 00000001 and FFFFFFFF")]
    Password,

    #[error("RF power {0} dBm is invalid (0-22)")]
    RfPower(u8),

    #[error("baud rate {0} is not supported by the module")]
    BaudRate(u32),

    #[error("topic root {0:?} must end with '/'")]
    TopicRoot(String),
}

const SUPPORTED_BAUD_RATES: &[u32] = &[300, 1200, 4800, 9600, 19200, 28800, 38400, 57600, 115200];

/// Check every field of `settings`, returning all violations (empty when valid).
pub fn validate_radio_settings(settings: &RadioSettings) -> Vec<SettingsError> {
    let mut errors = Vec::new();
    let p = &settings.parameters;

    if !matches!(settings.network_id, 3..=15 | 18) {
        errors.push(SettingsError::NetworkId(settings.network_id));
    }
    if !(100_000_000..=1_000_000_000).contains(&settings.band) {
        errors.push(SettingsError::Band(settings.band));
    }
    if !(5..=11).contains(&p.spreading_factor) {
        errors.push(SettingsError::SpreadingFactor(p.spreading_factor));
    }
    if !(7..=9).contains(&p.bandwidth) {
        errors.push(SettingsError::Bandwidth(p.bandwidth));
    }
    if !(1..=4).contains(&p.coding_rate) {
        errors.push(SettingsError::CodingRate(p.coding_rate));
    }
    let preamble_ok = if settings.network_id == 18 {
        (4..=24).contains(&p.preamble)
    } else {
        p.preamble == 12
    };
    if !preamble_ok {
        errors.push(SettingsError::Preamble {
            preamble: p.preamble,
            network_id: settings.network_id,
        });
    }
    if let Some(pw) = settings.password.as_deref() {
        if !is_valid_password(pw) {
            errors.push(SettingsError::Password);
        }
    }
    if let Some(power) = settings.rf_power {
        if power > 22 {
            errors.push(SettingsError::RfPower(power));
        }
    }
    if !SUPPORTED_BAUD_RATES.contains(&settings.module_baud) {
        errors.push(SettingsError::BaudRate(settings.module_baud));
    }
    errors
}

fn is_valid_password(pw: &str) -> bool {
    pw.len() == 8
        && pw.chars().all(|c| c.is_ascii_hexdigit())
        && u32::from_str_radix(pw, 16).map(|v| v != 0).unwrap_or(false)
}

/// A topic root is concatenated directly with field names, so it must end in `/`.
pub fn validate_topic_root(root: &str) -> Result<(), SettingsError> {
    if root.is_empty() || root.ends_with('/') {
        Ok(())
    } else {
        Err(SettingsError::TopicRoot(root.to_string()))
    }
}
