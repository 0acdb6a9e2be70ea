//! Classification of the module's response lines.
use std::fmt;

/// Error codes documented for `+ERR=<n>` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleErrorCode {
    MissingLineEnd,
    NotAtCommand,
    UnknownCommand,
    LengthMismatch,
    TxTimeout,
    Crc,
    TxTooLong,
    FlashWrite,
    UnknownFailure,
    TxBusy,
    PreambleNotAllowed,
    RxHeader,
    Other(u16),
}

impl ModuleErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::MissingLineEnd,
            2 => Self::NotAtCommand,
            4 => Self::UnknownCommand,
            5 => Self::LengthMismatch,
            10 => Self::TxTimeout,
            12 => Self::Crc,
            13 => Self::TxTooLong,
            14 => Self::FlashWrite,
            15 => Self::UnknownFailure,
            17 => Self::TxBusy,
            18 => Self::PreambleNotAllowed,
            19 => Self::RxHeader,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::MissingLineEnd => 1,
            Self::NotAtCommand => 2,
            Self::UnknownCommand => 4,
            Self::LengthMismatch => 5,
            Self::TxTimeout => 10,
            Self::Crc => 12,
            Self::TxTooLong => 13,
            Self::FlashWrite => 14,
            Self::UnknownFailure => 15,
            Self::TxBusy => 17,
            Self::PreambleNotAllowed => 18,
            Self::RxHeader => 19,
            Self::Other(c) => *c,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingLineEnd => "command not terminated with CR LF",
            Self::NotAtCommand => "command does not start with AT",
            Self::UnknownCommand => "unknown command or payload length mismatch",
            Self::LengthMismatch => "payload does not match the declared length",
            Self::TxTimeout => "transmission timed out",
            Self::Crc => "CRC error",
            Self::TxTooLong => "payload exceeds 240 bytes",
            Self::FlashWrite => "failed to write flash memory",
            Self::UnknownFailure => "unknown failure",
            Self::TxBusy => "previous transmission not completed",
            Self::PreambleNotAllowed => "preamble value not allowed",
            Self::RxHeader => "receive failed, header error",
            Self::Other(_) => "undocumented error",
        }
    }
}

impl fmt::Display for ModuleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERR={} ({})", self.code(), self.description())
    }
}

/// One response line from the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResponse {
    Ok,
    Ready,
    Error(ModuleErrorCode),
    /// `+NAME=value`, e.g. a query echo such as `+ADDRESS=1`.
    Value { name: String, value: String },
    Other(String),
}

impl ModuleResponse {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "+OK" => return ModuleResponse::Ok,
            "+READY" => return ModuleResponse::Ready,
            _ => {}
        }
        if let Some(code) = line.strip_prefix("+ERR=") {
            return match code.trim().parse::<u16>() {
                Ok(c) => ModuleResponse::Error(ModuleErrorCode::from_code(c)),
                Err(_) => ModuleResponse::Other(line.to_string()),
            };
        }
        if let Some(rest) = line.strip_prefix('+') {
            if let Some((name, value)) = rest.split_once('=') {
                return ModuleResponse::Value {
                    name: name.to_string(),
                    value: value.to_string(),
                };
            }
        }
        ModuleResponse::Other(line.to_string())
    }
}

/// The `<NAME>` of a query command `AT+<NAME>?`.
pub fn query_name(command: &str) -> Option<&str> {
    command.trim().strip_prefix("AT+")?.strip_suffix('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_generic_responses() {
        assert_eq!(ModuleResponse::parse("+OK"), ModuleResponse::Ok);
        assert_eq!(ModuleResponse::parse(" +READY "), ModuleResponse::Ready);
        assert_eq!(
            ModuleResponse::parse("+ERR=13"),
            ModuleResponse::Error(ModuleErrorCode::TxTooLong)
        );
        assert_eq!(
            ModuleResponse::parse("+PARAMETER=9,7,1,12"),
            ModuleResponse::Value {
                name: "PARAMETER".into(),
                value: "9,7,1,12".into()
            }
        );
        assert_eq!(
            ModuleResponse::parse("garbage"),
            ModuleResponse::Other("garbage".into())
        );
    }

    #[test]
    fn unknown_error_codes_stay_numeric() {
        let r = ModuleResponse::parse("+ERR=42");
        assert_eq!(r, ModuleResponse::Error(ModuleErrorCode::Other(42)));
        if let ModuleResponse::Error(code) = r {
            assert_eq!(code.code(), 42);
            assert_eq!(code.to_string(), "ERR=42 (undocumented error)");
        }
    }

    #[test]
    fn error_codes_round_trip() {
        for c in [1u16, 2, 4, 5, 10, 12, 13, 14, 15, 17, 18, 19] {
            assert_eq!(ModuleErrorCode::from_code(c).code(), c);
        }
    }

    #[test]
    fn query_name_strips_command_syntax() {
        assert_eq!(query_name("AT+ADDRESS?"), Some("ADDRESS"));
        assert_eq!(query_name("AT+VER?"), Some("VER"));
        assert_eq!(query_name("AT+BAND=915000000"), None);
        assert_eq!(query_name("AT"), None);
    }
}
