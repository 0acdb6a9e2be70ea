//! Unsolicited receive frames: `+RCV=<address>,<length>,<payload>,<rssi>,<snr>`.
//!
//! The payload is a JSON document and may itself contain commas, so the line is split
//! from both ends: the address and declared length are taken from the left, the SNR and
//! RSSI from the right, and whatever remains in the middle is the payload.
use thiserror::Error;

pub const FRAME_MARKER: &str = "+RCV=";
const DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("line does not start with +RCV=")]
    NotAFrame,

    #[error("frame is missing the {0} field")]
    MissingField(&'static str),

    #[error("frame field {field} is not a valid number: {raw:?}")]
    BadNumber { field: &'static str, raw: String },
}

/// One decoded receive frame, before its payload is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub address: u16,
    /// Length reported by the module; informational only.
    pub declared_length: u32,
    pub payload: String,
    pub rssi: i32,
    pub snr: i32,
}

impl InboundFrame {
    pub fn is_frame(line: &str) -> bool {
        line.starts_with(FRAME_MARKER)
    }

    pub fn parse(line: &str) -> Result<Self, FrameError> {
        let body = line
            .strip_prefix(FRAME_MARKER)
            .ok_or(FrameError::NotAFrame)?;
        let fields = split_fields(body)?;
        Ok(InboundFrame {
            address: parse_number("address", fields.address)?,
            declared_length: parse_number("length", fields.length)?,
            payload: fields.payload.to_string(),
            rssi: parse_number("rssi", fields.rssi)?,
            snr: parse_number("snr", fields.snr)?,
        })
    }
}

/// Raw field slices of a frame body (the text after the marker).
#[derive(Debug, PartialEq, Eq)]
pub struct FrameFields<'a> {
    pub address: &'a str,
    pub length: &'a str,
    pub payload: &'a str,
    pub rssi: &'a str,
    pub snr: &'a str,
}

const TRAILING_PAIR: &str = "rssi/snr";

pub fn split_fields(body: &str) -> Result<FrameFields<'_>, FrameError> {
    let (address, rest) = body
        .split_once(DELIMITER)
        .ok_or(FrameError::MissingField("length"))?;
    let (length, rest) = rest
        .split_once(DELIMITER)
        .ok_or(FrameError::MissingField("payload"))?;
    // Either right split failing leaves the trailing pair incomplete.
    let (rest, snr) = rest
        .rsplit_once(DELIMITER)
        .ok_or(FrameError::MissingField(TRAILING_PAIR))?;
    let (payload, rssi) = rest
        .rsplit_once(DELIMITER)
        .ok_or(FrameError::MissingField(TRAILING_PAIR))?;
    Ok(FrameFields {
        address,
        length,
        payload,
        rssi,
        snr,
    })
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, FrameError> {
    raw.trim().parse().map_err(|_| FrameError::BadNumber {
        field,
        raw: raw.to_string(),
    })
}
