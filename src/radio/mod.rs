//! # RYLR998 Radio Transport Driver
//!
//! This module owns the serial channel to a RYLR998 LoRa module. The channel carries two
//! kinds of traffic that must never interleave:
//!
//! - **Command transactions**: `AT+<NAME>[=<args>]\r\n` written by us, answered by exactly
//!   one response line (`+OK`, `+ERR=<n>`, `+<NAME>=<value>`). There are no request ids;
//!   a response is correlated with its command purely by ordering.
//! - **Unsolicited frames**: `+RCV=<address>,<length>,<payload>,<rssi>,<snr>` lines pushed
//!   by the module whenever a peer transmits. The payload is a JSON object.
//!
//! ## Channel discipline
//!
//! [`RadioModule`] tracks a [`ChannelState`]. While a transaction is awaiting its response
//! the state is `AwaitingResponse` and both a second transaction and frame polling are
//! rejected with [`RadioError::ChannelBusy`]. A `+RCV` line that shows up while waiting is
//! never taken as the response; it is queued and returned by the next
//! [`RadioModule::poll_incoming`].
//!
//! ## Usage
//!
//! ```rust
//! use lorabridge::radio::{mock::MockLink, RadioModule};
//!
//! let mut link = MockLink::new();
//! link.reply_to("AT+ADDRESS?", "+ADDRESS=1");
//! link.inject_line(r#"+RCV=3,13,{"battery":3.41},-47,12"#);
//!
//! let mut radio = RadioModule::new(link);
//! assert_eq!(radio.get_address().unwrap().as_deref(), Some("1"));
//!
//! let doc = radio.poll_incoming().unwrap().expect("frame decoded");
//! assert_eq!(doc.address(), Some(3));
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [radio]
//! port = "/dev/ttyUSB0"
//! serial_baud = 115200
//! command_timeout_ms = 1000
//! ```

use crate::logutil::{escape_log, hex_snippet, truncate_for_log};
use crate::metrics;
use crate::telemetry::{
    DocumentError, TelemetryDocument, FIELD_ADDRESS, FIELD_LENGTH, FIELD_RSSI, FIELD_SNR,
};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod commands;
pub mod frame;
pub mod framer;
pub mod mock;
pub mod response;

pub use commands::{ApplyReport, RadioSettings, RadioSnapshot, RfParameters, Setting, WorkMode};
pub use frame::{FrameError, InboundFrame};
pub use framer::LineFramer;
pub use response::{ModuleErrorCode, ModuleResponse};

/// Default wait for a command response.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);
/// Largest payload the module accepts in one `AT+SEND`.
pub const MAX_SEND_PAYLOAD: usize = 240;
/// Sleep between channel checks while a transaction waits for its response.
const TRANSACTION_POLL_INTERVAL: Duration = Duration::from_millis(5);
const LINE_TERMINATOR: &str = "\r\n";
const READ_CHUNK: usize = 256;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serial channel busy: awaiting response to {command}")]
    ChannelBusy { command: String },

    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("payload contains a line terminator")]
    PayloadHasLineBreak,
}

/// Why an inbound line did not become a telemetry document.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    #[error("undecodable payload: {0}")]
    Payload(#[from] DocumentError),
}

/// Byte-level access to the serial channel. Implemented for real serial ports and for
/// [`mock::MockLink`].
pub trait SerialLink {
    /// Write all bytes and flush.
    fn send_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is immediately available into `buf`, returning 0 when nothing is.
    /// Must not block waiting for data.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

#[cfg(feature = "serial")]
impl SerialLink for Box<dyn serialport::SerialPort> {
    fn send_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        io::Write::write_all(self, data)?;
        io::Write::flush(self)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 {
            return Ok(0);
        }
        let want = available.min(buf.len());
        match io::Read::read(self, &mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Open the module's serial port with the settings the RYLR998 expects (8N1).
#[cfg(feature = "serial")]
pub fn open_serial(port_name: &str, baud_rate: u32) -> anyhow::Result<Box<dyn serialport::SerialPort>> {
    use anyhow::anyhow;

    info!("Opening radio serial port {} at {} baud", port_name, baud_rate);
    let mut builder = serialport::new(port_name, baud_rate).timeout(Duration::from_millis(50));
    #[cfg(unix)]
    {
        builder = builder
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None);
    }
    let mut port = builder
        .open()
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;
    // Let the module finish any boot banner, then discard it.
    std::thread::sleep(Duration::from_millis(150));
    let mut purge_buf = [0u8; 512];
    let purged = port.read_available(&mut purge_buf).unwrap_or(0);
    debug!("Serial port ready, discarded {} startup bytes", purged);
    Ok(port)
}

/// Ownership state of the serial channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    AwaitingResponse { command: String },
}

/// Something that can hand a text frame to the radio for transmission.
pub trait FrameSender {
    /// Submit `text` for transmission to `address`. `Ok(true)` means the module accepted
    /// the send; it says nothing about the peer receiving it.
    fn send_frame(&mut self, address: u16, text: &str) -> Result<bool, RadioError>;
}

/// Driver for one RYLR998 module on a serial link.
pub struct RadioModule<L: SerialLink> {
    link: L,
    framer: LineFramer,
    state: ChannelState,
    deferred_frames: VecDeque<String>,
    command_timeout: Duration,
}

impl<L: SerialLink> RadioModule<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            framer: LineFramer::new(),
            state: ChannelState::Idle,
            deferred_frames: VecDeque::new(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Frames received during a transaction and not yet handed out.
    pub fn deferred_frames(&self) -> usize {
        self.deferred_frames.len()
    }

    fn ensure_idle(&self) -> Result<(), RadioError> {
        match &self.state {
            ChannelState::Idle => Ok(()),
            ChannelState::AwaitingResponse { command } => Err(RadioError::ChannelBusy {
                command: command.clone(),
            }),
        }
    }

    /// Move every byte the link has ready into the line framer.
    fn fill(&mut self) -> Result<usize, RadioError> {
        let mut total = 0;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = match self.link.read_available(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    debug!("Serial read interrupted (EINTR)");
                    0
                }
                Err(e) => return Err(RadioError::Io(e)),
            };
            if n == 0 {
                break;
            }
            trace!("RAW {} bytes: {}", n, hex_snippet(&chunk[..n], 64));
            self.framer.push(&chunk[..n]);
            total += n;
        }
        Ok(total)
    }

    /// Run one command transaction: write `command`, then wait up to `timeout` for the
    /// first response line.
    ///
    /// Returns `Ok(None)` on timeout. Error responses such as `+ERR=4` are returned
    /// verbatim; classifying them is up to the caller.
    pub fn send_transaction(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Option<String>, RadioError> {
        self.ensure_idle()?;
        self.discard_stale_lines(command)?;
        debug!("Sending radio command: {}", escape_log(command));
        let mut line = String::with_capacity(command.len() + LINE_TERMINATOR.len());
        line.push_str(command);
        line.push_str(LINE_TERMINATOR);
        self.link.send_bytes(line.as_bytes())?;

        self.state = ChannelState::AwaitingResponse {
            command: command.to_string(),
        };
        let result = self.await_response(command, timeout);
        self.state = ChannelState::Idle;
        result
    }

    /// Clear complete lines left over from earlier traffic so they cannot be read as the
    /// response to `command`. Frames among them are kept for the next poll.
    fn discard_stale_lines(&mut self, command: &str) -> Result<(), RadioError> {
        self.fill()?;
        while let Some(line) = self.framer.next_line() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if InboundFrame::is_frame(trimmed) {
                self.deferred_frames.push_back(trimmed.to_string());
                continue;
            }
            debug!(
                "Discarding stale radio line before {}: {}",
                escape_log(command),
                escape_log(trimmed)
            );
        }
        if self.framer.has_partial() {
            debug!(
                "Starting {} with {} bytes of an incomplete line buffered",
                escape_log(command),
                self.framer.buffered()
            );
        }
        Ok(())
    }

    fn await_response(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Option<String>, RadioError> {
        let start = Instant::now();
        loop {
            while let Some(line) = self.framer.next_line() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if InboundFrame::is_frame(trimmed) {
                    debug!(
                        "Deferring frame received while awaiting response to {}",
                        escape_log(command)
                    );
                    self.deferred_frames.push_back(trimmed.to_string());
                    continue;
                }
                debug!(
                    "Radio response to {}: {}",
                    escape_log(command),
                    escape_log(trimmed)
                );
                return Ok(Some(trimmed.to_string()));
            }
            if start.elapsed() >= timeout {
                warn!(
                    "No response to {} within {} ms",
                    escape_log(command),
                    timeout.as_millis()
                );
                metrics::inc_transaction_timeouts();
                return Ok(None);
            }
            if self.fill()? == 0 {
                std::thread::sleep(TRANSACTION_POLL_INTERVAL);
            }
        }
    }

    /// Transaction with the configured default timeout.
    pub fn command(&mut self, command: &str) -> Result<Option<String>, RadioError> {
        let timeout = self.command_timeout;
        self.send_transaction(command, timeout)
    }

    /// Run `command` and report whether the module answered `+OK`.
    pub fn expect_ok(&mut self, command: &str) -> Result<bool, RadioError> {
        match self.command(command)? {
            None => Ok(false),
            Some(resp) => match ModuleResponse::parse(&resp) {
                ModuleResponse::Ok => Ok(true),
                ModuleResponse::Error(code) => {
                    warn!("Radio rejected {}: {}", escape_log(command), code);
                    Ok(false)
                }
                other => {
                    warn!(
                        "Unexpected response to {}: {:?}",
                        escape_log(command),
                        other
                    );
                    Ok(false)
                }
            },
        }
    }

    /// Run a query command and return the value after `=` in its response.
    /// `None` means unknown: a timeout, an error response, no `=` in the reply, or a
    /// reply naming a different setting than `AT+<NAME>?` asked for.
    pub fn query(&mut self, command: &str) -> Result<Option<String>, RadioError> {
        let Some(resp) = self.command(command)? else {
            return Ok(None);
        };
        match ModuleResponse::parse(&resp) {
            ModuleResponse::Value { name, value } => match response::query_name(command) {
                Some(expected) if expected != name => {
                    warn!(
                        "Radio answered {} with +{}; treating value as unknown",
                        escape_log(command),
                        escape_log(&name)
                    );
                    Ok(None)
                }
                _ => Ok(Some(value.trim().to_string())),
            },
            ModuleResponse::Error(code) => {
                warn!("Radio query {} failed: {}", escape_log(command), code);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Check for one inbound frame without waiting.
    ///
    /// Returns `Ok(Some(doc))` when a complete `+RCV` line was decoded. Malformed frames
    /// and undecodable payloads are logged and reported as `Ok(None)`. Other complete
    /// lines (late responses, `+READY` after a reset) are logged and skipped; a partial
    /// line stays buffered.
    pub fn poll_incoming(&mut self) -> Result<Option<TelemetryDocument>, RadioError> {
        self.ensure_idle()?;
        if let Some(line) = self.deferred_frames.pop_front() {
            return Ok(self.decode_logged(&line));
        }
        self.fill()?;
        while let Some(line) = self.framer.next_line() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if InboundFrame::is_frame(trimmed) {
                return Ok(self.decode_logged(trimmed));
            }
            debug!("Ignoring unsolicited radio line: {}", escape_log(trimmed));
        }
        Ok(None)
    }

    fn decode_logged(&self, line: &str) -> Option<TelemetryDocument> {
        info!("Received from radio: {}", truncate_for_log(line, 300));
        match decode_frame(line) {
            Ok((frame, doc)) => {
                debug!(
                    "Decoded {} fields from address {} (rssi {} snr {})",
                    doc.len(),
                    frame.address,
                    frame.rssi,
                    frame.snr
                );
                metrics::inc_frames_decoded();
                Some(doc)
            }
            Err(e) => {
                warn!("Dropping frame: {}", e);
                metrics::inc_frames_rejected();
                None
            }
        }
    }
}

impl<L: SerialLink> FrameSender for RadioModule<L> {
    fn send_frame(&mut self, address: u16, text: &str) -> Result<bool, RadioError> {
        if text.contains(['\r', '\n']) {
            return Err(RadioError::PayloadHasLineBreak);
        }
        let len = text.len();
        if len > MAX_SEND_PAYLOAD {
            return Err(RadioError::PayloadTooLarge {
                len,
                max: MAX_SEND_PAYLOAD,
            });
        }
        let command = format!("AT+SEND={},{},{}", address, len, text);
        self.expect_ok(&command)
    }
}

/// Split a `+RCV` line, decode its JSON payload and merge the link metadata into it.
pub fn decode_frame(line: &str) -> Result<(InboundFrame, TelemetryDocument), DecodeError> {
    let frame = InboundFrame::parse(line)?;
    let mut doc = TelemetryDocument::from_json(&frame.payload)?;
    doc.insert(FIELD_ADDRESS, i64::from(frame.address))?;
    doc.insert(FIELD_LENGTH, i64::from(frame.declared_length))?;
    doc.insert(FIELD_RSSI, i64::from(frame.rssi))?;
    doc.insert(FIELD_SNR, i64::from(frame.snr))?;
    Ok((frame, doc))
}
