//! # LoRaBridge - RYLR998 LoRa to MQTT gateway
//!
//! LoRaBridge receives sensor telemetry from battery powered LoRa nodes through a
//! REYAX RYLR998 module on a serial port, republishes every telemetry field to an MQTT
//! broker and acknowledges each report back to the sending node.
//!
//! ## Features
//!
//! - **AT command driver**: blocking command transactions with timeouts, sharing one
//!   half-duplex serial channel with unsolicited `+RCV` frames.
//! - **Frame decoding**: JSON payloads that may contain commas are recovered by splitting
//!   two fields from the left and two from the right.
//! - **Report pipeline**: one retained publish per field, then a `{"ack":bool}` frame
//!   back to the sender.
//! - **Radio configuration**: every module setting readable and settable, with range
//!   validation before anything is written.
//! - **MQTT publishing** (feature `mqtt`): a `rumqttc` client built from `[broker]`,
//!   reconnecting in the background.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lorabridge::config::Config;
//! use lorabridge::gateway::{display::DisplayQueue, publish::LogPublisher, report::Reporter, Gateway};
//! use lorabridge::radio::{open_serial, RadioModule};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let port = open_serial(&config.radio.port, config.radio.serial_baud)?;
//!     let radio = RadioModule::new(port).with_command_timeout(config.radio.command_timeout());
//!     let reporter = Reporter::new(
//!         LogPublisher,
//!         config.broker.topic_root.clone(),
//!         DisplayQueue::new(config.gateway.display_capacity),
//!     );
//!     Gateway::new(radio, reporter, config.gateway.poll_interval()).run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`radio`] - serial transport driver, frame parsing and module settings
//! - [`telemetry`] - the ordered telemetry document decoded from each frame
//! - [`gateway`] - report/acknowledge pipeline and the polling loop
//! - [`config`] - TOML configuration
//! - [`validation`] - radio setting range checks
//!
//! ```text
//! serial bytes ─► radio (framer ─► +RCV split ─► TelemetryDocument)
//!                                                   │
//!                           gateway::report ◄───────┘
//!                             │            │
//!                     broker publishes   {"ack":bool} ─► radio ─► serial bytes
//! ```

pub mod config;
pub mod gateway;
pub mod logutil;
pub mod metrics;
pub mod radio;
pub mod telemetry;
pub mod validation;
