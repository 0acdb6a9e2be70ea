//! # Gateway loop
//!
//! Cooperative scheduler tying the radio driver to the report pipeline. Each
//! [`Gateway::step`] polls the driver once; a decoded document is handed by value to
//! the step, reported, and dropped before the next poll, so no document outlives the
//! step that produced it.
//!
//! ```rust
//! use lorabridge::gateway::{display::DisplayQueue, publish::MemoryPublisher, report::Reporter, Gateway};
//! use lorabridge::radio::{mock::MockLink, RadioModule};
//! use std::time::Duration;
//!
//! let mut link = MockLink::new();
//! link.reply_to("AT+SEND=", "+OK");
//! link.inject_line(r#"+RCV=3,13,{"battery":3.41},-47,12"#);
//!
//! let reporter = Reporter::new(MemoryPublisher::new(), Some("home/".into()), DisplayQueue::new(8));
//! let mut gateway = Gateway::new(RadioModule::new(link), reporter, Duration::from_millis(20));
//! let outcome = gateway.step().unwrap().expect("one frame reported");
//! assert!(outcome.success());
//! ```

pub mod display;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod publish;
pub mod report;

use crate::metrics;
use crate::radio::{RadioError, RadioModule, SerialLink};
use log::{debug, info, warn};
use publish::Publisher;
use report::{ReportOutcome, Reporter};
use std::time::Duration;

pub struct Gateway<L: SerialLink, P: Publisher> {
    radio: RadioModule<L>,
    reporter: Reporter<P>,
    poll_interval: Duration,
}

impl<L: SerialLink, P: Publisher> Gateway<L, P> {
    pub fn new(radio: RadioModule<L>, reporter: Reporter<P>, poll_interval: Duration) -> Self {
        Self {
            radio,
            reporter,
            poll_interval,
        }
    }

    pub fn radio(&self) -> &RadioModule<L> {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut RadioModule<L> {
        &mut self.radio
    }

    pub fn reporter(&self) -> &Reporter<P> {
        &self.reporter
    }

    /// One scheduling step: poll for a frame and, if one decoded, report it.
    pub fn step(&mut self) -> Result<Option<ReportOutcome>, RadioError> {
        let Some(doc) = self.radio.poll_incoming()? else {
            return Ok(None);
        };
        let outcome = self.reporter.report(&doc, &mut self.radio);
        if outcome.success() {
            debug!("Report complete: {} fields", outcome.fields);
        } else {
            warn!(
                "Report incomplete: {}/{} fields delivered, ack {}",
                outcome.published,
                outcome.fields,
                if outcome.acknowledged { "sent" } else { "failed" }
            );
        }
        Ok(Some(outcome))
    }

    /// Step until no complete frame is waiting.
    pub fn drain(&mut self) -> Result<usize, RadioError> {
        let mut reported = 0;
        while self.step()?.is_some() {
            reported += 1;
        }
        Ok(reported)
    }

    /// Run until Ctrl-C or a serial I/O failure, then log the counters.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "Gateway running, polling every {} ms",
            self.poll_interval.as_millis()
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain() {
                        break Err(anyhow::anyhow!("Radio link failed: {}", e));
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break Ok(());
                }
            }
        };

        let snap = metrics::snapshot();
        info!(
            "Shutdown counters: {}",
            serde_json::to_string(&snap).unwrap_or_default()
        );
        if let Some(ratio) = snap.ack_ratio() {
            info!("Acknowledgments accepted: {:.1}%", ratio * 100.0);
        }
        result
    }
}
