//! Report/acknowledge pipeline.
//!
//! [`Reporter::report`] publishes every field of a decoded document to
//! `<topic root><field name>` (retained), then sends `{"ack":true}` or `{"ack":false}`
//! back to the document's originating address. Publish failures are counted and logged
//! but never stop the remaining fields, and nothing is retried here.
use super::display::DisplayQueue;
use super::publish::Publisher;
use crate::logutil::truncate_for_log;
use crate::metrics;
use crate::radio::FrameSender;
use crate::telemetry::{TelemetryDocument, TelemetryValue};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;

/// What one `report` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    /// Fields in the document, metadata included.
    pub fields: usize,
    /// Fields counted as delivered.
    pub published: usize,
    /// Every field was delivered; this is the value acknowledged to the peer.
    pub publish_ok: bool,
    /// The module accepted the acknowledgment for transmission.
    pub acknowledged: bool,
}

impl ReportOutcome {
    pub fn success(&self) -> bool {
        self.publish_ok && self.acknowledged
    }
}

/// Minimum width for a float printed with two decimals: integer digits, the decimal
/// point and two decimals, plus one for a minus sign.
pub fn float_field_width(value: f64) -> usize {
    if !value.is_finite() {
        return 0;
    }
    let integer_digits = format!("{:.0}", value.abs().trunc()).len();
    integer_digits + 3 + usize::from(value.is_sign_negative() && value != 0.0)
}

/// Render a value the way it is published.
pub fn format_value(value: &TelemetryValue) -> String {
    match value {
        TelemetryValue::Text(s) => s.clone(),
        TelemetryValue::Integer(i) => i.to_string(),
        TelemetryValue::Bool(b) => b.to_string(),
        TelemetryValue::Float(f) => {
            let width = float_field_width(*f);
            format!("{:width$.2}", f, width = width)
        }
    }
}

/// The acknowledgment text sent back to the radio peer.
pub fn ack_text(ok: bool) -> String {
    json!({ "ack": ok }).to_string()
}

pub struct Reporter<P: Publisher> {
    publisher: P,
    topic_root: Option<String>,
    display: DisplayQueue,
}

impl<P: Publisher> Reporter<P> {
    /// An empty `topic_root` is treated the same as none.
    pub fn new(publisher: P, topic_root: Option<String>, display: DisplayQueue) -> Self {
        let topic_root = topic_root.filter(|r| !r.is_empty());
        Self {
            publisher,
            topic_root,
            display,
        }
    }

    pub fn topic_root(&self) -> Option<&str> {
        self.topic_root.as_deref()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn display(&self) -> &DisplayQueue {
        &self.display
    }

    /// Publish every field, then acknowledge the outcome to the sender.
    ///
    /// The document is only read, so reporting the same document twice runs two full
    /// publish and acknowledge cycles.
    pub fn report<S: FrameSender>(
        &mut self,
        doc: &TelemetryDocument,
        radio: &mut S,
    ) -> ReportOutcome {
        info!("Reporting {}", truncate_for_log(&doc.to_json_string(), 300));

        let mut published = 0usize;
        for (name, value) in doc.iter() {
            let formatted = format_value(value);
            self.display.push(format!("{}:{}", name, formatted));

            let Some(root) = self.topic_root.as_deref() else {
                published += 1;
                continue;
            };
            let topic = format!("{}{}", root, name);
            match self.publisher.publish(&topic, &formatted, true) {
                Ok(()) => {
                    debug!("Published {} = {}", topic, formatted);
                    metrics::inc_publish_ok();
                    published += 1;
                }
                Err(e) => {
                    warn!("Failed publishing {}: {}", topic, e);
                    metrics::inc_publish_failed();
                }
            }
        }

        let publish_ok = published >= doc.len();
        let acknowledged = self.acknowledge(doc, publish_ok, radio);
        ReportOutcome {
            fields: doc.len(),
            published,
            publish_ok,
            acknowledged,
        }
    }

    /// Send `{"ack":<ok>}` to the document's address. Returns whether the module accepted
    /// the send; a document with no usable address is an ack failure.
    pub fn acknowledge<S: FrameSender>(
        &mut self,
        doc: &TelemetryDocument,
        ok: bool,
        radio: &mut S,
    ) -> bool {
        let Some(address) = doc.address() else {
            warn!("Cannot acknowledge: document has no sender address");
            metrics::inc_acks_failed();
            return false;
        };
        let text = ack_text(ok);
        match radio.send_frame(address, &text) {
            Ok(true) => {
                debug!("Acknowledged {} to address {}", text, address);
                metrics::inc_acks_sent();
                true
            }
            Ok(false) => {
                warn!("Radio did not accept acknowledgment to address {}", address);
                metrics::inc_acks_failed();
                false
            }
            Err(e) => {
                warn!("Failed sending acknowledgment to address {}: {}", address, e);
                metrics::inc_acks_failed();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::publish::MemoryPublisher;
    use crate::radio::RadioError;

    /// Records acknowledgments instead of talking to a module.
    #[derive(Default)]
    struct AckRecorder {
        sent: Vec<(u16, String)>,
        accept: bool,
    }

    impl FrameSender for AckRecorder {
        fn send_frame(&mut self, address: u16, text: &str) -> Result<bool, RadioError> {
            self.sent.push((address, text.to_string()));
            Ok(self.accept)
        }
    }

    fn accepting() -> AckRecorder {
        AckRecorder {
            accept: true,
            ..AckRecorder::default()
        }
    }

    fn sample_doc() -> TelemetryDocument {
        let mut doc =
            TelemetryDocument::from_json(r#"{"distance":812,"ispresent":true,"battery":3.4}"#)
                .unwrap();
        doc.insert("address", 3i64).unwrap();
        doc
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_value(&TelemetryValue::Float(3.4)), "3.40");
        assert_eq!(format_value(&TelemetryValue::Float(-12.5)), "-12.50");
        assert_eq!(format_value(&TelemetryValue::Float(1000.0)), "1000.00");
        assert_eq!(format_value(&TelemetryValue::Float(0.004)), "0.00");
        assert_eq!(float_field_width(-12.5), 6);
        assert_eq!(float_field_width(1000.0), 7);
    }

    #[test]
    fn scalar_formatting() {
        assert_eq!(format_value(&TelemetryValue::Integer(-47)), "-47");
        assert_eq!(format_value(&TelemetryValue::Bool(false)), "false");
        assert_eq!(format_value(&TelemetryValue::Text("YES".into())), "YES");
    }

    #[test]
    fn publishes_each_field_then_acks() {
        let mut reporter = Reporter::new(
            MemoryPublisher::new(),
            Some("home/mailbox/".into()),
            DisplayQueue::new(8),
        );
        let mut radio = accepting();
        let outcome = reporter.report(&sample_doc(), &mut radio);
        assert!(outcome.success());
        assert_eq!(outcome.fields, 4);
        let topics: Vec<_> = reporter
            .publisher()
            .published()
            .iter()
            .map(|p| (p.topic.as_str(), p.payload.as_str(), p.retain))
            .collect();
        assert_eq!(
            topics,
            vec![
                ("home/mailbox/distance", "812", true),
                ("home/mailbox/ispresent", "true", true),
                ("home/mailbox/battery", "3.40", true),
                ("home/mailbox/address", "3", true),
            ]
        );
        assert_eq!(radio.sent, vec![(3, r#"{"ack":true}"#.to_string())]);
        assert_eq!(reporter.display().latest(), Some("address:3"));
    }

    #[test]
    fn one_failed_publish_does_not_stop_the_rest() {
        let mut publisher = MemoryPublisher::new();
        publisher.reject_topic("/ispresent");
        let mut reporter = Reporter::new(publisher, Some("t/".into()), DisplayQueue::new(8));
        let mut radio = accepting();
        let outcome = reporter.report(&sample_doc(), &mut radio);
        assert_eq!(reporter.publisher().attempts(), 4);
        assert_eq!(outcome.published, 3);
        assert!(!outcome.publish_ok);
        assert!(outcome.acknowledged);
        assert!(!outcome.success());
        assert_eq!(radio.sent[0].1, r#"{"ack":false}"#);
    }

    #[test]
    fn missing_root_counts_as_delivered() {
        let mut reporter = Reporter::new(MemoryPublisher::new(), Some(String::new()), DisplayQueue::new(8));
        assert_eq!(reporter.topic_root(), None);
        let mut radio = accepting();
        let outcome = reporter.report(&sample_doc(), &mut radio);
        assert!(outcome.success());
        assert_eq!(reporter.publisher().attempts(), 0);
    }

    #[test]
    fn ack_without_address_fails_without_sending() {
        let mut reporter = Reporter::new(MemoryPublisher::new(), None, DisplayQueue::new(8));
        let mut radio = accepting();
        let doc = TelemetryDocument::from_json(r#"{"battery":3.3}"#).unwrap();
        let outcome = reporter.report(&doc, &mut radio);
        assert!(outcome.publish_ok);
        assert!(!outcome.acknowledged);
        assert!(radio.sent.is_empty());
    }

    #[test]
    fn rejected_ack_is_reported() {
        let mut reporter = Reporter::new(MemoryPublisher::new(), None, DisplayQueue::new(8));
        let mut radio = AckRecorder::default();
        assert!(!reporter.acknowledge(&sample_doc(), true, &mut radio));
        assert_eq!(radio.sent.len(), 1);
    }
}
