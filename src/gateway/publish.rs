//! Broker side of the pipeline.
//!
//! [`Publisher`] is the single call the pipeline makes into the broker client; the MQTT
//! implementation lives in `gateway::mqtt`. [`LogPublisher`] stands in for a broker on
//! the console (`start --dry-run`) and [`MemoryPublisher`] records publishes for tests.
use log::info;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("broker not connected")]
    NotConnected,

    #[error("broker rejected publish to {topic}: {reason}")]
    Rejected { topic: String, reason: String },
}

pub trait Publisher {
    /// Publish one payload. `retain` asks the broker to keep it as the topic's last value.
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        (**self).publish(topic, payload, retain)
    }
}

/// Writes every publish to the log and reports success.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        info!(
            "PUBLISH {} {}{}",
            topic,
            payload,
            if retain { " (retained)" } else { "" }
        );
        Ok(())
    }
}

/// A publish captured by [`MemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Keeps publishes in memory; can be told to reject topics or to act disconnected.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Vec<Published>,
    rejected_suffixes: Vec<String>,
    disconnected: bool,
    attempts: usize,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any topic ending with `suffix`.
    pub fn reject_topic(&mut self, suffix: &str) -> &mut Self {
        self.rejected_suffixes.push(suffix.to_string());
        self
    }

    pub fn set_disconnected(&mut self, disconnected: bool) -> &mut Self {
        self.disconnected = disconnected;
        self
    }

    /// Publishes that succeeded, in order.
    pub fn published(&self) -> &[Published] {
        &self.published
    }

    /// Every publish call, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        self.attempts += 1;
        if self.disconnected {
            return Err(PublishError::NotConnected);
        }
        if self.rejected_suffixes.iter().any(|s| topic.ends_with(s.as_str())) {
            return Err(PublishError::Rejected {
                topic: topic.to_string(),
                reason: "topic refused".to_string(),
            });
        }
        self.published.push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_publisher_records_and_rejects() {
        let mut p = MemoryPublisher::new();
        p.reject_topic("/rssi");
        assert!(p.publish("home/battery", "3.41", true).is_ok());
        assert!(matches!(
            p.publish("home/rssi", "-47", true),
            Err(PublishError::Rejected { .. })
        ));
        assert_eq!(p.attempts(), 2);
        assert_eq!(
            p.published(),
            &[Published {
                topic: "home/battery".into(),
                payload: "3.41".into(),
                retain: true
            }]
        );
    }

    #[test]
    fn disconnected_publisher_fails_everything() {
        let mut p = MemoryPublisher::new();
        p.set_disconnected(true);
        assert_eq!(p.publish("a/b", "1", true), Err(PublishError::NotConnected));
        assert!(p.published().is_empty());
    }

    #[test]
    fn boxed_publisher_delegates() {
        let mut p: Box<dyn Publisher> = Box::new(LogPublisher);
        assert!(p.publish("a/b", "1", false).is_ok());
    }
}
