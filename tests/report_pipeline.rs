// End-to-end report/acknowledge cycles through the driver.

use lorabridge::gateway::display::DisplayQueue;
use lorabridge::gateway::publish::MemoryPublisher;
use lorabridge::gateway::report::Reporter;
use lorabridge::gateway::Gateway;
use lorabridge::radio::mock::MockLink;
use lorabridge::radio::{decode_frame, RadioModule};
use std::time::Duration;

const FRAME: &str = r#"+RCV=3,40,{"distance":812,"ispresent":1,"battery":3.4},-47,12"#;

fn radio_with_ack(reply: &str) -> RadioModule<MockLink> {
    let mut link = MockLink::new();
    link.reply_to("AT+SEND=", reply);
    RadioModule::new(link).with_command_timeout(Duration::from_millis(30))
}

fn reporter(root: Option<&str>) -> Reporter<MemoryPublisher> {
    Reporter::new(
        MemoryPublisher::new(),
        root.map(str::to_string),
        DisplayQueue::new(16),
    )
}

#[test]
fn every_field_published_once_then_one_ack() {
    let (_, doc) = decode_frame(FRAME).unwrap();
    let mut radio = radio_with_ack("+OK");
    let mut rep = reporter(Some("home/mailbox/"));
    let outcome = rep.report(&doc, &mut radio);

    assert!(outcome.success());
    assert_eq!(rep.publisher().published().len(), doc.len());
    let payloads: Vec<(&str, &str)> = rep
        .publisher()
        .published()
        .iter()
        .map(|p| (p.topic.as_str(), p.payload.as_str()))
        .collect();
    assert_eq!(
        payloads,
        vec![
            ("home/mailbox/distance", "812"),
            ("home/mailbox/ispresent", "1"),
            ("home/mailbox/battery", "3.40"),
            ("home/mailbox/address", "3"),
            ("home/mailbox/length", "40"),
            ("home/mailbox/rssi", "-47"),
            ("home/mailbox/snr", "12"),
        ]
    );
    assert!(rep.publisher().published().iter().all(|p| p.retain));
    assert_eq!(
        radio.link().written_matching("AT+SEND="),
        vec![r#"AT+SEND=3,12,{"ack":true}"#]
    );
}

#[test]
fn broker_outage_still_acknowledges_false() {
    let (_, doc) = decode_frame(FRAME).unwrap();
    let mut radio = radio_with_ack("+OK");
    let mut rep = reporter(Some("t/"));
    rep.publisher_mut().set_disconnected(true);
    let outcome = rep.report(&doc, &mut radio);

    assert_eq!(rep.publisher().attempts(), doc.len());
    assert_eq!(outcome.published, 0);
    assert!(!outcome.success());
    assert_eq!(
        radio.link().written_matching("AT+SEND="),
        vec![r#"AT+SEND=3,13,{"ack":false}"#]
    );
}

#[test]
fn no_topic_root_reports_success() {
    let (_, doc) = decode_frame(FRAME).unwrap();
    let mut radio = radio_with_ack("+OK");
    let mut rep = reporter(None);
    let outcome = rep.report(&doc, &mut radio);
    assert!(outcome.success());
    assert_eq!(outcome.published, doc.len());
    assert_eq!(rep.publisher().attempts(), 0);
}

#[test]
fn rejected_ack_fails_the_report_without_republishing() {
    let (_, doc) = decode_frame(FRAME).unwrap();
    let mut radio = radio_with_ack("+ERR=17");
    let mut rep = reporter(Some("t/"));
    let outcome = rep.report(&doc, &mut radio);
    assert!(outcome.publish_ok);
    assert!(!outcome.acknowledged);
    assert!(!outcome.success());
    assert_eq!(rep.publisher().attempts(), doc.len());
}

#[test]
fn reporting_twice_runs_two_full_cycles() {
    let (_, doc) = decode_frame(FRAME).unwrap();
    let before = doc.clone();
    let mut radio = radio_with_ack("+OK");
    let mut rep = reporter(Some("t/"));
    assert!(rep.report(&doc, &mut radio).success());
    assert!(rep.report(&doc, &mut radio).success());
    assert_eq!(doc, before);
    assert_eq!(rep.publisher().published().len(), 2 * doc.len());
    assert_eq!(radio.link().written_matching("AT+SEND=").len(), 2);
}

#[test]
fn gateway_step_polls_reports_and_acks() {
    let mut link = MockLink::new();
    link.reply_to("AT+SEND=", "+OK");
    link.inject_line(FRAME);
    let radio = RadioModule::new(link).with_command_timeout(Duration::from_millis(30));
    let mut gw = Gateway::new(radio, reporter(Some("t/")), Duration::from_millis(5));

    let outcome = gw.step().unwrap().expect("frame reported");
    assert!(outcome.success());
    assert_eq!(outcome.fields, 7);
    assert_eq!(gw.step().unwrap(), None);
    assert_eq!(gw.reporter().display().latest(), Some("snr:12"));
}
