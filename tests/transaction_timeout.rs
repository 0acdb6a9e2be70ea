// Command transactions against a scripted module.

use lorabridge::radio::mock::MockLink;
use lorabridge::radio::{ChannelState, FrameSender, RadioError, RadioModule};
use std::time::{Duration, Instant};

fn radio(link: MockLink) -> RadioModule<MockLink> {
    RadioModule::new(link).with_command_timeout(Duration::from_millis(40))
}

#[test]
fn silent_module_times_out_with_no_response() {
    let mut r = radio(MockLink::new());
    let start = Instant::now();
    let resp = r.send_transaction("AT+VER?", Duration::from_millis(40)).unwrap();
    assert_eq!(resp, None);
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(r.state(), &ChannelState::Idle);
}

#[test]
fn error_responses_are_returned_verbatim() {
    let mut link = MockLink::new();
    link.reply_to("AT+BOGUS", "+ERR=4");
    let mut r = radio(link);
    assert_eq!(r.command("AT+BOGUS").unwrap().as_deref(), Some("+ERR=4"));
    assert!(!r.expect_ok("AT+BOGUS").unwrap());
}

#[test]
fn getter_without_equals_is_unknown() {
    let mut link = MockLink::new();
    link.reply_to("AT+ADDRESS?", "+OK");
    let mut r = radio(link);
    assert_eq!(r.get_address().unwrap(), None);
}

#[test]
fn getter_returns_text_after_equals() {
    let mut link = MockLink::new();
    link.reply_to("AT+PARAMETER?", "+PARAMETER=9,7,1,12")
        .reply_to("AT+VER?", "+VER=RYLR998_REYAX_V1.2.3");
    let mut r = radio(link);
    assert_eq!(r.get_parameters().unwrap().as_deref(), Some("9,7,1,12"));
    assert_eq!(
        r.firmware_version().unwrap().as_deref(),
        Some("RYLR998_REYAX_V1.2.3")
    );
}

#[test]
fn timed_out_getter_is_unknown() {
    let mut r = radio(MockLink::new());
    assert_eq!(r.get_band().unwrap(), None);
    assert!(!r.set_band(868_000_000).unwrap());
}

#[test]
fn late_response_is_not_mistaken_for_a_frame() {
    let mut link = MockLink::new();
    link.reply_lines("AT+SEND=", &["", r#"+RCV=2,7,{"x":1},-50,4"#, "+OK"]);
    let mut r = radio(link);
    assert!(r.send_frame(2, r#"{"ack":true}"#).unwrap());
    assert_eq!(r.deferred_frames(), 1);
    let doc = r.poll_incoming().unwrap().expect("deferred frame");
    assert_eq!(doc.address(), Some(2));
}

#[test]
fn write_failure_is_an_io_error() {
    let mut link = MockLink::new();
    link.fail_writes(true);
    let mut r = radio(link);
    assert!(matches!(r.command("AT"), Err(RadioError::Io(_))));
    assert_eq!(r.state(), &ChannelState::Idle);
}

#[test]
fn late_reply_to_timed_out_query_is_not_taken_by_the_next_one() {
    let mut link = MockLink::new();
    link.reply_to("AT+BAND?", "+BAND=915000000");
    let mut r = radio(link);
    assert_eq!(r.get_address().unwrap(), None);
    r.link_mut().inject_line("+ADDRESS=7");
    assert_eq!(r.get_band().unwrap().as_deref(), Some("915000000"));
}

#[test]
fn late_ok_does_not_mask_a_refused_send() {
    let mut link = MockLink::new();
    link.reply_to("AT+SEND=", "+ERR=17");
    let mut r = radio(link);
    assert!(!r.set_band(915_000_000).unwrap());
    r.link_mut().inject_line("+OK");
    assert!(!r.send_frame(3, r#"{"ack":true}"#).unwrap());
}

#[test]
fn frame_buffered_before_a_command_is_kept_for_polling() {
    let mut link = MockLink::new();
    link.reply_to("AT", "+OK");
    link.inject_line(r#"+RCV=6,7,{"a":1},-45,7"#);
    let mut r = radio(link);
    assert!(r.test_comm().unwrap());
    assert_eq!(r.deferred_frames(), 1);
    assert_eq!(r.poll_incoming().unwrap().and_then(|d| d.address()), Some(6));
}

#[test]
fn reply_for_a_different_setting_is_unknown() {
    let mut link = MockLink::new();
    link.reply_to("AT+BAND?", "+ADDRESS=7");
    let mut r = radio(link);
    assert_eq!(r.get_band().unwrap(), None);
}
