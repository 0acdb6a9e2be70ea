// Receive-frame splitting and decoding through the driver.

use lorabridge::radio::frame::split_fields;
use lorabridge::radio::mock::MockLink;
use lorabridge::radio::{decode_frame, DecodeError, FrameError, InboundFrame, RadioModule};
use lorabridge::telemetry::TelemetryValue;

#[test]
fn payload_with_commas_is_recovered_from_the_middle() {
    let f = InboundFrame::parse(r#"+RCV=3,46,{"a":1,"b":2},-47,12"#).unwrap();
    assert_eq!(f.address, 3);
    assert_eq!(f.declared_length, 46);
    assert_eq!(f.payload, r#"{"a":1,"b":2}"#);
    assert_eq!(f.rssi, -47);
    assert_eq!(f.snr, 12);
}

#[test]
fn nested_payload_keeps_inner_delimiters() {
    let fields = split_fields(r#"12,30,{"v":[1,2,3],"s":"x,y"},-100,-5"#).unwrap();
    assert_eq!(fields.address, "12");
    assert_eq!(fields.payload, r#"{"v":[1,2,3],"s":"x,y"}"#);
    assert_eq!(fields.rssi, "-100");
    assert_eq!(fields.snr, "-5");
}

#[test]
fn fewer_than_four_delimiters_is_a_parse_failure() {
    assert!(matches!(
        InboundFrame::parse("+RCV=1,2,3,4"),
        Err(FrameError::MissingField(_))
    ));
    assert!(InboundFrame::parse("+RCV=1").is_err());
    assert!(InboundFrame::parse("+RCV=").is_err());
}

#[test]
fn non_numeric_metadata_rejects_the_frame() {
    let err = InboundFrame::parse(r#"+RCV=abc,7,{"a":1},-40,9"#).unwrap_err();
    assert_eq!(
        err,
        FrameError::BadNumber {
            field: "address",
            raw: "abc".to_string()
        }
    );
}

#[test]
fn decoded_document_orders_payload_before_metadata() {
    let (_, doc) = decode_frame(r#"+RCV=3,40,{"distance":812,"ispresent":1,"battery":3.41},-47,12"#)
        .unwrap();
    let keys: Vec<&str> = doc.keys().collect();
    assert_eq!(
        keys,
        vec!["distance", "ispresent", "battery", "address", "length", "rssi", "snr"]
    );
    assert_eq!(doc.get("battery"), Some(&TelemetryValue::Float(3.41)));
    assert_eq!(doc.get("snr"), Some(&TelemetryValue::Integer(12)));
}

#[test]
fn payload_that_is_not_an_object_is_rejected() {
    assert!(matches!(
        decode_frame("+RCV=3,3,[1],-47,12"),
        Err(DecodeError::Payload(_))
    ));
}

#[test]
fn malformed_frame_yields_no_document_and_polling_continues() {
    let mut link = MockLink::new();
    link.inject_line("+RCV=1,2,3,4");
    link.inject_line(r#"+RCV=5,7,{"a":1},-40,9"#);
    let mut radio = RadioModule::new(link);
    assert!(radio.poll_incoming().unwrap().is_none());
    let doc = radio.poll_incoming().unwrap().expect("second frame decodes");
    assert_eq!(doc.address(), Some(5));
}

#[test]
fn frame_split_across_reads_is_reassembled() {
    let mut link = MockLink::new();
    link.inject_bytes(b"+RCV=9,9,{\"t\":2");
    let mut radio = RadioModule::new(link);
    assert!(radio.poll_incoming().unwrap().is_none());
    radio.link_mut().inject_bytes(b"1.5},-33,7\r");
    assert!(radio.poll_incoming().unwrap().is_none());
    radio.link_mut().inject_bytes(b"\n");
    let doc = radio.poll_incoming().unwrap().expect("complete line");
    assert_eq!(doc.get("t"), Some(&TelemetryValue::Float(21.5)));
}
