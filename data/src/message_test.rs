use sctp::ReliabilityPolicy;

use super::*;

#[test]
fn test_open_roundtrip() {
    let config = ChannelConfig {
        unordered: false,
        policy: ReliabilityPolicy::Reliable,
        priority: 0,
        label: "test".to_owned(),
        protocol: String::new(),
    };
    let msg = DcepMessage::Open(config.clone());
    let raw = msg.marshal();
    assert_eq!(raw[0], MESSAGE_TYPE_OPEN);
    assert_eq!(raw[1], CHANNEL_TYPE_RELIABLE);
    assert_eq!(DcepMessage::unmarshal(&raw).unwrap(), msg);
}

#[test]
fn test_open_partial_reliable_unordered() {
    let config = ChannelConfig {
        unordered: true,
        policy: ReliabilityPolicy::MaxRetransmits(5),
        priority: 128,
        label: "lossy".to_owned(),
        protocol: "chat".to_owned(),
    };
    let raw = DcepMessage::Open(config.clone()).marshal();
    assert_eq!(raw[1], 0x81);
    match DcepMessage::unmarshal(&raw).unwrap() {
        DcepMessage::Open(parsed) => {
            assert!(parsed.unordered);
            assert_eq!(parsed.policy, ReliabilityPolicy::MaxRetransmits(5));
            assert_eq!(parsed.label, "lossy");
            assert_eq!(parsed.protocol, "chat");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_timed_channel_type() {
    let config = ChannelConfig {
        unordered: false,
        policy: ReliabilityPolicy::MaxPacketLifetime(1500),
        priority: 0,
        label: String::new(),
        protocol: String::new(),
    };
    let raw = DcepMessage::Open(config).marshal();
    assert_eq!(raw[1], CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED);
}

#[test]
fn test_ack_roundtrip() {
    let raw = DcepMessage::Ack.marshal();
    assert_eq!(raw, vec![MESSAGE_TYPE_ACK]);
    assert_eq!(DcepMessage::unmarshal(&raw).unwrap(), DcepMessage::Ack);
}

#[test]
fn test_truncated_open_rejected() {
    let raw = [MESSAGE_TYPE_OPEN, 0, 0, 0];
    assert_eq!(DcepMessage::unmarshal(&raw), Err(Error::ErrMessageTooShort));
}

#[test]
fn test_empty_message_ppid() {
    use sctp::PayloadProtocolIdentifier;
    assert_eq!(ppid_for(true, 0), PayloadProtocolIdentifier::BinaryEmpty);
    assert_eq!(ppid_for(false, 0), PayloadProtocolIdentifier::StringEmpty);
    assert_eq!(ppid_for(true, 3), PayloadProtocolIdentifier::Binary);
    assert_eq!(&payload_for(b"")[..], &[0u8]);
    assert_eq!(&payload_for(b"hi")[..], b"hi");
}
