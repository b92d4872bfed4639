use bytes::Bytes;
use util::marshal::{Marshal, Unmarshal};

use super::*;

#[test]
fn test_packet_roundtrip() {
    let p = Packet {
        header: Header {
            version: 2,
            marker: true,
            payload_type: 96,
            sequence_number: 5000,
            timestamp: 160,
            ssrc: 0xdeadbeef,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05]),
    };
    let raw = p.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = Packet::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, p);
}

#[test]
fn test_empty_payload() {
    let p = Packet {
        header: Header {
            version: 2,
            ..Default::default()
        },
        payload: Bytes::new(),
    };
    let raw = p.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = Packet::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed.payload.len(), 0);
}
