use bytes::Bytes;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use super::*;

#[test]
fn test_basic_header_roundtrip() {
    let h = Header {
        version: 2,
        padding: false,
        extension: false,
        marker: true,
        payload_type: 96,
        sequence_number: 27023,
        timestamp: 3653407706,
        ssrc: 476325762,
        ..Default::default()
    };
    let raw = h.marshal().unwrap();
    assert_eq!(raw.len(), FIXED_HEADER_SIZE);
    let mut buf = &raw[..];
    let parsed = Header::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, h);
}

#[test]
fn test_header_with_extension() {
    let h = Header {
        version: 2,
        extension: true,
        extension_profile: 0xBEDE,
        extension_payload: Bytes::from_static(&[0x10, 0xAA, 0x00, 0x00]),
        payload_type: 111,
        sequence_number: 1,
        timestamp: 2,
        ssrc: 3,
        ..Default::default()
    };
    assert_eq!(h.marshal_size(), FIXED_HEADER_SIZE + 4 + 4);
    let raw = h.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = Header::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, h);
}

#[test]
fn test_header_with_csrc() {
    let h = Header {
        version: 2,
        payload_type: 8,
        csrc: vec![0x11223344, 0x55667788],
        ..Default::default()
    };
    let raw = h.marshal().unwrap();
    assert_eq!(raw.len(), FIXED_HEADER_SIZE + 8);
    let mut buf = &raw[..];
    let parsed = Header::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed.csrc, h.csrc);
}

#[test]
fn test_bad_version_rejected() {
    let mut raw = [0u8; 12];
    raw[0] = 1 << 6; // version 1
    let mut buf = &raw[..];
    assert!(Header::unmarshal(&mut buf).is_err());
}

#[test]
fn test_unaligned_extension_rejected() {
    let h = Header {
        version: 2,
        extension: true,
        extension_profile: 0xBEDE,
        extension_payload: Bytes::from_static(&[0x10, 0xAA, 0x00]),
        ..Default::default()
    };
    assert!(h.marshal().is_err());
}
