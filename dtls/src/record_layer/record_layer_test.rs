use bytes::Bytes;

use super::record_layer_header::*;
use super::*;

#[test]
fn test_record_header_roundtrip() {
    let header = RecordLayerHeader {
        content_type: ContentType::Handshake,
        protocol_version: PROTOCOL_VERSION_DTLS12,
        epoch: 1,
        sequence_number: 0x0000_0123_4567_89AB,
        content_len: 3,
    };
    let record = RecordLayer {
        header,
        fragment: Bytes::from_static(&[1, 2, 3]),
    };
    let raw = record.marshal();
    assert_eq!(raw.len(), RECORD_LAYER_HEADER_SIZE + 3);

    let records = unpack_datagram(&raw).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].header.epoch, 1);
    assert_eq!(records[0].header.sequence_number, 0x0000_0123_4567_89AB);
    assert_eq!(&records[0].fragment[..], &[1, 2, 3]);
}

#[test]
fn test_unpack_multiple_records() {
    let r1 = RecordLayer {
        header: RecordLayerHeader::new(ContentType::ChangeCipherSpec, 0, 5),
        fragment: Bytes::from_static(&[1]),
    };
    let r2 = RecordLayer {
        header: RecordLayerHeader::new(ContentType::Handshake, 1, 0),
        fragment: Bytes::from_static(&[9, 9, 9, 9]),
    };
    let mut datagram = r1.marshal();
    datagram.extend_from_slice(&r2.marshal());

    let records = unpack_datagram(&datagram).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].header.content_type, ContentType::ChangeCipherSpec);
    assert_eq!(records[1].header.content_type, ContentType::Handshake);
}

#[test]
fn test_truncated_record_rejected() {
    let r = RecordLayer {
        header: RecordLayerHeader::new(ContentType::Handshake, 0, 0),
        fragment: Bytes::from_static(&[1, 2, 3, 4]),
    };
    let raw = r.marshal();
    assert!(unpack_datagram(&raw[..raw.len() - 1]).is_err());
}
