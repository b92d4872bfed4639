use bytes::Bytes;

use super::*;
use crate::chunk::chunk_payload_data::{ChunkPayloadData, PayloadProtocolIdentifier};
use crate::chunk::chunk_selective_ack::{ChunkSelectiveAck, GapAckBlock};

#[test]
fn test_packet_roundtrip_with_checksum() {
    let mut packet = Packet::new(5000, 5000, 0xdead_beef);
    let mut data = ChunkPayloadData::new(
        100,
        1,
        0,
        PayloadProtocolIdentifier::Binary,
        Bytes::from_static(b"hello"),
    );
    data.beginning_fragment = true;
    data.ending_fragment = true;
    packet.chunks.push(Chunk::PayloadData(data));

    let raw = packet.marshal();
    let parsed = Packet::unmarshal(&raw).unwrap();
    assert_eq!(parsed.source_port, 5000);
    assert_eq!(parsed.verification_tag, 0xdead_beef);
    assert_eq!(parsed.chunks.len(), 1);
    match &parsed.chunks[0] {
        Chunk::PayloadData(d) => {
            assert_eq!(d.tsn, 100);
            assert!(d.beginning_fragment && d.ending_fragment);
            assert_eq!(&d.user_data[..], b"hello");
        }
        other => panic!("unexpected chunk {other:?}"),
    }
}

#[test]
fn test_corrupted_checksum_rejected() {
    let packet = Packet::new(5000, 5000, 1);
    let mut raw = packet.marshal();
    raw[8] ^= 0xff;
    assert_eq!(Packet::unmarshal(&raw), Err(Error::ErrChecksumMismatch));
}

#[test]
fn test_corrupted_body_rejected() {
    let mut packet = Packet::new(5000, 5000, 1);
    packet.chunks.push(Chunk::SelectiveAck(ChunkSelectiveAck {
        cumulative_tsn_ack: 42,
        advertised_receiver_window_credit: 1000,
        gap_ack_blocks: vec![],
        duplicate_tsn: vec![],
    }));
    let mut raw = packet.marshal();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;
    assert_eq!(Packet::unmarshal(&raw), Err(Error::ErrChecksumMismatch));
}

#[test]
fn test_sack_gap_blocks_roundtrip() {
    let mut packet = Packet::new(5000, 5000, 7);
    packet.chunks.push(Chunk::SelectiveAck(ChunkSelectiveAck {
        cumulative_tsn_ack: 101,
        advertised_receiver_window_credit: 128 * 1024,
        gap_ack_blocks: vec![GapAckBlock { start: 2, end: 2 }],
        duplicate_tsn: vec![100],
    }));
    let raw = packet.marshal();
    let parsed = Packet::unmarshal(&raw).unwrap();
    match &parsed.chunks[0] {
        Chunk::SelectiveAck(sack) => {
            assert_eq!(sack.cumulative_tsn_ack, 101);
            assert_eq!(sack.gap_ack_blocks, vec![GapAckBlock { start: 2, end: 2 }]);
            assert_eq!(sack.duplicate_tsn, vec![100]);
        }
        other => panic!("unexpected chunk {other:?}"),
    }
}

#[test]
fn test_multiple_chunks_bundled() {
    let mut packet = Packet::new(5000, 5000, 3);
    for tsn in [1u32, 2, 3] {
        let mut data = ChunkPayloadData::new(
            tsn,
            0,
            tsn as u16,
            PayloadProtocolIdentifier::String,
            Bytes::from_static(b"abc"),
        );
        data.beginning_fragment = true;
        data.ending_fragment = true;
        packet.chunks.push(Chunk::PayloadData(data));
    }
    let raw = packet.marshal();
    // each chunk is padded to a 4-byte boundary on the wire
    assert_eq!(raw.len(), 12 + 3 * 20);
    let parsed = Packet::unmarshal(&raw).unwrap();
    assert_eq!(parsed.chunks.len(), 3);
}
