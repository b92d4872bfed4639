use util::marshal::{Marshal, Unmarshal};

use super::*;

#[test]
fn test_nack_pair_packet_list() {
    let pair = NackPair {
        packet_id: 42,
        lost_packets: 0b0000_0000_0000_0101,
    };
    assert_eq!(pair.packet_list(), vec![42, 43, 45]);
}

#[test]
fn test_nack_pair_wraparound() {
    let pair = NackPair {
        packet_id: 0xFFFE,
        lost_packets: 0b11,
    };
    assert_eq!(pair.packet_list(), vec![0xFFFE, 0xFFFF, 0x0000]);
}

#[test]
fn test_pairs_from_sequence_numbers() {
    let pairs = nack_pairs_from_sequence_numbers(&[1, 2, 3, 20, 21]);
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].packet_id, 1);
    assert_eq!(pairs[0].lost_packets, 0b11);
    assert_eq!(pairs[1].packet_id, 20);
    assert_eq!(pairs[1].lost_packets, 0b1);
}

#[test]
fn test_nack_roundtrip() {
    let nack = TransportLayerNack {
        sender_ssrc: 0x902f9e2e,
        media_ssrc: 0x902f9e2e,
        nacks: vec![NackPair {
            packet_id: 0xaaa,
            lost_packets: 0x5555,
        }],
    };
    let raw = nack.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = TransportLayerNack::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, nack);
}
