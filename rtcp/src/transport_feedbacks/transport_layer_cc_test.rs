use util::marshal::{Marshal, Unmarshal};

use super::*;

#[test]
fn test_run_length_chunk_roundtrip() {
    let chunk = PacketStatusChunk::RunLengthChunk {
        packet_status_symbol: SymbolTypeTcc::PacketReceivedSmallDelta,
        run_length: 200,
    };
    let decoded = PacketStatusChunk::decode(chunk.encode());
    assert_eq!(decoded, chunk);
}

#[test]
fn test_status_vector_two_bit_roundtrip() {
    let chunk = PacketStatusChunk::StatusVectorChunk {
        symbol_size: SymbolSizeTypeTcc::TwoBit,
        symbol_list: vec![
            SymbolTypeTcc::PacketReceivedSmallDelta,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketReceivedLargeDelta,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
            SymbolTypeTcc::PacketNotReceived,
        ],
    };
    let decoded = PacketStatusChunk::decode(chunk.encode());
    assert_eq!(decoded, chunk);
}

#[test]
fn test_twcc_roundtrip() {
    let cc = TransportLayerCc {
        sender_ssrc: 0x1234_5678,
        media_ssrc: 0x9abc_def0,
        base_sequence_number: 100,
        packet_status_count: 3,
        reference_time: 1000,
        fb_pkt_count: 7,
        packet_chunks: vec![PacketStatusChunk::RunLengthChunk {
            packet_status_symbol: SymbolTypeTcc::PacketReceivedSmallDelta,
            run_length: 3,
        }],
        recv_deltas: vec![
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 250,
            },
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 500,
            },
            RecvDelta {
                type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
                delta: 250 * 255,
            },
        ],
    };
    let raw = cc.marshal().unwrap();
    assert_eq!(raw.len() % 4, 0);
    let mut buf = &raw[..];
    let parsed = TransportLayerCc::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, cc);
}

#[test]
fn test_twcc_large_delta() {
    let cc = TransportLayerCc {
        base_sequence_number: 1,
        packet_status_count: 1,
        packet_chunks: vec![PacketStatusChunk::RunLengthChunk {
            packet_status_symbol: SymbolTypeTcc::PacketReceivedLargeDelta,
            run_length: 1,
        }],
        recv_deltas: vec![RecvDelta {
            type_tcc_packet: SymbolTypeTcc::PacketReceivedLargeDelta,
            delta: -250 * 100,
        }],
        ..Default::default()
    };
    let raw = cc.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = TransportLayerCc::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed.recv_deltas[0].delta, -250 * 100);
}

#[test]
fn test_delta_out_of_range_rejected() {
    let cc = TransportLayerCc {
        packet_status_count: 1,
        packet_chunks: vec![PacketStatusChunk::RunLengthChunk {
            packet_status_symbol: SymbolTypeTcc::PacketReceivedSmallDelta,
            run_length: 1,
        }],
        recv_deltas: vec![RecvDelta {
            type_tcc_packet: SymbolTypeTcc::PacketReceivedSmallDelta,
            delta: 250 * 300,
        }],
        ..Default::default()
    };
    assert!(cc.marshal().is_err());
}
