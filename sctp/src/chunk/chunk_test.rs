use bytes::Bytes;

use super::chunk_forward_tsn::*;
use super::chunk_init::*;
use super::chunk_payload_data::*;
use super::*;
use crate::param::Param;

fn roundtrip(chunk: Chunk) -> Chunk {
    let mut raw = vec![];
    chunk.marshal(&mut raw);
    let (parsed, consumed) = Chunk::unmarshal(&raw).unwrap();
    assert_eq!(consumed, raw.len());
    parsed.unwrap()
}

#[test]
fn test_payload_data_roundtrip() {
    let mut data = ChunkPayloadData::new(
        0x01020304,
        7,
        9,
        PayloadProtocolIdentifier::Dcep,
        Bytes::from_static(b"\x03\x00\x00\x00"),
    );
    data.beginning_fragment = true;
    data.unordered = true;
    let parsed = roundtrip(Chunk::PayloadData(data.clone()));
    match parsed {
        Chunk::PayloadData(p) => {
            assert_eq!(p.tsn, data.tsn);
            assert_eq!(p.stream_identifier, 7);
            assert_eq!(p.stream_sequence_number, 9);
            assert!(p.beginning_fragment);
            assert!(!p.ending_fragment);
            assert!(p.unordered);
            assert_eq!(p.payload_type, PayloadProtocolIdentifier::Dcep);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_init_roundtrip() {
    let init = ChunkInit {
        initiate_tag: 0xAABBCCDD,
        advertised_receiver_window_credit: 128 * 1024,
        num_outbound_streams: 1024,
        num_inbound_streams: 1024,
        initial_tsn: 12345,
        params: vec![Param::ForwardTsnSupported],
    };
    let parsed = roundtrip(Chunk::Init(init.clone()));
    match parsed {
        Chunk::Init(p) => {
            assert_eq!(p, init);
            assert!(p.forward_tsn_supported());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_init_ack_cookie_access() {
    let init_ack = ChunkInit {
        initiate_tag: 5,
        advertised_receiver_window_credit: 256 * 1024,
        num_outbound_streams: 16,
        num_inbound_streams: 16,
        initial_tsn: 99,
        params: vec![
            Param::ForwardTsnSupported,
            Param::StateCookie(vec![0x55; 33]),
        ],
    };
    let parsed = roundtrip(Chunk::InitAck(init_ack));
    match parsed {
        Chunk::InitAck(p) => assert_eq!(p.cookie(), Some(&[0x55u8; 33][..])),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_forward_tsn_roundtrip() {
    let fwd = ChunkForwardTsn {
        new_cumulative_tsn: 1000,
        streams: vec![ChunkForwardTsnStream {
            identifier: 1,
            sequence: 42,
        }],
    };
    let parsed = roundtrip(Chunk::ForwardTsn(fwd.clone()));
    assert_eq!(parsed, Chunk::ForwardTsn(fwd));
}

#[test]
fn test_unknown_chunk_type_skipped() {
    // type 99 does not exist; the parser should skip it
    let raw = [99u8, 0, 0, 8, 1, 2, 3, 4];
    let (chunk, consumed) = Chunk::unmarshal(&raw).unwrap();
    assert!(chunk.is_none());
    assert_eq!(consumed, 8);
}

#[test]
fn test_shutdown_complete_t_bit() {
    let mut raw = vec![];
    Chunk::ShutdownComplete(super::chunk_shutdown::ChunkShutdownComplete { no_tcb: true })
        .marshal(&mut raw);
    let (parsed, _) = Chunk::unmarshal(&raw).unwrap();
    match parsed.unwrap() {
        Chunk::ShutdownComplete(c) => assert!(c.no_tcb),
        other => panic!("unexpected {other:?}"),
    }
}
