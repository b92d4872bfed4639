use bytes::Bytes;

use super::*;
use crate::chunk::chunk_payload_data::ChunkPayloadData;

fn fragment(tsn: u32, ssn: u16, b: bool, e: bool, unordered: bool, data: &[u8]) -> ChunkPayloadData {
    let mut chunk = ChunkPayloadData::new(
        tsn,
        0,
        ssn,
        crate::chunk::chunk_payload_data::PayloadProtocolIdentifier::Binary,
        Bytes::copy_from_slice(data),
    );
    chunk.beginning_fragment = b;
    chunk.ending_fragment = e;
    chunk.unordered = unordered;
    chunk
}

#[test]
fn test_ordered_single_chunk_delivery() {
    let mut q = ReassemblyQueue::new();
    let out = q.push(fragment(10, 0, true, true, false, b"one"));
    assert_eq!(out.len(), 1);
    assert_eq!(&out[0].data[..], b"one");
    assert_eq!(q.expected_ssn_in, 1);
}

#[test]
fn test_ordered_three_fragments_deliver_once() {
    let mut q = ReassemblyQueue::new();
    assert!(q.push(fragment(1, 0, true, false, false, b"aa")).is_empty());
    assert!(q.push(fragment(2, 0, false, false, false, b"bb")).is_empty());
    let out = q.push(fragment(3, 0, false, true, false, b"cc"));
    assert_eq!(out.len(), 1);
    assert_eq!(&out[0].data[..], b"aabbcc");
    // a duplicate fragment of the delivered SSN is dropped
    assert!(q.push(fragment(3, 0, false, true, false, b"cc")).is_empty());
}

#[test]
fn test_ordered_held_until_ssn_turn() {
    let mut q = ReassemblyQueue::new();
    // ssn 1 arrives complete before ssn 0
    assert!(q.push(fragment(5, 1, true, true, false, b"second")).is_empty());
    let out = q.push(fragment(4, 0, true, true, false, b"first"));
    assert_eq!(out.len(), 2);
    assert_eq!(&out[0].data[..], b"first");
    assert_eq!(&out[1].data[..], b"second");
}

#[test]
fn test_unordered_delivers_any_complete_run() {
    let mut q = ReassemblyQueue::new();
    assert!(q.push(fragment(101, 0, false, true, true, b"tail")).is_empty());
    let out = q.push(fragment(100, 0, true, false, true, b"head-"));
    assert_eq!(out.len(), 1);
    assert_eq!(&out[0].data[..], b"head-tail");
}

#[test]
fn test_skip_ordered_to_releases_later_messages() {
    let mut q = ReassemblyQueue::new();
    // ssn 0 is lost/abandoned; ssn 1 waits complete
    assert!(q.push(fragment(11, 1, true, true, false, b"kept")).is_empty());
    let out = q.skip_ordered_to(0);
    assert_eq!(out.len(), 1);
    assert_eq!(&out[0].data[..], b"kept");
    assert_eq!(q.expected_ssn_in, 2);
}

#[test]
fn test_buffered_bytes_accounting() {
    let mut q = ReassemblyQueue::new();
    q.push(fragment(1, 1, true, false, false, b"xxxx"));
    assert_eq!(q.buffered_bytes, 4);
    q.push(fragment(2, 1, false, true, false, b"yy"));
    // message for ssn 1 is complete but held for ssn 0; still buffered
    assert_eq!(q.buffered_bytes, 6);
    q.push(fragment(0, 0, true, true, false, b"z"));
    assert_eq!(q.buffered_bytes, 0);
}
