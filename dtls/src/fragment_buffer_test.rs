use super::*;
use crate::handshake::HandshakeType;

fn header(seq: u16, length: u32, offset: u32, frag_len: u32) -> HandshakeHeader {
    HandshakeHeader {
        handshake_type: HandshakeType::Certificate,
        length,
        message_sequence: seq,
        fragment_offset: offset,
        fragment_length: frag_len,
    }
}

#[test]
fn test_single_fragment() {
    let mut buf = FragmentBuffer::new();
    let body = buf.push(&header(0, 4, 0, 4), &[1, 2, 3, 4]);
    assert_eq!(body, Some(vec![1, 2, 3, 4]));
}

#[test]
fn test_out_of_order_fragments() {
    let mut buf = FragmentBuffer::new();
    assert_eq!(buf.push(&header(1, 6, 3, 3), &[4, 5, 6]), None);
    let body = buf.push(&header(1, 6, 0, 3), &[1, 2, 3]);
    assert_eq!(body, Some(vec![1, 2, 3, 4, 5, 6]));
}

#[test]
fn test_delivered_once() {
    let mut buf = FragmentBuffer::new();
    assert!(buf.push(&header(2, 2, 0, 2), &[9, 9]).is_some());
    // a retransmitted fragment must not deliver the message again
    assert_eq!(buf.push(&header(2, 2, 0, 2), &[9, 9]), None);
}

#[test]
fn test_overlapping_fragments() {
    let mut buf = FragmentBuffer::new();
    assert_eq!(buf.push(&header(3, 5, 0, 3), &[1, 2, 3]), None);
    let body = buf.push(&header(3, 5, 2, 3), &[3, 4, 5]);
    assert_eq!(body, Some(vec![1, 2, 3, 4, 5]));
}

#[test]
fn test_oversized_fragment_ignored() {
    let mut buf = FragmentBuffer::new();
    assert_eq!(buf.push(&header(4, 2, 1, 3), &[1, 2, 3]), None);
}
