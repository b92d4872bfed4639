use bytes::Buf;

use super::HandshakeType;
use crate::error::{Error, Result};

pub const HANDSHAKE_HEADER_LENGTH: usize = 12;

/// DTLS handshake message header (RFC 6347 section 4.2.2): the TLS
/// header extended with a message sequence number and fragment bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeHeader {
    pub handshake_type: HandshakeType,
    /// Length of the complete (unfragmented) body, u24.
    pub length: u32,
    pub message_sequence: u16,
    pub fragment_offset: u32,
    pub fragment_length: u32,
}

fn put_u24(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes()[1..4]);
}

fn get_u24<B: Buf>(buf: &mut B) -> u32 {
    let mut b = [0u8; 4];
    buf.copy_to_slice(&mut b[1..4]);
    u32::from_be_bytes(b)
}

impl HandshakeHeader {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.handshake_type as u8);
        put_u24(out, self.length);
        out.extend_from_slice(&self.message_sequence.to_be_bytes());
        put_u24(out, self.fragment_offset);
        put_u24(out, self.fragment_length);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeHeader> {
        if buf.remaining() < HANDSHAKE_HEADER_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(HandshakeHeader {
            handshake_type: HandshakeType::from_u8(buf.get_u8())?,
            length: get_u24(buf),
            message_sequence: buf.get_u16(),
            fragment_offset: get_u24(buf),
            fragment_length: get_u24(buf),
        })
    }
}
