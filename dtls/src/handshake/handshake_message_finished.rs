use bytes::Buf;

use crate::error::Result;

/// Finished carries 12 bytes of verify_data over the handshake
/// transcript (RFC 5246 section 7.4.9).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeMessageFinished {
    pub verify_data: Vec<u8>,
}

impl HandshakeMessageFinished {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.verify_data);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageFinished> {
        Ok(HandshakeMessageFinished {
            verify_data: buf.copy_to_bytes(buf.remaining()).to_vec(),
        })
    }
}
