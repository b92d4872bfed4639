use bytes::Buf;

use super::handshake_message_client_hello::read_vec8;
use crate::error::{Error, Result};
use crate::record_layer::record_layer_header::{ProtocolVersion, PROTOCOL_VERSION_DTLS12};

/// HelloVerifyRequest carries the stateless cookie the client must echo
/// (RFC 6347 section 4.2.1). Neither it nor the first ClientHello enter
/// the handshake transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageHelloVerifyRequest {
    pub version: ProtocolVersion,
    pub cookie: Vec<u8>,
}

impl Default for HandshakeMessageHelloVerifyRequest {
    fn default() -> Self {
        HandshakeMessageHelloVerifyRequest {
            version: PROTOCOL_VERSION_DTLS12,
            cookie: vec![],
        }
    }
}

impl HandshakeMessageHelloVerifyRequest {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.version.major);
        out.push(self.version.minor);
        out.push(self.cookie.len() as u8);
        out.extend_from_slice(&self.cookie);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageHelloVerifyRequest> {
        if buf.remaining() < 2 {
            return Err(Error::ErrBufferTooSmall);
        }
        let version = ProtocolVersion {
            major: buf.get_u8(),
            minor: buf.get_u8(),
        };
        let cookie = read_vec8(buf)?;
        Ok(HandshakeMessageHelloVerifyRequest { version, cookie })
    }
}
