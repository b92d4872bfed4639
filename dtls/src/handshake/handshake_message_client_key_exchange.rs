use bytes::Buf;

use super::handshake_message_client_hello::read_vec8;
use crate::error::Result;

/// ClientKeyExchange for ECDHE: the client's ephemeral public key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeMessageClientKeyExchange {
    pub public_key: Vec<u8>,
}

impl HandshakeMessageClientKeyExchange {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.public_key.len() as u8);
        out.extend_from_slice(&self.public_key);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageClientKeyExchange> {
        Ok(HandshakeMessageClientKeyExchange {
            public_key: read_vec8(buf)?,
        })
    }
}
