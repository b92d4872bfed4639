use bytes::Buf;

use super::handshake_message_client_hello::read_vec8;
use super::handshake_random::HandshakeRandom;
use crate::error::{Error, Result};
use crate::extension::Extension;
use crate::record_layer::record_layer_header::{ProtocolVersion, PROTOCOL_VERSION_DTLS12};

#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeMessageServerHello {
    pub version: ProtocolVersion,
    pub random: HandshakeRandom,
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub extensions: Vec<Extension>,
}

impl Default for HandshakeMessageServerHello {
    fn default() -> Self {
        HandshakeMessageServerHello {
            version: PROTOCOL_VERSION_DTLS12,
            random: HandshakeRandom::default(),
            session_id: vec![],
            cipher_suite: 0,
            compression_method: 0,
            extensions: vec![],
        }
    }
}

impl HandshakeMessageServerHello {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.version.major);
        out.push(self.version.minor);
        self.random.marshal(out);
        out.push(self.session_id.len() as u8);
        out.extend_from_slice(&self.session_id);
        out.extend_from_slice(&self.cipher_suite.to_be_bytes());
        out.push(self.compression_method);
        Extension::marshal_list(&self.extensions, out);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageServerHello> {
        if buf.remaining() < 2 {
            return Err(Error::ErrBufferTooSmall);
        }
        let version = ProtocolVersion {
            major: buf.get_u8(),
            minor: buf.get_u8(),
        };
        let random = HandshakeRandom::unmarshal(buf)?;
        let session_id = read_vec8(buf)?;
        if buf.remaining() < 3 {
            return Err(Error::ErrBufferTooSmall);
        }
        let cipher_suite = buf.get_u16();
        let compression_method = buf.get_u8();
        let extensions = Extension::unmarshal_list(buf)?;
        Ok(HandshakeMessageServerHello {
            version,
            random,
            session_id,
            cipher_suite,
            compression_method,
            extensions,
        })
    }
}
