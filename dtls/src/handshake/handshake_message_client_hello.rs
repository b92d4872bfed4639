use bytes::Buf;

use super::handshake_random::HandshakeRandom;
use crate::error::{Error, Result};
use crate::extension::Extension;
use crate::record_layer::record_layer_header::{ProtocolVersion, PROTOCOL_VERSION_DTLS12};

/// ClientHello is the first flight of a handshake, and repeated with the
/// server's cookie after HelloVerifyRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeMessageClientHello {
    pub version: ProtocolVersion,
    pub random: HandshakeRandom,
    pub session_id: Vec<u8>,
    pub cookie: Vec<u8>,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl Default for HandshakeMessageClientHello {
    fn default() -> Self {
        HandshakeMessageClientHello {
            version: PROTOCOL_VERSION_DTLS12,
            random: HandshakeRandom::default(),
            session_id: vec![],
            cookie: vec![],
            cipher_suites: vec![],
            compression_methods: vec![0],
            extensions: vec![],
        }
    }
}

impl HandshakeMessageClientHello {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.version.major);
        out.push(self.version.minor);
        self.random.marshal(out);
        out.push(self.session_id.len() as u8);
        out.extend_from_slice(&self.session_id);
        out.push(self.cookie.len() as u8);
        out.extend_from_slice(&self.cookie);
        out.extend_from_slice(&((self.cipher_suites.len() * 2) as u16).to_be_bytes());
        for suite in &self.cipher_suites {
            out.extend_from_slice(&suite.to_be_bytes());
        }
        out.push(self.compression_methods.len() as u8);
        out.extend_from_slice(&self.compression_methods);
        Extension::marshal_list(&self.extensions, out);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageClientHello> {
        if buf.remaining() < 2 {
            return Err(Error::ErrBufferTooSmall);
        }
        let version = ProtocolVersion {
            major: buf.get_u8(),
            minor: buf.get_u8(),
        };
        let random = HandshakeRandom::unmarshal(buf)?;

        let session_id = read_vec8(buf)?;
        let cookie = read_vec8(buf)?;

        if buf.remaining() < 2 {
            return Err(Error::ErrBufferTooSmall);
        }
        let suites_len = buf.get_u16() as usize / 2;
        let mut cipher_suites = Vec::with_capacity(suites_len);
        for _ in 0..suites_len {
            if buf.remaining() < 2 {
                return Err(Error::ErrBufferTooSmall);
            }
            cipher_suites.push(buf.get_u16());
        }

        let compression_methods = read_vec8(buf)?;
        let extensions = Extension::unmarshal_list(buf)?;

        Ok(HandshakeMessageClientHello {
            version,
            random,
            session_id,
            cookie,
            cipher_suites,
            compression_methods,
            extensions,
        })
    }
}

pub(crate) fn read_vec8<B: Buf>(buf: &mut B) -> Result<Vec<u8>> {
    if buf.remaining() < 1 {
        return Err(Error::ErrBufferTooSmall);
    }
    let len = buf.get_u8() as usize;
    if buf.remaining() < len {
        return Err(Error::ErrBufferTooSmall);
    }
    Ok(buf.copy_to_bytes(len).to_vec())
}
