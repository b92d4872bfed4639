use bytes::Buf;

use super::handshake_message_client_hello::read_vec8;
use crate::error::{Error, Result};

pub const CLIENT_CERTIFICATE_TYPE_ECDSA_SIGN: u8 = 64;

/// CertificateRequest, sent by the server when client authentication is
/// enabled. Browsers do not drive this path; it is kept for
/// completeness and disabled by default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeMessageCertificateRequest {
    pub certificate_types: Vec<u8>,
    pub signature_hash_algorithms: Vec<u16>,
}

impl HandshakeMessageCertificateRequest {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.certificate_types.len() as u8);
        out.extend_from_slice(&self.certificate_types);
        out.extend_from_slice(&((self.signature_hash_algorithms.len() * 2) as u16).to_be_bytes());
        for alg in &self.signature_hash_algorithms {
            out.extend_from_slice(&alg.to_be_bytes());
        }
        // no distinguished names
        out.extend_from_slice(&0u16.to_be_bytes());
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageCertificateRequest> {
        let certificate_types = read_vec8(buf)?;
        if buf.remaining() < 2 {
            return Err(Error::ErrBufferTooSmall);
        }
        let n = buf.get_u16() as usize / 2;
        let mut signature_hash_algorithms = Vec::with_capacity(n);
        for _ in 0..n {
            if buf.remaining() < 2 {
                return Err(Error::ErrBufferTooSmall);
            }
            signature_hash_algorithms.push(buf.get_u16());
        }
        Ok(HandshakeMessageCertificateRequest {
            certificate_types,
            signature_hash_algorithms,
        })
    }
}
