use bytes::Buf;

use crate::error::{Error, Result};

/// CertificateVerify proves possession of the client certificate's
/// private key: a signature over the handshake transcript so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeMessageCertificateVerify {
    pub hash_algorithm: u8,
    pub signature_algorithm: u8,
    pub signature: Vec<u8>,
}

impl HandshakeMessageCertificateVerify {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.hash_algorithm);
        out.push(self.signature_algorithm);
        out.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.signature);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageCertificateVerify> {
        if buf.remaining() < 4 {
            return Err(Error::ErrBufferTooSmall);
        }
        let hash_algorithm = buf.get_u8();
        let signature_algorithm = buf.get_u8();
        let len = buf.get_u16() as usize;
        if buf.remaining() < len {
            return Err(Error::ErrBufferTooSmall);
        }
        Ok(HandshakeMessageCertificateVerify {
            hash_algorithm,
            signature_algorithm,
            signature: buf.copy_to_bytes(len).to_vec(),
        })
    }
}
