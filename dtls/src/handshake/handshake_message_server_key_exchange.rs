use bytes::Buf;

use crate::crypto::NamedCurve;
use crate::error::{Error, Result};

const EC_CURVE_TYPE_NAMED_CURVE: u8 = 3;

/// ServerKeyExchange for ECDHE_ECDSA: the named curve parameters plus an
/// ECDSA-SHA256 signature over client_random || server_random || params
/// (RFC 8422 section 5.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessageServerKeyExchange {
    pub named_curve: NamedCurve,
    pub public_key: Vec<u8>,
    pub hash_algorithm: u8,
    pub signature_algorithm: u8,
    pub signature: Vec<u8>,
}

impl HandshakeMessageServerKeyExchange {
    /// The `ServerECDHParams` prefix that is also the signed payload's
    /// tail: curve_type || curve_id || pubkey_len || pubkey.
    pub fn params_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.public_key.len());
        out.push(EC_CURVE_TYPE_NAMED_CURVE);
        out.extend_from_slice(&(self.named_curve as u16).to_be_bytes());
        out.push(self.public_key.len() as u8);
        out.extend_from_slice(&self.public_key);
        out
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.params_bytes());
        out.push(self.hash_algorithm);
        out.push(self.signature_algorithm);
        out.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.signature);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageServerKeyExchange> {
        if buf.remaining() < 4 {
            return Err(Error::ErrBufferTooSmall);
        }
        if buf.get_u8() != EC_CURVE_TYPE_NAMED_CURVE {
            return Err(Error::ErrInvalidNamedCurve);
        }
        let named_curve =
            NamedCurve::from_u16(buf.get_u16()).ok_or(Error::ErrInvalidNamedCurve)?;
        let pk_len = buf.get_u8() as usize;
        if buf.remaining() < pk_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let public_key = buf.copy_to_bytes(pk_len).to_vec();

        if buf.remaining() < 4 {
            return Err(Error::ErrBufferTooSmall);
        }
        let hash_algorithm = buf.get_u8();
        let signature_algorithm = buf.get_u8();
        let sig_len = buf.get_u16() as usize;
        if buf.remaining() < sig_len {
            return Err(Error::ErrBufferTooSmall);
        }
        let signature = buf.copy_to_bytes(sig_len).to_vec();

        Ok(HandshakeMessageServerKeyExchange {
            named_curve,
            public_key,
            hash_algorithm,
            signature_algorithm,
            signature,
        })
    }
}
