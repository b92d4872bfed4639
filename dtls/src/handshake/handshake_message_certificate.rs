use bytes::Buf;

use crate::error::{Error, Result};

fn put_u24(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes()[1..4]);
}

fn get_u24<B: Buf>(buf: &mut B) -> Result<u32> {
    if buf.remaining() < 3 {
        return Err(Error::ErrBufferTooSmall);
    }
    let mut b = [0u8; 4];
    buf.copy_to_slice(&mut b[1..4]);
    Ok(u32::from_be_bytes(b))
}

/// The certificate chain, each entry a DER encoded X.509 certificate.
/// WebRTC peers send exactly one self-signed certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeMessageCertificate {
    pub certificate: Vec<Vec<u8>>,
}

impl HandshakeMessageCertificate {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        let total: usize = self.certificate.iter().map(|c| 3 + c.len()).sum();
        put_u24(out, total as u32);
        for cert in &self.certificate {
            put_u24(out, cert.len() as u32);
            out.extend_from_slice(cert);
        }
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeMessageCertificate> {
        let total = get_u24(buf)? as usize;
        if buf.remaining() < total {
            return Err(Error::ErrBufferTooSmall);
        }
        let data = buf.copy_to_bytes(total);
        let mut body = &data[..];
        let mut certificate = vec![];
        while body.has_remaining() {
            let len = get_u24(&mut body)? as usize;
            if body.remaining() < len {
                return Err(Error::ErrBufferTooSmall);
            }
            certificate.push(body.copy_to_bytes(len).to_vec());
        }
        Ok(HandshakeMessageCertificate { certificate })
    }
}
