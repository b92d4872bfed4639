use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::message::{Message, ATTRIBUTE_HEADER_SIZE, ATTR_MESSAGE_INTEGRITY, MESSAGE_HEADER_SIZE};

type HmacSha1 = Hmac<Sha1>;

const INTEGRITY_SIZE: usize = 20;

/// MESSAGE-INTEGRITY, an HMAC-SHA1 over the message up to (and with the
/// header length counting) the attribute itself (RFC 5389 section 15.4).
/// For ICE short-term credentials the key is the raw password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIntegrity(pub Vec<u8>);

impl MessageIntegrity {
    pub fn new_short_term(password: &str) -> Self {
        MessageIntegrity(password.as_bytes().to_vec())
    }

    pub fn new_long_term_md5(key: Vec<u8>) -> Self {
        MessageIntegrity(key)
    }

    pub fn add_to(&self, m: &mut Message) -> Result<()> {
        m.encode();
        let digest = hmac_over(&self.0, &m.raw, m.raw.len(), INTEGRITY_SIZE + ATTRIBUTE_HEADER_SIZE);
        m.add(ATTR_MESSAGE_INTEGRITY, &digest);
        Ok(())
    }

    /// Verifies the MESSAGE-INTEGRITY of a decoded message. Attributes
    /// after the integrity attribute (FINGERPRINT) are excluded from the
    /// computation per the RFC.
    pub fn check(&self, m: &Message) -> Result<()> {
        let stored = m.get(ATTR_MESSAGE_INTEGRITY)?;
        if stored.len() != INTEGRITY_SIZE {
            return Err(Error::ErrAttributeSizeInvalid);
        }
        let offset = m
            .attr_offset(ATTR_MESSAGE_INTEGRITY)
            .ok_or(Error::ErrAttributeNotFound)?;
        let digest = hmac_over(&self.0, &m.raw, offset, INTEGRITY_SIZE + ATTRIBUTE_HEADER_SIZE);
        if digest.ct_eq(stored).into() {
            Ok(())
        } else {
            Err(Error::ErrIntegrityMismatch)
        }
    }
}

/// HMAC over `raw[..end]` with the header length field patched so it
/// counts `extra` bytes past `end`.
fn hmac_over(key: &[u8], raw: &[u8], end: usize, extra: usize) -> Vec<u8> {
    let mut buf = raw[..end].to_vec();
    let patched_len = (end - MESSAGE_HEADER_SIZE + extra) as u16;
    buf[2..4].copy_from_slice(&patched_len.to_be_bytes());

    let mut mac = HmacSha1::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(&buf);
    mac.finalize().into_bytes().to_vec()
}
