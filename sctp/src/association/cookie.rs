use bytes::Buf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const MAC_LEN: usize = 32;
const BODY_LEN: usize = 8 + 4 + 4 + 4 + 4 + 4 + 1;

/// The server's state cookie: everything needed to instantiate the
/// association on COOKIE-ECHO, authenticated under a per-endpoint
/// secret. Until the echo arrives the server holds no other state
/// (RFC 4960 section 5.1.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StateCookie {
    pub timestamp_ms: u64,
    pub peer_tag: u32,
    pub my_tag: u32,
    pub peer_initial_tsn: u32,
    pub my_initial_tsn: u32,
    pub peer_rwnd: u32,
    pub peer_forward_tsn: bool,
}

impl StateCookie {
    pub fn seal(&self, secret: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(BODY_LEN + MAC_LEN);
        out.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        out.extend_from_slice(&self.peer_tag.to_be_bytes());
        out.extend_from_slice(&self.my_tag.to_be_bytes());
        out.extend_from_slice(&self.peer_initial_tsn.to_be_bytes());
        out.extend_from_slice(&self.my_initial_tsn.to_be_bytes());
        out.extend_from_slice(&self.peer_rwnd.to_be_bytes());
        out.push(self.peer_forward_tsn as u8);

        let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
        mac.update(&out);
        out.extend_from_slice(&mac.finalize().into_bytes());
        out
    }

    pub fn open(raw: &[u8], secret: &[u8]) -> Result<StateCookie> {
        if raw.len() != BODY_LEN + MAC_LEN {
            return Err(Error::ErrCookieAuthFailed);
        }
        let (body, their_mac) = raw.split_at(BODY_LEN);

        let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
        mac.update(body);
        let our_mac = mac.finalize().into_bytes();
        if !bool::from(our_mac.ct_eq(their_mac)) {
            return Err(Error::ErrCookieAuthFailed);
        }

        let mut buf = body;
        Ok(StateCookie {
            timestamp_ms: buf.get_u64(),
            peer_tag: buf.get_u32(),
            my_tag: buf.get_u32(),
            peer_initial_tsn: buf.get_u32(),
            my_initial_tsn: buf.get_u32(),
            peer_rwnd: buf.get_u32(),
            peer_forward_tsn: buf.get_u8() != 0,
        })
    }
}
