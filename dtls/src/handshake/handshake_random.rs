use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Buf;
use rand::Rng;

use crate::error::{Error, Result};

pub const HANDSHAKE_RANDOM_LENGTH: usize = 32;
const RANDOM_BYTES_LENGTH: usize = 28;

/// The 32-byte hello random: 4-byte unix time plus 28 random bytes
/// (RFC 5246 section 7.4.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeRandom(pub [u8; HANDSHAKE_RANDOM_LENGTH]);

impl Default for HandshakeRandom {
    fn default() -> Self {
        HandshakeRandom([0u8; HANDSHAKE_RANDOM_LENGTH])
    }
}

impl HandshakeRandom {
    pub fn generate() -> Self {
        let mut bytes = [0u8; HANDSHAKE_RANDOM_LENGTH];
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill(&mut bytes[4..]);
        HandshakeRandom(bytes)
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<HandshakeRandom> {
        if buf.remaining() < HANDSHAKE_RANDOM_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut bytes = [0u8; HANDSHAKE_RANDOM_LENGTH];
        buf.copy_to_slice(&mut bytes);
        Ok(HandshakeRandom(bytes))
    }
}
