use bytes::Buf;

use crate::error::{Error, Result};

/// SHUTDOWN carries the cumulative TSN ack (RFC 4960 section 3.3.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkShutdown {
    pub cumulative_tsn_ack: u32,
}

impl ChunkShutdown {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cumulative_tsn_ack.to_be_bytes());
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkShutdown> {
        let mut buf = value;
        if buf.remaining() < 4 {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        Ok(ChunkShutdown {
            cumulative_tsn_ack: buf.get_u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkShutdownAck {}

/// SHUTDOWN-COMPLETE; the T-bit signals the sender had no TCB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkShutdownComplete {
    pub no_tcb: bool,
}
