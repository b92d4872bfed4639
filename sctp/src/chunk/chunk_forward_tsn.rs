use bytes::Buf;

use crate::error::{Error, Result};

/// A (stream, stream sequence) pair skipped by a FORWARD-TSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkForwardTsnStream {
    pub identifier: u16,
    pub sequence: u16,
}

/// FORWARD-TSN advances the peer's cumulative TSN past abandoned
/// messages (RFC 3758 section 3.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkForwardTsn {
    pub new_cumulative_tsn: u32,
    pub streams: Vec<ChunkForwardTsnStream>,
}

impl ChunkForwardTsn {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.new_cumulative_tsn.to_be_bytes());
        for stream in &self.streams {
            out.extend_from_slice(&stream.identifier.to_be_bytes());
            out.extend_from_slice(&stream.sequence.to_be_bytes());
        }
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkForwardTsn> {
        let mut buf = value;
        if buf.remaining() < 4 {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        let new_cumulative_tsn = buf.get_u32();
        let mut streams = vec![];
        while buf.remaining() >= 4 {
            streams.push(ChunkForwardTsnStream {
                identifier: buf.get_u16(),
                sequence: buf.get_u16(),
            });
        }
        Ok(ChunkForwardTsn {
            new_cumulative_tsn,
            streams,
        })
    }
}
