use bytes::Buf;

use crate::error::{Error, Result};

pub const CHUNK_HEADER_SIZE: usize = 4;

/// Common chunk header (RFC 4960 section 3.2).
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Chunk Type  | Chunk  Flags  |        Chunk Length           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub typ: u8,
    pub flags: u8,
    /// Length of the chunk value, excluding header and padding.
    pub value_length: u16,
}

impl ChunkHeader {
    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(self.typ);
        out.push(self.flags);
        out.extend_from_slice(&(self.value_length + CHUNK_HEADER_SIZE as u16).to_be_bytes());
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<ChunkHeader> {
        if buf.remaining() < CHUNK_HEADER_SIZE {
            return Err(Error::ErrChunkHeaderTooSmall);
        }
        let typ = buf.get_u8();
        let flags = buf.get_u8();
        let length = buf.get_u16();
        if (length as usize) < CHUNK_HEADER_SIZE {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        Ok(ChunkHeader {
            typ,
            flags,
            value_length: length - CHUNK_HEADER_SIZE as u16,
        })
    }
}
