use bytes::Buf;

use crate::error::{Error, Result};

/// A gap ack block: start/end offsets relative to the cumulative TSN ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapAckBlock {
    pub start: u16,
    pub end: u16,
}

/// SACK chunk (RFC 4960 section 3.3.4).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkSelectiveAck {
    pub cumulative_tsn_ack: u32,
    pub advertised_receiver_window_credit: u32,
    pub gap_ack_blocks: Vec<GapAckBlock>,
    pub duplicate_tsn: Vec<u32>,
}

impl ChunkSelectiveAck {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cumulative_tsn_ack.to_be_bytes());
        out.extend_from_slice(&self.advertised_receiver_window_credit.to_be_bytes());
        out.extend_from_slice(&(self.gap_ack_blocks.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.duplicate_tsn.len() as u16).to_be_bytes());
        for block in &self.gap_ack_blocks {
            out.extend_from_slice(&block.start.to_be_bytes());
            out.extend_from_slice(&block.end.to_be_bytes());
        }
        for dup in &self.duplicate_tsn {
            out.extend_from_slice(&dup.to_be_bytes());
        }
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkSelectiveAck> {
        if value.len() < 12 {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        let mut buf = value;
        let cumulative_tsn_ack = buf.get_u32();
        let advertised_receiver_window_credit = buf.get_u32();
        let num_gaps = buf.get_u16() as usize;
        let num_dups = buf.get_u16() as usize;
        if buf.remaining() < num_gaps * 4 + num_dups * 4 {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        let mut gap_ack_blocks = Vec::with_capacity(num_gaps);
        for _ in 0..num_gaps {
            gap_ack_blocks.push(GapAckBlock {
                start: buf.get_u16(),
                end: buf.get_u16(),
            });
        }
        let mut duplicate_tsn = Vec::with_capacity(num_dups);
        for _ in 0..num_dups {
            duplicate_tsn.push(buf.get_u32());
        }
        Ok(ChunkSelectiveAck {
            cumulative_tsn_ack,
            advertised_receiver_window_credit,
            gap_ack_blocks,
            duplicate_tsn,
        })
    }
}
