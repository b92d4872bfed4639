#[cfg(test)]
#[path = "packet_test.rs"]
mod packet_test;

use bytes::Buf;
use crc::{Crc, CRC_32_ISCSI};

use crate::chunk::Chunk;
use crate::error::{Error, Result};

pub const COMMON_HEADER_SIZE: usize = 12;

/// CRC-32C (Castagnoli, reflected), stored least significant byte first
/// (RFC 4960 appendix B).
static CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// An SCTP packet: the common header plus bundled chunks
/// (RFC 4960 section 3.1). Over DTLS both ports are conventionally 5000.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Packet {
    pub source_port: u16,
    pub destination_port: u16,
    pub verification_tag: u32,
    pub chunks: Vec<Chunk>,
}

impl Packet {
    pub fn new(source_port: u16, destination_port: u16, verification_tag: u32) -> Self {
        Packet {
            source_port,
            destination_port,
            verification_tag,
            chunks: vec![],
        }
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(COMMON_HEADER_SIZE + 64);
        out.extend_from_slice(&self.source_port.to_be_bytes());
        out.extend_from_slice(&self.destination_port.to_be_bytes());
        out.extend_from_slice(&self.verification_tag.to_be_bytes());
        // checksum computed over the packet with this field zeroed
        out.extend_from_slice(&[0u8; 4]);
        for chunk in &self.chunks {
            chunk.marshal(&mut out);
        }
        let checksum = CRC32C.checksum(&out);
        out[8..12].copy_from_slice(&checksum.to_le_bytes());
        out
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Packet> {
        if raw.len() < COMMON_HEADER_SIZE {
            return Err(Error::ErrPacketHeaderTooSmall);
        }
        let mut buf = raw;
        let source_port = buf.get_u16();
        let destination_port = buf.get_u16();
        let verification_tag = buf.get_u32();
        let their_checksum = buf.get_u32_le();

        let mut zeroed = raw.to_vec();
        zeroed[8..12].copy_from_slice(&[0u8; 4]);
        if CRC32C.checksum(&zeroed) != their_checksum {
            return Err(Error::ErrChecksumMismatch);
        }

        let mut chunks = vec![];
        let mut offset = COMMON_HEADER_SIZE;
        while offset + 4 <= raw.len() {
            let (chunk, consumed) = Chunk::unmarshal(&raw[offset..])?;
            if let Some(chunk) = chunk {
                chunks.push(chunk);
            }
            offset += consumed;
        }

        Ok(Packet {
            source_port,
            destination_port,
            verification_tag,
            chunks,
        })
    }
}
