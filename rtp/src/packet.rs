#[cfg(test)]
#[path = "packet_test.rs"]
mod packet_test;

use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::Header;

/// Packet represents an RTP Packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RTP PACKET:")?;
        writeln!(f, "\tPayloadType: {}", self.header.payload_type)?;
        writeln!(f, "\tSequenceNumber: {}", self.header.sequence_number)?;
        writeln!(f, "\tTimestamp: {}", self.header.timestamp)?;
        writeln!(f, "\tSSRC: {} ({:x})", self.header.ssrc, self.header.ssrc)?;
        write!(f, "\tPayload Length: {}", self.payload.len())
    }
}

impl MarshalSize for Packet {
    fn marshal_size(&self) -> usize {
        self.header.marshal_size() + self.payload.len()
    }
}

impl Unmarshal for Packet {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        let payload = buf.copy_to_bytes(buf.remaining());
        Ok(Packet { header, payload })
    }
}

impl Marshal for Packet {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        let n = self.header.marshal_to(buf)?;
        if buf.len() < n + self.payload.len() {
            return Err(util::Error::ErrBufferTooShort);
        }
        buf[n..n + self.payload.len()].copy_from_slice(&self.payload);
        Ok(n + self.payload.len())
    }
}
