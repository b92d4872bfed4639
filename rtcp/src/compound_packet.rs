#[cfg(test)]
#[path = "compound_packet_test.rs"]
mod compound_packet_test;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::packet::{self, Packet};

/// A CompoundPacket is a collection of RTCP packets transmitted as a
/// single datagram (RFC 3550 section 6.1). The first packet must always
/// be a sender or receiver report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundPacket(pub Vec<Packet>);

impl CompoundPacket {
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::EmptyCompound);
        }
        match &self.0[0] {
            Packet::SenderReport(_) | Packet::ReceiverReport(_) => Ok(()),
            _ => Err(Error::BadFirstPacket),
        }
    }

    pub fn marshal(&self) -> Result<Bytes> {
        self.validate()?;
        packet::marshal(&self.0)
    }

    pub fn unmarshal(raw: &mut &[u8]) -> Result<CompoundPacket> {
        let packets = packet::unmarshal(raw)?;
        let compound = CompoundPacket(packets);
        compound.validate()?;
        Ok(compound)
    }
}
