#[cfg(test)]
#[path = "transport_layer_nack_test.rs"]
mod transport_layer_nack_test;

use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, FORMAT_TLN, HEADER_LENGTH, SSRC_LENGTH};

/// NackPair is the wire representation of up to 17 lost packets: the
/// explicit `packet_id` plus a bitmask covering `packet_id+1..=packet_id+16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NackPair {
    pub packet_id: u16,
    pub lost_packets: u16,
}

impl NackPair {
    pub fn new(seq: u16) -> Self {
        NackPair {
            packet_id: seq,
            lost_packets: 0,
        }
    }

    /// All sequence numbers this pair reports lost.
    pub fn packet_list(&self) -> Vec<u16> {
        let mut out = vec![self.packet_id];
        for i in 0..16u16 {
            if self.lost_packets & (1 << i) != 0 {
                out.push(self.packet_id.wrapping_add(i + 1));
            }
        }
        out
    }
}

/// Packs a sorted list of lost sequence numbers into NACK pairs.
pub fn nack_pairs_from_sequence_numbers(seqs: &[u16]) -> Vec<NackPair> {
    let mut pairs: Vec<NackPair> = vec![];
    for &seq in seqs {
        match pairs.last_mut() {
            Some(pair) => {
                let delta = seq.wrapping_sub(pair.packet_id);
                if delta > 0 && delta <= 16 {
                    pair.lost_packets |= 1 << (delta - 1);
                    continue;
                }
                pairs.push(NackPair::new(seq));
            }
            None => pairs.push(NackPair::new(seq)),
        }
    }
    pairs
}

/// TransportLayerNack (PT=205 FMT=1), the Generic NACK of RFC 4585
/// section 6.2.1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportLayerNack {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub nacks: Vec<NackPair>,
}

impl TransportLayerNack {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_TLN,
            packet_type: PacketType::TransportSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for TransportLayerNack {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH * 2 + self.nacks.len() * 4
    }
}

impl Marshal for TransportLayerNack {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&self.media_ssrc.to_be_bytes());
        n += 4;
        for nack in &self.nacks {
            buf[n..n + 2].copy_from_slice(&nack.packet_id.to_be_bytes());
            buf[n + 2..n + 4].copy_from_slice(&nack.lost_packets.to_be_bytes());
            n += 4;
        }
        Ok(n)
    }
}

impl Unmarshal for TransportLayerNack {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        let body_len = header.length as usize * 4;
        if body_len < SSRC_LENGTH * 2 || buf.remaining() < body_len {
            return Err(util::Error::ErrBufferTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        let mut nacks = vec![];
        for _ in 0..(body_len - SSRC_LENGTH * 2) / 4 {
            nacks.push(NackPair {
                packet_id: buf.get_u16(),
                lost_packets: buf.get_u16(),
            });
        }
        Ok(TransportLayerNack {
            sender_ssrc,
            media_ssrc,
            nacks,
        })
    }
}
