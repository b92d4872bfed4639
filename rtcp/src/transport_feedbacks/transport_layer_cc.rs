#[cfg(test)]
#[path = "transport_layer_cc_test.rs"]
mod transport_layer_cc_test;

use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, FORMAT_TCC, HEADER_LENGTH, SSRC_LENGTH};

/// Type bit and symbol constants for packet status chunks
/// (draft-holmer-rmcat-transport-wide-cc-extensions-01 section 3.1).
pub const TYPE_TCC_RUN_LENGTH_CHUNK: u16 = 0;
pub const TYPE_TCC_STATUS_VECTOR_CHUNK: u16 = 1;

/// Delta granularity: 250 microseconds.
pub const TYPE_TCC_DELTA_SCALE_FACTOR: i64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolTypeTcc {
    #[default]
    PacketNotReceived = 0,
    PacketReceivedSmallDelta = 1,
    PacketReceivedLargeDelta = 2,
    PacketReceivedWithoutDelta = 3,
}

impl From<u16> for SymbolTypeTcc {
    fn from(v: u16) -> Self {
        match v & 0x3 {
            0 => SymbolTypeTcc::PacketNotReceived,
            1 => SymbolTypeTcc::PacketReceivedSmallDelta,
            2 => SymbolTypeTcc::PacketReceivedLargeDelta,
            _ => SymbolTypeTcc::PacketReceivedWithoutDelta,
        }
    }
}

impl SymbolTypeTcc {
    pub fn has_delta(self) -> bool {
        matches!(
            self,
            SymbolTypeTcc::PacketReceivedSmallDelta | SymbolTypeTcc::PacketReceivedLargeDelta
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSizeTypeTcc {
    /// 14 one-bit symbols: not received / received small delta.
    OneBit = 0,
    /// 7 two-bit symbols.
    TwoBit = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketStatusChunk {
    /// `0|SS|RRRRRRRRRRRRR`: one status repeated `run_length` times.
    RunLengthChunk {
        packet_status_symbol: SymbolTypeTcc,
        run_length: u16,
    },
    /// `1|S|symbol list`: explicit per-packet statuses.
    StatusVectorChunk {
        symbol_size: SymbolSizeTypeTcc,
        symbol_list: Vec<SymbolTypeTcc>,
    },
}

impl PacketStatusChunk {
    pub fn status_count(&self) -> usize {
        match self {
            PacketStatusChunk::RunLengthChunk { run_length, .. } => *run_length as usize,
            PacketStatusChunk::StatusVectorChunk { symbol_list, .. } => symbol_list.len(),
        }
    }

    pub fn statuses(&self) -> Vec<SymbolTypeTcc> {
        match self {
            PacketStatusChunk::RunLengthChunk {
                packet_status_symbol,
                run_length,
            } => vec![*packet_status_symbol; *run_length as usize],
            PacketStatusChunk::StatusVectorChunk { symbol_list, .. } => symbol_list.clone(),
        }
    }

    fn encode(&self) -> u16 {
        match self {
            PacketStatusChunk::RunLengthChunk {
                packet_status_symbol,
                run_length,
            } => ((*packet_status_symbol as u16) << 13) | (run_length & 0x1FFF),
            PacketStatusChunk::StatusVectorChunk {
                symbol_size,
                symbol_list,
            } => {
                let mut word = 0x8000u16 | ((*symbol_size as u16) << 14);
                match symbol_size {
                    SymbolSizeTypeTcc::OneBit => {
                        for (i, s) in symbol_list.iter().take(14).enumerate() {
                            if *s == SymbolTypeTcc::PacketReceivedSmallDelta {
                                word |= 1 << (13 - i);
                            }
                        }
                    }
                    SymbolSizeTypeTcc::TwoBit => {
                        for (i, s) in symbol_list.iter().take(7).enumerate() {
                            word |= (*s as u16) << (12 - 2 * i);
                        }
                    }
                }
                word
            }
        }
    }

    fn decode(word: u16) -> Self {
        if word & 0x8000 == 0 {
            PacketStatusChunk::RunLengthChunk {
                packet_status_symbol: SymbolTypeTcc::from((word >> 13) & 0x3),
                run_length: word & 0x1FFF,
            }
        } else if word & 0x4000 == 0 {
            let symbol_list = (0..14)
                .map(|i| {
                    if word & (1 << (13 - i)) != 0 {
                        SymbolTypeTcc::PacketReceivedSmallDelta
                    } else {
                        SymbolTypeTcc::PacketNotReceived
                    }
                })
                .collect();
            PacketStatusChunk::StatusVectorChunk {
                symbol_size: SymbolSizeTypeTcc::OneBit,
                symbol_list,
            }
        } else {
            let symbol_list = (0..7)
                .map(|i| SymbolTypeTcc::from((word >> (12 - 2 * i)) & 0x3))
                .collect();
            PacketStatusChunk::StatusVectorChunk {
                symbol_size: SymbolSizeTypeTcc::TwoBit,
                symbol_list,
            }
        }
    }
}

/// Receive time delta for one received packet, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvDelta {
    pub type_tcc_packet: SymbolTypeTcc,
    pub delta: i64,
}

impl RecvDelta {
    fn wire_size(&self) -> usize {
        match self.type_tcc_packet {
            SymbolTypeTcc::PacketReceivedSmallDelta => 1,
            SymbolTypeTcc::PacketReceivedLargeDelta => 2,
            _ => 0,
        }
    }
}

/// TransportLayerCc (PT=205 FMT=15), transport-wide congestion control
/// feedback.
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|  FMT=15 |    PT=205     |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     SSRC of packet sender                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      SSRC of media source                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      base sequence number     |      packet status count      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 reference time                | fb pkt. count |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          packet chunk         |         packet chunk          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         recv delta            | recv delta    | zero padding  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportLayerCc {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub base_sequence_number: u16,
    pub packet_status_count: u16,
    /// Multiples of 64 ms, 24 bits.
    pub reference_time: u32,
    pub fb_pkt_count: u8,
    pub packet_chunks: Vec<PacketStatusChunk>,
    pub recv_deltas: Vec<RecvDelta>,
}

impl TransportLayerCc {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_TCC,
            packet_type: PacketType::TransportSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    fn unpadded_size(&self) -> usize {
        HEADER_LENGTH
            + SSRC_LENGTH * 2
            + 8
            + self.packet_chunks.len() * 2
            + self.recv_deltas.iter().map(|d| d.wire_size()).sum::<usize>()
    }
}

impl MarshalSize for TransportLayerCc {
    fn marshal_size(&self) -> usize {
        (self.unpadded_size() + 3) & !3
    }
}

impl Marshal for TransportLayerCc {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&self.media_ssrc.to_be_bytes());
        n += 4;
        buf[n..n + 2].copy_from_slice(&self.base_sequence_number.to_be_bytes());
        n += 2;
        buf[n..n + 2].copy_from_slice(&self.packet_status_count.to_be_bytes());
        n += 2;
        let ref_and_count = (self.reference_time & 0x00ff_ffff) << 8 | self.fb_pkt_count as u32;
        buf[n..n + 4].copy_from_slice(&ref_and_count.to_be_bytes());
        n += 4;
        for chunk in &self.packet_chunks {
            buf[n..n + 2].copy_from_slice(&chunk.encode().to_be_bytes());
            n += 2;
        }
        for delta in &self.recv_deltas {
            match delta.type_tcc_packet {
                SymbolTypeTcc::PacketReceivedSmallDelta => {
                    let scaled = delta.delta / TYPE_TCC_DELTA_SCALE_FACTOR;
                    if !(0..=255).contains(&scaled) {
                        return Err(util::Error::Other(
                            "TWCC delta exceeds representable range".to_owned(),
                        ));
                    }
                    buf[n] = scaled as u8;
                    n += 1;
                }
                SymbolTypeTcc::PacketReceivedLargeDelta => {
                    let scaled = delta.delta / TYPE_TCC_DELTA_SCALE_FACTOR;
                    if !(i16::MIN as i64..=i16::MAX as i64).contains(&scaled) {
                        return Err(util::Error::Other(
                            "TWCC delta exceeds representable range".to_owned(),
                        ));
                    }
                    buf[n..n + 2].copy_from_slice(&(scaled as i16).to_be_bytes());
                    n += 2;
                }
                _ => {}
            }
        }
        while n < size {
            buf[n] = 0;
            n += 1;
        }
        Ok(n)
    }
}

impl Unmarshal for TransportLayerCc {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        let body_len = header.length as usize * 4;
        if buf.remaining() < body_len || body_len < SSRC_LENGTH * 2 + 8 {
            return Err(util::Error::ErrBufferTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        let base_sequence_number = buf.get_u16();
        let packet_status_count = buf.get_u16();
        let ref_and_count = buf.get_u32();
        let reference_time = ref_and_count >> 8;
        let fb_pkt_count = ref_and_count as u8;

        let mut consumed = SSRC_LENGTH * 2 + 8;
        let mut packet_chunks = vec![];
        let mut statuses = 0usize;
        while statuses < packet_status_count as usize {
            if buf.remaining() < 2 {
                return Err(util::Error::ErrBufferTooShort);
            }
            let chunk = PacketStatusChunk::decode(buf.get_u16());
            consumed += 2;
            statuses += chunk.status_count();
            packet_chunks.push(chunk);
        }

        // clamp trailing symbols of the last vector chunk to the status count
        let mut symbols: Vec<SymbolTypeTcc> = packet_chunks
            .iter()
            .flat_map(|c| c.statuses())
            .collect();
        symbols.truncate(packet_status_count as usize);

        let mut recv_deltas = vec![];
        for symbol in symbols {
            match symbol {
                SymbolTypeTcc::PacketReceivedSmallDelta => {
                    if buf.remaining() < 1 {
                        return Err(util::Error::ErrBufferTooShort);
                    }
                    recv_deltas.push(RecvDelta {
                        type_tcc_packet: symbol,
                        delta: buf.get_u8() as i64 * TYPE_TCC_DELTA_SCALE_FACTOR,
                    });
                    consumed += 1;
                }
                SymbolTypeTcc::PacketReceivedLargeDelta => {
                    if buf.remaining() < 2 {
                        return Err(util::Error::ErrBufferTooShort);
                    }
                    recv_deltas.push(RecvDelta {
                        type_tcc_packet: symbol,
                        delta: buf.get_i16() as i64 * TYPE_TCC_DELTA_SCALE_FACTOR,
                    });
                    consumed += 2;
                }
                _ => {}
            }
        }

        // swallow padding up to the advertised length
        while consumed < body_len {
            if buf.remaining() < 1 {
                break;
            }
            buf.get_u8();
            consumed += 1;
        }

        Ok(TransportLayerCc {
            sender_ssrc,
            media_ssrc,
            base_sequence_number,
            packet_status_count,
            reference_time,
            fb_pkt_count,
            packet_chunks,
            recv_deltas,
        })
    }
}
