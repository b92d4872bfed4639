use std::fmt;
use std::time::Instant;

use bytes::{Buf, Bytes};

use crate::error::{Error, Result};

pub const PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK: u8 = 1;
pub const PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK: u8 = 2;
pub const PAYLOAD_DATA_UNORDERED_BITMASK: u8 = 4;
pub const PAYLOAD_DATA_IMMEDIATE_SACK_BITMASK: u8 = 8;
pub const PAYLOAD_DATA_HEADER_SIZE: usize = 12;

/// PayloadProtocolIdentifier, the WebRTC data channel assignments
/// (RFC 8831 section 8).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadProtocolIdentifier {
    Dcep = 50,
    String = 51,
    Binary = 53,
    StringEmpty = 56,
    BinaryEmpty = 57,
    #[default]
    Unknown = 0,
}

impl From<u32> for PayloadProtocolIdentifier {
    fn from(v: u32) -> Self {
        match v {
            50 => PayloadProtocolIdentifier::Dcep,
            51 => PayloadProtocolIdentifier::String,
            53 => PayloadProtocolIdentifier::Binary,
            56 => PayloadProtocolIdentifier::StringEmpty,
            57 => PayloadProtocolIdentifier::BinaryEmpty,
            _ => PayloadProtocolIdentifier::Unknown,
        }
    }
}

impl fmt::Display for PayloadProtocolIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayloadProtocolIdentifier::Dcep => "WebRTC DCEP",
            PayloadProtocolIdentifier::String => "WebRTC String",
            PayloadProtocolIdentifier::Binary => "WebRTC Binary",
            PayloadProtocolIdentifier::StringEmpty => "WebRTC String (Empty)",
            PayloadProtocolIdentifier::BinaryEmpty => "WebRTC Binary (Empty)",
            PayloadProtocolIdentifier::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// An SCTP DATA chunk (RFC 4960 section 3.3.1).
///
///   B E                  Description
/// ============================================================
/// | 1 0 | First piece of a fragmented user message           |
/// | 0 0 | Middle piece of a fragmented user message          |
/// | 0 1 | Last piece of a fragmented user message            |
/// | 1 1 | Unfragmented message                               |
/// ============================================================
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayloadData {
    pub unordered: bool,
    pub beginning_fragment: bool,
    pub ending_fragment: bool,
    pub immediate_sack: bool,

    pub tsn: u32,
    pub stream_identifier: u16,
    pub stream_sequence_number: u16,
    pub payload_type: PayloadProtocolIdentifier,
    pub user_data: Bytes,

    /// Sender-side bookkeeping, not serialized.
    pub nsent: u32,
    pub since: Option<Instant>,
    pub acked: bool,
    pub miss_indicator: u32,
    pub abandoned: bool,
    pub retransmit: bool,
}

impl ChunkPayloadData {
    pub fn new(
        tsn: u32,
        stream_identifier: u16,
        stream_sequence_number: u16,
        payload_type: PayloadProtocolIdentifier,
        user_data: Bytes,
    ) -> Self {
        ChunkPayloadData {
            unordered: false,
            beginning_fragment: false,
            ending_fragment: false,
            immediate_sack: false,
            tsn,
            stream_identifier,
            stream_sequence_number,
            payload_type,
            user_data,
            nsent: 0,
            since: None,
            acked: false,
            miss_indicator: 0,
            abandoned: false,
            retransmit: false,
        }
    }

    pub(crate) fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.ending_fragment {
            flags |= PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK;
        }
        if self.beginning_fragment {
            flags |= PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK;
        }
        if self.unordered {
            flags |= PAYLOAD_DATA_UNORDERED_BITMASK;
        }
        if self.immediate_sack {
            flags |= PAYLOAD_DATA_IMMEDIATE_SACK_BITMASK;
        }
        flags
    }

    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.tsn.to_be_bytes());
        out.extend_from_slice(&self.stream_identifier.to_be_bytes());
        out.extend_from_slice(&self.stream_sequence_number.to_be_bytes());
        out.extend_from_slice(&(self.payload_type as u32).to_be_bytes());
        out.extend_from_slice(&self.user_data);
    }

    pub(crate) fn unmarshal_value(flags: u8, value: Bytes) -> Result<ChunkPayloadData> {
        if value.len() < PAYLOAD_DATA_HEADER_SIZE {
            return Err(Error::ErrChunkPayloadSmall);
        }
        let mut buf = &value[..];
        let tsn = buf.get_u32();
        let stream_identifier = buf.get_u16();
        let stream_sequence_number = buf.get_u16();
        let payload_type = PayloadProtocolIdentifier::from(buf.get_u32());
        let user_data = value.slice(PAYLOAD_DATA_HEADER_SIZE..);

        Ok(ChunkPayloadData {
            unordered: flags & PAYLOAD_DATA_UNORDERED_BITMASK != 0,
            beginning_fragment: flags & PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK != 0,
            ending_fragment: flags & PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK != 0,
            immediate_sack: flags & PAYLOAD_DATA_IMMEDIATE_SACK_BITMASK != 0,
            tsn,
            stream_identifier,
            stream_sequence_number,
            payload_type,
            user_data,
            nsent: 0,
            since: None,
            acked: false,
            miss_indicator: 0,
            abandoned: false,
            retransmit: false,
        })
    }

    /// Wire size including chunk header, excluding padding.
    pub fn chunk_size(&self) -> usize {
        super::chunk_header::CHUNK_HEADER_SIZE + PAYLOAD_DATA_HEADER_SIZE + self.user_data.len()
    }
}
