use bytes::Buf;

use crate::error::{Error, Result};

pub const RECORD_LAYER_HEADER_SIZE: usize = 13;
pub const MAX_SEQUENCE_NUMBER: u64 = 0x0000_FFFF_FFFF_FFFF;

pub const PROTOCOL_VERSION_DTLS12: ProtocolVersion = ProtocolVersion {
    major: 0xfe,
    minor: 0xfd,
};
pub const PROTOCOL_VERSION_DTLS10: ProtocolVersion = ProtocolVersion {
    major: 0xfe,
    minor: 0xff,
};

/// On-the-wire protocol version (1's complement encoding, so DTLS 1.2 is
/// {254, 253}).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Result<ContentType> {
        Ok(match v {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            other => return Err(Error::ErrInvalidContentType(other)),
        })
    }
}

/// DTLS record header (RFC 6347 section 4.1): the TLS header plus the
/// 16-bit epoch and 48-bit per-epoch sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayerHeader {
    pub content_type: ContentType,
    pub protocol_version: ProtocolVersion,
    pub epoch: u16,
    pub sequence_number: u64,
    pub content_len: u16,
}

impl RecordLayerHeader {
    pub fn new(content_type: ContentType, epoch: u16, sequence_number: u64) -> Self {
        RecordLayerHeader {
            content_type,
            protocol_version: PROTOCOL_VERSION_DTLS12,
            epoch,
            sequence_number,
            content_len: 0,
        }
    }

    pub fn marshal_to(&self, out: &mut Vec<u8>, content_len: u16) {
        out.push(self.content_type as u8);
        out.push(self.protocol_version.major);
        out.push(self.protocol_version.minor);
        out.extend_from_slice(&self.epoch.to_be_bytes());
        out.extend_from_slice(&self.sequence_number.to_be_bytes()[2..8]);
        out.extend_from_slice(&content_len.to_be_bytes());
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<RecordLayerHeader> {
        if buf.remaining() < RECORD_LAYER_HEADER_SIZE {
            return Err(Error::ErrBufferTooSmall);
        }
        let content_type = ContentType::from_u8(buf.get_u8())?;
        let protocol_version = ProtocolVersion {
            major: buf.get_u8(),
            minor: buf.get_u8(),
        };
        let epoch = buf.get_u16();
        let mut seq = [0u8; 8];
        buf.copy_to_slice(&mut seq[2..8]);
        let sequence_number = u64::from_be_bytes(seq);
        let content_len = buf.get_u16();

        if protocol_version != PROTOCOL_VERSION_DTLS12 && protocol_version != PROTOCOL_VERSION_DTLS10
        {
            return Err(Error::ErrUnsupportedProtocolVersion);
        }
        Ok(RecordLayerHeader {
            content_type,
            protocol_version,
            epoch,
            sequence_number,
            content_len,
        })
    }
}
