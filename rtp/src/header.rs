#[cfg(test)]
#[path = "header_test.rs"]
mod header_test;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;

pub const HEADER_LENGTH: usize = 4;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const EXTENSION_SHIFT: u8 = 4;
pub const CC_MASK: u8 = 0xF;
pub const MARKER_SHIFT: u8 = 7;
pub const PT_MASK: u8 = 0x7F;

pub const CSRC_LENGTH: usize = 4;
pub const FIXED_HEADER_SIZE: usize = 12;

/// Header represents an RTP packet header.
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// A header extension, when present, is carried verbatim: the profile
/// word plus the 4-byte-aligned payload. The SRTP layer treats the whole
/// header including extension as AAD, so lossless passthrough matters
/// more than structured access here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension_profile: u16,
    pub extension_payload: Bytes,
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        let mut size = FIXED_HEADER_SIZE + self.csrc.len() * CSRC_LENGTH;
        if self.extension {
            size += 4 + self.extension_payload.len();
        }
        size
    }
}

impl Unmarshal for Header {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        if raw_packet.remaining() < FIXED_HEADER_SIZE {
            return Err(util::Error::ErrBufferTooShort);
        }

        let b0 = raw_packet.get_u8();
        let version = b0 >> VERSION_SHIFT & VERSION_MASK;
        if version != 2 {
            return Err(util::Error::Other(Error::ErrBadVersion.to_string()));
        }
        let padding = (b0 >> PADDING_SHIFT & 0x1) > 0;
        let extension = (b0 >> EXTENSION_SHIFT & 0x1) > 0;
        let cc = (b0 & CC_MASK) as usize;

        let b1 = raw_packet.get_u8();
        let marker = (b1 >> MARKER_SHIFT & 0x1) > 0;
        let payload_type = b1 & PT_MASK;

        let sequence_number = raw_packet.get_u16();
        let timestamp = raw_packet.get_u32();
        let ssrc = raw_packet.get_u32();

        if raw_packet.remaining() < cc * CSRC_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut csrc = Vec::with_capacity(cc);
        for _ in 0..cc {
            csrc.push(raw_packet.get_u32());
        }

        let (extension_profile, extension_payload) = if extension {
            if raw_packet.remaining() < 4 {
                return Err(util::Error::Other(
                    Error::ErrHeaderSizeInsufficientForExtension.to_string(),
                ));
            }
            let profile = raw_packet.get_u16();
            let length = raw_packet.get_u16() as usize * 4;
            if raw_packet.remaining() < length {
                return Err(util::Error::Other(
                    Error::ErrHeaderSizeInsufficientForExtension.to_string(),
                ));
            }
            (profile, raw_packet.copy_to_bytes(length))
        } else {
            (0, Bytes::new())
        };

        Ok(Header {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extension_payload,
        })
    }
}

impl Marshal for Header {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(util::Error::ErrBufferTooShort);
        }

        let mut b0 = 2u8 << VERSION_SHIFT;
        if self.padding {
            b0 |= 1 << PADDING_SHIFT;
        }
        if self.extension {
            b0 |= 1 << EXTENSION_SHIFT;
        }
        b0 |= self.csrc.len() as u8 & CC_MASK;
        buf[0] = b0;

        let mut b1 = self.payload_type & PT_MASK;
        if self.marker {
            b1 |= 1 << MARKER_SHIFT;
        }
        buf[1] = b1;

        buf[2..4].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        let mut n = FIXED_HEADER_SIZE;
        for csrc in &self.csrc {
            buf[n..n + 4].copy_from_slice(&csrc.to_be_bytes());
            n += 4;
        }

        if self.extension {
            if self.extension_payload.len() % 4 != 0 {
                return Err(util::Error::Other(
                    Error::ErrExtensionPayloadNotAligned.to_string(),
                ));
            }
            buf[n..n + 2].copy_from_slice(&self.extension_profile.to_be_bytes());
            n += 2;
            let words = (self.extension_payload.len() / 4) as u16;
            buf[n..n + 2].copy_from_slice(&words.to_be_bytes());
            n += 2;
            buf[n..n + self.extension_payload.len()].copy_from_slice(&self.extension_payload);
            n += self.extension_payload.len();
        }

        Ok(n)
    }
}
