use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, FORMAT_PLI, HEADER_LENGTH, SSRC_LENGTH};

/// PictureLossIndication (PLI, PT=206 FMT=1) informs the encoder about
/// the loss of an undefined amount of coded video data (RFC 4585 6.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PictureLossIndication {
    /// SSRC of the sender of this feedback.
    pub sender_ssrc: u32,
    /// SSRC of the media source the loss was observed on.
    pub media_ssrc: u32,
}

impl PictureLossIndication {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_PLI,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for PictureLossIndication {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH * 2
    }
}

impl Marshal for PictureLossIndication {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&self.media_ssrc.to_be_bytes());
        n += 4;
        Ok(n)
    }
}

impl Unmarshal for PictureLossIndication {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let _header = Header::unmarshal(buf)?;
        if buf.remaining() < SSRC_LENGTH * 2 {
            return Err(util::Error::ErrBufferTooShort);
        }
        Ok(PictureLossIndication {
            sender_ssrc: buf.get_u32(),
            media_ssrc: buf.get_u32(),
        })
    }
}
