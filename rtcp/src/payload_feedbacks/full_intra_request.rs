use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, FORMAT_FIR, HEADER_LENGTH, SSRC_LENGTH};

/// One FIR entry; entries are 8-byte aligned (RFC 5104 section 4.3.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirEntry {
    pub ssrc: u32,
    /// Command sequence number, must increase per media SSRC; receivers
    /// ignore a FIR whose number does not.
    pub sequence_number: u8,
}

/// FullIntraRequest (FIR, PT=206 FMT=4) forces a keyframe from the
/// indicated encoders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FullIntraRequest {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub fir: Vec<FirEntry>,
}

impl FullIntraRequest {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_FIR,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for FullIntraRequest {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH * 2 + self.fir.len() * 8
    }
}

impl Marshal for FullIntraRequest {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&self.media_ssrc.to_be_bytes());
        n += 4;
        for entry in &self.fir {
            buf[n..n + 4].copy_from_slice(&entry.ssrc.to_be_bytes());
            n += 4;
            buf[n] = entry.sequence_number;
            buf[n + 1] = 0;
            buf[n + 2] = 0;
            buf[n + 3] = 0;
            n += 4;
        }
        Ok(n)
    }
}

impl Unmarshal for FullIntraRequest {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        let body_len = header.length as usize * 4;
        if body_len < SSRC_LENGTH * 2 || (body_len - SSRC_LENGTH * 2) % 8 != 0 {
            return Err(util::Error::Other("FIR entries must be 8-byte aligned".to_owned()));
        }
        if buf.remaining() < body_len {
            return Err(util::Error::ErrBufferTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        let mut fir = vec![];
        for _ in 0..(body_len - SSRC_LENGTH * 2) / 8 {
            let ssrc = buf.get_u32();
            let sequence_number = buf.get_u8();
            buf.advance(3);
            fir.push(FirEntry {
                ssrc,
                sequence_number,
            });
        }
        Ok(FullIntraRequest {
            sender_ssrc,
            media_ssrc,
            fir,
        })
    }
}
