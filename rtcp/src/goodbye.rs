use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, HEADER_LENGTH, SSRC_LENGTH};

/// A Goodbye (BYE) packet indicates that one or more sources are no longer
/// active (RFC 3550 section 6.6).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Goodbye {
    pub sources: Vec<u32>,
    pub reason: String,
}

impl Goodbye {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.sources.len() as u8,
            packet_type: PacketType::Goodbye,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for Goodbye {
    fn marshal_size(&self) -> usize {
        let mut size = HEADER_LENGTH + self.sources.len() * SSRC_LENGTH;
        if !self.reason.is_empty() {
            size += (1 + self.reason.len() + 3) & !3;
        }
        size
    }
}

impl Marshal for Goodbye {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        if self.reason.len() > 255 {
            return Err(util::Error::Other("BYE reason too long".to_owned()));
        }
        let mut n = self.header().marshal_to(buf)?;
        for source in &self.sources {
            buf[n..n + 4].copy_from_slice(&source.to_be_bytes());
            n += 4;
        }
        if !self.reason.is_empty() {
            buf[n] = self.reason.len() as u8;
            n += 1;
            buf[n..n + self.reason.len()].copy_from_slice(self.reason.as_bytes());
            n += self.reason.len();
            while n % 4 != 0 {
                buf[n] = 0;
                n += 1;
            }
        }
        Ok(n)
    }
}

impl Unmarshal for Goodbye {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PacketType::Goodbye {
            return Err(util::Error::Other("not a goodbye".to_owned()));
        }
        if buf.remaining() < header.count as usize * SSRC_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut sources = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            sources.push(buf.get_u32());
        }
        let reason = if buf.has_remaining() {
            let len = buf.get_u8() as usize;
            if buf.remaining() < len {
                return Err(util::Error::ErrBufferTooShort);
            }
            String::from_utf8_lossy(&buf.copy_to_bytes(len)).into_owned()
        } else {
            String::new()
        };
        Ok(Goodbye { sources, reason })
    }
}
