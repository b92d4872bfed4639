use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, HEADER_LENGTH};

pub const SDES_TYPE_END: u8 = 0;
pub const SDES_TYPE_CNAME: u8 = 1;

/// A chunk of a SourceDescription: one SSRC plus zero or more items,
/// null-terminated and padded to a 32-bit boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceDescriptionChunk {
    pub source: u32,
    pub items: Vec<SourceDescriptionItem>,
}

impl SourceDescriptionChunk {
    fn raw_size(&self) -> usize {
        4 + self.items.iter().map(|i| 2 + i.text.len()).sum::<usize>() + 1
    }

    fn padded_size(&self) -> usize {
        (self.raw_size() + 3) & !3
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceDescriptionItem {
    pub sdes_type: u8,
    pub text: String,
}

/// A SourceDescription (SDES) packet (RFC 3550 section 6.5).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceDescription {
    pub chunks: Vec<SourceDescriptionChunk>,
}

impl SourceDescription {
    /// Shorthand for the single-chunk CNAME form every compound carries.
    pub fn cname(ssrc: u32, cname: &str) -> Self {
        SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source: ssrc,
                items: vec![SourceDescriptionItem {
                    sdes_type: SDES_TYPE_CNAME,
                    text: cname.to_owned(),
                }],
            }],
        }
    }

    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.chunks.len() as u8,
            packet_type: PacketType::SourceDescription,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for SourceDescription {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + self.chunks.iter().map(|c| c.padded_size()).sum::<usize>()
    }
}

impl Marshal for SourceDescription {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        for chunk in &self.chunks {
            buf[n..n + 4].copy_from_slice(&chunk.source.to_be_bytes());
            n += 4;
            for item in &chunk.items {
                if item.text.len() > 255 {
                    return Err(util::Error::Other("SDES item text too long".to_owned()));
                }
                buf[n] = item.sdes_type;
                buf[n + 1] = item.text.len() as u8;
                n += 2;
                buf[n..n + item.text.len()].copy_from_slice(item.text.as_bytes());
                n += item.text.len();
            }
            buf[n] = SDES_TYPE_END;
            n += 1;
            while n % 4 != 0 {
                buf[n] = 0;
                n += 1;
            }
        }
        Ok(n)
    }
}

impl Unmarshal for SourceDescription {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PacketType::SourceDescription {
            return Err(util::Error::Other("not a source description".to_owned()));
        }
        let mut chunks = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            if buf.remaining() < 4 {
                return Err(util::Error::ErrBufferTooShort);
            }
            let source = buf.get_u32();
            let mut items = vec![];
            let mut consumed = 4usize;
            loop {
                if buf.remaining() < 1 {
                    return Err(util::Error::ErrBufferTooShort);
                }
                let sdes_type = buf.get_u8();
                consumed += 1;
                if sdes_type == SDES_TYPE_END {
                    break;
                }
                if buf.remaining() < 1 {
                    return Err(util::Error::ErrBufferTooShort);
                }
                let len = buf.get_u8() as usize;
                consumed += 1;
                if buf.remaining() < len {
                    return Err(util::Error::ErrBufferTooShort);
                }
                let text = String::from_utf8_lossy(&buf.copy_to_bytes(len)).into_owned();
                consumed += len;
                items.push(SourceDescriptionItem { sdes_type, text });
            }
            // consume chunk padding
            while consumed % 4 != 0 {
                if buf.remaining() < 1 {
                    return Err(util::Error::ErrBufferTooShort);
                }
                buf.get_u8();
                consumed += 1;
            }
            chunks.push(SourceDescriptionChunk { source, items });
        }
        Ok(SourceDescription { chunks })
    }
}
