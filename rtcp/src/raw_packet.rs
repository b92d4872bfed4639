use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::Header;

/// RawPacket carries an RTCP packet this stack relays but does not
/// interpret (APP, XR). The bytes include the packet header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawPacket(pub Bytes);

impl RawPacket {
    pub fn header(&self) -> Header {
        let mut buf = &self.0[..];
        Header::unmarshal(&mut buf).unwrap_or_default()
    }
}

impl MarshalSize for RawPacket {
    fn marshal_size(&self) -> usize {
        self.0.len()
    }
}

impl Marshal for RawPacket {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.0.len() {
            return Err(util::Error::ErrBufferTooShort);
        }
        buf[..self.0.len()].copy_from_slice(&self.0);
        Ok(self.0.len())
    }
}

impl Unmarshal for RawPacket {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        // validate the header, then keep the whole packet verbatim
        let mut peek = buf.chunk();
        let header = Header::unmarshal(&mut peek)?;
        let len = (header.length as usize + 1) * 4;
        if buf.remaining() < len {
            return Err(util::Error::ErrBufferTooShort);
        }
        Ok(RawPacket(buf.copy_to_bytes(len)))
    }
}
