#[cfg(test)]
#[path = "record_layer_test.rs"]
mod record_layer_test;

pub mod record_layer_header;

use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use record_layer_header::{RecordLayerHeader, RECORD_LAYER_HEADER_SIZE};

/// One DTLS record: header plus (possibly encrypted) fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayer {
    pub header: RecordLayerHeader,
    pub fragment: Bytes,
}

impl RecordLayer {
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_LAYER_HEADER_SIZE + self.fragment.len());
        self.header.marshal_to(&mut out, self.fragment.len() as u16);
        out.extend_from_slice(&self.fragment);
        out
    }
}

/// Splits one UDP datagram into the records it carries. A datagram may
/// pack several records (RFC 6347 section 4.1.1).
pub fn unpack_datagram(datagram: &[u8]) -> Result<Vec<RecordLayer>> {
    let mut records = vec![];
    let mut buf = datagram;
    while buf.has_remaining() {
        if buf.remaining() < RECORD_LAYER_HEADER_SIZE {
            return Err(Error::ErrBufferTooSmall);
        }
        let header = RecordLayerHeader::unmarshal(&mut buf)?;
        let len = header.content_len as usize;
        if buf.remaining() < len {
            return Err(Error::ErrInvalidPacketLength);
        }
        let fragment = buf.copy_to_bytes(len);
        records.push(RecordLayer { header, fragment });
    }
    Ok(records)
}
