use bytes::Buf;

use crate::error::{Error, Result};
use crate::param::Param;

pub const INIT_CHUNK_FIXED_SIZE: usize = 16;

/// INIT and INIT-ACK share this layout (RFC 4960 sections 3.3.2/3.3.3);
/// INIT-ACK additionally carries a STATE-COOKIE parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkInit {
    pub initiate_tag: u32,
    pub advertised_receiver_window_credit: u32,
    pub num_outbound_streams: u16,
    pub num_inbound_streams: u16,
    pub initial_tsn: u32,
    pub params: Vec<Param>,
}

impl ChunkInit {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.initiate_tag.to_be_bytes());
        out.extend_from_slice(&self.advertised_receiver_window_credit.to_be_bytes());
        out.extend_from_slice(&self.num_outbound_streams.to_be_bytes());
        out.extend_from_slice(&self.num_inbound_streams.to_be_bytes());
        out.extend_from_slice(&self.initial_tsn.to_be_bytes());
        for param in &self.params {
            param.marshal(out);
        }
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkInit> {
        if value.len() < INIT_CHUNK_FIXED_SIZE {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        let mut buf = value;
        let initiate_tag = buf.get_u32();
        let advertised_receiver_window_credit = buf.get_u32();
        let num_outbound_streams = buf.get_u16();
        let num_inbound_streams = buf.get_u16();
        let initial_tsn = buf.get_u32();
        let params = Param::unmarshal_list(buf)?;

        Ok(ChunkInit {
            initiate_tag,
            advertised_receiver_window_credit,
            num_outbound_streams,
            num_inbound_streams,
            initial_tsn,
            params,
        })
    }

    pub fn cookie(&self) -> Option<&[u8]> {
        self.params.iter().find_map(|p| match p {
            Param::StateCookie(cookie) => Some(cookie.as_slice()),
            _ => None,
        })
    }

    pub fn forward_tsn_supported(&self) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p, Param::ForwardTsnSupported))
    }
}
