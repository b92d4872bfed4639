use crate::error::Result;
use crate::param::Param;

/// HEARTBEAT carries one opaque HeartbeatInfo parameter the peer must
/// echo back (RFC 4960 section 3.3.5).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkHeartbeat {
    pub info: Vec<u8>,
}

impl ChunkHeartbeat {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        Param::HeartbeatInfo(self.info.clone()).marshal(out);
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkHeartbeat> {
        let params = Param::unmarshal_list(value)?;
        let info = params
            .into_iter()
            .find_map(|p| match p {
                Param::HeartbeatInfo(info) => Some(info),
                _ => None,
            })
            .unwrap_or_default();
        Ok(ChunkHeartbeat { info })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkHeartbeatAck {
    pub info: Vec<u8>,
}

impl ChunkHeartbeatAck {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        Param::HeartbeatInfo(self.info.clone()).marshal(out);
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkHeartbeatAck> {
        let hb = ChunkHeartbeat::unmarshal_value(value)?;
        Ok(ChunkHeartbeatAck { info: hb.info })
    }
}
