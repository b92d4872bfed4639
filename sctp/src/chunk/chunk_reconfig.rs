use crate::error::Result;
use crate::param::Param;

/// RE-CONFIG carries one or two reconfiguration parameters
/// (RFC 6525 section 3.1).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkReconfig {
    pub param_a: Option<Param>,
    pub param_b: Option<Param>,
}

impl ChunkReconfig {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        if let Some(param) = &self.param_a {
            param.marshal(out);
        }
        if let Some(param) = &self.param_b {
            param.marshal(out);
        }
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkReconfig> {
        let mut params = Param::unmarshal_list(value)?.into_iter();
        Ok(ChunkReconfig {
            param_a: params.next(),
            param_b: params.next(),
        })
    }
}
