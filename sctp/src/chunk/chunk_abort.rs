use bytes::Buf;

use crate::error::{Error, Result};

/// User-initiated abort (RFC 4960 section 3.3.10.12).
pub const CAUSE_USER_INITIATED_ABORT: u16 = 12;
pub const CAUSE_PROTOCOL_VIOLATION: u16 = 13;

/// One error cause TLV, kept opaque beyond its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCause {
    pub code: u16,
    pub info: Vec<u8>,
}

/// ABORT and ERROR chunks share this shape: a list of error causes
/// (RFC 4960 sections 3.3.7/3.3.10).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkAbort {
    pub error_causes: Vec<ErrorCause>,
}

impl ChunkAbort {
    pub fn user_initiated() -> Self {
        ChunkAbort {
            error_causes: vec![ErrorCause {
                code: CAUSE_USER_INITIATED_ABORT,
                info: vec![],
            }],
        }
    }

    pub fn first_cause_code(&self) -> u16 {
        self.error_causes.first().map(|c| c.code).unwrap_or(0)
    }

    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        for cause in &self.error_causes {
            out.extend_from_slice(&cause.code.to_be_bytes());
            out.extend_from_slice(&((cause.info.len() + 4) as u16).to_be_bytes());
            out.extend_from_slice(&cause.info);
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
    }

    pub(crate) fn unmarshal_value(value: &[u8]) -> Result<ChunkAbort> {
        let mut buf = value;
        let mut error_causes = vec![];
        while buf.remaining() >= 4 {
            let code = buf.get_u16();
            let len = buf.get_u16() as usize;
            if len < 4 || buf.remaining() < len - 4 {
                return Err(Error::ErrChunkHeaderInvalidLength);
            }
            let info = buf.copy_to_bytes(len - 4).to_vec();
            let pad = (4 - (len % 4)) % 4;
            if buf.remaining() < pad {
                break;
            }
            buf.advance(pad);
            error_causes.push(ErrorCause { code, info });
        }
        Ok(ChunkAbort { error_causes })
    }
}
