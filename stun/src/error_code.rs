use crate::error::{Error, Result};
use crate::message::{Message, ATTR_ERROR_CODE};

pub const CODE_UNAUTHORIZED: u16 = 401;
pub const CODE_STALE_NONCE: u16 = 438;
pub const CODE_ROLE_CONFLICT: u16 = 487;
pub const CODE_SERVER_ERROR: u16 = 500;

/// ERROR-CODE attribute (RFC 5389 section 15.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCodeAttribute {
    pub code: u16,
    pub reason: String,
}

impl ErrorCodeAttribute {
    pub fn new(code: u16) -> Self {
        let reason = match code {
            CODE_UNAUTHORIZED => "Unauthorized",
            CODE_STALE_NONCE => "Stale Nonce",
            CODE_ROLE_CONFLICT => "Role Conflict",
            CODE_SERVER_ERROR => "Server Error",
            _ => "",
        };
        ErrorCodeAttribute {
            code,
            reason: reason.to_owned(),
        }
    }

    pub fn add_to(&self, m: &mut Message) {
        let mut value = vec![0u8, 0u8];
        value.push((self.code / 100) as u8);
        value.push((self.code % 100) as u8);
        value.extend_from_slice(self.reason.as_bytes());
        m.add(ATTR_ERROR_CODE, &value);
    }

    pub fn get_from(m: &Message) -> Result<ErrorCodeAttribute> {
        let value = m.get(ATTR_ERROR_CODE)?;
        if value.len() < 4 {
            return Err(Error::ErrErrorCodeTooShort);
        }
        let code = (value[2] & 0x7) as u16 * 100 + value[3] as u16;
        let reason = String::from_utf8_lossy(&value[4..]).into_owned();
        Ok(ErrorCodeAttribute { code, reason })
    }
}
