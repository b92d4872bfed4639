use crate::error::{Error, Result};
use crate::message::Message;

/// Unsigned 32-bit attribute (PRIORITY, LIFETIME, REQUESTED-TRANSPORT).
pub struct UInt32Attribute;

impl UInt32Attribute {
    pub fn add_to(m: &mut Message, attr: u16, v: u32) {
        m.add(attr, &v.to_be_bytes());
    }

    pub fn get_from(m: &Message, attr: u16) -> Result<u32> {
        let value = m.get(attr)?;
        if value.len() != 4 {
            return Err(Error::ErrAttributeSizeInvalid);
        }
        Ok(u32::from_be_bytes([value[0], value[1], value[2], value[3]]))
    }
}

/// Unsigned 64-bit attribute (ICE-CONTROLLING / ICE-CONTROLLED tiebreakers).
pub struct UInt64Attribute;

impl UInt64Attribute {
    pub fn add_to(m: &mut Message, attr: u16, v: u64) {
        m.add(attr, &v.to_be_bytes());
    }

    pub fn get_from(m: &Message, attr: u16) -> Result<u64> {
        let value = m.get(attr)?;
        if value.len() != 8 {
            return Err(Error::ErrAttributeSizeInvalid);
        }
        Ok(u64::from_be_bytes([
            value[0], value[1], value[2], value[3], value[4], value[5], value[6], value[7],
        ]))
    }
}
