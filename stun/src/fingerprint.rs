use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::{Error, Result};
use crate::message::{Message, ATTRIBUTE_HEADER_SIZE, ATTR_FINGERPRINT, MESSAGE_HEADER_SIZE};

const FINGERPRINT_XOR: u32 = 0x5354_554e;
const FINGERPRINT_SIZE: usize = 4;

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// FINGERPRINT, CRC-32 of the message up to the attribute XOR'ed with
/// 0x5354554e (RFC 5389 section 15.5). Always the last attribute.
pub struct Fingerprint;

impl Fingerprint {
    pub fn add_to(m: &mut Message) -> Result<()> {
        m.encode();
        let crc = crc_over(&m.raw, m.raw.len());
        m.add(ATTR_FINGERPRINT, &crc.to_be_bytes());
        Ok(())
    }

    pub fn check(m: &Message) -> Result<()> {
        let stored = m.get(ATTR_FINGERPRINT)?;
        if stored.len() != FINGERPRINT_SIZE {
            return Err(Error::ErrAttributeSizeInvalid);
        }
        let offset = m
            .attr_offset(ATTR_FINGERPRINT)
            .ok_or(Error::ErrAttributeNotFound)?;
        let expected = crc_over(&m.raw, offset);
        let got = u32::from_be_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if expected == got {
            Ok(())
        } else {
            Err(Error::ErrFingerprintMismatch)
        }
    }
}

fn crc_over(raw: &[u8], end: usize) -> u32 {
    let mut buf = raw[..end].to_vec();
    let patched_len = (end - MESSAGE_HEADER_SIZE + FINGERPRINT_SIZE + ATTRIBUTE_HEADER_SIZE) as u16;
    buf[2..4].copy_from_slice(&patched_len.to_be_bytes());
    CRC32.checksum(&buf) ^ FINGERPRINT_XOR
}
