#[cfg(test)]
#[path = "xoraddr_test.rs"]
mod xoraddr_test;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::addr::{FAMILY_IPV4, FAMILY_IPV6};
use crate::error::{Error, Result};
use crate::message::{Message, ATTR_XOR_MAPPED_ADDRESS, MAGIC_COOKIE};

/// XOR-MAPPED-ADDRESS and friends (XOR-PEER-ADDRESS, XOR-RELAYED-ADDRESS):
/// port is XOR'ed with the top half of the magic cookie, an IPv4 address
/// with the cookie itself, an IPv6 address with cookie || transaction id
/// (RFC 5389 section 15.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorMappedAddress(pub SocketAddr);

impl XorMappedAddress {
    pub fn add_to(&self, m: &mut Message) {
        self.add_to_as(m, ATTR_XOR_MAPPED_ADDRESS);
    }

    pub fn add_to_as(&self, m: &mut Message, typ: u16) {
        let addr = self.0;
        let xor_port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
        let mut value = vec![0u8];
        match addr.ip() {
            IpAddr::V4(ip) => {
                value.push(FAMILY_IPV4);
                value.extend_from_slice(&xor_port.to_be_bytes());
                let xored = u32::from(ip) ^ MAGIC_COOKIE;
                value.extend_from_slice(&xored.to_be_bytes());
            }
            IpAddr::V6(ip) => {
                value.push(FAMILY_IPV6);
                value.extend_from_slice(&xor_port.to_be_bytes());
                let mut xor_mask = [0u8; 16];
                xor_mask[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
                xor_mask[4..].copy_from_slice(&m.transaction_id.0);
                let oct = ip.octets();
                for i in 0..16 {
                    value.push(oct[i] ^ xor_mask[i]);
                }
            }
        }
        m.add(typ, &value);
    }

    pub fn get_from(m: &Message) -> Result<XorMappedAddress> {
        Self::get_from_as(m, ATTR_XOR_MAPPED_ADDRESS)
    }

    pub fn get_from_as(m: &Message, typ: u16) -> Result<XorMappedAddress> {
        let value = m.get(typ)?;
        if value.len() < 4 {
            return Err(Error::ErrAttributeSizeInvalid);
        }
        let family = value[1];
        let port = u16::from_be_bytes([value[2], value[3]]) ^ (MAGIC_COOKIE >> 16) as u16;
        match family {
            FAMILY_IPV4 => {
                if value.len() < 8 {
                    return Err(Error::ErrAttributeSizeInvalid);
                }
                let raw = u32::from_be_bytes([value[4], value[5], value[6], value[7]]);
                let ip = Ipv4Addr::from(raw ^ MAGIC_COOKIE);
                Ok(XorMappedAddress(SocketAddr::new(IpAddr::V4(ip), port)))
            }
            FAMILY_IPV6 => {
                if value.len() < 20 {
                    return Err(Error::ErrAttributeSizeInvalid);
                }
                let mut xor_mask = [0u8; 16];
                xor_mask[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
                xor_mask[4..].copy_from_slice(&m.transaction_id.0);
                let mut oct = [0u8; 16];
                for i in 0..16 {
                    oct[i] = value[4 + i] ^ xor_mask[i];
                }
                Ok(XorMappedAddress(SocketAddr::new(
                    IpAddr::V6(Ipv6Addr::from(oct)),
                    port,
                )))
            }
            f => Err(Error::ErrUnsupportedFamily(f)),
        }
    }
}
