use std::net::SocketAddr;

use super::*;
use crate::message::{Message, BINDING_SUCCESS};

#[test]
fn test_xor_mapped_address_v4() {
    let mut m = Message::new(BINDING_SUCCESS);
    let addr: SocketAddr = "192.0.2.1:32853".parse().unwrap();
    XorMappedAddress(addr).add_to(&mut m);

    let decoded = Message::decode(&m.raw).unwrap();
    let got = XorMappedAddress::get_from(&decoded).unwrap();
    assert_eq!(got.0, addr);
}

#[test]
fn test_xor_mapped_address_v6() {
    let mut m = Message::new(BINDING_SUCCESS);
    let addr: SocketAddr = "[2001:db8::1]:5000".parse().unwrap();
    XorMappedAddress(addr).add_to(&mut m);

    let decoded = Message::decode(&m.raw).unwrap();
    let got = XorMappedAddress::get_from(&decoded).unwrap();
    assert_eq!(got.0, addr);
}

#[test]
fn test_xor_known_vector() {
    // RFC 5769 section 2.2: sample response with
    // XOR-MAPPED-ADDRESS 192.0.2.1:32853
    let mut m = Message::new(BINDING_SUCCESS);
    m.transaction_id.0 = [
        0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6, 0x86, 0xfa, 0x87, 0xdf, 0xae,
    ];
    let addr: SocketAddr = "192.0.2.1:32853".parse().unwrap();
    XorMappedAddress(addr).add_to(&mut m);
    let value = m.get(crate::message::ATTR_XOR_MAPPED_ADDRESS).unwrap();
    assert_eq!(value, &[0x00, 0x01, 0xa1, 0x47, 0xe1, 0x12, 0xa6, 0x43]);
}
