use super::*;
use crate::fingerprint::Fingerprint;
use crate::integrity::MessageIntegrity;
use crate::uattrs::UInt32Attribute;

#[test]
fn test_message_type_roundtrip() {
    let cases = [
        (BINDING_REQUEST, 0x0001u16),
        (BINDING_SUCCESS, 0x0101),
        (BINDING_ERROR, 0x0111),
        (BINDING_INDICATION, 0x0011),
        (
            MessageType::new(Method::Allocate, MessageClass::Request),
            0x0003,
        ),
        (
            MessageType::new(Method::CreatePermission, MessageClass::Request),
            0x0008,
        ),
        (MessageType::new(Method::Send, MessageClass::Indication), 0x0016),
        (MessageType::new(Method::Data, MessageClass::Indication), 0x0017),
    ];
    for (typ, wire) in cases {
        assert_eq!(typ.value(), wire, "{typ}");
        assert_eq!(MessageType::from_value(wire), Some(typ));
    }
}

#[test]
fn test_message_encode_decode() {
    let mut m = Message::new(BINDING_REQUEST);
    UInt32Attribute::add_to(&mut m, ATTR_PRIORITY, 0x6e7f_feff);
    m.add(ATTR_USE_CANDIDATE, &[]);

    let decoded = Message::decode(&m.raw).unwrap();
    assert_eq!(decoded.typ, Some(BINDING_REQUEST));
    assert_eq!(decoded.transaction_id, m.transaction_id);
    assert_eq!(
        UInt32Attribute::get_from(&decoded, ATTR_PRIORITY).unwrap(),
        0x6e7f_feff
    );
    assert!(decoded.contains(ATTR_USE_CANDIDATE));
}

#[test]
fn test_attribute_padding() {
    let mut m = Message::new(BINDING_REQUEST);
    // 5-byte value pads to 8 on the wire but round-trips unpadded
    m.add(ATTR_USERNAME, b"abcde");
    let decoded = Message::decode(&m.raw).unwrap();
    assert_eq!(decoded.get(ATTR_USERNAME).unwrap(), b"abcde");
    assert_eq!(m.raw.len(), MESSAGE_HEADER_SIZE + 4 + 8);
}

#[test]
fn test_integrity_then_fingerprint() {
    let mut m = Message::new(BINDING_REQUEST);
    m.add(ATTR_USERNAME, b"remote:local");
    let integrity = MessageIntegrity::new_short_term("thepassword");
    integrity.add_to(&mut m).unwrap();
    Fingerprint::add_to(&mut m).unwrap();

    let decoded = Message::decode(&m.raw).unwrap();
    Fingerprint::check(&decoded).unwrap();
    integrity.check(&decoded).unwrap();

    let wrong = MessageIntegrity::new_short_term("otherpassword");
    assert_eq!(wrong.check(&decoded), Err(Error::ErrIntegrityMismatch));
}

#[test]
fn test_tampered_fingerprint_rejected() {
    let mut m = Message::new(BINDING_REQUEST);
    m.add(ATTR_USERNAME, b"u");
    Fingerprint::add_to(&mut m).unwrap();
    let mut raw = m.raw.clone();
    let idx = MESSAGE_HEADER_SIZE + 4; // first byte of USERNAME value
    raw[idx] ^= 0xff;
    let decoded = Message::decode(&raw).unwrap();
    assert_eq!(Fingerprint::check(&decoded), Err(Error::ErrFingerprintMismatch));
}

#[test]
fn test_is_message() {
    let m = Message::new(BINDING_REQUEST);
    assert!(is_message(&m.raw));
    assert!(!is_message(&[0u8; 8]));
    let mut not_stun = m.raw.clone();
    not_stun[4] = 0;
    assert!(!is_message(&not_stun));
}
