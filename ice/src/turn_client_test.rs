use std::net::SocketAddr;

use stun::message::*;
use stun::textattrs::TextAttribute;
use stun::uattrs::UInt32Attribute;
use stun::xoraddr::XorMappedAddress;

use super::*;

fn client() -> TurnClient {
    TurnClient::new(
        "198.51.100.4:3478".parse().unwrap(),
        "user".to_owned(),
        "pass".to_owned(),
        0,
    )
}

#[test]
fn test_allocate_then_auth_retry() {
    let mut c = client();
    let first = c.allocate_request().unwrap();
    // no credentials yet
    assert!(first.get(ATTR_USERNAME).is_err());

    // server challenges with 401 + realm/nonce
    let mut challenge = Message::with_transaction_id(
        MessageType::new(Method::Allocate, MessageClass::ErrorResponse),
        first.transaction_id,
    );
    stun::error_code::ErrorCodeAttribute::new(stun::error_code::CODE_UNAUTHORIZED)
        .add_to(&mut challenge);
    TextAttribute::new(ATTR_REALM, "example.org".to_owned()).add_to(&mut challenge);
    TextAttribute::new(ATTR_NONCE, "abc123".to_owned()).add_to(&mut challenge);

    assert_eq!(
        c.handle_response(&challenge).unwrap(),
        TurnUpdate::RetryWithAuth
    );

    // the retried request carries the long-term credentials
    let second = c.allocate_request().unwrap();
    assert!(second.contains(ATTR_USERNAME));
    assert!(second.contains(ATTR_REALM));
    assert!(second.contains(ATTR_NONCE));
    assert!(second.contains(ATTR_MESSAGE_INTEGRITY));
}

#[test]
fn test_allocate_success_parses_addresses() {
    let mut c = client();
    let relayed: SocketAddr = "198.51.100.4:49152".parse().unwrap();
    let mapped: SocketAddr = "203.0.113.9:61000".parse().unwrap();

    let mut response = Message::new(MessageType::new(
        Method::Allocate,
        MessageClass::SuccessResponse,
    ));
    XorMappedAddress(relayed).add_to_as(&mut response, ATTR_XOR_RELAYED_ADDRESS);
    XorMappedAddress(mapped).add_to(&mut response);
    UInt32Attribute::add_to(&mut response, ATTR_LIFETIME, 300);

    match c.handle_response(&response).unwrap() {
        TurnUpdate::Allocated {
            relayed: r,
            mapped: m,
        } => {
            assert_eq!(r, relayed);
            assert_eq!(m, mapped);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(c.lifetime_seconds, 300);
    assert_eq!(c.relayed_address, Some(relayed));
}

#[test]
fn test_send_data_indication_roundtrip() {
    let c = client();
    let peer: SocketAddr = "192.0.2.1:9000".parse().unwrap();
    let indication = c.send_indication(peer, b"payload").unwrap();

    let decoded = Message::decode(&indication.raw).unwrap();
    let (got_peer, data) = TurnClient::parse_data_indication(&decoded).unwrap();
    assert_eq!(got_peer, peer);
    assert_eq!(data, b"payload");
}
