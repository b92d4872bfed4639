use super::*;

#[test]
fn test_parse_stun() {
    let url = Url::parse("stun:stun.l.google.com:19302").unwrap();
    assert_eq!(url.scheme, SchemeType::Stun);
    assert_eq!(url.host, "stun.l.google.com");
    assert_eq!(url.port, 19302);
}

#[test]
fn test_parse_turn_with_transport() {
    let url = Url::parse("turn:turn.example.com:3478?transport=udp").unwrap();
    assert_eq!(url.scheme, SchemeType::Turn);
    assert_eq!(url.host, "turn.example.com");
    assert_eq!(url.port, 3478);
}

#[test]
fn test_default_port() {
    let url = Url::parse("stun:example.org").unwrap();
    assert_eq!(url.port, 3478);
}

#[test]
fn test_bad_scheme_rejected() {
    assert_eq!(Url::parse("http://example.org"), Err(Error::ErrSchemeType));
    assert!(Url::parse("no-colon-at-all").is_err());
}
