use super::*;
use crate::crypto::NamedCurve;
use crate::extension::Extension;
use crate::handshake::handshake_random::HandshakeRandom;

#[test]
fn test_client_hello_roundtrip() {
    let hello = HandshakeMessageClientHello {
        random: HandshakeRandom::generate(),
        cookie: vec![1, 2, 3, 4, 5],
        cipher_suites: vec![0xc02b],
        extensions: vec![
            Extension::SupportedEllipticCurves {
                curves: vec![NamedCurve::X25519, NamedCurve::P256],
            },
            Extension::UseSrtp {
                profiles: vec![0x0007, 0x0001],
            },
            Extension::ExtendedMasterSecret,
        ],
        ..Default::default()
    };
    let msg = HandshakeMessage::ClientHello(hello.clone());
    let body = msg.marshal_body();
    let parsed = HandshakeMessage::unmarshal_body(HandshakeType::ClientHello, &body).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_server_hello_roundtrip() {
    let hello = HandshakeMessageServerHello {
        random: HandshakeRandom::generate(),
        cipher_suite: 0xc02b,
        extensions: vec![
            Extension::UseSrtp {
                profiles: vec![0x0007],
            },
            Extension::ExtendedMasterSecret,
        ],
        ..Default::default()
    };
    let msg = HandshakeMessage::ServerHello(hello);
    let body = msg.marshal_body();
    let parsed = HandshakeMessage::unmarshal_body(HandshakeType::ServerHello, &body).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_server_key_exchange_roundtrip() {
    let kx = HandshakeMessageServerKeyExchange {
        named_curve: NamedCurve::X25519,
        public_key: vec![0xAB; 32],
        hash_algorithm: 4,
        signature_algorithm: 3,
        signature: vec![0xCD; 70],
    };
    let msg = HandshakeMessage::ServerKeyExchange(kx.clone());
    let body = msg.marshal_body();
    let parsed = HandshakeMessage::unmarshal_body(HandshakeType::ServerKeyExchange, &body).unwrap();
    assert_eq!(parsed, msg);

    // the signed params never include the signature fields
    let params = kx.params_bytes();
    assert_eq!(params[0], 3);
    assert_eq!(&params[1..3], &(NamedCurve::X25519 as u16).to_be_bytes());
    assert_eq!(params[3] as usize, 32);
    assert_eq!(params.len(), 4 + 32);
}

#[test]
fn test_certificate_roundtrip() {
    let msg = HandshakeMessage::Certificate(HandshakeMessageCertificate {
        certificate: vec![vec![0x30, 0x82, 0x01, 0x02], vec![0x30, 0x10]],
    });
    let body = msg.marshal_body();
    let parsed = HandshakeMessage::unmarshal_body(HandshakeType::Certificate, &body).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_finished_roundtrip() {
    let msg = HandshakeMessage::Finished(HandshakeMessageFinished {
        verify_data: vec![0x11; 12],
    });
    let body = msg.marshal_body();
    let parsed = HandshakeMessage::unmarshal_body(HandshakeType::Finished, &body).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_handshake_header_roundtrip() {
    let header = handshake_header::HandshakeHeader {
        handshake_type: HandshakeType::ClientHello,
        length: 0x00ABCD,
        message_sequence: 7,
        fragment_offset: 0x000102,
        fragment_length: 0x000304,
    };
    let mut out = vec![];
    header.marshal(&mut out);
    assert_eq!(out.len(), handshake_header::HANDSHAKE_HEADER_LENGTH);
    let mut buf = &out[..];
    let parsed = handshake_header::HandshakeHeader::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, header);
}

#[test]
fn test_unfragmented_wire_form() {
    let msg = HandshakeMessage::Finished(HandshakeMessageFinished {
        verify_data: vec![0u8; 12],
    });
    let wire = msg.marshal_message(3);
    assert_eq!(wire.len(), handshake_header::HANDSHAKE_HEADER_LENGTH + 12);
    // length == fragment_length for the unfragmented form
    assert_eq!(&wire[1..4], &wire[9..12]);
    // fragment_offset is zero
    assert_eq!(&wire[6..9], &[0, 0, 0]);
}
