use super::*;

#[test]
fn test_ecdh_shared_secret_agreement() {
    for curve in [NamedCurve::X25519, NamedCurve::P256] {
        let a = NamedCurveKeypair::generate(curve);
        let b = NamedCurveKeypair::generate(curve);
        let secret_a = a.pre_master_secret(b.public_key()).unwrap();
        let secret_b = b.pre_master_secret(a.public_key()).unwrap();
        assert_eq!(secret_a, secret_b, "{curve:?}");
        assert_eq!(secret_a.len(), 32);
    }
}

#[test]
fn test_x25519_public_key_length() {
    let kp = NamedCurveKeypair::generate(NamedCurve::X25519);
    assert_eq!(kp.public_key().len(), 32);
}

#[test]
fn test_p256_public_key_is_uncompressed_point() {
    let kp = NamedCurveKeypair::generate(NamedCurve::P256);
    assert_eq!(kp.public_key().len(), 65);
    assert_eq!(kp.public_key()[0], 0x04);
}

#[test]
fn test_self_signed_certificate_sign_verify() {
    let cert = CryptoCertificate::generate_self_signed(vec!["webrtc".to_owned()]).unwrap();
    let public_key = extract_public_key(&cert.certificate_der).unwrap();

    let message = b"client_random server_random params";
    let signature = cert.sign_sha256(message);
    verify_signature(&public_key, message, &signature).unwrap();

    assert!(verify_signature(&public_key, b"tampered", &signature).is_err());
}

#[test]
fn test_bad_peer_public_key_rejected() {
    let kp = NamedCurveKeypair::generate(NamedCurve::P256);
    assert!(kp.pre_master_secret(&[0u8; 10]).is_err());
}
