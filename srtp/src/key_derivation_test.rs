use super::*;

// Key derivation test vectors from RFC 3711 appendix B.3.
#[test]
fn test_rfc3711_session_key() {
    let master_key = [
        0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, 0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE, 0x41,
        0x39,
    ];
    let master_salt = [
        0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, 0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
    ];

    let session_key =
        aes_cm_key_derivation(LABEL_SRTP_ENCRYPTION, &master_key, &master_salt, 0, 16).unwrap();
    assert_eq!(
        session_key,
        [
            0xC6, 0x1E, 0x7A, 0x93, 0x74, 0x4F, 0x39, 0xEE, 0x10, 0x73, 0x4A, 0xFE, 0x3F, 0xF7,
            0xA0, 0x87
        ]
    );

    let session_salt =
        aes_cm_key_derivation(LABEL_SRTP_SALT, &master_key, &master_salt, 0, 14).unwrap();
    assert_eq!(
        session_salt,
        [
            0x30, 0xCB, 0xBC, 0x08, 0x86, 0x3D, 0x8C, 0x85, 0xD4, 0x9D, 0xB3, 0x4A, 0x9A, 0xE1
        ]
    );

    let session_auth =
        aes_cm_key_derivation(LABEL_SRTP_AUTHENTICATION_TAG, &master_key, &master_salt, 0, 20)
            .unwrap();
    assert_eq!(
        session_auth,
        [
            0xCE, 0xBE, 0x32, 0x1F, 0x6F, 0xF7, 0x71, 0x6B, 0x6F, 0xD4, 0xAB, 0x49, 0xAF, 0x25,
            0x6A, 0x15, 0x6D, 0x38, 0xBA, 0xA4
        ]
    );
}

#[test]
fn test_nonzero_kdr_rejected() {
    let res = aes_cm_key_derivation(LABEL_SRTP_ENCRYPTION, &[0u8; 16], &[0u8; 14], 1, 16);
    assert_eq!(res, Err(Error::NonZeroKdrNotSupported));
}
