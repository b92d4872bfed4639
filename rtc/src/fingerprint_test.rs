use super::*;

#[test]
fn test_fingerprint_format() {
    let fp = RtcFingerprint::sha256(b"not really a certificate");
    assert_eq!(fp.algorithm, "sha-256");
    // 32 bytes -> 32 hex pairs joined by colons
    assert_eq!(fp.value.len(), 32 * 3 - 1);
    assert!(fp.value.chars().all(|c| c.is_ascii_hexdigit() || c == ':'));
    assert_eq!(fp.value, fp.value.to_uppercase());
}

#[test]
fn test_matches_case_insensitive() {
    let der = b"certificate bytes";
    let mut fp = RtcFingerprint::sha256(der);
    fp.value = fp.value.to_lowercase();
    assert!(fp.matches(der));
    assert!(!fp.matches(b"different bytes"));
}

#[test]
fn test_wrong_algorithm_rejected() {
    let der = b"certificate bytes";
    let mut fp = RtcFingerprint::sha256(der);
    fp.algorithm = "sha-1".to_owned();
    assert!(!fp.matches(der));
}
