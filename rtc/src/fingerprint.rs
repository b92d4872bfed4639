#[cfg(test)]
#[path = "fingerprint_test.rs"]
mod fingerprint_test;

use sha2::{Digest, Sha256};

/// A certificate fingerprint as signaled in SDP: the hash algorithm
/// name plus upper-case colon-separated hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcFingerprint {
    pub algorithm: String,
    pub value: String,
}

impl RtcFingerprint {
    /// SHA-256 fingerprint of a DER certificate.
    pub fn sha256(certificate_der: &[u8]) -> RtcFingerprint {
        let digest = Sha256::digest(certificate_der);
        let value = digest
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":");
        RtcFingerprint {
            algorithm: "sha-256".to_owned(),
            value,
        }
    }

    /// Case-insensitive comparison against a peer certificate.
    pub fn matches(&self, certificate_der: &[u8]) -> bool {
        if !self.algorithm.eq_ignore_ascii_case("sha-256") {
            return false;
        }
        let actual = RtcFingerprint::sha256(certificate_der);
        actual.value.eq_ignore_ascii_case(&self.value)
    }
}
