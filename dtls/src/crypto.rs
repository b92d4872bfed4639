#[cfg(test)]
#[path = "crypto_test.rs"]
mod crypto_test;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePrivateKey;
use rand::rngs::OsRng;
use x509_parser::prelude::FromDer;

use crate::error::{Error, Result};

/// TLS NamedCurve registry values for the groups this stack supports
/// (RFC 8422 section 5.1.1). X25519 is preferred, P-256 the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NamedCurve {
    P256 = 0x0017,
    X25519 = 0x001d,
}

impl NamedCurve {
    pub fn from_u16(v: u16) -> Option<NamedCurve> {
        match v {
            0x0017 => Some(NamedCurve::P256),
            0x001d => Some(NamedCurve::X25519),
            _ => None,
        }
    }
}

/// An ephemeral ECDHE keypair for one handshake.
pub enum NamedCurveKeypair {
    P256 {
        secret: p256::ecdh::EphemeralSecret,
        public: Vec<u8>,
    },
    X25519 {
        secret: x25519_dalek::StaticSecret,
        public: Vec<u8>,
    },
}

impl NamedCurveKeypair {
    pub fn generate(curve: NamedCurve) -> NamedCurveKeypair {
        match curve {
            NamedCurve::P256 => {
                let secret = p256::ecdh::EphemeralSecret::random(&mut OsRng);
                // uncompressed SEC1 point, as RFC 8422 requires
                let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
                NamedCurveKeypair::P256 { secret, public }
            }
            NamedCurve::X25519 => {
                let secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
                let public = x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec();
                NamedCurveKeypair::X25519 { secret, public }
            }
        }
    }

    pub fn curve(&self) -> NamedCurve {
        match self {
            NamedCurveKeypair::P256 { .. } => NamedCurve::P256,
            NamedCurveKeypair::X25519 { .. } => NamedCurve::X25519,
        }
    }

    pub fn public_key(&self) -> &[u8] {
        match self {
            NamedCurveKeypair::P256 { public, .. } => public,
            NamedCurveKeypair::X25519 { public, .. } => public,
        }
    }

    /// ECDH shared secret with the peer's public key; this becomes the
    /// TLS pre-master secret.
    pub fn pre_master_secret(&self, peer_public: &[u8]) -> Result<Vec<u8>> {
        match self {
            NamedCurveKeypair::P256 { secret, .. } => {
                let point = p256::EncodedPoint::from_bytes(peer_public)
                    .map_err(|_| Error::ErrInvalidPeerPublicKey)?;
                let public = p256::PublicKey::from_sec1_bytes(point.as_ref())
                    .map_err(|_| Error::ErrInvalidPeerPublicKey)?;
                Ok(secret.diffie_hellman(&public).raw_secret_bytes().to_vec())
            }
            NamedCurveKeypair::X25519 { secret, .. } => {
                let bytes: [u8; 32] = peer_public
                    .try_into()
                    .map_err(|_| Error::ErrInvalidPeerPublicKey)?;
                let public = x25519_dalek::PublicKey::from(bytes);
                Ok(secret.diffie_hellman(&public).as_bytes().to_vec())
            }
        }
    }
}

/// A local identity: one DER certificate and its ECDSA P-256 signing key.
#[derive(Clone)]
pub struct CryptoCertificate {
    pub certificate_der: Vec<u8>,
    pub private_key: SigningKey,
}

impl CryptoCertificate {
    /// Mints the self-signed ECDSA P-256 certificate WebRTC endpoints
    /// identify with; validation is fingerprint-based at the peer.
    pub fn generate_self_signed(subject_alt_names: impl Into<Vec<String>>) -> Result<Self> {
        let mut params = rcgen::CertificateParams::new(subject_alt_names);
        params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;
        let cert =
            rcgen::Certificate::from_params(params).map_err(|e| Error::Crypto(e.to_string()))?;
        let certificate_der = cert.serialize_der().map_err(|e| Error::Crypto(e.to_string()))?;
        let key_der = cert.serialize_private_key_der();
        let private_key =
            SigningKey::from_pkcs8_der(&key_der).map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(CryptoCertificate {
            certificate_der,
            private_key,
        })
    }

    /// Builds an identity from façade-supplied DER blobs.
    pub fn from_der(certificate_der: Vec<u8>, pkcs8_private_key: &[u8]) -> Result<Self> {
        let private_key = SigningKey::from_pkcs8_der(pkcs8_private_key)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(CryptoCertificate {
            certificate_der,
            private_key,
        })
    }

    pub fn sign_sha256(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.private_key.sign(message);
        signature.to_der().as_bytes().to_vec()
    }
}

/// The signed payload of ServerKeyExchange:
/// client_random || server_random || ServerECDHParams.
pub fn value_key_message(
    client_random: &[u8],
    server_random: &[u8],
    params_bytes: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + params_bytes.len());
    out.extend_from_slice(client_random);
    out.extend_from_slice(server_random);
    out.extend_from_slice(params_bytes);
    out
}

/// Pulls the SEC1 public key point out of a DER certificate.
pub fn extract_public_key(certificate_der: &[u8]) -> Result<Vec<u8>> {
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(certificate_der)
        .map_err(|_| Error::ErrInvalidCertificate)?;
    Ok(cert.public_key().subject_public_key.data.to_vec())
}

/// Verifies an ECDSA-SHA256 signature with a SEC1 public key point.
pub fn verify_signature(public_key_sec1: &[u8], message: &[u8], signature_der: &[u8]) -> Result<()> {
    let key = VerifyingKey::from_sec1_bytes(public_key_sec1)
        .map_err(|_| Error::ErrInvalidCertificate)?;
    let signature =
        Signature::from_der(signature_der).map_err(|_| Error::ErrKeySignatureMismatch)?;
    key.verify(message, &signature)
        .map_err(|_| Error::ErrKeySignatureMismatch)
}
