use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use rand::Rng;

use crate::error::{Error, Result};
use crate::prf::{prf_encryption_keys, EncryptionKeys};
use crate::record_layer::record_layer_header::{ContentType, RecordLayerHeader};

/// TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 (RFC 5289), the one suite
/// WebRTC endpoints actually negotiate.
pub const TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: u16 = 0xc02b;

pub const GCM_KEY_LENGTH: usize = 16;
pub const GCM_IMPLICIT_IV_LENGTH: usize = 4;
pub const GCM_EXPLICIT_NONCE_LENGTH: usize = 8;
pub const GCM_TAG_LENGTH: usize = 16;

/// Per-epoch AEAD state for AES-128-GCM record protection (RFC 5288):
/// nonce = 4-byte implicit write IV || 8-byte explicit part carried on
/// the wire; AAD = epoch‖seq ‖ type ‖ version ‖ plaintext length.
pub struct CipherSuiteAes128GcmSha256 {
    local_gcm: Aes128Gcm,
    remote_gcm: Aes128Gcm,
    local_write_iv: Vec<u8>,
    remote_write_iv: Vec<u8>,
}

impl CipherSuiteAes128GcmSha256 {
    pub fn new(
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        is_client: bool,
    ) -> Result<Self> {
        let EncryptionKeys {
            client_write_key,
            server_write_key,
            client_write_iv,
            server_write_iv,
        } = prf_encryption_keys(
            master_secret,
            client_random,
            server_random,
            GCM_KEY_LENGTH,
            GCM_IMPLICIT_IV_LENGTH,
        )?;

        let (local_key, local_iv, remote_key, remote_iv) = if is_client {
            (client_write_key, client_write_iv, server_write_key, server_write_iv)
        } else {
            (server_write_key, server_write_iv, client_write_key, client_write_iv)
        };

        Ok(CipherSuiteAes128GcmSha256 {
            local_gcm: Aes128Gcm::new_from_slice(&local_key)
                .map_err(|e| Error::Crypto(e.to_string()))?,
            remote_gcm: Aes128Gcm::new_from_slice(&remote_key)
                .map_err(|e| Error::Crypto(e.to_string()))?,
            local_write_iv: local_iv,
            remote_write_iv: remote_iv,
        })
    }

    fn additional_data(header: &RecordLayerHeader, payload_len: usize) -> [u8; 13] {
        let mut aad = [0u8; 13];
        aad[..2].copy_from_slice(&header.epoch.to_be_bytes());
        aad[2..8].copy_from_slice(&header.sequence_number.to_be_bytes()[2..8]);
        aad[8] = header.content_type as u8;
        aad[9] = header.protocol_version.major;
        aad[10] = header.protocol_version.minor;
        aad[11..13].copy_from_slice(&(payload_len as u16).to_be_bytes());
        aad
    }

    /// Encrypts a record payload, returning the on-the-wire fragment:
    /// explicit nonce || ciphertext || tag.
    pub fn encrypt(&self, header: &RecordLayerHeader, payload: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&self.local_write_iv);
        rand::thread_rng().fill(&mut nonce[4..12]);

        let aad = Self::additional_data(header, payload.len());
        let ciphertext = self
            .local_gcm
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: payload,
                    aad: &aad,
                },
            )
            .map_err(|_| Error::ErrFailedToVerifyRecord)?;

        let mut out = Vec::with_capacity(GCM_EXPLICIT_NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(&nonce[4..12]);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypts an on-the-wire fragment into the record payload.
    pub fn decrypt(&self, header: &RecordLayerHeader, fragment: &[u8]) -> Result<Vec<u8>> {
        if fragment.len() < GCM_EXPLICIT_NONCE_LENGTH + GCM_TAG_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&self.remote_write_iv);
        nonce[4..12].copy_from_slice(&fragment[..GCM_EXPLICIT_NONCE_LENGTH]);

        let plaintext_len = fragment.len() - GCM_EXPLICIT_NONCE_LENGTH - GCM_TAG_LENGTH;
        let aad = Self::additional_data(header, plaintext_len);
        self.remote_gcm
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &fragment[GCM_EXPLICIT_NONCE_LENGTH..],
                    aad: &aad,
                },
            )
            .map_err(|_| Error::ErrFailedToVerifyRecord)
    }
}
