use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit, Nonce};
use bytes::{Bytes, BytesMut};
use util::marshal::MarshalSize;

use super::{Cipher, RTCP_ENCRYPTION_FLAG, SRTCP_INDEX_SIZE};
use crate::error::{Error, Result};
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

pub const CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN: usize = 16;

enum AeadKind {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl AeadKind {
    fn encrypt(&self, nonce: &[u8], payload: Payload<'_, '_>) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let out = match self {
            AeadKind::Aes128(c) => c.encrypt(nonce, payload),
            AeadKind::Aes256(c) => c.encrypt(nonce, payload),
        };
        out.map_err(Error::AesGcm)
    }

    fn decrypt(&self, nonce: &[u8], payload: Payload<'_, '_>) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let out = match self {
            AeadKind::Aes128(c) => c.decrypt(nonce, payload),
            AeadKind::Aes256(c) => c.decrypt(nonce, payload),
        };
        out.map_err(|_| Error::FailedToVerifyAuthTag)
    }
}

/// AEAD cipher for the SRTP_AEAD_AES_128_GCM and SRTP_AEAD_AES_256_GCM
/// protection profiles (RFC 7714).
pub(crate) struct CipherAeadAesGcm {
    profile: ProtectionProfile,
    srtp_cipher: AeadKind,
    srtcp_cipher: AeadKind,
    srtp_session_salt: Vec<u8>,
    srtcp_session_salt: Vec<u8>,
}

impl CipherAeadAesGcm {
    pub(crate) fn new(
        profile: ProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<CipherAeadAesGcm> {
        let key_len = master_key.len();

        let srtp_session_key =
            aes_cm_key_derivation(LABEL_SRTP_ENCRYPTION, master_key, master_salt, 0, key_len)?;
        let srtcp_session_key =
            aes_cm_key_derivation(LABEL_SRTCP_ENCRYPTION, master_key, master_salt, 0, key_len)?;
        let srtp_session_salt = aes_cm_key_derivation(
            LABEL_SRTP_SALT,
            master_key,
            master_salt,
            0,
            master_salt.len(),
        )?;
        let srtcp_session_salt = aes_cm_key_derivation(
            LABEL_SRTCP_SALT,
            master_key,
            master_salt,
            0,
            master_salt.len(),
        )?;

        let make = |key: &[u8]| -> Result<AeadKind> {
            Ok(match key.len() {
                16 => AeadKind::Aes128(
                    Aes128Gcm::new_from_slice(key)
                        .map_err(|_| Error::SrtpMasterKeyLength(16, key.len()))?,
                ),
                32 => AeadKind::Aes256(
                    Aes256Gcm::new_from_slice(key)
                        .map_err(|_| Error::SrtpMasterKeyLength(32, key.len()))?,
                ),
                n => return Err(Error::SrtpMasterKeyLength(16, n)),
            })
        };

        Ok(CipherAeadAesGcm {
            profile,
            srtp_cipher: make(&srtp_session_key)?,
            srtcp_cipher: make(&srtcp_session_key)?,
            srtp_session_salt,
            srtcp_session_salt,
        })
    }

    /// The 12-octet IV is 2 zero octets, the 4-octet SSRC, the 4-octet
    /// ROC and the 2-octet SEQ, XORed with the session salt
    /// (RFC 7714 section 8.1).
    fn rtp_initialization_vector(&self, header: &rtp::header::Header, roc: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&header.ssrc.to_be_bytes());
        iv[6..10].copy_from_slice(&roc.to_be_bytes());
        iv[10..12].copy_from_slice(&header.sequence_number.to_be_bytes());
        for (i, v) in iv.iter_mut().enumerate() {
            *v ^= self.srtp_session_salt[i];
        }
        iv
    }

    /// 2 zero octets, 4-octet SSRC, 2 zero octets, 4-octet SRTCP index,
    /// XORed with the session salt (RFC 7714 section 9.1).
    fn rtcp_initialization_vector(&self, srtcp_index: u32, ssrc: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&ssrc.to_be_bytes());
        iv[8..12].copy_from_slice(&srtcp_index.to_be_bytes());
        for (i, v) in iv.iter_mut().enumerate() {
            *v ^= self.srtcp_session_salt[i];
        }
        iv
    }

    /// The 12-octet RTCP AAD is the first 8 octets of the packet followed
    /// by the E-flag and 31-bit SRTCP index (RFC 7714 section 9.3).
    fn rtcp_additional_authenticated_data(&self, packet: &[u8], srtcp_index: u32) -> [u8; 12] {
        let mut aad = [0u8; 12];
        aad[..8].copy_from_slice(&packet[..8]);
        aad[8..12].copy_from_slice(&srtcp_index.to_be_bytes());
        aad[8] |= RTCP_ENCRYPTION_FLAG;
        aad
    }
}

impl Cipher for CipherAeadAesGcm {
    fn rtp_auth_tag_len(&self) -> usize {
        // the GCM tag lives inside the ciphertext
        0
    }

    fn rtcp_auth_tag_len(&self) -> usize {
        0
    }

    fn encrypt_rtp(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        let header_len = header.marshal_size();
        let mut writer =
            BytesMut::with_capacity(plaintext.len() + CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN);

        writer.extend_from_slice(&plaintext[..header_len]);
        let nonce = self.rtp_initialization_vector(header, roc);
        let encrypted = self.srtp_cipher.encrypt(
            &nonce,
            Payload {
                msg: &plaintext[header_len..],
                aad: &writer,
            },
        )?;
        writer.extend(encrypted);
        Ok(writer.freeze())
    }

    fn decrypt_rtp(
        &mut self,
        ciphertext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        let header_len = header.marshal_size();
        if ciphertext.len() < header_len + CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN {
            return Err(Error::SrtpTooSmall(
                ciphertext.len(),
                header_len + CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN,
            ));
        }
        let nonce = self.rtp_initialization_vector(header, roc);
        let decrypted = self.srtp_cipher.decrypt(
            &nonce,
            Payload {
                msg: &ciphertext[header_len..],
                aad: &ciphertext[..header_len],
            },
        )?;
        let mut writer = BytesMut::with_capacity(header_len + decrypted.len());
        writer.extend_from_slice(&ciphertext[..header_len]);
        writer.extend(decrypted);
        Ok(writer.freeze())
    }

    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: u32, ssrc: u32) -> Result<Bytes> {
        let nonce = self.rtcp_initialization_vector(srtcp_index, ssrc);
        let aad = self.rtcp_additional_authenticated_data(plaintext, srtcp_index);
        let encrypted = self.srtcp_cipher.encrypt(
            &nonce,
            Payload {
                msg: &plaintext[8..],
                aad: &aad,
            },
        )?;

        let mut writer = BytesMut::with_capacity(8 + encrypted.len() + SRTCP_INDEX_SIZE);
        writer.extend_from_slice(&plaintext[..8]);
        writer.extend(encrypted);
        writer.extend_from_slice(&aad[8..12]);
        Ok(writer.freeze())
    }

    fn decrypt_rtcp(&mut self, ciphertext: &[u8], srtcp_index: u32, ssrc: u32) -> Result<Bytes> {
        if ciphertext.len() < 8 + CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN + SRTCP_INDEX_SIZE {
            return Err(Error::SrtcpTooSmall(
                ciphertext.len(),
                8 + CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN + SRTCP_INDEX_SIZE,
            ));
        }
        let nonce = self.rtcp_initialization_vector(srtcp_index, ssrc);
        let aad = self.rtcp_additional_authenticated_data(ciphertext, srtcp_index);
        let decrypted = self.srtcp_cipher.decrypt(
            &nonce,
            Payload {
                msg: &ciphertext[8..ciphertext.len() - SRTCP_INDEX_SIZE],
                aad: &aad,
            },
        )?;

        let mut writer = BytesMut::with_capacity(8 + decrypted.len());
        writer.extend_from_slice(&ciphertext[..8]);
        writer.extend(decrypted);
        Ok(writer.freeze())
    }

    fn get_rtcp_index(&self, input: &[u8]) -> u32 {
        let pos = input.len() - SRTCP_INDEX_SIZE;
        let val = u32::from_be_bytes([input[pos], input[pos + 1], input[pos + 2], input[pos + 3]]);
        val & !((RTCP_ENCRYPTION_FLAG as u32) << 24)
    }
}
