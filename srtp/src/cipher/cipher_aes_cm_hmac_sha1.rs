use aes::Aes128;
use bytes::{Bytes, BytesMut};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use util::marshal::MarshalSize;

use super::{Cipher, RTCP_ENCRYPTION_FLAG, SRTCP_INDEX_SIZE};
use crate::error::{Error, Result};
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha1 = Hmac<Sha1>;

/// Classic SRTP transform: AES-128 counter mode encryption with a
/// truncated HMAC-SHA1 authentication tag (RFC 3711 section 4).
pub(crate) struct CipherAesCmHmacSha1 {
    profile: ProtectionProfile,
    srtp_session_key: Vec<u8>,
    srtcp_session_key: Vec<u8>,
    srtp_session_salt: Vec<u8>,
    srtcp_session_salt: Vec<u8>,
    srtp_session_auth: HmacSha1,
    srtcp_session_auth: HmacSha1,
}

impl CipherAesCmHmacSha1 {
    pub(crate) fn new(
        profile: ProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<CipherAesCmHmacSha1> {
        let auth_key_len = profile.auth_key_len();

        let srtp_session_key = aes_cm_key_derivation(
            LABEL_SRTP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            master_key.len(),
        )?;
        let srtcp_session_key = aes_cm_key_derivation(
            LABEL_SRTCP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            master_key.len(),
        )?;
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
        let srtp_auth_key = aes_cm_key_derivation(
            LABEL_SRTP_AUTHENTICATION_TAG,
            master_key,
            master_salt,
            0,
            auth_key_len,
        )?;
        let srtcp_auth_key = aes_cm_key_derivation(
            LABEL_SRTCP_AUTHENTICATION_TAG,
            master_key,
            master_salt,
            0,
            auth_key_len,
        )?;

        Ok(CipherAesCmHmacSha1 {
            profile,
            srtp_session_key,
            srtcp_session_key,
            srtp_session_salt,
            srtcp_session_salt,
            srtp_session_auth: HmacSha1::new_from_slice(&srtp_auth_key)
                .expect("hmac accepts any key length"),
            srtcp_session_auth: HmacSha1::new_from_slice(&srtcp_auth_key)
                .expect("hmac accepts any key length"),
        })
    }

    /// IV = (salt * 2^16) XOR (SSRC * 2^64) XOR (index * 2^16)
    /// (RFC 3711 section 4.1.1).
    fn counter_iv(salt: &[u8], ssrc: u32, index: u64) -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv[..14].copy_from_slice(&salt[..14]);
        for (i, b) in ssrc.to_be_bytes().iter().enumerate() {
            iv[4 + i] ^= b;
        }
        for (i, b) in index.to_be_bytes()[2..].iter().enumerate() {
            iv[8 + i] ^= b;
        }
        iv
    }

    fn rtp_auth_tag(&self, packet: &[u8], roc: u32) -> Vec<u8> {
        let mut mac = self.srtp_session_auth.clone();
        mac.update(packet);
        mac.update(&roc.to_be_bytes());
        let mut tag = mac.finalize().into_bytes().to_vec();
        tag.truncate(self.rtp_auth_tag_len());
        tag
    }

    fn rtcp_auth_tag(&self, packet: &[u8]) -> Vec<u8> {
        let mut mac = self.srtcp_session_auth.clone();
        mac.update(packet);
        let mut tag = mac.finalize().into_bytes().to_vec();
        tag.truncate(self.rtcp_auth_tag_len());
        tag
    }
}

impl Cipher for CipherAesCmHmacSha1 {
    fn rtp_auth_tag_len(&self) -> usize {
        self.profile.rtp_auth_tag_len()
    }

    fn rtcp_auth_tag_len(&self) -> usize {
        self.profile.rtcp_auth_tag_len()
    }

    fn encrypt_rtp(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        let header_len = header.marshal_size();
        let mut writer = BytesMut::with_capacity(plaintext.len() + self.rtp_auth_tag_len());
        writer.extend_from_slice(plaintext);

        let index = ((roc as u64) << 16) | header.sequence_number as u64;
        let iv = Self::counter_iv(&self.srtp_session_salt, header.ssrc, index);
        let mut stream = Aes128Ctr::new_from_slices(&self.srtp_session_key, &iv)
            .map_err(|_| Error::FailedToVerifyAuthTag)?;
        stream.apply_keystream(&mut writer[header_len..]);

        let tag = self.rtp_auth_tag(&writer, roc);
        writer.extend_from_slice(&tag);
        Ok(writer.freeze())
    }

    fn decrypt_rtp(
        &mut self,
        ciphertext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes> {
        let tag_len = self.rtp_auth_tag_len();
        let header_len = header.marshal_size();
        if ciphertext.len() < header_len + tag_len {
            return Err(Error::SrtpTooSmall(ciphertext.len(), header_len + tag_len));
        }

        let (body, tag) = ciphertext.split_at(ciphertext.len() - tag_len);
        let expected = self.rtp_auth_tag(body, roc);
        if !bool::from(expected.ct_eq(tag)) {
            return Err(Error::FailedToVerifyAuthTag);
        }

        let mut writer = BytesMut::with_capacity(body.len());
        writer.extend_from_slice(body);
        let index = ((roc as u64) << 16) | header.sequence_number as u64;
        let iv = Self::counter_iv(&self.srtp_session_salt, header.ssrc, index);
        let mut stream = Aes128Ctr::new_from_slices(&self.srtp_session_key, &iv)
            .map_err(|_| Error::FailedToVerifyAuthTag)?;
        stream.apply_keystream(&mut writer[header_len..]);
        Ok(writer.freeze())
    }

    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: u32, ssrc: u32) -> Result<Bytes> {
        let mut writer =
            BytesMut::with_capacity(plaintext.len() + SRTCP_INDEX_SIZE + self.rtcp_auth_tag_len());
        writer.extend_from_slice(plaintext);

        let iv = Self::counter_iv(&self.srtcp_session_salt, ssrc, srtcp_index as u64);
        let mut stream = Aes128Ctr::new_from_slices(&self.srtcp_session_key, &iv)
            .map_err(|_| Error::FailedToVerifyAuthTag)?;
        stream.apply_keystream(&mut writer[8..]);

        let trailer = srtcp_index | (RTCP_ENCRYPTION_FLAG as u32) << 24;
        writer.extend_from_slice(&trailer.to_be_bytes());

        let tag = self.rtcp_auth_tag(&writer);
        writer.extend_from_slice(&tag);
        Ok(writer.freeze())
    }

    fn decrypt_rtcp(&mut self, ciphertext: &[u8], srtcp_index: u32, ssrc: u32) -> Result<Bytes> {
        let tag_len = self.rtcp_auth_tag_len();
        let min = 8 + SRTCP_INDEX_SIZE + tag_len;
        if ciphertext.len() < min {
            return Err(Error::SrtcpTooSmall(ciphertext.len(), min));
        }

        let (body, tag) = ciphertext.split_at(ciphertext.len() - tag_len);
        let expected = self.rtcp_auth_tag(body);
        if !bool::from(expected.ct_eq(tag)) {
            return Err(Error::FailedToVerifyAuthTag);
        }

        let mut writer = BytesMut::with_capacity(body.len() - SRTCP_INDEX_SIZE);
        writer.extend_from_slice(&body[..body.len() - SRTCP_INDEX_SIZE]);
        let iv = Self::counter_iv(&self.srtcp_session_salt, ssrc, srtcp_index as u64);
        let mut stream = Aes128Ctr::new_from_slices(&self.srtcp_session_key, &iv)
            .map_err(|_| Error::FailedToVerifyAuthTag)?;
        stream.apply_keystream(&mut writer[8..]);
        Ok(writer.freeze())
    }

    fn get_rtcp_index(&self, input: &[u8]) -> u32 {
        let tag_len = self.rtcp_auth_tag_len();
        let pos = input.len() - tag_len - SRTCP_INDEX_SIZE;
        let val = u32::from_be_bytes([input[pos], input[pos + 1], input[pos + 2], input[pos + 3]]);
        val & !((RTCP_ENCRYPTION_FLAG as u32) << 24)
    }
}
