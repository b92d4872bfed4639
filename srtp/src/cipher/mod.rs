pub mod cipher_aead_aes_gcm;
pub mod cipher_aes_cm_hmac_sha1;

use bytes::Bytes;

use crate::error::Result;

/// One-way packet transform selected by the protection profile.
pub(crate) trait Cipher {
    fn rtp_auth_tag_len(&self) -> usize;
    fn rtcp_auth_tag_len(&self) -> usize;

    /// `plaintext` is the full RTP packet (header included); the result
    /// is the full SRTP packet.
    fn encrypt_rtp(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes>;

    fn decrypt_rtp(
        &mut self,
        ciphertext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes>;

    /// `plaintext` is the full compound RTCP packet; the result carries
    /// the E-flag and SRTCP index trailer.
    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: u32, ssrc: u32) -> Result<Bytes>;

    fn decrypt_rtcp(&mut self, ciphertext: &[u8], srtcp_index: u32, ssrc: u32) -> Result<Bytes>;

    /// Reads the SRTCP index trailer of a protected packet.
    fn get_rtcp_index(&self, input: &[u8]) -> u32;
}

pub(crate) const SRTCP_INDEX_SIZE: usize = 4;
pub(crate) const RTCP_ENCRYPTION_FLAG: u8 = 0x80;
