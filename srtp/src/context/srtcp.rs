use bytes::Bytes;

use super::{Context, MAX_SRTCP_INDEX};
use crate::error::{Error, Result};

impl Context {
    /// EncryptRtcp protects a full compound RTCP packet. The SRTCP index
    /// starts at zero and increments once per protected packet.
    pub fn encrypt_rtcp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        if plaintext.len() < 8 {
            return Err(Error::SrtcpTooSmall(plaintext.len(), 8));
        }
        let ssrc = u32::from_be_bytes([plaintext[4], plaintext[5], plaintext[6], plaintext[7]]);

        let index = {
            let state = self.get_srtcp_ssrc_state(ssrc);
            if state.next_index > MAX_SRTCP_INDEX {
                return Err(Error::ExceededMaxPackets);
            }
            let index = state.next_index;
            state.next_index += 1;
            index
        };

        self.cipher.encrypt_rtcp(plaintext, index, ssrc)
    }

    /// DecryptRtcp authenticates and decrypts a full SRTCP packet.
    pub fn decrypt_rtcp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let min = 8 + 4 + self.cipher.rtcp_auth_tag_len();
        if encrypted.len() < min {
            return Err(Error::SrtcpTooSmall(encrypted.len(), min));
        }
        let ssrc = u32::from_be_bytes([encrypted[4], encrypted[5], encrypted[6], encrypted[7]]);
        let index = self.cipher.get_rtcp_index(encrypted);

        {
            let state = self.get_srtcp_ssrc_state(ssrc);
            if !state.replay_detector.check(index as u64) {
                return Err(Error::SrtcpSsrcDuplicated(ssrc, index));
            }
        }

        let dst = self.cipher.decrypt_rtcp(encrypted, index, ssrc)?;

        self.get_srtcp_ssrc_state(ssrc).replay_detector.accept();
        Ok(dst)
    }
}
