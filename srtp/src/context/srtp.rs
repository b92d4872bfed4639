use bytes::Bytes;
use util::marshal::Unmarshal;

use super::Context;
use crate::error::{Error, Result};

impl Context {
    /// EncryptRtp marshals and encrypts a full RTP packet.
    pub fn encrypt_rtp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let mut buf = plaintext;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        self.encrypt_rtp_with_header(plaintext, &header)
    }

    pub fn encrypt_rtp_with_header(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
    ) -> Result<Bytes> {
        let (roc, overflow) = self
            .get_srtp_ssrc_state(header.ssrc)
            .next_rollover_count(header.sequence_number);
        if overflow {
            // 2^48 packets under one key; RFC 3711 section 9.2 requires
            // rekeying or termination
            return Err(Error::ExceededMaxPackets);
        }

        let dst = self.cipher.encrypt_rtp(plaintext, header, roc)?;

        self.get_srtp_ssrc_state(header.ssrc)
            .update_index(roc, header.sequence_number);
        Ok(dst)
    }

    /// DecryptRtp decrypts and authenticates a full SRTP packet,
    /// returning the plaintext RTP packet.
    pub fn decrypt_rtp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let mut buf = encrypted;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        self.decrypt_rtp_with_header(encrypted, &header)
    }

    pub fn decrypt_rtp_with_header(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
    ) -> Result<Bytes> {
        let (guess_roc, _) = self
            .get_srtp_ssrc_state(header.ssrc)
            .next_rollover_count(header.sequence_number);

        // the guessed ROC may be off by one around a rollover that the
        // other side has or has not taken yet; retry the neighbours on
        // auth failure
        let mut candidates = vec![guess_roc];
        candidates.push(guess_roc.wrapping_add(1));
        if guess_roc > 0 {
            candidates.push(guess_roc - 1);
        }

        let mut last_err = Error::FailedToVerifyAuthTag;
        for roc in candidates {
            let index = ((roc as u64) << 16) | header.sequence_number as u64;
            {
                let state = self.get_srtp_ssrc_state(header.ssrc);
                if !state.replay_detector.check(index) {
                    last_err = Error::SrtpSsrcDuplicated(header.ssrc, header.sequence_number);
                    continue;
                }
            }

            match self.cipher.decrypt_rtp(encrypted, header, roc) {
                Ok(dst) => {
                    let state = self.get_srtp_ssrc_state(header.ssrc);
                    state.replay_detector.accept();
                    state.update_index(roc, header.sequence_number);
                    return Ok(dst);
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}
