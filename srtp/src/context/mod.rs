#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

pub mod srtcp;
pub mod srtp;

use std::collections::HashMap;

use util::replay_detector::SlidingWindowDetector;

use crate::cipher::cipher_aead_aes_gcm::CipherAeadAesGcm;
use crate::cipher::cipher_aes_cm_hmac_sha1::CipherAesCmHmacSha1;
use crate::cipher::Cipher;
use crate::error::{Error, Result};
use crate::protection_profile::ProtectionProfile;

const MAX_ROC: u32 = u32::MAX;
const SEQ_NUM_MEDIAN: u16 = 1 << 15;
const REPLAY_WINDOW: u64 = 128;
const MAX_SRTCP_INDEX: u32 = (1 << 31) - 1;

/// Per-SSRC SRTP state: the 48-bit packet index (ROC || highest seq)
/// and the replay window over decrypted indices.
pub(crate) struct SrtpSsrcState {
    index: u64,
    rollover_has_processed: bool,
    replay_detector: SlidingWindowDetector,
}

impl Default for SrtpSsrcState {
    fn default() -> Self {
        SrtpSsrcState {
            index: 0,
            rollover_has_processed: false,
            replay_detector: SlidingWindowDetector::new(REPLAY_WINDOW),
        }
    }
}

impl SrtpSsrcState {
    /// Estimates the rollover counter for `sequence_number` from the
    /// highest index seen, within a half-window of 2^15
    /// (RFC 3550 appendix A.1, RFC 3711 section 3.3.1). Returns the
    /// guess and whether accepting it would overflow the 48-bit index.
    pub(crate) fn next_rollover_count(&self, sequence_number: u16) -> (u32, bool) {
        let local_roc = (self.index >> 16) as u32;
        let local_seq = self.index as u16;

        let mut guess_roc = local_roc;
        if self.rollover_has_processed {
            if local_seq < SEQ_NUM_MEDIAN {
                // a backward guess only makes sense once a previous
                // rollover region exists
                if sequence_number.wrapping_sub(local_seq) > SEQ_NUM_MEDIAN && local_roc > 0 {
                    guess_roc = local_roc - 1;
                }
            } else if local_seq.wrapping_sub(SEQ_NUM_MEDIAN) > sequence_number {
                guess_roc = local_roc.wrapping_add(1);
            }
        }

        let overflow = guess_roc == 0 && local_roc == MAX_ROC;
        (guess_roc, overflow)
    }

    /// Commits a verified (roc, seq) pair, keeping the highest index.
    pub(crate) fn update_index(&mut self, roc: u32, sequence_number: u16) {
        let candidate = ((roc as u64) << 16) | sequence_number as u64;
        if !self.rollover_has_processed {
            self.index = candidate;
            self.rollover_has_processed = true;
        } else if candidate > self.index {
            self.index = candidate;
        }
    }
}

/// Per-SSRC SRTCP state: the outbound 31-bit index and the inbound
/// replay window.
pub(crate) struct SrtcpSsrcState {
    next_index: u32,
    replay_detector: SlidingWindowDetector,
}

impl Default for SrtcpSsrcState {
    fn default() -> Self {
        SrtcpSsrcState {
            next_index: 0,
            replay_detector: SlidingWindowDetector::new(REPLAY_WINDOW),
        }
    }
}

/// Context represents one direction of an SRTP session. A context must
/// be used either only for protection or only for unprotection.
pub struct Context {
    pub(crate) cipher: Box<dyn Cipher + Send>,
    pub(crate) srtp_ssrc_states: HashMap<u32, SrtpSsrcState>,
    pub(crate) srtcp_ssrc_states: HashMap<u32, SrtcpSsrcState>,
}

impl Context {
    pub fn new(master_key: &[u8], master_salt: &[u8], profile: ProtectionProfile) -> Result<Context> {
        if master_key.len() != profile.key_len() {
            return Err(Error::SrtpMasterKeyLength(
                profile.key_len(),
                master_key.len(),
            ));
        }
        if master_salt.len() != profile.salt_len() {
            return Err(Error::SrtpSaltLength(profile.salt_len(), master_salt.len()));
        }

        let cipher: Box<dyn Cipher + Send> = match profile {
            ProtectionProfile::AeadAes128Gcm | ProtectionProfile::AeadAes256Gcm => {
                Box::new(CipherAeadAesGcm::new(profile, master_key, master_salt)?)
            }
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::Aes128CmHmacSha1_32 => {
                Box::new(CipherAesCmHmacSha1::new(profile, master_key, master_salt)?)
            }
        };

        Ok(Context {
            cipher,
            srtp_ssrc_states: HashMap::new(),
            srtcp_ssrc_states: HashMap::new(),
        })
    }

    pub(crate) fn get_srtp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtpSsrcState {
        self.srtp_ssrc_states.entry(ssrc).or_default()
    }

    pub(crate) fn get_srtcp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtcpSsrcState {
        self.srtcp_ssrc_states.entry(ssrc).or_default()
    }

    /// Current rollover counter for an SSRC, mainly for inspection.
    pub fn roc(&self, ssrc: u32) -> Option<u32> {
        self.srtp_ssrc_states.get(&ssrc).map(|s| (s.index >> 16) as u32)
    }
}
