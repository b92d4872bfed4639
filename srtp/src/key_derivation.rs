#[cfg(test)]
#[path = "key_derivation_test.rs"]
mod key_derivation_test;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::{Error, Result};

pub const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub const LABEL_SRTP_AUTHENTICATION_TAG: u8 = 0x01;
pub const LABEL_SRTP_SALT: u8 = 0x02;
pub const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub const LABEL_SRTCP_AUTHENTICATION_TAG: u8 = 0x04;
pub const LABEL_SRTCP_SALT: u8 = 0x05;

/// AES-CM key derivation (RFC 3711 section 4.3.1, RFC 7714 section 13.1).
///
/// The master salt is placed in the high bytes of a 16-byte block, the
/// label is folded in at byte 7 and the block is run through AES in
/// counter mode to produce `out_len` bytes of session keying material.
pub fn aes_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    index_over_kdr: u64,
    out_len: usize,
) -> Result<Vec<u8>> {
    if index_over_kdr != 0 {
        return Err(Error::NonZeroKdrNotSupported);
    }

    let n_salt = master_salt.len();
    let mut prf_in = [0u8; 16];
    prf_in[..n_salt].copy_from_slice(master_salt);
    prf_in[7] ^= label;

    let key = match master_key.len() {
        16 => Aes128::new_from_slice(master_key)
            .map_err(|_| Error::SrtpMasterKeyLength(16, master_key.len()))?,
        _ => {
            // AES-256 master keys use the same construction with Aes256
            return aes256_cm_key_derivation(label, master_key, master_salt, out_len);
        }
    };

    let mut out = vec![0u8; (out_len + 15) & !15];
    for (i, chunk) in out.chunks_exact_mut(16).enumerate() {
        let mut block = prf_in;
        block[14..16].copy_from_slice(&(i as u16).to_be_bytes());
        let mut ga = aes::cipher::generic_array::GenericArray::clone_from_slice(&block);
        key.encrypt_block(&mut ga);
        chunk.copy_from_slice(&ga);
    }
    out.truncate(out_len);
    Ok(out)
}

fn aes256_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    out_len: usize,
) -> Result<Vec<u8>> {
    use aes::Aes256;

    let n_salt = master_salt.len();
    let mut prf_in = [0u8; 16];
    prf_in[..n_salt].copy_from_slice(master_salt);
    prf_in[7] ^= label;

    let key = Aes256::new_from_slice(master_key)
        .map_err(|_| Error::SrtpMasterKeyLength(32, master_key.len()))?;

    let mut out = vec![0u8; (out_len + 15) & !15];
    for (i, chunk) in out.chunks_exact_mut(16).enumerate() {
        let mut block = prf_in;
        block[14..16].copy_from_slice(&(i as u16).to_be_bytes());
        let mut ga = aes::cipher::generic_array::GenericArray::clone_from_slice(&block);
        key.encrypt_block(&mut ga);
        chunk.copy_from_slice(&ga);
    }
    out.truncate(out_len);
    Ok(out)
}
