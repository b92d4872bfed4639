#[cfg(test)]
#[path = "prf_test.rs"]
mod prf_test;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub(crate) const PRF_MASTER_SECRET_LABEL: &[u8] = b"master secret";
pub(crate) const PRF_EXTENDED_MASTER_SECRET_LABEL: &[u8] = b"extended master secret";
pub(crate) const PRF_KEY_EXPANSION_LABEL: &[u8] = b"key expansion";
pub(crate) const PRF_VERIFY_DATA_CLIENT_LABEL: &[u8] = b"client finished";
pub(crate) const PRF_VERIFY_DATA_SERVER_LABEL: &[u8] = b"server finished";
pub(crate) const PRF_EXTRACTOR_DTLS_SRTP_LABEL: &[u8] = b"EXTRACTOR-dtls_srtp";

pub(crate) const MASTER_SECRET_LENGTH: usize = 48;
pub(crate) const VERIFY_DATA_LENGTH: usize = 12;

/// P_SHA256 (RFC 5246 section 5):
///
///   P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) +
///                          HMAC_hash(secret, A(2) + seed) + ...
///   A(0) = seed, A(i) = HMAC_hash(secret, A(i-1))
pub fn prf_p_hash(secret: &[u8], seed: &[u8], requested_length: usize) -> Result<Vec<u8>> {
    let hmac = |key: &[u8], data: &[u8]| -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    };

    let mut out = Vec::with_capacity(requested_length);
    let mut a = seed.to_vec();
    while out.len() < requested_length {
        a = hmac(secret, &a)?;
        let mut input = a.clone();
        input.extend_from_slice(seed);
        out.extend_from_slice(&hmac(secret, &input)?);
    }
    out.truncate(requested_length);
    Ok(out)
}

fn prf_with_label(secret: &[u8], label: &[u8], seed: &[u8], length: usize) -> Result<Vec<u8>> {
    let mut labeled = label.to_vec();
    labeled.extend_from_slice(seed);
    prf_p_hash(secret, &labeled, length)
}

pub fn prf_master_secret(
    pre_master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
) -> Result<Vec<u8>> {
    let mut seed = client_random.to_vec();
    seed.extend_from_slice(server_random);
    prf_with_label(
        pre_master_secret,
        PRF_MASTER_SECRET_LABEL,
        &seed,
        MASTER_SECRET_LENGTH,
    )
}

/// Extended master secret (RFC 7627): the seed is the SHA-256 session
/// hash of the handshake transcript through ClientKeyExchange.
pub fn prf_extended_master_secret(
    pre_master_secret: &[u8],
    session_hash: &[u8],
) -> Result<Vec<u8>> {
    prf_with_label(
        pre_master_secret,
        PRF_EXTENDED_MASTER_SECRET_LABEL,
        session_hash,
        MASTER_SECRET_LENGTH,
    )
}

/// The encryption keys for AES-128-GCM: no MAC keys, 16-byte write keys,
/// 4-byte implicit IVs (RFC 5288).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKeys {
    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
    pub client_write_iv: Vec<u8>,
    pub server_write_iv: Vec<u8>,
}

pub fn prf_encryption_keys(
    master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    key_len: usize,
    iv_len: usize,
) -> Result<EncryptionKeys> {
    let mut seed = server_random.to_vec();
    seed.extend_from_slice(client_random);
    let key_block = prf_with_label(
        master_secret,
        PRF_KEY_EXPANSION_LABEL,
        &seed,
        2 * key_len + 2 * iv_len,
    )?;

    let mut off = 0;
    let mut take = |n: usize| {
        let slice = key_block[off..off + n].to_vec();
        off += n;
        slice
    };
    Ok(EncryptionKeys {
        client_write_key: take(key_len),
        server_write_key: take(key_len),
        client_write_iv: take(iv_len),
        server_write_iv: take(iv_len),
    })
}

pub fn prf_verify_data(
    master_secret: &[u8],
    handshake_transcript: &[u8],
    label: &[u8],
) -> Result<Vec<u8>> {
    let hash = Sha256::digest(handshake_transcript);
    prf_with_label(master_secret, label, &hash, VERIFY_DATA_LENGTH)
}

pub fn prf_verify_data_client(master_secret: &[u8], transcript: &[u8]) -> Result<Vec<u8>> {
    prf_verify_data(master_secret, transcript, PRF_VERIFY_DATA_CLIENT_LABEL)
}

pub fn prf_verify_data_server(master_secret: &[u8], transcript: &[u8]) -> Result<Vec<u8>> {
    prf_verify_data(master_secret, transcript, PRF_VERIFY_DATA_SERVER_LABEL)
}

/// DTLS-SRTP keying material exporter (RFC 5764 section 4.2).
pub fn prf_export_keying_material(
    master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    length: usize,
) -> Result<Vec<u8>> {
    let mut seed = client_random.to_vec();
    seed.extend_from_slice(server_random);
    prf_with_label(master_secret, PRF_EXTRACTOR_DTLS_SRTP_LABEL, &seed, length)
}

/// SHA-256 over the raw transcript bytes; the RFC 7627 session hash.
pub fn session_hash(transcript: &[u8]) -> Vec<u8> {
    Sha256::digest(transcript).to_vec()
}
