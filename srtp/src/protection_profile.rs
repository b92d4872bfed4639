/// ProtectionProfile specifies the cipher and auth tag details, similar
/// to a TLS cipher suite. The values are the DTLS-SRTP protection
/// profile identifiers (RFC 5764 section 4.1.2, RFC 7714 section 14.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum ProtectionProfile {
    Aes128CmHmacSha1_80 = 0x0001,
    Aes128CmHmacSha1_32 = 0x0002,
    #[default]
    AeadAes128Gcm = 0x0007,
    AeadAes256Gcm = 0x0008,
}

impl ProtectionProfile {
    pub fn from_id(id: u16) -> Option<ProtectionProfile> {
        Some(match id {
            0x0001 => ProtectionProfile::Aes128CmHmacSha1_80,
            0x0002 => ProtectionProfile::Aes128CmHmacSha1_32,
            0x0007 => ProtectionProfile::AeadAes128Gcm,
            0x0008 => ProtectionProfile::AeadAes256Gcm,
            _ => return None,
        })
    }

    pub fn id(&self) -> u16 {
        *self as u16
    }

    pub fn key_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80
            | ProtectionProfile::Aes128CmHmacSha1_32
            | ProtectionProfile::AeadAes128Gcm => 16,
            ProtectionProfile::AeadAes256Gcm => 32,
        }
    }

    pub fn salt_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::Aes128CmHmacSha1_32 => 14,
            ProtectionProfile::AeadAes128Gcm | ProtectionProfile::AeadAes256Gcm => 12,
        }
    }

    pub fn rtp_auth_tag_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 10,
            ProtectionProfile::Aes128CmHmacSha1_32 => 4,
            // AEAD carries its tag inside the ciphertext
            ProtectionProfile::AeadAes128Gcm | ProtectionProfile::AeadAes256Gcm => 16,
        }
    }

    pub fn rtcp_auth_tag_len(&self) -> usize {
        match self {
            // SRTCP always authenticates with the 80-bit tag
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::Aes128CmHmacSha1_32 => 10,
            ProtectionProfile::AeadAes128Gcm | ProtectionProfile::AeadAes256Gcm => 16,
        }
    }

    pub fn auth_key_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::Aes128CmHmacSha1_32 => 20,
            ProtectionProfile::AeadAes128Gcm | ProtectionProfile::AeadAes256Gcm => 0,
        }
    }

    /// Keying material needed per direction for this profile.
    pub fn keying_material_len(&self) -> usize {
        self.key_len() + self.salt_len()
    }
}
