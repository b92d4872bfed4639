use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("SRTP master key must be {0} bytes, got {1}")]
    SrtpMasterKeyLength(usize, usize),
    #[error("SRTP master salt must be {0} bytes, got {1}")]
    SrtpSaltLength(usize, usize),
    #[error("no such SRTP protection profile {0:#06x}")]
    NoSuchProfile(u16),
    #[error("non-zero key derivation rate is not supported")]
    NonZeroKdrNotSupported,
    #[error("too short SRTP packet: only {0} bytes, expected > {1} bytes")]
    SrtpTooSmall(usize, usize),
    #[error("too short SRTCP packet: only {0} bytes, expected > {1} bytes")]
    SrtcpTooSmall(usize, usize),
    #[error("srtp ssrc={0} seq={1}: duplicated")]
    SrtpSsrcDuplicated(u32, u16),
    #[error("srtcp ssrc={0} index={1}: duplicated")]
    SrtcpSsrcDuplicated(u32, u32),
    #[error("failed to verify auth tag")]
    FailedToVerifyAuthTag,
    #[error("exceeded the maximum number of packets under one key")]
    ExceededMaxPackets,
    #[error("{0}")]
    Rtp(#[from] rtp::Error),
    #[error("{0}")]
    Util(#[from] util::Error),
    #[error("aes gcm: {0}")]
    AesGcm(#[from] aes_gcm::Error),
}
