use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("attribute not found")]
    ErrAttributeNotFound,
    #[error("buffer too small to be a STUN message")]
    ErrUnexpectedEof,
    #[error("attribute size is invalid")]
    ErrAttributeSizeInvalid,
    #[error("{0} is not a valid STUN magic cookie")]
    ErrInvalidMagicCookie(u32),
    #[error("unsupported address family {0}")]
    ErrUnsupportedFamily(u8),
    #[error("message integrity mismatch")]
    ErrIntegrityMismatch,
    #[error("fingerprint mismatch")]
    ErrFingerprintMismatch,
    #[error("fingerprint attribute is not the last attribute")]
    ErrFingerprintBeforeIntegrity,
    #[error("error code value is too short")]
    ErrErrorCodeTooShort,
    #[error("{0}")]
    Other(String),
}
