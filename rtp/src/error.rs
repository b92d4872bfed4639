use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("RTP header size insufficient")]
    ErrHeaderSizeInsufficient,
    #[error("RTP header size insufficient for extension")]
    ErrHeaderSizeInsufficientForExtension,
    #[error("RFC 3550 requires version 2")]
    ErrBadVersion,
    #[error("extension payload must be a multiple of 4 bytes")]
    ErrExtensionPayloadNotAligned,
    #[error("buffer too small")]
    ErrShortBuffer,
    #[error("{0}")]
    Util(#[from] util::Error),
}
