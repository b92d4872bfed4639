use thiserror::Error;

use crate::alert::AlertDescription;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer too small")]
    ErrBufferTooSmall,
    #[error("DTLS record exceeds its declared length")]
    ErrInvalidPacketLength,
    #[error("unhandled content type {0}")]
    ErrInvalidContentType(u8),
    #[error("unsupported protocol version")]
    ErrUnsupportedProtocolVersion,
    #[error("handshake message unexpected in current state")]
    ErrUnexpectedHandshakeMessage,
    #[error("ClientHello cookie mismatch")]
    ErrCookieMismatch,
    #[error("no shared cipher suite")]
    ErrCipherSuiteNoIntersection,
    #[error("no shared SRTP protection profile")]
    ErrNoSrtpProtectionProfile,
    #[error("no shared elliptic curve")]
    ErrNoSupportedEllipticCurves,
    #[error("invalid named curve")]
    ErrInvalidNamedCurve,
    #[error("peer key exchange public key is malformed")]
    ErrInvalidPeerPublicKey,
    #[error("server key exchange signature is invalid")]
    ErrKeySignatureMismatch,
    #[error("peer certificate is missing or malformed")]
    ErrInvalidCertificate,
    #[error("verify data does not match the handshake transcript")]
    ErrVerifyDataMismatch,
    #[error("cipher suite has not been initialized")]
    ErrCipherSuiteUnset,
    #[error("record authentication failed")]
    ErrFailedToVerifyRecord,
    #[error("handshake is not complete")]
    ErrHandshakeInProgress,
    #[error("connection is closed")]
    ErrConnClosed,
    #[error("handshake timed out after {0} transmits of the current flight")]
    ErrHandshakeTimeout(u8),
    #[error("fatal alert from peer: {0:?}")]
    ErrAlertFatal(AlertDescription),
    #[error("keying material exporter requires a completed handshake")]
    ErrExporterBeforeFinished,
    #[error("{0}")]
    Crypto(String),
    #[error("{0}")]
    Other(String),
}
