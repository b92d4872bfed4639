use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("raw is too small for an SCTP packet")]
    ErrPacketHeaderTooSmall,
    #[error("SCTP checksum mismatch")]
    ErrChecksumMismatch,
    #[error("raw is too small for an SCTP chunk")]
    ErrChunkHeaderTooSmall,
    #[error("chunk length field is invalid")]
    ErrChunkHeaderInvalidLength,
    #[error("chunk is not of the expected type")]
    ErrChunkTypeUnexpected,
    #[error("DATA chunk payload is too small")]
    ErrChunkPayloadSmall,
    #[error("INIT chunk must not bundle with any other chunk")]
    ErrInitChunkBundled,
    #[error("INIT chunk requires a zero verification tag")]
    ErrInitChunkVerifyTagNotZero,
    #[error("packet verification tag mismatch")]
    ErrVerificationTagMismatch,
    #[error("param header too short")]
    ErrParamHeaderTooShort,
    #[error("param length field is invalid")]
    ErrParamLengthInvalid,
    #[error("state cookie authentication failed")]
    ErrCookieAuthFailed,
    #[error("state cookie has expired")]
    ErrCookieExpired,
    #[error("association is not established")]
    ErrAssociationNotEstablished,
    #[error("association closed")]
    ErrAssociationClosed,
    #[error("peer aborted the association (cause {0})")]
    ErrPeerAbort(u16),
    #[error("INIT retransmission limit reached")]
    ErrInitTimeout,
    #[error("too many T3-rtx expirations, association unreachable")]
    ErrRetransmitTimeout,
    #[error("outbound message exceeds the maximum message size")]
    ErrOutboundPacketTooLarge,
    #[error("stream {0} does not exist")]
    ErrStreamMissing(u16),
    #[error("unexpected chunk in current state")]
    ErrUnexpectedChunk,
    #[error("{0}")]
    Other(String),
}
