use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-level error taxonomy. Single-packet failures on the RX
/// path are logged and dropped; only handshake and association
/// failures surface here.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("transport io: {0}")]
    TransportIo(String),
    #[error("stun: {0}")]
    StunProtocol(#[from] stun::Error),
    #[error("ICE failed or timed out")]
    IceTimeout,
    #[error("malformed DTLS record")]
    DtlsBadRecord,
    #[error("DTLS handshake failure: {0}")]
    DtlsHandshakeFailure(dtls::Error),
    #[error("remote certificate does not match the signaled fingerprint")]
    DtlsFingerprintMismatch,
    #[error("SCTP checksum mismatch")]
    SctpChecksum,
    #[error("SCTP association aborted (cause {0})")]
    SctpAbort(u16),
    #[error("SCTP retransmission limit reached")]
    SctpCongestionTimeout,
    #[error("SRTP authentication failed")]
    SrtpAuth,
    #[error("SRTP replay rejected")]
    SrtpReplay,
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("transport is closed")]
    Closed,
    #[error("ice: {0}")]
    Ice(#[from] ice::Error),
    #[error("sctp: {0}")]
    Sctp(#[from] sctp::Error),
    #[error("srtp: {0}")]
    Srtp(#[from] srtp::Error),
    #[error("dcep: {0}")]
    Dcep(#[from] data::Error),
}

impl From<dtls::Error> for Error {
    fn from(e: dtls::Error) -> Self {
        Error::DtlsHandshakeFailure(e)
    }
}
