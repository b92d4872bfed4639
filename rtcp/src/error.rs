use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("packet too short to be a valid RTCP packet")]
    PacketTooShort,
    #[error("header length field does not match buffer size")]
    InvalidHeader,
    #[error("RTCP requires version 2")]
    BadVersion,
    #[error("unexpected packet type")]
    WrongType,
    #[error("SDES item text too long")]
    SdesTextTooLong,
    #[error("BYE reason too long")]
    ReasonTooLong,
    #[error("unique REMB identifier missing")]
    MissingRembIdentifier,
    #[error("REMB media SSRC must be 0")]
    RembMediaSsrcNotZero,
    #[error("REMB SSRC count does not match entries")]
    RembSsrcCountMismatch,
    #[error("FIR entries must be 8-byte aligned")]
    FirUnaligned,
    #[error("TWCC status count does not match chunks")]
    TwccStatusCountMismatch,
    #[error("TWCC delta exceeds representable range")]
    TwccDeltaOverflow,
    #[error("compound packets must start with a sender or receiver report")]
    BadFirstPacket,
    #[error("compound packets must be at least two packets long")]
    EmptyCompound,
    #[error("{0}")]
    Util(#[from] util::Error),
}
