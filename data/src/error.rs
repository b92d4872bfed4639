use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("DCEP message too short")]
    ErrMessageTooShort,
    #[error("unknown DCEP message type {0}")]
    ErrUnknownMessageType(u8),
    #[error("unknown data channel type {0:#04x}")]
    ErrUnknownChannelType(u8),
    #[error("DCEP label or protocol length exceeds the message")]
    ErrLengthMismatch,
}
