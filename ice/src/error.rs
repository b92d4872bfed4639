use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid ICE server url scheme")]
    ErrSchemeType,
    #[error("ICE server url missing host")]
    ErrHost,
    #[error("invalid port in ICE server url")]
    ErrPort,
    #[error("candidate attribute does not match the grammar: {0}")]
    ErrCandidateParse(String),
    #[error("no selected candidate pair to send on")]
    ErrNoSelectedPair,
    #[error("agent is closed")]
    ErrClosed,
    #[error("remote credentials have not been set")]
    ErrRemoteCredentials,
    #[error("TURN allocation failed with code {0}")]
    ErrTurnAllocateFailed(u16),
    #[error("{0}")]
    Stun(#[from] stun::Error),
    #[error("io: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
