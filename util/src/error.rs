use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer too short")]
    ErrBufferTooShort,
    #[error("marshal produced {0} bytes, expected {1}")]
    ErrMarshalSizeMismatch(usize, usize),
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn new(msg: String) -> Self {
        Error::Other(msg)
    }
}
