use std::io::Error as IoError;
use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[cfg(test)]
    #[error(transparent)]
    FromHexError(#[from] hex::FromHexError),

    #[error(transparent)]
    IoError(#[from] IoError),

    #[error(transparent)]
    Protocol(#[from] crate::protocol::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed switcher response: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("switcher unavailable: {0}")]
    SourceUnavailable(String),

    #[error("parameter out of valid range")]
    ParameterOutOfRange,

    #[error("invalid length")]
    InvalidLength,

    #[error("unexpected state")]
    UnexpectedState,
}
