use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the reader, the writer and the block pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("duplicate property id {0:?}")]
    DuplicateProperty(String),

    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("codec failure: {0}")]
    CodecFailure(String),
}
