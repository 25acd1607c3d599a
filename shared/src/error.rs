use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] bincode::Error),

    #[error("invalid direction component {0}, expected -1, 0 or 1")]
    InvalidDirection(i32),
}

pub type Result<T> = std::result::Result<T, Error>;
