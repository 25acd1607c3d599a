use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] arena_shared::Error),

    #[error("outbound queue is full")]
    Backpressure,

    #[error("connection is closed")]
    Closed,

    #[error("hub is no longer running")]
    HubClosed,
}

pub type ServerResult<T> = Result<T, ServerError>;
