use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabError {
    /// The channel could not be opened or a frame could not be sent.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("could not encode message: {0}")]
    Encode(#[source] serde_json::Error),
}
