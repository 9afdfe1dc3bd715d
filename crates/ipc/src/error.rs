//! Error types for the avatar/UI protocol.

/// Errors raised while encoding, decoding or validating protocol values.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Failed to (de)serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid color {0:?}, expected #rgb or #rrggbb")]
    InvalidColor(String),
}
