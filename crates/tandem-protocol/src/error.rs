//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a field of the wrong type,
    /// or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. a client sending
    /// a server-only message type.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The display name sent in the handshake was rejected.
    #[error("invalid display name: {0}")]
    InvalidName(&'static str),
}
