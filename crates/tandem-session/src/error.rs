//! Error types for the session layer.

use tandem_protocol::SessionId;

/// Errors that can occur while talking to a session's client.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Writing a frame to the client failed. The client's own read loop
    /// notices the broken connection and cleans up; callers that push
    /// notifications on someone else's behalf just log this.
    #[error("send to {session} failed: {source}")]
    Send {
        session: SessionId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
