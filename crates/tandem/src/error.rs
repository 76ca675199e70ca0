//! Unified error type for the Tandem server.

use tandem_protocol::ProtocolError;
use tandem_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
///
/// Only startup failures escape [`TandemServer::run`](crate::TandemServer::run);
/// everything that goes wrong on one connection ends that connection's task
/// and is logged there.
#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    /// A transport-level error (bind, accept, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (decode, bad name, forbidden message type).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading from a client connection failed before a session existed.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The client did not complete the handshake in time.
    #[error("handshake timed out")]
    HandshakeTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let tandem_err: TandemError = err.into();
        assert!(matches!(tandem_err, TandemError::Transport(_)));
        assert!(tandem_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidName("name is empty");
        let tandem_err: TandemError = err.into();
        assert!(matches!(tandem_err, TandemError::Protocol(_)));
        assert!(tandem_err.to_string().contains("name is empty"));
    }
}
