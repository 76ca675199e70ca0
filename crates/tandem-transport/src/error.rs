/// Errors raised while accepting, upgrading or using a client connection.
///
/// Every variant is scoped to a single connection except `AcceptFailed`,
/// which comes from the listening socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote side is gone; nothing more can be written.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed (reset, protocol error, bad framing).
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The HTTP upgrade handshake was refused or broke off.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(#[source] std::io::Error),
}
