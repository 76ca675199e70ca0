//! In-process connections backed by unbounded channels.
//!
//! [`MemoryConnection::pair`] hands out the server side (a [`Connection`])
//! and a [`MemoryClient`] that plays the remote peer. Nothing touches the
//! network, which keeps state-machine tests fast and deterministic.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, Mutex};

use crate::{Connection, TransportError};

/// Server side of an in-memory connection.
pub struct MemoryConnection {
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: AtomicBool,
}

/// Client side of an in-memory connection.
pub struct MemoryClient {
    to_server: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_server: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryConnection {
    /// Creates a connected server/client pair.
    pub fn pair() -> (MemoryConnection, MemoryClient) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        let conn = MemoryConnection {
            inbound: Mutex::new(inbound),
            outbound,
            closed: AtomicBool::new(false),
        };
        let client = MemoryClient {
            to_server: Some(to_server),
            from_server,
        };
        (conn, client)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            ));
        }
        self.outbound.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("client dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        self.inbound.lock().await.close();
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl MemoryClient {
    /// Sends a frame to the server side.
    ///
    /// Returns `false` if the server side is gone or the client already
    /// hung up.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> bool {
        match &self.to_server {
            Some(tx) => tx.send(data.into()).is_ok(),
            None => false,
        }
    }

    /// Receives the next frame the server sent, or `None` once the server
    /// side has been dropped.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_server.recv().await
    }

    /// Returns a frame if one is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_server.try_recv().ok()
    }

    /// Simulates the client going away: the server's next `recv` after the
    /// queued frames returns `Ok(None)`.
    pub fn hang_up(&mut self) {
        self.to_server = None;
    }
}
