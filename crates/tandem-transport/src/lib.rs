//! Transport abstraction layer for Tandem.
//!
//! Provides the [`Transport`], [`Incoming`] and [`Connection`] traits that
//! the rest of the server is written against. Accepting a connection is
//! split in two steps so the accept loop never waits on a client's upgrade
//! handshake:
//!
//! ```text
//! Transport::accept() → Incoming (raw socket) → Incoming::upgrade() → Connection
//! ```
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//! - `memory`: channel-backed connections for tests

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryClient, MemoryConnection};
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketIncoming, WebSocketTransport,
    DEFAULT_UPGRADE_PATH,
};

use std::net::SocketAddr;

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The not-yet-upgraded connection produced by [`accept`](Self::accept).
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced once an incoming socket is upgraded.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming socket.
    ///
    /// This only covers the socket-level accept; protocol negotiation is
    /// deferred to [`Incoming::upgrade`] so it can run on its own task.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// An accepted socket that still has to complete its upgrade handshake.
pub trait Incoming: Send + 'static {
    /// The connection type produced by a successful upgrade.
    type Connection: Connection;
    /// The error type for the upgrade.
    type Error: std::error::Error + Send + Sync;

    /// The remote address of the socket.
    fn peer_addr(&self) -> SocketAddr;

    /// Performs the upgrade handshake.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single message-framed connection.
///
/// Implementations must allow one reader and any number of concurrent
/// writers: writes are serialised internally so two tasks can never
/// interleave frames on the wire, and a pending [`recv`](Self::recv) never
/// blocks a [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, Self::Error>>
           + Send;

    /// Closes the connection.
    fn close(
        &self,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// The remote address, when the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr>;
}
