//! `TandemServer` builder and accept loop.
//!
//! This is the entry point for running a Tandem server. It ties together
//! all the layers: transport → protocol → session → matcher.

use std::sync::Arc;
use std::time::Duration;

use tandem_matcher::{Matcher, MatcherConfig};
use tandem_transport::{
    Connection, Incoming, Transport, WebSocketConnection, WebSocketTransport,
    DEFAULT_UPGRADE_PATH,
};
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;

use crate::handler::handle_connection;
use crate::TandemError;

/// How long a client has, from TCP accept, to finish the WebSocket upgrade
/// and send its name.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The matcher
/// carries its own locks; nothing here needs an outer one.
pub(crate) struct ServerState<C: Connection> {
    pub(crate) matcher: Matcher<C>,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a Tandem server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), tandem::TandemError> {
/// use tandem::TandemServer;
///
/// let server = TandemServer::builder()
///     .bind("0.0.0.0:2001")
///     .relay_secret("shared-with-coturn")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TandemServerBuilder {
    bind_addr: String,
    path: String,
    matcher_config: MatcherConfig,
    handshake_timeout: Duration,
}

impl TandemServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:2001".to_string(),
            path: DEFAULT_UPGRADE_PATH.to_string(),
            matcher_config: MatcherConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the request path clients upgrade on (default `/match`).
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the secret shared with the relay server. Empty disables
    /// credential issuance.
    pub fn relay_secret(mut self, secret: impl Into<String>) -> Self {
        self.matcher_config.relay_secret = secret.into();
        self
    }

    /// Sets how long issued relay credentials stay valid.
    pub fn credential_ttl(mut self, ttl: Duration) -> Self {
        self.matcher_config.credential_ttl = ttl;
        self
    }

    /// Sets how long a client may take, from connecting, to upgrade and
    /// send its name.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// # Errors
    /// [`TandemError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<TandemServer, TandemError> {
        let transport =
            WebSocketTransport::bind(&self.bind_addr, &self.path).await?;

        let state = Arc::new(ServerState {
            matcher: Matcher::new(self.matcher_config),
            handshake_timeout: self.handshake_timeout,
        });

        Ok(TandemServer { transport, state })
    }
}

impl Default for TandemServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tandem server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TandemServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<WebSocketConnection>>,
}

impl TandemServer {
    /// Creates a new builder.
    pub fn builder() -> TandemServerBuilder {
        TandemServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Each accepted socket gets a session id and its own task, which
    /// performs the WebSocket upgrade and then runs the connection handler.
    /// A socket that has not finished both the upgrade and the name
    /// handshake within the handshake timeout is dropped.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TandemError> {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(%addr, "Tandem server running");
        }

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    let session_id = state.matcher.next_session_id();
                    let span = tracing::info_span!(
                        "session",
                        id = %session_id,
                        addr = %incoming.peer_addr(),
                    );
                    tokio::spawn(
                        async move {
                            // One deadline for the upgrade and the name.
                            let deadline =
                                Instant::now() + state.handshake_timeout;
                            let conn = match timeout_at(
                                deadline,
                                incoming.upgrade(),
                            )
                            .await
                            {
                                Ok(Ok(conn)) => conn,
                                Ok(Err(e)) => {
                                    tracing::debug!(error = %e, "upgrade failed");
                                    return;
                                }
                                Err(_) => {
                                    tracing::debug!("upgrade timed out, dropping socket");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(
                                session_id, conn, deadline, state,
                            )
                            .await
                            {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
