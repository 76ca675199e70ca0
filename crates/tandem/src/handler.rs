//! Per-connection handler: handshake, pairing, and the receive loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the handshake → validate the display name
//!   2. Create the session → hand it to the matcher (paired or parked)
//!   3. Loop: receive frames → `next`, relay, or terminate
//!   4. On exit, for any reason: run the matcher's disconnect path

use std::sync::Arc;

use tandem_protocol::{
    Codec, DisplayName, FrameHeader, FrameKind, Handshake, ProtocolError,
    SessionId,
};
use tandem_session::Session;
use tandem_transport::Connection;
use tokio::time::{timeout_at, Instant};

use crate::server::ServerState;
use crate::TandemError;

/// Drop guard that runs the disconnect path when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct DisconnectGuard<C: Connection> {
    session: Arc<Session<C>>,
    state: Arc<ServerState<C>>,
}

impl<C: Connection> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // Runtime shutting down; the whole pool goes with it.
            return;
        };
        let session = Arc::clone(&self.session);
        let state = Arc::clone(&self.state);
        runtime.spawn(async move {
            state.matcher.disconnect(&session).await;
        });
    }
}

/// Handles a single connection from upgrade to close.
///
/// The name frame must arrive before `deadline`.
pub(crate) async fn handle_connection<C: Connection>(
    session_id: SessionId,
    conn: C,
    deadline: Instant,
    state: Arc<ServerState<C>>,
) -> Result<(), TandemError> {
    // --- Step 1: Handshake ---
    let name = match perform_handshake(&conn, deadline, &state).await {
        Ok(name) => name,
        Err(e) => {
            // No session exists yet: nothing to clean up but the socket.
            let _ = conn.close().await;
            return Err(e);
        }
    };
    tracing::info!(%session_id, %name, "client connected");

    // --- Step 2: Pairing ---
    let session = Arc::new(Session::new(session_id, name, conn));
    let _guard = DisconnectGuard {
        session: Arc::clone(&session),
        state: Arc::clone(&state),
    };
    state.matcher.put(&session).await;

    // --- Step 3: Receive loop ---
    receive_loop(&session, &state).await;

    // _guard drops here → disconnect path runs.
    Ok(())
}

/// Reads the `{"name": ...}` frame and validates the name.
async fn perform_handshake<C: Connection>(
    conn: &C,
    deadline: Instant,
    state: &ServerState<C>,
) -> Result<DisplayName, TandemError> {
    let data = match timeout_at(deadline, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(TandemError::Connection(Box::new(e))),
        Err(_) => return Err(TandemError::HandshakeTimeout),
    };

    let handshake: Handshake = state.matcher.codec().decode(&data)?;
    Ok(handshake.display_name()?)
}

/// Processes inbound frames strictly in arrival order until the client
/// goes away or breaks the protocol.
async fn receive_loop<C: Connection>(
    session: &Arc<Session<C>>,
    state: &ServerState<C>,
) {
    let session_id = session.id();

    loop {
        let data = match session.connection().recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%session_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "recv error, disconnecting");
                break;
            }
        };

        let header: FrameHeader = match state.matcher.codec().decode(&data) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "malformed frame, disconnecting");
                session.close().await;
                break;
            }
        };

        match header.kind() {
            kind if kind.is_server_only() => {
                tracing::info!(
                    %session_id,
                    message_type = %header.message_type,
                    "server-only message sent by client, disconnecting"
                );
                session.close().await;
                break;
            }
            FrameKind::Next => {
                tracing::debug!(%session_id, match_id = %header.match_id, "next requested");
                state.matcher.next(session, header.match_id).await;
            }
            _ => {
                // Passthrough.
                state
                    .matcher
                    .relay(session, header.match_id, &data)
                    .await;
            }
        }
    }
}
