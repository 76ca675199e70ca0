//! Per-client session: identity, transport handle and pairing state.
//!
//! A session's pairing state is three fields that only make sense together:
//!
//! ```text
//!   current match ── Some ⇔ paired (or just un-paired by the peer)
//!   current peer  ── Some only while the peer is still attached
//!   disconnected  ── set once, when the read loop ends; never reset
//! ```
//!
//! They live behind one lock and every method below reads or writes them
//! in a single critical section. No method ever holds two sessions' locks
//! at once: when an operation touches both members of a pair, the matcher
//! locks one, mutates, releases, then locks the other.

use std::fmt;
use std::sync::Arc;

use tandem_protocol::{DisplayName, MatchId, SessionId};
use tandem_transport::Connection;
use tokio::sync::Mutex;

use crate::{Match, SessionError};

/// Read-only snapshot of where a session is in its lifecycle.
///
/// ```text
///   Unpaired ──(matched)──→ Matched ──(peer left)──→ Ended
///      ↑                       │                       │
///      └────────(next)─────────┴─────────(next)────────┘
///
///   any state ──(read loop ends)──→ Disconnected
/// ```
///
/// `Unpaired` covers both "not yet handed to the matcher" and "waiting in
/// the pool"; only the pool knows which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unpaired,
    Matched { match_id: MatchId, peer: SessionId },
    Ended { match_id: MatchId },
    Disconnected,
}

struct PairingState<C: Connection> {
    current: Option<Arc<Match>>,
    peer: Option<Arc<Session<C>>>,
    disconnected: bool,
}

/// Server-side state of one connected client.
pub struct Session<C: Connection> {
    id: SessionId,
    name: DisplayName,
    conn: C,
    state: Mutex<PairingState<C>>,
}

impl<C: Connection> Session<C> {
    /// Creates an unpaired session around an upgraded connection.
    pub fn new(id: SessionId, name: DisplayName, conn: C) -> Self {
        Self {
            id,
            name,
            conn,
            state: Mutex::new(PairingState {
                current: None,
                peer: None,
                disconnected: false,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &DisplayName {
        &self.name
    }

    /// The underlying connection, for the read loop.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Writes one frame to this session's client.
    ///
    /// Safe to call from any task; the connection serializes writers.
    pub async fn send(&self, frame: &[u8]) -> Result<(), SessionError> {
        self.conn.send(frame).await.map_err(|e| SessionError::Send {
            session: self.id,
            source: Box::new(e),
        })
    }

    /// Closes the client connection, ignoring failures.
    pub async fn close(&self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(session = %self.id, error = %e, "close failed");
        }
    }

    /// Pairs this session with `peer` under `pairing`.
    ///
    /// Returns `false`, leaving the state untouched, if the session has
    /// already been marked disconnected. The matcher uses this to discard a
    /// candidate that died between leaving the pool and being locked.
    pub async fn attach(&self, pairing: Arc<Match>, peer: Arc<Self>) -> bool {
        let mut state = self.state.lock().await;
        if state.disconnected {
            return false;
        }
        state.current = Some(pairing);
        state.peer = Some(peer);
        true
    }

    /// Clears both the current match and the current peer, returning the
    /// peer if one was still attached.
    pub async fn detach(&self) -> Option<Arc<Self>> {
        let mut state = self.state.lock().await;
        state.current = None;
        state.peer.take()
    }

    /// Drops the back-reference to a departing peer and tells the client
    /// the match is over.
    ///
    /// The current match stays set: the client answers `end` with a `next`
    /// for that match id, which is what puts it back in the pool. The
    /// `end` frame is written while the lock is held so no relay can slip
    /// in between the state change and the notification.
    pub async fn release_peer(&self, end_frame: &[u8]) {
        let mut state = self.state.lock().await;
        state.peer = None;
        if let Err(e) = self.send(end_frame).await {
            tracing::debug!(error = %e, "end notification not delivered");
        }
    }

    /// Forwards a passthrough frame to the current peer.
    ///
    /// The frame is only forwarded if a peer is attached and `match_id`
    /// is the current match's id; otherwise it belongs to a match that has
    /// already ended and is dropped. Returns whether it was forwarded.
    pub async fn relay(&self, match_id: MatchId, frame: &[u8]) -> bool {
        let state = self.state.lock().await;
        let (Some(current), Some(peer)) = (&state.current, &state.peer) else {
            return false;
        };
        if current.id() != match_id {
            return false;
        }
        // The lock stays held so the peer cannot change mid-forward.
        if let Err(e) = peer.send(frame).await {
            tracing::debug!(error = %e, "relay to peer failed");
        }
        true
    }

    /// Marks the session disconnected and returns its current match, in
    /// one critical section.
    ///
    /// A pairing attempt that locks this session afterwards sees the flag
    /// and backs off; one that got in first has already set the match,
    /// which the caller then tears down.
    pub async fn mark_disconnected(&self) -> Option<Arc<Match>> {
        let mut state = self.state.lock().await;
        state.disconnected = true;
        state.current.clone()
    }

    pub async fn current_match(&self) -> Option<Arc<Match>> {
        self.state.lock().await.current.clone()
    }

    /// The id of the attached peer, if any.
    pub async fn peer_id(&self) -> Option<SessionId> {
        self.state.lock().await.peer.as_ref().map(|p| p.id())
    }

    pub async fn is_disconnected(&self) -> bool {
        self.state.lock().await.disconnected
    }

    pub async fn phase(&self) -> SessionPhase {
        let state = self.state.lock().await;
        if state.disconnected {
            return SessionPhase::Disconnected;
        }
        match (&state.current, &state.peer) {
            (Some(current), Some(peer)) => SessionPhase::Matched {
                match_id: current.id(),
                peer: peer.id(),
            },
            (Some(current), None) => SessionPhase::Ended {
                match_id: current.id(),
            },
            _ => SessionPhase::Unpaired,
        }
    }
}

impl<C: Connection> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
