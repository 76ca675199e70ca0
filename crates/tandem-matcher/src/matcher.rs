//! The matcher: pairs waiting sessions and tears pairs down.
//!
//! # Pairing (`put`)
//!
//! ```text
//! loop:
//!   pop any waiting session, or park the newcomer (one pool lock) ──parked──→ done
//!        │
//!   new Match, lock its guard
//!   lock candidate: disconnected? ──yes──→ drop it, loop again
//!        │
//!   attach candidate (its lock), attach newcomer (its lock)
//!   send `start` to both, release guard, done
//! ```
//!
//! # Unpairing (`next`, `disconnect`)
//!
//! Under the match guard: detach the acting session (its lock), then clear
//! the peer's back-reference and send it `end` (the peer's lock). The peer
//! keeps the ended match id until its client answers with `next`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tandem_protocol::{Codec, JsonCodec, MatchId, ServerMessage, SessionId};
use tandem_session::{Match, Session};
use tandem_transport::Connection;

use crate::{CredentialIssuer, MatcherConfig, WaitingPool};

/// Owns the waiting pool and runs every pairing state transition.
///
/// Created once at startup and shared (`Arc<Matcher>`) by all connection
/// tasks. None of its operations fail: send errors are logged and left to
/// the affected client's own read loop to clean up.
pub struct Matcher<C: Connection, K: Codec = JsonCodec> {
    pool: WaitingPool<C>,
    issuer: CredentialIssuer,
    codec: K,
    next_session_id: AtomicU64,
}

impl<C: Connection> Matcher<C, JsonCodec> {
    /// Creates a matcher speaking JSON.
    pub fn new(config: MatcherConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Connection, K: Codec> Matcher<C, K> {
    pub fn with_codec(config: MatcherConfig, codec: K) -> Self {
        if config.relay_secret.is_empty() {
            tracing::info!("relay secret not set, start messages carry no credentials");
        }
        Self {
            pool: WaitingPool::new(),
            issuer: CredentialIssuer::new(
                config.relay_secret,
                config.credential_ttl,
            ),
            codec,
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Hands out the next session identity. Never repeats within the
    /// process lifetime.
    pub fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn codec(&self) -> &K {
        &self.codec
    }

    /// Number of sessions currently waiting for a peer.
    pub async fn waiting_len(&self) -> usize {
        self.pool.len().await
    }

    pub async fn is_waiting(&self, id: SessionId) -> bool {
        self.pool.contains(id).await
    }

    /// Pairs `session` with a waiting peer, or parks it in the pool.
    ///
    /// `session` must be unpaired and not already in the pool. When a pair
    /// forms, the newcomer receives `start` with `offer: true` and the
    /// peer that was waiting receives `offer: false`, both carrying the same
    /// match id and independently issued relay credentials.
    pub async fn put(&self, session: &Arc<Session<C>>) {
        loop {
            tracing::debug!(session = %session.id(), "seeking a peer");

            let Some(peer) = self.pool.pop_or_insert(session).await else {
                tracing::debug!(session = %session.id(), "no peer waiting, parked in pool");
                return;
            };

            let pairing = Arc::new(Match::new());
            let _guard = pairing.lock().await;

            // The candidate may have disconnected between leaving the pool
            // and being locked here.
            if !peer.attach(Arc::clone(&pairing), Arc::clone(session)).await {
                tracing::debug!(
                    session = %session.id(),
                    peer = %peer.id(),
                    "candidate already disconnected, retrying"
                );
                continue;
            }
            // The newcomer's own task is running this, so it cannot be
            // marked disconnected concurrently.
            session.attach(Arc::clone(&pairing), Arc::clone(&peer)).await;

            let match_id = pairing.id();
            tracing::info!(
                %match_id,
                session = %session.id(),
                peer = %peer.id(),
                "matched"
            );

            // Both credentials share one validity window.
            let now = SystemTime::now();
            self.send_start(session, &peer, match_id, true, now).await;
            self.send_start(&peer, session, match_id, false, now).await;
            return;
        }
    }

    /// Leaves the current match and looks for a new peer.
    ///
    /// Ignored unless `match_id` is the session's current match: a `next`
    /// for an older match is a stale frame.
    pub async fn next(&self, session: &Arc<Session<C>>, match_id: MatchId) {
        let Some(pairing) = session.current_match().await else {
            tracing::debug!(session = %session.id(), %match_id, "next without a match, ignored");
            return;
        };
        if pairing.id() != match_id {
            tracing::debug!(
                session = %session.id(),
                %match_id,
                current = %pairing.id(),
                "next for a stale match, ignored"
            );
            return;
        }

        {
            let _guard = pairing.lock().await;
            self.unmatch(session, &pairing).await;
        }

        self.put(session).await;
    }

    /// Cleans up after a session whose read loop has ended.
    ///
    /// A matched session tears its match down (the peer gets `end`); an
    /// unpaired one is taken out of the pool. Calling this twice for the
    /// same session is harmless.
    pub async fn disconnect(&self, session: &Arc<Session<C>>) {
        match session.mark_disconnected().await {
            Some(pairing) => {
                let _guard = pairing.lock().await;
                self.unmatch(session, &pairing).await;
            }
            None => {
                if self.pool.remove(session.id()).await {
                    tracing::debug!(session = %session.id(), "removed from pool");
                }
            }
        }
        tracing::info!(session = %session.id(), "disconnected");
    }

    /// Forwards a passthrough frame to the session's current peer.
    ///
    /// Returns whether the frame was forwarded; a frame for another match
    /// id, or sent while unpaired, is dropped.
    pub async fn relay(
        &self,
        session: &Arc<Session<C>>,
        match_id: MatchId,
        frame: &[u8],
    ) -> bool {
        let forwarded = session.relay(match_id, frame).await;
        if !forwarded {
            tracing::trace!(session = %session.id(), %match_id, "stale frame dropped");
        }
        forwarded
    }

    /// Detaches `session` and notifies its peer. The caller holds the
    /// match guard.
    async fn unmatch(&self, session: &Arc<Session<C>>, pairing: &Match) {
        let match_id = pairing.id();
        let Some(peer) = session.detach().await else {
            // The peer left first; only our side remained.
            return;
        };

        tracing::info!(%match_id, session = %session.id(), peer = %peer.id(), "unmatched");
        if let Some(frame) = self.encode(&ServerMessage::End { match_id }) {
            peer.release_peer(&frame).await;
        }
    }

    async fn send_start(
        &self,
        to: &Session<C>,
        peer: &Session<C>,
        match_id: MatchId,
        offer: bool,
        now: SystemTime,
    ) {
        let (turn_username, turn_password) =
            self.issuer.issue_at(now).into_fields();
        let msg = ServerMessage::Start {
            match_id,
            peer_name: peer.name().to_string(),
            offer,
            turn_username,
            turn_password,
        };
        let Some(frame) = self.encode(&msg) else {
            return;
        };
        if let Err(e) = to.send(&frame).await {
            tracing::debug!(%match_id, error = %e, "start notification not delivered");
        }
    }

    fn encode(&self, msg: &ServerMessage) -> Option<Vec<u8>> {
        match self.codec.encode(msg) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode server message");
                None
            }
        }
    }
}
