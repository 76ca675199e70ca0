//! The waiting pool: sessions that want a peer and don't have one.

use std::collections::HashMap;
use std::sync::Arc;

use tandem_protocol::SessionId;
use tandem_session::Session;
use tandem_transport::Connection;
use tokio::sync::Mutex;

/// Set of sessions eligible for pairing, keyed by session id.
///
/// A session is in the pool from the moment the matcher parks it until it
/// is popped for a pairing or removed on disconnect. Order is not
/// significant: any waiting session is as good a match as any other.
///
/// The lock is only held for the map operation itself, never across a
/// send or while another lock is taken.
pub struct WaitingPool<C: Connection> {
    sessions: Mutex<HashMap<SessionId, Arc<Session<C>>>>,
}

impl<C: Connection> WaitingPool<C> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Takes an arbitrary waiting session, or parks `session` if nobody
    /// else is waiting.
    ///
    /// Both happen under one lock, so two sessions arriving together can
    /// never both end up parked.
    pub async fn pop_or_insert(
        &self,
        session: &Arc<Session<C>>,
    ) -> Option<Arc<Session<C>>> {
        let mut sessions = self.sessions.lock().await;
        let waiting = sessions
            .keys()
            .copied()
            .find(|id| *id != session.id())
            .and_then(|id| sessions.remove(&id));
        if waiting.is_none() {
            sessions.insert(session.id(), Arc::clone(session));
        }
        waiting
    }

    /// Removes a specific session. Returns whether it was present.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

impl<C: Connection> Default for WaitingPool<C> {
    fn default() -> Self {
        Self::new()
    }
}
