//! The record of one pairing between two sessions.

use tandem_protocol::MatchId;
use tokio::sync::{Mutex, MutexGuard};

/// One pairing of exactly two sessions.
///
/// A `Match` is shared (`Arc<Match>`) by the two sessions it pairs and by
/// nothing else. Once both sides have detached it is dropped; there is no
/// registry of matches.
///
/// The guard serializes "attach both members" against "tear the pair
/// down", so no other operation on this match observes a half-formed or
/// half-torn pairing. It is an async mutex because the `start` and `end`
/// notifications are sent while it is held.
#[derive(Debug)]
pub struct Match {
    id: MatchId,
    guard: Mutex<()>,
}

impl Match {
    /// Creates a match with a freshly drawn random id.
    pub fn new() -> Self {
        Self::with_id(MatchId::random())
    }

    /// Creates a match with a known id.
    pub fn with_id(id: MatchId) -> Self {
        Self {
            id,
            guard: Mutex::new(()),
        }
    }

    /// The correlation id both members see in their frames.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Acquires the formation/teardown guard.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().await
    }
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}
