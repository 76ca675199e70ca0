//! State-machine tests for the matcher, driven over in-memory connections.
//!
//! No read loops run here: each test calls the matcher operations a
//! connection handler would call, in the order it would call them, and
//! inspects what each client received.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tandem_matcher::{Matcher, MatcherConfig};
use tandem_protocol::{DisplayName, MatchId};
use tandem_session::{Session, SessionPhase};
use tandem_transport::{MemoryClient, MemoryConnection};

type TestSession = Arc<Session<MemoryConnection>>;

// =========================================================================
// Helpers
// =========================================================================

fn matcher() -> Matcher<MemoryConnection> {
    Matcher::new(MatcherConfig::default())
}

fn connect(
    matcher: &Matcher<MemoryConnection>,
    name: &str,
) -> (TestSession, MemoryClient) {
    let (conn, client) = MemoryConnection::pair();
    let session = Session::new(
        matcher.next_session_id(),
        DisplayName::parse(name).unwrap(),
        conn,
    );
    (Arc::new(session), client)
}

/// Pops the next frame a client has already been sent.
fn frame(client: &mut MemoryClient) -> Value {
    let bytes = client.try_recv().expect("a frame should be queued");
    serde_json::from_slice(&bytes).expect("server sends JSON")
}

fn match_id(v: &Value) -> MatchId {
    MatchId(v["matchID"].as_u64().expect("matchID") as u32)
}

/// Connects two clients and pairs them; returns both with the match id.
async fn matched_pair(
    matcher: &Matcher<MemoryConnection>,
) -> (TestSession, MemoryClient, TestSession, MemoryClient, MatchId) {
    let (a, mut ca) = connect(matcher, "ada");
    let (b, mut cb) = connect(matcher, "bob");
    matcher.put(&a).await;
    matcher.put(&b).await;
    let start_a = frame(&mut ca);
    let start_b = frame(&mut cb);
    assert_eq!(match_id(&start_a), match_id(&start_b));
    let id = match_id(&start_a);
    (a, ca, b, cb, id)
}

// =========================================================================
// Pairing
// =========================================================================

#[tokio::test]
async fn test_second_arrival_pairs_with_waiting_session() {
    let matcher = matcher();
    let (a, mut ca) = connect(&matcher, "ada");
    let (b, mut cb) = connect(&matcher, "bob");

    matcher.put(&a).await;
    assert!(matcher.is_waiting(a.id()).await);

    matcher.put(&b).await;
    assert_eq!(matcher.waiting_len().await, 0);

    let start_a = frame(&mut ca);
    let start_b = frame(&mut cb);

    assert_eq!(start_a["type"], "start");
    assert_eq!(start_b["type"], "start");
    assert_eq!(start_a["peerName"], "bob");
    assert_eq!(start_b["peerName"], "ada");
    assert_eq!(match_id(&start_a), match_id(&start_b));

    // The newcomer initiates the negotiation.
    assert_eq!(start_b["offer"], true);
    assert_eq!(start_a["offer"], false);

    // No relay secret: no credential fields at all.
    assert!(start_a.get("turnUsername").is_none());
    assert!(start_b.get("turnPassword").is_none());

    let id = match_id(&start_a);
    assert_eq!(
        a.phase().await,
        SessionPhase::Matched { match_id: id, peer: b.id() }
    );
    assert_eq!(
        b.phase().await,
        SessionPhase::Matched { match_id: id, peer: a.id() }
    );
}

#[tokio::test]
async fn test_start_carries_independent_credentials_when_secret_set() {
    let matcher: Matcher<MemoryConnection> = Matcher::new(MatcherConfig {
        relay_secret: "s3cret".into(),
        ..MatcherConfig::default()
    });
    let (a, mut ca) = connect(&matcher, "ada");
    let (b, mut cb) = connect(&matcher, "bob");
    matcher.put(&a).await;
    matcher.put(&b).await;

    let start_a = frame(&mut ca);
    let start_b = frame(&mut cb);
    let user_a = start_a["turnUsername"].as_str().expect("username");
    let user_b = start_b["turnUsername"].as_str().expect("username");
    assert_ne!(user_a, user_b, "each side gets its own credential");
    assert!(start_a["turnPassword"].as_str().is_some());

    // Same validity window.
    let expiry = |u: &str| u.split_once(':').unwrap().0.parse::<u64>().unwrap();
    assert_eq!(expiry(user_a), expiry(user_b));
}

#[tokio::test]
async fn test_disconnected_candidate_is_skipped() {
    let matcher = matcher();
    let (a, _ca) = connect(&matcher, "ada");
    let (b, mut cb) = connect(&matcher, "bob");
    matcher.put(&a).await;

    // `a` dies but its cleanup has not reached the pool yet.
    assert!(a.mark_disconnected().await.is_none());

    matcher.put(&b).await;

    // `b` must not be paired with the dead session.
    assert!(cb.try_recv().is_none());
    assert!(matcher.is_waiting(b.id()).await);
    assert!(!matcher.is_waiting(a.id()).await);
    assert_eq!(b.phase().await, SessionPhase::Unpaired);
}

// =========================================================================
// Relay
// =========================================================================

#[tokio::test]
async fn test_relay_forwards_verbatim_to_current_peer() {
    let matcher = matcher();
    let (a, _ca, _b, mut cb, id) = matched_pair(&matcher).await;

    let raw = format!(
        r#"{{"type":"offer","matchID":{},"data":{{"sdp":"v=0"}},"x":1}}"#,
        id.0
    );
    assert!(matcher.relay(&a, id, raw.as_bytes()).await);
    assert_eq!(cb.try_recv().unwrap(), raw.as_bytes());
}

#[tokio::test]
async fn test_relay_with_stale_match_id_is_dropped() {
    let matcher = matcher();
    let (a, _ca, _b, mut cb, id) = matched_pair(&matcher).await;

    let stale = MatchId(id.0.wrapping_add(1));
    assert!(!matcher.relay(&a, stale, b"{}").await);
    assert!(cb.try_recv().is_none());
}

// =========================================================================
// Next
// =========================================================================

#[tokio::test]
async fn test_next_ends_match_and_rematches_with_waiting_session() {
    let matcher = matcher();
    let (a, mut ca, b, mut cb, first) = matched_pair(&matcher).await;
    let (c, mut cc) = connect(&matcher, "cyd");
    matcher.put(&c).await;
    assert!(matcher.is_waiting(c.id()).await);

    matcher.next(&a, first).await;

    // b is told its match is over, exactly once.
    let end = frame(&mut cb);
    assert_eq!(end["type"], "end");
    assert_eq!(match_id(&end), first);
    assert!(cb.try_recv().is_none());
    assert_eq!(b.phase().await, SessionPhase::Ended { match_id: first });

    // a and c form a new match.
    let start_a = frame(&mut ca);
    let start_c = frame(&mut cc);
    assert_eq!(start_a["peerName"], "cyd");
    assert_eq!(start_a["offer"], true);
    assert_eq!(start_c["offer"], false);
    let second = match_id(&start_a);
    assert_eq!(second, match_id(&start_c));
    assert_ne!(second, first);
    assert_eq!(
        a.phase().await,
        SessionPhase::Matched { match_id: second, peer: c.id() }
    );

    // b rejoins the pool once its client answers `end` with `next`.
    matcher.next(&b, first).await;
    assert!(matcher.is_waiting(b.id()).await);
    assert_eq!(b.phase().await, SessionPhase::Unpaired);
}

#[tokio::test]
async fn test_next_without_waiting_peer_parks_session() {
    let matcher = matcher();
    let (a, mut ca, _b, mut cb, id) = matched_pair(&matcher).await;

    matcher.next(&a, id).await;

    assert_eq!(frame(&mut cb)["type"], "end");
    assert!(ca.try_recv().is_none());
    assert!(matcher.is_waiting(a.id()).await);
}

#[tokio::test]
async fn test_next_with_stale_match_id_is_ignored() {
    let matcher = matcher();
    let (a, _ca, b, mut cb, id) = matched_pair(&matcher).await;

    matcher.next(&a, MatchId(id.0.wrapping_add(1))).await;

    assert!(cb.try_recv().is_none());
    assert_eq!(
        a.phase().await,
        SessionPhase::Matched { match_id: id, peer: b.id() }
    );
    assert_eq!(matcher.waiting_len().await, 0);
}

#[tokio::test]
async fn test_next_while_waiting_is_ignored() {
    let matcher = matcher();
    let (a, _ca) = connect(&matcher, "ada");
    matcher.put(&a).await;

    matcher.next(&a, MatchId(0)).await;
    assert_eq!(matcher.waiting_len().await, 1);
}

// =========================================================================
// Disconnect
// =========================================================================

#[tokio::test]
async fn test_disconnect_while_waiting_leaves_pool() {
    let matcher = matcher();
    let (a, _ca) = connect(&matcher, "ada");
    matcher.put(&a).await;

    matcher.disconnect(&a).await;

    assert_eq!(matcher.waiting_len().await, 0);
    assert_eq!(a.phase().await, SessionPhase::Disconnected);
}

#[tokio::test]
async fn test_disconnect_while_matched_sends_peer_one_end() {
    let matcher = matcher();
    let (a, _ca, b, mut cb, id) = matched_pair(&matcher).await;

    matcher.disconnect(&a).await;

    let end = frame(&mut cb);
    assert_eq!(end["type"], "end");
    assert_eq!(match_id(&end), id);
    assert!(cb.try_recv().is_none());

    // Further frames from b go nowhere.
    assert!(!matcher.relay(&b, id, b"{}").await);

    // A second cleanup pass does not notify again.
    matcher.disconnect(&a).await;
    assert!(cb.try_recv().is_none());
}

#[tokio::test]
async fn test_both_sides_disconnect_notifies_only_survivor() {
    let matcher = matcher();
    let (a, _ca, b, mut cb, _id) = matched_pair(&matcher).await;

    matcher.disconnect(&a).await;
    assert_eq!(frame(&mut cb)["type"], "end");

    matcher.disconnect(&b).await;
    assert!(cb.try_recv().is_none());
    assert_eq!(matcher.waiting_len().await, 0);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_keep_pool_and_pairs_consistent() {
    const N: usize = 64;
    let matcher = Arc::new(matcher());

    let mut sessions = Vec::new();
    let mut clients = Vec::new();
    for i in 0..N {
        let (s, c) = connect(&matcher, &format!("u{i}"));
        sessions.push(s);
        clients.push(c);
    }

    let tasks: Vec<_> = sessions
        .iter()
        .cloned()
        .map(|s| {
            let matcher = Arc::clone(&matcher);
            tokio::spawn(async move { matcher.put(&s).await })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    let mut matched = 0;
    let mut match_ids = HashSet::new();
    for s in &sessions {
        match s.phase().await {
            SessionPhase::Matched { match_id, peer } => {
                matched += 1;
                match_ids.insert(match_id);
                assert!(!matcher.is_waiting(s.id()).await);

                // Symmetry: the peer points back at us under the same id.
                let other = sessions.iter().find(|o| o.id() == peer).unwrap();
                assert_eq!(
                    other.phase().await,
                    SessionPhase::Matched { match_id, peer: s.id() }
                );
            }
            SessionPhase::Unpaired => {
                assert!(matcher.is_waiting(s.id()).await, "unpaired must wait");
            }
            other => panic!("unexpected phase {other:?}"),
        }
    }

    assert_eq!(matched + matcher.waiting_len().await, N);
    assert_eq!(matched % 2, 0);
    // Parking and popping share one pool lock, so an even number of
    // simultaneous arrivals leaves nobody behind.
    assert_eq!(matched, N);

    // Every matched session got exactly one start.
    for (s, c) in sessions.iter().zip(clients.iter_mut()) {
        let expected = usize::from(s.current_match().await.is_some());
        let mut got = 0;
        while c.try_recv().is_some() {
            got += 1;
        }
        assert_eq!(got, expected, "start count for {}", s.id());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disconnects_and_puts_leave_no_dead_sessions() {
    const N: usize = 40;
    let matcher = Arc::new(matcher());

    let mut sessions = Vec::new();
    let mut clients = Vec::new();
    for i in 0..N {
        let (s, c) = connect(&matcher, &format!("u{i}"));
        sessions.push(s);
        clients.push(c);
    }

    // Even sessions join and immediately drop; odd sessions join and stay.
    let tasks: Vec<_> = sessions
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, s)| {
            let matcher = Arc::clone(&matcher);
            tokio::spawn(async move {
                matcher.put(&s).await;
                if i % 2 == 0 {
                    matcher.disconnect(&s).await;
                }
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    for (i, s) in sessions.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(s.phase().await, SessionPhase::Disconnected);
            assert!(!matcher.is_waiting(s.id()).await);
        } else {
            // A live session is waiting, matched with another live
            // session, or was left by a peer that dropped.
            match s.phase().await {
                SessionPhase::Unpaired => {
                    assert!(matcher.is_waiting(s.id()).await)
                }
                SessionPhase::Matched { peer, .. } => {
                    let other =
                        sessions.iter().find(|o| o.id() == peer).unwrap();
                    assert!(!other.is_disconnected().await);
                }
                SessionPhase::Ended { .. } => {}
                SessionPhase::Disconnected => panic!("live session marked dead"),
            }
        }
    }
    drop(clients);
}
