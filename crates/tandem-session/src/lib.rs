//! Client session state for Tandem.
//!
//! This crate holds the two records the matcher manipulates:
//!
//! 1. **[`Session`]**: one per connected client: its identity, display
//!    name, transport handle, and the pairing state (current match, current
//!    peer, disconnected flag) behind a single lock.
//! 2. **[`Match`]**: one per pairing: a random correlation id and the
//!    guard that makes forming and tearing down a pair atomic.
//!
//! # How it fits in the stack
//!
//! ```text
//! Matcher (above)  ← pairs sessions, owns the waiting pool
//!     ↕
//! Session Layer (this crate)  ← per-client state, serialized sends
//!     ↕
//! Protocol / Transport (below)  ← ids, frames, connections
//! ```

mod error;
mod pairing;
mod session;

pub use error::SessionError;
pub use pairing::Match;
pub use session::{Session, SessionPhase};
