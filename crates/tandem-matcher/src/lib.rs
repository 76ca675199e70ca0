//! The pairing engine for Tandem.
//!
//! # Key types
//!
//! - [`Matcher`]: owns the waiting pool; pairs, unpairs and relays
//! - [`WaitingPool`]: the set of sessions eligible for pairing
//! - [`CredentialIssuer`]: mints time-boxed relay (TURN) credentials
//! - [`MatcherConfig`]: relay secret and credential lifetime
//!
//! # Lock order
//!
//! ```text
//! Match guard ─┬─→ session A state (released) ─→ session B state (released)
//!              └─→ pool lock is never held together with a session lock
//! ```
//!
//! Two session locks are never held at once.

mod config;
mod credentials;
mod matcher;
mod pool;

pub use config::MatcherConfig;
pub use credentials::{CredentialIssuer, RelayCredentials, DEFAULT_CREDENTIAL_TTL};
pub use matcher::Matcher;
pub use pool::WaitingPool;
