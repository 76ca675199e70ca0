//! Matcher configuration.

use std::time::Duration;

use crate::DEFAULT_CREDENTIAL_TTL;

/// Settings for a [`Matcher`](crate::Matcher).
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Secret shared with the relay (TURN) server.
    ///
    /// Empty disables credential issuance: `start` messages then carry no
    /// `turnUsername`/`turnPassword` fields.
    pub relay_secret: String,

    /// How long an issued credential stays valid.
    ///
    /// Default: 10 seconds, enough for the two clients to allocate a
    /// relay right after `start`.
    pub credential_ttl: Duration,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            relay_secret: String::new(),
            credential_ttl: DEFAULT_CREDENTIAL_TTL,
        }
    }
}
