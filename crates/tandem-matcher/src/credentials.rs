//! Ephemeral relay credentials.
//!
//! Relay servers such as coturn accept a time-limited username of the form
//! `<expiry unix time>:<anything>` with the password
//! `base64(HMAC-SHA1(shared secret, username))`. The relay recomputes the
//! HMAC itself, so issuing a credential needs no round trip.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Lifetime of a credential when not configured otherwise.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(10);

/// Random bytes in the opaque part of the username.
const NAME_BYTES: usize = 6;

/// A username/password pair for the relay server.
///
/// Both fields are empty when issuance is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayCredentials {
    pub username: String,
    pub password: String,
}

impl RelayCredentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    /// The pair as optional wire fields: `None` when issuance is disabled.
    pub fn into_fields(self) -> (Option<String>, Option<String>) {
        if self.is_empty() {
            (None, None)
        } else {
            (Some(self.username), Some(self.password))
        }
    }
}

/// Mints relay credentials from a shared secret.
#[derive(Clone)]
pub struct CredentialIssuer {
    secret: Vec<u8>,
    ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Whether a secret is configured.
    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Issues a credential valid until `now` + TTL.
    ///
    /// Every call draws a fresh random name, so two credentials issued
    /// for the same instant are still distinct.
    pub fn issue_at(&self, now: SystemTime) -> RelayCredentials {
        if !self.is_enabled() {
            return RelayCredentials::default();
        }

        let name_bytes: [u8; NAME_BYTES] = rand::random();
        let name = STANDARD.encode(name_bytes);

        let expiry = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .saturating_add(self.ttl)
            .as_secs();
        let username = format!("{expiry}:{name}");

        let mut mac = HmacSha1::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(username.as_bytes());
        let password = STANDARD.encode(mac.finalize().into_bytes());

        RelayCredentials { username, password }
    }
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("enabled", &self.is_enabled())
            .field("ttl", &self.ttl)
            .finish()
    }
}
