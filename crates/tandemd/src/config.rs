//! Command-line configuration.

use std::time::Duration;

use clap::Parser;
use tandem::{TandemServerBuilder, DEFAULT_UPGRADE_PATH};

/// Pairs anonymous WebSocket clients two by two and relays their
/// signaling messages.
#[derive(Debug, Parser)]
#[command(name = "tandemd", version)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:2001", env = "TANDEM_BIND")]
    pub bind: String,

    /// Request path WebSocket clients upgrade on.
    #[arg(long, default_value = DEFAULT_UPGRADE_PATH, env = "TANDEM_PATH")]
    pub path: String,

    /// Secret shared with the TURN relay. Leave empty to send no relay
    /// credentials.
    #[arg(
        long,
        default_value = "",
        env = "TANDEM_TURN_SECRET",
        hide_env_values = true
    )]
    pub turn_secret: String,

    /// Lifetime of issued relay credentials, in seconds.
    #[arg(long, default_value_t = 10, env = "TANDEM_CREDENTIAL_TTL_SECS")]
    pub credential_ttl_secs: u64,

    /// Time a client has to send its name after connecting, in seconds.
    #[arg(long, default_value_t = 10, env = "TANDEM_HANDSHAKE_TIMEOUT_SECS")]
    pub handshake_timeout_secs: u64,
}

impl Args {
    /// Maps the parsed arguments onto a server builder.
    pub fn into_builder(self) -> TandemServerBuilder {
        TandemServerBuilder::new()
            .bind(&self.bind)
            .path(&self.path)
            .relay_secret(self.turn_secret)
            .credential_ttl(Duration::from_secs(self.credential_ttl_secs))
            .handshake_timeout(Duration::from_secs(self.handshake_timeout_secs))
    }
}
