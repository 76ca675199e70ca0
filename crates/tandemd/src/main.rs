//! `tandemd`: runs a Tandem server configured from flags and environment.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod config;

use clap::Parser;
use tandem::TandemError;
use tracing_subscriber::EnvFilter;

use crate::config::Args;

#[tokio::main]
async fn main() -> Result<(), TandemError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(
        bind = %args.bind,
        path = %args.path,
        relay_credentials = !args.turn_secret.is_empty(),
        "starting tandemd"
    );

    let server = args.into_builder().build().await?;
    server.run().await
}
