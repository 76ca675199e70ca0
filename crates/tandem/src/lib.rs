//! # Tandem
//!
//! Rendezvous and signaling server that pairs anonymous clients two by two.
//!
//! Clients connect over WebSocket, announce a display name, and wait until
//! another client shows up. Once paired, both receive a `start` message with
//! a shared match id, and every other frame they send is relayed verbatim to
//! the peer, which is enough to carry a WebRTC offer/answer exchange. Either
//! side can ask for a `next` peer at any time; the other side receives `end`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tandem::prelude::*;
//!
//! # async fn run() -> Result<(), TandemError> {
//! let server = TandemServer::builder()
//!     .bind("0.0.0.0:2001")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::TandemError;
pub use server::{TandemServer, TandemServerBuilder, DEFAULT_HANDSHAKE_TIMEOUT};

pub use tandem_matcher::{MatcherConfig, DEFAULT_CREDENTIAL_TTL};
pub use tandem_protocol::{MatchId, ServerMessage, SessionId, MAX_NAME_CHARS};
pub use tandem_transport::DEFAULT_UPGRADE_PATH;

/// Everything needed to embed a server.
pub mod prelude {
    pub use crate::{
        MatchId, ServerMessage, SessionId, TandemError, TandemServer,
        TandemServerBuilder,
    };
}
