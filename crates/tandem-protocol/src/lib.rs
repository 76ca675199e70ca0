//! Wire protocol for Tandem.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Handshake`], [`FrameHeader`], [`ServerMessage`], ...):
//!   the frames that travel on the wire, plus the identifiers they carry.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding or
//!   validating a frame.
//!
//! The protocol layer knows nothing about connections or pairing. The only
//! part of a client frame the server interprets is its [`FrameHeader`];
//! passthrough payloads are relayed as the bytes that arrived.
//!
//! ```text
//! Transport (bytes) → Protocol (FrameHeader) → Matcher (pairing)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    DisplayName, FrameHeader, FrameKind, Handshake, MatchId, ServerMessage,
    SessionId, MAX_NAME_CHARS,
};
