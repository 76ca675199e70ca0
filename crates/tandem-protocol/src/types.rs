//! Core protocol types for Tandem's wire format.
//!
//! Every type here is something that gets serialized onto a connection or
//! parsed off one. Field names follow what the browser client sends and
//! expects (`matchID`, `peerName`, `turnUsername`, ...), hence the explicit
//! `#[serde(rename)]` attributes.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Process-local identifier of one connected client.
///
/// Assigned from a monotonically increasing counter when the connection is
/// accepted and never reused for the lifetime of the process. It never goes
/// on the wire; it exists for the waiting pool and for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Correlation token shared by the two members of a match.
///
/// Drawn at random when a pairing is formed. It is a routing hint that lets
/// the server drop frames addressed to a match that has already ended, not
/// a secret: two matches may collide in the 32-bit space, which at worst
/// lets a stale frame through to a peer that is itself still connected.
///
/// `#[serde(transparent)]` puts it on the wire as a bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchId(pub u32);

impl MatchId {
    /// Draws a fresh id from the thread-local CSPRNG.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{:08x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Display names
// ---------------------------------------------------------------------------

/// Longest accepted display name, counted in Unicode scalar values.
pub const MAX_NAME_CHARS: usize = 15;

/// A validated, human-readable name shown to the other member of a match.
///
/// Only constructed through [`DisplayName::parse`], so holding one means
/// the name is between 1 and [`MAX_NAME_CHARS`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Validates a raw name from the handshake.
    ///
    /// Length is counted in `char`s, not bytes, so a 15-character name in
    /// any script is accepted.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidName`] if the name is empty or too long.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ProtocolError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ProtocolError::InvalidName("name is empty"));
        }
        if raw.chars().count() > MAX_NAME_CHARS {
            return Err(ProtocolError::InvalidName(
                "name is longer than 15 characters",
            ));
        }
        Ok(Self(raw))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// The first frame a client sends: `{"name": "..."}`.
///
/// A missing `name` decodes as empty and is then rejected by
/// [`Handshake::display_name`], the same as an explicitly empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(default)]
    pub name: String,
}

impl Handshake {
    /// Validates the requested name.
    pub fn display_name(self) -> Result<DisplayName, ProtocolError> {
        DisplayName::parse(self.name)
    }
}

/// The part of a steady-state frame the server interprets.
///
/// Everything else (`data`, custom fields) is opaque: passthrough frames
/// are relayed as the exact bytes that arrived. A missing or `null`
/// `matchID` reads as `0`, a missing or `null` `type` as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub message_type: String,
    #[serde(rename = "matchID", default, deserialize_with = "null_as_default")]
    pub match_id: MatchId,
}

/// Reads an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// How the server treats an inbound frame, based on its `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// `start`: server-only; a client sending it is a protocol violation.
    Start,
    /// `end`: server-only; a client sending it is a protocol violation.
    End,
    /// `next`: leave the current match and look for a new peer.
    Next,
    /// Anything else (`offer`, `answer`, `candidate`, custom types).
    Passthrough,
}

impl FrameKind {
    /// Whether only the server may send frames of this kind.
    pub fn is_server_only(self) -> bool {
        matches!(self, FrameKind::Start | FrameKind::End)
    }
}

impl FrameHeader {
    /// Classifies the frame by its `type` field.
    pub fn kind(&self) -> FrameKind {
        match self.message_type.as_str() {
            "start" => FrameKind::Start,
            "end" => FrameKind::End,
            "next" => FrameKind::Next,
            _ => FrameKind::Passthrough,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Notifications the server pushes to a client.
///
/// Internally tagged, so `End { match_id: MatchId(7) }` is
/// `{"type":"end","matchID":7}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// A match was formed. Exactly one side receives `offer: true` and
    /// starts the session negotiation.
    Start {
        #[serde(rename = "matchID")]
        match_id: MatchId,
        #[serde(rename = "peerName")]
        peer_name: String,
        offer: bool,
        #[serde(
            rename = "turnUsername",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        turn_username: Option<String>,
        #[serde(
            rename = "turnPassword",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        turn_password: Option<String>,
    },

    /// The match ended because the peer asked for someone new or left.
    End {
        #[serde(rename = "matchID")]
        match_id: MatchId,
    },
}
