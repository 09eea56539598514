//! Peer-to-peer protocol message definitions
//! These are the wire types exchanged between host and guest

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque peer identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which end of the connection a unit was spawned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Host,
    Guest,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Host => Self::Guest,
            Self::Guest => Self::Host,
        }
    }

    /// First wire id of this side's band
    fn band_start(self) -> u32 {
        match self {
            Self::Host => 1,
            Self::Guest => 1 + UnitId::BAND_WIDTH,
        }
    }
}

/// Stable unit identifier, unique for the whole match.
///
/// On the wire a unit id is a single integer. Each side owns a disjoint band
/// of `BAND_WIDTH` ids so both peers can address any unit unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct UnitId {
    pub side: Side,
    pub index: u8,
}

impl UnitId {
    pub const BAND_WIDTH: u32 = 100;

    pub fn new(side: Side, index: u8) -> Self {
        Self { side, index }
    }

    pub fn wire(self) -> u32 {
        self.side.band_start() + self.index as u32
    }
}

impl From<UnitId> for u32 {
    fn from(id: UnitId) -> Self {
        id.wire()
    }
}

impl TryFrom<u32> for UnitId {
    type Error = ProtocolError;

    fn try_from(wire: u32) -> Result<Self, Self::Error> {
        for side in [Side::Host, Side::Guest] {
            let start = side.band_start();
            if (start..start + Self::BAND_WIDTH).contains(&wire) {
                let index = u8::try_from(wire - start).map_err(|_| ProtocolError::UnitIdOutOfBand(wire))?;
                return Ok(Self { side, index });
            }
        }
        Err(ProtocolError::UnitIdOutOfBand(wire))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire())
    }
}

/// `{x, y}` point as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireVec {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for WireVec {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<WireVec> for Vec2 {
    fn from(v: WireVec) -> Self {
        Vec2::new(v.x, v.y)
    }
}

/// Messages exchanged once a match is set up.
///
/// The `msg` field carries the discriminator; the remaining fields are the
/// payload. Direction is noted on each variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum PeerMsg {
    /// host -> guest: declares who moves first
    #[serde(rename = "game:coin-flip", rename_all = "camelCase")]
    CoinFlip { first_to_move: PlayerId },

    /// guest -> host: guest finished spawning
    #[serde(rename = "game:ready")]
    Ready,

    /// host -> guest: authoritative position push
    #[serde(rename = "game:floatie-position")]
    UnitPosition { id: UnitId, pos: WireVec },

    /// host -> guest: authoritative rotation push
    #[serde(rename = "game:floatie-rotation")]
    UnitRotation { id: UnitId, rotation: f32 },

    /// guest -> host: live aim preview
    #[serde(rename = "game:floatie-aim")]
    UnitAim { id: UnitId, rotation: f32 },

    /// guest -> host: launch intent
    #[serde(rename = "game:floatie-release-charge")]
    ReleaseCharge { id: UnitId, vel: WireVec },

    /// host -> guest: unit reached zero hp
    #[serde(rename = "game:floatie-defeat")]
    UnitDefeat { id: UnitId },

    /// host -> guest: hp/attack after damage, effects or respawn
    #[serde(rename = "game:floatie-stats")]
    UnitStats { id: UnitId, hp: i32, attack: i32 },

    /// host -> guest: mirrors a score increment
    #[serde(rename = "game:score-update", rename_all = "camelCase")]
    ScoreUpdate {
        player_id: PlayerId,
        floatie_id: UnitId,
        increment: u32,
    },

    /// host -> guest: mirrors a turn advance
    #[serde(rename = "game:turn-advance")]
    TurnAdvance,

    /// host -> guest: match over
    #[serde(rename = "game:end")]
    End { winner: PlayerId },

    /// either: wants another round
    #[serde(rename = "rematch:accept")]
    RematchAccept,

    /// either: leaving after the match
    #[serde(rename = "rematch:decline")]
    RematchDecline,
}

impl PeerMsg {
    /// Wire discriminator, used for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CoinFlip { .. } => "game:coin-flip",
            Self::Ready => "game:ready",
            Self::UnitPosition { .. } => "game:floatie-position",
            Self::UnitRotation { .. } => "game:floatie-rotation",
            Self::UnitAim { .. } => "game:floatie-aim",
            Self::ReleaseCharge { .. } => "game:floatie-release-charge",
            Self::UnitDefeat { .. } => "game:floatie-defeat",
            Self::UnitStats { .. } => "game:floatie-stats",
            Self::ScoreUpdate { .. } => "game:score-update",
            Self::TurnAdvance => "game:turn-advance",
            Self::End { .. } => "game:end",
            Self::RematchAccept => "rematch:accept",
            Self::RematchDecline => "rematch:decline",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

/// Transport handshake, sent by both ends before any `PeerMsg`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename = "session:hello", rename_all = "camelCase")]
pub struct Hello {
    pub peer_id: PlayerId,
}

impl Hello {
    pub fn new(peer_id: PlayerId) -> Self {
        Self { peer_id }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unit id {0} is outside both unit bands")]
    UnitIdOutOfBand(u32),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}
