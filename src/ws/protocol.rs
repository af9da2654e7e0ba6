//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::coords::{GridCoord, WorldPos};
use crate::game::movement::{Axis, KeyState, MovementEncoding, MovementInput};
use crate::game::players::PlayerId;
use crate::game::SessionEvent;

/// Reasons an inbound frame is rejected
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("movement must use the {expected:?} encoding")]
    WrongMovementEncoding { expected: MovementEncoding },
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "malformed_event",
            ProtocolError::WrongMovementEncoding { .. } => "wrong_movement_encoding",
        }
    }
}

/// Events sent from client to server.
///
/// Each frame is an envelope `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Start or change movement
    PlayerMovement(MovementPayload),

    /// Stop moving
    PlayerMovementEnd(MovementEndPayload),

    /// Drop a bomb on the player's current cell
    DropBomb(DropBombPayload),

    /// Register a player at a spawn position
    NewPlayer(NewPlayerPayload),

    /// Player left; the payload is the bare player id
    Disconnect(PlayerId),
}

/// Carries exactly one of `move` or `angle`; which one is accepted
/// depends on the server's movement encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPayload {
    pub player_id: PlayerId,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<MoveDirection>,
    /// Degrees, 0 = down, 90 = right, 180 = up, 270 = left
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
}

/// Single held direction key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

impl From<MoveDirection> for KeyState {
    fn from(direction: MoveDirection) -> Self {
        let held = |d: MoveDirection| direction == d;
        KeyState {
            horizontal: Axis::from_keys(held(MoveDirection::Left), held(MoveDirection::Right)),
            vertical: Axis::from_keys(held(MoveDirection::Up), held(MoveDirection::Down)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementEndPayload {
    /// Omitted in single-player mode
    #[serde(default)]
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropBombPayload {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayerPayload {
    pub player_id: PlayerId,
    pub spawnx: f32,
    pub spawny: f32,
}

impl ClientEvent {
    /// Convert into a session event, enforcing the server's movement encoding
    pub fn into_session_event(self, encoding: MovementEncoding) -> Result<SessionEvent, ProtocolError> {
        let event = match self {
            ClientEvent::PlayerMovement(p) => {
                let input = match (encoding, p.direction, p.angle) {
                    (MovementEncoding::Keys, Some(direction), None) => {
                        MovementInput::Keys(direction.into())
                    }
                    (MovementEncoding::Angle, None, Some(angle)) => MovementInput::Angle(angle),
                    _ => return Err(ProtocolError::WrongMovementEncoding { expected: encoding }),
                };
                SessionEvent::Movement {
                    player_id: p.player_id,
                    input,
                }
            }
            ClientEvent::PlayerMovementEnd(p) => SessionEvent::MovementEnd {
                player_id: p.player_id,
            },
            ClientEvent::DropBomb(p) => SessionEvent::DropBomb {
                player_id: p.player_id,
            },
            ClientEvent::NewPlayer(p) => SessionEvent::Join {
                player_id: p.player_id,
                spawn: WorldPos::new(p.spawnx, p.spawny),
            },
            ClientEvent::Disconnect(player_id) => SessionEvent::Disconnect { player_id },
        };
        Ok(event)
    }
}

/// Decode one text frame into a session event
pub fn decode_frame(text: &str, encoding: MovementEncoding) -> Result<SessionEvent, ProtocolError> {
    serde_json::from_str::<ClientEvent>(text)?.into_session_event(encoding)
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once per connection with the arena layout
    Welcome {
        connection_id: Uuid,
        server_time: u64,
        arena: ArenaInfo,
    },

    /// Gameplay results produced during one tick
    Events { tick: u64, events: Vec<GameEvent> },

    /// Periodic full state for rendering
    Snapshot {
        tick: u64,
        players: Vec<PlayerSnapshot>,
        bombs: Vec<BombSnapshot>,
        /// Cells with a live explosion marker
        explosions: Vec<GridCoord>,
        chests_remaining: usize,
    },

    /// Error message
    Error { code: String, message: String },
}

/// Static arena description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaInfo {
    pub cols: i32,
    pub rows: i32,
    pub tile_size: f32,
    pub walls: Vec<GridCoord>,
    pub chests: Vec<GridCoord>,
    /// Suggested spawn positions, one per corner
    pub spawns: Vec<WorldPos>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub joined_tick: u64,
}

/// Pending bomb in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BombSnapshot {
    pub bomb_id: Uuid,
    pub cell: GridCoord,
    pub placed_tick: u64,
    pub detonate_tick: u64,
}

/// Gameplay results for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },

    PlayerLeft {
        player_id: PlayerId,
        /// "disconnected" or "eliminated"
        reason: String,
    },

    BombPlaced {
        bomb_id: Uuid,
        owner: PlayerId,
        cell: GridCoord,
        power: u32,
        detonate_tick: u64,
    },

    /// A bomb went off
    Detonation {
        bomb_id: Uuid,
        origin: GridCoord,
        /// Distinct cells that received an explosion marker
        cells: Vec<GridCoord>,
        destroyed_chests: Vec<GridCoord>,
        eliminated: Vec<PlayerId>,
    },

    /// Explosion markers whose lifetime ended
    ExplosionExpired { cells: Vec<GridCoord> },
}
