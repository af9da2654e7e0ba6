//! Game simulation modules

pub mod blast;
pub mod bomb;
pub mod coords;
pub mod grid;
pub mod map;
pub mod movement;
pub mod players;
pub mod session;
pub mod snapshot;

pub use session::{GameSession, SessionHandle, SessionSettings, SessionState};

use uuid::Uuid;

use self::coords::WorldPos;
use self::movement::MovementInput;
use self::players::PlayerId;

/// Inbound event after it has been decoded from the wire
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Join {
        player_id: PlayerId,
        spawn: WorldPos,
    },
    Movement {
        player_id: PlayerId,
        input: MovementInput,
    },
    /// `None` addresses the sole player in single-player mode
    MovementEnd {
        player_id: Option<PlayerId>,
    },
    DropBomb {
        player_id: PlayerId,
    },
    Disconnect {
        player_id: PlayerId,
    },
}

impl SessionEvent {
    /// Events that only ever bring a player to rest or remove it
    pub fn ends_activity(&self) -> bool {
        matches!(self, SessionEvent::MovementEnd { .. } | SessionEvent::Disconnect { .. })
    }
}

/// Event queued for the session loop
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub connection_id: Uuid,
    pub event: SessionEvent,
    pub received_at: u64,
}
