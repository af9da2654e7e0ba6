//! Live player records for one session

use std::collections::HashMap;

use super::coords::{GridCoord, Rect, WorldPos, TILE_SIZE};
use super::map::ArenaBounds;
use super::movement::Velocity;

/// Player identifier as sent by the client; stable for the session
pub type PlayerId = String;

/// Edge length of a player's square hitbox
pub const PLAYER_SIZE: f32 = TILE_SIZE;

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub pos: WorldPos,
    pub velocity: Velocity,
    pub alive: bool,
    /// Tick the player joined on
    pub joined_tick: u64,
}

impl Player {
    pub fn new(id: PlayerId, spawn: WorldPos, joined_tick: u64) -> Self {
        Self {
            id,
            pos: spawn,
            velocity: Velocity::ZERO,
            alive: true,
            joined_tick,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::centered(self.pos, PLAYER_SIZE, PLAYER_SIZE)
    }

    /// The cell the player is standing on
    pub fn cell(&self) -> GridCoord {
        GridCoord::containing(self.pos)
    }
}

/// Live players keyed by id.
///
/// Eliminated players are marked dead and stay in the map until the next
/// [`PlayerRegistry::compact`]; every lookup treats a dead record as absent.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player. An existing entry for the same id is replaced.
    pub fn add(&mut self, id: PlayerId, spawn: WorldPos, tick: u64) -> Option<Player> {
        self.players.insert(id.clone(), Player::new(id, spawn, tick))
    }

    /// Remove a player; absent ids are a no-op returning `None`
    pub fn remove(&mut self, id: &str) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id).filter(|p| p.alive)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id).filter(|p| p.alive)
    }

    /// Visit every live player
    pub fn for_each(&self, mut f: impl FnMut(&Player)) {
        self.players.values().filter(|p| p.alive).for_each(|p| f(p));
    }

    /// Teleport a live player. Tick movement goes through `integrate`.
    #[allow(dead_code)]
    pub fn set_position(&mut self, id: &str, pos: WorldPos) -> bool {
        match self.get_mut(id) {
            Some(player) => {
                player.pos = pos;
                true
            }
            None => false,
        }
    }

    pub fn set_velocity(&mut self, id: &str, velocity: Velocity) -> bool {
        match self.get_mut(id) {
            Some(player) => {
                player.velocity = velocity;
                true
            }
            None => false,
        }
    }

    /// Mark a live player as eliminated. Returns false if already dead or absent.
    pub fn eliminate(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(player) => {
                player.alive = false;
                true
            }
            None => false,
        }
    }

    /// Drop every dead record, returning the removed ids sorted
    pub fn compact(&mut self) -> Vec<PlayerId> {
        let mut dead: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| !p.alive)
            .map(|p| p.id.clone())
            .collect();
        dead.sort();
        for id in &dead {
            self.players.remove(id);
        }
        dead
    }

    /// Ids of live players whose hitbox overlaps the given cell, sorted
    pub fn overlapping(&self, cell: GridCoord) -> Vec<PlayerId> {
        let cell_bounds = cell.bounds();
        let mut hits: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.alive && p.bounds().overlaps(&cell_bounds))
            .map(|p| p.id.clone())
            .collect();
        hits.sort();
        hits
    }

    /// Advance every live player by its velocity over `dt` seconds,
    /// keeping hitboxes inside the arena
    pub fn integrate(&mut self, dt: f32, bounds: ArenaBounds) {
        for player in self.players.values_mut().filter(|p| p.alive) {
            if player.velocity == Velocity::ZERO {
                continue;
            }
            let moved = WorldPos {
                x: player.pos.x + player.velocity.x * dt,
                y: player.pos.y + player.velocity.y * dt,
            };
            player.pos = bounds.clamp(moved, PLAYER_SIZE / 2.0);
        }
    }

    /// The only registered player, for single-player addressing
    pub fn sole_player(&self) -> Option<&Player> {
        let mut live = self.players.values().filter(|p| p.alive);
        match (live.next(), live.next()) {
            (Some(player), None) => Some(player),
            _ => None,
        }
    }

    /// Number of live players
    pub fn len(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
