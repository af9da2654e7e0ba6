//! Bomb fuses and explosion-marker lifetimes, counted in simulation ticks

use serde::Serialize;
use uuid::Uuid;

use super::coords::GridCoord;
use super::players::PlayerId;

/// Default blast radius in cells
pub const DEFAULT_BOMB_POWER: u32 = 2;
/// Largest configurable blast radius in cells
pub const MAX_BOMB_POWER: u32 = 64;
/// Fuse length: two animation frames at 3 fps, played three times
pub const DEFAULT_FUSE_MS: u64 = 2000;
/// Explosion marker lifetime: 17 animation frames at 30 fps
pub const DEFAULT_EXPLOSION_MS: u64 = 567;

/// A bomb waiting for its fuse to run out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bomb {
    pub id: Uuid,
    /// Player who dropped it; detonation does not depend on them still being present
    pub owner: PlayerId,
    pub origin: GridCoord,
    pub power: u32,
    pub placed_tick: u64,
    pub detonate_tick: u64,
}

/// Pending bombs, detonated in placement order
#[derive(Debug, Default)]
pub struct BombTimers {
    bombs: Vec<Bomb>,
}

impl BombTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(
        &mut self,
        owner: PlayerId,
        origin: GridCoord,
        power: u32,
        tick: u64,
        fuse_ticks: u64,
    ) -> Bomb {
        let bomb = Bomb {
            id: Uuid::new_v4(),
            owner,
            origin,
            power,
            placed_tick: tick,
            detonate_tick: tick + fuse_ticks,
        };
        self.bombs.push(bomb.clone());
        bomb
    }

    /// Remove and return every bomb whose fuse has run out by `tick`
    pub fn take_due(&mut self, tick: u64) -> Vec<Bomb> {
        let (due, pending): (Vec<Bomb>, Vec<Bomb>) =
            self.bombs.drain(..).partition(|b| b.detonate_tick <= tick);
        self.bombs = pending;
        due
    }

    pub fn pending(&self) -> &[Bomb] {
        &self.bombs
    }

    pub fn len(&self) -> usize {
        self.bombs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bombs.is_empty()
    }
}

/// A visible explosion marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiveExplosion {
    pub coord: GridCoord,
    pub expires_tick: u64,
}

/// Explosion markers still on screen
#[derive(Debug, Default)]
pub struct ExplosionTimers {
    cells: Vec<LiveExplosion>,
}

impl ExplosionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, coords: impl IntoIterator<Item = GridCoord>, expires_tick: u64) {
        self.cells.extend(
            coords
                .into_iter()
                .map(|coord| LiveExplosion { coord, expires_tick }),
        );
    }

    /// Remove markers whose lifetime ended by `tick`, returning their coordinates
    pub fn take_expired(&mut self, tick: u64) -> Vec<GridCoord> {
        let mut expired = Vec::new();
        self.cells.retain(|cell| {
            if cell.expires_tick <= tick {
                expired.push(cell.coord);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn live(&self) -> &[LiveExplosion] {
        &self.cells
    }
}
