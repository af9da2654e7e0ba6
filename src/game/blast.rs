//! Blast propagation - which cells a detonation reaches and what it destroys

use serde::Serialize;
use tracing::debug;

use super::coords::{GridCoord, WorldPos, TILE_SIZE};
use super::grid::{GridIndex, Occupant};
use super::players::{PlayerId, PlayerRegistry};

/// Propagation direction of a blast arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastDirection {
    /// The bomb's own cell
    Origin,
    Up,
    Right,
    Down,
    Left,
}

impl BlastDirection {
    /// Evaluation order of the arms
    pub const ALL: [BlastDirection; 5] = [
        BlastDirection::Origin,
        BlastDirection::Up,
        BlastDirection::Right,
        BlastDirection::Down,
        BlastDirection::Left,
    ];

    /// Unit vector in grid space
    pub fn delta(self) -> (i32, i32) {
        match self {
            BlastDirection::Origin => (0, 0),
            BlastDirection::Up => (0, -1),
            BlastDirection::Right => (1, 0),
            BlastDirection::Down => (0, 1),
            BlastDirection::Left => (-1, 0),
        }
    }

    /// Highest step this arm may reach for a given power
    fn max_step(self, power: u32) -> u32 {
        match self {
            BlastDirection::Origin => 0,
            _ => power,
        }
    }
}

/// One explosion marker produced by a detonation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExplosionCell {
    pub coord: GridCoord,
    pub direction: BlastDirection,
    /// Distance from the origin in cells
    pub step: u32,
}

/// Outcome of a single detonation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlastReport {
    pub origin: GridCoord,
    pub power: u32,
    /// Explosion markers in registration order; the origin cell appears once
    /// per arm since every arm starts at step 0
    pub cells: Vec<ExplosionCell>,
    pub destroyed_chests: Vec<GridCoord>,
    /// Players eliminated by this blast, each listed once
    pub eliminated: Vec<PlayerId>,
}

impl BlastReport {
    /// Markers registered by one arm
    pub fn cells_in(&self, direction: BlastDirection) -> Vec<ExplosionCell> {
        self.cells
            .iter()
            .filter(|c| c.direction == direction)
            .copied()
            .collect()
    }

    /// Distinct coordinates that received an explosion marker, sorted
    pub fn affected_coords(&self) -> Vec<GridCoord> {
        let mut coords: Vec<GridCoord> = self.cells.iter().map(|c| c.coord).collect();
        coords.sort_unstable();
        coords.dedup();
        coords
    }
}

/// Blast propagation over the grid and player registry
pub struct BlastEngine;

impl BlastEngine {
    /// Detonate a bomb of `power` at `origin`.
    ///
    /// Each arm advances one tile per step up to `power` (the origin arm only
    /// covers step 0). At every step, players overlapping the cell are
    /// eliminated first; this never stops the arm. A wall then stops the arm
    /// without marking its cell. Otherwise the cell is marked, and a chest
    /// there is destroyed and stops the arm after this step. Arms do not
    /// affect each other.
    pub fn detonate(
        grid: &mut GridIndex,
        players: &mut PlayerRegistry,
        origin: GridCoord,
        power: u32,
    ) -> BlastReport {
        let mut report = BlastReport {
            origin,
            power,
            cells: Vec::new(),
            destroyed_chests: Vec::new(),
            eliminated: Vec::new(),
        };
        let origin_center = origin.center();

        for direction in BlastDirection::ALL {
            let (dx, dy) = direction.delta();

            for step in 0..=direction.max_step(power) {
                let reach = step as f32 * TILE_SIZE;
                let candidate = GridCoord::from_world(WorldPos {
                    x: origin_center.x + dx as f32 * reach,
                    y: origin_center.y + dy as f32 * reach,
                });

                for id in players.overlapping(candidate) {
                    if players.eliminate(&id) {
                        debug!(player_id = %id, cell = %candidate, "Player caught in blast");
                        report.eliminated.push(id);
                    }
                }

                if grid.is_blocking(candidate) {
                    break;
                }

                report.cells.push(ExplosionCell {
                    coord: candidate,
                    direction,
                    step,
                });

                if grid.occupant_at(candidate) == Some(Occupant::Chest) {
                    grid.remove_chest(candidate);
                    report.destroyed_chests.push(candidate);
                    break;
                }
            }
        }

        players.compact();

        for direction in BlastDirection::ALL {
            let reach = report.cells_in(direction).last().map(|c| c.step);
            debug!(origin = %origin, ?direction, ?reach, "Blast arm resolved");
        }

        report
    }
}
