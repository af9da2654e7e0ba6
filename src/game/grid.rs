//! Grid occupancy index for walls and chests

use std::collections::HashSet;

use serde::Serialize;

use super::coords::GridCoord;

/// What occupies a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupant {
    /// Indestructible, blocks blasts
    Wall,
    /// Destructible, destroyed by the first blast that reaches it
    Chest,
}

/// Errors raised while building the index from a map layout
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    #[error("cell {coord} already holds a {existing:?}, cannot add {incoming:?}")]
    DuplicateOccupant {
        coord: GridCoord,
        existing: Occupant,
        incoming: Occupant,
    },

    #[error("cell {coord} lies outside the {cols}x{rows} arena")]
    OutOfBounds { coord: GridCoord, cols: i32, rows: i32 },
}

/// Static and destructible occupants keyed by grid coordinate.
///
/// Insertion is exclusive: a cell holds at most one occupant, and inserting
/// into a taken cell is an error rather than an overwrite. Coordinates with
/// no entry are empty.
#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    walls: HashSet<GridCoord>,
    chests: HashSet<GridCoord>,
}

impl GridIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_wall(&mut self, coord: GridCoord) -> Result<(), GridError> {
        self.check_free(coord, Occupant::Wall)?;
        self.walls.insert(coord);
        Ok(())
    }

    pub fn insert_chest(&mut self, coord: GridCoord) -> Result<(), GridError> {
        self.check_free(coord, Occupant::Chest)?;
        self.chests.insert(coord);
        Ok(())
    }

    fn check_free(&self, coord: GridCoord, incoming: Occupant) -> Result<(), GridError> {
        match self.occupant_at(coord) {
            Some(existing) => Err(GridError::DuplicateOccupant {
                coord,
                existing,
                incoming,
            }),
            None => Ok(()),
        }
    }

    pub fn occupant_at(&self, coord: GridCoord) -> Option<Occupant> {
        if self.walls.contains(&coord) {
            Some(Occupant::Wall)
        } else if self.chests.contains(&coord) {
            Some(Occupant::Chest)
        } else {
            None
        }
    }

    /// True when the cell stops blast propagation outright
    pub fn is_blocking(&self, coord: GridCoord) -> bool {
        self.walls.contains(&coord)
    }

    /// Remove a destroyed chest. Returns false if there was none (already gone).
    pub fn remove_chest(&mut self, coord: GridCoord) -> bool {
        self.chests.remove(&coord)
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn chest_count(&self) -> usize {
        self.chests.len()
    }

    /// Walls in a stable (column, row) order
    pub fn walls(&self) -> Vec<GridCoord> {
        let mut walls: Vec<GridCoord> = self.walls.iter().copied().collect();
        walls.sort_unstable();
        walls
    }

    /// Chests in a stable (column, row) order
    pub fn chests(&self) -> Vec<GridCoord> {
        let mut chests: Vec<GridCoord> = self.chests.iter().copied().collect();
        chests.sort_unstable();
        chests
    }
}
