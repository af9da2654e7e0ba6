//! World/grid coordinate conversion
//!
//! Every pixel-to-cell conversion in the server goes through this module so
//! that occupancy lookups agree on which cell an entity is in.

use serde::{Deserialize, Serialize};

/// Edge length of one grid cell in world units
pub const TILE_SIZE: f32 = 64.0;

/// Half a tile; the offset from a cell's corner to its centre
pub const HALF_TILE: f32 = TILE_SIZE / 2.0;

/// Discrete grid coordinate (column, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

impl GridCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Map a world position to the cell whose centre the position is closest
    /// to from below: `floor((pos - tile/2) / tile)` on each axis.
    pub fn from_world(pos: WorldPos) -> Self {
        Self {
            col: ((pos.x - HALF_TILE) / TILE_SIZE).floor() as i32,
            row: ((pos.y - HALF_TILE) / TILE_SIZE).floor() as i32,
        }
    }

    /// The cell an entity is standing on, snapping its position to the
    /// centre of the tile that contains it first.
    pub fn containing(pos: WorldPos) -> Self {
        Self::from_world(pos.snap_to_tile_center())
    }

    /// World position of this cell's centre
    pub fn center(self) -> WorldPos {
        WorldPos {
            x: self.col as f32 * TILE_SIZE + HALF_TILE,
            y: self.row as f32 * TILE_SIZE + HALF_TILE,
        }
    }

    /// Axis-aligned bounds covered by this cell
    pub fn bounds(self) -> Rect {
        Rect::centered(self.center(), TILE_SIZE, TILE_SIZE)
    }

    pub fn offset(self, d_col: i32, d_row: i32) -> Self {
        Self {
            col: self.col + d_col,
            row: self.row + d_row,
        }
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Continuous position in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Move the position to the centre of the tile containing it
    pub fn snap_to_tile_center(self) -> Self {
        Self {
            x: snap_axis(self.x),
            y: snap_axis(self.y),
        }
    }
}

fn snap_axis(v: f32) -> f32 {
    (v / TILE_SIZE).floor() * TILE_SIZE + HALF_TILE
}

/// Axis-aligned rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn centered(center: WorldPos, width: f32, height: f32) -> Self {
        Self {
            left: center.x - width / 2.0,
            top: center.y - height / 2.0,
            right: center.x + width / 2.0,
            bottom: center.y + height / 2.0,
        }
    }

    /// Strict overlap test; rectangles that only share an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }
}
