//! Arena layouts: loading from JSON and seeded generation

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::coords::{GridCoord, WorldPos, TILE_SIZE};
use super::grid::{GridError, GridIndex};

/// Default arena width in tiles (1500 world units)
pub const DEFAULT_COLS: i32 = 23;
/// Default arena height in tiles (1024 world units)
pub const DEFAULT_ROWS: i32 = 16;

/// Errors raised while preparing the arena
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse map file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid map: {0}")]
    Grid(#[from] GridError),

    #[error("arena must be at least 3x3 tiles, got {cols}x{rows}")]
    TooSmall { cols: i32, rows: i32 },
}

/// Arena description in grid coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayout {
    pub cols: i32,
    pub rows: i32,
    /// Wall cells as `[col, row]`
    #[serde(default)]
    pub walls: Vec<(i32, i32)>,
    /// Chest cells as `[col, row]`
    #[serde(default)]
    pub chests: Vec<(i32, i32)>,
}

impl MapLayout {
    /// Load a layout from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let layout: MapLayout = serde_json::from_str(&raw)?;
        info!(
            path = %path.as_ref().display(),
            cols = layout.cols,
            rows = layout.rows,
            "Loaded map layout"
        );
        Ok(layout)
    }

    /// Generate the classic arena: border walls, a pillar on every even
    /// interior (col, row), and chests scattered over the remaining cells
    /// with the given density. The L-shaped spawn pocket in each corner is
    /// kept free of chests.
    pub fn generate(cols: i32, rows: i32, seed: u64, chest_density: f64) -> Result<Self, MapError> {
        if cols < 3 || rows < 3 {
            return Err(MapError::TooSmall { cols, rows });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let density = chest_density.clamp(0.0, 1.0);
        let spawn_cells = spawn_pockets(cols, rows);

        let mut walls = Vec::new();
        let mut chests = Vec::new();

        for row in 0..rows {
            for col in 0..cols {
                let border = col == 0 || row == 0 || col == cols - 1 || row == rows - 1;
                let pillar = col % 2 == 0 && row % 2 == 0;

                if border || pillar {
                    walls.push((col, row));
                } else if !spawn_cells.contains(&GridCoord::new(col, row)) && rng.gen_bool(density) {
                    chests.push((col, row));
                }
            }
        }

        Ok(Self {
            cols,
            rows,
            walls,
            chests,
        })
    }

    /// Build the occupancy index, rejecting duplicates and out-of-bounds cells
    pub fn build_index(&self) -> Result<GridIndex, MapError> {
        if self.cols < 3 || self.rows < 3 {
            return Err(MapError::TooSmall {
                cols: self.cols,
                rows: self.rows,
            });
        }

        let mut grid = GridIndex::new();
        for &(col, row) in &self.walls {
            grid.insert_wall(self.in_bounds(col, row)?)?;
        }
        for &(col, row) in &self.chests {
            grid.insert_chest(self.in_bounds(col, row)?)?;
        }
        Ok(grid)
    }

    fn in_bounds(&self, col: i32, row: i32) -> Result<GridCoord, GridError> {
        let coord = GridCoord::new(col, row);
        if col < 0 || row < 0 || col >= self.cols || row >= self.rows {
            return Err(GridError::OutOfBounds {
                coord,
                cols: self.cols,
                rows: self.rows,
            });
        }
        Ok(coord)
    }

    /// Playable area in world units
    pub fn world_bounds(&self) -> ArenaBounds {
        ArenaBounds {
            width: self.cols as f32 * TILE_SIZE,
            height: self.rows as f32 * TILE_SIZE,
        }
    }

    /// Centres of the four corner spawn cells, clockwise from top-left
    pub fn spawn_points(&self) -> [WorldPos; 4] {
        let (last_col, last_row) = (self.cols - 2, self.rows - 2);
        [
            GridCoord::new(1, 1).center(),
            GridCoord::new(last_col, 1).center(),
            GridCoord::new(last_col, last_row).center(),
            GridCoord::new(1, last_row).center(),
        ]
    }
}

/// Corner spawn cells plus their two inward neighbours
fn spawn_pockets(cols: i32, rows: i32) -> Vec<GridCoord> {
    let (last_col, last_row) = (cols - 2, rows - 2);
    let corners = [
        (GridCoord::new(1, 1), 1, 1),
        (GridCoord::new(last_col, 1), -1, 1),
        (GridCoord::new(1, last_row), 1, -1),
        (GridCoord::new(last_col, last_row), -1, -1),
    ];
    corners
        .iter()
        .flat_map(|&(corner, dc, dr)| [corner, corner.offset(dc, 0), corner.offset(0, dr)])
        .collect()
}

/// Size of the arena in world units; positions are clamped into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds {
    pub width: f32,
    pub height: f32,
}

impl ArenaBounds {
    /// Clamp a position so a body of `half_extent` stays inside the arena
    pub fn clamp(&self, pos: WorldPos, half_extent: f32) -> WorldPos {
        WorldPos {
            x: pos.x.clamp(half_extent, (self.width - half_extent).max(half_extent)),
            y: pos.y.clamp(half_extent, (self.height - half_extent).max(half_extent)),
        }
    }
}
