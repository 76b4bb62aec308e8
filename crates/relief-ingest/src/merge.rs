//! Stitching a square grid of tiles into one contiguous raster.
//!
//! Tiles are placed by the rank of their coordinates among the unique sorted
//! `tx` and `tz` values, so offset or gapped tile numbering still lands in a
//! dense grid.

use std::collections::BTreeSet;
use std::path::Path;

use relief_terrain::grid_file::{self, GridFileError, GridFiles};
use thiserror::Error;

use crate::tile::{ElevationTile, TileCoord};

/// Reasons a set of tiles cannot be merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// No tiles given.
    #[error("no tiles to merge")]
    Empty,
    /// Tile count is not a perfect square.
    #[error("{count} tiles do not form a square grid")]
    NotSquare {
        /// Number of tiles given.
        count: usize,
    },
    /// A tile's dimensions differ from the first tile's.
    #[error("tile {coord:?} is {found:?}, expected {expected:?}")]
    InconsistentSize {
        /// Offending tile.
        coord: TileCoord,
        /// Dimensions of the first tile.
        expected: (u32, u32),
        /// Dimensions of the offending tile.
        found: (u32, u32),
    },
    /// Coordinates do not cover a `side x side` grid exactly once.
    #[error(
        "tile coordinates span {columns} columns and {rows} rows, expected a {side}x{side} grid"
    )]
    NotAGrid {
        /// Unique `tx` values.
        columns: usize,
        /// Unique `tz` values.
        rows: usize,
        /// Expected side length in tiles.
        side: usize,
    },
}

/// A stitched elevation raster for one area and zoom level.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedGrid {
    /// Area the tiles belong to.
    pub area_id: String,
    /// Zoom level of the tiles.
    pub zoom: u32,
    /// Width in samples (`side * tile_width`).
    pub width: u32,
    /// Height in samples (`side * tile_height`).
    pub height: u32,
    /// Tiles along each axis.
    pub tiles_per_side: u32,
    /// Row-major elevations in meters.
    pub elevations: Vec<f32>,
}

impl MergedGrid {
    /// File stem for the export: `<area>-z<zoom>-merged`.
    pub fn file_stem(&self) -> String {
        format!("{}-z{}-merged", self.area_id, self.zoom)
    }

    /// Write `<stem>.f32` and its sidecar into `dir`.
    pub fn export(&self, dir: &Path) -> Result<GridFiles, GridFileError> {
        grid_file::write_grid(dir, &self.file_stem(), self.width, self.height, &self.elevations)
    }
}

/// Merge tiles into a single grid.
pub fn merge_tiles(
    area_id: &str,
    zoom: u32,
    tiles: &[ElevationTile],
) -> Result<MergedGrid, MergeError> {
    let first = tiles.first().ok_or(MergeError::Empty)?;

    let count = tiles.len();
    let side = count.isqrt();
    if side * side != count {
        return Err(MergeError::NotSquare { count });
    }

    let (tile_w, tile_h) = (first.width(), first.height());
    if let Some(odd) = tiles.iter().find(|t| (t.width(), t.height()) != (tile_w, tile_h)) {
        return Err(MergeError::InconsistentSize {
            coord: odd.coord(),
            expected: (tile_w, tile_h),
            found: (odd.width(), odd.height()),
        });
    }

    let columns = unique_sorted(tiles.iter().map(|t| t.coord().tx));
    let rows = unique_sorted(tiles.iter().map(|t| t.coord().tz));
    let not_a_grid = MergeError::NotAGrid {
        columns: columns.len(),
        rows: rows.len(),
        side,
    };
    if columns.len() != side || rows.len() != side {
        return Err(not_a_grid);
    }

    let tile_w = tile_w as usize;
    let tile_h = tile_h as usize;
    let width = side * tile_w;
    let height = side * tile_h;
    let mut elevations = vec![0.0_f32; width * height];
    let mut filled = vec![false; count];

    for tile in tiles {
        let (Ok(col), Ok(row)) = (
            columns.binary_search(&tile.coord().tx),
            rows.binary_search(&tile.coord().tz),
        ) else {
            return Err(not_a_grid);
        };
        if std::mem::replace(&mut filled[row * side + col], true) {
            return Err(not_a_grid);
        }

        let src = tile.elevations();
        for local_z in 0..tile_h {
            let dst = (row * tile_h + local_z) * width + col * tile_w;
            let row_src = &src[local_z * tile_w..(local_z + 1) * tile_w];
            elevations[dst..dst + tile_w].copy_from_slice(row_src);
        }
    }

    tracing::debug!(area = area_id, zoom, width, height, tiles = count, "merged tile grid");

    Ok(MergedGrid {
        area_id: area_id.to_string(),
        zoom,
        width: width as u32,
        height: height as u32,
        tiles_per_side: side as u32,
        elevations,
    })
}

fn unique_sorted(values: impl Iterator<Item = i64>) -> Vec<i64> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}
