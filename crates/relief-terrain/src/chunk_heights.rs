//! Per-chunk materialized height grids and point lookups against them.
//!
//! A chunk grid holds `(segments + 1)^2` heights laid out row-major as
//! `z * (segments + 1) + x`. Runtime queries (placing an object on the
//! ground) interpolate inside the grid instead of going back to the source.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::bilinear::bilinear;
use crate::provider::ProviderError;

/// Integer chunk coordinates on the world XZ plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk index along X.
    pub x: i32,
    /// Chunk index along Z.
    pub z: i32,
}

impl ChunkCoord {
    /// Create a chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World-space position of the chunk's minimum corner.
    pub fn origin(self, chunk_size: f32) -> Vec2 {
        Vec2::new(self.x as f32 * chunk_size, self.z as f32 * chunk_size)
    }

    /// Chunk containing the given world position.
    pub fn containing(world_x: f32, world_z: f32, chunk_size: f32) -> Self {
        Self {
            x: (world_x / chunk_size).floor() as i32,
            z: (world_z / chunk_size).floor() as i32,
        }
    }
}

/// World coordinate of lattice line `step` of a chunk along one axis.
///
/// Every producer of chunk grids computes vertex positions through this
/// function, which is what makes bulk and point queries agree bit for bit.
/// With `segments == 0` the single vertex sits on the chunk origin.
#[inline]
pub fn lattice_coordinate(chunk_index: i32, step: u32, segments: u32, chunk_size: f32) -> f32 {
    let origin = chunk_index as f32 * chunk_size;
    if segments == 0 {
        return origin;
    }
    origin + (step as f32 / segments as f32) * chunk_size
}

/// Heights for one chunk, generated once per chunk per height source.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkHeightGrid {
    chunk: ChunkCoord,
    chunk_size: f32,
    segments: u32,
    heights: Vec<f32>,
}

impl ChunkHeightGrid {
    /// Build a grid by evaluating `height` at every lattice vertex.
    ///
    /// The closure receives world `(x, z)` positions in row-major order.
    pub fn from_fn(
        chunk: ChunkCoord,
        chunk_size: f32,
        segments: u32,
        mut height: impl FnMut(f32, f32) -> f32,
    ) -> Self {
        let side = segments as usize + 1;
        let mut heights = Vec::with_capacity(side * side);
        for j in 0..=segments {
            let world_z = lattice_coordinate(chunk.z, j, segments, chunk_size);
            for i in 0..=segments {
                let world_x = lattice_coordinate(chunk.x, i, segments, chunk_size);
                heights.push(height(world_x, world_z));
            }
        }
        Self {
            chunk,
            chunk_size,
            segments,
            heights,
        }
    }

    /// Wrap an existing height buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::BufferSize`] if `heights.len() != (segments + 1)^2`.
    pub fn from_heights(
        chunk: ChunkCoord,
        chunk_size: f32,
        segments: u32,
        heights: Vec<f32>,
    ) -> Result<Self, ProviderError> {
        let side = segments as usize + 1;
        if heights.len() != side * side {
            return Err(ProviderError::BufferSize {
                expected: side * side,
                actual: heights.len(),
            });
        }
        Ok(Self {
            chunk,
            chunk_size,
            segments,
            heights,
        })
    }

    /// Wrap a buffer already produced by walking the chunk lattice.
    pub(crate) fn from_lattice(
        chunk: ChunkCoord,
        chunk_size: f32,
        segments: u32,
        heights: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(heights.len(), (segments as usize + 1).pow(2));
        Self {
            chunk,
            chunk_size,
            segments,
            heights,
        }
    }

    /// The chunk this grid belongs to.
    pub fn chunk(&self) -> ChunkCoord {
        self.chunk
    }

    /// Chunk edge length in world units.
    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Segments per chunk edge.
    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Vertices per chunk edge (`segments + 1`).
    pub fn side(&self) -> usize {
        self.segments as usize + 1
    }

    /// Raw row-major heights.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Consume the grid, returning its height buffer.
    pub fn into_heights(self) -> Vec<f32> {
        self.heights
    }

    /// Height stored at lattice vertex `(i, j)`, or `None` outside the grid.
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        let side = self.side();
        if i >= side || j >= side {
            return None;
        }
        Some(self.heights[j * side + i])
    }

    /// World XZ position of lattice vertex `(i, j)`.
    pub fn vertex_position(&self, i: u32, j: u32) -> Vec2 {
        Vec2::new(
            lattice_coordinate(self.chunk.x, i, self.segments, self.chunk_size),
            lattice_coordinate(self.chunk.z, j, self.segments, self.chunk_size),
        )
    }

    /// Interpolated height at chunk-local coordinates (clamped into the chunk).
    pub fn height_at_local(&self, local_x: f32, local_z: f32) -> f32 {
        height_at_local(&self.heights, local_x, local_z, self.chunk_size, self.segments)
    }

    /// Interpolated height at a world position; `0.0` outside this chunk.
    pub fn height_at_world(&self, world_x: f32, world_z: f32) -> f32 {
        height_at_world(
            &self.heights,
            world_x,
            world_z,
            self.chunk.x,
            self.chunk.z,
            self.chunk_size,
            self.segments,
        )
    }

    /// Lowest and highest height in the grid.
    pub fn min_max(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }
}

/// Interpolated height at chunk-local `(local_x, local_z)`.
///
/// Local coordinates are clamped into `[0, chunk_size]` and mapped onto the
/// lattice as `(local / chunk_size) * segments`. Returns `0.0` for a
/// non-positive chunk size or a buffer that is not `(segments + 1)²` long.
pub fn height_at_local(
    heights: &[f32],
    local_x: f32,
    local_z: f32,
    chunk_size: f32,
    segments: u32,
) -> f32 {
    let side = segments as usize + 1;
    if heights.len() != side * side || !(chunk_size > 0.0) {
        return 0.0;
    }

    let local_x = clamp_local(local_x, chunk_size);
    let local_z = clamp_local(local_z, chunk_size);
    let gx = (local_x / chunk_size) * segments as f32;
    let gz = (local_z / chunk_size) * segments as f32;

    bilinear(heights, side, side, gx, gz)
}

/// Interpolated height at a world position inside chunk `(chunk_x, chunk_z)`.
///
/// Returns `0.0` when the position falls outside `[0, chunk_size]` of this
/// chunk on either axis; callers resolve the owning chunk first.
pub fn height_at_world(
    heights: &[f32],
    world_x: f32,
    world_z: f32,
    chunk_x: i32,
    chunk_z: i32,
    chunk_size: f32,
    segments: u32,
) -> f32 {
    let local_x = world_x - chunk_x as f32 * chunk_size;
    let local_z = world_z - chunk_z as f32 * chunk_size;

    let inside = |v: f32| (0.0..=chunk_size).contains(&v);
    if !inside(local_x) || !inside(local_z) {
        return 0.0;
    }
    height_at_local(heights, local_x, local_z, chunk_size, segments)
}

fn clamp_local(value: f32, chunk_size: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, chunk_size)
}
