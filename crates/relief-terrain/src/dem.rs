//! Height queries against a loaded elevation raster (DEM).
//!
//! World positions map to pixel coordinates through the raster's world
//! origin, which sits at the **center** of the grid, and a fixed
//! meters-per-pixel scale. Queries outside the raster clamp to the nearest
//! edge instead of failing.

use std::path::Path;

use crate::bilinear::bilinear;
use crate::chunk_heights::{ChunkCoord, ChunkHeightGrid, lattice_coordinate};
use crate::grid_file::{self, GridFileError};
use crate::provider::{HeightProvider, ProviderConfig, ProviderError};

/// Pixel coordinates are clamped to `[0, size - 1 - EDGE_EPSILON]`.
pub const EDGE_EPSILON: f32 = 1e-3;

/// Elevation raster sampled by world position with bilinear interpolation.
///
/// The buffer is owned exclusively by this provider and never mutated after
/// construction. [`HeightProvider::config`] hands out a copy.
#[derive(Clone, Debug)]
pub struct DemHeightProvider {
    heights: Box<[f32]>,
    width: usize,
    height: usize,
    meters_per_pixel: f32,
    origin_x: f32,
    origin_z: f32,
}

impl DemHeightProvider {
    /// Wrap a row-major raster of `width * height` elevations in meters.
    ///
    /// The world origin defaults to `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Fails if a dimension is zero, the buffer length does not match, or
    /// `meters_per_pixel` is not a positive finite number.
    pub fn new(
        heights: Vec<f32>,
        width: usize,
        height: usize,
        meters_per_pixel: f32,
    ) -> Result<Self, ProviderError> {
        if width == 0 || height == 0 {
            return Err(ProviderError::EmptyRaster { width, height });
        }
        if heights.len() != width * height {
            return Err(ProviderError::BufferSize {
                expected: width * height,
                actual: heights.len(),
            });
        }
        if !(meters_per_pixel.is_finite() && meters_per_pixel > 0.0) {
            return Err(ProviderError::InvalidScale(meters_per_pixel));
        }
        Ok(Self {
            heights: heights.into_boxed_slice(),
            width,
            height,
            meters_per_pixel,
            origin_x: 0.0,
            origin_z: 0.0,
        })
    }

    /// Place the raster center at world `(origin_x, origin_z)`.
    pub fn with_origin(mut self, origin_x: f32, origin_z: f32) -> Self {
        self.origin_x = origin_x;
        self.origin_z = origin_z;
        self
    }

    /// Load a merged grid written by the ingestion pipeline.
    ///
    /// `path` points at the `.f32` file; dimensions come from its
    /// `.meta.json` sidecar.
    pub fn load(path: &Path, meters_per_pixel: f32) -> Result<Self, GridFileError> {
        let (meta, heights) = grid_file::read_grid(path)?;
        let provider = Self::new(
            heights,
            meta.width as usize,
            meta.height as usize,
            meters_per_pixel,
        )?;
        tracing::info!(
            path = %path.display(),
            width = meta.width,
            height = meta.height,
            meters_per_pixel,
            "loaded DEM grid"
        );
        Ok(provider)
    }

    /// Raster width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Ground distance between adjacent samples.
    pub fn meters_per_pixel(&self) -> f32 {
        self.meters_per_pixel
    }

    /// World position of the raster center.
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_z)
    }

    /// Raw row-major elevations.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Raster footprint in meters along X and Z.
    pub fn extent_meters(&self) -> (f32, f32) {
        (
            self.width as f32 * self.meters_per_pixel,
            self.height as f32 * self.meters_per_pixel,
        )
    }

    /// Fractional, clamped pixel column for a world X.
    fn grid_x(&self, world_x: f32) -> f32 {
        let grid_width_m = self.width as f32 * self.meters_per_pixel;
        let rel_x = world_x - self.origin_x + grid_width_m / 2.0;
        clamp_to_grid(rel_x / self.meters_per_pixel, self.width)
    }

    /// Fractional, clamped pixel row for a world Z.
    fn grid_z(&self, world_z: f32) -> f32 {
        let grid_height_m = self.height as f32 * self.meters_per_pixel;
        let rel_z = world_z - self.origin_z + grid_height_m / 2.0;
        clamp_to_grid(rel_z / self.meters_per_pixel, self.height)
    }
}

impl HeightProvider for DemHeightProvider {
    fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        bilinear(
            &self.heights,
            self.width,
            self.height,
            self.grid_x(world_x),
            self.grid_z(world_z),
        )
    }

    fn height_data(&self, chunk: ChunkCoord, chunk_size: f32, segments: u32) -> ChunkHeightGrid {
        // Pixel columns and rows repeat across the lattice; map each once.
        let columns: Vec<f32> = (0..=segments)
            .map(|i| self.grid_x(lattice_coordinate(chunk.x, i, segments, chunk_size)))
            .collect();

        let side = segments as usize + 1;
        let mut heights = Vec::with_capacity(side * side);
        for j in 0..=segments {
            let gz = self.grid_z(lattice_coordinate(chunk.z, j, segments, chunk_size));
            heights.extend(
                columns
                    .iter()
                    .map(|&gx| bilinear(&self.heights, self.width, self.height, gx, gz)),
            );
        }

        ChunkHeightGrid::from_lattice(chunk, chunk_size, segments, heights)
    }

    fn config(&self) -> ProviderConfig {
        ProviderConfig::Dem {
            width: self.width,
            height: self.height,
            meters_per_pixel: self.meters_per_pixel,
            origin_x: self.origin_x,
            origin_z: self.origin_z,
            buffer: bytemuck::cast_slice::<f32, u8>(&self.heights[..]).to_vec(),
        }
    }
}

/// Clamp a fractional pixel coordinate into `[0, size - 1 - EDGE_EPSILON]`.
///
/// A single-sample axis clamps to 0. NaN maps to 0.
fn clamp_to_grid(g: f32, size: usize) -> f32 {
    if g.is_nan() {
        return 0.0;
    }
    let upper = (size as f32 - 1.0 - EDGE_EPSILON).max(0.0);
    g.clamp(0.0, upper)
}
