//! The height source contract shared by DEM and procedural terrain.
//!
//! The chunk streaming code only sees [`HeightProvider`]. To move a source
//! onto a worker thread it takes a [`ProviderConfig`] snapshot, sends it
//! across, and rebuilds an equivalent provider there with
//! [`ProviderConfig::build`]; the worker then owns its own copy of any raster.

use serde::{Deserialize, Serialize};

use crate::chunk_heights::{ChunkCoord, ChunkHeightGrid};
use crate::dem::DemHeightProvider;
use crate::procedural::{ProceduralHeightProvider, ProceduralParams};

/// Errors raised while constructing or rebuilding a height provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Width or height is zero.
    #[error("raster dimensions must be non-zero, got {width}x{height}")]
    EmptyRaster {
        /// Raster width in samples.
        width: usize,
        /// Raster height in samples.
        height: usize,
    },
    /// A buffer does not hold the number of values its dimensions imply.
    #[error("buffer holds {actual} values, expected {expected}")]
    BufferSize {
        /// Values implied by the dimensions.
        expected: usize,
        /// Values actually present.
        actual: usize,
    },
    /// A byte buffer is not a whole number of `f32` values of the right count.
    #[error("byte buffer holds {actual} bytes, expected {expected}")]
    ByteLength {
        /// Bytes implied by the dimensions.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },
    /// Meters per pixel must be positive and finite.
    #[error("meters per pixel must be positive and finite, got {0}")]
    InvalidScale(f32),
    /// Fractal composition with zero octaves has no defined value.
    #[error("procedural height source needs at least one octave")]
    ZeroOctaves,
}

/// A source of terrain elevation queried by world position.
///
/// Implementations are immutable after construction, so `&self` queries are
/// safe from any thread and return the same value for the same coordinate
/// regardless of call order.
pub trait HeightProvider: Send + Sync {
    /// Elevation at world `(x, z)`. Never fails; out-of-range positions are
    /// resolved by the provider's own boundary policy.
    fn height_at(&self, world_x: f32, world_z: f32) -> f32;

    /// Heights for every lattice vertex of one chunk.
    ///
    /// Must equal [`height_at`](Self::height_at) evaluated at
    /// [`ChunkHeightGrid::vertex_position`] for every vertex.
    fn height_data(&self, chunk: ChunkCoord, chunk_size: f32, segments: u32) -> ChunkHeightGrid {
        ChunkHeightGrid::from_fn(chunk, chunk_size, segments, |x, z| self.height_at(x, z))
    }

    /// Snapshot sufficient to rebuild an equivalent provider elsewhere.
    fn config(&self) -> ProviderConfig;
}

/// Serializable description of a height provider.
///
/// DEM snapshots carry the raster as raw native-endian `f32` bytes; building
/// from a snapshot copies them into a fresh buffer owned by the new provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ProviderConfig {
    /// A sampled elevation raster.
    Dem {
        /// Raster width in samples.
        width: usize,
        /// Raster height in samples.
        height: usize,
        /// Ground distance between adjacent samples.
        meters_per_pixel: f32,
        /// World X of the raster center.
        origin_x: f32,
        /// World Z of the raster center.
        origin_z: f32,
        /// `width * height` native-endian `f32` values as bytes.
        buffer: Vec<u8>,
    },
    /// Noise-backed terrain.
    Procedural(ProceduralParams),
}

impl ProviderConfig {
    /// Short tag naming the provider variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dem { .. } => "dem",
            Self::Procedural(_) => "procedural",
        }
    }

    /// Rebuild a provider from this snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the snapshot is inconsistent (buffer
    /// length, dimensions, scale, or zero octaves).
    pub fn build(&self) -> Result<Box<dyn HeightProvider>, ProviderError> {
        match self {
            Self::Dem {
                width,
                height,
                meters_per_pixel,
                origin_x,
                origin_z,
                buffer,
            } => {
                let expected = width * height * std::mem::size_of::<f32>();
                if buffer.len() != expected {
                    return Err(ProviderError::ByteLength {
                        expected,
                        actual: buffer.len(),
                    });
                }
                let heights = bytemuck::pod_collect_to_vec::<u8, f32>(buffer.as_slice());
                let provider = DemHeightProvider::new(heights, *width, *height, *meters_per_pixel)?
                    .with_origin(*origin_x, *origin_z);
                Ok(Box::new(provider))
            }
            Self::Procedural(params) => {
                Ok(Box::new(ProceduralHeightProvider::new(params.clone())?))
            }
        }
    }
}
