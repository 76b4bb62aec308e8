//! Runtime terrain height sources: seeded coherent noise, DEM raster sampling,
//! per-chunk height grids, and background chunk height generation.

mod async_generation;
mod bilinear;
mod chunk_heights;
mod dem;
mod noise;
mod procedural;
mod provider;

pub mod grid_file;

pub use async_generation::{AsyncHeightGenerator, GeneratedHeights, GenerationError, HeightTask};
pub use bilinear::bilinear;
pub use chunk_heights::{
    ChunkCoord, ChunkHeightGrid, height_at_local, height_at_world, lattice_coordinate,
};
pub use dem::{DemHeightProvider, EDGE_EPSILON};
pub use noise::{DEFAULT_OCTAVES, DEFAULT_PERSISTENCE, NoiseGenerator};
pub use procedural::{ProceduralHeightProvider, ProceduralParams};
pub use provider::{HeightProvider, ProviderConfig, ProviderError};
