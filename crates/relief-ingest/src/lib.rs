//! Offline ingestion of Terrarium-encoded elevation tiles.
//!
//! Tiles are decoded, summarized, stitched into one grid per area and zoom,
//! and exported in the raw float32 format that
//! [`relief_terrain::DemHeightProvider`] loads at runtime.

mod error;
mod manifest;
mod merge;
mod pipeline;
mod report;
mod stats;
mod tile;

pub mod terrarium;

pub use error::IngestError;
pub use manifest::{AreaManifest, Manifest, ZoomManifest, parse_zoom_key, zoom_key};
pub use merge::{MergeError, MergedGrid, merge_tiles};
pub use pipeline::{IngestOptions, MANIFEST_FILE_NAME, list_tiles, run};
pub use report::{
    AnalysisReport, AreaReport, Issue, IssueKind, MergedExport, REPORT_FILE_NAME, TileSummary,
    ZoomSummary,
};
pub use stats::{HISTOGRAM_BINS, TileStatistics};
pub use tile::{ElevationTile, TileCoord, TileError};
