use std::path::PathBuf;

use relief_terrain::grid_file::GridFileError;
use thiserror::Error;

/// Errors that stop an ingestion run.
///
/// Problems confined to one tile or one zoom level are recorded as
/// [`Issue`](crate::Issue)s in the report instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The tiles directory does not exist.
    #[error("tiles directory not found: {0}")]
    MissingTilesDir(PathBuf),

    /// No manifest next to the tiles.
    #[error("manifest not found: {0}")]
    MissingManifest(PathBuf),

    /// The manifest is not valid JSON of the expected shape.
    #[error("invalid manifest {path}: {source}")]
    InvalidManifest {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The requested area is not in the manifest.
    #[error("unknown area {requested:?}; available areas: {}", available.join(", "))]
    UnknownArea {
        /// Area id asked for.
        requested: String,
        /// Area ids the manifest declares.
        available: Vec<String>,
    },

    /// Filesystem failure outside a single tile.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a merged grid failed.
    #[error("failed to export merged grid: {0}")]
    Export(#[from] GridFileError),

    /// Writing the analysis report failed.
    #[error("failed to serialize analysis report: {0}")]
    Report(#[source] serde_json::Error),
}
