//! The `analysis.json` report produced by an ingestion run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::stats::TileStatistics;
use crate::tile::TileCoord;

/// File name of the report inside the output directory.
pub const REPORT_FILE_NAME: &str = "analysis.json";

/// Results of one ingestion run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Run time in seconds since the Unix epoch.
    pub analyzed: u64,
    /// Per-area results keyed by area id.
    pub areas: BTreeMap<String, AreaReport>,
}

/// Results for one area.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    /// Display name from the manifest.
    pub name: String,
    /// Per-zoom results keyed `z<N>`.
    pub zooms: BTreeMap<String, ZoomSummary>,
}

/// Results for one zoom level of one area.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomSummary {
    /// Zoom level.
    pub zoom: u32,
    /// Ground distance per pixel from the manifest.
    pub pixel_resolution_meters: f32,
    /// PNG files found.
    pub tile_count: usize,
    /// Tiles that decoded successfully.
    pub decoded_count: usize,
    /// Statistics over every decoded sample, rounded to one decimal.
    pub statistics: Option<TileStatistics>,
    /// Per-tile statistics, rounded to one decimal.
    pub tiles: Vec<TileSummary>,
    /// The merged export, when the decoded tiles formed a full square grid.
    pub merged: Option<MergedExport>,
    /// Problems that affected this zoom level without stopping the run.
    pub issues: Vec<Issue>,
}

/// Statistics for a single tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSummary {
    /// Tile file name.
    pub file: String,
    /// Grid position from the file name.
    pub coord: TileCoord,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Rounded statistics; `None` for a zero-sized tile.
    pub statistics: Option<TileStatistics>,
}

/// Reference to a merged-grid export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedExport {
    /// File name of the `.f32` grid inside the output directory.
    pub file: String,
    /// File name of the metadata sidecar.
    pub meta_file: String,
    /// Width in samples.
    pub width: u32,
    /// Height in samples.
    pub height: u32,
    /// Tiles along each axis.
    pub tiles_per_side: u32,
}

/// What kind of problem an [`Issue`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// The zoom directory listed in the manifest is absent.
    MissingZoomDir,
    /// A `.png` whose name is not `<tx>_<tz>.png`.
    BadFileName,
    /// A tile that could not be read or decoded.
    TileDecode,
    /// The decoded tiles could not be merged.
    MergeSkipped,
}

/// A recoverable problem recorded during ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Problem category.
    pub kind: IssueKind,
    /// File or directory concerned.
    pub subject: String,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    /// Create an issue.
    pub fn new(kind: IssueKind, subject: impl Into<String>, message: impl ToString) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.to_string(),
        }
    }
}

impl AnalysisReport {
    /// Empty report stamped with the current time.
    pub fn now() -> Self {
        let analyzed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            analyzed,
            areas: BTreeMap::new(),
        }
    }

    /// Every issue in the report with its area id and zoom key.
    pub fn issues(&self) -> impl Iterator<Item = (&str, &str, &Issue)> {
        self.areas.iter().flat_map(|(area, report)| {
            report.zooms.iter().flat_map(move |(zoom, summary)| {
                summary.issues.iter().map(move |issue| (area.as_str(), zoom.as_str(), issue))
            })
        })
    }

    /// Every merged export in the report with its area id.
    pub fn exports(&self) -> impl Iterator<Item = (&str, &MergedExport)> {
        self.areas.iter().flat_map(|(area, report)| {
            report
                .zooms
                .values()
                .filter_map(move |summary| summary.merged.as_ref().map(|m| (area.as_str(), m)))
        })
    }

    /// Write the report as pretty JSON to `<dir>/analysis.json`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, IngestError> {
        std::fs::create_dir_all(dir).map_err(|source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self).map_err(IngestError::Report)?;
        std::fs::write(&path, json).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
