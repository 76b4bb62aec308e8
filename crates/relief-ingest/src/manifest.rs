//! `manifest.json`: the areas and zoom levels an ingestion job covers.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Root of `manifest.json`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Areas keyed by id. The id is also the area's directory name.
    pub areas: BTreeMap<String, AreaManifest>,
}

/// One named area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaManifest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Latitude of the area center in degrees.
    pub lat: f64,
    /// Longitude of the area center in degrees.
    pub lon: f64,
    /// Zoom levels keyed `z<N>`, matching the `z<N>` tile directories.
    #[serde(default)]
    pub tiles: BTreeMap<String, ZoomManifest>,
}

/// Resolution and coverage of one zoom level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomManifest {
    /// Ground distance per pixel.
    pub pixel_resolution_meters: f32,
    /// Edge length covered, in kilometers.
    #[serde(default)]
    pub coverage_km: f32,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IngestError::MissingManifest(path.to_path_buf())
            } else {
                IngestError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&text).map_err(|source| IngestError::InvalidManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Area ids in sorted order.
    pub fn area_ids(&self) -> Vec<String> {
        self.areas.keys().cloned().collect()
    }
}

impl AreaManifest {
    /// Zoom levels this area declares, ascending, with their settings.
    ///
    /// Keys that are not `z<N>` are skipped.
    pub fn zooms(&self) -> Vec<(u32, &ZoomManifest)> {
        let mut zooms: Vec<_> = self
            .tiles
            .iter()
            .filter_map(|(key, zoom)| parse_zoom_key(key).map(|z| (z, zoom)))
            .collect();
        zooms.sort_by_key(|(z, _)| *z);
        zooms
    }
}

/// Parse a `z<N>` zoom key.
pub fn parse_zoom_key(key: &str) -> Option<u32> {
    key.strip_prefix('z')?.parse().ok()
}

/// Format a zoom level as its `z<N>` key.
pub fn zoom_key(zoom: u32) -> String {
    format!("z{zoom}")
}
