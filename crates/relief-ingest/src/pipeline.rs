//! Batch ingestion: decode, analyze, merge and export every tile the manifest
//! covers.
//!
//! Expected layout:
//!
//! ```text
//! <tiles_dir>/manifest.json
//! <tiles_dir>/<area>/z<zoom>/<tx>_<tz>.png
//! ```
//!
//! Output goes to `<output_dir>/<area>-z<zoom>-merged.{f32,meta.json}` and
//! `<output_dir>/analysis.json`.

use std::path::{Path, PathBuf};

use crate::error::IngestError;
use crate::manifest::{AreaManifest, Manifest, zoom_key};
use crate::merge::merge_tiles;
use crate::report::{
    AnalysisReport, AreaReport, Issue, IssueKind, MergedExport, TileSummary, ZoomSummary,
};
use crate::stats::TileStatistics;
use crate::tile::{ElevationTile, TileError};

/// Name of the manifest inside the tiles directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Inputs for [`run`].
#[derive(Clone, Debug, PartialEq)]
pub struct IngestOptions {
    /// Root of the tile tree.
    pub tiles_dir: PathBuf,
    /// Where merged grids and the report are written.
    pub output_dir: PathBuf,
    /// Manifest location. Defaults to `<tiles_dir>/manifest.json`.
    pub manifest_path: PathBuf,
    /// Restrict the run to one area.
    pub area: Option<String>,
    /// Merge every zoom level instead of only the finest one with tiles.
    pub merge_all_zooms: bool,
}

impl IngestOptions {
    /// Options reading `<tiles_dir>/manifest.json` and covering every area.
    pub fn new(tiles_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let tiles_dir = tiles_dir.into();
        Self {
            manifest_path: tiles_dir.join(MANIFEST_FILE_NAME),
            tiles_dir,
            output_dir: output_dir.into(),
            area: None,
            merge_all_zooms: false,
        }
    }
}

/// Run a full ingestion and write `analysis.json`.
///
/// Only missing inputs, an unknown area, or output failures end the run early.
/// Tile and merge problems are recorded in the returned report.
pub fn run(options: &IngestOptions) -> Result<AnalysisReport, IngestError> {
    if !options.tiles_dir.is_dir() {
        return Err(IngestError::MissingTilesDir(options.tiles_dir.clone()));
    }
    let manifest = Manifest::load(&options.manifest_path)?;

    let selected: Vec<(&String, &AreaManifest)> = match &options.area {
        Some(id) => {
            let (key, area) =
                manifest
                    .areas
                    .get_key_value(id)
                    .ok_or_else(|| IngestError::UnknownArea {
                        requested: id.clone(),
                        available: manifest.area_ids(),
                    })?;
            vec![(key, area)]
        }
        None => manifest.areas.iter().collect(),
    };

    std::fs::create_dir_all(&options.output_dir).map_err(|source| IngestError::Io {
        path: options.output_dir.clone(),
        source,
    })?;

    tracing::info!(
        tiles_dir = %options.tiles_dir.display(),
        areas = selected.len(),
        "starting ingestion"
    );

    let mut report = AnalysisReport::now();
    for (area_id, area) in selected {
        let area_report = ingest_area(options, area_id, area)?;
        report.areas.insert(area_id.clone(), area_report);
    }

    let path = report.write(&options.output_dir)?;
    tracing::info!(
        report = %path.display(),
        exports = report.exports().count(),
        issues = report.issues().count(),
        "ingestion finished"
    );
    Ok(report)
}

fn ingest_area(
    options: &IngestOptions,
    area_id: &str,
    area: &AreaManifest,
) -> Result<AreaReport, IngestError> {
    let mut area_report = AreaReport {
        name: area.name.clone(),
        ..Default::default()
    };
    // Finest zoom with decoded tiles seen so far, merged after the loop.
    let mut pending: Option<(u32, Vec<ElevationTile>)> = None;

    for (zoom, zoom_manifest) in area.zooms() {
        let zoom_dir = options.tiles_dir.join(area_id).join(zoom_key(zoom));
        let (mut summary, tiles) = analyze_zoom(&zoom_dir, zoom);
        summary.pixel_resolution_meters = zoom_manifest.pixel_resolution_meters;

        tracing::info!(
            area = area_id,
            zoom,
            tiles = summary.tile_count,
            decoded = summary.decoded_count,
            "analyzed zoom level"
        );

        if options.merge_all_zooms {
            merge_into(&mut summary, &options.output_dir, area_id, zoom, &tiles)?;
        } else if !tiles.is_empty() {
            pending = Some((zoom, tiles));
        }
        area_report.zooms.insert(zoom_key(zoom), summary);
    }

    if let Some((zoom, tiles)) = pending
        && let Some(summary) = area_report.zooms.get_mut(&zoom_key(zoom))
    {
        merge_into(summary, &options.output_dir, area_id, zoom, &tiles)?;
    }

    Ok(area_report)
}

fn analyze_zoom(zoom_dir: &Path, zoom: u32) -> (ZoomSummary, Vec<ElevationTile>) {
    let mut summary = ZoomSummary {
        zoom,
        ..Default::default()
    };

    let paths = match list_tiles(zoom_dir) {
        Ok(paths) => paths,
        Err(err) => {
            tracing::warn!(dir = %zoom_dir.display(), error = %err, "zoom directory unavailable");
            summary.issues.push(Issue::new(
                IssueKind::MissingZoomDir,
                zoom_dir.display().to_string(),
                err,
            ));
            return (summary, Vec::new());
        }
    };
    summary.tile_count = paths.len();

    let mut tiles = Vec::with_capacity(paths.len());
    for path in paths {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match ElevationTile::load(&path) {
            Ok(tile) => {
                summary.tiles.push(TileSummary {
                    file,
                    coord: tile.coord(),
                    width: tile.width(),
                    height: tile.height(),
                    statistics: TileStatistics::compute(tile.elevations()).map(|s| s.rounded()),
                });
                tiles.push(tile);
            }
            Err(err) => {
                tracing::warn!(tile = %path.display(), error = %err, "skipping tile");
                let kind = match err {
                    TileError::BadFileName(_) => IssueKind::BadFileName,
                    _ => IssueKind::TileDecode,
                };
                summary.issues.push(Issue::new(kind, file, err));
            }
        }
    }

    summary.decoded_count = tiles.len();
    summary.statistics =
        TileStatistics::combine(tiles.iter().map(ElevationTile::elevations)).map(|s| s.rounded());
    (summary, tiles)
}

fn merge_into(
    summary: &mut ZoomSummary,
    output_dir: &Path,
    area_id: &str,
    zoom: u32,
    tiles: &[ElevationTile],
) -> Result<(), IngestError> {
    if tiles.is_empty() {
        return Ok(());
    }
    match merge_tiles(area_id, zoom, tiles) {
        Ok(grid) => {
            let files = grid.export(output_dir)?;
            tracing::info!(
                area = area_id,
                zoom,
                width = grid.width,
                height = grid.height,
                file = %files.grid_path.display(),
                "exported merged grid"
            );
            summary.merged = Some(MergedExport {
                file: file_name(&files.grid_path),
                meta_file: file_name(&files.meta_path),
                width: grid.width,
                height: grid.height,
                tiles_per_side: grid.tiles_per_side,
            });
        }
        Err(err) => {
            tracing::warn!(area = area_id, zoom, error = %err, "merge skipped");
            summary
                .issues
                .push(Issue::new(IssueKind::MergeSkipped, zoom_key(zoom), err));
        }
    }
    Ok(())
}

/// `.png` files directly inside `dir`, sorted by file name.
pub fn list_tiles(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "png") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileCoord;

    fn write_tile(dir: &Path, tx: i64, tz: i64, side: u32, value: f32) {
        std::fs::create_dir_all(dir).unwrap();
        let tile = ElevationTile::new(
            TileCoord::new(tx, tz),
            side,
            side,
            vec![value; (side * side) as usize],
        )
        .unwrap();
        std::fs::write(dir.join(tile.coord().file_name()), tile.to_png_bytes().unwrap()).unwrap();
    }

    fn write_manifest(tiles_dir: &Path, json: &str) {
        std::fs::create_dir_all(tiles_dir).unwrap();
        std::fs::write(tiles_dir.join(MANIFEST_FILE_NAME), json).unwrap();
    }

    const TWO_ZOOMS: &str = r#"{ "areas": { "peak": { "name": "Peak", "lat": 1.0, "lon": 2.0,
        "tiles": { "z12": { "pixelResolutionMeters": 38.2, "coverageKm": 9.8 },
                   "z13": { "pixelResolutionMeters": 19.1, "coverageKm": 4.9 } } } } }"#;

    #[test]
    fn test_missing_tiles_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = IngestOptions::new(dir.path().join("nope"), dir.path().join("out"));
        assert!(matches!(run(&options), Err(IngestError::MissingTilesDir(_))));
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = IngestOptions::new(dir.path(), dir.path().join("out"));
        assert!(matches!(run(&options), Err(IngestError::MissingManifest(_))));
    }

    #[test]
    fn test_unknown_area_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        write_manifest(&tiles, TWO_ZOOMS);
        let mut options = IngestOptions::new(&tiles, dir.path().join("out"));
        options.area = Some("valley".into());

        match run(&options) {
            Err(IngestError::UnknownArea { requested, available }) => {
                assert_eq!(requested, "valley");
                assert_eq!(available, vec!["peak"]);
            }
            other => panic!("expected UnknownArea, got {other:?}"),
        }
    }

    #[test]
    fn test_merges_finest_zoom_only() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        let out = dir.path().join("out");
        write_manifest(&tiles, TWO_ZOOMS);
        write_tile(&tiles.join("peak/z12"), 0, 0, 4, 10.0);
        for (tx, tz) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            write_tile(&tiles.join("peak/z13"), tx, tz, 4, 20.0);
        }

        let report = run(&IngestOptions::new(&tiles, &out)).unwrap();
        let zooms = &report.areas["peak"].zooms;
        assert!(zooms["z12"].merged.is_none(), "coarser zoom should not be merged");
        let merged = zooms["z13"].merged.as_ref().unwrap();
        assert_eq!((merged.width, merged.height), (8, 8));
        assert!(out.join("peak-z13-merged.f32").is_file());
        assert!(!out.join("peak-z12-merged.f32").exists());
        assert!(out.join("analysis.json").is_file());
        assert!((zooms["z13"].pixel_resolution_meters - 19.1).abs() < 1e-4);
    }

    #[test]
    fn test_merge_all_zooms() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        let out = dir.path().join("out");
        write_manifest(&tiles, TWO_ZOOMS);
        write_tile(&tiles.join("peak/z12"), 0, 0, 4, 10.0);
        write_tile(&tiles.join("peak/z13"), 5, 5, 4, 20.0);

        let mut options = IngestOptions::new(&tiles, &out);
        options.merge_all_zooms = true;
        let report = run(&options).unwrap();
        assert_eq!(report.exports().count(), 2);
    }

    #[test]
    fn test_bad_tiles_become_issues() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        let z13 = tiles.join("peak/z13");
        write_manifest(&tiles, TWO_ZOOMS);
        write_tile(&z13, 0, 0, 4, 1.0);
        write_tile(&z13, 1, 0, 4, 1.0);
        write_tile(&z13, 0, 1, 4, 1.0);
        std::fs::write(z13.join("1_1.png"), b"garbage").unwrap();
        std::fs::write(z13.join("preview.png"), b"garbage").unwrap();

        let report = run(&IngestOptions::new(&tiles, dir.path().join("out"))).unwrap();
        let summary = &report.areas["peak"].zooms["z13"];
        assert_eq!(summary.tile_count, 5);
        assert_eq!(summary.decoded_count, 3);
        assert!(summary.merged.is_none(), "three tiles are not a square grid");

        let kinds: Vec<IssueKind> = summary.issues.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&IssueKind::TileDecode));
        assert!(kinds.contains(&IssueKind::BadFileName));
        assert!(kinds.contains(&IssueKind::MergeSkipped));

        let z12 = &report.areas["peak"].zooms["z12"];
        assert_eq!(z12.issues[0].kind, IssueKind::MissingZoomDir);
    }

    #[test]
    fn test_aggregate_statistics_cover_all_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        write_manifest(&tiles, TWO_ZOOMS);
        write_tile(&tiles.join("peak/z13"), 0, 0, 2, -5.0);
        write_tile(&tiles.join("peak/z13"), 0, 1, 2, 15.0);

        let report = run(&IngestOptions::new(&tiles, dir.path().join("out"))).unwrap();
        let stats = report.areas["peak"].zooms["z13"].statistics.clone().unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.min, -5.0);
        assert_eq!(stats.max, 15.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.water_fraction, 0.5);
    }

    #[test]
    fn test_list_tiles_sorted_png_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2_0.png", "10_0.png", "notes.txt", "1_0.PNG"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();
        let names: Vec<String> = list_tiles(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["10_0.png", "2_0.png"]);
    }
}
