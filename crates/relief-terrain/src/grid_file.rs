//! On-disk form of a merged elevation grid.
//!
//! A grid is stored as two files side by side:
//!
//! | File | Content |
//! |------|---------|
//! | `<stem>.f32` | `width * height` little-endian `f32` elevations, row-major |
//! | `<stem>.meta.json` | [`GridMeta`]: `{ width, height, format, byteOrder, unit }` |
//!
//! Writing the same heights twice produces byte-identical files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::provider::ProviderError;

/// Extension of the raw elevation file.
pub const GRID_EXTENSION: &str = "f32";
/// Suffix replacing the extension for the metadata sidecar.
pub const META_SUFFIX: &str = "meta.json";
/// The only sample format written.
pub const FORMAT_FLOAT32: &str = "float32";
/// The only byte order written.
pub const BYTE_ORDER_LE: &str = "little-endian";
/// Unit of the stored elevations.
pub const UNIT_METERS: &str = "meters";

/// Errors reading or writing grid files.
#[derive(Debug, thiserror::Error)]
pub enum GridFileError {
    /// Filesystem failure on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The sidecar is not valid metadata JSON.
    #[error("invalid grid metadata in {path}: {source}")]
    Meta {
        /// Sidecar path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The sidecar declares a sample format other than `float32`.
    #[error("unsupported grid format {0:?}")]
    UnsupportedFormat(String),
    /// The sidecar declares a byte order other than little-endian.
    #[error("unsupported byte order {0:?}")]
    UnsupportedByteOrder(String),
    /// The raw file length disagrees with the sidecar dimensions.
    #[error("grid file holds {actual} bytes, metadata implies {expected}")]
    SizeMismatch {
        /// Bytes implied by `width * height * 4`.
        expected: usize,
        /// Bytes on disk.
        actual: usize,
    },
    /// The heights passed for writing do not match the dimensions.
    #[error("{actual} heights do not fill a {width}x{height} grid")]
    DimensionMismatch {
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
        /// Number of heights given.
        actual: usize,
    },
    /// The loaded grid could not back a height provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Metadata sidecar describing a raw grid file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMeta {
    /// Samples per row.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Sample format tag, always `"float32"`.
    pub format: String,
    /// Byte order tag, always `"little-endian"`.
    pub byte_order: String,
    /// Elevation unit, always `"meters"`.
    pub unit: String,
}

impl GridMeta {
    /// Metadata for a little-endian float32 grid in meters.
    pub fn float32(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: FORMAT_FLOAT32.to_string(),
            byte_order: BYTE_ORDER_LE.to_string(),
            unit: UNIT_METERS.to_string(),
        }
    }

    /// Size in bytes of the raw file this metadata describes.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * std::mem::size_of::<f32>()
    }
}

/// Paths of a written grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridFiles {
    /// The `.f32` elevation file.
    pub grid_path: PathBuf,
    /// The `.meta.json` sidecar.
    pub meta_path: PathBuf,
}

/// Sidecar path for a grid file: `foo.f32` becomes `foo.meta.json`.
pub fn sidecar_path(grid_path: &Path) -> PathBuf {
    grid_path.with_extension(META_SUFFIX)
}

/// Encode heights as consecutive little-endian `f32` bytes.
pub fn encode_le(heights: &[f32]) -> Vec<u8> {
    heights.iter().flat_map(|h| h.to_le_bytes()).collect()
}

/// Decode consecutive little-endian `f32` bytes. Trailing partial values are ignored.
pub fn decode_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Write `<dir>/<stem>.f32` and `<dir>/<stem>.meta.json`.
pub fn write_grid(
    dir: &Path,
    stem: &str,
    width: u32,
    height: u32,
    heights: &[f32],
) -> Result<GridFiles, GridFileError> {
    if heights.len() != width as usize * height as usize {
        return Err(GridFileError::DimensionMismatch {
            width,
            height,
            actual: heights.len(),
        });
    }

    std::fs::create_dir_all(dir).map_err(|source| GridFileError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let grid_path = dir.join(format!("{stem}.{GRID_EXTENSION}"));
    let meta_path = sidecar_path(&grid_path);

    std::fs::write(&grid_path, encode_le(heights)).map_err(|source| GridFileError::Io {
        path: grid_path.clone(),
        source,
    })?;

    let meta = GridMeta::float32(width, height);
    let mut json = serde_json::to_string_pretty(&meta).map_err(|source| GridFileError::Meta {
        path: meta_path.clone(),
        source,
    })?;
    json.push('\n');
    std::fs::write(&meta_path, json).map_err(|source| GridFileError::Io {
        path: meta_path.clone(),
        source,
    })?;

    tracing::debug!(path = %grid_path.display(), width, height, "wrote merged grid");
    Ok(GridFiles {
        grid_path,
        meta_path,
    })
}

/// Read a grid and its sidecar, validating format, byte order, and length.
pub fn read_grid(grid_path: &Path) -> Result<(GridMeta, Vec<f32>), GridFileError> {
    let meta_path = sidecar_path(grid_path);
    let meta_text = std::fs::read_to_string(&meta_path).map_err(|source| GridFileError::Io {
        path: meta_path.clone(),
        source,
    })?;
    let meta: GridMeta =
        serde_json::from_str(&meta_text).map_err(|source| GridFileError::Meta {
            path: meta_path.clone(),
            source,
        })?;

    if meta.format != FORMAT_FLOAT32 {
        return Err(GridFileError::UnsupportedFormat(meta.format));
    }
    if meta.byte_order != BYTE_ORDER_LE {
        return Err(GridFileError::UnsupportedByteOrder(meta.byte_order));
    }

    let bytes = std::fs::read(grid_path).map_err(|source| GridFileError::Io {
        path: grid_path.to_path_buf(),
        source,
    })?;
    if bytes.len() != meta.byte_len() {
        return Err(GridFileError::SizeMismatch {
            expected: meta.byte_len(),
            actual: bytes.len(),
        });
    }

    Ok((meta, decode_le(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("out/alps-z14-merged.f32")),
            PathBuf::from("out/alps-z14-merged.meta.json")
        );
    }

    #[test]
    fn test_encode_is_little_endian() {
        assert_eq!(encode_le(&[1.0]), vec![0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(decode_le(&[0x00, 0x00, 0x80, 0x3F, 0xFF]), vec![1.0]);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let heights = vec![-7168.0, 0.0, 256.0, 1234.5, -0.25, 8848.0];
        let files = write_grid(dir.path(), "peak-z12-merged", 3, 2, &heights).unwrap();

        assert_eq!(std::fs::metadata(&files.grid_path).unwrap().len(), 24);
        let (meta, loaded) = read_grid(&files.grid_path).unwrap();
        assert_eq!(meta, GridMeta::float32(3, 2));
        assert_eq!(loaded, heights);
    }

    #[test]
    fn test_sidecar_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_grid(dir.path(), "g", 1, 1, &[5.0]).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(files.meta_path).unwrap()).unwrap();
        assert_eq!(json["width"], 1);
        assert_eq!(json["height"], 1);
        assert_eq!(json["format"], "float32");
        assert_eq!(json["byteOrder"], "little-endian");
        assert_eq!(json["unit"], "meters");
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let heights: Vec<f32> = (0..64).map(|i| i as f32 * 0.75 - 10.0).collect();
        let first = write_grid(dir.path(), "g", 8, 8, &heights).unwrap();
        let grid_a = std::fs::read(&first.grid_path).unwrap();
        let meta_a = std::fs::read(&first.meta_path).unwrap();

        let second = write_grid(dir.path(), "g", 8, 8, &heights).unwrap();
        assert_eq!(std::fs::read(second.grid_path).unwrap(), grid_a);
        assert_eq!(std::fs::read(second.meta_path).unwrap(), meta_a);
    }

    #[test]
    fn test_write_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_grid(dir.path(), "g", 2, 2, &[0.0; 3]);
        assert!(matches!(result, Err(GridFileError::DimensionMismatch { actual: 3, .. })));
    }

    #[test]
    fn test_read_detects_truncated_grid() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_grid(dir.path(), "g", 2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        std::fs::write(&files.grid_path, [0u8; 10]).unwrap();
        assert!(matches!(
            read_grid(&files.grid_path),
            Err(GridFileError::SizeMismatch {
                expected: 16,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_read_rejects_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_grid(dir.path(), "g", 1, 1, &[1.0]).unwrap();
        let mut meta = GridMeta::float32(1, 1);
        meta.format = "int16".to_string();
        std::fs::write(&files.meta_path, serde_json::to_string(&meta).unwrap()).unwrap();
        assert!(matches!(
            read_grid(&files.grid_path),
            Err(GridFileError::UnsupportedFormat(f)) if f == "int16"
        ));
    }

    #[test]
    fn test_read_missing_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.f32");
        assert!(matches!(read_grid(&path), Err(GridFileError::Io { .. })));
    }
}
