//! Decoded elevation tiles and their grid coordinates.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::terrarium;

/// Errors loading a single tile.
#[derive(Debug, Error)]
pub enum TileError {
    /// File name is not `<tx>_<tz>.png`.
    #[error("tile file name {0:?} is not <tx>_<tz>.png")]
    BadFileName(String),
    /// The tile file could not be read.
    #[error("failed to read tile {path}: {source}")]
    Io {
        /// Tile path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The PNG data is corrupt or not a PNG.
    #[error("failed to decode tile image: {0}")]
    Decode(#[from] image::ImageError),
    /// Elevation buffer length disagrees with the dimensions.
    #[error("tile buffer holds {actual} samples, expected {width}x{height}")]
    SizeMismatch {
        /// Tile width.
        width: u32,
        /// Tile height.
        height: u32,
        /// Samples present.
        actual: usize,
    },
}

/// Tile grid position parsed from a `<tx>_<tz>.png` file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column coordinate.
    pub tx: i64,
    /// Row coordinate.
    pub tz: i64,
}

impl TileCoord {
    /// Create a tile coordinate.
    pub const fn new(tx: i64, tz: i64) -> Self {
        Self { tx, tz }
    }

    /// Parse `"<tx>_<tz>.png"`. Both parts are signed integers.
    pub fn parse_file_name(name: &str) -> Result<Self, TileError> {
        let bad = || TileError::BadFileName(name.to_string());
        let stem = name.strip_suffix(".png").ok_or_else(bad)?;
        let (tx, tz) = stem.split_once('_').ok_or_else(bad)?;
        Ok(Self {
            tx: tx.parse().map_err(|_| bad())?,
            tz: tz.parse().map_err(|_| bad())?,
        })
    }

    /// File name this coordinate is stored under.
    pub fn file_name(self) -> String {
        format!("{}_{}.png", self.tx, self.tz)
    }
}

/// One decoded raster tile.
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationTile {
    coord: TileCoord,
    width: u32,
    height: u32,
    elevations: Vec<f32>,
}

impl ElevationTile {
    /// Wrap a row-major elevation buffer of `width * height` meters.
    pub fn new(
        coord: TileCoord,
        width: u32,
        height: u32,
        elevations: Vec<f32>,
    ) -> Result<Self, TileError> {
        if elevations.len() != width as usize * height as usize {
            return Err(TileError::SizeMismatch {
                width,
                height,
                actual: elevations.len(),
            });
        }
        Ok(Self {
            coord,
            width,
            height,
            elevations,
        })
    }

    /// Decode Terrarium-encoded PNG data.
    pub fn from_png_bytes(coord: TileCoord, bytes: &[u8]) -> Result<Self, TileError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        Ok(Self::from_image(coord, &image))
    }

    /// Load `<tx>_<tz>.png`, taking the coordinate from the file name.
    pub fn load(path: &Path) -> Result<Self, TileError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TileError::BadFileName(path.display().to_string()))?;
        let coord = TileCoord::parse_file_name(name)?;
        let bytes = std::fs::read(path).map_err(|source| TileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_png_bytes(coord, &bytes)
    }

    fn from_image(coord: TileCoord, image: &RgbaImage) -> Self {
        let elevations = image.pixels().map(|p| terrarium::decode_rgba(p.0)).collect();
        Self {
            coord,
            width: image.width(),
            height: image.height(),
            elevations,
        }
    }

    /// Encode as a Terrarium PNG with opaque alpha.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, TileError> {
        let image = RgbaImage::from_fn(self.width, self.height, |x, y| {
            let e = self.elevations[(y * self.width + x) as usize];
            let [r, g, b] = terrarium::encode(e);
            Rgba([r, g, b, 255])
        });
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Grid position.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major elevations in meters.
    pub fn elevations(&self) -> &[f32] {
        &self.elevations
    }
}
