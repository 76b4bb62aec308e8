//! Per-tile elevation statistics for ingestion diagnostics.

use serde::{Deserialize, Serialize};

/// Number of equal-width histogram bins over `[min, max]`.
pub const HISTOGRAM_BINS: usize = 20;

/// Aggregate statistics over a decoded elevation buffer.
///
/// Samples at or below zero count as water.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileStatistics {
    /// Number of samples.
    pub count: usize,
    /// Lowest elevation.
    pub min: f32,
    /// Highest elevation.
    pub max: f32,
    /// Arithmetic mean.
    pub mean: f32,
    /// Population standard deviation.
    pub stddev: f32,
    /// Sample counts per bin, lowest elevations first.
    pub histogram: [u32; HISTOGRAM_BINS],
    /// Share of samples at or below sea level, in `[0, 1]`.
    pub water_fraction: f32,
}

impl TileStatistics {
    /// Compute statistics over `elevations`. Returns `None` for an empty buffer.
    pub fn compute(elevations: &[f32]) -> Option<Self> {
        if elevations.is_empty() {
            return None;
        }

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0_f64;
        let mut water = 0usize;
        for &e in elevations {
            min = min.min(e);
            max = max.max(e);
            sum += e as f64;
            if e <= 0.0 {
                water += 1;
            }
        }

        let count = elevations.len();
        let mean = sum / count as f64;
        let variance = elevations
            .iter()
            .map(|&e| {
                let d = e as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        // Flat tiles put every sample in bin 0.
        let range = if max - min == 0.0 { 1.0 } else { max - min };
        let mut histogram = [0u32; HISTOGRAM_BINS];
        for &e in elevations {
            let bin = ((e - min) / range * HISTOGRAM_BINS as f32).floor();
            let bin = (bin.max(0.0) as usize).min(HISTOGRAM_BINS - 1);
            histogram[bin] += 1;
        }

        Some(Self {
            count,
            min,
            max,
            mean: mean as f32,
            stddev: variance.sqrt() as f32,
            histogram,
            water_fraction: (water as f64 / count as f64) as f32,
        })
    }

    /// Statistics over several buffers taken together, e.g. every tile of a zoom level.
    pub fn combine<'a>(tiles: impl IntoIterator<Item = &'a [f32]>) -> Option<Self> {
        let all: Vec<f32> = tiles.into_iter().flatten().copied().collect();
        Self::compute(&all)
    }

    /// Copy with every real-valued field rounded to one decimal place.
    ///
    /// For reports only; merged exports always use the raw elevations.
    pub fn rounded(&self) -> Self {
        Self {
            min: round1(self.min),
            max: round1(self.max),
            mean: round1(self.mean),
            stddev: round1(self.stddev),
            water_fraction: round1(self.water_fraction),
            ..self.clone()
        }
    }
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}
