//! Bilinear interpolation over a row-major height raster.
//!
//! Both the world-space DEM sampler and the chunk-local sampler go through
//! [`bilinear`], so a DEM-backed chunk grid agrees with direct DEM queries at
//! its vertices and neighbouring chunks meet without seams.

/// Interpolate `samples` (row-major, `width * height`) at fractional grid
/// coordinates `(gx, gz)`.
///
/// Callers clamp `gx` to `[0, width - 1]` and `gz` to `[0, height - 1]`
/// beforehand. The upper neighbour is clamped to the last row/column, so a
/// coordinate sitting exactly on the last sample returns that sample.
pub fn bilinear(samples: &[f32], width: usize, height: usize, gx: f32, gz: f32) -> f32 {
    debug_assert!(width > 0 && height > 0, "empty raster");
    debug_assert_eq!(samples.len(), width * height, "raster size mismatch");

    let x0 = (gx.floor() as usize).min(width - 1);
    let z0 = (gz.floor() as usize).min(height - 1);
    let x1 = (x0 + 1).min(width - 1);
    let z1 = (z0 + 1).min(height - 1);
    let fx = gx - x0 as f32;
    let fz = gz - z0 as f32;

    let h = |x: usize, z: usize| samples[z * width + x];

    let h0 = h(x0, z0) * (1.0 - fx) + h(x1, z0) * fx;
    let h1 = h(x0, z1) * (1.0 - fx) + h(x1, z1) * fx;
    h0 * (1.0 - fz) + h1 * fz
}
