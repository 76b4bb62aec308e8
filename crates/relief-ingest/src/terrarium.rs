//! Terrarium RGB elevation packing.
//!
//! `elevation = r * 256 + g + b / 256 - 32768`, in meters. Alpha is unused.

/// Offset subtracted after unpacking so that `r = 128, g = 0, b = 0` is sea level.
pub const OFFSET: f32 = 32768.0;

/// Lowest elevation the encoding can represent.
pub const MIN_ELEVATION: f32 = -OFFSET;

/// Highest elevation the encoding can represent.
pub const MAX_ELEVATION: f32 = OFFSET - 1.0 / 256.0;

/// Decode one pixel's RGB channels into meters.
#[inline]
pub fn decode(r: u8, g: u8, b: u8) -> f32 {
    r as f32 * 256.0 + g as f32 + b as f32 / 256.0 - OFFSET
}

/// Decode an RGBA pixel, ignoring alpha.
#[inline]
pub fn decode_rgba(pixel: [u8; 4]) -> f32 {
    decode(pixel[0], pixel[1], pixel[2])
}

/// Pack an elevation into RGB channels.
///
/// Values outside the representable range are clamped and the fractional
/// part is truncated to 1/256 m. NaN encodes as sea level.
pub fn encode(elevation: f32) -> [u8; 3] {
    let elevation = if elevation.is_nan() { 0.0 } else { elevation };
    let shifted = (elevation.clamp(MIN_ELEVATION, MAX_ELEVATION) + OFFSET) as f64;
    let fixed = (shifted * 256.0).floor() as u32;
    [(fixed >> 16) as u8, (fixed >> 8) as u8, fixed as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(decode(100, 0, 0), -7168.0);
        assert_eq!(decode(128, 0, 0), 0.0);
        assert_eq!(decode(129, 0, 0), 256.0);
        assert_eq!(decode(128, 1, 128), 1.5);
    }

    #[test]
    fn test_range_extremes() {
        assert_eq!(decode(0, 0, 0), MIN_ELEVATION);
        assert_eq!(decode(255, 255, 255), MAX_ELEVATION);
    }

    #[test]
    fn test_alpha_ignored() {
        assert_eq!(decode_rgba([129, 2, 64, 0]), decode_rgba([129, 2, 64, 255]));
    }

    #[test]
    fn test_encode_inverts_decode() {
        for e in [-7168.0, -0.5, 0.0, 1.5, 256.0, 4810.25, 8848.0] {
            let [r, g, b] = encode(e);
            assert_eq!(decode(r, g, b), e, "round trip of {e}");
        }
        assert_eq!(encode(0.0), [128, 0, 0]);
    }

    #[test]
    fn test_encode_quantizes_and_clamps() {
        let [r, g, b] = encode(123.456);
        let back = decode(r, g, b);
        assert!((back - 123.456).abs() < 1.0 / 256.0, "got {back}");

        assert_eq!(encode(1.0e9), [255, 255, 255]);
        assert_eq!(encode(-1.0e9), [0, 0, 0]);
        assert_eq!(encode(f32::NAN), [128, 0, 0]);
    }
}
