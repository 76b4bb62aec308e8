//! Seeded 2D simplex noise with fractal, ridged, and turbulence variants.
//!
//! The permutation table is shuffled with ChaCha8 seeded from the world seed,
//! so two generators built from the same seed agree bit for bit on every
//! thread and platform. All arithmetic inside a sample is plain IEEE `f64`
//! (add, multiply, floor), which keeps the output reproducible.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Octave count used when callers have no preference.
pub const DEFAULT_OCTAVES: u32 = 4;

/// Amplitude decay between octaves used when callers have no preference.
pub const DEFAULT_PERSISTENCE: f32 = 0.5;

/// Skew factor for the 2D simplex grid: `(sqrt(3) - 1) / 2`.
const F2: f64 = 0.366_025_403_784_438_6;
/// Unskew factor for the 2D simplex grid: `(3 - sqrt(3)) / 6`.
const G2: f64 = 0.211_324_865_405_187_1;
/// Scales the summed corner contributions to roughly `[-1, 1]`.
const OUTPUT_SCALE: f64 = 70.0;

/// Eight gradient directions: axes and diagonals.
const GRADIENTS: [[f64; 2]; 8] = [
    [1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [-1.0, -1.0],
    [1.0, 0.0],
    [-1.0, 0.0],
    [0.0, 1.0],
    [0.0, -1.0],
];

/// Deterministic seeded coherent-noise generator.
///
/// Owns its permutation table privately; nothing mutates it after
/// construction, so a generator can be shared by reference across threads or
/// rebuilt from the seed inside a worker.
#[derive(Clone)]
pub struct NoiseGenerator {
    seed: i64,
    /// 256-entry permutation doubled to avoid index wrapping.
    perm: [u8; 512],
}

impl NoiseGenerator {
    /// Build a generator for `seed`. Any integer is valid, including 0 and
    /// negative values.
    pub fn new(seed: i64) -> Self {
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        table.shuffle(&mut rng);

        let perm = std::array::from_fn(|i| table[i & 255]);
        Self { seed, perm }
    }

    /// The seed this generator was built from.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Base simplex noise at `(x, y)`, in `[-1, 1]`.
    pub fn noise(&self, x: f32, y: f32) -> f32 {
        self.simplex(f64::from(x), f64::from(y)).clamp(-1.0, 1.0) as f32
    }

    /// Multi-octave noise normalized by the sum of octave amplitudes.
    ///
    /// Octave `i` samples at frequency `scale * 2^i` with amplitude
    /// `persistence^i`. With `octaves == 0` the amplitude sum is zero and the
    /// result is NaN; callers that need a number must pass at least one octave.
    pub fn fractal_noise(&self, x: f32, y: f32, octaves: u32, persistence: f32, scale: f32) -> f32 {
        let mut total = 0.0_f32;
        let mut amplitude = 1.0_f32;
        let mut frequency = scale;
        let mut amplitude_sum = 0.0_f32;

        for _ in 0..octaves {
            total += self.noise(x * frequency, y * frequency) * amplitude;
            amplitude_sum += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        total / amplitude_sum
    }

    /// Ridged noise: `1 - |noise(x, y)|`, in `[0, 1]`.
    pub fn ridged_noise(&self, x: f32, y: f32) -> f32 {
        1.0 - self.noise(x, y).abs()
    }

    /// Turbulence: `|fractal_noise(x, y, octaves)|` with default persistence and unit scale.
    pub fn turbulence(&self, x: f32, y: f32, octaves: u32) -> f32 {
        self.fractal_noise(x, y, octaves, DEFAULT_PERSISTENCE, 1.0).abs()
    }

    fn simplex(&self, x: f64, y: f64) -> f64 {
        // Skew input space to find the containing simplex cell.
        let skew = (x + y) * F2;
        let i = (x + skew).floor();
        let j = (y + skew).floor();

        let unskew = (i + j) * G2;
        let x0 = x - (i - unskew);
        let y0 = y - (j - unskew);

        // Lower or upper triangle of the cell.
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;

        let gi0 = self.perm[ii + self.perm[jj] as usize];
        let gi1 = self.perm[ii + i1 + self.perm[jj + j1] as usize];
        let gi2 = self.perm[ii + 1 + self.perm[jj + 1] as usize];

        let n0 = corner(x0, y0, gi0);
        let n1 = corner(x1, y1, gi1);
        let n2 = corner(x2, y2, gi2);

        OUTPUT_SCALE * (n0 + n1 + n2)
    }
}

impl std::fmt::Debug for NoiseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseGenerator")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// Radially attenuated gradient contribution of one simplex corner.
#[inline]
fn corner(x: f64, y: f64, hash: u8) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        return 0.0;
    }
    let grad = GRADIENTS[(hash & 7) as usize];
    let t2 = t * t;
    t2 * t2 * (x * grad[0] + y * grad[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn sample_points() -> impl Iterator<Item = (f32, f32)> {
        (0..400).map(|i| {
            let t = i as f32;
            (t * 0.173 - 31.7, t * 0.291 + 12.9)
        })
    }

    #[test]
    fn test_same_seed_bit_identical() {
        for seed in [0_i64, 1, 42, -1, -987_654_321, i64::MAX, i64::MIN] {
            let a = NoiseGenerator::new(seed);
            let b = NoiseGenerator::new(seed);
            for (x, y) in sample_points() {
                assert_eq!(a.noise(x, y).to_bits(), b.noise(x, y).to_bits());
                assert_eq!(
                    a.fractal_noise(x, y, 4, 0.5, 1.0).to_bits(),
                    b.fractal_noise(x, y, 4, 0.5, 1.0).to_bits()
                );
                assert_eq!(a.ridged_noise(x, y).to_bits(), b.ridged_noise(x, y).to_bits());
                assert_eq!(a.turbulence(x, y, 4).to_bits(), b.turbulence(x, y, 4).to_bits());
            }
        }
    }

    #[test]
    fn test_different_seeds_produce_different_noise() {
        let a = NoiseGenerator::new(1);
        let b = NoiseGenerator::new(999);
        let differing = sample_points()
            .filter(|&(x, y)| (a.noise(x, y) - b.noise(x, y)).abs() > EPSILON)
            .count();
        assert!(differing > 300, "only {differing} of 400 samples differ between seeds");
    }

    #[test]
    fn test_noise_range() {
        let generator = NoiseGenerator::new(7);
        for (x, y) in sample_points() {
            let n = generator.noise(x, y);
            assert!((-1.0..=1.0).contains(&n), "noise {n} out of range at ({x}, {y})");
        }
    }

    #[test]
    fn test_noise_is_not_constant() {
        let generator = NoiseGenerator::new(3);
        let (min, max) = sample_points()
            .map(|(x, y)| generator.noise(x, y))
            .fold((f32::MAX, f32::MIN), |(lo, hi), n| (lo.min(n), hi.max(n)));
        assert!(max - min > 0.5, "noise spread too small: [{min}, {max}]");
    }

    #[test]
    fn test_ridged_identity_and_range() {
        let generator = NoiseGenerator::new(11);
        for (x, y) in sample_points() {
            let r = generator.ridged_noise(x, y);
            assert!((0.0..=1.0).contains(&r), "ridged {r} out of range");
            assert!((r - (1.0 - generator.noise(x, y).abs())).abs() < EPSILON);
        }
    }

    #[test]
    fn test_turbulence_identity_and_range() {
        let generator = NoiseGenerator::new(-5);
        for (x, y) in sample_points() {
            let t = generator.turbulence(x, y, 4);
            assert!(t >= 0.0, "turbulence {t} negative");
            assert!(t <= 1.0 + EPSILON, "turbulence {t} above 1");
            assert!((t - generator.fractal_noise(x, y, 4, 0.5, 1.0).abs()).abs() < EPSILON);
        }
    }

    #[test]
    fn test_fractal_single_octave_matches_scaled_noise() {
        let generator = NoiseGenerator::new(21);
        for (x, y) in sample_points() {
            let f = generator.fractal_noise(x, y, 1, 0.5, 3.0);
            assert_eq!(f.to_bits(), generator.noise(x * 3.0, y * 3.0).to_bits());
        }
    }

    #[test]
    fn test_fractal_is_normalized_sum() {
        let generator = NoiseGenerator::new(8);
        let (x, y) = (4.25, -9.5);
        let expected = (generator.noise(x, y)
            + generator.noise(x * 2.0, y * 2.0) * 0.5
            + generator.noise(x * 4.0, y * 4.0) * 0.25)
            / 1.75;
        let actual = generator.fractal_noise(x, y, 3, 0.5, 1.0);
        assert!((actual - expected).abs() < EPSILON, "{actual} vs {expected}");
    }

    #[test]
    fn test_zero_octaves_yields_nan() {
        let generator = NoiseGenerator::new(1);
        assert!(generator.fractal_noise(1.5, 2.5, 0, 0.5, 1.0).is_nan());
        assert!(generator.turbulence(1.5, 2.5, 0).is_nan());
    }

    #[test]
    fn test_smooth_no_discontinuities() {
        let generator = NoiseGenerator::new(42);
        let step = 0.01;
        for i in 0..10_000 {
            let x = i as f32 * step - 50.0;
            let y = (i % 97) as f32 * 0.37;
            let delta = (generator.noise(x + step, y) - generator.noise(x, y)).abs();
            assert!(delta < 0.2, "discontinuity at ({x}, {y}): delta={delta}");
        }
    }

    #[test]
    fn test_negative_coordinates_are_continuous() {
        let generator = NoiseGenerator::new(-3);
        // Straddle the origin where floor() changes sign handling.
        for i in -200..200 {
            let x = i as f32 * 0.005;
            let delta = (generator.noise(x + 0.005, 0.3) - generator.noise(x, 0.3)).abs();
            assert!(delta < 0.2, "discontinuity near origin at x={x}");
        }
    }

    #[test]
    fn test_identical_across_threads() {
        let reference: Vec<u32> = {
            let generator = NoiseGenerator::new(1234);
            sample_points()
                .map(|(x, y)| generator.fractal_noise(x, y, 5, 0.5, 0.25).to_bits())
                .collect()
        };

        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let generator = NoiseGenerator::new(1234);
                    sample_points()
                        .map(|(x, y)| generator.fractal_noise(x, y, 5, 0.5, 0.25).to_bits())
                        .collect::<Vec<u32>>()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), reference);
        }
    }
}
