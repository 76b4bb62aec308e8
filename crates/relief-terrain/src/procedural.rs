//! Noise-backed height source.
//!
//! Composites octaves of [`NoiseGenerator`] fractal noise into terrain
//! heights around a base elevation, giving the chunk system a stand-in when
//! no real-world raster covers an area.

use serde::{Deserialize, Serialize};

use crate::noise::NoiseGenerator;
use crate::provider::{HeightProvider, ProviderConfig, ProviderError};

/// Configuration for procedural terrain heights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProceduralParams {
    /// World seed for deterministic generation.
    pub seed: i64,
    /// Number of noise octaves to composite. Must be at least 1.
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves. Default: 0.5.
    pub persistence: f32,
    /// Frequency of the first octave in cycles per world unit.
    /// Default: 1/512 (one broad feature every ~512 m).
    pub frequency: f32,
    /// Height swing above and below `base_height`, in meters. Default: 120.
    pub amplitude: f32,
    /// Elevation the noise oscillates around, in meters.
    pub base_height: f32,
}

impl Default for ProceduralParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            persistence: 0.5,
            frequency: 1.0 / 512.0,
            amplitude: 120.0,
            base_height: 0.0,
        }
    }
}

/// Height source computing `base_height + amplitude * fractal_noise(...)`.
///
/// Because the fractal sum is normalized, heights stay within
/// `base_height ± amplitude`.
#[derive(Debug)]
pub struct ProceduralHeightProvider {
    noise: NoiseGenerator,
    params: ProceduralParams,
}

impl ProceduralHeightProvider {
    /// Create a provider from the given parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ZeroOctaves`] when `params.octaves == 0`,
    /// which would otherwise yield NaN heights.
    pub fn new(params: ProceduralParams) -> Result<Self, ProviderError> {
        if params.octaves == 0 {
            return Err(ProviderError::ZeroOctaves);
        }
        Ok(Self {
            noise: NoiseGenerator::new(params.seed),
            params,
        })
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &ProceduralParams {
        &self.params
    }

    /// The underlying noise generator.
    pub fn noise(&self) -> &NoiseGenerator {
        &self.noise
    }
}

impl HeightProvider for ProceduralHeightProvider {
    fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let n = self.noise.fractal_noise(
            world_x * self.params.frequency,
            world_z * self.params.frequency,
            self.params.octaves,
            self.params.persistence,
            1.0,
        );
        self.params.base_height + self.params.amplitude * n
    }

    fn config(&self) -> ProviderConfig {
        ProviderConfig::Procedural(self.params.clone())
    }
}
