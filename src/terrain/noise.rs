//! # Noise Terrain Provider
//!
//! Deterministic heightmap terrain built from two layered coherent-noise
//! octaves: a low-frequency base shape plus a higher-frequency detail
//! layer. Each voxel column is classified against the combined terrain
//! height, a fixed sea level and a fixed dirt-layer depth.
//!
//! This provider needs no network and is the default for offline runs and
//! tests.

use cgmath::Point3;
use noise::{NoiseFn, Perlin};

use super::{
    TerrainError, TerrainProvider, CODE_AIR, CODE_DIRT, CODE_GRASS, CODE_SAND, CODE_STONE,
    CODE_WATER, REGION_DIMENSION, REGION_VOLUME,
};

/// Frequency of the base terrain octave.
const BASE_FREQUENCY: f64 = 0.01;
/// Amplitude of the base terrain octave.
const BASE_AMPLITUDE: f64 = 20.0;
/// Frequency of the detail octave, higher for smaller features.
const DETAIL_FREQUENCY: f64 = 0.05;
/// Amplitude of the detail octave.
const DETAIL_AMPLITUDE: f64 = 5.0;
/// Y plane at which the detail octave samples the 3D noise, offset so it
/// decorrelates from the base octave.
const DETAIL_NOISE_PLANE: f64 = 100.0;

/// World height of the water surface.
const SEA_LEVEL: i32 = 0;
/// Thickness of the dirt layer under the grass surface.
const DIRT_DEPTH: f64 = 4.0;
/// Lowest height at which shorelines turn to sand.
const SAND_TRANSITION_START: i32 = SEA_LEVEL - 2;
/// Highest height at which shorelines turn to sand.
const SAND_TRANSITION_END: i32 = SEA_LEVEL + 1;

/// A [`TerrainProvider`] producing classified heightmap terrain from
/// coherent noise. The same seed always yields the same world.
pub struct NoiseTerrainProvider {
    noise: Perlin,
}

impl NoiseTerrainProvider {
    /// Creates a provider for the given world seed.
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
        }
    }

    fn base_height(&self, x: i32, z: i32) -> f64 {
        let sample = self.noise.get([
            x as f64 * BASE_FREQUENCY,
            0.0,
            z as f64 * BASE_FREQUENCY,
        ]);
        sample * BASE_AMPLITUDE
    }

    fn detail_height(&self, x: i32, z: i32) -> f64 {
        let sample = self.noise.get([
            x as f64 * DETAIL_FREQUENCY,
            DETAIL_NOISE_PLANE,
            z as f64 * DETAIL_FREQUENCY,
        ]);
        sample * DETAIL_AMPLITUDE
    }

    /// Classifies one voxel against the combined terrain height.
    fn classify(y: i32, base_height: f64, detail_height: f64) -> i8 {
        let total_height = base_height + detail_height;
        let y_f = y as f64;

        // Stone fills everything below the dirt layer.
        if y_f < total_height - DIRT_DEPTH {
            return CODE_STONE;
        }

        // Water wherever the terrain dips below sea level.
        if y <= SEA_LEVEL && y_f > total_height {
            return CODE_WATER;
        }

        // Shoreline band: sand just under the surface, shallow water above.
        if y >= SAND_TRANSITION_START && y <= SAND_TRANSITION_END {
            if y_f > total_height {
                return CODE_WATER;
            } else if y_f >= total_height - 1.0 {
                return CODE_SAND;
            }
        }

        if y == total_height.floor() as i32 {
            return CODE_GRASS;
        }

        if y_f > total_height - DIRT_DEPTH && y_f < total_height {
            return CODE_DIRT;
        }

        CODE_AIR
    }
}

impl TerrainProvider for NoiseTerrainProvider {
    fn fetch_region(&self, origin: Point3<i32>) -> Result<Vec<i8>, TerrainError> {
        let mut codes = Vec::with_capacity(REGION_VOLUME);

        for x in 0..REGION_DIMENSION {
            for y in 0..REGION_DIMENSION {
                for z in 0..REGION_DIMENSION {
                    let global_x = origin.x + x;
                    let global_y = origin.y + y;
                    let global_z = origin.z + z;

                    let base = self.base_height(global_x, global_z);
                    let detail = self.detail_height(global_x, global_z);
                    codes.push(Self::classify(global_y, base, detail));
                }
            }
        }

        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_covers_the_full_region_volume() {
        let provider = NoiseTerrainProvider::new(0);
        let codes = provider.fetch_region(Point3::new(0, 0, 0)).unwrap();

        assert_eq!(codes.len(), REGION_VOLUME);
    }

    #[test]
    fn same_seed_and_origin_are_deterministic() {
        let a = NoiseTerrainProvider::new(7)
            .fetch_region(Point3::new(32, -32, 64))
            .unwrap();
        let b = NoiseTerrainProvider::new(7)
            .fetch_region(Point3::new(32, -32, 64))
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn deep_voxels_are_stone() {
        // Combined height is bounded by the two octave amplitudes, so far
        // enough down everything must classify as stone.
        assert_eq!(NoiseTerrainProvider::classify(-100, 10.0, 3.0), CODE_STONE);
        assert_eq!(NoiseTerrainProvider::classify(-100, -20.0, -5.0), CODE_STONE);
    }

    #[test]
    fn high_voxels_are_air() {
        assert_eq!(NoiseTerrainProvider::classify(100, 10.0, 3.0), CODE_AIR);
    }

    #[test]
    fn submerged_columns_fill_with_water() {
        // Terrain bottoms out at -15; the column between terrain and sea
        // level is water.
        assert_eq!(NoiseTerrainProvider::classify(-4, -10.0, -5.0), CODE_WATER);
    }

    #[test]
    fn surface_voxel_is_grass_above_the_shoreline() {
        // Terrain height 10.4 is well above the sand band.
        assert_eq!(NoiseTerrainProvider::classify(10, 8.0, 2.4), CODE_GRASS);
        assert_eq!(NoiseTerrainProvider::classify(8, 8.0, 2.4), CODE_DIRT);
    }

    #[test]
    fn shoreline_surface_is_sand() {
        // Terrain height 0.5 puts the surface inside the transition band.
        assert_eq!(NoiseTerrainProvider::classify(0, 0.5, 0.0), CODE_SAND);
    }
}
