//! # Terrain Module
//!
//! The terrain provider interface and its two implementations. A provider
//! hands back the raw material codes for one region volume; everything else
//! (voxel construction, grouping, culling) happens on the engine side.
//!
//! ## Wire contract
//!
//! A region volume is `32 x 32 x 32` cells. A provider returns exactly
//! [`REGION_VOLUME`] small integer codes, one per cell, enumerated with x
//! outermost, then y, then z innermost, starting at the requested origin.
//! Codes follow [`CODE_AIR`] through [`CODE_WATER`]; anything negative is
//! air and is never materialized as a voxel.
//!
//! Providers run on the streaming worker thread, so they are free to block.

use cgmath::Point3;
use thiserror::Error;

pub mod http;
pub mod noise;

pub use self::http::HttpTerrainProvider;
pub use self::noise::NoiseTerrainProvider;

/// Cells per region edge.
pub const REGION_DIMENSION: i32 = 32;
/// Half a region edge, used to recenter fetched cells around a region key.
pub const REGION_HALF: i32 = REGION_DIMENSION / 2;
/// Cells per region volume; the exact length of a region payload.
pub const REGION_VOLUME: usize =
    (REGION_DIMENSION * REGION_DIMENSION * REGION_DIMENSION) as usize;

/// Wire code for air. Negative codes are never stored.
pub const CODE_AIR: i8 = -1;
/// Wire code for dirt.
pub const CODE_DIRT: i8 = 0;
/// Wire code for grass.
pub const CODE_GRASS: i8 = 1;
/// Wire code for stone.
pub const CODE_STONE: i8 = 2;
/// Wire code for sand.
pub const CODE_SAND: i8 = 3;
/// Wire code for water.
pub const CODE_WATER: i8 = 4;

/// Errors surfaced by terrain providers.
///
/// These are transient streaming errors. The scheduler logs them, frees the
/// in-flight slot and moves on; they never abort the frame loop.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// The request could not be sent or the response body could not be
    /// read or decoded.
    #[error("region request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("region endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    /// The payload did not contain one code per cell.
    #[error("malformed region payload: expected {expected} codes, got {actual}")]
    Malformed {
        /// Number of codes a region volume requires.
        expected: usize,
        /// Number of codes actually received.
        actual: usize,
    },
}

/// Source of voxel material codes for region volumes.
///
/// `origin` is the region key center; the provider enumerates the cells
/// `origin + (x, y, z)` for each local coordinate in `0..32`. The caller
/// recenters those cells so the region spans `[center - 16, center + 16)`.
pub trait TerrainProvider: Send {
    /// Fetches the material codes for one region volume.
    fn fetch_region(&self, origin: Point3<i32>) -> Result<Vec<i8>, TerrainError>;
}

/// Validates that a payload has exactly one code per region cell.
pub fn validate_payload(codes: &[i8]) -> Result<(), TerrainError> {
    if codes.len() != REGION_VOLUME {
        return Err(TerrainError::Malformed {
            expected: REGION_VOLUME,
            actual: codes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_length_is_validated() {
        assert!(validate_payload(&vec![CODE_AIR; REGION_VOLUME]).is_ok());

        let err = validate_payload(&vec![CODE_AIR; 7]).unwrap_err();
        match err {
            TerrainError::Malformed { expected, actual } => {
                assert_eq!(expected, 32768);
                assert_eq!(actual, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
