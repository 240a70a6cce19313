//! # HTTP Terrain Provider
//!
//! Client for the external region-data endpoint:
//! `GET {base}/region?x=<int>&y=<int>&z=<int>` answering a JSON array of
//! one material code per cell.
//!
//! The provider uses a blocking client because it only ever runs on the
//! streaming worker thread, never on the render thread.

use cgmath::Point3;
use log::debug;

use super::{validate_payload, TerrainError, TerrainProvider};

/// A [`TerrainProvider`] backed by the remote region endpoint.
pub struct HttpTerrainProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTerrainProvider {
    /// Creates a provider for the endpoint at `base_url`, without a
    /// trailing slash (for example `http://localhost:6502`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl TerrainProvider for HttpTerrainProvider {
    fn fetch_region(&self, origin: Point3<i32>) -> Result<Vec<i8>, TerrainError> {
        let url = format!(
            "{}/region?x={}&y={}&z={}",
            self.base_url, origin.x, origin.y, origin.z
        );
        debug!("fetching region data from {}", url);

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(TerrainError::Status(response.status()));
        }

        let codes: Vec<i8> = response.json()?;
        validate_payload(&codes)?;
        Ok(codes)
    }
}
