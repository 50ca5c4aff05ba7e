//! Data transfer objects for web responses.

use serde::{Deserialize, Serialize};

use crate::domain::Observation;

/// Landing endpoint payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct LandingResponse {
    pub message: String,
}

/// Health check payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One street's availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationResponse {
    /// Street name as reported upstream
    pub street_name: String,

    /// Free spots
    pub available_spots: u32,

    /// Spots on the street
    pub total_spots: u32,

    /// `[latitude, longitude]`
    pub coordinates: (f64, f64),

    /// When the data was last updated
    pub last_updated: String,

    /// Where the data came from
    pub source: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl From<Observation> for ObservationResponse {
    fn from(obs: Observation) -> Self {
        Self {
            street_name: obs.street_name,
            available_spots: obs.available_spots,
            total_spots: obs.total_spots,
            coordinates: obs.coordinates,
            last_updated: obs.last_updated,
            source: obs.source,
        }
    }
}
