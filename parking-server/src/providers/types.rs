//! Wire types shared by the data sources.

use serde::{Deserialize, Serialize};

use super::error::ProviderError;

/// One record as reported by a data source, before defaults are applied.
///
/// The static dataset and the remote API share this shape: an array of
/// these objects.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawObservation {
    pub street_name: String,
    pub available_spots: u32,
    pub total_spots: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<(f64, f64)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RawObservation {
    /// A record with only the required fields set.
    pub fn new(street_name: impl Into<String>, available_spots: u32, total_spots: u32) -> Self {
        Self {
            street_name: street_name.into(),
            available_spots,
            total_spots,
            coordinates: None,
            last_updated: None,
            source: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some((latitude, longitude));
        self
    }

    pub fn with_last_updated(mut self, last_updated: impl Into<String>) -> Self {
        self.last_updated = Some(last_updated.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Parse a JSON array of records.
pub fn parse_records(body: &str) -> Result<Vec<RawObservation>, serde_json::Error> {
    serde_json::from_str(body)
}

/// Parse a payload fetched from `origin`, naming the origin on failure.
pub(crate) fn parse_payload(body: &str, origin: &str) -> Result<Vec<RawObservation>, ProviderError> {
    parse_records(body).map_err(|e| ProviderError::Json {
        message: format!("{origin}: {e}"),
    })
}
