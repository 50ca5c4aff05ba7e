//! Parking observations.

use super::StreetKey;

/// Source tag used when upstream does not say where a record came from.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A `(latitude, longitude)` pair. No range validation is applied.
pub type Coordinates = (f64, f64);

/// One street's parking availability at a point in time.
///
/// `available_spots` and `total_spots` are taken as reported; upstream
/// feeds sometimes report more free spots than the street has, and that
/// is passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub street_name: String,
    pub available_spots: u32,
    pub total_spots: u32,
    pub coordinates: Coordinates,
    /// Timestamp string as reported upstream, or the ingestion time.
    pub last_updated: String,
    /// Provenance tag.
    pub source: String,
}

impl Observation {
    /// The key this observation is cached under.
    pub fn key(&self) -> StreetKey {
        StreetKey::new(&self.street_name)
    }
}
