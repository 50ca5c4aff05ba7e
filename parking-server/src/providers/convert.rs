//! Conversion from wire records to domain observations.
//!
//! This is where the ingestion defaults live: a record without a
//! timestamp is stamped with the ingestion time, a record without a
//! source is tagged `"unknown"`, and a record without coordinates is
//! placed at `(0.0, 0.0)`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{DomainError, Observation, UNKNOWN_SOURCE};

use super::types::RawObservation;

/// Format a timestamp the way ingestion-time defaults are written.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert one fetch's records into observations.
///
/// Fails on the first invalid record; a fetch is applied whole or not
/// at all.
pub fn convert_records(
    records: Vec<RawObservation>,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<Observation>, DomainError> {
    let stamp = format_timestamp(ingested_at);
    records
        .into_iter()
        .enumerate()
        .map(|(index, raw)| convert_record(raw, index, &stamp))
        .collect()
}

fn convert_record(
    raw: RawObservation,
    index: usize,
    stamp: &str,
) -> Result<Observation, DomainError> {
    if raw.street_name.trim().is_empty() {
        return Err(DomainError::EmptyStreetName { index });
    }

    Ok(Observation {
        street_name: raw.street_name,
        available_spots: raw.available_spots,
        total_spots: raw.total_spots,
        coordinates: raw.coordinates.unwrap_or((0.0, 0.0)),
        last_updated: raw
            .last_updated
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| stamp.to_string()),
        source: raw
            .source
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
    })
}
