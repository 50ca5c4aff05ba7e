//! Static-dataset data source.
//!
//! Serves parking data from a JSON file for development and demos,
//! without needing access to a live feed. The file is re-read on every
//! fetch, so edits show up on the next refresh.

use std::path::PathBuf;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;

use super::ParkingProvider;
use super::convert::format_timestamp;
use super::error::ProviderError;
use super::types::{RawObservation, parse_payload};

/// Source tag stamped on every record served from the static dataset.
pub const MOCK_SOURCE: &str = "mock-dataset";

/// Data source that serves a JSON array of records from disk.
#[derive(Debug, Clone)]
pub struct MockParkingProvider {
    data_path: PathBuf,
}

impl MockParkingProvider {
    /// Create a provider reading from `data_path`.
    ///
    /// The file is not touched until the first fetch.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    async fn load(&self) -> Result<Vec<RawObservation>, ProviderError> {
        let json = tokio::fs::read_to_string(&self.data_path)
            .await
            .map_err(|source| ProviderError::Io {
                path: self.data_path.clone(),
                source,
            })?;

        let records = parse_payload(&json, &self.data_path.display().to_string())?;

        // Every record is as fresh as the read
        let stamp = format_timestamp(Utc::now());
        Ok(records
            .into_iter()
            .map(|record| RawObservation {
                last_updated: Some(stamp.clone()),
                source: Some(MOCK_SOURCE.to_string()),
                ..record
            })
            .collect())
    }
}

impl ParkingProvider for MockParkingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawObservation>, ProviderError>> {
        self.load().boxed()
    }
}
