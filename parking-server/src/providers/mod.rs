//! Parking data sources.
//!
//! A data source produces, on demand, the full list of current
//! observations. The refresh service only sees the [`ParkingProvider`]
//! trait; two implementations ship:
//!
//! - [`MockParkingProvider`] reads a static JSON dataset from disk
//! - [`RemoteParkingProvider`] fetches from an upstream HTTP API

mod convert;
mod error;
mod mock;
mod remote;
mod types;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::ProviderSettings;

pub use convert::{convert_records, format_timestamp};
pub use error::ProviderError;
pub use mock::{MOCK_SOURCE, MockParkingProvider};
pub use remote::{DEFAULT_TIMEOUT_SECS, RemoteConfig, RemoteParkingProvider};
pub use types::{RawObservation, parse_records};

/// Trait for fetching the current parking observations.
///
/// This abstraction allows the refresh service to be driven by any
/// backend, and tested with scripted data.
pub trait ParkingProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch every current record.
    ///
    /// Returns the complete list or an error, never a partial list.
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawObservation>, ProviderError>>;
}

/// Build the data source selected by configuration.
pub fn from_settings(
    settings: &ProviderSettings,
) -> Result<Arc<dyn ParkingProvider>, ProviderError> {
    match settings {
        ProviderSettings::Mock { data_path } => {
            Ok(Arc::new(MockParkingProvider::new(data_path.clone())))
        }
        ProviderSettings::Remote {
            base_url,
            api_key,
            timeout_secs,
        } => {
            let mut config = RemoteConfig::new(base_url.clone()).with_timeout(*timeout_secs);
            if let Some(key) = api_key {
                config = config.with_api_key(key.clone());
            }
            Ok(Arc::new(RemoteParkingProvider::new(config)?))
        }
    }
}
