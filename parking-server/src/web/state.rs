//! Application state for the web layer.

use std::sync::Arc;

use crate::service::ParkingService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Parking availability service; handlers only read from it
    pub parking: Arc<ParkingService>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(parking: Arc<ParkingService>) -> Self {
        Self { parking }
    }
}
