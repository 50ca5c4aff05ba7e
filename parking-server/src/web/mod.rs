//! Web layer for the parking availability server.
//!
//! Provides read-only JSON endpoints over the cached observations.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
