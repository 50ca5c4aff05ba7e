//! Domain types for the parking availability server.
//!
//! An [`Observation`] is one street's reported availability; a
//! [`StreetKey`] is the case-insensitive name it is looked up by.

mod error;
mod observation;
mod street;

pub use error::DomainError;
pub use observation::{Coordinates, Observation, UNKNOWN_SOURCE};
pub use street::StreetKey;
