//! Domain error types.
//!
//! These errors represent records that cannot become an [`Observation`].
//! They are distinct from fetch/IO errors.
//!
//! [`Observation`]: super::Observation

/// Domain-level errors for ingesting upstream records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Record has an empty or whitespace-only street name
    #[error("record {index} has an empty street name")]
    EmptyStreetName { index: usize },
}
