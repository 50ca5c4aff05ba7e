//! Street lookup keys.

use std::fmt;

/// Normalized lookup key for a street: its name, lowercased.
///
/// Keys built from a display name and keys built from a request path
/// compare equal whenever the names differ only in case, so lookups are
/// case-insensitive by construction.
///
/// # Examples
///
/// ```
/// use parking_server::domain::StreetKey;
///
/// let key = StreetKey::new("Nikiforou Theotoki");
/// assert_eq!(key.as_str(), "nikiforou theotoki");
/// assert_eq!(key, StreetKey::new("NIKIFOROU THEOTOKI"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreetKey(String);

impl StreetKey {
    /// Build the key for a street name.
    pub fn new(street_name: &str) -> Self {
        Self(street_name.to_lowercase())
    }

    /// Returns the normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StreetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreetKey({})", self.0)
    }
}

impl fmt::Display for StreetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
