//! Azure region normalization.
//!
//! ARM reports regions in display form ("West Europe") while users often
//! write the short form ("westeurope"); both must compare equal.

/// Lowercase the region name and drop all whitespace
#[must_use]
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case and whitespace insensitive region comparison
#[must_use]
pub fn locations_equal(a: &str, b: &str) -> bool {
    normalize_location(a) == normalize_location(b)
}
