//! # SKU Encoding
//!
//! `sku_name` is a compact `"{tier}_{capacity}"` string (e.g. `S1_5`).
//! ARM wants the structured form, so the adapter expands it on the way out
//! and flattens it on the way back.

use crate::client::models::EnvironmentSku;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// SKU strings accepted in configuration
pub const SUPPORTED_SKU_NAMES: [&str; 20] = [
    "S1_1", "S1_2", "S1_3", "S1_4", "S1_5", "S1_6", "S1_7", "S1_8", "S1_9", "S1_10", "S2_1",
    "S2_2", "S2_3", "S2_4", "S2_5", "S2_6", "S2_7", "S2_8", "S2_9", "S2_10",
];

/// Failures expanding a `sku_name`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("sku_name ({sku}) has the wrong number of parts ({parts}) after splitting on _")]
    Malformed { sku: String, parts: usize },

    #[error("sku_name {sku} has unknown sku tier {tier}")]
    UnknownTier { sku: String, tier: String },

    #[error("cannot convert sku_name {sku} capacity {capacity} to an integer")]
    InvalidCapacity { sku: String, capacity: String },
}

/// Service tier of a Standard environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkuTier {
    S1,
    S2,
}

impl SkuTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SkuTier::S1 => "S1",
            SkuTier::S2 => "S2",
        }
    }
}

impl fmt::Display for SkuTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured SKU: tier plus capacity (ingress units)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sku {
    pub tier: SkuTier,
    pub capacity: i32,
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tier, self.capacity)
    }
}

impl FromStr for Sku {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_sku(s)
    }
}

/// Expand `"{tier}_{capacity}"` into a [`Sku`]
///
/// # Errors
///
/// - [`SkuError::Malformed`] unless there are exactly two `_`-separated parts
/// - [`SkuError::UnknownTier`] if the tier is not `S1` or `S2`
/// - [`SkuError::InvalidCapacity`] if the capacity is not an integer
pub fn parse_sku(sku_name: &str) -> Result<Sku, SkuError> {
    let parts: Vec<&str> = sku_name.split('_').collect();
    let [tier, capacity] = parts.as_slice() else {
        return Err(SkuError::Malformed {
            sku: sku_name.to_string(),
            parts: parts.len(),
        });
    };

    let tier = match *tier {
        "S1" => SkuTier::S1,
        "S2" => SkuTier::S2,
        other => {
            return Err(SkuError::UnknownTier {
                sku: sku_name.to_string(),
                tier: other.to_string(),
            })
        }
    };

    let capacity = capacity
        .parse::<i32>()
        .map_err(|_parse_error| SkuError::InvalidCapacity {
            sku: sku_name.to_string(),
            capacity: (*capacity).to_string(),
        })?;

    Ok(Sku { tier, capacity })
}

/// Flatten the SKU returned by ARM back into its `sku_name` form
///
/// Returns an empty string when the SKU or its capacity is missing.
#[must_use]
pub fn format_sku(sku: Option<&EnvironmentSku>) -> String {
    match sku {
        Some(EnvironmentSku {
            name,
            capacity: Some(capacity),
        }) => format!("{name}_{capacity}"),
        _ => String::new(),
    }
}

/// Whether `sku_name` is one of [`SUPPORTED_SKU_NAMES`]
#[must_use]
pub fn is_supported_sku_name(sku_name: &str) -> bool {
    SUPPORTED_SKU_NAMES.contains(&sku_name)
}

impl From<Sku> for EnvironmentSku {
    fn from(sku: Sku) -> Self {
        Self {
            name: sku.tier.as_str().to_string(),
            capacity: Some(sku.capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sku_valid() {
        assert_eq!(
            parse_sku("S1_5").unwrap(),
            Sku {
                tier: SkuTier::S1,
                capacity: 5
            }
        );
        assert_eq!(
            parse_sku("S2_10").unwrap(),
            Sku {
                tier: SkuTier::S2,
                capacity: 10
            }
        );
    }

    #[test]
    fn test_parse_sku_wrong_part_count() {
        assert_eq!(
            parse_sku("S1"),
            Err(SkuError::Malformed {
                sku: "S1".to_string(),
                parts: 1
            })
        );
        assert!(matches!(
            parse_sku("S1_1_1"),
            Err(SkuError::Malformed { parts: 3, .. })
        ));
        assert!(matches!(
            parse_sku(""),
            Err(SkuError::Malformed { parts: 1, .. })
        ));
    }

    #[test]
    fn test_parse_sku_unknown_tier() {
        assert_eq!(
            parse_sku("S3_1"),
            Err(SkuError::UnknownTier {
                sku: "S3_1".to_string(),
                tier: "S3".to_string()
            })
        );
        // Tier matching is case sensitive
        assert!(matches!(
            parse_sku("s1_1"),
            Err(SkuError::UnknownTier { .. })
        ));
    }

    #[test]
    fn test_parse_sku_invalid_capacity() {
        assert_eq!(
            parse_sku("S1_x"),
            Err(SkuError::InvalidCapacity {
                sku: "S1_x".to_string(),
                capacity: "x".to_string()
            })
        );
        assert!(matches!(
            parse_sku("S2_"),
            Err(SkuError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_supported_sku_names_round_trip() {
        for sku_name in SUPPORTED_SKU_NAMES {
            let sku = parse_sku(sku_name).unwrap();
            assert!((1..=10).contains(&sku.capacity));
            assert_eq!(sku.to_string(), sku_name);
            assert_eq!(format_sku(Some(&EnvironmentSku::from(sku))), sku_name);
        }
    }

    #[test]
    fn test_structured_sku_round_trip() {
        for tier in [SkuTier::S1, SkuTier::S2] {
            for capacity in 1..=10 {
                let sku = Sku { tier, capacity };
                let flattened = format_sku(Some(&EnvironmentSku::from(sku)));
                assert_eq!(parse_sku(&flattened).unwrap(), sku);
            }
        }
    }

    #[test]
    fn test_format_sku_without_capacity() {
        assert_eq!(format_sku(None), "");
        let sku = EnvironmentSku {
            name: "S1".to_string(),
            capacity: None,
        };
        assert_eq!(format_sku(Some(&sku)), "");
    }

    #[test]
    fn test_is_supported_sku_name() {
        assert!(is_supported_sku_name("S1_1"));
        assert!(is_supported_sku_name("S2_10"));
        assert!(!is_supported_sku_name("S1_11"));
        assert!(!is_supported_sku_name("S1_0"));
        assert!(!is_supported_sku_name("P1_1"));
    }
}
