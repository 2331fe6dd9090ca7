//! Book configuration.

use serde::{Deserialize, Serialize};

use crate::error::TextResult;

/// Configuration for a [`Book`](crate::Book).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Cell size of the spatial index grid.
    pub spatial_cell_size: f64,
    /// Name of the page created with the book.
    pub default_page: String,
    /// Extra advance inserted between words by the text builder.
    pub word_spacing: f64,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            spatial_cell_size: 64.0,
            default_page: "Default Text Page".to_string(),
            word_spacing: 0.0,
        }
    }
}

impl BookConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> TextResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = BookConfig::from_json(r#"{"word_spacing": 4.0}"#).expect("parse");
        assert!((config.word_spacing - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.default_page, "Default Text Page");
        assert!((config.spatial_cell_size - 64.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(BookConfig::from_json("{not json").is_err());
    }
}
