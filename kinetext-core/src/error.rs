//! Error types for text object operations.

use thiserror::Error;

use crate::object::ObjectId;
use crate::property::PropertyKey;

/// Result type for text object operations.
pub type TextResult<T> = Result<T, TextError>;

/// Errors that can occur while mutating or simulating the text tree.
#[derive(Debug, Error)]
pub enum TextError {
    /// Object is not (or no longer) part of the tree.
    #[error("Text object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Operation required a group but got a glyph.
    #[error("Text object is not a group: {0}")]
    NotAGroup(ObjectId),

    /// An action ran on an object lacking a property it declared as required.
    #[error("Text object {object} is missing required property {key}")]
    MissingProperty {
        /// The object that was acted on.
        object: ObjectId,
        /// The property that was expected.
        key: PropertyKey,
    },

    /// A property exists but holds a different kind of value.
    #[error("Property {key} on {object} is not a {expected} property")]
    PropertyType {
        /// The object holding the property.
        object: ObjectId,
        /// The property key.
        key: PropertyKey,
        /// The kind of property the caller expected.
        expected: &'static str,
    },

    /// The scene root cannot be detached or removed.
    #[error("The scene root cannot be removed")]
    RootRemoval,

    /// Invalid tree or book operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Rendering a page failed.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Configuration serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
