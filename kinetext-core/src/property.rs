//! Typed properties attached to text objects.
//!
//! Every text object carries a [`PropertyMap`]: a mapping from a
//! [`PropertyKey`] to a [`Property`]. Each property is made of
//! [`PropertyCell`]s which hold both the current value, mutated every frame by
//! behaviours, and the original value captured when the property was created.
//! Deformation actions use the original value to compute restoring offsets.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TextError, TextResult};
use crate::object::ObjectId;
use crate::vector::Vector3;

/// Key identifying a property on a text object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Position relative to the parent object.
    Position,
    /// Rotation around the Z axis, in radians.
    Rotation,
    /// Linear velocity accumulated by physics actions.
    Velocity,
    /// Angular velocity accumulated by physics actions.
    AngularVelocity,
    /// Mass used to scale applied forces.
    Mass,
    /// Whether the object is being dragged by the pointer.
    Dragging,
    /// Outline control points of a glyph, relative to its position.
    ControlPoints,
    /// Application-defined property.
    Named(String),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => f.write_str("Position"),
            Self::Rotation => f.write_str("Rotation"),
            Self::Velocity => f.write_str("Velocity"),
            Self::AngularVelocity => f.write_str("AngularVelocity"),
            Self::Mass => f.write_str("Mass"),
            Self::Dragging => f.write_str("Dragging"),
            Self::ControlPoints => f.write_str("ControlPoints"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A mutable value that remembers the value it was created with.
///
/// The original is fixed at construction; only the current value changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCell<T> {
    value: T,
    original: T,
}

impl<T: Clone> PropertyCell<T> {
    /// Create a cell whose current and original values are `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            original: value.clone(),
            value,
        }
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the current value.
    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// The value captured at creation.
    #[must_use]
    pub fn original(&self) -> &T {
        &self.original
    }

    /// Restore the current value to the original.
    pub fn reset(&mut self) {
        self.value = self.original.clone();
    }
}

/// A property value: a tagged union over the supported property kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Boolean flag.
    Bool(PropertyCell<bool>),
    /// Scalar value.
    Number(PropertyCell<f64>),
    /// Vector value.
    Vector(PropertyCell<Vector3>),
    /// Ordered list of vectors, e.g. glyph control points.
    VectorList(Vec<PropertyCell<Vector3>>),
}

impl Property {
    /// Create a boolean property.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Bool(PropertyCell::new(value))
    }

    /// Create a scalar property.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(PropertyCell::new(value))
    }

    /// Create a vector property.
    #[must_use]
    pub fn vector(value: Vector3) -> Self {
        Self::Vector(PropertyCell::new(value))
    }

    /// Create a vector list property from the given points.
    #[must_use]
    pub fn vector_list(points: impl IntoIterator<Item = Vector3>) -> Self {
        Self::VectorList(points.into_iter().map(PropertyCell::new).collect())
    }

    /// Name of the property kind, for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Vector(_) => "vector",
            Self::VectorList(_) => "vector list",
        }
    }
}

/// The properties attached to one text object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: HashMap<PropertyKey, Property>,
}

macro_rules! typed_access {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty, $kind:literal) => {
        /// Typed lookup; errors if the property is absent or of another kind.
        ///
        /// # Errors
        ///
        /// Returns [`TextError::MissingProperty`] or [`TextError::PropertyType`].
        pub fn $get(&self, owner: ObjectId, key: &PropertyKey) -> TextResult<&$ty> {
            match self.entries.get(key) {
                Some(Property::$variant(cell)) => Ok(cell),
                Some(_) => Err(TextError::PropertyType {
                    object: owner,
                    key: key.clone(),
                    expected: $kind,
                }),
                None => Err(TextError::MissingProperty {
                    object: owner,
                    key: key.clone(),
                }),
            }
        }

        /// Typed mutable lookup; errors if the property is absent or of another kind.
        ///
        /// # Errors
        ///
        /// Returns [`TextError::MissingProperty`] or [`TextError::PropertyType`].
        pub fn $get_mut(&mut self, owner: ObjectId, key: &PropertyKey) -> TextResult<&mut $ty> {
            match self.entries.get_mut(key) {
                Some(Property::$variant(cell)) => Ok(cell),
                Some(_) => Err(TextError::PropertyType {
                    object: owner,
                    key: key.clone(),
                    expected: $kind,
                }),
                None => Err(TextError::MissingProperty {
                    object: owner,
                    key: key.clone(),
                }),
            }
        }
    };
}

impl PropertyMap {
    /// Create an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property, returning the previous one.
    pub fn insert(&mut self, key: PropertyKey, property: Property) -> Option<Property> {
        self.entries.insert(key, property)
    }

    /// Insert a property only if the key is absent. Returns `true` if inserted.
    pub fn insert_default(&mut self, key: PropertyKey, property: Property) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, property);
        true
    }

    /// Capability check: whether the property is present.
    #[must_use]
    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Untyped lookup.
    #[must_use]
    pub fn get(&self, key: &PropertyKey) -> Option<&Property> {
        self.entries.get(key)
    }

    /// Untyped mutable lookup.
    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut Property> {
        self.entries.get_mut(key)
    }

    /// Remove a property.
    pub fn remove(&mut self, key: &PropertyKey) -> Option<Property> {
        self.entries.remove(key)
    }

    /// Iterate over the property keys.
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.entries.keys()
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    typed_access!(bool_cell, bool_cell_mut, Bool, PropertyCell<bool>, "bool");
    typed_access!(number_cell, number_cell_mut, Number, PropertyCell<f64>, "number");
    typed_access!(vector_cell, vector_cell_mut, Vector, PropertyCell<Vector3>, "vector");
    typed_access!(
        vector_list,
        vector_list_mut,
        VectorList,
        Vec<PropertyCell<Vector3>>,
        "vector list"
    );
}
