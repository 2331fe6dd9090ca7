//! The text object tree.
//!
//! Text objects live in an arena owned by [`TextTree`] and are addressed by
//! generational [`ObjectId`]s. Parent and sibling links are ids into the same
//! arena, so detaching a node never leaves a dangling reference: a freed slot
//! bumps its generation and any stale id simply stops resolving.
//!
//! ```text
//!            root (Group)
//!            /          \
//!     page (Group)    page (Group)
//!         |
//!     text (Group) ── first_child ──► word ◄─► word ◄─► word
//!                                      |
//!                                    glyph ◄─► glyph
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TextError, TextResult};
use crate::property::{Property, PropertyCell, PropertyKey, PropertyMap};
use crate::spatial::Bounds;
use crate::vector::Vector3;

/// Identifier for a text object (index plus generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    #[allow(clippy::cast_possible_truncation)] // Arena indices are 32-bit
    const fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
        }
    }

    const fn index(self) -> usize {
        self.index as usize
    }

    /// The generation of the slot this id refers to.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    #[cfg(test)]
    pub(crate) const fn placeholder() -> Self {
        Self::new(u32::MAX as usize, 0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A leaf node: one rendered character or shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    text: String,
    deformed: bool,
}

impl Glyph {
    /// The character(s) this glyph renders.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether any control point has been moved away from its original.
    #[must_use]
    pub const fn is_deformed(&self) -> bool {
        self.deformed
    }

    /// Set or clear the deformed flag.
    pub fn set_deformed(&mut self, deformed: bool) {
        self.deformed = deformed;
    }
}

/// The two node variants of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Leaf with control point geometry.
    Glyph(Glyph),
    /// Internal node with an ordered list of children.
    Group,
}

/// A node in the text tree.
#[derive(Debug, Clone)]
pub struct TextObject {
    id: ObjectId,
    kind: ObjectKind,
    properties: PropertyMap,
    parent: Option<ObjectId>,
    left_sibling: Option<ObjectId>,
    right_sibling: Option<ObjectId>,
    first_child: Option<ObjectId>,
    last_child: Option<ObjectId>,
}

impl TextObject {
    fn new(id: ObjectId, kind: ObjectKind, properties: PropertyMap) -> Self {
        Self {
            id,
            kind,
            properties,
            parent: None,
            left_sibling: None,
            right_sibling: None,
            first_child: None,
            last_child: None,
        }
    }

    /// This object's id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// The node variant.
    #[must_use]
    pub const fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Whether this is a glyph.
    #[must_use]
    pub const fn is_glyph(&self) -> bool {
        matches!(self.kind, ObjectKind::Glyph(_))
    }

    /// Whether this is a group.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.kind, ObjectKind::Group)
    }

    /// Glyph data, if this is a glyph.
    #[must_use]
    pub const fn glyph(&self) -> Option<&Glyph> {
        match &self.kind {
            ObjectKind::Glyph(glyph) => Some(glyph),
            ObjectKind::Group => None,
        }
    }

    /// Mutable glyph data, if this is a glyph.
    pub fn glyph_mut(&mut self) -> Option<&mut Glyph> {
        match &mut self.kind {
            ObjectKind::Glyph(glyph) => Some(glyph),
            ObjectKind::Group => None,
        }
    }

    /// Whether this object is a deformed glyph. Groups are never deformed.
    #[must_use]
    pub fn is_deformed(&self) -> bool {
        self.glyph().is_some_and(Glyph::is_deformed)
    }

    /// Set the deformed flag of a glyph.
    ///
    /// # Errors
    ///
    /// Returns an error if this object is a group.
    pub fn set_deformed(&mut self, deformed: bool) -> TextResult<()> {
        let id = self.id;
        let glyph = self.glyph_mut().ok_or_else(|| {
            TextError::InvalidOperation(format!("{id} is a group and has no geometry"))
        })?;
        glyph.set_deformed(deformed);
        Ok(())
    }

    /// The property map.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// The mutable property map.
    pub fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    /// Parent id, `None` for the root and detached objects.
    #[must_use]
    pub const fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Previous sibling.
    #[must_use]
    pub const fn left_sibling(&self) -> Option<ObjectId> {
        self.left_sibling
    }

    /// Next sibling.
    #[must_use]
    pub const fn right_sibling(&self) -> Option<ObjectId> {
        self.right_sibling
    }

    /// First child of a group.
    #[must_use]
    pub const fn first_child(&self) -> Option<ObjectId> {
        self.first_child
    }

    /// Last child of a group.
    #[must_use]
    pub const fn last_child(&self) -> Option<ObjectId> {
        self.last_child
    }

    /// Read a boolean property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is missing or not a boolean.
    pub fn bool(&self, key: &PropertyKey) -> TextResult<bool> {
        self.properties.bool_cell(self.id, key).map(|cell| *cell.get())
    }

    /// Write a boolean property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is missing or not a boolean.
    pub fn set_bool(&mut self, key: &PropertyKey, value: bool) -> TextResult<()> {
        self.properties.bool_cell_mut(self.id, key)?.set(value);
        Ok(())
    }

    /// Read a scalar property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is missing or not a number.
    pub fn number(&self, key: &PropertyKey) -> TextResult<f64> {
        self.properties.number_cell(self.id, key).map(|cell| *cell.get())
    }

    /// Write a scalar property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is missing or not a number.
    pub fn set_number(&mut self, key: &PropertyKey, value: f64) -> TextResult<()> {
        self.properties.number_cell_mut(self.id, key)?.set(value);
        Ok(())
    }

    /// Read a vector property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is missing or not a vector.
    pub fn vector(&self, key: &PropertyKey) -> TextResult<Vector3> {
        self.properties.vector_cell(self.id, key).map(|cell| *cell.get())
    }

    /// Write a vector property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is missing or not a vector.
    pub fn set_vector(&mut self, key: &PropertyKey, value: Vector3) -> TextResult<()> {
        self.properties.vector_cell_mut(self.id, key)?.set(value);
        Ok(())
    }

    /// Position relative to the parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the position property was removed.
    pub fn position(&self) -> TextResult<Vector3> {
        self.vector(&PropertyKey::Position)
    }

    /// Set the position relative to the parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the position property was removed.
    pub fn set_position(&mut self, position: Vector3) -> TextResult<()> {
        self.set_vector(&PropertyKey::Position, position)
    }

    /// Rotation around the Z axis; zero when the property is absent.
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.number(&PropertyKey::Rotation).unwrap_or(0.0)
    }

    /// The control points of a glyph.
    ///
    /// # Errors
    ///
    /// Returns an error if the control point property is missing.
    pub fn control_points(&self) -> TextResult<&[PropertyCell<Vector3>]> {
        self.properties
            .vector_list(self.id, &PropertyKey::ControlPoints)
            .map(Vec::as_slice)
    }

    /// Mutable control points of a glyph.
    ///
    /// # Errors
    ///
    /// Returns an error if the control point property is missing.
    pub fn control_points_mut(&mut self) -> TextResult<&mut [PropertyCell<Vector3>]> {
        self.properties
            .vector_list_mut(self.id, &PropertyKey::ControlPoints)
            .map(Vec::as_mut_slice)
    }
}

/// Arena-backed tree of text objects with a permanent group at the root.
#[derive(Debug, Clone)]
pub struct TextTree {
    slots: Vec<Option<TextObject>>,
    /// Current generation per slot; bumped on free.
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: ObjectId,
}

impl Default for TextTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTree {
    /// Create a tree containing only the root group.
    #[must_use]
    pub fn new() -> Self {
        let root = ObjectId::new(0, 0);
        let mut properties = PropertyMap::new();
        properties.insert(PropertyKey::Position, Property::vector(Vector3::ZERO));
        Self {
            slots: vec![Some(TextObject::new(root, ObjectKind::Group, properties))],
            generations: vec![0],
            free_list: Vec::new(),
            root,
        }
    }

    /// The root group.
    #[must_use]
    pub const fn root(&self) -> ObjectId {
        self.root
    }

    /// Whether the id refers to a live object.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Look up an object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&TextObject> {
        if self.generations.get(id.index()) != Some(&id.generation) {
            return None;
        }
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Look up an object mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut TextObject> {
        if self.generations.get(id.index()) != Some(&id.generation) {
            return None;
        }
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Look up an object, failing if it is not alive.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::ObjectNotFound`] for stale or unknown ids.
    pub fn object(&self, id: ObjectId) -> TextResult<&TextObject> {
        self.get(id).ok_or(TextError::ObjectNotFound(id))
    }

    /// Look up an object mutably, failing if it is not alive.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::ObjectNotFound`] for stale or unknown ids.
    pub fn object_mut(&mut self, id: ObjectId) -> TextResult<&mut TextObject> {
        self.get_mut(id).ok_or(TextError::ObjectNotFound(id))
    }

    /// Number of live objects, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether the tree holds nothing but the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Iterate over all live objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TextObject> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Create a group under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a live group.
    pub fn add_group(&mut self, parent: ObjectId, position: Vector3) -> TextResult<ObjectId> {
        let mut properties = PropertyMap::new();
        properties.insert(PropertyKey::Position, Property::vector(position));
        properties.insert(PropertyKey::Rotation, Property::number(0.0));
        self.insert(parent, ObjectKind::Group, properties)
    }

    /// Create a glyph under `parent`.
    ///
    /// `control_points` are relative to the glyph's position and become the
    /// original geometry that deformation actions restore towards.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a live group.
    pub fn add_glyph(
        &mut self,
        parent: ObjectId,
        text: impl Into<String>,
        position: Vector3,
        control_points: impl IntoIterator<Item = Vector3>,
    ) -> TextResult<ObjectId> {
        let mut properties = PropertyMap::new();
        properties.insert(PropertyKey::Position, Property::vector(position));
        properties.insert(PropertyKey::Rotation, Property::number(0.0));
        properties.insert(
            PropertyKey::ControlPoints,
            Property::vector_list(control_points),
        );
        let glyph = Glyph {
            text: text.into(),
            deformed: false,
        };
        self.insert(parent, ObjectKind::Glyph(glyph), properties)
    }

    fn insert(
        &mut self,
        parent: ObjectId,
        kind: ObjectKind,
        properties: PropertyMap,
    ) -> TextResult<ObjectId> {
        if !self.object(parent)?.is_group() {
            return Err(TextError::NotAGroup(parent));
        }
        let id = self.alloc(kind, properties);
        self.attach(parent, id)?;
        Ok(id)
    }

    fn alloc(&mut self, kind: ObjectKind, properties: PropertyMap) -> ObjectId {
        if let Some(index) = self.free_list.pop() {
            let id = ObjectId::new(index, self.generations[index]);
            self.slots[index] = Some(TextObject::new(id, kind, properties));
            return id;
        }
        let id = ObjectId::new(self.slots.len(), 0);
        self.slots.push(Some(TextObject::new(id, kind, properties)));
        self.generations.push(0);
        id
    }

    /// Append a detached object as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if either object is dead, `parent` is not a group,
    /// `child` is already attached, or the attachment would create a cycle.
    pub fn attach(&mut self, parent: ObjectId, child: ObjectId) -> TextResult<()> {
        if child == self.root {
            return Err(TextError::InvalidOperation(
                "the root cannot be attached".to_string(),
            ));
        }
        if !self.object(parent)?.is_group() {
            return Err(TextError::NotAGroup(parent));
        }
        if self.object(child)?.parent.is_some() {
            return Err(TextError::InvalidOperation(format!(
                "{child} is already attached"
            )));
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) || parent == child {
            return Err(TextError::InvalidOperation(format!(
                "attaching {child} under {parent} would create a cycle"
            )));
        }

        let last = self.object(parent)?.last_child;
        match last {
            Some(last) => self.object_mut(last)?.right_sibling = Some(child),
            None => self.object_mut(parent)?.first_child = Some(child),
        }
        self.object_mut(parent)?.last_child = Some(child);

        let node = self.object_mut(child)?;
        node.parent = Some(parent);
        node.left_sibling = last;
        node.right_sibling = None;
        Ok(())
    }

    /// Unlink an object (and its subtree) from its parent. Detaching an
    /// already detached object is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error for the root or for dead ids.
    pub fn detach(&mut self, id: ObjectId) -> TextResult<()> {
        if id == self.root {
            return Err(TextError::RootRemoval);
        }
        let node = self.object(id)?;
        let (left, right) = (node.left_sibling, node.right_sibling);
        let Some(parent) = node.parent else {
            return Ok(());
        };

        match left {
            Some(left_id) => self.object_mut(left_id)?.right_sibling = right,
            None => self.object_mut(parent)?.first_child = right,
        }
        match right {
            Some(right_id) => self.object_mut(right_id)?.left_sibling = left,
            None => self.object_mut(parent)?.last_child = left,
        }

        let node = self.object_mut(id)?;
        node.parent = None;
        node.left_sibling = None;
        node.right_sibling = None;
        Ok(())
    }

    /// Detach an object and free its slot. Groups must be empty.
    ///
    /// # Errors
    ///
    /// Returns an error for the root, dead ids, or groups that still have
    /// children.
    pub fn remove(&mut self, id: ObjectId) -> TextResult<TextObject> {
        if id == self.root {
            return Err(TextError::RootRemoval);
        }
        if self.object(id)?.first_child.is_some() {
            return Err(TextError::InvalidOperation(format!(
                "{id} still has children"
            )));
        }
        self.detach(id)?;
        let index = id.index();
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_list.push(index);
        self.slots[index].take().ok_or(TextError::ObjectNotFound(id))
    }

    /// Iterate over the direct children of an object.
    #[must_use]
    pub fn children(&self, id: ObjectId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).and_then(TextObject::first_child),
        }
    }

    /// Iterate from the parent of `id` up to the root.
    pub fn ancestors(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::successors(self.get(id).and_then(TextObject::parent), |current| {
            self.get(*current).and_then(TextObject::parent)
        })
    }

    /// The subtree rooted at `id` in post-order: every descendant appears
    /// before its parent and `id` comes last.
    #[must_use]
    pub fn subtree_post_order(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        // (node, children already expanded)
        let mut stack = vec![(id, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                out.push(node);
                continue;
            }
            stack.push((node, true));
            let children: Vec<_> = self.children(node).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
        out
    }

    /// All glyphs in the subtree rooted at `id`, in document order.
    #[must_use]
    pub fn glyphs(&self, id: ObjectId) -> Vec<ObjectId> {
        self.subtree_post_order(id)
            .into_iter()
            .filter(|node| self.get(*node).is_some_and(TextObject::is_glyph))
            .collect()
    }

    /// Position in world space: the sum of positions from the root down.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` or an ancestor is dead or lacks a position.
    pub fn world_position(&self, id: ObjectId) -> TextResult<Vector3> {
        let mut position = self.object(id)?.position()?;
        for ancestor in self.ancestors(id) {
            position += self.object(ancestor)?.position()?;
        }
        Ok(position)
    }

    /// Control points of a glyph in world space, with the glyph rotation
    /// applied around its own origin. Groups have no points.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is dead or a glyph lacks control points.
    pub fn world_control_points(&self, id: ObjectId) -> TextResult<Vec<Vector3>> {
        let object = self.object(id)?;
        if object.is_group() {
            return Ok(Vec::new());
        }
        let origin = self.world_position(id)?;
        let rotation = object.rotation();
        Ok(object
            .control_points()?
            .iter()
            .map(|cell| origin + cell.get().rotate_z(rotation))
            .collect())
    }

    /// World-space bounds. A glyph without control points is bounded by its
    /// origin; a group is the union of its children, `None` when empty.
    ///
    /// # Errors
    ///
    /// Returns an error if any object in the subtree is malformed.
    pub fn world_bounds(&self, id: ObjectId) -> TextResult<Option<Bounds>> {
        let object = self.object(id)?;
        if object.is_glyph() {
            let points = self.world_control_points(id)?;
            if points.is_empty() {
                return Ok(Some(Bounds::from_point(self.world_position(id)?)));
            }
            return Ok(Bounds::from_points(&points));
        }

        let mut bounds: Option<Bounds> = None;
        for child in self.children(id) {
            if let Some(child_bounds) = self.world_bounds(child)? {
                bounds = Some(bounds.map_or(child_bounds, |b| b.union(&child_bounds)));
            }
        }
        Ok(bounds)
    }

    /// Check that every child's parent and sibling links agree with its
    /// parent's child list.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidOperation`] describing the first
    /// inconsistency found.
    pub fn validate(&self) -> TextResult<()> {
        for object in self.iter() {
            let mut previous = None;
            for child in self.children(object.id) {
                let node = self.object(child)?;
                if node.parent != Some(object.id) || node.left_sibling != previous {
                    return Err(TextError::InvalidOperation(format!(
                        "inconsistent links at {child} under {}",
                        object.id
                    )));
                }
                previous = Some(child);
            }
            if object.last_child != previous {
                return Err(TextError::InvalidOperation(format!(
                    "last child of {} does not match its child list",
                    object.id
                )));
            }
        }
        Ok(())
    }
}

/// Iterator over the direct children of a group.
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a TextTree,
    next: Option<ObjectId>,
}

impl Iterator for Children<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(TextObject::right_sibling);
        Some(current)
    }
}
