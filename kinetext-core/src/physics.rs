//! Physics actions.
//!
//! Forces never move objects directly. [`apply_force`] and
//! [`apply_angular_force`] accumulate into the `Velocity` and
//! `AngularVelocity` properties; the [`Move`] integrator applies the
//! accumulated velocity to the position once per frame.

use std::collections::HashSet;

use crate::action::{Action, ActionContext, ActionResult};
use crate::error::{TextError, TextResult};
use crate::input::MouseButton;
use crate::object::{ObjectId, TextObject};
use crate::property::{Property, PropertyKey};
use crate::vector::Vector3;

/// Added to the inertia length before dividing by it.
const INERTIA_EPSILON: f64 = 0.001;

/// Properties every physics action relies on, with their initial values.
#[must_use]
pub fn physics_properties() -> Vec<(PropertyKey, Property)> {
    vec![
        (PropertyKey::Velocity, Property::vector(Vector3::ZERO)),
        (PropertyKey::AngularVelocity, Property::number(0.0)),
        (PropertyKey::Mass, Property::number(1.0)),
        (PropertyKey::Rotation, Property::number(0.0)),
    ]
}

fn mass(object: &TextObject) -> TextResult<f64> {
    let mass = object.number(&PropertyKey::Mass)?;
    if mass <= 0.0 {
        return Err(TextError::InvalidOperation(format!(
            "Object {} has non-positive mass {mass}",
            object.id()
        )));
    }
    Ok(mass)
}

/// Accumulate a force into the object's velocity, scaled by its mass.
///
/// Several calls within one frame add up.
///
/// # Errors
///
/// Returns an error if the object lacks `Velocity` or `Mass`, or its mass is
/// not positive.
pub fn apply_force(object: &mut TextObject, force: Vector3) -> TextResult<()> {
    let mass = mass(object)?;
    let velocity = object.vector(&PropertyKey::Velocity)?;
    object.set_vector(&PropertyKey::Velocity, velocity + force * (1.0 / mass))
}

/// Accumulate a torque into the object's angular velocity, scaled by its
/// mass.
///
/// # Errors
///
/// Returns an error if the object lacks `AngularVelocity` or `Mass`, or its
/// mass is not positive.
pub fn apply_angular_force(object: &mut TextObject, force: f64) -> TextResult<()> {
    let mass = mass(object)?;
    let angular = object.number(&PropertyKey::AngularVelocity)?;
    object.set_number(&PropertyKey::AngularVelocity, angular + force / mass)
}

/// Integrates velocity into position and angular velocity into rotation, then
/// decays both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    drag: f64,
    angular_drag: f64,
}

impl Default for Move {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Move {
    /// Create an integrator. Each frame velocity is multiplied by
    /// `1 - drag` and angular velocity by `1 - angular_drag`.
    #[must_use]
    pub fn new(drag: f64, angular_drag: f64) -> Self {
        Self {
            drag: drag.clamp(0.0, 1.0),
            angular_drag: angular_drag.clamp(0.0, 1.0),
        }
    }

    /// Linear drag factor.
    #[must_use]
    pub const fn drag(&self) -> f64 {
        self.drag
    }

    /// Angular drag factor.
    #[must_use]
    pub const fn angular_drag(&self) -> f64 {
        self.angular_drag
    }
}

impl Action for Move {
    fn name(&self) -> &str {
        "move"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        let object = ctx.object_mut(id)?;

        let velocity = object.vector(&PropertyKey::Velocity)?;
        let position = object.position()?;
        object.set_position(position + velocity)?;
        object.set_vector(&PropertyKey::Velocity, velocity * (1.0 - self.drag))?;

        let angular = object.number(&PropertyKey::AngularVelocity)?;
        let rotation = object.number(&PropertyKey::Rotation)?;
        object.set_number(&PropertyKey::Rotation, rotation + angular)?;
        object.set_number(
            &PropertyKey::AngularVelocity,
            angular * (1.0 - self.angular_drag),
        )?;

        Ok(ActionResult::running())
    }

    fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
        physics_properties()
    }
}

/// Applies a constant force every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    force: Vector3,
}

impl Gravity {
    /// Create a gravity action pulling with `force`.
    #[must_use]
    pub const fn new(force: Vector3) -> Self {
        Self { force }
    }

    /// The applied force.
    #[must_use]
    pub const fn force(&self) -> Vector3 {
        self.force
    }
}

impl Action for Gravity {
    fn name(&self) -> &str {
        "gravity"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        apply_force(ctx.object_mut(id)?, self.force)?;
        Ok(ActionResult::running())
    }

    fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
        physics_properties()
    }
}

/// Throws an object when a drag ends.
///
/// When the object is flagged as `Dragging` and the left button is up, the
/// last pointer displacement becomes a linear force and a heuristic torque,
/// then the flag is cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInertia {
    force_scale: f64,
}

impl Default for MouseInertia {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MouseInertia {
    /// Create with a scale applied to the pointer displacement.
    #[must_use]
    pub const fn new(force_scale: f64) -> Self {
        Self { force_scale }
    }

    /// Scale applied to the pointer displacement.
    #[must_use]
    pub const fn force_scale(&self) -> f64 {
        self.force_scale
    }

    /// Linear force and torque for a pointer displacement.
    #[must_use]
    pub fn throw(&self, delta: Vector3) -> (Vector3, f64) {
        let inertia = Vector3::xy(delta.x, delta.y) * self.force_scale;
        let length = inertia.length();
        let angle = delta.x.abs().min(delta.y.abs()) / (length + INERTIA_EPSILON) / 100.0;
        let factor = if inertia.x * inertia.y < 0.0 { -1.0 } else { 1.0 };
        (inertia, length * angle * factor)
    }
}

impl Action for MouseInertia {
    fn name(&self) -> &str {
        "mouse-inertia"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        let mouse = ctx.input.mouse();
        if mouse.is_pressed(MouseButton::Left) {
            return Ok(ActionResult::running());
        }
        let delta = mouse.delta();

        let object = ctx.object_mut(id)?;
        if !object.bool(&PropertyKey::Dragging)? {
            return Ok(ActionResult::running());
        }

        let (force, torque) = self.throw(delta);
        apply_force(object, force)?;
        apply_angular_force(object, torque)?;
        object.set_bool(&PropertyKey::Dragging, false)?;
        tracing::trace!("Threw {} with force {} and torque {:.4}", id, force, torque);

        Ok(ActionResult::running())
    }

    fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
        let mut required = physics_properties();
        required.push((PropertyKey::Dragging, Property::bool(false)));
        required
    }
}

/// Lets the pointer pick up objects and carry them.
///
/// A left press over an object's bounds grabs it and sets `Dragging`. While
/// the button stays down the object follows the pointer. Releasing drops it
/// but leaves `Dragging` set, so a following [`MouseInertia`] can throw it.
#[derive(Debug, Clone, Default)]
pub struct Drag {
    held: HashSet<ObjectId>,
}

impl Drag {
    /// Create a drag action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the object is currently held.
    #[must_use]
    pub fn is_holding(&self, id: ObjectId) -> bool {
        self.held.contains(&id)
    }
}

impl Action for Drag {
    fn name(&self) -> &str {
        "drag"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        let mouse = ctx.input.mouse();
        let position = mouse.position();
        let delta = mouse.delta();
        let pressed = mouse.is_pressed(MouseButton::Left);
        let just_pressed = mouse.was_pressed(MouseButton::Left);

        if !pressed {
            self.held.remove(&id);
            return Ok(ActionResult::running());
        }

        if just_pressed
            && ctx
                .spatial
                .bounds(id)
                .is_some_and(|bounds| bounds.contains_point(position.x, position.y))
        {
            self.held.insert(id);
            ctx.object_mut(id)?.set_bool(&PropertyKey::Dragging, true)?;
            tracing::debug!("Picked up {}", id);
            return Ok(ActionResult::event());
        }

        if self.held.contains(&id) {
            let object = ctx.object_mut(id)?;
            let current = object.position()?;
            object.set_position(current + delta)?;
        }
        Ok(ActionResult::running())
    }

    fn complete(&mut self, id: ObjectId) {
        self.held.remove(&id);
    }

    fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
        vec![(PropertyKey::Dragging, Property::bool(false))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, InputState};
    use crate::object::TextTree;
    use crate::property::PropertyMap;
    use crate::spatial::SpatialList;

    fn physics_glyph(tree: &mut TextTree) -> ObjectId {
        let root = tree.root();
        let id = tree
            .add_glyph(
                root,
                "a",
                Vector3::xy(10.0, 10.0),
                [Vector3::ZERO, Vector3::xy(8.0, 8.0)],
            )
            .expect("glyph");
        let properties: &mut PropertyMap = tree.object_mut(id).expect("glyph").properties_mut();
        for (key, default) in physics_properties() {
            properties.insert_default(key, default);
        }
        properties.insert_default(PropertyKey::Dragging, Property::bool(false));
        id
    }

    #[test]
    fn test_forces_accumulate_within_a_frame() {
        let mut tree = TextTree::new();
        let id = physics_glyph(&mut tree);
        let object = tree.object_mut(id).expect("glyph");
        object.set_number(&PropertyKey::Mass, 2.0).expect("mass");

        apply_force(object, Vector3::xy(2.0, 0.0)).expect("force");
        apply_force(object, Vector3::xy(0.0, 4.0)).expect("force");
        apply_angular_force(object, 1.0).expect("torque");

        assert_eq!(
            object.vector(&PropertyKey::Velocity).expect("velocity"),
            Vector3::xy(1.0, 2.0)
        );
        let angular = object.number(&PropertyKey::AngularVelocity).expect("angular");
        assert!((angular - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mass_is_rejected() {
        let mut tree = TextTree::new();
        let id = physics_glyph(&mut tree);
        let object = tree.object_mut(id).expect("glyph");
        object.set_number(&PropertyKey::Mass, 0.0).expect("mass");
        assert!(apply_force(object, Vector3::xy(1.0, 0.0)).is_err());
    }

    #[test]
    fn test_move_integrates_and_decays() {
        let mut tree = TextTree::new();
        let id = physics_glyph(&mut tree);
        tree.object_mut(id)
            .expect("glyph")
            .set_vector(&PropertyKey::Velocity, Vector3::xy(4.0, 0.0))
            .expect("velocity");

        let spatial = SpatialList::default();
        let input = InputState::default();
        let mut removals = Vec::new();
        let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 0, &mut removals);
        let mut action = Move::new(0.5, 0.0);
        assert_eq!(action.behave(&mut ctx, id).expect("move"), ActionResult::running());

        let object = tree.object(id).expect("glyph");
        assert_eq!(object.position().expect("position"), Vector3::xy(14.0, 10.0));
        assert_eq!(
            object.vector(&PropertyKey::Velocity).expect("velocity"),
            Vector3::xy(2.0, 0.0)
        );
    }

    #[test]
    fn test_inertia_formula() {
        let inertia = MouseInertia::new(1.0);
        let (force, torque) = inertia.throw(Vector3::xy(4.0, 3.0));
        assert_eq!(force, Vector3::xy(4.0, 3.0));
        let expected = 5.0 * (3.0 / 5.001 / 100.0);
        assert!((torque - expected).abs() < 1e-12);

        let (_, torque) = inertia.throw(Vector3::xy(-4.0, 3.0));
        assert!((torque + expected).abs() < 1e-12);

        let (force, torque) = inertia.throw(Vector3::ZERO);
        assert_eq!(force, Vector3::ZERO);
        assert!(torque.abs() < f64::EPSILON);
    }

    #[test]
    fn test_inertia_waits_for_release() {
        let mut tree = TextTree::new();
        let id = physics_glyph(&mut tree);
        tree.object_mut(id)
            .expect("glyph")
            .set_bool(&PropertyKey::Dragging, true)
            .expect("dragging");

        let spatial = SpatialList::default();
        let mut input = InputState::new();
        input.begin_frame([
            InputEvent::MouseMoved { x: 10.0, y: 10.0 },
            InputEvent::MousePressed(MouseButton::Left),
        ]);
        let mut action = MouseInertia::default();
        let mut removals = Vec::new();
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 0, &mut removals);
            action.behave(&mut ctx, id).expect("held");
        }
        assert!(tree.object(id).expect("glyph").bool(&PropertyKey::Dragging).expect("flag"));

        input.begin_frame([
            InputEvent::MouseMoved { x: 14.0, y: 13.0 },
            InputEvent::MouseReleased(MouseButton::Left),
        ]);
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 1, &mut removals);
            let result = action.behave(&mut ctx, id).expect("released");
            assert_eq!(result, ActionResult::new(false, false, false));
        }
        let object = tree.object(id).expect("glyph");
        assert!(!object.bool(&PropertyKey::Dragging).expect("flag"));
        assert_eq!(
            object.vector(&PropertyKey::Velocity).expect("velocity"),
            Vector3::xy(4.0, 3.0)
        );
    }

    #[test]
    fn test_drag_follows_pointer_after_grab() {
        let mut tree = TextTree::new();
        let id = physics_glyph(&mut tree);
        let mut spatial = SpatialList::new(16.0);
        spatial.add(&tree, id).expect("index");

        let mut input = InputState::new();
        let mut drag = Drag::new();
        let mut removals = Vec::new();

        input.begin_frame([
            InputEvent::MouseMoved { x: 12.0, y: 12.0 },
            InputEvent::MousePressed(MouseButton::Left),
        ]);
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 0, &mut removals);
            assert!(drag.behave(&mut ctx, id).expect("grab").event);
        }
        assert!(drag.is_holding(id));

        input.begin_frame([InputEvent::MouseMoved { x: 15.0, y: 11.0 }]);
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 1, &mut removals);
            drag.behave(&mut ctx, id).expect("carry");
        }
        assert_eq!(
            tree.object(id).expect("glyph").position().expect("position"),
            Vector3::xy(13.0, 9.0)
        );

        input.begin_frame([InputEvent::MouseReleased(MouseButton::Left)]);
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 2, &mut removals);
            drag.behave(&mut ctx, id).expect("drop");
        }
        assert!(!drag.is_holding(id));
        assert!(tree.object(id).expect("glyph").bool(&PropertyKey::Dragging).expect("flag"));
    }
}
