//! Deformation actions that bend glyph outlines and relax them back.
//!
//! A deformation works on the control points of glyphs. Applied to a group it
//! works on every glyph below the group.

use crate::action::{Action, ActionContext, ActionResult};
use crate::error::TextResult;
use crate::input::MouseButton;
use crate::object::{ObjectId, TextObject};
use crate::vector::Vector3;

/// Offsets shorter than this are left alone.
const SETTLED_DISTANCE: f64 = 0.1;
/// Offsets at least this long keep the glyph reforming.
const REFORMING_DISTANCE: f64 = 0.8;

/// Default fraction of the offset recovered per frame in linear style.
pub const DEFAULT_LINEAR_SPEED: f64 = 0.05;
/// Default distance scale of the exponential style.
pub const DEFAULT_EXPONENTIAL_SPEED: f64 = 2000.0;

/// How quickly a control point moves back to its original position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReformStyle {
    /// Recover a fixed fraction of the offset every frame. Smaller is slower.
    Linear {
        /// Fraction of the offset recovered per frame.
        speed: f64,
    },
    /// Recover `1 - e^(-|offset| / speed)` of the offset every frame, so
    /// distant points snap back faster. Smaller is faster.
    Exponential {
        /// Distance scale.
        speed: f64,
    },
}

impl Default for ReformStyle {
    fn default() -> Self {
        Self::Linear {
            speed: DEFAULT_LINEAR_SPEED,
        }
    }
}

impl ReformStyle {
    fn factor(self, distance: f64) -> f64 {
        match self {
            Self::Linear { speed } => speed,
            Self::Exponential { speed } => 1.0 - (-distance / speed).exp(),
        }
    }
}

/// Restores deformed glyphs to their original outline.
///
/// Every frame, each control point at least 0.8 from its original position
/// moves part of the way back. Once no point is that far away the glyph is
/// marked as no longer deformed. Points closer than that are left where they
/// are.
///
/// The action never completes. It reports an event every frame on which the
/// glyph is not deformed, including the frame on which reforming finishes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reform {
    style: ReformStyle,
}

impl Reform {
    /// Linear reform with the default speed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear reform recovering `speed` of the offset per frame.
    #[must_use]
    pub const fn linear(speed: f64) -> Self {
        Self {
            style: ReformStyle::Linear { speed },
        }
    }

    /// Exponential reform with distance scale `speed`.
    #[must_use]
    pub const fn exponential(speed: f64) -> Self {
        Self {
            style: ReformStyle::Exponential { speed },
        }
    }

    /// Current style.
    #[must_use]
    pub const fn style(&self) -> ReformStyle {
        self.style
    }

    /// Change the style.
    pub fn set_style(&mut self, style: ReformStyle) {
        self.style = style;
    }

    fn reform_glyph(&self, object: &mut TextObject) -> TextResult<ActionResult> {
        if !object.is_deformed() {
            return Ok(ActionResult::event());
        }

        let mut done = true;
        for point in object.control_points_mut()? {
            let offset = *point.original() - *point.get();
            let distance = offset.length();
            if distance < SETTLED_DISTANCE {
                continue;
            }
            if distance >= REFORMING_DISTANCE {
                done = false;
                let step = offset * self.style.factor(distance);
                point.set(*point.get() + step);
            }
        }

        if done {
            object.set_deformed(false)?;
            tracing::trace!("Glyph {} reformed", object.id());
            return Ok(ActionResult::event());
        }
        Ok(ActionResult::running())
    }
}

impl Action for Reform {
    fn name(&self) -> &str {
        "reform"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        if ctx.object(id)?.is_glyph() {
            return self.reform_glyph(ctx.object_mut(id)?);
        }
        let mut combined = ActionResult::combining();
        for glyph in ctx.glyphs(id) {
            combined.combine(self.reform_glyph(ctx.object_mut(glyph)?)?);
        }
        Ok(combined.end_combine())
    }
}

/// Where a [`Pull`] draws control points towards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PullTarget {
    /// A fixed point in world coordinates.
    Point(Vector3),
    /// The pointer, while the left button is held.
    Mouse,
}

/// Draws control points within reach towards a target and marks the glyph
/// deformed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pull {
    target: PullTarget,
    speed: f64,
    reach: f64,
}

impl Pull {
    /// Create a pull moving points within `reach` of `target` by `speed` of
    /// their distance to it per frame.
    #[must_use]
    pub fn new(target: PullTarget, speed: f64, reach: f64) -> Self {
        Self {
            target,
            speed: speed.clamp(0.0, 1.0),
            reach,
        }
    }

    /// The pull target.
    #[must_use]
    pub const fn target(&self) -> PullTarget {
        self.target
    }

    fn pull_glyph(&self, ctx: &mut ActionContext<'_>, id: ObjectId, target: Vector3) -> TextResult<bool> {
        let origin = ctx.world_position(id)?;
        let object = ctx.object_mut(id)?;
        let rotation = object.rotation();
        let local_target = (target - origin).rotate_z(-rotation);

        let mut moved = false;
        for point in object.control_points_mut()? {
            let toward = local_target - *point.get();
            if toward.length() >= self.reach {
                continue;
            }
            point.set(*point.get() + toward * self.speed);
            moved = true;
        }
        if moved {
            object.set_deformed(true)?;
        }
        Ok(moved)
    }
}

impl Action for Pull {
    fn name(&self) -> &str {
        "pull"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        let target = match self.target {
            PullTarget::Point(point) => point,
            PullTarget::Mouse => {
                let mouse = ctx.input.mouse();
                if !mouse.is_pressed(MouseButton::Left) {
                    return Ok(ActionResult::running());
                }
                mouse.position()
            }
        };

        let glyphs = if ctx.object(id)?.is_glyph() {
            vec![id]
        } else {
            ctx.glyphs(id)
        };
        let mut moved = false;
        for glyph in glyphs {
            moved |= self.pull_glyph(ctx, glyph, target)?;
        }
        Ok(ActionResult::new(false, false, moved))
    }
}
