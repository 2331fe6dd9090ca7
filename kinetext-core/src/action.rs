//! Actions: the building blocks of behaviours.
//!
//! An [`Action`] transforms text objects a little every frame. Some actions
//! modify objects directly, others only decide when to invoke further actions
//! (see [`Multiplexer`]). Because actions are plugged together freely it is
//! hard to predict when, or whether, an action will be called again for a
//! given object. Two mechanisms deal with this:
//!
//! - [`Action::complete`] tells an action it can drop any per-object state,
//!   because it will not be called for that object again. A later call is
//!   treated as starting over.
//! - [`ActionResult`] reports whether the action has completed, whether it
//!   could ever complete, and whether an event occurred this step.

use crate::error::TextResult;
use crate::input::InputState;
use crate::object::{ObjectId, TextObject, TextTree};
use crate::property::{Property, PropertyKey};
use crate::spatial::SpatialList;
use crate::vector::Vector3;

/// Outcome of one invocation of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionResult {
    /// The action has completed.
    pub complete: bool,
    /// The action can ever complete for this object.
    pub can_complete: bool,
    /// An event occurred during this step.
    pub event: bool,
}

impl ActionResult {
    /// Create a result from its three flags.
    #[must_use]
    pub const fn new(complete: bool, can_complete: bool, event: bool) -> Self {
        Self {
            complete,
            can_complete,
            event,
        }
    }

    /// A result that never completes and reports no event.
    #[must_use]
    pub const fn running() -> Self {
        Self::new(false, false, false)
    }

    /// A result that never completes but reports an event.
    #[must_use]
    pub const fn event() -> Self {
        Self::new(false, false, true)
    }

    /// Neutral starting point for [`combine`](Self::combine).
    #[must_use]
    pub const fn combining() -> Self {
        Self::new(true, false, false)
    }

    /// Fold another result into this one.
    ///
    /// After every contribution has been folded and
    /// [`end_combine`](Self::end_combine) called:
    ///
    /// - `complete` is true iff at least one contribution had `can_complete`
    ///   and all those with `can_complete` also had `complete`;
    /// - `can_complete` is true iff any contribution had `can_complete`;
    /// - `event` is true iff any contribution had `event`.
    pub fn combine(&mut self, other: Self) {
        if other.can_complete && !other.complete {
            self.complete = false;
        }
        if other.event {
            self.event = true;
        }
        if other.can_complete {
            self.can_complete = true;
        }
    }

    /// Finish a combination. A combination in which nothing could complete
    /// is never complete.
    #[must_use]
    pub const fn end_combine(mut self) -> Self {
        if !self.can_complete {
            self.complete = false;
        }
        self
    }

    /// Combine a sequence of results in one go.
    #[must_use]
    pub fn combine_all(results: impl IntoIterator<Item = Self>) -> Self {
        let mut combined = Self::combining();
        for result in results {
            combined.combine(result);
        }
        combined.end_combine()
    }
}

/// Everything an action may touch during one step.
///
/// Objects can be read and their properties edited, but the tree structure
/// is never changed directly. Removal goes through
/// [`remove_object`](Self::remove_object), which only queues the request so
/// that other behaviours iterating the same objects this frame are not
/// disturbed.
///
/// ```compile_fail
/// use kinetext_core::{ActionContext, ObjectId};
///
/// fn detach_now(ctx: &mut ActionContext<'_>, id: ObjectId) {
///     let _ = ctx.tree.remove(id);
/// }
/// ```
#[derive(Debug)]
pub struct ActionContext<'a> {
    tree: &'a mut TextTree,
    /// Spatial index as of the end of the previous step.
    pub spatial: &'a SpatialList,
    /// Input received for this frame.
    pub input: &'a InputState,
    /// The frame being computed.
    pub frame: u64,
    removals: &'a mut Vec<ObjectId>,
}

impl<'a> ActionContext<'a> {
    /// Create a context over the given state.
    pub fn new(
        tree: &'a mut TextTree,
        spatial: &'a SpatialList,
        input: &'a InputState,
        frame: u64,
        removals: &'a mut Vec<ObjectId>,
    ) -> Self {
        Self {
            tree,
            spatial,
            input,
            frame,
            removals,
        }
    }

    /// Look up a live object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not alive.
    pub fn object(&self, id: ObjectId) -> TextResult<&TextObject> {
        self.tree.object(id)
    }

    /// Look up a live object mutably.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not alive.
    pub fn object_mut(&mut self, id: ObjectId) -> TextResult<&mut TextObject> {
        self.tree.object_mut(id)
    }

    /// Read-only view of the tree.
    #[must_use]
    pub fn tree(&self) -> &TextTree {
        self.tree
    }

    /// Whether `id` refers to a live object.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.tree.contains(id)
    }

    /// Direct children of a group, in order.
    #[must_use]
    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.tree.children(id).collect()
    }

    /// Every glyph below `id`, in document order.
    #[must_use]
    pub fn glyphs(&self, id: ObjectId) -> Vec<ObjectId> {
        self.tree.glyphs(id)
    }

    /// Position of an object in page space.
    ///
    /// # Errors
    ///
    /// Returns an error if the object or one of its ancestors is not alive.
    pub fn world_position(&self, id: ObjectId) -> TextResult<Vector3> {
        self.tree.world_position(id)
    }

    /// Request removal of an object (and its subtree) at the next flush point.
    pub fn remove_object(&mut self, id: ObjectId) {
        self.removals.push(id);
    }

    /// Removal requests made so far during this step.
    #[must_use]
    pub fn pending_removals(&self) -> &[ObjectId] {
        self.removals
    }
}

/// A per-object, per-pair or per-set state transformer with a completion
/// protocol.
///
/// `behave*` must only be called on objects that carry every property listed
/// by [`required_properties`](Self::required_properties); the owning behaviour
/// guarantees this. Calling it on an object lacking one is a programming
/// error and surfaces as [`TextError::MissingProperty`](crate::TextError).
pub trait Action: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Perform the action on one object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is dead or lacks a required property.
    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult>;

    /// Perform the action on a pair of objects.
    ///
    /// The default applies [`behave`](Self::behave) to each and combines the
    /// results.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying invocations.
    fn behave_pair(
        &mut self,
        ctx: &mut ActionContext<'_>,
        a: ObjectId,
        b: ObjectId,
    ) -> TextResult<ActionResult> {
        self.behave_set(ctx, &[a, b])
    }

    /// Perform the action on a set of objects.
    ///
    /// The default applies [`behave`](Self::behave) to each and combines the
    /// results.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying invocations.
    fn behave_set(
        &mut self,
        ctx: &mut ActionContext<'_>,
        ids: &[ObjectId],
    ) -> TextResult<ActionResult> {
        let mut combined = ActionResult::combining();
        for id in ids {
            combined.combine(self.behave(ctx, *id)?);
        }
        Ok(combined.end_combine())
    }

    /// Forced completion: drop any state kept for this object.
    fn complete(&mut self, _id: ObjectId) {}

    /// Properties this action expects on every object it acts on, with the
    /// value to initialize them to.
    fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
        Vec::new()
    }
}

/// Runs several actions on the same objects and combines their results.
pub struct Multiplexer {
    actions: Vec<Box<dyn Action>>,
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.actions.iter().map(|a| a.name()).collect();
        f.debug_struct("Multiplexer")
            .field("actions", &names)
            .finish()
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer {
    /// Create an empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Add an action, builder style.
    #[must_use]
    pub fn with(mut self, action: impl Action + 'static) -> Self {
        self.add(Box::new(action));
        self
    }

    /// Add an action.
    pub fn add(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    /// Number of contained actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no actions are contained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Action for Multiplexer {
    fn name(&self) -> &str {
        "multiplexer"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        let mut combined = ActionResult::combining();
        for action in &mut self.actions {
            combined.combine(action.behave(ctx, id)?);
        }
        Ok(combined.end_combine())
    }

    fn behave_pair(
        &mut self,
        ctx: &mut ActionContext<'_>,
        a: ObjectId,
        b: ObjectId,
    ) -> TextResult<ActionResult> {
        let mut combined = ActionResult::combining();
        for action in &mut self.actions {
            combined.combine(action.behave_pair(ctx, a, b)?);
        }
        Ok(combined.end_combine())
    }

    fn behave_set(
        &mut self,
        ctx: &mut ActionContext<'_>,
        ids: &[ObjectId],
    ) -> TextResult<ActionResult> {
        let mut combined = ActionResult::combining();
        for action in &mut self.actions {
            combined.combine(action.behave_set(ctx, ids)?);
        }
        Ok(combined.end_combine())
    }

    fn complete(&mut self, id: ObjectId) {
        for action in &mut self.actions {
            action.complete(id);
        }
    }

    fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
        let mut required: Vec<(PropertyKey, Property)> = Vec::new();
        for action in &self.actions {
            for (key, default) in action.required_properties() {
                if !required.iter().any(|(existing, _)| *existing == key) {
                    required.push((key, default));
                }
            }
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Returns a fixed result and counts invocations.
    struct Fixed {
        result: ActionResult,
        calls: usize,
        completed: Vec<ObjectId>,
    }

    impl Fixed {
        fn new(result: ActionResult) -> Self {
            Self {
                result,
                calls: 0,
                completed: Vec::new(),
            }
        }
    }

    impl Action for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn behave(&mut self, _ctx: &mut ActionContext<'_>, _id: ObjectId) -> TextResult<ActionResult> {
            self.calls += 1;
            Ok(self.result)
        }

        fn complete(&mut self, id: ObjectId) {
            self.completed.push(id);
        }

        fn required_properties(&self) -> Vec<(PropertyKey, Property)> {
            vec![(PropertyKey::Dragging, Property::bool(false))]
        }
    }

    fn arb_result() -> impl Strategy<Value = ActionResult> {
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(complete, can_complete, event)| ActionResult::new(complete, can_complete, event))
    }

    proptest! {
        #[test]
        fn prop_combination_rules(results in prop::collection::vec(arb_result(), 0..12)) {
            let combined = ActionResult::combine_all(results.clone());

            let any_can = results.iter().any(|r| r.can_complete);
            let all_completable_done = results
                .iter()
                .filter(|r| r.can_complete)
                .all(|r| r.complete);
            let any_event = results.iter().any(|r| r.event);

            prop_assert_eq!(combined.complete, any_can && all_completable_done);
            prop_assert_eq!(combined.can_complete, any_can);
            prop_assert_eq!(combined.event, any_event);
        }

        #[test]
        fn prop_combination_is_associative(
            left in prop::collection::vec(arb_result(), 0..6),
            right in prop::collection::vec(arb_result(), 0..6),
        ) {
            let mut folded = ActionResult::combining();
            for r in left.iter().chain(right.iter()) {
                folded.combine(*r);
            }

            let mut grouped = ActionResult::combining();
            let mut left_part = ActionResult::combining();
            for r in &left {
                left_part.combine(*r);
            }
            grouped.combine(left_part);
            for r in &right {
                grouped.combine(*r);
            }

            prop_assert_eq!(folded.end_combine(), grouped.end_combine());
        }
    }

    #[test]
    fn test_never_completing_actions_are_not_complete() {
        let combined = ActionResult::combine_all([ActionResult::running(), ActionResult::event()]);
        assert_eq!(combined, ActionResult::new(false, false, true));
    }

    #[test]
    fn test_empty_combination_is_not_complete() {
        assert_eq!(ActionResult::combine_all([]), ActionResult::new(false, false, false));
    }

    #[test]
    fn test_completable_and_silent_mix() {
        let combined = ActionResult::combine_all([
            ActionResult::new(true, true, false),
            ActionResult::running(),
        ]);
        assert!(combined.complete);
        assert!(combined.can_complete);

        let combined = ActionResult::combine_all([
            ActionResult::new(true, true, false),
            ActionResult::new(false, true, false),
        ]);
        assert!(!combined.complete);
    }

    #[test]
    fn test_multiplexer_runs_all_and_combines() {
        let mut tree = TextTree::new();
        let id = tree.add_group(tree.root(), crate::Vector3::ZERO).expect("group");
        let spatial = SpatialList::default();
        let input = InputState::default();
        let mut removals = Vec::new();
        let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 0, &mut removals);

        let mut mux = Multiplexer::new()
            .with(Fixed::new(ActionResult::new(true, true, false)))
            .with(Fixed::new(ActionResult::event()));
        assert_eq!(mux.len(), 2);

        let result = mux.behave(&mut ctx, id).expect("behave");
        assert_eq!(result, ActionResult::new(true, true, true));

        let pair = mux.behave_pair(&mut ctx, id, id).expect("pair");
        assert_eq!(pair, ActionResult::new(true, true, true));

        // Both actions declare the same property; it is listed once.
        assert_eq!(mux.required_properties().len(), 1);
        mux.complete(id);
    }

    #[test]
    fn test_context_queues_removals() {
        let mut tree = TextTree::new();
        let id = tree.add_group(tree.root(), crate::Vector3::ZERO).expect("group");
        let spatial = SpatialList::default();
        let input = InputState::default();
        let mut removals = Vec::new();
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 0, &mut removals);
            ctx.remove_object(id);
            assert_eq!(ctx.pending_removals(), &[id]);
        }
        assert!(tree.contains(id));
        assert_eq!(removals, vec![id]);
    }

    #[test]
    fn test_context_reads_structure_without_changing_it() {
        let mut tree = TextTree::new();
        let word = tree.add_group(tree.root(), Vector3::xy(5.0, 0.0)).expect("word");
        let glyph = tree
            .add_glyph(word, "a", Vector3::xy(1.0, 0.0), vec![Vector3::ZERO])
            .expect("glyph");
        let nodes_before = tree.len();
        let spatial = SpatialList::default();
        let input = InputState::default();
        let mut removals = Vec::new();
        {
            let mut ctx = ActionContext::new(&mut tree, &spatial, &input, 0, &mut removals);
            assert_eq!(ctx.children(word), vec![glyph]);
            assert_eq!(ctx.glyphs(word), vec![glyph]);
            assert_eq!(ctx.world_position(glyph).expect("world"), Vector3::xy(6.0, 0.0));
            ctx.remove_object(word);
            assert!(ctx.contains(glyph));
            assert_eq!(ctx.tree().len(), nodes_before);
        }
        assert_eq!(tree.len(), nodes_before);
        tree.validate().expect("links consistent");
    }
}
