//! Behaviours: action pipelines applied to a tracked set of objects.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::{Action, ActionContext, ActionResult};
use crate::error::TextResult;
use crate::object::ObjectId;

/// Unique identifier for a behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviourId(Uuid);

impl BehaviourId {
    /// Create a new unique behaviour ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BehaviourId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BehaviourId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a behaviour hands its tracked objects to its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviourMode {
    /// Every action runs once per tracked object.
    #[default]
    Each,
    /// Every action runs once with the whole tracked set.
    Set,
}

/// A named pipeline of actions applied to a set of tracked objects once per
/// frame.
///
/// Properties required by the actions are initialized lazily on the first
/// [`behave_all`](Self::behave_all) after an object starts being tracked (or
/// after a new action is added), so actions never see an object lacking them.
pub struct Behaviour {
    id: BehaviourId,
    name: String,
    mode: BehaviourMode,
    actions: Vec<Box<dyn Action>>,
    /// Tracked objects in the order they were added.
    objects: Vec<ObjectId>,
    tracked: HashSet<ObjectId>,
    /// Objects whose required properties have not been initialized yet.
    uninitialized: HashSet<ObjectId>,
}

impl std::fmt::Debug for Behaviour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let actions: Vec<&str> = self.actions.iter().map(|a| a.name()).collect();
        f.debug_struct("Behaviour")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("actions", &actions)
            .field("objects", &self.objects)
            .finish_non_exhaustive()
    }
}

impl Behaviour {
    /// Create an empty behaviour that runs per object.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BehaviourId::new(),
            name: name.into(),
            mode: BehaviourMode::Each,
            actions: Vec::new(),
            objects: Vec::new(),
            tracked: HashSet::new(),
            uninitialized: HashSet::new(),
        }
    }

    /// Create a behaviour running a single action.
    #[must_use]
    pub fn with_action(name: impl Into<String>, action: impl Action + 'static) -> Self {
        let mut behaviour = Self::new(name);
        behaviour.add_action(Box::new(action));
        behaviour
    }

    /// Set the dispatch mode, builder style.
    #[must_use]
    pub fn with_mode(mut self, mode: BehaviourMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reuse an existing identity, builder style. Registering the result
    /// with a book replaces the behaviour holding that id.
    #[must_use]
    pub fn with_id(mut self, id: BehaviourId) -> Self {
        self.id = id;
        self
    }

    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> BehaviourId {
        self.id
    }

    /// Human readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch mode.
    #[must_use]
    pub const fn mode(&self) -> BehaviourMode {
        self.mode
    }

    /// Append an action to the pipeline.
    ///
    /// Every tracked object is re-initialized before the next run so the new
    /// action's required properties are present.
    pub fn add_action(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
        self.uninitialized.extend(self.objects.iter().copied());
    }

    /// Remove the action at `index`, forcing its completion on every tracked
    /// object first.
    pub fn remove_action(&mut self, index: usize) -> Option<Box<dyn Action>> {
        if index >= self.actions.len() {
            return None;
        }
        let mut action = self.actions.remove(index);
        for id in &self.objects {
            action.complete(*id);
        }
        Some(action)
    }

    /// Number of actions in the pipeline.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Start tracking an object. Returns `false` if it was already tracked.
    pub fn add_object(&mut self, id: ObjectId) -> bool {
        if !self.tracked.insert(id) {
            return false;
        }
        self.objects.push(id);
        self.uninitialized.insert(id);
        true
    }

    /// Stop tracking an object and tell every action to drop its state for
    /// it. Returns `false` if the object was not tracked.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        if !self.tracked.remove(&id) {
            return false;
        }
        self.objects.retain(|tracked| *tracked != id);
        self.uninitialized.remove(&id);
        for action in &mut self.actions {
            action.complete(id);
        }
        true
    }

    /// Whether the object is tracked.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.tracked.contains(&id)
    }

    /// Tracked objects in the order they were added.
    #[must_use]
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    /// Run the pipeline over every tracked object and combine the results.
    ///
    /// # Errors
    ///
    /// Returns an error if a tracked object is no longer alive or an action
    /// fails on it.
    pub fn behave_all(&mut self, ctx: &mut ActionContext<'_>) -> TextResult<ActionResult> {
        self.initialize(ctx)?;

        let mut combined = ActionResult::combining();
        match self.mode {
            BehaviourMode::Each => {
                for id in &self.objects {
                    for action in &mut self.actions {
                        combined.combine(action.behave(ctx, *id)?);
                    }
                }
            }
            BehaviourMode::Set => {
                for action in &mut self.actions {
                    combined.combine(action.behave_set(ctx, &self.objects)?);
                }
            }
        }
        Ok(combined.end_combine())
    }

    fn initialize(&mut self, ctx: &mut ActionContext<'_>) -> TextResult<()> {
        if self.uninitialized.is_empty() {
            return Ok(());
        }

        let required: Vec<_> = self
            .actions
            .iter()
            .flat_map(|action| action.required_properties())
            .collect();

        // Keep tracking order so initialization is deterministic.
        for id in &self.objects {
            if !self.uninitialized.contains(id) {
                continue;
            }
            let properties = ctx.object_mut(*id)?.properties_mut();
            for (key, default) in &required {
                properties.insert_default(key.clone(), default.clone());
            }
        }
        tracing::trace!(
            "Behaviour '{}' initialized {} objects",
            self.name,
            self.uninitialized.len()
        );
        self.uninitialized.clear();
        Ok(())
    }
}
