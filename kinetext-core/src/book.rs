//! The book: scene root, pages, behaviours and the frame loop.
//!
//! ```text
//! step()
//!   ├─ drain input queue into InputState
//!   ├─ behave_all() on every behaviour, in registration order
//!   ├─ flush queued removals (spatial index, behaviours, then tree)
//!   ├─ frame_count += 1
//!   └─ spatial index update
//! draw()
//!   └─ render every page, in insertion order
//! ```
//!
//! Removal requests made while behaviours run are only queued. Nothing leaves
//! the tree until the flush, so every behaviour sees the same tree shape
//! during a step.

use std::collections::HashSet;

use crate::action::ActionContext;
use crate::behaviour::{Behaviour, BehaviourId};
use crate::builder::{build_text, BuiltText, GlyphSource};
use crate::config::BookConfig;
use crate::error::{TextError, TextResult};
use crate::input::{InputQueue, InputState};
use crate::object::{ObjectId, TextObject, TextTree};
use crate::spatial::SpatialList;
use crate::vector::Vector3;

/// Draws pages of a book.
pub trait PageRenderer {
    /// Render the page group `page` named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render_page(&mut self, name: &str, tree: &TextTree, page: ObjectId) -> TextResult<()>;

    /// Called once after every page of a frame has been rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if presenting the frame fails.
    fn finish_frame(&mut self) -> TextResult<()> {
        Ok(())
    }
}

/// Owns a text tree and animates it.
#[derive(Debug)]
pub struct Book {
    config: BookConfig,
    tree: TextTree,
    spatial: SpatialList,
    behaviours: Vec<Behaviour>,
    glyph_behaviours: Vec<BehaviourId>,
    group_behaviours: Vec<BehaviourId>,
    /// Page groups under the root, in insertion order.
    pages: Vec<(String, ObjectId)>,
    /// Removal queue in request order; `pending_set` deduplicates it.
    pending: Vec<ObjectId>,
    pending_set: HashSet<ObjectId>,
    input_queue: InputQueue,
    input: InputState,
    frame_count: u64,
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl Book {
    /// Create a book with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BookConfig::default())
    }

    /// Create a book with the given configuration and its default page.
    #[must_use]
    pub fn with_config(config: BookConfig) -> Self {
        let tree = TextTree::new();
        let mut book = Self {
            spatial: SpatialList::new(config.spatial_cell_size),
            tree,
            behaviours: Vec::new(),
            glyph_behaviours: Vec::new(),
            group_behaviours: Vec::new(),
            pages: Vec::new(),
            pending: Vec::new(),
            pending_set: HashSet::new(),
            input_queue: InputQueue::new(),
            input: InputState::new(),
            frame_count: 0,
            config,
        };
        let root = book.tree.root();
        let page = book.tree.add_group(root, Vector3::ZERO);
        match page {
            Ok(page) => book.pages.push((book.config.default_page.clone(), page)),
            Err(e) => tracing::warn!("Failed to create default page: {}", e),
        }
        book
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Number of completed steps.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The text tree.
    #[must_use]
    pub const fn tree(&self) -> &TextTree {
        &self.tree
    }

    /// A live object, mutably. Structural changes go through the book.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not alive.
    pub fn object_mut(&mut self, id: ObjectId) -> TextResult<&mut TextObject> {
        self.tree.object_mut(id)
    }

    /// The spatial index.
    #[must_use]
    pub const fn spatial(&self) -> &SpatialList {
        &self.spatial
    }

    /// Input state of the last step.
    #[must_use]
    pub const fn input(&self) -> &InputState {
        &self.input
    }

    /// A producer handle for host input callbacks.
    #[must_use]
    pub fn input_queue(&self) -> InputQueue {
        self.input_queue.clone()
    }

    // ---------------------------------------------------------------
    // Frame loop
    // ---------------------------------------------------------------

    /// Advance the simulation by one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if a behaviour fails or the root was queued for
    /// removal. Removals requested before a behaviour failure stay queued.
    /// A queued root does not stop the frame: every other removal is
    /// flushed and the frame still advances before the error is returned.
    pub fn step(&mut self) -> TextResult<()> {
        self.input.begin_frame(self.input_queue.drain());

        let mut removals = Vec::new();
        let mut ctx = ActionContext::new(
            &mut self.tree,
            &self.spatial,
            &self.input,
            self.frame_count,
            &mut removals,
        );
        let mut outcome = Ok(());
        for behaviour in &mut self.behaviours {
            if let Err(e) = behaviour.behave_all(&mut ctx) {
                tracing::warn!("Behaviour '{}' failed: {}", behaviour.name(), e);
                outcome = Err(e);
                break;
            }
        }
        for id in removals {
            self.remove_object(id);
        }
        outcome?;

        let flushed = self.flush_removals();
        self.frame_count += 1;
        let moved = self.spatial.update(&self.tree)?;
        tracing::trace!("Frame {} complete, {} objects moved", self.frame_count, moved);
        flushed
    }

    /// Render every page in insertion order.
    ///
    /// # Errors
    ///
    /// Returns the first rendering error.
    pub fn draw(&self, renderer: &mut dyn PageRenderer) -> TextResult<()> {
        for (name, page) in &self.pages {
            renderer.render_page(name, &self.tree, *page)?;
        }
        renderer.finish_frame()
    }

    /// Render a single page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist or rendering fails.
    pub fn draw_page(&self, name: &str, renderer: &mut dyn PageRenderer) -> TextResult<()> {
        let page = self.page_or_err(name)?;
        renderer.render_page(name, &self.tree, page)?;
        renderer.finish_frame()
    }

    /// [`step`](Self::step) then [`draw`](Self::draw).
    ///
    /// # Errors
    ///
    /// Returns an error if either phase fails.
    pub fn step_and_draw(&mut self, renderer: &mut dyn PageRenderer) -> TextResult<()> {
        self.step()?;
        self.draw(renderer)
    }

    // ---------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------

    /// Queue an object, and everything below it, for removal at the end of
    /// the next step.
    pub fn remove_object(&mut self, id: ObjectId) {
        if self.pending_set.insert(id) {
            self.pending.push(id);
        }
    }

    /// Queue every direct child of a group for removal.
    ///
    /// # Errors
    ///
    /// Returns an error if `group` is not alive.
    pub fn remove_children(&mut self, group: ObjectId) -> TextResult<()> {
        self.tree.object(group)?;
        let children: Vec<_> = self.tree.children(group).collect();
        for child in children {
            self.remove_object(child);
        }
        Ok(())
    }

    /// Whether a removal is queued for the object.
    #[must_use]
    pub fn is_pending_removal(&self, id: ObjectId) -> bool {
        self.pending_set.contains(&id)
    }

    fn flush_removals(&mut self) -> TextResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let queued = std::mem::take(&mut self.pending);
        self.pending_set.clear();

        let root = self.tree.root();
        let mut root_requested = false;
        let mut removed = HashSet::new();
        for id in queued {
            if id == root {
                root_requested = true;
                continue;
            }
            if !self.tree.contains(id) {
                if !removed.contains(&id) {
                    tracing::warn!("Skipping removal of stale object {}", id);
                }
                continue;
            }
            for node in self.tree.subtree_post_order(id) {
                self.spatial.remove(node);
                for behaviour in &mut self.behaviours {
                    behaviour.remove_object(node);
                }
                self.tree.remove(node)?;
                removed.insert(node);
            }
        }
        self.pages.retain(|(_, page)| !removed.contains(page));
        tracing::debug!("Flushed {} removed objects", removed.len());

        if root_requested {
            return Err(TextError::RootRemoval);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Behaviours
    // ---------------------------------------------------------------

    /// Register a behaviour to run every step. Registering a behaviour whose
    /// id is already present replaces the old one in place.
    pub fn add_behaviour(&mut self, behaviour: Behaviour) -> BehaviourId {
        let id = behaviour.id();
        if let Some(existing) = self.behaviours.iter_mut().find(|b| b.id() == id) {
            tracing::warn!(
                "Behaviour '{}' ({}) already registered, replacing",
                existing.name(),
                id
            );
            *existing = behaviour;
        } else {
            tracing::debug!("Added behaviour '{}' ({})", behaviour.name(), id);
            self.behaviours.push(behaviour);
        }
        id
    }

    /// Unregister a behaviour.
    pub fn remove_behaviour(&mut self, id: BehaviourId) -> Option<Behaviour> {
        self.glyph_behaviours.retain(|b| *b != id);
        self.group_behaviours.retain(|b| *b != id);
        let index = self.behaviours.iter().position(|b| b.id() == id)?;
        let behaviour = self.behaviours.remove(index);
        tracing::debug!("Removed behaviour '{}' ({})", behaviour.name(), id);
        Some(behaviour)
    }

    /// A registered behaviour.
    #[must_use]
    pub fn behaviour(&self, id: BehaviourId) -> Option<&Behaviour> {
        self.behaviours.iter().find(|b| b.id() == id)
    }

    /// A registered behaviour, mutably.
    pub fn behaviour_mut(&mut self, id: BehaviourId) -> Option<&mut Behaviour> {
        self.behaviours.iter_mut().find(|b| b.id() == id)
    }

    /// Registered behaviours in run order.
    #[must_use]
    pub fn behaviours(&self) -> &[Behaviour] {
        &self.behaviours
    }

    /// Register a behaviour that every glyph built afterwards joins.
    pub fn add_glyph_behaviour(&mut self, behaviour: Behaviour) -> BehaviourId {
        let id = self.add_behaviour(behaviour);
        if !self.glyph_behaviours.contains(&id) {
            self.glyph_behaviours.push(id);
        }
        id
    }

    /// Stop adding new glyphs to a behaviour. It stays registered.
    pub fn remove_glyph_behaviour(&mut self, id: BehaviourId) -> bool {
        let before = self.glyph_behaviours.len();
        self.glyph_behaviours.retain(|b| *b != id);
        before != self.glyph_behaviours.len()
    }

    /// Stop adding new glyphs to any behaviour.
    pub fn remove_all_glyph_behaviours(&mut self) {
        self.glyph_behaviours.clear();
    }

    /// Register a behaviour that every text group built afterwards joins.
    pub fn add_group_behaviour(&mut self, behaviour: Behaviour) -> BehaviourId {
        let id = self.add_behaviour(behaviour);
        if !self.group_behaviours.contains(&id) {
            self.group_behaviours.push(id);
        }
        id
    }

    /// Stop adding new text groups to a behaviour. It stays registered.
    pub fn remove_group_behaviour(&mut self, id: BehaviourId) -> bool {
        let before = self.group_behaviours.len();
        self.group_behaviours.retain(|b| *b != id);
        before != self.group_behaviours.len()
    }

    /// Stop adding new text groups to any behaviour.
    pub fn remove_all_group_behaviours(&mut self) {
        self.group_behaviours.clear();
    }

    // ---------------------------------------------------------------
    // Pages
    // ---------------------------------------------------------------

    /// Add a named page. A page with the same name is replaced and its
    /// contents queued for removal.
    ///
    /// # Errors
    ///
    /// Returns an error if the page group cannot be created.
    pub fn add_page(&mut self, name: impl Into<String>) -> TextResult<ObjectId> {
        let name = name.into();
        let root = self.tree.root();
        let page = self.tree.add_group(root, Vector3::ZERO)?;

        if let Some(slot) = self.pages.iter_mut().find(|(existing, _)| *existing == name) {
            tracing::warn!("A page named '{}' already exists and will be replaced", name);
            let old = std::mem::replace(&mut slot.1, page);
            self.remove_object(old);
        } else {
            tracing::debug!("Added page '{}'", name);
            self.pages.push((name, page));
        }
        Ok(page)
    }

    /// Add a page named after its position, `layer<n>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page group cannot be created.
    pub fn add_layer(&mut self) -> TextResult<ObjectId> {
        let name = format!("layer{}", self.pages.len());
        self.add_page(name)
    }

    /// The group of a named page.
    #[must_use]
    pub fn page(&self, name: &str) -> Option<ObjectId> {
        self.pages
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, page)| *page)
    }

    /// Pages in insertion order.
    pub fn pages(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.pages.iter().map(|(name, page)| (name.as_str(), *page))
    }

    fn page_or_err(&self, name: &str) -> TextResult<ObjectId> {
        self.page(name)
            .ok_or_else(|| TextError::InvalidOperation(format!("No page named '{name}'")))
    }

    // ---------------------------------------------------------------
    // Objects
    // ---------------------------------------------------------------

    /// Build `text` on a page (the default page when `None`) and register the
    /// new objects with the spatial index and the glyph and group behaviours.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist.
    pub fn add_text(
        &mut self,
        source: &dyn GlyphSource,
        text: &str,
        position: Vector3,
        page: Option<&str>,
    ) -> TextResult<BuiltText> {
        let page = self.page_or_err(page.unwrap_or(self.config.default_page.as_str()))?;
        let built = build_text(
            &mut self.tree,
            page,
            source,
            text,
            position,
            self.config.word_spacing,
        )?;

        for id in built.groups().chain(built.glyphs.iter().copied()) {
            self.spatial.add(&self.tree, id)?;
        }
        for behaviour in &mut self.behaviours {
            if self.glyph_behaviours.contains(&behaviour.id()) {
                for glyph in &built.glyphs {
                    behaviour.add_object(*glyph);
                }
            }
            if self.group_behaviours.contains(&behaviour.id()) {
                behaviour.add_object(built.text);
            }
        }
        Ok(built)
    }

    /// Create a group under `parent` and index it.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a live group.
    pub fn add_group(&mut self, parent: ObjectId, position: Vector3) -> TextResult<ObjectId> {
        let id = self.tree.add_group(parent, position)?;
        self.spatial.add(&self.tree, id)?;
        Ok(id)
    }

    /// Create a glyph under `parent` and index it.
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
        let id = self.tree.add_glyph(parent, text, position, control_points)?;
        self.spatial.add(&self.tree, id)?;
        Ok(id)
    }
}
