//! Spatial index over text objects.
//!
//! [`SpatialList`] buckets the world-space bounds of registered objects into a
//! uniform grid and answers point, rectangle and overlap queries by touching
//! only the cells involved.
//!
//! ```text
//!   cell_size
//!   ├──────┤
//!   ┌──────┬──────┬──────┐
//!   │      │ ┌────┼─┐    │   An object is listed in every
//!   │      │ │ g  │ │    │   cell its bounds overlap.
//!   ├──────┼─┼────┼─┼────┤
//!   │      │ └────┼─┘    │
//!   └──────┴──────┴──────┘
//! ```
//!
//! Bounds are refreshed once per frame by [`SpatialList::update`], after
//! removals have been flushed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::TextResult;
use crate::object::{ObjectId, TextTree};
use crate::vector::Vector3;

/// Objects whose bounds span more cells than this are kept out of the grid
/// and checked linearly.
const MAX_CELLS_PER_ENTRY: i64 = 1024;

/// Axis-aligned bounds in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x (left).
    pub min_x: f64,
    /// Minimum y (top).
    pub min_y: f64,
    /// Maximum x (right).
    pub max_x: f64,
    /// Maximum y (bottom).
    pub max_y: f64,
}

impl Bounds {
    /// Create bounds from min/max corners.
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate bounds around a single point.
    #[must_use]
    pub const fn from_point(point: Vector3) -> Self {
        Self::new(point.x, point.y, point.x, point.y)
    }

    /// Smallest bounds containing every point, `None` if there are none.
    #[must_use]
    pub fn from_points(points: &[Vector3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(
            rest.iter()
                .fold(Self::from_point(*first), |b, p| b.union(&Self::from_point(*p))),
        )
    }

    /// Smallest bounds containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Whether the point lies inside or on the edge.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// Whether the two bounds overlap. Shared edges count as overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Width of the bounds.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounds.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

type CellKey = (i32, i32);

#[derive(Debug, Clone, Default)]
struct Entry {
    bounds: Option<Bounds>,
    cells: SmallVec<[CellKey; 4]>,
    oversized: bool,
}

/// Uniform-grid spatial index keyed by [`ObjectId`].
#[derive(Debug, Clone)]
pub struct SpatialList {
    cell_size: f64,
    entries: HashMap<ObjectId, Entry>,
    cells: HashMap<CellKey, SmallVec<[ObjectId; 8]>>,
    oversized: HashSet<ObjectId>,
}

impl Default for SpatialList {
    fn default() -> Self {
        Self::new(64.0)
    }
}

impl SpatialList {
    /// Create an empty index with the given grid cell size.
    ///
    /// Non-positive or non-finite sizes fall back to 64.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            tracing::warn!("Invalid spatial cell size {cell_size}, using 64");
            64.0
        };
        Self {
            cell_size,
            entries: HashMap::new(),
            cells: HashMap::new(),
            oversized: HashSet::new(),
        }
    }

    /// The grid cell size.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Register an object and index its current bounds.
    ///
    /// Registering an already tracked object refreshes its bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is dead or its geometry is malformed.
    pub fn add(&mut self, tree: &TextTree, id: ObjectId) -> TextResult<()> {
        let bounds = tree.world_bounds(id)?;
        self.entries.entry(id).or_default();
        self.place(id, bounds);
        Ok(())
    }

    /// Forget an object. Returns `true` if it was tracked.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.unbucket(id, &entry);
        true
    }

    /// Whether the object is tracked.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of tracked objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last indexed bounds of an object.
    #[must_use]
    pub fn bounds(&self, id: ObjectId) -> Option<Bounds> {
        self.entries.get(&id).and_then(|entry| entry.bounds)
    }

    /// Recompute the bounds of every tracked object from the tree.
    ///
    /// Objects that are no longer alive are dropped. Returns the number of
    /// objects whose bounds changed.
    ///
    /// # Errors
    ///
    /// Returns an error if an object's geometry is malformed.
    pub fn update(&mut self, tree: &TextTree) -> TextResult<usize> {
        let ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        let mut moved = 0;
        for id in ids {
            if !tree.contains(id) {
                tracing::warn!("Dropping dead object {id} from spatial list");
                self.remove(id);
                continue;
            }
            let bounds = tree.world_bounds(id)?;
            if self.bounds(id) != bounds {
                self.place(id, bounds);
                moved += 1;
            }
        }
        tracing::trace!("Spatial update: {moved} of {} objects moved", self.len());
        Ok(moved)
    }

    /// Objects whose bounds contain the point, ordered by id.
    #[must_use]
    pub fn query_point(&self, x: f64, y: f64) -> Vec<ObjectId> {
        let key = self.cell_of(x, y);
        let candidates = self
            .cells
            .get(&key)
            .into_iter()
            .flatten()
            .chain(self.oversized.iter());
        let mut hits: Vec<ObjectId> = candidates
            .filter(|id| {
                self.bounds(**id)
                    .is_some_and(|b| b.contains_point(x, y))
            })
            .copied()
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Objects whose bounds intersect the rectangle, ordered by id.
    #[must_use]
    pub fn query_rect(&self, rect: &Bounds) -> Vec<ObjectId> {
        let mut hits: Vec<ObjectId> = match self.cells_for(rect) {
            Some(keys) => keys
                .iter()
                .filter_map(|key| self.cells.get(key))
                .flatten()
                .chain(self.oversized.iter())
                .copied()
                .collect(),
            None => self.entries.keys().copied().collect(),
        };
        hits.retain(|id| self.bounds(*id).is_some_and(|b| b.intersects(rect)));
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Every unordered pair of tracked objects whose bounds overlap, each
    /// pair listed once with the smaller id first.
    #[must_use]
    pub fn overlapping_pairs(&self) -> Vec<(ObjectId, ObjectId)> {
        let mut pairs = Vec::new();
        for (id, entry) in &self.entries {
            let Some(bounds) = entry.bounds else {
                continue;
            };
            for other in self.query_rect(&bounds) {
                if *id < other {
                    pairs.push((*id, other));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn place(&mut self, id: ObjectId, bounds: Option<Bounds>) {
        let Some(mut entry) = self.entries.remove(&id) else {
            return;
        };
        self.unbucket(id, &entry);
        entry.bounds = bounds;
        entry.cells.clear();
        entry.oversized = false;

        if let Some(bounds) = bounds {
            match self.cells_for(&bounds) {
                Some(keys) => {
                    for key in &keys {
                        self.cells.entry(*key).or_default().push(id);
                    }
                    entry.cells = keys;
                }
                None => {
                    self.oversized.insert(id);
                    entry.oversized = true;
                }
            }
        }
        self.entries.insert(id, entry);
    }

    fn unbucket(&mut self, id: ObjectId, entry: &Entry) {
        for key in &entry.cells {
            if let Some(cell) = self.cells.get_mut(key) {
                cell.retain(|other| *other != id);
                if cell.is_empty() {
                    self.cells.remove(key);
                }
            }
        }
        if entry.oversized {
            self.oversized.remove(&id);
        }
    }

    #[allow(clippy::cast_possible_truncation)] // Float to int casts saturate
    fn cell_of(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Cells overlapped by the bounds, or `None` if there are too many.
    fn cells_for(&self, bounds: &Bounds) -> Option<SmallVec<[CellKey; 4]>> {
        let (x0, y0) = self.cell_of(bounds.min_x, bounds.min_y);
        let (x1, y1) = self.cell_of(bounds.max_x, bounds.max_y);
        let span = (i64::from(x1) - i64::from(x0) + 1) * (i64::from(y1) - i64::from(y0) + 1);
        if span > MAX_CELLS_PER_ENTRY {
            return None;
        }
        let mut keys = SmallVec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                keys.push((cx, cy));
            }
        }
        Some(keys)
    }
}
