//! The reference frame tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use nalgebra::Isometry3;
use tracing::{debug, trace, warn};

use crate::config::SpatialConfig;
use crate::error::{Error, Result};
use crate::transform::{BetweenFrames, FrameTransform};

/// Source of the tree ids stored in every [`FrameId`].
static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(0);

/// A frame tree shared between threads.
///
/// Readers take the read lock, and any change to the tree takes the write lock, which keeps at most
/// one mutation in flight.
pub type SharedFrameTree = Arc<RwLock<FrameTree>>;

/// Handle to a frame in a [`FrameTree`].
///
/// Handles are cheap to copy and never dangle: once their frame is removed they are reported as
/// stale, even when the slot has been reused by a newer frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    tree: u64,
    index: u32,
    generation: u32,
}

impl FrameId {
    fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Cached transform from a frame to the root.
#[derive(Debug, Clone)]
struct RootCache {
    transform: Isometry3<f64>,
    /// Versions of the frame and all of its ancestors, frame first.
    path: Vec<(FrameId, u64)>,
    /// The tree epoch at which `path` was last found to be current.
    epoch: u64,
}

#[derive(Debug)]
struct Frame {
    name: String,
    parent: Option<FrameId>,
    children: Vec<FrameId>,
    transform_to_parent: Isometry3<f64>,
    version: u64,
    cache: RwLock<Option<RootCache>>,
}

impl Frame {
    fn new(
        name: String,
        parent: Option<FrameId>,
        transform_to_parent: Isometry3<f64>,
        version: u64,
    ) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            transform_to_parent,
            version,
            cache: RwLock::new(None),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    frame: Option<Frame>,
}

/// A tree of reference frames, rooted in a single world frame.
///
/// Every frame stores its transform to its parent. Transforms between two arbitrary frames are
/// resolved through their lowest common ancestor from per-frame root transforms, which are cached
/// and only recomputed once the frame or one of its ancestors changed.
///
/// Queries take `&self` and can run from several threads at once. Anything that changes the tree
/// takes `&mut self`.
#[derive(Debug)]
pub struct FrameTree {
    id: u64,
    slots: Vec<Slot>,
    free: Vec<u32>,
    names: HashMap<String, FrameId>,
    world: FrameId,
    /// Bumped on every mutation, also used as the source of frame versions.
    epoch: u64,
    epsilon: f64,
}

impl Default for FrameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTree {
    /// Creates a tree with the default [`SpatialConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&SpatialConfig::default())
    }

    /// Creates a tree whose world frame is named `name`.
    #[must_use]
    pub fn with_world_name(name: impl Into<String>) -> Self {
        let mut config = SpatialConfig::default();
        config.tree.world_name = name.into();
        Self::with_config(&config)
    }

    /// Creates a tree with the world name and tolerance from `config`.
    #[must_use]
    pub fn with_config(config: &SpatialConfig) -> Self {
        let id = NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed);
        let world = FrameId {
            tree: id,
            index: 0,
            generation: 0,
        };
        let name = config.tree.world_name.clone();

        Self {
            id,
            slots: vec![Slot {
                generation: 0,
                frame: Some(Frame::new(name.clone(), None, Isometry3::identity(), 0)),
            }],
            free: Vec::new(),
            names: HashMap::from([(name, world)]),
            world,
            epoch: 0,
            epsilon: config.tolerance.epsilon,
        }
    }

    /// The root of the tree.
    #[must_use]
    pub fn world(&self) -> FrameId {
        self.world
    }

    /// Default tolerance for epsilon comparisons on values in this tree.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of frames in the tree, including the world frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`, the world frame cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `frame` refers to a live frame in this tree.
    #[must_use]
    pub fn contains(&self, frame: FrameId) -> bool {
        self.check_alive(frame).is_ok()
    }

    /// Checks that `frame` refers to a live frame in this tree.
    ///
    /// Fails with [`Error::UnknownFrame`] for handles from another tree and with
    /// [`Error::StaleFrameReference`] for handles to removed frames.
    pub fn check_alive(&self, frame: FrameId) -> Result<()> {
        self.get(frame).map(|_| ())
    }

    /// Iterates over all live frames, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.frame.as_ref().map(|_| FrameId {
                tree: self.id,
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    /// Looks up a frame by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<FrameId> {
        self.names.get(name).copied()
    }

    /// The name `frame` was created with.
    pub fn name(&self, frame: FrameId) -> Result<&str> {
        Ok(&self.get(frame)?.name)
    }

    /// The parent of `frame`, `None` for the world frame.
    pub fn parent(&self, frame: FrameId) -> Result<Option<FrameId>> {
        Ok(self.get(frame)?.parent)
    }

    /// The direct children of `frame`, in the order they were attached.
    pub fn children(&self, frame: FrameId) -> Result<Vec<FrameId>> {
        Ok(self.get(frame)?.children.clone())
    }

    /// Number of edges between `frame` and the world frame.
    pub fn depth(&self, frame: FrameId) -> Result<usize> {
        self.get(frame)?;
        Ok(self.ancestors(frame).count())
    }

    /// Whether `ancestor` lies strictly above `descendant`.
    pub fn is_ancestor(&self, ancestor: FrameId, descendant: FrameId) -> Result<bool> {
        self.get(ancestor)?;
        self.get(descendant)?;
        Ok(self.ancestors(descendant).any(|frame| frame == ancestor))
    }

    /// The deepest frame that is an ancestor of, or equal to, both `a` and `b`.
    ///
    /// Fails with [`Error::DisjointFrames`] when the handles belong to different trees, and with
    /// [`Error::StaleFrameReference`] when either frame was removed.
    pub fn lowest_common_ancestor(&self, a: FrameId, b: FrameId) -> Result<FrameId> {
        if a.tree != b.tree {
            return Err(Error::DisjointFrames { from: a, to: b });
        }

        let mut a_depth = self.depth(a)?;
        let mut b_depth = self.depth(b)?;
        let (mut a, mut b) = (a, b);

        while a_depth > b_depth {
            a = self.parent_of(a);
            a_depth -= 1;
        }
        while b_depth > a_depth {
            b = self.parent_of(b);
            b_depth -= 1;
        }
        while a != b {
            a = self.parent_of(a);
            b = self.parent_of(b);
        }

        Ok(a)
    }

    /// The transform mapping coordinates in `frame` into its parent.
    pub fn transform_to_parent(&self, frame: FrameId) -> Result<Isometry3<f64>> {
        Ok(self.get(frame)?.transform_to_parent)
    }

    /// The transform mapping coordinates in `frame` into world coordinates.
    pub fn transform_to_root(&self, frame: FrameId) -> Result<Isometry3<f64>> {
        self.get(frame)?;
        Ok(self.root_transform(frame))
    }

    /// Resolves the transform mapping coordinates in `from` into coordinates in `to`.
    ///
    /// The transform is composed through the lowest common ancestor of both frames. Transforming a
    /// frame into itself always yields the identity.
    pub fn transform(&self, from: FrameId, to: FrameId) -> Result<FrameTransform> {
        if from.tree != to.tree {
            return Err(Error::DisjointFrames { from, to });
        }
        self.get(from)?;
        self.get(to)?;

        if from == to {
            return Ok(BetweenFrames::new(from, to, Isometry3::identity()));
        }

        let lca = self.lowest_common_ancestor(from, to)?;
        let root_to_lca = self.root_transform(lca);
        let lca_from = root_to_lca.inv_mul(&self.root_transform(from));
        let lca_to = root_to_lca.inv_mul(&self.root_transform(to));

        Ok(BetweenFrames::new(from, to, lca_to.inv_mul(&lca_from)))
    }

    /// Adds a frame named `name` under `parent`.
    pub fn create_frame(
        &mut self,
        name: impl Into<String>,
        parent: FrameId,
        transform_to_parent: Isometry3<f64>,
    ) -> Result<FrameId> {
        let name = name.into();
        self.get(parent)?;
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateFrameName(name));
        }

        let version = self.bump_epoch();
        let frame = Frame::new(name.clone(), Some(parent), transform_to_parent, version);
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.frame = Some(frame);
                FrameId {
                    tree: self.id,
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    frame: Some(frame),
                });
                FrameId {
                    tree: self.id,
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };

        self.frame_mut(parent).children.push(id);
        self.names.insert(name, id);
        debug!(frame = %id, name = %self.frame(id).name, parent = %parent, "created frame");

        Ok(id)
    }

    /// Overwrites the transform from `frame` to its parent.
    ///
    /// Cached root transforms of `frame` and its descendants are invalidated lazily.
    pub fn set_transform_to_parent(
        &mut self,
        frame: FrameId,
        transform: Isometry3<f64>,
    ) -> Result<()> {
        self.get(frame)?;
        if frame == self.world {
            return Err(Error::RootFrame("moved"));
        }

        let version = self.bump_epoch();
        let record = self.frame_mut(frame);
        record.transform_to_parent = transform;
        record.version = version;
        debug!(frame = %frame, version, "updated transform to parent");

        Ok(())
    }

    /// Moves `frame` with its subtree under `new_parent`.
    ///
    /// Fails with [`Error::Cycle`] when `new_parent` is `frame` itself or one of its descendants.
    /// The tree is left untouched on failure.
    pub fn reparent(
        &mut self,
        frame: FrameId,
        new_parent: FrameId,
        transform_to_parent: Isometry3<f64>,
    ) -> Result<()> {
        self.get(frame)?;
        self.get(new_parent)?;
        if frame == self.world {
            return Err(Error::RootFrame("reparented"));
        }
        if frame == new_parent || self.ancestors(new_parent).any(|ancestor| ancestor == frame) {
            return Err(Error::Cycle {
                frame: self.frame(frame).name.clone(),
                parent: self.frame(new_parent).name.clone(),
            });
        }

        let old_parent = self.parent_of(frame);
        self.frame_mut(old_parent)
            .children
            .retain(|child| *child != frame);
        self.frame_mut(new_parent).children.push(frame);

        let version = self.bump_epoch();
        let record = self.frame_mut(frame);
        record.parent = Some(new_parent);
        record.transform_to_parent = transform_to_parent;
        record.version = version;
        debug!(frame = %frame, from = %old_parent, to = %new_parent, "reparented frame");

        Ok(())
    }

    /// Removes `frame` together with its whole subtree.
    ///
    /// Returns the handles of the removed frames, `frame` first. All of them are stale afterwards.
    pub fn remove_frame(&mut self, frame: FrameId) -> Result<Vec<FrameId>> {
        self.get(frame)?;
        if frame == self.world {
            return Err(Error::RootFrame("removed"));
        }

        let parent = self.parent_of(frame);
        self.frame_mut(parent)
            .children
            .retain(|child| *child != frame);

        let mut removed = Vec::new();
        let mut pending = vec![frame];
        while let Some(next) = pending.pop() {
            let record = self.release(next);
            pending.extend(record.children.iter().rev());
            removed.push(next);
        }

        self.bump_epoch();
        debug!(frame = %frame, count = removed.len(), "removed subtree");

        Ok(removed)
    }

    /// Removes `frame` alone and re-attaches its children to its parent.
    ///
    /// The children keep their transform to the root.
    pub fn remove_frame_keep_children(&mut self, frame: FrameId) -> Result<()> {
        self.get(frame)?;
        if frame == self.world {
            return Err(Error::RootFrame("removed"));
        }

        let parent = self.parent_of(frame);
        self.frame_mut(parent)
            .children
            .retain(|child| *child != frame);
        let record = self.release(frame);

        if !record.children.is_empty() {
            warn!(
                frame = %frame,
                name = %record.name,
                orphans = record.children.len(),
                "re-attaching children of removed frame to its parent"
            );
        }

        let version = self.bump_epoch();
        for child in &record.children {
            let child_record = self.frame_mut(*child);
            child_record.parent = Some(parent);
            child_record.transform_to_parent =
                record.transform_to_parent * child_record.transform_to_parent;
            child_record.version = version;
        }
        self.frame_mut(parent).children.extend(record.children);
        debug!(frame = %frame, "removed frame");

        Ok(())
    }

    fn get(&self, frame: FrameId) -> Result<&Frame> {
        if frame.tree != self.id {
            return Err(Error::UnknownFrame(frame));
        }

        let slot = self
            .slots
            .get(frame.index())
            .ok_or(Error::UnknownFrame(frame))?;

        match &slot.frame {
            Some(record) if slot.generation == frame.generation => Ok(record),
            _ => Err(Error::StaleFrameReference(frame)),
        }
    }

    /// Access to a frame that is known to be alive.
    fn frame(&self, frame: FrameId) -> &Frame {
        match &self.slots[frame.index()].frame {
            Some(record) => record,
            None => unreachable!("frame {frame} is not alive"),
        }
    }

    fn frame_mut(&mut self, frame: FrameId) -> &mut Frame {
        match &mut self.slots[frame.index()].frame {
            Some(record) => record,
            None => unreachable!("frame {frame} is not alive"),
        }
    }

    /// Parent of a live frame, the world frame is its own parent.
    fn parent_of(&self, frame: FrameId) -> FrameId {
        self.frame(frame).parent.unwrap_or(self.world)
    }

    /// Strict ancestors of a live frame, nearest first.
    fn ancestors(&self, frame: FrameId) -> impl Iterator<Item = FrameId> + '_ {
        std::iter::successors(self.frame(frame).parent, |ancestor| {
            self.frame(*ancestor).parent
        })
    }

    /// Frees the slot of a live frame, which makes all handles to it stale.
    fn release(&mut self, frame: FrameId) -> Frame {
        let slot = &mut self.slots[frame.index()];
        let Some(record) = slot.frame.take() else {
            unreachable!("frame {frame} is not alive");
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(frame.index);
        self.names.remove(&record.name);

        record
    }

    fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Whether `frame` is still alive with the given version.
    fn is_current(&self, frame: FrameId, version: u64) -> bool {
        self.get(frame)
            .is_ok_and(|record| record.version == version)
    }

    /// The transform of a live frame to the root, served from its cache when still valid.
    fn root_transform(&self, frame: FrameId) -> Isometry3<f64> {
        let record = self.frame(frame);
        if let Some(transform) = self.cached_root_transform(record) {
            return transform;
        }

        let mut path = vec![(frame, record.version)];
        let mut transform = record.transform_to_parent;
        for ancestor in self.ancestors(frame) {
            let ancestor_record = self.frame(ancestor);
            path.push((ancestor, ancestor_record.version));
            transform = ancestor_record.transform_to_parent * transform;
        }
        trace!(frame = %frame, depth = path.len() - 1, "recomputed root transform");

        *record.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(RootCache {
            transform,
            path,
            epoch: self.epoch,
        });

        transform
    }

    fn cached_root_transform(&self, record: &Frame) -> Option<Isometry3<f64>> {
        let guard = record.cache.read().unwrap_or_else(PoisonError::into_inner);
        let cache = guard.as_ref()?;
        if cache.epoch == self.epoch {
            return Some(cache.transform);
        }

        if !cache
            .path
            .iter()
            .all(|(frame, version)| self.is_current(*frame, *version))
        {
            return None;
        }
        let transform = cache.transform;
        drop(guard);

        // Readers racing on the same epoch all store the same value.
        if let Some(cache) = record
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            cache.epoch = self.epoch;
        }

        Some(transform)
    }
}
