// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Area-of-interest manager.
//!
//! The manager owns every entered entity and keeps two [`AxisIndex`]es (X and
//! Z) in sync with their positions. After each enter, leave or move it runs
//! [`AoiManager::adjust`] on the affected entity, which turns two 1D window
//! scans into a 2D neighbor diff:
//!
//! 1. Mark the X window, then the Z window, around the pivot. Entities inside
//!    both end with a mark of 2, i.e. they lie in the closed square of
//!    half-side `radius` centred on the pivot.
//! 2. Walk the pivot's known neighbors. A mark of 2 confirms the neighbor (the
//!    mark flips to a sentinel so step 3 skips it); anything else breaks the
//!    pair and fires leave notifications on both sides.
//! 3. Re-walk the X window. Entities still marked 2 are new neighbors; the pair
//!    is joined and enter notifications fire on both sides. Every visited mark
//!    is reset.
//! 4. Re-walk the Z window and zero the remaining marks.
//!
//! The interest region is the Chebyshev square, not a disc. The window
//! always uses the pivot's own radius; with mixed radii a pair therefore
//! reflects whichever side adjusted last.

use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::axis::{Axis, AxisIndex, MarkTable};
use crate::config::{AoiConfig, ConfigError};
use crate::entity::{
    AoiObserver, Entity, EntityId, EntityRecord, SpatialNode, CONFIRMED, DOUBLY_MARKED,
};

/// Recoverable errors of the manager API.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AoiError {
    /// The handle does not refer to an entered entity.
    #[error("unknown entity: {0:?}")]
    UnknownEntity(EntityId),
    /// A position component is NaN or infinite.
    #[error("invalid coordinate: ({x}, {z})")]
    InvalidCoordinate {
        /// Rejected X value.
        x: f32,
        /// Rejected Z value.
        z: f32,
    },
}

/// Broken internal invariant reported by [`AoiManager::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// An axis index traverses out of coordinate order.
    #[error("axis {0:?} is not sorted")]
    Unsorted(Axis),
    /// An axis holds a different number of entries than there are entities.
    #[error("axis {axis:?} indexes {indexed} entries for {entities} entities")]
    AxisSizeMismatch {
        /// Offending axis.
        axis: Axis,
        /// Entries in the axis.
        indexed: usize,
        /// Entered entities.
        entities: usize,
    },
    /// An entity is missing its entry on an axis, or the entry is out of date.
    #[error("entity {entity:?} has no matching entry on axis {axis:?}")]
    AxisEntryMismatch {
        /// Offending entity.
        entity: EntityId,
        /// Axis checked.
        axis: Axis,
    },
    /// `a` lists `b` as a neighbor but not the other way round.
    #[error("neighbor relation {a:?} -> {b:?} is not mutual")]
    Asymmetric {
        /// Entity holding the one-sided relation.
        a: EntityId,
        /// Entity missing the back-reference.
        b: EntityId,
    },
    /// An entity lists itself as a neighbor.
    #[error("entity {0:?} lists itself as a neighbor")]
    SelfNeighbor(EntityId),
    /// A mark counter survived an adjust pass.
    #[error("entity {entity:?} has stale mark {mark}")]
    StaleMark {
        /// Offending entity.
        entity: EntityId,
        /// Leftover counter value.
        mark: i32,
    },
}

/// Work and transition counts of one adjust pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdjustStats {
    /// Axis nodes visited across the four window walks.
    pub visited: usize,
    /// Axis nodes stepped over while re-sorting a moved entity.
    pub resorted: usize,
    /// Pairs joined (one per new neighbor).
    pub entered: usize,
    /// Pairs broken (one per lost neighbor).
    pub left: usize,
}

impl<T> MarkTable for SlotMap<EntityId, EntityRecord<T>> {
    fn mark_mut(&mut self, entity: EntityId) -> Option<&mut i32> {
        self.get_mut(entity).map(|record| &mut record.node.mark)
    }
}

/// Incremental 2D area-of-interest index.
///
/// All mutation goes through `&mut self`, so a manager is driven by one
/// owner at a time. Observer callbacks run inside the call that triggered
/// them and cannot reach back into the manager.
#[derive(Debug)]
pub struct AoiManager<T> {
    entities: SlotMap<EntityId, EntityRecord<T>>,
    x_axis: AxisIndex,
    z_axis: AxisIndex,
    config: AoiConfig,
    last_adjust: AdjustStats,
}

impl<T: AoiObserver> Default for AoiManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AoiObserver> AoiManager<T> {
    /// Manager with [`AoiConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::build(AoiConfig::default())
    }

    /// Manager with a validated custom config.
    pub fn with_config(config: AoiConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AoiConfig) -> Self {
        Self {
            entities: SlotMap::with_capacity_and_key(config.initial_capacity),
            x_axis: AxisIndex::new(Axis::X, config.initial_capacity),
            z_axis: AxisIndex::new(Axis::Z, config.initial_capacity),
            config,
            last_adjust: AdjustStats::default(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    /// Number of entered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when no entity is entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if `id` refers to an entered entity.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Entered entity behind `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity<T>> {
        self.entities.get(id).map(|record| &record.entity)
    }

    /// Mutable access to an entered entity (payload, radius, interest).
    ///
    /// Radius or interest changes take effect on the next
    /// [`AoiManager::adjust`] of that entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<T>> {
        self.entities.get_mut(id).map(|record| &mut record.entity)
    }

    /// Current `(x, z)` of `id`.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<(f32, f32)> {
        self.get(id).map(Entity::position)
    }

    /// Handles of all entered entities.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys()
    }

    /// Current neighbors of `id`; empty for unknown handles.
    pub fn neighbors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .get(id)
            .into_iter()
            .flat_map(|record| record.node.neighbors.iter().copied())
    }

    /// Number of current neighbors of `id`.
    #[must_use]
    pub fn neighbor_count(&self, id: EntityId) -> usize {
        self.entities
            .get(id)
            .map_or(0, |record| record.node.neighbors.len())
    }

    /// Returns `true` if `a` currently lists `b` as a neighbor.
    #[must_use]
    pub fn is_neighbor(&self, a: EntityId, b: EntityId) -> bool {
        self.entities
            .get(a)
            .is_some_and(|record| record.node.neighbors.contains(&b))
    }

    /// Entities in ascending coordinate order along `axis`.
    #[must_use]
    pub fn axis_order(&self, axis: Axis) -> Vec<EntityId> {
        self.axis(axis).iter().map(|entry| entry.entity).collect()
    }

    /// Stats of the most recent adjust pass.
    #[must_use]
    pub fn last_adjust(&self) -> AdjustStats {
        self.last_adjust
    }

    fn axis(&self, axis: Axis) -> &AxisIndex {
        match axis {
            Axis::X => &self.x_axis,
            Axis::Z => &self.z_axis,
        }
    }

    /// Enters `entity` at `(x, z)` and establishes its initial neighbors.
    ///
    /// An entity without a positive finite radius gets the configured
    /// default radius.
    pub fn enter(&mut self, mut entity: Entity<T>, x: f32, z: f32) -> Result<EntityId, AoiError> {
        ensure_finite(x, z)?;
        if !usable_radius(entity.radius()) {
            entity.set_radius(self.config.default_radius);
        }
        entity.set_position(x, z);

        let id = self.entities.insert(EntityRecord {
            entity,
            node: SpatialNode::default(),
        });
        let x_key = self.x_axis.insert(id, x);
        let z_key = self.z_axis.insert(id, z);
        if let Some(record) = self.entities.get_mut(id) {
            record.node.x_key = Some(x_key);
            record.node.z_key = Some(z_key);
        }

        let stats = self.adjust(id)?;
        debug!(entity = ?id, x, z, neighbors = stats.entered, "aoi enter");
        Ok(id)
    }

    /// Removes `id`, notifies every current neighbor, and returns the entity.
    pub fn leave(&mut self, id: EntityId) -> Result<Entity<T>, AoiError> {
        let record = self
            .entities
            .get_mut(id)
            .ok_or(AoiError::UnknownEntity(id))?;
        let x_key = record.node.x_key.take();
        let z_key = record.node.z_key.take();
        // Unlink first: with no axis entries the pivot marks nothing, so every
        // known neighbor fails confirmation in the adjust below.
        if let Some(key) = x_key {
            self.x_axis.remove(key);
        }
        if let Some(key) = z_key {
            self.z_axis.remove(key);
        }
        let stats = self.adjust(id)?;

        let record = self
            .entities
            .remove(id)
            .ok_or(AoiError::UnknownEntity(id))?;
        debug_assert!(
            record.node.neighbors.is_empty(),
            "entity left with neighbors"
        );
        debug!(entity = ?id, neighbors = stats.left, "aoi leave");
        Ok(record.entity)
    }

    /// Moves `id` to `(x, z)` and re-evaluates its neighbors.
    #[allow(clippy::float_cmp)]
    pub fn moved(&mut self, id: EntityId, x: f32, z: f32) -> Result<AdjustStats, AoiError> {
        ensure_finite(x, z)?;
        let record = self
            .entities
            .get_mut(id)
            .ok_or(AoiError::UnknownEntity(id))?;
        let (old_x, old_z) = record.entity.position();
        record.entity.set_position(x, z);
        let (x_key, z_key) = (record.node.x_key, record.node.z_key);

        let mut resorted = 0;
        if x != old_x {
            if let Some(key) = x_key {
                resorted += self.x_axis.move_to(key, x);
            }
        }
        if z != old_z {
            if let Some(key) = z_key {
                resorted += self.z_axis.move_to(key, z);
            }
        }
        // One axis alone can change 2D overlap, so always adjust.
        let mut stats = self.adjust(id)?;
        stats.resorted = resorted;
        self.last_adjust = stats;
        Ok(stats)
    }

    /// Recomputes the neighbor set of `id` against the current index.
    ///
    /// Call after changing an entity's radius or interest directly. A radius
    /// that is not positive and finite is replaced by the configured default,
    /// as on enter.
    pub fn adjust(&mut self, id: EntityId) -> Result<AdjustStats, AoiError> {
        let default_radius = self.config.default_radius;
        let record = self
            .entities
            .get_mut(id)
            .ok_or(AoiError::UnknownEntity(id))?;
        let mut radius = record.entity.radius();
        if !usable_radius(radius) {
            warn!(entity = ?id, radius, default_radius, "aoi radius replaced");
            radius = default_radius;
            record.entity.set_radius(radius);
        }
        let (x_key, z_key) = (record.node.x_key, record.node.z_key);
        let known: Vec<EntityId> = record.node.neighbors.iter().copied().collect();
        let mut stats = AdjustStats::default();

        if let Some(key) = x_key {
            stats.visited += self.x_axis.mark(key, radius, &mut self.entities);
        }
        if let Some(key) = z_key {
            stats.visited += self.z_axis.mark(key, radius, &mut self.entities);
        }

        for other in known {
            let confirmed = match self.entities.mark_mut(other) {
                Some(mark) if *mark == DOUBLY_MARKED => {
                    *mark = CONFIRMED;
                    true
                }
                _ => false,
            };
            if !confirmed {
                self.break_pair(id, other);
                stats.left += 1;
            }
        }

        let mut fresh = Vec::new();
        if let Some(key) = x_key {
            stats.visited +=
                self.x_axis
                    .collect_doubly_marked(key, radius, &mut self.entities, |other| {
                        fresh.push(other);
                    });
        }
        for other in fresh {
            self.join_pair(id, other);
            stats.entered += 1;
        }

        if let Some(key) = z_key {
            stats.visited += self.z_axis.clear_mark(key, radius, &mut self.entities);
        }

        trace!(
            entity = ?id,
            radius,
            visited = stats.visited,
            entered = stats.entered,
            left = stats.left,
            "aoi adjust"
        );
        self.last_adjust = stats;
        Ok(stats)
    }

    fn join_pair(&mut self, a: EntityId, b: EntityId) {
        debug_assert_ne!(a, b, "entity paired with itself");
        if let Some(record) = self.entities.get_mut(a) {
            record.node.neighbors.insert(b);
        }
        if let Some(record) = self.entities.get_mut(b) {
            record.node.neighbors.insert(a);
        }
        self.notify(a, b, true);
        self.notify(b, a, true);
    }

    fn break_pair(&mut self, a: EntityId, b: EntityId) {
        if let Some(record) = self.entities.get_mut(a) {
            record.node.neighbors.remove(&b);
        }
        if let Some(record) = self.entities.get_mut(b) {
            record.node.neighbors.remove(&a);
        }
        self.notify(a, b, false);
        self.notify(b, a, false);
    }

    fn notify(&mut self, me: EntityId, other: EntityId, entered: bool) {
        let Some(record) = self.entities.get_mut(me) else {
            return;
        };
        let interest = record.entity.interest();
        if entered && interest.notify_enter {
            record.entity.payload.on_enter_aoi(me, other);
        } else if !entered && interest.notify_leave {
            record.entity.payload.on_leave_aoi(me, other);
        }
    }

    /// Checks every structural invariant of the index.
    ///
    /// O(n + total neighbors); meant for tests and debugging tools.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for axis in [Axis::X, Axis::Z] {
            let index = self.axis(axis);
            if !index.is_sorted() {
                return Err(InvariantViolation::Unsorted(axis));
            }
            if index.len() != self.entities.len() {
                return Err(InvariantViolation::AxisSizeMismatch {
                    axis,
                    indexed: index.len(),
                    entities: self.entities.len(),
                });
            }
        }

        for (id, record) in &self.entities {
            let (x, z) = record.entity.position();
            for (axis, node_key, coord) in [
                (Axis::X, record.node.x_key, x),
                (Axis::Z, record.node.z_key, z),
            ] {
                let entry = node_key.and_then(|k| self.axis(axis).entry(k));
                let matches =
                    entry.is_some_and(|e| e.entity == id && e.coord.total_cmp(&coord).is_eq());
                if !matches {
                    return Err(InvariantViolation::AxisEntryMismatch { entity: id, axis });
                }
            }
            if record.node.mark != 0 {
                return Err(InvariantViolation::StaleMark {
                    entity: id,
                    mark: record.node.mark,
                });
            }
            for &other in &record.node.neighbors {
                if other == id {
                    return Err(InvariantViolation::SelfNeighbor(id));
                }
                if !self.is_neighbor(other, id) {
                    return Err(InvariantViolation::Asymmetric { a: id, b: other });
                }
            }
        }
        Ok(())
    }
}

fn usable_radius(radius: f32) -> bool {
    radius.is_finite() && radius > 0.0
}

fn ensure_finite(x: f32, z: f32) -> Result<(), AoiError> {
    if x.is_finite() && z.is_finite() {
        Ok(())
    } else {
        Err(AoiError::InvalidCoordinate { x, z })
    }
}
