// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entity handles, interest capabilities and per-entity spatial bookkeeping.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::sorted_list::NodeKey;

new_key_type! {
    /// Handle to an entity registered with an [`AoiManager`](crate::AoiManager).
    ///
    /// Handles are generational: once the entity leaves, the handle never
    /// resolves again, even if its slot is reused.
    pub struct EntityId;
}

/// Which notifications an entity wants to receive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Interest {
    /// Deliver [`AoiObserver::on_enter_aoi`] when another entity becomes visible.
    pub notify_enter: bool,
    /// Deliver [`AoiObserver::on_leave_aoi`] when another entity stops being visible.
    pub notify_leave: bool,
}

impl Default for Interest {
    fn default() -> Self {
        Self::ALL
    }
}

impl Interest {
    /// Both notifications enabled.
    pub const ALL: Self = Self {
        notify_enter: true,
        notify_leave: true,
    };
    /// No notifications; the entity is still visible to others.
    pub const NONE: Self = Self {
        notify_enter: false,
        notify_leave: false,
    };
}

/// Notification sink implemented by entity payloads.
///
/// Callbacks fire synchronously inside the manager's adjust pass, once per
/// pair transition and once per side. `me` is the entity being notified and
/// `other` the entity that entered or left its area of interest.
pub trait AoiObserver {
    /// `other` entered the area of interest of `me`.
    fn on_enter_aoi(&mut self, me: EntityId, other: EntityId) {
        let _ = (me, other);
    }

    /// `other` left the area of interest of `me`.
    fn on_leave_aoi(&mut self, me: EntityId, other: EntityId) {
        let _ = (me, other);
    }
}

impl AoiObserver for () {}

/// Caller-facing entity: position, interest radius, capabilities and payload.
///
/// Built by the caller, moved into the manager on enter and handed back on
/// leave.
#[derive(Clone, Debug)]
pub struct Entity<T> {
    /// User payload; receives the AOI notifications.
    pub payload: T,
    x: f32,
    z: f32,
    radius: f32,
    interest: Interest,
}

impl<T> Entity<T> {
    /// New entity with no explicit radius (the manager assigns its default)
    /// and both notifications enabled.
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            x: 0.0,
            z: 0.0,
            radius: 0.0,
            interest: Interest::ALL,
        }
    }

    /// Sets the interest radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the notification capabilities.
    #[must_use]
    pub fn with_interest(mut self, interest: Interest) -> Self {
        self.interest = interest;
        self
    }

    /// Current `(x, z)` position.
    #[must_use]
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.z)
    }

    /// Interest radius (half the side of the square region).
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Changes the interest radius. Call `AoiManager::adjust` afterwards to
    /// re-evaluate neighbors.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    /// Notification capabilities.
    #[must_use]
    pub fn interest(&self) -> Interest {
        self.interest
    }

    /// Changes the notification capabilities.
    pub fn set_interest(&mut self, interest: Interest) {
        self.interest = interest;
    }

    pub(crate) fn set_position(&mut self, x: f32, z: f32) {
        self.x = x;
        self.z = z;
    }
}

/// Mark counter value meaning "within the window on both axes".
pub(crate) const DOUBLY_MARKED: i32 = 2;
/// Sentinel for a known neighbor confirmed during the diff phase.
pub(crate) const CONFIRMED: i32 = -1;

/// Per-entity index bookkeeping, alive from enter to leave.
#[derive(Debug, Default)]
pub(crate) struct SpatialNode {
    pub(crate) x_key: Option<NodeKey>,
    pub(crate) z_key: Option<NodeKey>,
    /// Transient; zero outside an adjust pass.
    pub(crate) mark: i32,
    pub(crate) neighbors: FxHashSet<EntityId>,
}

/// Slot-map record: the caller's entity plus its spatial node.
#[derive(Debug)]
pub(crate) struct EntityRecord<T> {
    pub(crate) entity: Entity<T>,
    pub(crate) node: SpatialNode,
}
