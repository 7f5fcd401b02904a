// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Area-of-interest tracking for Echo.

This crate keeps mutual-visibility relations among moving 2D entities and
notifies each entity when another enters or leaves its interest region.

Structure:
- `SortedList`: slot-map-backed doubly linked list kept sorted by an injected
  order, with O(1) removal and local re-sorting.
- `AxisIndex`: one sorted list per axis (X, Z) with radius-bounded window
  scans that bump per-entity mark counters.
- `AoiManager`: enter / leave / move / adjust; combines the two 1D window
  scans into a 2D neighbor diff and fires `AoiObserver` callbacks.

Design notes:
- The interest region is the closed square `|dx| <= r && |dz| <= r`.
- Work per update scales with the entities inside the pivot's X and Z
  windows, never with the total population.
- Single-owner and synchronous: every mutation takes `&mut self`.
"]

/// Per-axis sweep index and window scans.
pub mod axis;
/// Manager configuration.
pub mod config;
/// Entity handles, capabilities and the observer trait.
pub mod entity;
/// The AOI manager and its adjust pass.
pub mod manager;
/// Sorted doubly linked list.
pub mod sorted_list;

pub use axis::{Axis, AxisEntry, AxisIndex, MarkTable};
pub use config::{AoiConfig, ConfigError};
pub use entity::{AoiObserver, Entity, EntityId, Interest};
pub use manager::{AdjustStats, AoiError, AoiManager, InvariantViolation};
pub use sorted_list::{NodeKey, SortOrder, SortedList};
