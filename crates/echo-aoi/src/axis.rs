// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One-dimensional sweep index over a single coordinate axis.
//!
//! Each [`AxisIndex`] keeps every entity sorted by its coordinate on one axis.
//! Radius queries walk outward from a pivot's neighbours and stop at the first
//! node with `|coord - pivot| > radius`, so a scan costs the number of
//! entities inside that slab rather than the population size.

use crate::entity::{EntityId, DOUBLY_MARKED};
use crate::sorted_list::{NodeKey, SortOrder, SortedList};

/// Spatial axis of the 2D plane.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Axis {
    /// Horizontal axis.
    X,
    /// Depth axis.
    Z,
}

/// Sorted entry: an entity and its coordinate on the index's axis.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AxisEntry {
    /// Entity owning this entry.
    pub entity: EntityId,
    /// Coordinate on the indexed axis.
    pub coord: f32,
}

/// Orders entries by coordinate, ascending.
#[derive(Clone, Copy, Default, Debug)]
pub struct CoordinateAscending;

impl SortOrder<AxisEntry> for CoordinateAscending {
    fn in_order(&self, a: &AxisEntry, b: &AxisEntry) -> bool {
        a.coord <= b.coord
    }
}

/// Access to per-entity mark counters used by the window scans.
pub trait MarkTable {
    /// Mutable mark counter of `entity`, if it is known.
    fn mark_mut(&mut self, entity: EntityId) -> Option<&mut i32>;
}

/// Sweep index for one axis.
#[derive(Debug, Clone)]
pub struct AxisIndex {
    axis: Axis,
    list: SortedList<AxisEntry, CoordinateAscending>,
}

impl AxisIndex {
    /// Empty index for `axis`.
    #[must_use]
    pub fn new(axis: Axis, capacity: usize) -> Self {
        Self {
            axis,
            list: SortedList::with_capacity(CoordinateAscending, capacity),
        }
    }

    /// Axis this index sorts by.
    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Entry behind `key`.
    #[must_use]
    pub fn entry(&self, key: NodeKey) -> Option<&AxisEntry> {
        self.list.get(key)
    }

    /// Entries in ascending coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = &AxisEntry> + '_ {
        self.list.iter()
    }

    /// Returns `true` if entries traverse in non-decreasing coordinate order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.list.is_sorted()
    }

    /// Indexes `entity` at `coord`.
    pub fn insert(&mut self, entity: EntityId, coord: f32) -> NodeKey {
        self.list.insert(AxisEntry { entity, coord })
    }

    /// Drops the entry behind `key`. Unknown keys are ignored.
    pub fn remove(&mut self, key: NodeKey) -> Option<AxisEntry> {
        self.list.remove(key)
    }

    /// Moves the entry behind `key` to `coord`, re-sorting locally.
    ///
    /// Returns the number of entries the node stepped over.
    pub fn move_to(&mut self, key: NodeKey, coord: f32) -> usize {
        let Some(entry) = self.list.get_mut(key) else {
            return 0;
        };
        let old = entry.coord;
        entry.coord = coord;
        if coord > old {
            self.list.reposition(key, true)
        } else if coord < old {
            self.list.reposition(key, false)
        } else {
            0
        }
    }

    /// Adds one to the mark of every entity within `radius` of the pivot.
    pub fn mark<M: MarkTable>(&self, pivot: NodeKey, radius: f32, marks: &mut M) -> usize {
        self.walk_window(pivot, radius, |entity| {
            if let Some(mark) = marks.mark_mut(entity) {
                *mark += 1;
            }
        })
    }

    /// Resets the mark of every entity within `radius` of the pivot.
    pub fn clear_mark<M: MarkTable>(&self, pivot: NodeKey, radius: f32, marks: &mut M) -> usize {
        self.walk_window(pivot, radius, |entity| {
            if let Some(mark) = marks.mark_mut(entity) {
                *mark = 0;
            }
        })
    }

    /// Reports every entity in the window whose mark shows it inside the
    /// window on both axes, resetting every visited mark to 0.
    pub fn collect_doubly_marked<M, F>(
        &self,
        pivot: NodeKey,
        radius: f32,
        marks: &mut M,
        mut on_new: F,
    ) -> usize
    where
        M: MarkTable,
        F: FnMut(EntityId),
    {
        self.walk_window(pivot, radius, |entity| {
            if let Some(mark) = marks.mark_mut(entity) {
                if *mark == DOUBLY_MARKED {
                    on_new(entity);
                }
                *mark = 0;
            }
        })
    }

    /// Visits entries adjacent to `pivot` whose coordinate lies in the closed
    /// window around it, walking backward then forward. The pivot itself is
    /// not visited. Returns the visit count.
    ///
    /// The test is `|coord - pivot| <= radius` on the difference, which is
    /// exact under negation, so two entities with equal radii always agree
    /// on whether they see each other.
    fn walk_window<F: FnMut(EntityId)>(&self, pivot: NodeKey, radius: f32, mut visit: F) -> usize {
        let Some(center) = self.list.get(pivot) else {
            return 0;
        };
        let origin = center.coord;
        let inside = |coord: f32| (coord - origin).abs() <= radius;
        let mut visited = 0;

        let mut cursor = self.list.prev(pivot);
        while let Some(key) = cursor {
            let Some(entry) = self.list.get(key) else {
                break;
            };
            if !inside(entry.coord) {
                break;
            }
            visit(entry.entity);
            visited += 1;
            cursor = self.list.prev(key);
        }

        let mut cursor = self.list.next(pivot);
        while let Some(key) = cursor {
            let Some(entry) = self.list.get(key) else {
                break;
            };
            if !inside(entry.coord) {
                break;
            }
            visit(entry.entity);
            visited += 1;
            cursor = self.list.next(key);
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use slotmap::SlotMap;

    #[derive(Default)]
    struct Marks(FxHashMap<EntityId, i32>);

    impl MarkTable for Marks {
        fn mark_mut(&mut self, entity: EntityId) -> Option<&mut i32> {
            Some(self.0.entry(entity).or_insert(0))
        }
    }

    fn ids(n: usize) -> Vec<EntityId> {
        let mut slots: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..n).map(|_| slots.insert(())).collect()
    }

    #[test]
    fn mark_window_is_closed_and_excludes_pivot() {
        let e = ids(5);
        let mut index = AxisIndex::new(Axis::X, 5);
        let coords = [-10.0, -5.0, 0.0, 5.0, 5.5];
        let keys: Vec<_> = e.iter().zip(coords).map(|(id, c)| index.insert(*id, c)).collect();

        let mut marks = Marks::default();
        let visited = index.mark(keys[2], 5.0, &mut marks);
        assert_eq!(visited, 2);
        assert_eq!(marks.0.get(&e[1]), Some(&1));
        assert_eq!(marks.0.get(&e[3]), Some(&1));
        assert_eq!(marks.0.get(&e[0]), None);
        assert_eq!(marks.0.get(&e[2]), None);
        assert_eq!(marks.0.get(&e[4]), None);
    }

    #[test]
    fn collect_doubly_marked_reports_twos_and_zeroes_window() {
        let e = ids(3);
        let mut index = AxisIndex::new(Axis::Z, 3);
        let pivot = index.insert(e[0], 0.0);
        index.insert(e[1], 1.0);
        index.insert(e[2], 2.0);

        let mut marks = Marks::default();
        marks.0.insert(e[1], 2);
        marks.0.insert(e[2], 1);
        let mut found = Vec::new();
        index.collect_doubly_marked(pivot, 3.0, &mut marks, |id| found.push(id));
        assert_eq!(found, vec![e[1]]);
        assert!(marks.0.values().all(|m| *m == 0));
    }

    #[test]
    fn move_to_resorts_in_both_directions() {
        let e = ids(4);
        let mut index = AxisIndex::new(Axis::X, 4);
        let keys: Vec<_> = e
            .iter()
            .enumerate()
            .map(|(i, id)| index.insert(*id, i as f32))
            .collect();
        assert_eq!(index.move_to(keys[0], 10.0), 3);
        assert_eq!(index.move_to(keys[3], -1.0), 2);
        assert_eq!(index.move_to(keys[1], 1.0), 0);
        let order: Vec<EntityId> = index.iter().map(|entry| entry.entity).collect();
        assert_eq!(order, vec![e[3], e[1], e[2], e[0]]);
        assert!(index.is_sorted());
    }

    #[test]
    fn window_membership_is_symmetric_off_grid() {
        let e = ids(2);
        let mut index = AxisIndex::new(Axis::X, 2);
        let a = index.insert(e[0], 0.1);
        let b = index.insert(e[1], 10.1);

        let mut from_a = Marks::default();
        let mut from_b = Marks::default();
        let seen_by_a = index.mark(a, 10.0, &mut from_a);
        let seen_by_b = index.mark(b, 10.0, &mut from_b);
        assert_eq!(seen_by_a, seen_by_b);
        assert_eq!(from_a.0.get(&e[1]).is_some(), from_b.0.get(&e[0]).is_some());
    }

    #[test]
    fn nan_radius_visits_nothing() {
        let e = ids(3);
        let mut index = AxisIndex::new(Axis::Z, 3);
        let pivot = index.insert(e[0], 0.0);
        index.insert(e[1], 1.0);
        index.insert(e[2], 5_000.0);
        let mut marks = Marks::default();
        assert_eq!(index.mark(pivot, f32::NAN, &mut marks), 0);
        assert!(marks.0.is_empty());
    }
}
