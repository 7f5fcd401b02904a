// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Doubly linked list kept sorted by an injected order.
//!
//! Nodes live in a [`SlotMap`] owned by the list; callers hold [`NodeKey`]
//! handles for O(1) removal and for incremental re-sorting after a node's
//! sort key changes.
//!
//! Invariant: walking head→tail never observes a pair `(a, b)` with
//! `!order.in_order(a, b)`. Every public mutation restores this before it
//! returns.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a node inside a [`SortedList`].
    pub struct NodeKey;
}

/// Ordering relation used by a [`SortedList`].
///
/// `in_order(a, b)` returns `true` when `a` may appear before `b`. For an
/// ascending list this is `a <= b`; descending lists flip the comparison.
pub trait SortOrder<T> {
    /// Returns `true` if `a` may precede `b`.
    fn in_order(&self, a: &T, b: &T) -> bool;
}

impl<T, F> SortOrder<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    fn in_order(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

#[derive(Debug, Clone)]
struct ListNode<T> {
    value: T,
    prev: Option<NodeKey>,
    next: Option<NodeKey>,
}

/// Sorted doubly linked list over slot-map storage.
#[derive(Debug, Clone)]
pub struct SortedList<T, O> {
    nodes: SlotMap<NodeKey, ListNode<T>>,
    head: Option<NodeKey>,
    tail: Option<NodeKey>,
    order: O,
}

impl<T, O: SortOrder<T>> SortedList<T, O> {
    /// Creates an empty list ordered by `order`.
    pub fn new(order: O) -> Self {
        Self::with_capacity(order, 0)
    }

    /// Creates an empty list with node storage for `capacity` entries.
    pub fn with_capacity(order: O, capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
            order,
        }
    }

    /// Number of linked nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the list holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node in order.
    #[must_use]
    pub fn head(&self) -> Option<NodeKey> {
        self.head
    }

    /// Last node in order.
    #[must_use]
    pub fn tail(&self) -> Option<NodeKey> {
        self.tail
    }

    /// Value stored at `key`.
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&T> {
        self.nodes.get(key).map(|n| &n.value)
    }

    /// Mutable value stored at `key`.
    ///
    /// Changing the sort key through this reference must be followed by
    /// [`SortedList::reposition`] before the list is traversed again.
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut T> {
        self.nodes.get_mut(key).map(|n| &mut n.value)
    }

    /// Successor of `key`.
    #[must_use]
    pub fn next(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.next)
    }

    /// Predecessor of `key`.
    #[must_use]
    pub fn prev(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.prev)
    }

    /// Iterates values head→tail.
    pub fn iter(&self) -> Iter<'_, T, O> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Returns `true` if every adjacent pair satisfies the order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        let mut prev: Option<&T> = None;
        for value in self.iter() {
            if let Some(p) = prev {
                if !self.order.in_order(p, value) {
                    return false;
                }
            }
            prev = Some(value);
        }
        true
    }

    /// Links `value` at its sorted position and returns its handle.
    ///
    /// Scans from the head while the current node may precede `value`, so
    /// equal keys keep insertion order. Worst case O(n).
    pub fn insert(&mut self, value: T) -> NodeKey {
        let mut before = self.head;
        while let Some(cursor) = before {
            let Some(node) = self.nodes.get(cursor) else {
                break;
            };
            if !self.order.in_order(&node.value, &value) {
                break;
            }
            before = node.next;
        }
        let key = self.nodes.insert(ListNode {
            value,
            prev: None,
            next: None,
        });
        self.link_before(key, before);
        self.debug_check_links(Some(key));
        key
    }

    /// Unlinks and returns the value at `key`. Stale or unknown keys are a no-op.
    pub fn remove(&mut self, key: NodeKey) -> Option<T> {
        if !self.nodes.contains_key(key) {
            return None;
        }
        self.unlink(key);
        let node = self.nodes.remove(key)?;
        self.debug_check_links(None);
        Some(node.value)
    }

    /// Restores order after the sort key of `key` changed.
    ///
    /// Walks from the node's current position towards the tail when
    /// `moved_forward` is set (towards the head otherwise), stopping at the
    /// first node the moved value may sit next to. Cost is proportional to
    /// the distance travelled, not the list length. Returns the number of
    /// nodes stepped over.
    pub fn reposition(&mut self, key: NodeKey, moved_forward: bool) -> usize {
        let Some(node) = self.nodes.get(key) else {
            return 0;
        };
        let value = &node.value;
        let mut steps = 0;
        if moved_forward {
            let mut cursor = node.next;
            while let Some(c) = cursor {
                let Some(other) = self.nodes.get(c) else {
                    break;
                };
                if !self.order.in_order(&other.value, value) {
                    break;
                }
                steps += 1;
                cursor = other.next;
            }
            if steps > 0 {
                self.unlink(key);
                self.link_before(key, cursor);
            }
        } else {
            let mut cursor = node.prev;
            while let Some(c) = cursor {
                let Some(other) = self.nodes.get(c) else {
                    break;
                };
                if self.order.in_order(&other.value, value) {
                    break;
                }
                steps += 1;
                cursor = other.prev;
            }
            if steps > 0 {
                self.unlink(key);
                self.link_after(key, cursor);
            }
        }
        self.debug_check_links(Some(key));
        steps
    }

    /// Splices a detached `key` immediately before `before` (or at the tail).
    fn link_before(&mut self, key: NodeKey, before: Option<NodeKey>) {
        let prev = match before {
            Some(b) => self.nodes.get(b).and_then(|n| n.prev),
            None => self.tail,
        };
        self.splice(key, prev, before);
    }

    /// Splices a detached `key` immediately after `after` (or at the head).
    fn link_after(&mut self, key: NodeKey, after: Option<NodeKey>) {
        let next = match after {
            Some(a) => self.nodes.get(a).and_then(|n| n.next),
            None => self.head,
        };
        self.splice(key, after, next);
    }

    fn splice(&mut self, key: NodeKey, prev: Option<NodeKey>, next: Option<NodeKey>) {
        debug_assert!(prev != Some(key) && next != Some(key), "node linked to itself");
        if let Some(node) = self.nodes.get_mut(key) {
            node.prev = prev;
            node.next = next;
        }
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.next = Some(key),
            None => self.head = Some(key),
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(n) => n.prev = Some(key),
            None => self.tail = Some(key),
        }
    }

    /// Detaches `key` from its neighbours and repairs head/tail. The node
    /// stays allocated.
    fn unlink(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
    }

    fn debug_check_links(&self, touched: Option<NodeKey>) {
        if !cfg!(debug_assertions) {
            return;
        }
        match self.len() {
            0 => debug_assert!(
                self.head.is_none() && self.tail.is_none(),
                "empty list still has head/tail"
            ),
            1 => debug_assert!(self.head.is_some() && self.head == self.tail),
            _ => {
                let head_next = self.head.and_then(|h| self.next(h));
                debug_assert!(head_next.is_some(), "head has no successor with len > 1");
            }
        }
        if let Some(node) = touched.and_then(|k| self.nodes.get(k)) {
            debug_assert!(
                node.prev != touched && node.next != touched,
                "node linked to itself"
            );
        }
    }
}

/// Head→tail iterator over a [`SortedList`].
pub struct Iter<'a, T, O> {
    list: &'a SortedList<T, O>,
    cursor: Option<NodeKey>,
}

impl<'a, T, O> Iterator for Iter<'a, T, O> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let node = self.list.nodes.get(key)?;
        self.cursor = node.next;
        Some(&node.value)
    }
}
