//! # Deferred Lists
//!
//! A list wrapper that supports modification while a consumer iterates it.
//!
//! Every mutation is applied to the *live* sequence straight away, so size and
//! membership queries are always current, and a cheap change record is queued.
//! The *materialized* (cached) sequence only changes when
//! [`DeferredList::flush_changes_to_cache`] replays the queued records in the
//! order they were issued. Render pipelines iterate the materialized sequence
//! and flush at the end of a frame.

use crate::{GridError, GridResult};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Ordering function recorded by a sort so the exact same ordering can be
/// replayed against the materialized sequence.
pub type Comparator<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

/// A single recorded mutation.
pub enum ListChange<T> {
    Add(T),
    Insert { index: usize, item: T },
    Replace { index: usize, item: T },
    RemoveItem(T),
    RemoveIndex(usize),
    Clear,
    Sort(Comparator<T>),
}

impl<T: PartialEq> ListChange<T> {
    /// Replays this change against `list`.
    ///
    /// Fails when the change cannot apply, which means changes were replayed
    /// against a sequence that did not see the same history as the live one.
    pub fn apply_to(self, list: &mut Vec<T>) -> GridResult<()> {
        match self {
            ListChange::Add(item) => list.push(item),
            ListChange::Insert { index, item } => {
                if index > list.len() {
                    return Err(replay_error("insert", index, list.len()));
                }
                list.insert(index, item);
            }
            ListChange::Replace { index, item } => match list.get_mut(index) {
                Some(slot) => *slot = item,
                None => return Err(replay_error("replace", index, list.len())),
            },
            ListChange::RemoveItem(item) => match list.iter().position(|x| *x == item) {
                Some(index) => {
                    list.remove(index);
                }
                None => {
                    return Err(GridError::InvalidOperation(
                        "replayed removal of an item missing from the cached list".to_string(),
                    ))
                }
            },
            ListChange::RemoveIndex(index) => {
                if index >= list.len() {
                    return Err(replay_error("remove", index, list.len()));
                }
                list.remove(index);
            }
            ListChange::Clear => list.clear(),
            ListChange::Sort(comparator) => list.sort_by(|a, b| comparator(a, b)),
        }
        Ok(())
    }
}

fn replay_error(op: &str, index: usize, len: usize) -> GridError {
    GridError::InvalidOperation(format!(
        "replayed {} at index {} against a cached list of length {}",
        op, index, len
    ))
}

impl<T: fmt::Debug> fmt::Debug for ListChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListChange::Add(item) => f.debug_tuple("Add").field(item).finish(),
            ListChange::Insert { index, item } => f
                .debug_struct("Insert")
                .field("index", index)
                .field("item", item)
                .finish(),
            ListChange::Replace { index, item } => f
                .debug_struct("Replace")
                .field("index", index)
                .field("item", item)
                .finish(),
            ListChange::RemoveItem(item) => f.debug_tuple("RemoveItem").field(item).finish(),
            ListChange::RemoveIndex(index) => f.debug_tuple("RemoveIndex").field(index).finish(),
            ListChange::Clear => f.write_str("Clear"),
            ListChange::Sort(_) => f.write_str("Sort"),
        }
    }
}

/// A list supporting modification-while-iteration through a change log.
///
/// # Examples
///
/// ```
/// use gridglyph::DeferredList;
///
/// let mut list = DeferredList::new();
/// list.add("surface");
/// list.add("tint");
/// assert_eq!(list.items(), &["surface", "tint"]);
/// assert!(list.cached().is_empty());
///
/// list.flush_changes_to_cache().unwrap();
/// assert_eq!(list.cached(), &["surface", "tint"]);
/// ```
pub struct DeferredList<T> {
    items: Vec<T>,
    cached: Vec<T>,
    changes: Vec<ListChange<T>>,
}

impl<T: Clone + PartialEq> DeferredList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cached: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// Creates an empty list with room for `capacity` items in both sequences.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            cached: Vec::with_capacity(capacity),
            changes: Vec::new(),
        }
    }

    /// The live sequence, reflecting every mutation issued so far.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The materialized sequence, as of the last flush.
    pub fn cached(&self) -> &[T] {
        &self.cached
    }

    /// Number of items in the live sequence.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the live sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of recorded changes waiting for a flush.
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    /// Appends `item` to the live list.
    pub fn add(&mut self, item: T) {
        self.items.push(item.clone());
        self.changes.push(ListChange::Add(item));
    }

    /// Inserts `item` at `index`; `index` may equal the live length.
    pub fn insert(&mut self, index: usize, item: T) -> GridResult<()> {
        if index > self.items.len() {
            return Err(GridError::OutOfRange {
                what: "insert",
                index,
                limit: self.items.len(),
            });
        }
        self.items.insert(index, item.clone());
        self.changes.push(ListChange::Insert { index, item });
        Ok(())
    }

    /// Replaces the item at `index`, returning the previous item.
    pub fn replace(&mut self, index: usize, item: T) -> GridResult<T> {
        let len = self.items.len();
        let slot = self.items.get_mut(index).ok_or(GridError::OutOfRange {
            what: "replace",
            index,
            limit: len,
        })?;
        let previous = std::mem::replace(slot, item.clone());
        self.changes.push(ListChange::Replace { index, item });
        Ok(previous)
    }

    /// Removes the first occurrence of `item`.
    ///
    /// Returns `false` without recording anything when the item is absent, so
    /// the replay never sees a removal it cannot honour.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.items.remove(index);
                self.changes.push(ListChange::RemoveItem(item.clone()));
                true
            }
            None => false,
        }
    }

    /// Removes and returns the live item at `index`.
    pub fn remove_at(&mut self, index: usize) -> GridResult<T> {
        if index >= self.items.len() {
            return Err(GridError::OutOfRange {
                what: "remove",
                index,
                limit: self.items.len(),
            });
        }
        let removed = self.items.remove(index);
        self.changes.push(ListChange::RemoveIndex(index));
        Ok(removed)
    }

    /// Empties the live list. The cached list empties on the next flush.
    pub fn clear(&mut self) {
        self.items.clear();
        self.changes.push(ListChange::Clear);
    }

    /// Sorts the live sequence with `compare` and records the same ordering.
    ///
    /// The sort is stable, so replaying it against an equal sequence always
    /// yields an equal result.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        let comparator: Comparator<T> = Rc::new(compare);
        self.items.sort_by(|a, b| comparator(a, b));
        self.changes.push(ListChange::Sort(comparator));
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|x| x == item)
    }

    /// Replays every recorded change, in issue order, against the cached
    /// sequence and clears the change log.
    ///
    /// The log is consumed even when a replay fails; a failure means the two
    /// sequences diverged and the list can no longer be trusted.
    pub fn flush_changes_to_cache(&mut self) -> GridResult<()> {
        if self.changes.is_empty() {
            return Ok(());
        }

        for change in self.changes.drain(..) {
            change.apply_to(&mut self.cached)?;
        }
        Ok(())
    }
}

impl<T: Clone + PartialEq + Ord + 'static> DeferredList<T> {
    /// Sorts the live sequence by the natural ordering of `T`.
    pub fn sort(&mut self) {
        self.sort_by(|a: &T, b: &T| a.cmp(b));
    }
}

impl<T: Clone + PartialEq> Default for DeferredList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq> FromIterator<T> for DeferredList<T> {
    /// Builds a list whose live and cached sequences both start with the
    /// collected items.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        Self {
            cached: items.clone(),
            items,
            changes: Vec::new(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DeferredList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredList")
            .field("items", &self.items)
            .field("cached", &self.cached)
            .field("pending", &self.changes.len())
            .finish()
    }
}
