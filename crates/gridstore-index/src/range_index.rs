//! Two-dimensional range index
//!
//! Attaches any number of values to rectangular ranges and answers
//! range-exact lookup, "ranges containing cell C", "values attached to ranges
//! containing C", and "ranges holding value V".
//!
//! # Design
//!
//! Two ordered maps keyed by [`CellRef`] — `top_left` by begin corner and
//! `bottom_right` by end corner. Each primary entry holds a secondary ordered
//! map from the *opposite* corner to the value set; `top_left` orders the
//! opposite corner descending and `bottom_right` ascending, so a scan from
//! the query cell can stop as soon as the secondary ordering passes the cell.
//! This substitutes for an interval tree with nothing beyond the standard
//! balanced map. A third map tracks value → ranges for O(1) reverse lookup.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;

use ahash::{AHashMap, AHashSet};
use gridstore_core::{
    window, CellRef, Error, RangeRef, Result, SaveEvent, Store, WatcherHandle, WatcherHub,
    MAX_COLS,
};

/// Event fired when a value is attached to or detached from a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEvent<V> {
    /// The (normalized) range the value belongs to
    pub range: RangeRef,
    /// The value added or removed
    pub value: V,
}

/// The set of values sharing one fixed corner, keyed by the opposite corner.
///
/// `top_left` entries order the opposite corner descending (via [`Reverse`]),
/// `bottom_right` entries ascending.
type DescEntry<V> = BTreeMap<Reverse<CellRef>, AHashSet<V>>;
type AscEntry<V> = BTreeMap<CellRef, AHashSet<V>>;

/// Index attaching multi-valued sets to rectangular cell ranges
#[derive(Debug)]
pub struct RangeIndex<V> {
    /// Begin corner → entry keyed by end corner, descending
    top_left: BTreeMap<CellRef, DescEntry<V>>,
    /// End corner → entry keyed by begin corner, ascending
    bottom_right: BTreeMap<CellRef, AscEntry<V>>,
    /// Value → ranges holding it (reverse lookup)
    by_value: AHashMap<V, BTreeSet<RangeRef>>,
    on_add: WatcherHub<ValueEvent<V>>,
    on_remove: WatcherHub<ValueEvent<V>>,
    on_delete: WatcherHub<RangeRef>,
}

impl<V> Default for RangeIndex<V>
where
    V: Clone + Eq + Hash + Ord + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RangeIndex<V>
where
    V: Clone + Eq + Hash + Ord + 'static,
{
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            top_left: BTreeMap::new(),
            bottom_right: BTreeMap::new(),
            by_value: AHashMap::new(),
            on_add: WatcherHub::new(),
            on_remove: WatcherHub::new(),
            on_delete: WatcherHub::new(),
        }
    }

    /// Hub fired when a value is attached to a range
    pub fn on_add(&self) -> &WatcherHub<ValueEvent<V>> {
        &self.on_add
    }

    /// Hub fired when a value is detached from a range
    pub fn on_remove(&self) -> &WatcherHub<ValueEvent<V>> {
        &self.on_remove
    }

    /// Hub fired when a whole range entry is deleted
    pub fn on_delete(&self) -> &WatcherHub<RangeRef> {
        &self.on_delete
    }

    /// Values attached to exactly this range.
    ///
    /// Exact match only: a range that merely overlaps the query contributes
    /// nothing. Result is a defensive sorted snapshot.
    pub fn load(&self, range: &RangeRef) -> Vec<V> {
        let range = range.normalized();
        let mut values: Vec<V> = self
            .top_left
            .get(&range.begin)
            .and_then(|entry| entry.get(&Reverse(range.end)))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        values.sort();
        values
    }

    /// Attach a value to a range. Set semantics: attaching a value already
    /// present is a no-op and fires nothing. Returns whether state changed.
    pub fn add_value(&mut self, range: &RangeRef, value: V) -> bool {
        let range = range.normalized();

        let inserted = self
            .top_left
            .entry(range.begin)
            .or_default()
            .entry(Reverse(range.end))
            .or_default()
            .insert(value.clone());
        if !inserted {
            return false;
        }

        self.bottom_right
            .entry(range.end)
            .or_default()
            .entry(range.begin)
            .or_default()
            .insert(value.clone());
        self.by_value.entry(value.clone()).or_default().insert(range);

        self.on_add.accept(&ValueEvent { range, value });
        true
    }

    /// Swap `old` for `new` in a range's value set.
    ///
    /// No-op returning false when `new == old` or `old` is not attached.
    /// Mutation order is fixed: both corner entries first, the reverse index
    /// last, so a panicking value `Clone` can never leave the corner maps
    /// disagreeing with each other.
    pub fn replace_value(&mut self, range: &RangeRef, new: V, old: &V) -> bool {
        if new == *old {
            return false;
        }
        let range = range.normalized();

        let Some(values) = self
            .top_left
            .get_mut(&range.begin)
            .and_then(|entry| entry.get_mut(&Reverse(range.end)))
        else {
            return false;
        };
        if !values.remove(old) {
            return false;
        }
        let new_inserted = values.insert(new.clone());

        if let Some(values) = self
            .bottom_right
            .get_mut(&range.end)
            .and_then(|entry| entry.get_mut(&range.begin))
        {
            values.remove(old);
            values.insert(new.clone());
        }

        if let Some(ranges) = self.by_value.get_mut(old) {
            ranges.remove(&range);
            if ranges.is_empty() {
                self.by_value.remove(old);
            }
        }
        self.by_value.entry(new.clone()).or_default().insert(range);

        self.on_remove.accept(&ValueEvent {
            range,
            value: old.clone(),
        });
        // `new` may already have been attached; only an actual insertion is
        // a state change worth announcing.
        if new_inserted {
            self.on_add.accept(&ValueEvent { range, value: new });
        }
        true
    }

    /// Detach a value from a range. Removing an absent value is a no-op, not
    /// an error. An entry emptied of all values is deleted from its corner
    /// map. Returns whether state changed.
    pub fn remove_value(&mut self, range: &RangeRef, value: &V) -> bool {
        let range = range.normalized();

        let Some(entry) = self.top_left.get_mut(&range.begin) else {
            return false;
        };
        let Some(values) = entry.get_mut(&Reverse(range.end)) else {
            return false;
        };
        if !values.remove(value) {
            return false;
        }
        if values.is_empty() {
            entry.remove(&Reverse(range.end));
        }
        if entry.is_empty() {
            self.top_left.remove(&range.begin);
        }

        if let Some(entry) = self.bottom_right.get_mut(&range.end) {
            if let Some(values) = entry.get_mut(&range.begin) {
                values.remove(value);
                if values.is_empty() {
                    entry.remove(&range.begin);
                }
            }
            if entry.is_empty() {
                self.bottom_right.remove(&range.end);
            }
        }

        if let Some(ranges) = self.by_value.get_mut(value) {
            ranges.remove(&range);
            if ranges.is_empty() {
                self.by_value.remove(value);
            }
        }

        self.on_remove.accept(&ValueEvent {
            range,
            value: value.clone(),
        });
        true
    }

    /// All ranges containing the cell (inclusive), in range order
    pub fn find_ranges_with_cell(&self, cell: &CellRef) -> Vec<RangeRef> {
        let mut out = BTreeSet::new();
        self.scan_containing(cell, |range, _| {
            out.insert(range);
        });
        out.into_iter().collect()
    }

    /// Union of values attached to ranges containing the cell
    pub fn find_values_with_cell(&self, cell: &CellRef) -> Vec<V> {
        let mut out = BTreeSet::new();
        self.scan_containing(cell, |_, values| {
            out.extend(values.iter().cloned());
        });
        out.into_iter().collect()
    }

    /// All ranges holding a value (defensive copy from the reverse index)
    pub fn find_ranges_with_value(&self, value: &V) -> Vec<RangeRef> {
        self.by_value
            .get(value)
            .map(|ranges| ranges.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Delete a range entry and every value attached to it.
    ///
    /// Fires one delete event, and only if the range previously existed.
    pub fn delete(&mut self, range: &RangeRef) -> bool {
        let range = range.normalized();

        let Some(entry) = self.top_left.get_mut(&range.begin) else {
            return false;
        };
        let Some(removed) = entry.remove(&Reverse(range.end)) else {
            return false;
        };
        if entry.is_empty() {
            self.top_left.remove(&range.begin);
        }

        if let Some(entry) = self.bottom_right.get_mut(&range.end) {
            entry.remove(&range.begin);
            if entry.is_empty() {
                self.bottom_right.remove(&range.end);
            }
        }

        for value in &removed {
            if let Some(ranges) = self.by_value.get_mut(value) {
                ranges.remove(&range);
                if ranges.is_empty() {
                    self.by_value.remove(value);
                }
            }
        }

        self.on_delete.accept(&range);
        true
    }

    /// Total live (range, value) pairs — not the range count.
    ///
    /// O(entries): sums every entry's value-set size.
    pub fn count(&self) -> usize {
        self.top_left
            .values()
            .flat_map(|entry| entry.values())
            .map(|values| values.len())
            .sum()
    }

    /// Number of distinct ranges with at least one value
    pub fn range_count(&self) -> usize {
        self.top_left.values().map(|entry| entry.len()).sum()
    }

    /// A contiguous window of ranges in range order
    pub fn ranges(&self, offset: usize, count: usize) -> Vec<RangeRef> {
        window(self.iter_ranges(), offset, count)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.top_left.clear();
        self.bottom_right.clear();
        self.by_value.clear();
    }

    fn iter_ranges(&self) -> impl Iterator<Item = RangeRef> + '_ {
        self.top_left.iter().flat_map(|(begin, entry)| {
            // Within one begin corner, yield ends in ascending order so the
            // overall sequence is sorted like the RangeRef ordering.
            entry
                .keys()
                .rev()
                .map(move |end| RangeRef::new(*begin, end.0))
        })
    }

    /// Bounded scan of both corner maps for ranges containing `cell`.
    ///
    /// `top_left` is scanned only over begin corners at or above the query
    /// row; within an entry the descending end corners stop once they pass
    /// above the row. `bottom_right` mirrors this from below. Every candidate
    /// still gets the full containment test — the row bounds only prune.
    fn scan_containing(&self, cell: &CellRef, mut visit: impl FnMut(RangeRef, &AHashSet<V>)) {
        let cell = cell.normalized();

        let upper = CellRef::new(cell.row, MAX_COLS - 1);
        for (begin, entry) in self.top_left.range(..=upper) {
            for (&Reverse(end), values) in entry {
                if end.row < cell.row {
                    break;
                }
                let range = RangeRef::new(*begin, end);
                if range.contains(&cell) {
                    visit(range, values);
                }
            }
        }

        let lower = CellRef::new(cell.row, 0);
        for (end, entry) in self.bottom_right.range(lower..) {
            for (begin, values) in entry {
                if begin.row > cell.row {
                    break;
                }
                let range = RangeRef::new(*begin, *end);
                if range.contains(&cell) {
                    visit(range, values);
                }
            }
        }
    }

}

#[cfg(test)]
impl<V> RangeIndex<V>
where
    V: Clone + Eq + Hash + Ord + 'static + std::fmt::Debug,
{
    /// Check all invariants. Panics if any are violated.
    pub fn assert_consistent(&self) {
        // Both corner maps hold the same (range, value) pairs
        for (begin, entry) in &self.top_left {
            assert!(!entry.is_empty(), "empty entry stored for begin {}", begin);
            for (Reverse(end), values) in entry {
                assert!(
                    !values.is_empty(),
                    "empty value set stored for {}:{}",
                    begin,
                    end
                );
                let mirror = self
                    .bottom_right
                    .get(end)
                    .and_then(|e| e.get(begin))
                    .unwrap_or_else(|| panic!("missing bottom_right entry for {}:{}", begin, end));
                assert_eq!(values, mirror, "corner maps disagree for {}:{}", begin, end);

                let range = RangeRef::new(*begin, *end);
                for value in values {
                    assert!(
                        self.by_value
                            .get(value)
                            .is_some_and(|ranges| ranges.contains(&range)),
                        "reverse index missing {} for a stored value",
                        range
                    );
                }
            }
        }

        // Reverse index holds nothing beyond the corner maps
        for (_, ranges) in &self.by_value {
            assert!(!ranges.is_empty(), "empty range set in reverse index");
            for range in ranges {
                assert!(
                    self.top_left
                        .get(&range.begin)
                        .and_then(|e| e.get(&Reverse(range.end)))
                        .is_some(),
                    "reverse index references missing range {}",
                    range
                );
            }
        }
    }
}

impl<V> Store for RangeIndex<V>
where
    V: Clone + Eq + Hash + Ord + 'static,
{
    type Key = RangeRef;
    type Value = Vec<V>;

    /// Whole-value save has no meaning for a per-value index
    fn save(&mut self, _key: RangeRef, _value: Vec<V>) -> Result<()> {
        Err(Error::Unsupported(
            "RangeIndex attaches values individually; use add_value",
        ))
    }

    fn load(&self, key: &RangeRef) -> Result<Option<Vec<V>>> {
        let values = RangeIndex::load(self, key);
        Ok(if values.is_empty() { None } else { Some(values) })
    }

    fn delete(&mut self, key: &RangeRef) -> Result<bool> {
        Ok(RangeIndex::delete(self, key))
    }

    fn contains(&self, key: &RangeRef) -> bool {
        let key = key.normalized();
        self.top_left
            .get(&key.begin)
            .is_some_and(|entry| entry.contains_key(&Reverse(key.end)))
    }

    fn len(&self) -> usize {
        self.range_count()
    }

    fn keys(&self, offset: usize, count: usize) -> Vec<RangeRef> {
        self.ranges(offset, count)
    }

    fn values(&self, offset: usize, count: usize) -> Vec<Vec<V>> {
        window(
            self.iter_ranges().map(|range| RangeIndex::load(self, &range)),
            offset,
            count,
        )
    }

    fn watch_save(
        &self,
        _watcher: Box<dyn Fn(&SaveEvent<RangeRef, Vec<V>>)>,
    ) -> Result<WatcherHandle<SaveEvent<RangeRef, Vec<V>>>> {
        Err(Error::Unsupported(
            "RangeIndex never fires save; watch add/remove/delete instead",
        ))
    }
}
