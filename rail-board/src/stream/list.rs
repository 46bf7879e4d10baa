//! Ordered, deduplicated record list.
//!
//! `OrderedList` keeps each record next to the keys its policy derived, so
//! lookups never have to call back into the policy. Every mutation returns
//! the delta it caused; the caller forwards those to observers once the
//! mutation is complete.
//!
//! # Invariants
//!
//! - Effective times are non-decreasing from front to back.
//! - No two entries describe the same event (see [`RecordKeys::same_event`]).

use serde::Serialize;

use super::policy::RecordKeys;

/// A change to the list, in the shape a row-based view expects.
///
/// Ranges are inclusive, like the row notifications of list widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ListDelta {
    RowsInserted { first: usize, last: usize },
    RowsRemoved { first: usize, last: usize },
    /// The whole list was replaced.
    Reset,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    record: T,
    keys: RecordKeys,
}

/// Records kept in effective-time order.
#[derive(Debug, Clone)]
pub struct OrderedList<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> OrderedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).map(|e| &e.record)
    }

    pub fn keys(&self, index: usize) -> Option<&RecordKeys> {
        self.entries.get(index).map(|e| &e.keys)
    }

    pub fn first_keys(&self) -> Option<&RecordKeys> {
        self.entries.first().map(|e| &e.keys)
    }

    pub fn last_keys(&self) -> Option<&RecordKeys> {
        self.entries.last().map(|e| &e.keys)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Position an element with `effective` time would take.
    ///
    /// Linear scan from the front for the first entry that sorts strictly
    /// later, so equal times keep arrival order. Lists are a few dozen
    /// entries per request.
    pub fn insertion_index(&self, keys: &RecordKeys) -> usize {
        self.entries
            .iter()
            .position(|e| e.keys.effective > keys.effective)
            .unwrap_or(self.entries.len())
    }

    /// Index of the entry describing the same event, if any.
    pub fn find_event(&self, keys: &RecordKeys) -> Option<usize> {
        self.entries.iter().position(|e| e.keys.same_event(keys))
    }

    /// Insert at the ordered position.
    pub fn insert(&mut self, record: T, keys: RecordKeys) -> ListDelta {
        let index = self.insertion_index(&keys);
        self.entries.insert(index, Entry { record, keys });
        ListDelta::RowsInserted {
            first: index,
            last: index,
        }
    }

    /// Remove the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Option<(T, ListDelta)> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        Some((
            entry.record,
            ListDelta::RowsRemoved {
                first: index,
                last: index,
            },
        ))
    }

    /// Drop every entry. Returns `None` when there was nothing to drop.
    pub fn clear(&mut self) -> Option<ListDelta> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.clear();
        Some(ListDelta::Reset)
    }

    /// True if entries are in non-decreasing effective order.
    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].keys.effective <= w[1].keys.effective)
    }
}

impl<T: PartialEq> OrderedList<T> {
    /// Replace the whole list in one step.
    ///
    /// The incoming records are ordered stably by effective time and
    /// deduplicated, a later record superseding an earlier one for the same
    /// event. The list always takes the new records; the result is `None`
    /// only when both keys and records equal the previous content.
    pub fn replace_all(&mut self, records: Vec<(T, RecordKeys)>) -> Option<ListDelta> {
        let mut rebuilt: OrderedList<T> = OrderedList::new();
        for (record, keys) in records {
            if let Some(existing) = rebuilt.find_event(&keys) {
                rebuilt.entries.remove(existing);
            }
            rebuilt.insert(record, keys);
        }

        let unchanged = rebuilt.entries.len() == self.entries.len()
            && rebuilt
                .entries
                .iter()
                .zip(&self.entries)
                .all(|(a, b)| a.keys == b.keys && a.record == b.record);
        self.entries = rebuilt.entries;
        (!unchanged).then_some(ListDelta::Reset)
    }
}

impl<T: Clone> OrderedList<T> {
    /// Copy of the records, for handing to readers.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
