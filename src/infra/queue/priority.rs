//! Priority selector over an insertion-ordered sequence.
//!
//! Entries are appended in O(1) and never reordered. Selection scans every
//! entry once and keeps the first one that carries the highest priority, so
//! equal priorities come out in insertion (FIFO) order. Extraction and peek
//! are O(n).

use super::sequence::Sequence;

/// A value stored alongside its priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityEntry<T> {
    /// Stored value.
    pub value: T,
    /// Priority; higher runs first.
    pub priority: i64,
}

/// Priority selector with FIFO tie-breaking.
#[derive(Debug, Clone)]
pub struct PrioritySelector<T> {
    entries: Sequence<PriorityEntry<T>>,
}

impl<T> PrioritySelector<T> {
    /// Create an empty selector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Sequence::new(),
        }
    }

    /// Append a value. No reordering happens here.
    pub fn insert(&mut self, value: T, priority: i64) {
        self.entries.push(PriorityEntry { value, priority });
    }

    /// Index of the first entry holding the maximum priority.
    fn highest_index(&self) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            // strict `>` keeps the earliest entry among ties
            match best {
                Some((_, max)) if entry.priority <= max => {}
                _ => best = Some((idx, entry.priority)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Remove and return the highest-priority value.
    ///
    /// The remaining entries keep their original relative order.
    pub fn extract_highest(&mut self) -> Option<T> {
        self.extract_highest_entry().map(|entry| entry.value)
    }

    /// Like [`extract_highest`](Self::extract_highest) but also returns the priority.
    pub fn extract_highest_entry(&mut self) -> Option<PriorityEntry<T>> {
        let idx = self.highest_index()?;
        self.entries.remove_at(idx)
    }

    /// Borrow the value that [`extract_highest`](Self::extract_highest) would return.
    #[must_use]
    pub fn peek_highest(&self) -> Option<&T> {
        let idx = self.highest_index()?;
        self.entries.iter().nth(idx).map(|entry| &entry.value)
    }

    /// Move every entry out in insertion order, leaving the selector empty.
    pub fn drain_all(&mut self) -> Vec<(T, i64)> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|entry| (entry.value, entry.priority))
            .collect()
    }

    /// Insert every `(value, priority)` pair in the given order.
    pub fn import_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (T, i64)>,
    {
        self.entries.import_all(
            entries
                .into_iter()
                .map(|(value, priority)| PriorityEntry { value, priority }),
        );
    }

    /// Keep only the entries for which `keep` returns true.
    ///
    /// Returns the number of entries removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T, i64) -> bool,
    {
        let before = self.entries.len();
        let kept: Sequence<_> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|entry| keep(&entry.value, entry.priority))
            .collect();
        self.entries = kept;
        before - self.entries.len()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, i64)> {
        self.entries.iter().map(|entry| (&entry.value, entry.priority))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the selector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> PrioritySelector<T> {
    /// Copy every entry out in insertion order without removing anything.
    #[must_use]
    pub fn export_all(&self) -> Vec<(T, i64)> {
        self.entries
            .iter()
            .map(|entry| (entry.value.clone(), entry.priority))
            .collect()
    }
}

impl<T> Default for PrioritySelector<T> {
    fn default() -> Self {
        Self::new()
    }
}
