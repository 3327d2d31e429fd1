//! Insertion-ordered FIFO container.

use std::collections::vec_deque::{IntoIter, Iter};
use std::collections::VecDeque;

/// FIFO sequence with O(1) push at the back and pop at the front.
///
/// Backed by a growable ring buffer. Iteration always follows insertion
/// order.
#[derive(Debug, Clone)]
pub struct Sequence<T> {
    items: VecDeque<T>,
}

impl<T> Sequence<T> {
    /// Create an empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append a value at the back.
    pub fn push(&mut self, value: T) {
        self.items.push_back(value);
    }

    /// Remove and return the value at the front.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Borrow the value at the front without removing it.
    #[must_use]
    pub fn peek_front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Remove the value at `index`, keeping the relative order of the rest.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        self.items.remove(index)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Append every value from `values`, preserving their order.
    pub fn import_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.items.extend(values);
    }

    /// Iterate front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone> Sequence<T> {
    /// Copy every value out in insertion order without removing anything.
    #[must_use]
    pub fn export_all(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for Sequence<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
