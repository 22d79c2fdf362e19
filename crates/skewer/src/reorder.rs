//! Stable reordering of requests, and restoration of results to caller order.
//!
//! Sorting the scoring requests longest first means the first member of every
//! batch fixes its padding length, the most memory-hungry batch runs first so
//! resource exhaustion surfaces immediately, and padding waste across batches
//! stays small.

use crate::error::{Error, Result};

/// Items sorted by a key, remembering where each one came from.
#[derive(Debug, Clone)]
pub struct Reorderer<T> {
    reordered: Vec<T>,
    /// `original_index[i]` is the caller position of `reordered[i]`
    original_index: Vec<usize>,
}

impl<T> Reorderer<T> {
    /// Sort `items` ascending by `key`. Items with equal keys keep their input
    /// order. Callers wanting a descending order wrap the key in
    /// [`std::cmp::Reverse`].
    pub fn new<K, F>(items: Vec<T>, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut keyed: Vec<(K, usize, T)> = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (key(&item), i, item))
            .collect();
        // the index breaks ties, which keeps the sort stable
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut reordered = Vec::with_capacity(keyed.len());
        let mut original_index = Vec::with_capacity(keyed.len());
        for (_, index, item) in keyed {
            original_index.push(index);
            reordered.push(item);
        }
        Self { reordered, original_index }
    }

    pub fn len(&self) -> usize {
        self.reordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reordered.is_empty()
    }

    /// The items in sorted order
    pub fn reordered(&self) -> &[T] {
        &self.reordered
    }

    /// Permute `results`, produced in sorted order, back to caller order.
    pub fn restore<R>(self, results: Vec<R>) -> Result<Vec<R>> {
        if results.len() != self.original_index.len() {
            return Err(Error::LengthMismatch {
                expected: self.original_index.len(),
                got: results.len(),
            });
        }
        let mut indexed: Vec<(usize, R)> = self.original_index.into_iter().zip(results).collect();
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, result)| result).collect())
    }
}
