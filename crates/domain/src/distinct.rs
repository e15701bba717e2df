//! Extraction of distinct values from flat query results.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashSet},
    hash::Hash,
};

/// Distinct projected keys in ascending order.
pub fn unique_sorted<T, K, F>(rows: &[T], key: F) -> Vec<K>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    rows.iter().map(key).collect::<BTreeSet<_>>().into_iter().collect()
}

/// The first-seen record for each distinct key, stably sorted by `compare`.
///
/// Later records with an already seen key are dropped, so records sharing a key keep the values
/// of their first occurrence.
pub fn unique_by<T, K, F, C>(rows: &[T], key: F, compare: C) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
    C: FnMut(&T, &T) -> Ordering,
{
    let mut seen = HashSet::new();
    let mut result = rows
        .iter()
        .filter(|row| seen.insert(key(row)))
        .cloned()
        .collect::<Vec<_>>();
    result.sort_by(compare);
    result
}
