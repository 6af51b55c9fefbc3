//! Unordered set diff
//!
//! For flat values where only membership matters: no positions, no moves.

use std::collections::HashSet;
use std::hash::Hash;

/// Membership change for one value
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SetPatch<T> {
    Add(T),
    Remove(T),
}

impl<T> SetPatch<T> {
    pub fn value(&self) -> &T {
        match self {
            SetPatch::Add(value) | SetPatch::Remove(value) => value,
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, SetPatch::Add(_))
    }
}

/// Adds for values of `next` missing from `prev`, in `next` order, then
/// removes for values of `prev` missing from `next`, in `prev` order.
pub fn set_diff<T>(prev: &[T], next: &[T]) -> Vec<SetPatch<T>>
where
    T: Clone + Eq + Hash,
{
    let in_prev: HashSet<&T> = prev.iter().collect();
    let in_next: HashSet<&T> = next.iter().collect();

    let added = next
        .iter()
        .filter(|value| !in_prev.contains(value))
        .map(|value| SetPatch::Add(value.clone()));
    let removed = prev
        .iter()
        .filter(|value| !in_next.contains(value))
        .map(|value| SetPatch::Remove(value.clone()));

    added.chain(removed).collect()
}
