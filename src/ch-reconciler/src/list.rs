// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An insertion-ordered sequence without duplicates.
//!
//! Privilege sets and role memberships are declared as sets, but the
//! statements built from them must be deterministic. [`UniqueList`] keeps the
//! first-seen order of its elements so that diffing two lists always yields
//! the same statements for the same inputs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered sequence in which every element appears at most once.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: PartialEq + Deserialize<'de>"
))]
pub struct UniqueList<T> {
    items: Vec<T>,
}

impl<T> UniqueList<T> {
    pub fn new() -> Self {
        UniqueList { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> UniqueList<T> {
    /// Appends `item` unless an equal element is already present.
    ///
    /// Returns whether the list changed.
    pub fn insert(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            false
        } else {
            self.items.push(item);
            true
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl<T: PartialEq + Clone> UniqueList<T> {
    /// Elements of `self` that are absent from `other`, in `self`'s order.
    pub fn difference(&self, other: &UniqueList<T>) -> UniqueList<T> {
        self.items
            .iter()
            .filter(|item| !other.contains(item))
            .cloned()
            .collect()
    }

    /// Elements of `self` followed by the elements of `other` not already
    /// present.
    pub fn union(&self, other: &UniqueList<T>) -> UniqueList<T> {
        let mut union = self.clone();
        for item in other.iter() {
            union.insert(item.clone());
        }
        union
    }
}

impl<T> Default for UniqueList<T> {
    fn default() -> Self {
        UniqueList::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for UniqueList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: PartialEq> FromIterator<T> for UniqueList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = UniqueList::new();
        for item in iter {
            list.insert(item);
        }
        list
    }
}

impl<T: PartialEq> From<Vec<T>> for UniqueList<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T> From<UniqueList<T>> for Vec<T> {
    fn from(list: UniqueList<T>) -> Self {
        list.items
    }
}

impl<T> IntoIterator for UniqueList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a UniqueList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> UniqueList<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicates_keep_first_position() {
        let l = list(&["SELECT", "INSERT", "SELECT", "ALTER", "INSERT"]);
        assert_eq!(l.as_slice(), &["SELECT", "INSERT", "ALTER"]);
    }

    #[test]
    fn difference_preserves_order() {
        let a = list(&["ALTER", "SELECT", "INSERT"]);
        let b = list(&["SELECT"]);
        assert_eq!(a.difference(&b).as_slice(), &["ALTER", "INSERT"]);
        assert!(b.difference(&a).is_empty());
    }

    #[test]
    fn union_appends_new_elements() {
        let a = list(&["SELECT"]);
        let b = list(&["INSERT", "SELECT"]);
        assert_eq!(a.union(&b).as_slice(), &["SELECT", "INSERT"]);
    }

    #[test]
    fn deserializing_drops_duplicates() {
        let l: UniqueList<String> = serde_json::from_str(r#"["a","b","a"]"#).unwrap();
        assert_eq!(l.as_slice(), &["a", "b"]);
        assert_eq!(serde_json::to_string(&l).unwrap(), r#"["a","b"]"#);
    }
}
