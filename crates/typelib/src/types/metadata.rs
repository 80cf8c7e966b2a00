// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Free-form metadata attached to types and fields.
//!
//! Purely informational (documentation, source locations); nothing in the
//! core reads it.

use std::collections::{BTreeMap, BTreeSet};

/// Multi-valued string map: each key holds a set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    values: BTreeMap<String, BTreeSet<String>>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values stored under `key`.
    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.values.get(key)
    }

    /// Add `value` to the set stored under `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }

    /// Whether `key` has at least one value.
    pub fn include(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Remove one key.
    pub fn clear_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Union `other` into `self`, key by key.
    pub fn merge(&mut self, other: &MetaData) {
        for (key, values) in &other.values {
            self.values
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_multi_values() {
        let mut md = MetaData::new();
        md.add("doc", "first line");
        md.add("doc", "second line");
        md.add("doc", "first line");

        let doc = md.get("doc").expect("doc key");
        assert_eq!(doc.len(), 2);
        assert!(md.include("doc"));
        assert!(!md.include("source_file_line"));
    }

    #[test]
    fn test_metadata_merge_and_clear() {
        let mut a = MetaData::new();
        a.add("doc", "a");
        let mut b = MetaData::new();
        b.add("doc", "b");
        b.add("source_file_line", "foo.h:12");

        a.merge(&b);
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["doc", "source_file_line"]);
        assert_eq!(a.get("doc").map(BTreeSet::len), Some(2));

        a.clear_key("doc");
        assert!(a.get("doc").is_none());
        a.clear();
        assert!(a.is_empty());
    }
}
