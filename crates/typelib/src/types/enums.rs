// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumerations: a name to integer map.

use std::collections::BTreeMap;
use thiserror::Error;

/// Enum definition and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumError {
    /// The symbol is already bound to a different value.
    #[error("enum symbol {symbol} already exists with value {existing}")]
    AlreadyExists {
        /// Symbol being redefined.
        symbol: String,
        /// Value it is currently bound to.
        existing: i64,
    },
    /// No symbol of that name.
    #[error("enum symbol {0} not found")]
    SymbolNotFound(String),
    /// No symbol has that value.
    #[error("no enum symbol has value {0}")]
    ValueNotFound(i64),
}

/// Symbol to value map of an enum type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumType {
    values: BTreeMap<String, i64>,
}

impl EnumType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `symbol` to `value`. Re-adding the identical pair is a no-op.
    pub fn add(&mut self, symbol: impl Into<String>, value: i64) -> Result<(), EnumError> {
        let symbol = symbol.into();
        match self.values.get(&symbol) {
            Some(&existing) if existing == value => Ok(()),
            Some(&existing) => Err(EnumError::AlreadyExists { symbol, existing }),
            None => {
                self.values.insert(symbol, value);
                Ok(())
            }
        }
    }

    /// Value of `symbol`.
    pub fn value_of(&self, symbol: &str) -> Result<i64, EnumError> {
        self.values
            .get(symbol)
            .copied()
            .ok_or_else(|| EnumError::SymbolNotFound(symbol.to_string()))
    }

    /// First symbol (in name order) bound to `value`. Linear scan.
    pub fn name_of(&self, value: i64) -> Result<&str, EnumError> {
        self.values
            .iter()
            .find(|(_, &v)| v == value)
            .map(|(name, _)| name.as_str())
            .ok_or(EnumError::ValueNotFound(value))
    }

    /// All symbols, ordered by name.
    pub fn values(&self) -> &BTreeMap<String, i64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every (symbol, value) of `self` also exists in `other`.
    pub fn is_subset_of(&self, other: &EnumType) -> bool {
        self.values
            .iter()
            .all(|(name, value)| other.values.get(name) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> EnumType {
        let mut e = EnumType::new();
        e.add("RED", 0).expect("add RED");
        e.add("GREEN", 1).expect("add GREEN");
        e.add("BLUE", 4).expect("add BLUE");
        e
    }

    #[test]
    fn test_enum_readd_identical_is_noop() {
        let mut e = colors();
        assert!(e.add("RED", 0).is_ok());
        assert_eq!(e.len(), 3);
    }

    #[test]
    fn test_enum_readd_different_value_fails() {
        let mut e = colors();
        assert_eq!(
            e.add("RED", 7),
            Err(EnumError::AlreadyExists {
                symbol: "RED".into(),
                existing: 0
            })
        );
    }

    #[test]
    fn test_enum_lookups() {
        let e = colors();
        assert_eq!(e.value_of("BLUE"), Ok(4));
        assert_eq!(e.name_of(1), Ok("GREEN"));
        assert_eq!(
            e.value_of("PINK"),
            Err(EnumError::SymbolNotFound("PINK".into()))
        );
        assert_eq!(e.name_of(2), Err(EnumError::ValueNotFound(2)));
    }

    #[test]
    fn test_enum_subset() {
        let mut small = EnumType::new();
        small.add("RED", 0).expect("add RED");
        assert!(small.is_subset_of(&colors()));
        assert!(!colors().is_subset_of(&small));
    }
}
