// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compound types (structures and unions) and their fields.

use super::{MetaData, TypeId};

/// Named member of a compound at a fixed byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    type_id: TypeId,
    offset: usize,
    metadata: MetaData,
}

impl Field {
    /// Create a field of type `type_id` at `offset`.
    pub fn new(name: impl Into<String>, type_id: TypeId, offset: usize) -> Self {
        Self {
            name: name.into(),
            type_id,
            offset,
            metadata: MetaData::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetaData {
        &mut self.metadata
    }

    pub(crate) fn set_type_id(&mut self, type_id: TypeId) {
        self.type_id = type_id;
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }
}

/// Ordered list of fields, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    fields: Vec<Field>,
}

impl Compound {
    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Mutable field by name (metadata edits).
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Last declared field.
    pub fn last_field(&self) -> Option<&Field> {
        self.fields.last()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields sorted by offset; declaration order breaks ties.
    pub fn fields_by_offset(&self) -> Vec<&Field> {
        let mut sorted: Vec<&Field> = self.fields.iter().collect();
        sorted.sort_by_key(|f| f.offset);
        sorted
    }

    /// True when at least two fields share an offset.
    pub fn has_overlapping_offsets(&self) -> bool {
        let sorted = self.fields_by_offset();
        sorted.windows(2).any(|w| w[0].offset == w[1].offset)
    }

    pub(crate) fn push(&mut self, field: Field) -> &mut Field {
        let index = self.fields.len();
        self.fields.push(field);
        &mut self.fields[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_by_offset_is_stable() {
        let mut compound = Compound::default();
        compound.push(Field::new("b", TypeId::from_index(0), 8));
        compound.push(Field::new("u1", TypeId::from_index(0), 0));
        compound.push(Field::new("u2", TypeId::from_index(1), 0));

        let names: Vec<&str> = compound
            .fields_by_offset()
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(names, vec!["u1", "u2", "b"]);
        assert!(compound.has_overlapping_offsets());
    }

    #[test]
    fn test_field_lookup() {
        let mut compound = Compound::default();
        compound.push(Field::new("x", TypeId::from_index(3), 4));
        assert_eq!(compound.field("x").map(Field::offset), Some(4));
        assert!(compound.field("y").is_none());
        assert_eq!(compound.last_field().map(Field::name), Some("x"));
    }
}
