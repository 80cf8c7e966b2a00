// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builders for compounds and enums.

use super::Registry;
use crate::error::Result;
use crate::packing::Packing;
use crate::types::{EnumType, Type, TypeId};

#[derive(Debug, Clone)]
enum FieldType {
    Named(String),
    Id(TypeId),
}

#[derive(Debug, Clone)]
struct PendingField {
    name: String,
    field_type: FieldType,
    offset: Option<usize>,
}

/// Builder for compounds laid out like a C compiler would.
///
/// Offsets come from the packing engine unless given explicitly, and the
/// final size is padded to the compound's alignment.
///
/// ```
/// use typelib::{CompoundBuilder, Registry};
///
/// let mut registry = Registry::with_standard_types();
/// let id = CompoundBuilder::new("/A")
///     .field("a", "/int64_t")
///     .field("b", "/int32_t")
///     .field("c", "/int8_t")
///     .field("d", "/int16_t")
///     .build(&mut registry)
///     .expect("compound A");
///
/// let a = registry.type_ref(id);
/// assert_eq!(a.field("d").map(|f| f.offset()), Some(14));
/// assert_eq!(a.size(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct CompoundBuilder {
    name: String,
    fields: Vec<PendingField>,
    packing: Option<Packing>,
    source_id: Option<String>,
}

impl CompoundBuilder {
    /// Create a builder for the compound `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            packing: None,
            source_id: None,
        }
    }

    /// Append a field whose type is built from `type_name`.
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            field_type: FieldType::Named(type_name.into()),
            offset: None,
        });
        self
    }

    /// Append a field of an already resolved type.
    pub fn field_with_type(mut self, name: impl Into<String>, type_id: TypeId) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            field_type: FieldType::Id(type_id),
            offset: None,
        });
        self
    }

    /// Append a field at an explicit offset (unions, packed structures).
    pub fn field_at(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        offset: usize,
    ) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            field_type: FieldType::Named(type_name.into()),
            offset: Some(offset),
        });
        self
    }

    /// Use other packing tables than the native ones.
    pub fn packing(mut self, packing: Packing) -> Self {
        self.packing = Some(packing);
        self
    }

    /// Record where the definition comes from.
    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Resolve the field types, lay the fields out and add the compound.
    pub fn build(self, registry: &mut Registry) -> Result<TypeId> {
        let packing = self.packing.as_ref().unwrap_or_else(|| Packing::native());
        let mut compound = Type::compound(self.name.as_str());

        for pending in &self.fields {
            let type_id = match &pending.field_type {
                FieldType::Named(type_name) => registry.build(type_name)?,
                FieldType::Id(id) => *id,
            };
            let offset = match pending.offset {
                Some(offset) => offset,
                None => packing.offset_of(registry, compound.fields().last(), type_id)?,
            };
            compound.add_field(pending.name.as_str(), registry.type_ref(type_id), offset)?;
        }

        if !compound.fields().is_empty() {
            let size = packing.size_of_fields(registry, compound.name(), compound.fields())?;
            compound.set_size(size);
        }
        registry.add(compound, self.source_id.as_deref())
    }
}

/// Builder for enums; symbols without a value follow the previous one.
///
/// ```
/// use typelib::{EnumBuilder, Registry};
///
/// let mut registry = Registry::new();
/// let id = EnumBuilder::new("/Color")
///     .variant("RED")
///     .variant_value("GREEN", 4)
///     .variant("BLUE")
///     .build(&mut registry)
///     .expect("enum");
/// let color = registry.type_of(id).as_enum().expect("enum type");
/// assert_eq!(color.value_of("BLUE"), Ok(5));
/// ```
#[derive(Debug, Clone)]
pub struct EnumBuilder {
    name: String,
    variants: Vec<(String, i64)>,
    next_value: i64,
    source_id: Option<String>,
}

impl EnumBuilder {
    /// Create a new enum builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
            next_value: 0,
            source_id: None,
        }
    }

    /// Add a symbol with the next value.
    pub fn variant(mut self, name: impl Into<String>) -> Self {
        self.variants.push((name.into(), self.next_value));
        self.next_value = self.next_value.wrapping_add(1);
        self
    }

    /// Add a symbol with an explicit value.
    pub fn variant_value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push((name.into(), value));
        self.next_value = value.wrapping_add(1);
        self
    }

    /// Record where the definition comes from.
    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Add the enum to `registry`.
    pub fn build(self, registry: &mut Registry) -> Result<TypeId> {
        let mut values = EnumType::new();
        for (symbol, value) in self.variants {
            values.add(symbol, value)?;
        }
        registry.add(
            Type::enumeration(self.name, values),
            self.source_id.as_deref(),
        )
    }
}
