// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct packing engine.
//!
//! Predicts the offsets and sizes the build compiler gives `#[repr(C)]` /
//! C structures, so compounds described at runtime match compiled ones.
//!
//! Alignments are not hardcoded: they are measured once per process by
//! probing `{ i8 a; T b; }` aggregates and reading `offset_of!(b)`. The
//! primitive table is keyed by scalar size (first match wins); types that
//! have no scalar representative (containers, opaques) are looked up by
//! name prefix in a second table.
//!
//! The tables describe the build platform only. Describing another ABI
//! means building a [`Packing`] with different tables.

#[cfg(test)]
mod tests;

use crate::config::{STRING_KIND, VECTOR_KIND};
use crate::container::ContainerObject;
use crate::registry::Registry;
use crate::types::{Field, TypeId, TypeKind, TypeRef};
use std::mem::offset_of;
use std::sync::OnceLock;
use thiserror::Error;

/// Packing engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingError {
    /// No probe entry covers this type.
    #[error("no packing information available for {0}")]
    Unknown(String),
    /// Compound without fields has no alignment.
    #[error("cannot compute the packing of empty structure {0}")]
    FoundNullStructure(String),
    /// Compound with partially overlapping fields.
    #[error("cannot compute the packing of union-like structure {0}")]
    FoundUnion(String),
}

#[repr(C)]
struct Probe<T> {
    a: i8,
    b: T,
}

macro_rules! probe {
    ($t:ty) => {
        (std::mem::size_of::<$t>(), offset_of!(Probe<$t>, b))
    };
}

/// Alignment tables of one ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packing {
    /// `(scalar size, alignment)`, first match wins.
    primitives: Vec<(usize, usize)>,
    /// `(name prefix, alignment)` for containers and opaques.
    named: Vec<(String, usize)>,
}

impl Packing {
    /// Tables of the build platform, probed on first use.
    pub fn native() -> &'static Packing {
        static NATIVE: OnceLock<Packing> = OnceLock::new();
        NATIVE.get_or_init(Self::probe)
    }

    fn probe() -> Self {
        let primitives = vec![
            probe!(i8),
            probe!(i16),
            probe!(i32),
            probe!(i64),
            probe!(f32),
            probe!(f64),
            probe!(*const u8),
        ];
        let container = offset_of!(Probe<ContainerObject>, b);
        let named = vec![
            (VECTOR_KIND.to_string(), container),
            (STRING_KIND.to_string(), container),
        ];
        log::debug!(
            "[Packing] native alignments: primitives={:?} named={:?}",
            primitives,
            named
        );
        Self { primitives, named }
    }

    /// Build tables by hand (`(size, alignment)` and `(prefix, alignment)`).
    pub fn from_tables(primitives: Vec<(usize, usize)>, named: Vec<(String, usize)>) -> Self {
        Self { primitives, named }
    }

    /// Copy of these tables where types named `prefix*` align on `alignment`.
    #[must_use]
    pub fn with_opaque_alignment(mut self, prefix: impl Into<String>, alignment: usize) -> Self {
        self.named.push((prefix.into(), alignment));
        self
    }

    fn primitive_alignment(&self, size: usize) -> Option<usize> {
        self.primitives
            .iter()
            .find(|(s, _)| *s == size)
            .map(|(_, align)| *align)
    }

    fn named_alignment(&self, name: &str) -> Option<usize> {
        self.named
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix.as_str()))
            .map(|(_, align)| *align)
    }

    /// Alignment the compiler requires for `ty`.
    pub fn alignment_of(&self, ty: TypeRef<'_>) -> Result<usize, PackingError> {
        self.alignment(ty, &mut Vec::new())
    }

    fn alignment(&self, ty: TypeRef<'_>, stack: &mut Vec<TypeId>) -> Result<usize, PackingError> {
        let unknown = || PackingError::Unknown(ty.name().to_string());
        match ty.kind() {
            TypeKind::Numeric(_) | TypeKind::Enum(_) | TypeKind::Pointer(_) => {
                self.primitive_alignment(ty.size()).ok_or_else(unknown)
            }
            TypeKind::Array { element, .. } => {
                self.alignment(TypeRef::new(ty.registry(), *element), stack)
            }
            TypeKind::Compound(compound) => {
                if stack.contains(&ty.id()) {
                    return Err(unknown());
                }
                stack.push(ty.id());
                let alignment =
                    self.fields_alignment(ty.registry(), ty.name(), compound.fields(), stack);
                stack.pop();
                alignment
            }
            TypeKind::Container(_) | TypeKind::Opaque => {
                self.named_alignment(ty.name()).ok_or_else(unknown)
            }
            TypeKind::Null => Err(unknown()),
        }
    }

    fn fields_alignment(
        &self,
        registry: &Registry,
        name: &str,
        fields: &[Field],
        stack: &mut Vec<TypeId>,
    ) -> Result<usize, PackingError> {
        if fields.is_empty() {
            return Err(PackingError::FoundNullStructure(name.to_string()));
        }
        if has_partial_overlap(registry, fields) {
            return Err(PackingError::FoundUnion(name.to_string()));
        }
        let mut alignment = 1;
        for field in fields {
            let field_type = registry.type_ref(field.type_id());
            alignment = alignment.max(self.alignment(field_type, stack)?);
        }
        Ok(alignment)
    }

    /// Offset of a field of type `new_type` appended after `last`.
    ///
    /// The first field of a compound (`last == None`) is at offset 0.
    pub fn offset_of(
        &self,
        registry: &Registry,
        last: Option<&Field>,
        new_type: TypeId,
    ) -> Result<usize, PackingError> {
        let Some(last) = last else {
            return Ok(0);
        };
        let last_size = registry.type_ref(last.type_id()).size();
        let alignment = self.alignment_of(registry.type_ref(new_type))?;
        Ok(round_up(last.offset() + last_size, alignment))
    }

    /// Size of a compound once padded to its alignment.
    pub fn size_of_compound(
        &self,
        registry: &Registry,
        compound: TypeId,
    ) -> Result<usize, PackingError> {
        let ty = registry.type_ref(compound);
        self.size_of_fields(registry, ty.name(), ty.fields())
    }

    /// Padded size of a compound made of `fields`, before it is registered.
    pub fn size_of_fields(
        &self,
        registry: &Registry,
        name: &str,
        fields: &[Field],
    ) -> Result<usize, PackingError> {
        let alignment = self.fields_alignment(registry, name, fields, &mut Vec::new())?;
        let end = fields
            .iter()
            .map(|f| f.offset() + registry.type_ref(f.type_id()).size())
            .max()
            .unwrap_or(0);
        Ok(round_up(end, alignment))
    }
}

/// Two fields overlap without starting at the same offset.
fn has_partial_overlap(registry: &Registry, fields: &[Field]) -> bool {
    let end = |f: &Field| f.offset() + registry.type_ref(f.type_id()).size();
    fields.iter().enumerate().any(|(i, a)| {
        fields[i + 1..].iter().any(|b| {
            a.offset() != b.offset() && a.offset() < end(b) && b.offset() < end(a)
        })
    })
}

fn round_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// [`Packing::offset_of`] with the native tables.
pub fn offset_of(
    registry: &Registry,
    last: Option<&Field>,
    new_type: TypeId,
) -> Result<usize, PackingError> {
    Packing::native().offset_of(registry, last, new_type)
}

/// [`Packing::size_of_compound`] with the native tables.
pub fn size_of_compound(registry: &Registry, compound: TypeId) -> Result<usize, PackingError> {
    Packing::native().size_of_compound(registry, compound)
}

/// [`Packing::alignment_of`] with the native tables.
pub fn alignment_of(registry: &Registry, type_id: TypeId) -> Result<usize, PackingError> {
    Packing::native().alignment_of(registry.type_ref(type_id))
}
