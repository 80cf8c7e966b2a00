// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type model.
//!
//! A [`Type`] is a name, a size in bytes and a [`TypeKind`]. Types live in a
//! [`Registry`](crate::Registry) arena and refer to each other through
//! [`TypeId`] handles, never through owning pointers. [`TypeRef`] pairs a
//! handle with its registry and carries the read-side operations
//! (`is_same`, `can_cast_to`, `depends_on`, ...).
//!
//! # Categories
//!
//! | Kind | Size | References |
//! |------|------|------------|
//! | `Null` | 0 | - |
//! | `Numeric` | scalar size | - |
//! | `Enum` | C `int` | - |
//! | `Compound` | end of last field, padded | field types |
//! | `Pointer` | native pointer | pointee |
//! | `Array` | `dimension * element` | element |
//! | `Container` | container object | element |
//! | `Opaque` | declared | - |

mod compare;
mod compound;
mod enums;
mod metadata;
pub mod name;

#[cfg(test)]
mod tests;

pub use compound::{Compound, Field};
pub use enums::{EnumError, EnumType};
pub use metadata::MetaData;

use crate::config::{ENUM_SIZE, POINTER_SIZE};
use crate::container::{Container, CONTAINER_OBJECT_SIZE};
use crate::error::{Error, Result};
use crate::registry::Registry;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Handle of a type inside the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn from_index(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)] // arena never holds 2^32 types
        Self(index as u32)
    }

    /// Arena index of this handle.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Null,
    Numeric,
    Enum,
    Compound,
    Pointer,
    Array,
    Container,
    Opaque,
}

impl Category {
    /// Lowercase name, as used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Numeric => "numeric",
            Self::Enum => "enum",
            Self::Compound => "compound",
            Self::Pointer => "pointer",
            Self::Array => "array",
            Self::Container => "container",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericCategory {
    SInt,
    UInt,
    Float,
}

/// Container instance: kind name, element type and runtime behaviour.
#[derive(Debug, Clone)]
pub struct ContainerType {
    kind: String,
    element: TypeId,
    ops: Arc<dyn Container>,
}

impl ContainerType {
    /// Kind name (e.g. `/std/vector`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Element type.
    pub fn element(&self) -> TypeId {
        self.element
    }

    /// Runtime implementation shared by every instance of this kind.
    pub fn ops(&self) -> &Arc<dyn Container> {
        &self.ops
    }
}

/// Category-specific part of a type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Null,
    Numeric(NumericCategory),
    Enum(EnumType),
    Compound(Compound),
    Pointer(TypeId),
    Array { element: TypeId, dimension: usize },
    Container(ContainerType),
    Opaque,
}

impl TypeKind {
    /// Category of this kind.
    pub fn category(&self) -> Category {
        match self {
            Self::Null => Category::Null,
            Self::Numeric(_) => Category::Numeric,
            Self::Enum(_) => Category::Enum,
            Self::Compound(_) => Category::Compound,
            Self::Pointer(_) => Category::Pointer,
            Self::Array { .. } => Category::Array,
            Self::Container(_) => Category::Container,
            Self::Opaque => Category::Opaque,
        }
    }

    /// Pointee / element type of indirect kinds.
    pub fn indirection(&self) -> Option<TypeId> {
        match self {
            Self::Pointer(target) => Some(*target),
            Self::Array { element, .. } => Some(*element),
            Self::Container(container) => Some(container.element),
            _ => None,
        }
    }

    /// Types directly referenced by this kind.
    pub fn dependencies(&self) -> BTreeSet<TypeId> {
        match self {
            Self::Compound(compound) => compound.fields().iter().map(Field::type_id).collect(),
            other => other.indirection().into_iter().collect(),
        }
    }

    /// Rewrite every referenced handle.
    pub(crate) fn map_ids(&mut self, mut map: impl FnMut(TypeId) -> TypeId) {
        match self {
            Self::Compound(compound) => {
                for field in compound.fields_mut() {
                    field.set_type_id(map(field.type_id()));
                }
            }
            Self::Pointer(target) => *target = map(*target),
            Self::Array { element, .. } => *element = map(*element),
            Self::Container(container) => container.element = map(container.element),
            Self::Null | Self::Numeric(_) | Self::Enum(_) | Self::Opaque => {}
        }
    }

    /// Same definition within one registry (handles compared directly).
    fn same_definition(&self, other: &TypeKind) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Opaque, Self::Opaque) => true,
            (Self::Numeric(a), Self::Numeric(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Compound(a), Self::Compound(b)) => {
                a.fields().len() == b.fields().len()
                    && a.fields().iter().zip(b.fields()).all(|(fa, fb)| {
                        fa.name() == fb.name()
                            && fa.offset() == fb.offset()
                            && fa.type_id() == fb.type_id()
                    })
            }
            (Self::Pointer(a), Self::Pointer(b)) => a == b,
            (
                Self::Array {
                    element: ea,
                    dimension: da,
                },
                Self::Array {
                    element: eb,
                    dimension: db,
                },
            ) => ea == eb && da == db,
            (Self::Container(a), Self::Container(b)) => a.kind == b.kind && a.element == b.element,
            _ => false,
        }
    }
}

/// A type description.
#[derive(Debug, Clone)]
pub struct Type {
    name: String,
    size: usize,
    kind: TypeKind,
    metadata: MetaData,
}

impl Type {
    pub(crate) fn new(name: impl Into<String>, size: usize, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            size,
            kind,
            metadata: MetaData::default(),
        }
    }

    /// Null type (absence of a type), size 0.
    pub fn null(name: impl Into<String>) -> Self {
        Self::new(name, 0, TypeKind::Null)
    }

    /// Numeric scalar.
    pub fn numeric(name: impl Into<String>, size: usize, category: NumericCategory) -> Self {
        Self::new(name, size, TypeKind::Numeric(category))
    }

    /// Enumeration, sized like a C `int`.
    pub fn enumeration(name: impl Into<String>, values: EnumType) -> Self {
        Self::new(name, ENUM_SIZE, TypeKind::Enum(values))
    }

    /// Empty compound; fields are appended with [`Type::add_field`].
    pub fn compound(name: impl Into<String>) -> Self {
        Self::new(name, 0, TypeKind::Compound(Compound::default()))
    }

    /// Opaque type of a known size.
    pub fn opaque(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, size, TypeKind::Opaque)
    }

    /// Pointer to `target`, sized like a native pointer.
    pub fn pointer(name: impl Into<String>, target: TypeId) -> Self {
        Self::new(name, POINTER_SIZE, TypeKind::Pointer(target))
    }

    /// Fixed-size array of `dimension` elements.
    pub fn array(name: impl Into<String>, element: TypeRef<'_>, dimension: usize) -> Self {
        Self::new(
            name,
            element.size().saturating_mul(dimension),
            TypeKind::Array {
                element: element.id(),
                dimension,
            },
        )
    }

    /// Container instance. The size is the container object's size.
    pub fn container(name: impl Into<String>, element: TypeId, ops: Arc<dyn Container>) -> Self {
        let kind = ops.kind().to_string();
        Self::new(
            name,
            CONTAINER_OBJECT_SIZE,
            TypeKind::Container(ContainerType { kind, element, ops }),
        )
    }

    /// Absolute, namespace-qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Category-specific description.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Category.
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Informational metadata.
    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    /// Mutable metadata.
    pub fn metadata_mut(&mut self) -> &mut MetaData {
        &mut self.metadata
    }

    /// Fields of a compound, empty for every other category.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Compound(compound) => compound.fields(),
            _ => &[],
        }
    }

    /// Compound description, if this is a compound.
    pub fn as_compound(&self) -> Option<&Compound> {
        match &self.kind {
            TypeKind::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub(crate) fn as_compound_mut(&mut self) -> Option<&mut Compound> {
        match &mut self.kind {
            TypeKind::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    /// Enum description, if this is an enum.
    pub fn as_enum(&self) -> Option<&EnumType> {
        match &self.kind {
            TypeKind::Enum(values) => Some(values),
            _ => None,
        }
    }

    /// Container description, if this is a container.
    pub fn as_container(&self) -> Option<&ContainerType> {
        match &self.kind {
            TypeKind::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Pointee / element type of indirect types.
    pub fn indirection(&self) -> Option<TypeId> {
        self.kind.indirection()
    }

    /// Override the size (compound padding, resize).
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    /// Append a field at `offset`.
    ///
    /// The compound grows to cover the new field if needed; it never
    /// shrinks.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        field_type: TypeRef<'_>,
        offset: usize,
    ) -> Result<&mut Field> {
        self.push_field(Field::new(name, field_type.id(), offset), field_type.size())
    }

    pub(crate) fn push_field(&mut self, field: Field, field_size: usize) -> Result<&mut Field> {
        if self.fields().iter().any(|f| f.name() == field.name()) {
            return Err(Error::AlreadyDefinedName(format!(
                "{}.{}",
                self.name,
                field.name()
            )));
        }
        let end = field.offset() + field_size;
        match &mut self.kind {
            TypeKind::Compound(compound) => {
                self.size = self.size.max(end);
                Ok(compound.push(field))
            }
            _ => Err(Error::unsupported(
                self.name.clone(),
                "fields can only be added to compounds",
            )),
        }
    }

    pub(crate) fn same_definition(&self, other: &Type) -> bool {
        self.name == other.name && self.size == other.size && self.kind.same_definition(&other.kind)
    }
}

/// Borrowed view of a type together with the registry that owns it.
#[derive(Clone, Copy)]
pub struct TypeRef<'a> {
    registry: &'a Registry,
    id: TypeId,
}

impl<'a> TypeRef<'a> {
    pub(crate) fn new(registry: &'a Registry, id: TypeId) -> Self {
        Self { registry, id }
    }

    /// Handle of this type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Owning registry.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Underlying type description.
    pub fn get(&self) -> &'a Type {
        self.registry.type_of(self.id)
    }

    pub fn name(&self) -> &'a str {
        self.get().name()
    }

    pub fn size(&self) -> usize {
        self.get().size()
    }

    pub fn category(&self) -> Category {
        self.get().category()
    }

    pub fn kind(&self) -> &'a TypeKind {
        self.get().kind()
    }

    pub fn metadata(&self) -> &'a MetaData {
        self.get().metadata()
    }

    pub fn fields(&self) -> &'a [Field] {
        self.get().fields()
    }

    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&'a Field> {
        self.fields().iter().find(|f| f.name() == name)
    }

    /// Type of one of this compound's fields.
    pub fn field_type(&self, field: &Field) -> TypeRef<'a> {
        Self::new(self.registry, field.type_id())
    }

    /// Pointee / element type of indirect types.
    pub fn indirection(&self) -> Option<TypeRef<'a>> {
        self.get()
            .indirection()
            .map(|id| Self::new(self.registry, id))
    }

    /// Types directly referenced by this one.
    pub fn depends_on(&self) -> BTreeSet<TypeId> {
        self.kind().dependencies()
    }

    /// Bytes between the end of the last field and the end of a compound.
    pub fn trailing_padding(&self) -> usize {
        let end = self
            .fields()
            .iter()
            .map(|f| f.offset() + self.field_type(f).size())
            .max()
            .unwrap_or(0);
        self.size().saturating_sub(end)
    }

    /// Structural equality, cycle-safe, valid across registries.
    pub fn is_same(&self, other: TypeRef<'_>) -> bool {
        compare::is_same(*self, other)
    }

    /// Whether a value of this type can be reinterpreted as `other`.
    pub fn can_cast_to(&self, other: TypeRef<'_>) -> bool {
        compare::can_cast_to(*self, other)
    }
}

impl PartialEq for TypeRef<'_> {
    /// Identity: same registry and same handle.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.registry, other.registry) && self.id == other.id
    }
}

impl Eq for TypeRef<'_> {}

impl fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("category", &self.category())
            .field("size", &self.size())
            .finish()
    }
}

impl fmt::Display for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
