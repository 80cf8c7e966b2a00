// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `/std/vector`: growable sequence of any sized element type.

use super::{storage, Container, ContainerObject, ElementOps};
use crate::config::VECTOR_KIND;
use crate::error::{Error, Result};
use crate::marshal::stream::{InputStream, OutputStream};
use crate::registry::Registry;
use crate::types::{name, Category, Type, TypeId, TypeRef};
use std::sync::Arc;

/// Vector container kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct Vector;

// SAFETY: element storage is managed by `storage`, which only touches
// nested containers through `ElementOps`.
unsafe impl Container for Vector {
    fn kind(&self) -> &str {
        VECTOR_KIND
    }

    fn validate_element(&self, element: TypeRef<'_>) -> Result<()> {
        if element.category() == Category::Null || element.size() == 0 {
            return Err(Error::unsupported(
                element.name(),
                "vectors need a sized element type",
            ));
        }
        Ok(())
    }

    fn len(&self, object: &ContainerObject, element: &ElementOps<'_>) -> usize {
        storage::len(object, element)
    }

    unsafe fn destroy(&self, object: ContainerObject, element: &ElementOps<'_>) -> Result<()> {
        storage::destroy(object, element)
    }

    unsafe fn clear(&self, object: &mut ContainerObject, element: &ElementOps<'_>) -> Result<()> {
        storage::resize(object, 0, element)
    }

    unsafe fn resize(
        &self,
        object: &mut ContainerObject,
        len: usize,
        element: &ElementOps<'_>,
    ) -> Result<()> {
        storage::resize(object, len, element)
    }

    unsafe fn push(
        &self,
        object: &mut ContainerObject,
        value: &[u8],
        element: &ElementOps<'_>,
    ) -> Result<()> {
        storage::push(object, value, element)
    }

    unsafe fn erase(
        &self,
        object: &mut ContainerObject,
        index: usize,
        element: &ElementOps<'_>,
    ) -> Result<bool> {
        storage::erase(object, index, element)
    }

    unsafe fn copy(
        &self,
        dst: &mut ContainerObject,
        src: &ContainerObject,
        element: &ElementOps<'_>,
    ) -> Result<()> {
        storage::copy(dst, src, element)
    }

    unsafe fn compare(
        &self,
        lhs: &ContainerObject,
        rhs: &ContainerObject,
        element: &ElementOps<'_>,
    ) -> Result<bool> {
        storage::compare(lhs, rhs, element)
    }

    fn visit(
        &self,
        object: &ContainerObject,
        element: &ElementOps<'_>,
        visitor: &mut dyn FnMut(&[u8]) -> bool,
    ) {
        storage::visit(object, element, visitor);
    }

    unsafe fn dump(
        &self,
        object: &ContainerObject,
        element: &ElementOps<'_>,
        sink: &mut dyn OutputStream,
    ) -> Result<()> {
        storage::dump(object, element, sink)
    }

    unsafe fn load(
        &self,
        object: &mut ContainerObject,
        count: u64,
        element: &ElementOps<'_>,
        source: &mut dyn InputStream,
    ) -> Result<()> {
        storage::load(object, count, element, source)
    }
}

/// Factory of `/std/vector<element>`: exactly one type argument.
pub fn vector_factory(registry: &mut Registry, arguments: &[TypeId]) -> Result<TypeId> {
    let [element] = arguments else {
        return Err(Error::unsupported(
            VECTOR_KIND,
            format!("expected 1 type argument, got {}", arguments.len()),
        ));
    };
    let element_ref = registry.type_ref(*element);
    let full_name = name::container_name(VECTOR_KIND, &[element_ref.name()]);
    if let Some(existing) = registry.get(&full_name) {
        return Ok(existing.id());
    }
    Vector.validate_element(element_ref)?;
    registry.add(Type::container(full_name, *element, Arc::new(Vector)), None)
}
