// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `/std/string`: byte string over a 1-byte numeric element.
//!
//! Elements are plain bytes, so every operation works on the storage
//! directly and never calls back into the element program.

use super::{storage, Container, ContainerObject, ElementOps};
use crate::config::{CHAR_TYPE_NAME, STRING_KIND};
use crate::error::{Error, Result};
use crate::marshal::stream::{InputStream, OutputStream};
use crate::registry::Registry;
use crate::types::{Category, Type, TypeId, TypeRef};
use std::sync::Arc;

/// String container kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdString;

// SAFETY: elements are single bytes without nested containers.
unsafe impl Container for StdString {
    fn kind(&self) -> &str {
        STRING_KIND
    }

    fn validate_element(&self, element: TypeRef<'_>) -> Result<()> {
        if element.category() != Category::Numeric || element.size() != 1 {
            return Err(Error::unsupported(
                element.name(),
                "strings need a 1-byte numeric element",
            ));
        }
        Ok(())
    }

    fn len(&self, object: &ContainerObject, _element: &ElementOps<'_>) -> usize {
        object.len()
    }

    unsafe fn destroy(&self, object: ContainerObject, _element: &ElementOps<'_>) -> Result<()> {
        drop(object);
        Ok(())
    }

    unsafe fn clear(&self, object: &mut ContainerObject, _element: &ElementOps<'_>) -> Result<()> {
        object.clear();
        Ok(())
    }

    unsafe fn resize(
        &self,
        object: &mut ContainerObject,
        len: usize,
        _element: &ElementOps<'_>,
    ) -> Result<()> {
        object.resize(len, 0);
        Ok(())
    }

    unsafe fn push(
        &self,
        object: &mut ContainerObject,
        value: &[u8],
        _element: &ElementOps<'_>,
    ) -> Result<()> {
        let [byte] = value else {
            return Err(Error::BufferSize {
                expected: 1,
                actual: value.len(),
            });
        };
        object.push(*byte);
        Ok(())
    }

    unsafe fn erase(
        &self,
        object: &mut ContainerObject,
        index: usize,
        _element: &ElementOps<'_>,
    ) -> Result<bool> {
        if index >= object.len() {
            return Ok(false);
        }
        object.remove(index);
        Ok(true)
    }

    unsafe fn copy(
        &self,
        dst: &mut ContainerObject,
        src: &ContainerObject,
        _element: &ElementOps<'_>,
    ) -> Result<()> {
        dst.clone_from(src);
        Ok(())
    }

    unsafe fn compare(
        &self,
        lhs: &ContainerObject,
        rhs: &ContainerObject,
        _element: &ElementOps<'_>,
    ) -> Result<bool> {
        Ok(lhs == rhs)
    }

    fn visit(
        &self,
        object: &ContainerObject,
        _element: &ElementOps<'_>,
        visitor: &mut dyn FnMut(&[u8]) -> bool,
    ) {
        for byte in object.chunks_exact(1) {
            if !visitor(byte) {
                break;
            }
        }
    }

    unsafe fn dump(
        &self,
        object: &ContainerObject,
        _element: &ElementOps<'_>,
        sink: &mut dyn OutputStream,
    ) -> Result<()> {
        sink.write(object)
    }

    unsafe fn load(
        &self,
        object: &mut ContainerObject,
        count: u64,
        element: &ElementOps<'_>,
        source: &mut dyn InputStream,
    ) -> Result<()> {
        let count = storage::check_count(count, element, source)?;
        storage::load_bytes(object, count, source)
    }
}

/// Factory of `/std/string`.
///
/// Without arguments the element is `/char`; with one argument the string
/// is named after it (`/std/string</uint8_t>`).
pub fn string_factory(registry: &mut Registry, arguments: &[TypeId]) -> Result<TypeId> {
    let (element, full_name) = match arguments {
        [] => {
            let element = registry.resolve(CHAR_TYPE_NAME)?;
            (element, STRING_KIND.to_string())
        }
        [element] => {
            let element_name = registry.type_ref(*element).name().to_string();
            let default_char = registry.get(CHAR_TYPE_NAME).map(|t| t.id());
            if default_char == Some(*element) {
                (*element, STRING_KIND.to_string())
            } else {
                let name = crate::types::name::container_name(STRING_KIND, &[&element_name]);
                (*element, name)
            }
        }
        _ => {
            return Err(Error::unsupported(
                STRING_KIND,
                format!("expected at most 1 type argument, got {}", arguments.len()),
            ))
        }
    };
    if let Some(existing) = registry.get(&full_name) {
        return Ok(existing.id());
    }
    StdString.validate_element(registry.type_ref(element))?;
    registry.add(Type::container(full_name, element, Arc::new(StdString)), None)
}
