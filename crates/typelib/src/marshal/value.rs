// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Owned value buffers.
//!
//! [`Value`] pairs a buffer with its layout and keeps the container objects
//! inside it live for as long as the value exists, so every operation on it
//! is safe.

use super::stream::{InputStream, OutputStream};
use crate::container::{
    ContainerObject, ElementOps, SlotGuard, SlotRef, CONTAINER_OBJECT_SIZE,
};
use crate::error::{Error, Result};
use crate::layout::{ContainerEntry, MemoryLayout};
use crate::types::TypeRef;
use std::fmt;
use std::sync::Arc;

mod sealed {
    pub trait Sealed {}
}

/// Fixed-size numbers readable from and writable to a [`Value`], in
/// native byte order.
pub trait Scalar: sealed::Sealed + Copy {
    /// Size in bytes.
    const SIZE: usize;

    #[doc(hidden)]
    fn write_ne(self, out: &mut [u8]);

    #[doc(hidden)]
    fn read_ne(bytes: &[u8]) -> Self;
}

/// Generate [`Scalar`] for primitive numbers
///
/// 1. `to_ne_bytes` into the target slice
/// 2. `from_ne_bytes` from a fixed array copied out of the source slice
macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn write_ne(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn read_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Initialised value of a layout.
pub struct Value {
    layout: Arc<MemoryLayout>,
    buffer: Vec<u8>,
}

impl Value {
    /// Zero-filled value with empty containers.
    pub fn new(layout: Arc<MemoryLayout>) -> Result<Self> {
        let mut buffer = vec![0u8; layout.size()];
        super::init(&mut buffer, &layout)?;
        Ok(Self { layout, buffer })
    }

    /// Compile the layout of `ty` and create a value of it.
    pub fn of(ty: TypeRef<'_>) -> Result<Self> {
        Self::new(Arc::new(MemoryLayout::of(ty)?))
    }

    pub fn layout(&self) -> &Arc<MemoryLayout> {
        &self.layout
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Byte range check; refuses ranges touching a container object.
    fn flat_range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or(Error::BufferSize {
                expected: offset.saturating_add(len),
                actual: self.buffer.len(),
            })?;
        let overlaps = self.layout.slots().iter().any(|slot| {
            offset < slot.offset + CONTAINER_OBJECT_SIZE && slot.offset < end && len > 0
        });
        if overlaps {
            return Err(Error::OverlapsContainer { offset, end });
        }
        Ok(offset..end)
    }

    /// Overwrite raw bytes outside container objects.
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let range = self.flat_range(offset, data.len())?;
        self.buffer[range].copy_from_slice(data);
        Ok(())
    }

    /// Raw bytes outside container objects.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.flat_range(offset, len)?;
        Ok(&self.buffer[range])
    }

    /// Write a number at `offset`.
    pub fn write<T: Scalar>(&mut self, offset: usize, value: T) -> Result<()> {
        let range = self.flat_range(offset, T::SIZE)?;
        value.write_ne(&mut self.buffer[range]);
        Ok(())
    }

    /// Read a number at `offset`.
    pub fn read<T: Scalar>(&self, offset: usize) -> Result<T> {
        let range = self.flat_range(offset, T::SIZE)?;
        Ok(T::read_ne(&self.buffer[range]))
    }

    /// Zero data bytes and clear every container.
    pub fn zero(&mut self) -> Result<()> {
        // SAFETY: the buffer was initialised for this layout in `new`.
        unsafe { super::zero(&mut self.buffer, &self.layout) }
    }

    /// Deep-copy `other`, which must have an equal layout.
    pub fn copy_from(&mut self, other: &Value) -> Result<()> {
        self.check_same_layout(other)?;
        // SAFETY: both buffers are initialised values of equal layouts.
        unsafe { super::copy(&mut self.buffer, &other.buffer, &self.layout) }
    }

    fn check_same_layout(&self, other: &Value) -> Result<()> {
        if Arc::ptr_eq(&self.layout, &other.layout) || *self.layout == *other.layout {
            return Ok(());
        }
        Err(Error::MarshalledTypeMismatch {
            expected: self.layout.to_string(),
            found: other.layout.to_string(),
        })
    }

    /// Encode into `sink`.
    pub fn dump(&self, sink: &mut dyn OutputStream) -> Result<()> {
        // SAFETY: the buffer is an initialised value of the layout.
        unsafe { super::dump(&self.buffer, &self.layout, sink) }
    }

    /// Encode into a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        // SAFETY: see `dump`.
        unsafe { super::dump_to_vec(&self.buffer, &self.layout) }
    }

    /// Decode from `source`, leaving extra bytes unread.
    pub fn load(&mut self, source: &mut dyn InputStream) -> Result<()> {
        // SAFETY: see `dump`.
        unsafe { super::load(&mut self.buffer, &self.layout, source) }
    }

    /// Decode a complete encoding.
    pub fn load_from_slice(&mut self, data: &[u8]) -> Result<()> {
        // SAFETY: see `dump`.
        unsafe { super::load_from_slice(&mut self.buffer, &self.layout, data) }
    }

    // ========================================================================
    // Containers
    // ========================================================================

    fn find_container(
        layout: &MemoryLayout,
        offset: usize,
    ) -> Result<(&ContainerEntry, ElementOps<'_>)> {
        layout
            .slot_at(offset)
            .and_then(|slot| layout.element_ops(slot.op_index))
            .ok_or_else(|| {
                Error::unsupported(
                    format!("offset {offset}"),
                    "no container object starts here",
                )
            })
    }

    fn require_plain(entry: &ContainerEntry, element: &ElementOps<'_>) -> Result<()> {
        if element.is_plain() {
            return Ok(());
        }
        Err(Error::unsupported(
            entry.name(),
            "elements hold containers; use push_value",
        ))
    }

    /// Run `f` on the live container object at `offset`.
    fn modify_container<R>(
        &mut self,
        offset: usize,
        f: impl FnOnce(&ContainerEntry, &ElementOps<'_>, &mut ContainerObject) -> Result<R>,
    ) -> Result<R> {
        let layout = Arc::clone(&self.layout);
        let (entry, element) = Self::find_container(&layout, offset)?;
        // SAFETY: slots of an initialised value hold live objects.
        let mut object = unsafe { SlotGuard::new(&mut self.buffer, offset) };
        f(entry, &element, &mut object)
    }

    /// Number of elements of the container at `offset`.
    pub fn element_count(&self, offset: usize) -> Result<usize> {
        let (entry, element) = Self::find_container(&self.layout, offset)?;
        // SAFETY: slots of an initialised value hold live objects.
        let object = unsafe { SlotRef::new(&self.buffer, offset) };
        Ok(entry.ops().len(&object, &element))
    }

    /// Append raw element bytes to the container at `offset`. Only for
    /// elements without nested containers.
    pub fn push_element(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.modify_container(offset, |entry, element, object| {
            Self::require_plain(entry, element)?;
            // SAFETY: plain element bytes carry no container objects.
            unsafe { entry.ops().push(object, bytes, element) }
        })
    }

    /// Append a deep copy of `value` to the container at `offset`.
    pub fn push_value(&mut self, offset: usize, value: &Value) -> Result<()> {
        self.modify_container(offset, |entry, element, object| {
            if !element.matches(&value.layout) {
                return Err(Error::MarshalledTypeMismatch {
                    expected: entry.name().to_string(),
                    found: value.layout.to_string(),
                });
            }
            // SAFETY: `value` is an initialised value of the element layout.
            unsafe { entry.ops().push(object, &value.buffer, element) }
        })
    }

    /// Remove element `index`; false when out of range.
    pub fn erase_element(&mut self, offset: usize, index: usize) -> Result<bool> {
        self.modify_container(offset, |entry, element, object| {
            // SAFETY: live object of this element layout.
            unsafe { entry.ops().erase(object, index, element) }
        })
    }

    /// Remove every element of the container at `offset`.
    pub fn clear_container(&mut self, offset: usize) -> Result<()> {
        self.modify_container(offset, |entry, element, object| {
            // SAFETY: live object of this element layout.
            unsafe { entry.ops().clear(object, element) }
        })
    }

    /// Bytes of element `index` of a container of plain elements.
    pub fn element_bytes(&self, offset: usize, index: usize) -> Result<Option<&[u8]>> {
        let bytes = self.container_bytes(offset)?;
        let (_, element) = Self::find_container(&self.layout, offset)?;
        let range = index
            .checked_mul(element.size())
            .and_then(|start| Some(start..start.checked_add(element.size())?));
        Ok(range.and_then(|range| bytes.get(range)))
    }

    /// Element storage of a container of plain elements.
    pub fn container_bytes(&self, offset: usize) -> Result<&[u8]> {
        let (entry, element) = Self::find_container(&self.layout, offset)?;
        Self::require_plain(entry, &element)?;
        // SAFETY: live slot. The storage belongs to this value and cannot
        // change while `self` is borrowed.
        unsafe {
            let object = SlotRef::new(&self.buffer, offset);
            Ok(std::slice::from_raw_parts(object.as_ptr(), object.len()))
        }
    }

    /// Hand each element of the container at `offset` to `visitor` until it
    /// returns false.
    pub fn visit_elements(
        &self,
        offset: usize,
        mut visitor: impl FnMut(&[u8]) -> bool,
    ) -> Result<()> {
        let (entry, element) = Self::find_container(&self.layout, offset)?;
        // SAFETY: live slot.
        let object = unsafe { SlotRef::new(&self.buffer, offset) };
        entry.ops().visit(&object, &element, &mut visitor);
        Ok(())
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        // SAFETY: the buffer holds an initialised value of the layout.
        if let Err(err) = unsafe { super::destroy(&mut self.buffer, &self.layout) } {
            log::debug!("[Value] destroy failed: {}", err);
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let mut buffer = vec![0u8; self.buffer.len()];
        let result = super::init(&mut buffer, &self.layout)
            // SAFETY: `buffer` was just initialised for the same layout.
            .and_then(|()| unsafe { super::copy(&mut buffer, &self.buffer, &self.layout) });
        if let Err(err) = result {
            log::debug!("[Value] clone failed: {}", err);
        }
        Self {
            layout: Arc::clone(&self.layout),
            buffer,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.check_same_layout(other).is_err() {
            return false;
        }
        // SAFETY: both buffers are initialised values of equal layouts.
        unsafe { super::compare(&self.buffer, &other.buffer, &self.layout) }.unwrap_or(false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("size", &self.buffer.len())
            .field("ops", &self.layout.ops())
            .field("containers", &self.layout.slots().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CompoundBuilder, Registry};

    fn point_with_samples(registry: &mut Registry) -> Value {
        let id = CompoundBuilder::new("/Sampled")
            .field("id", "/int32_t")
            .field("samples", "/std/vector</double>")
            .build(registry)
            .expect("compound");
        Value::of(registry.type_ref(id)).expect("value")
    }

    #[test]
    fn test_value_scalar_access() {
        let mut registry = Registry::with_standard_types();
        let mut value = point_with_samples(&mut registry);
        value.write(0, 42i32).expect("write id");
        assert_eq!(value.read::<i32>(0).expect("read id"), 42);
    }

    #[test]
    fn test_value_refuses_container_overlap() {
        let mut registry = Registry::with_standard_types();
        let mut value = point_with_samples(&mut registry);
        let samples = registry
            .get("/Sampled")
            .and_then(|t| t.field("samples").map(|f| f.offset()))
            .expect("samples offset");
        let err = value.write(samples, 1u64).expect_err("overlaps vector");
        assert!(matches!(err, Error::OverlapsContainer { .. }));
        assert!(value.read_bytes(samples - 1, 2).is_err());
    }

    #[test]
    fn test_value_container_elements() {
        let mut registry = Registry::with_standard_types();
        let mut value = point_with_samples(&mut registry);
        let samples = registry
            .get("/Sampled")
            .and_then(|t| t.field("samples").map(|f| f.offset()))
            .expect("samples offset");

        for x in [1.5f64, 2.5, 3.5] {
            value.push_element(samples, &x.to_ne_bytes()).expect("push");
        }
        assert_eq!(value.element_count(samples).expect("count"), 3);
        assert!(value.erase_element(samples, 1).expect("erase"));
        assert!(!value.erase_element(samples, 7).expect("erase out of range"));
        assert_eq!(
            value.element_bytes(samples, 1).expect("bytes"),
            Some(&3.5f64.to_ne_bytes()[..])
        );

        let mut seen = Vec::new();
        value
            .visit_elements(samples, |bytes| {
                seen.push(bytes.len());
                true
            })
            .expect("visit");
        assert_eq!(seen, vec![8, 8]);

        value.clear_container(samples).expect("clear");
        assert_eq!(value.element_count(samples).expect("count"), 0);
    }

    #[test]
    fn test_value_clone_is_deep() {
        let mut registry = Registry::with_standard_types();
        let mut value = point_with_samples(&mut registry);
        let samples = registry
            .get("/Sampled")
            .and_then(|t| t.field("samples").map(|f| f.offset()))
            .expect("samples offset");
        value.push_element(samples, &1.0f64.to_ne_bytes()).expect("push");

        let copy = value.clone();
        assert_eq!(copy, value);
        value.push_element(samples, &2.0f64.to_ne_bytes()).expect("push");
        assert_ne!(copy, value);
        assert_eq!(copy.element_count(samples).expect("count"), 1);
    }

    #[test]
    fn test_value_copy_from_other_layout_fails() {
        let mut registry = Registry::with_standard_types();
        let mut value = point_with_samples(&mut registry);
        let other = Value::of(registry.get("/double").expect("double")).expect("value");
        let err = value.copy_from(&other).expect_err("different layouts");
        assert!(matches!(err, Error::MarshalledTypeMismatch { .. }));
    }

    #[test]
    fn test_value_push_nested_value() {
        let mut registry = Registry::with_standard_types();
        let outer = registry
            .build("/std/vector</std/vector</int32_t>>")
            .expect("nested vector");
        let inner = registry.get("/std/vector</int32_t>").expect("inner").id();

        let mut row = Value::of(registry.type_ref(inner)).expect("row");
        row.push_element(0, &7i32.to_ne_bytes()).expect("push");
        let mut table = Value::of(registry.type_ref(outer)).expect("table");
        assert!(table.push_element(0, &[0u8; CONTAINER_OBJECT_SIZE]).is_err());
        table.push_value(0, &row).expect("push row");
        table.push_value(0, &row).expect("push row");
        assert_eq!(table.element_count(0).expect("count"), 2);

        let bytes = table.to_bytes().expect("dump");
        // outer count, then (count, payload) per row
        assert_eq!(bytes.len(), 8 + 2 * (8 + 4));
        let mut reloaded = Value::of(registry.type_ref(outer)).expect("value");
        reloaded.load_from_slice(&bytes).expect("load");
        assert_eq!(reloaded, table);
    }
}
