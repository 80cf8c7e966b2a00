// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Variable-length containers.
//!
//! A container type has a fixed-size *object* inside the value buffer and
//! a runtime element count. Every built-in kind stores its object as a
//! [`ContainerObject`] (a byte vector holding `len * element_size` element
//! bytes), written unaligned into the buffer at the container's offset.
//!
//! Element-level work (initialising nested containers, copying, dumping)
//! is delegated to [`ElementOps`], the slice of the layout program that
//! describes one element. Container implementations never interpret
//! element bytes themselves.
//!
//! Kinds are plugged in per registry through [`ContainerFactory`]
//! functions, see [`Registry::register_container_factory`].

mod storage;
mod string;
mod vector;

pub use string::{StdString, string_factory};
pub use vector::{Vector, vector_factory};

use crate::error::Result;
use crate::layout::{LayoutOp, MemoryLayout};
use crate::marshal::ops;
use crate::marshal::stream::{InputStream, OutputStream};
use crate::registry::Registry;
use crate::types::{TypeId, TypeRef};
use std::fmt;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::ptr;

/// In-buffer representation of every built-in container.
pub type ContainerObject = Vec<u8>;

/// Bytes occupied by a container object inside a value buffer.
pub const CONTAINER_OBJECT_SIZE: usize = mem::size_of::<ContainerObject>();

/// Builds (or finds) the container type instantiated on `arguments`.
pub type ContainerFactory = fn(&mut Registry, &[TypeId]) -> Result<TypeId>;

/// Runtime behaviour of a container kind.
///
/// # Safety
///
/// Every kind shares the in-buffer object [`ContainerObject`], which is
/// always [`CONTAINER_OBJECT_SIZE`] bytes.
///
/// Implementors keep element storage as `len * element.size()` bytes in
/// the object and only create, clone or drop nested container objects
/// through the [`ElementOps`] they are handed. The marshalling code relies
/// on this to find live container objects at the offsets the layout
/// program describes.
///
/// The `unsafe` methods require `object` to be a live object created by
/// [`Container::init`] (or loaded/copied through this trait) for the same
/// element layout as `element`.
pub unsafe trait Container: fmt::Debug + Send + Sync {
    /// Kind name, e.g. `/std/vector`.
    fn kind(&self) -> &str;

    /// Reject element types this kind cannot hold.
    fn validate_element(&self, element: TypeRef<'_>) -> Result<()>;

    /// Fresh, empty object.
    fn init(&self) -> ContainerObject {
        ContainerObject::new()
    }

    /// Number of elements.
    fn len(&self, object: &ContainerObject, element: &ElementOps<'_>) -> usize {
        object.len() / element.size().max(1)
    }

    /// Release the object and every nested container it holds.
    unsafe fn destroy(&self, object: ContainerObject, element: &ElementOps<'_>) -> Result<()>;

    /// Remove every element.
    unsafe fn clear(&self, object: &mut ContainerObject, element: &ElementOps<'_>) -> Result<()>;

    /// Grow (initialising new elements) or shrink (destroying removed ones).
    unsafe fn resize(
        &self,
        object: &mut ContainerObject,
        len: usize,
        element: &ElementOps<'_>,
    ) -> Result<()>;

    /// Append a copy of `value`, which holds one element.
    unsafe fn push(
        &self,
        object: &mut ContainerObject,
        value: &[u8],
        element: &ElementOps<'_>,
    ) -> Result<()>;

    /// Remove the element at `index`. False when out of range.
    unsafe fn erase(
        &self,
        object: &mut ContainerObject,
        index: usize,
        element: &ElementOps<'_>,
    ) -> Result<bool>;

    /// Make `dst` a deep copy of `src`.
    unsafe fn copy(
        &self,
        dst: &mut ContainerObject,
        src: &ContainerObject,
        element: &ElementOps<'_>,
    ) -> Result<()>;

    /// Element-wise equality.
    unsafe fn compare(
        &self,
        lhs: &ContainerObject,
        rhs: &ContainerObject,
        element: &ElementOps<'_>,
    ) -> Result<bool>;

    /// Hand every element's bytes to `visitor` until it returns false.
    fn visit(
        &self,
        object: &ContainerObject,
        element: &ElementOps<'_>,
        visitor: &mut dyn FnMut(&[u8]) -> bool,
    );

    /// Write the element payloads (the count is written by the caller).
    unsafe fn dump(
        &self,
        object: &ContainerObject,
        element: &ElementOps<'_>,
        sink: &mut dyn OutputStream,
    ) -> Result<()>;

    /// Read `count` element payloads, resizing the object first.
    unsafe fn load(
        &self,
        object: &mut ContainerObject,
        count: u64,
        element: &ElementOps<'_>,
        source: &mut dyn InputStream,
    ) -> Result<()>;
}

/// Layout of one container element: the program between a `Container`
/// instruction and its `End`.
#[derive(Debug, Clone, Copy)]
pub struct ElementOps<'a> {
    layout: &'a MemoryLayout,
    start: usize,
    end: usize,
    size: usize,
}

impl<'a> ElementOps<'a> {
    pub(crate) fn new(layout: &'a MemoryLayout, start: usize, end: usize, size: usize) -> Self {
        Self {
            layout,
            start,
            end,
            size,
        }
    }

    /// Element size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Element program.
    pub fn program(&self) -> &'a [LayoutOp] {
        &self.layout.ops()[self.start..self.end]
    }

    /// Elements hold no nested container.
    pub fn is_plain(&self) -> bool {
        !self
            .program()
            .iter()
            .any(|op| matches!(op, LayoutOp::Container(_)))
    }

    /// Elements are a single MEMCPY covering the whole element.
    pub fn is_memcpy(&self) -> bool {
        matches!(self.program(), [LayoutOp::Memcpy(n)] if *n == self.size)
    }

    /// Whether the standalone `layout` describes this element. Container
    /// operands are compared by container entry, and the trailing padding
    /// stripped from `layout` is accounted for.
    pub fn matches(&self, layout: &MemoryLayout) -> bool {
        let ops = layout.ops();
        let program = match self.program().split_last() {
            Some((LayoutOp::Skip(n), rest))
                if *n == layout.trailing_padding() && rest.len() == ops.len() =>
            {
                rest
            }
            _ => self.program(),
        };
        self.size == layout.size()
            && program.len() == ops.len()
            && program.iter().zip(ops).all(|(a, b)| match (a, b) {
                (LayoutOp::Container(x), LayoutOp::Container(y)) => {
                    self.layout.containers()[*x] == layout.containers()[*y]
                }
                _ => a == b,
            })
    }

    /// Minimum number of wire bytes one element dumps to.
    pub fn min_wire_size(&self) -> usize {
        self.layout.min_wire_size(self.start, self.end)
    }

    /// Initialise the nested containers of one element.
    pub fn init(&self, element: &mut [u8]) -> Result<()> {
        ops::init_range(self.layout, self.start, self.end, element)
    }

    /// Destroy the nested containers of one element.
    ///
    /// # Safety
    ///
    /// `element` must hold live container objects at the nested slots.
    pub unsafe fn destroy(&self, element: &mut [u8]) -> Result<()> {
        ops::destroy_range(self.layout, self.start, self.end, element)
    }

    /// Zero one element, clearing its nested containers.
    ///
    /// # Safety
    ///
    /// See [`ElementOps::destroy`].
    pub unsafe fn zero(&self, element: &mut [u8]) -> Result<()> {
        ops::zero_range(self.layout, self.start, self.end, element)
    }

    /// Copy one element into an initialised one.
    ///
    /// # Safety
    ///
    /// Both slices must hold live container objects at the nested slots.
    pub unsafe fn copy(&self, dst: &mut [u8], src: &[u8]) -> Result<()> {
        ops::copy_range(self.layout, self.start, self.end, dst, src)
    }

    /// Compare two elements.
    ///
    /// # Safety
    ///
    /// See [`ElementOps::copy`].
    pub unsafe fn compare(&self, lhs: &[u8], rhs: &[u8]) -> Result<bool> {
        ops::compare_range(self.layout, self.start, self.end, lhs, rhs)
    }

    /// Dump one element.
    ///
    /// # Safety
    ///
    /// See [`ElementOps::destroy`].
    pub unsafe fn dump(&self, element: &[u8], sink: &mut dyn OutputStream) -> Result<()> {
        ops::dump_range(self.layout, self.start, self.end, element, sink)
    }

    /// Load one initialised element.
    ///
    /// # Safety
    ///
    /// See [`ElementOps::destroy`].
    pub unsafe fn load(&self, element: &mut [u8], source: &mut dyn InputStream) -> Result<()> {
        ops::load_range(self.layout, self.start, self.end, element, source)
    }
}

// ============================================================================
// Slot access
// ============================================================================

/// Overwrite the slot at `offset` with `object`, without dropping what was
/// there.
pub(crate) fn write_slot(buffer: &mut [u8], offset: usize, object: ContainerObject) {
    let slot = &mut buffer[offset..offset + CONTAINER_OBJECT_SIZE];
    // SAFETY: the slot is CONTAINER_OBJECT_SIZE writable bytes; unaligned
    // write has no alignment requirement.
    unsafe { ptr::write_unaligned(slot.as_mut_ptr().cast::<ContainerObject>(), object) }
}

/// Move the object out of its slot, leaving an empty one behind.
///
/// # Safety
///
/// The slot must hold a live object.
pub(crate) unsafe fn take_slot(buffer: &mut [u8], offset: usize) -> ContainerObject {
    let slot = &buffer[offset..offset + CONTAINER_OBJECT_SIZE];
    let object = ptr::read_unaligned(slot.as_ptr().cast::<ContainerObject>());
    write_slot(buffer, offset, ContainerObject::new());
    object
}

/// Mutable access to a slot; the object is written back on drop.
pub(crate) struct SlotGuard<'a> {
    buffer: &'a mut [u8],
    offset: usize,
    object: ManuallyDrop<ContainerObject>,
}

impl<'a> SlotGuard<'a> {
    /// # Safety
    ///
    /// The slot must hold a live object.
    pub(crate) unsafe fn new(buffer: &'a mut [u8], offset: usize) -> Self {
        let slot = &buffer[offset..offset + CONTAINER_OBJECT_SIZE];
        let object = ptr::read_unaligned(slot.as_ptr().cast::<ContainerObject>());
        Self {
            buffer,
            offset,
            object: ManuallyDrop::new(object),
        }
    }
}

impl Deref for SlotGuard<'_> {
    type Target = ContainerObject;

    fn deref(&self) -> &ContainerObject {
        &self.object
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut ContainerObject {
        &mut self.object
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: taken exactly once; the guard is being dropped.
        let object = unsafe { ManuallyDrop::take(&mut self.object) };
        write_slot(self.buffer, self.offset, object);
    }
}

/// Read-only view of a slot. Never drops the object.
pub(crate) struct SlotRef<'a> {
    object: ManuallyDrop<ContainerObject>,
    _buffer: std::marker::PhantomData<&'a [u8]>,
}

impl SlotRef<'_> {
    /// # Safety
    ///
    /// The slot must hold a live object.
    pub(crate) unsafe fn new(buffer: &[u8], offset: usize) -> SlotRef<'_> {
        let slot = &buffer[offset..offset + CONTAINER_OBJECT_SIZE];
        SlotRef {
            object: ManuallyDrop::new(ptr::read_unaligned(
                slot.as_ptr().cast::<ContainerObject>(),
            )),
            _buffer: std::marker::PhantomData,
        }
    }
}

impl Deref for SlotRef<'_> {
    type Target = ContainerObject;

    fn deref(&self) -> &ContainerObject {
        &self.object
    }
}

/// Factories registered by `Registry::new`.
pub(crate) fn builtin_factories() -> [(&'static str, ContainerFactory); 2] {
    [
        (crate::config::VECTOR_KIND, vector_factory as ContainerFactory),
        (crate::config::STRING_KIND, string_factory as ContainerFactory),
    ]
}
