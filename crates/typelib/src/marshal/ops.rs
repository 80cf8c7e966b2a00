// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Region visitors implementing each marshalling operation over a slice of
//! a layout program.
//!
//! The `*_range` functions are the common entry for whole values (program
//! `0..len`) and container elements (the body of a `Container` block).

use super::stream::{read_count, write_count, InputStream, OutputStream};
use super::walk::{walk, RegionVisitor};
use crate::container::{
    take_slot, write_slot, ElementOps, SlotGuard, SlotRef, CONTAINER_OBJECT_SIZE,
};
use crate::error::{Error, Result};
use crate::layout::{ContainerEntry, MemoryLayout};
use std::ops::Range;

/// Bytes `offset..offset + len` of a `available`-byte buffer.
fn span(available: usize, offset: usize, len: usize) -> Result<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= available => Ok(offset..end),
        _ => Err(Error::BufferSize {
            expected: offset.saturating_add(len),
            actual: available,
        }),
    }
}

fn slot_span(available: usize, offset: usize) -> Result<Range<usize>> {
    span(available, offset, CONTAINER_OBJECT_SIZE)
}

// ============================================================================
// Init
// ============================================================================

struct InitVisitor<'a> {
    buffer: &'a mut [u8],
}

impl RegionVisitor for InitVisitor<'_> {
    fn memcpy(&mut self, _offset: usize, _len: usize) -> Result<bool> {
        Ok(true)
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        _element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.buffer.len(), offset)?;
        write_slot(self.buffer, offset, entry.ops().init());
        Ok(true)
    }
}

/// Construct every container object of `buffer`. Flat bytes are left as is.
///
/// Objects already present are overwritten, never dropped.
pub(crate) fn init_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    buffer: &mut [u8],
) -> Result<()> {
    walk(layout, start, end, 0, &mut InitVisitor { buffer }).map(drop)
}

// ============================================================================
// Zero / Destroy
// ============================================================================

struct ZeroVisitor<'a> {
    buffer: &'a mut [u8],
}

impl RegionVisitor for ZeroVisitor<'_> {
    fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool> {
        let range = span(self.buffer.len(), offset, len)?;
        self.buffer[range].fill(0);
        Ok(true)
    }

    fn skip(&mut self, offset: usize, len: usize) -> Result<bool> {
        self.memcpy(offset, len)
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.buffer.len(), offset)?;
        // SAFETY: zero_range callers guarantee live objects at every slot.
        let mut object = unsafe { SlotGuard::new(self.buffer, offset) };
        unsafe { entry.ops().clear(&mut object, &element)? };
        Ok(true)
    }
}

/// Zero flat bytes and clear every container.
///
/// # Safety
///
/// `buffer` must hold live container objects at every slot of the range.
pub(crate) unsafe fn zero_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    buffer: &mut [u8],
) -> Result<()> {
    walk(layout, start, end, 0, &mut ZeroVisitor { buffer }).map(drop)
}

struct DestroyVisitor<'a> {
    buffer: &'a mut [u8],
}

impl RegionVisitor for DestroyVisitor<'_> {
    fn memcpy(&mut self, _offset: usize, _len: usize) -> Result<bool> {
        Ok(true)
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.buffer.len(), offset)?;
        // SAFETY: destroy_range callers guarantee live objects at every
        // slot; the slot is left holding an empty object.
        unsafe {
            let object = take_slot(self.buffer, offset);
            entry.ops().destroy(object, &element)?;
        }
        Ok(true)
    }
}

/// Destroy every container object. Slots are left holding empty objects.
///
/// # Safety
///
/// See [`zero_range`].
pub(crate) unsafe fn destroy_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    buffer: &mut [u8],
) -> Result<()> {
    walk(layout, start, end, 0, &mut DestroyVisitor { buffer }).map(drop)
}

// ============================================================================
// Copy / Compare
// ============================================================================

struct CopyVisitor<'a> {
    dst: &'a mut [u8],
    src: &'a [u8],
}

impl RegionVisitor for CopyVisitor<'_> {
    fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool> {
        let range = span(self.dst.len().min(self.src.len()), offset, len)?;
        self.dst[range.clone()].copy_from_slice(&self.src[range]);
        Ok(true)
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.dst.len().min(self.src.len()), offset)?;
        // SAFETY: copy_range callers guarantee live objects in both buffers.
        unsafe {
            let source = SlotRef::new(self.src, offset);
            let mut target = SlotGuard::new(self.dst, offset);
            entry.ops().copy(&mut target, &source, &element)?;
        }
        Ok(true)
    }
}

/// Deep-copy `src` into the initialised `dst`. Padding is not copied.
///
/// # Safety
///
/// Both buffers must hold live container objects at every slot.
pub(crate) unsafe fn copy_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    dst: &mut [u8],
    src: &[u8],
) -> Result<()> {
    walk(layout, start, end, 0, &mut CopyVisitor { dst, src }).map(drop)
}

struct CompareVisitor<'a> {
    lhs: &'a [u8],
    rhs: &'a [u8],
}

impl RegionVisitor for CompareVisitor<'_> {
    fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool> {
        let range = span(self.lhs.len().min(self.rhs.len()), offset, len)?;
        Ok(self.lhs[range.clone()] == self.rhs[range])
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.lhs.len().min(self.rhs.len()), offset)?;
        // SAFETY: compare_range callers guarantee live objects in both
        // buffers.
        unsafe {
            let lhs = SlotRef::new(self.lhs, offset);
            let rhs = SlotRef::new(self.rhs, offset);
            entry.ops().compare(&lhs, &rhs, &element)
        }
    }
}

/// Compare data bytes and containers, stopping at the first difference.
///
/// # Safety
///
/// See [`copy_range`].
pub(crate) unsafe fn compare_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    lhs: &[u8],
    rhs: &[u8],
) -> Result<bool> {
    let finished = walk(layout, start, end, 0, &mut CompareVisitor { lhs, rhs })?;
    Ok(finished.is_some())
}

// ============================================================================
// Dump / Load
// ============================================================================

struct DumpVisitor<'a> {
    buffer: &'a [u8],
    sink: &'a mut dyn OutputStream,
}

impl RegionVisitor for DumpVisitor<'_> {
    fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool> {
        let range = span(self.buffer.len(), offset, len)?;
        self.sink.write(&self.buffer[range])?;
        Ok(true)
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.buffer.len(), offset)?;
        // SAFETY: dump_range callers guarantee live objects at every slot.
        unsafe {
            let object = SlotRef::new(self.buffer, offset);
            let count = entry.ops().len(&object, &element) as u64;
            write_count(self.sink, count)?;
            entry.ops().dump(&object, &element, self.sink)?;
        }
        Ok(true)
    }
}

/// Write data bytes and `(count, elements)` container blocks to `sink`.
///
/// # Safety
///
/// See [`zero_range`].
pub(crate) unsafe fn dump_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    buffer: &[u8],
    sink: &mut dyn OutputStream,
) -> Result<()> {
    walk(layout, start, end, 0, &mut DumpVisitor { buffer, sink }).map(drop)
}

struct LoadVisitor<'a> {
    buffer: &'a mut [u8],
    source: &'a mut dyn InputStream,
}

impl RegionVisitor for LoadVisitor<'_> {
    fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool> {
        let range = span(self.buffer.len(), offset, len)?;
        self.source.read(&mut self.buffer[range])?;
        Ok(true)
    }

    fn container(
        &mut self,
        offset: usize,
        _op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool> {
        slot_span(self.buffer.len(), offset)?;
        let count = read_count(self.source)?;
        // SAFETY: load_range callers guarantee live objects at every slot.
        unsafe {
            let mut object = SlotGuard::new(self.buffer, offset);
            entry.ops().load(&mut object, count, &element, self.source)?;
        }
        Ok(true)
    }
}

/// Inverse of [`dump_range`]; containers are resized to the loaded counts.
///
/// # Safety
///
/// See [`zero_range`].
pub(crate) unsafe fn load_range(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    buffer: &mut [u8],
    source: &mut dyn InputStream,
) -> Result<()> {
    walk(layout, start, end, 0, &mut LoadVisitor { buffer, source }).map(drop)
}
