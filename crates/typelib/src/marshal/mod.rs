// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Marshalling interpreter.
//!
//! Executes a [`MemoryLayout`] program against raw value buffers:
//!
//! - [`init`]: construct container objects (flat bytes untouched)
//! - [`zero`]: zero flat bytes, clear containers
//! - [`destroy`]: destroy container objects
//! - [`copy`] / [`compare`]: deep copy and equality
//! - [`dump`] / [`load`]: wire encoding
//!
//! # Wire format
//!
//! ```text
//! value     := region*
//! region    := MEMCPY payload bytes
//!            | count:u64 (native endian) element*   (one per container)
//! ```
//!
//! Padding is never written and nothing identifies the type: both ends
//! must hold the same layout.
//!
//! Buffers passed to the `unsafe` functions must have been initialised
//! with [`init`] (or loaded/copied into after that) for the same layout.
//! [`Value`] wraps a buffer and upholds this for you.

pub mod stream;
pub(crate) mod ops;
pub(crate) mod walk;
mod value;


pub use stream::{InputStream, IoSink, IoSource, OutputStream, SliceReader, SliceWriter};
pub use value::{Scalar, Value};

use crate::error::{Error, Result};
use crate::layout::MemoryLayout;
use crate::types::TypeRef;
use std::{ptr, slice};

fn check_buffer(buffer: &[u8], layout: &MemoryLayout) -> Result<()> {
    if buffer.len() < layout.size() {
        return Err(Error::BufferSize {
            expected: layout.size(),
            actual: buffer.len(),
        });
    }
    Ok(())
}

/// Construct the container objects of `buffer`.
///
/// Anything previously stored in the container slots is overwritten without
/// being released.
pub fn init(buffer: &mut [u8], layout: &MemoryLayout) -> Result<()> {
    check_buffer(buffer, layout)?;
    ops::init_range(layout, 0, layout.ops().len(), buffer)
}

/// Zero every data and padding byte and clear every container.
///
/// # Safety
///
/// `buffer` must hold an initialised value of `layout`.
pub unsafe fn zero(buffer: &mut [u8], layout: &MemoryLayout) -> Result<()> {
    check_buffer(buffer, layout)?;
    ops::zero_range(layout, 0, layout.ops().len(), buffer)
}

/// Release the container objects of `buffer`.
///
/// Slots are left holding empty objects, so the buffer can be destroyed
/// again or reused after [`init`].
///
/// # Safety
///
/// `buffer` must hold an initialised value of `layout`.
pub unsafe fn destroy(buffer: &mut [u8], layout: &MemoryLayout) -> Result<()> {
    check_buffer(buffer, layout)?;
    ops::destroy_range(layout, 0, layout.ops().len(), buffer)
}

/// Deep-copy `src` into `dst`. Padding bytes of `dst` are left as they were.
///
/// # Safety
///
/// Both buffers must hold initialised values of `layout`.
pub unsafe fn copy(dst: &mut [u8], src: &[u8], layout: &MemoryLayout) -> Result<()> {
    check_buffer(dst, layout)?;
    check_buffer(src, layout)?;
    ops::copy_range(layout, 0, layout.ops().len(), dst, src)
}

/// [`copy`] over raw pointers; a no-op when `dst == src`.
///
/// # Safety
///
/// Both pointers must address `layout.size()` bytes holding initialised
/// values of `layout`, and the two regions must be identical or disjoint.
pub unsafe fn copy_raw(dst: *mut u8, src: *const u8, layout: &MemoryLayout) -> Result<()> {
    if ptr::eq(dst.cast_const(), src) {
        return Ok(());
    }
    let dst = slice::from_raw_parts_mut(dst, layout.size());
    let src = slice::from_raw_parts(src, layout.size());
    copy(dst, src, layout)
}

/// Whether two values are equal. Padding is ignored.
///
/// # Safety
///
/// Both buffers must hold initialised values of `layout`.
pub unsafe fn compare(lhs: &[u8], rhs: &[u8], layout: &MemoryLayout) -> Result<bool> {
    check_buffer(lhs, layout)?;
    check_buffer(rhs, layout)?;
    if ptr::eq(lhs.as_ptr(), rhs.as_ptr()) {
        return Ok(true);
    }
    ops::compare_range(layout, 0, layout.ops().len(), lhs, rhs)
}

/// Encode `buffer` into `sink`.
///
/// # Safety
///
/// `buffer` must hold an initialised value of `layout`.
pub unsafe fn dump(
    buffer: &[u8],
    layout: &MemoryLayout,
    sink: &mut dyn OutputStream,
) -> Result<()> {
    check_buffer(buffer, layout)?;
    ops::dump_range(layout, 0, layout.ops().len(), buffer, sink)
}

/// Encode `buffer` into a new byte vector.
///
/// # Safety
///
/// See [`dump`].
pub unsafe fn dump_to_vec(buffer: &[u8], layout: &MemoryLayout) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(layout.size());
    dump(buffer, layout, &mut out)?;
    Ok(out)
}

/// Decode a value from `source` into `buffer`, resizing containers to the
/// loaded counts. Bytes left in `source` are not checked.
///
/// # Safety
///
/// `buffer` must hold an initialised value of `layout`.
pub unsafe fn load(
    buffer: &mut [u8],
    layout: &MemoryLayout,
    source: &mut dyn InputStream,
) -> Result<()> {
    check_buffer(buffer, layout)?;
    ops::load_range(layout, 0, layout.ops().len(), buffer, source)
}

/// Decode a whole encoded value.
///
/// Fails with [`Error::TrailingData`] when more bytes remain than the
/// layout's trailing padding.
///
/// # Safety
///
/// See [`load`].
pub unsafe fn load_from_slice(
    buffer: &mut [u8],
    layout: &MemoryLayout,
    data: &[u8],
) -> Result<()> {
    let mut reader = SliceReader::new(data);
    load(buffer, layout, &mut reader)?;
    let extra = reader.remaining();
    if extra > layout.trailing_padding() {
        return Err(Error::TrailingData {
            extra,
            allowed: layout.trailing_padding(),
        });
    }
    Ok(())
}

// ============================================================================
// Type-based helpers (compile the layout on every call)
// ============================================================================

/// [`init`] for a type.
pub fn init_type(buffer: &mut [u8], ty: TypeRef<'_>) -> Result<()> {
    init(buffer, &MemoryLayout::of(ty)?)
}

/// [`zero`] for a type.
///
/// # Safety
///
/// See [`zero`].
pub unsafe fn zero_type(buffer: &mut [u8], ty: TypeRef<'_>) -> Result<()> {
    zero(buffer, &MemoryLayout::of(ty)?)
}

/// [`destroy`] for a type.
///
/// # Safety
///
/// See [`destroy`].
pub unsafe fn destroy_type(buffer: &mut [u8], ty: TypeRef<'_>) -> Result<()> {
    destroy(buffer, &MemoryLayout::of(ty)?)
}

/// [`copy`] for a type.
///
/// # Safety
///
/// See [`copy`].
pub unsafe fn copy_type(dst: &mut [u8], src: &[u8], ty: TypeRef<'_>) -> Result<()> {
    copy(dst, src, &MemoryLayout::of(ty)?)
}

/// [`compare`] for a type.
///
/// # Safety
///
/// See [`compare`].
pub unsafe fn compare_type(lhs: &[u8], rhs: &[u8], ty: TypeRef<'_>) -> Result<bool> {
    compare(lhs, rhs, &MemoryLayout::of(ty)?)
}

/// [`dump`] for a type.
///
/// # Safety
///
/// See [`dump`].
pub unsafe fn dump_type(
    buffer: &[u8],
    ty: TypeRef<'_>,
    sink: &mut dyn OutputStream,
) -> Result<()> {
    dump(buffer, &MemoryLayout::of(ty)?, sink)
}

/// [`load_from_slice`] for a type.
///
/// # Safety
///
/// See [`load`].
pub unsafe fn load_type(buffer: &mut [u8], ty: TypeRef<'_>, data: &[u8]) -> Result<()> {
    load_from_slice(buffer, &MemoryLayout::of(ty)?, data)
}
