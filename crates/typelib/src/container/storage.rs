// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Element storage shared by the built-in containers.
//!
//! Storage is a flat byte vector, `len * element.size()` bytes long. Plain
//! elements (no nested container) are moved around as raw bytes; the
//! others go through [`ElementOps`] one element at a time.

use super::{ContainerObject, ElementOps};
use crate::error::{Error, Result};
use crate::marshal::stream::{InputStream, OutputStream};

fn capacity_error(len: usize, size: usize) -> Error {
    Error::unsupported(
        "container storage",
        format!("{len} elements of {size} bytes overflow the address space"),
    )
}

pub(super) fn len(storage: &ContainerObject, element: &ElementOps<'_>) -> usize {
    match element.size() {
        0 => 0,
        size => storage.len() / size,
    }
}

pub(super) unsafe fn destroy(mut storage: ContainerObject, element: &ElementOps<'_>) -> Result<()> {
    if !element.is_plain() && element.size() > 0 {
        for chunk in storage.chunks_exact_mut(element.size()) {
            element.destroy(chunk)?;
        }
    }
    Ok(())
}

pub(super) unsafe fn resize(
    storage: &mut ContainerObject,
    new_len: usize,
    element: &ElementOps<'_>,
) -> Result<()> {
    let size = element.size();
    if size == 0 {
        return Ok(());
    }
    let old_len = len(storage, element);
    if new_len < old_len {
        if !element.is_plain() {
            for chunk in storage[new_len * size..].chunks_exact_mut(size) {
                element.destroy(chunk)?;
            }
        }
        storage.truncate(new_len * size);
    } else if new_len > old_len {
        let bytes = new_len
            .checked_mul(size)
            .ok_or_else(|| capacity_error(new_len, size))?;
        storage.resize(bytes, 0);
        if !element.is_plain() {
            for chunk in storage[old_len * size..].chunks_exact_mut(size) {
                element.init(chunk)?;
            }
        }
    }
    Ok(())
}

pub(super) unsafe fn push(
    storage: &mut ContainerObject,
    value: &[u8],
    element: &ElementOps<'_>,
) -> Result<()> {
    let size = element.size();
    if value.len() != size {
        return Err(Error::BufferSize {
            expected: size,
            actual: value.len(),
        });
    }
    let start = storage.len();
    storage.resize(start + size, 0);
    let slot = &mut storage[start..];
    element.init(slot)?;
    element.copy(slot, value)
}

pub(super) unsafe fn erase(
    storage: &mut ContainerObject,
    index: usize,
    element: &ElementOps<'_>,
) -> Result<bool> {
    let size = element.size();
    if index >= len(storage, element) {
        return Ok(false);
    }
    let range = index * size..(index + 1) * size;
    if !element.is_plain() {
        element.destroy(&mut storage[range.clone()])?;
    }
    storage.drain(range);
    Ok(true)
}

pub(super) unsafe fn copy(
    dst: &mut ContainerObject,
    src: &ContainerObject,
    element: &ElementOps<'_>,
) -> Result<()> {
    if element.is_plain() {
        dst.clear();
        dst.extend_from_slice(src);
        return Ok(());
    }
    let size = element.size();
    resize(dst, len(src, element), element)?;
    for (d, s) in dst.chunks_exact_mut(size).zip(src.chunks_exact(size)) {
        element.copy(d, s)?;
    }
    Ok(())
}

pub(super) unsafe fn compare(
    lhs: &ContainerObject,
    rhs: &ContainerObject,
    element: &ElementOps<'_>,
) -> Result<bool> {
    if lhs.len() != rhs.len() {
        return Ok(false);
    }
    if element.is_memcpy() {
        return Ok(lhs == rhs);
    }
    let size = element.size();
    if size == 0 {
        return Ok(true);
    }
    for (a, b) in lhs.chunks_exact(size).zip(rhs.chunks_exact(size)) {
        if !element.compare(a, b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(super) fn visit(
    storage: &ContainerObject,
    element: &ElementOps<'_>,
    visitor: &mut dyn FnMut(&[u8]) -> bool,
) {
    if element.size() == 0 {
        return;
    }
    for chunk in storage.chunks_exact(element.size()) {
        if !visitor(chunk) {
            break;
        }
    }
}

pub(super) unsafe fn dump(
    storage: &ContainerObject,
    element: &ElementOps<'_>,
    sink: &mut dyn OutputStream,
) -> Result<()> {
    if element.is_memcpy() {
        return sink.write(storage);
    }
    if element.size() == 0 {
        return Ok(());
    }
    for chunk in storage.chunks_exact(element.size()) {
        element.dump(chunk, sink)?;
    }
    Ok(())
}

/// Most bytes a load allocates ahead of the data actually read.
const LOAD_CHUNK_BYTES: usize = 64 * 1024;

pub(super) unsafe fn load(
    storage: &mut ContainerObject,
    count: u64,
    element: &ElementOps<'_>,
    source: &mut dyn InputStream,
) -> Result<()> {
    let count = check_count(count, element, source)?;
    resize(storage, 0, element)?;
    let size = element.size();
    if size == 0 {
        return Ok(());
    }

    // the count is only trusted as far as the data backing it
    let per_chunk = (LOAD_CHUNK_BYTES / size).max(1);
    let mut loaded = 0;
    while loaded < count {
        let end = loaded + per_chunk.min(count - loaded);
        resize(storage, end, element)?;
        if let Err(err) = load_elements(&mut storage[loaded * size..], element, source) {
            resize(storage, 0, element)?;
            return Err(err);
        }
        loaded = end;
    }
    Ok(())
}

unsafe fn load_elements(
    fresh: &mut [u8],
    element: &ElementOps<'_>,
    source: &mut dyn InputStream,
) -> Result<()> {
    if element.is_memcpy() {
        return source.read(fresh);
    }
    for chunk in fresh.chunks_exact_mut(element.size()) {
        element.load(chunk, source)?;
    }
    Ok(())
}

/// Read `len` raw bytes into `storage`, growing it a chunk at a time.
pub(super) fn load_bytes(
    storage: &mut ContainerObject,
    len: usize,
    source: &mut dyn InputStream,
) -> Result<()> {
    storage.clear();
    while storage.len() < len {
        let start = storage.len();
        let end = start + LOAD_CHUNK_BYTES.min(len - start);
        storage.resize(end, 0);
        if let Err(err) = source.read(&mut storage[start..]) {
            storage.clear();
            return Err(err);
        }
    }
    Ok(())
}

/// Refuse counts the source cannot possibly satisfy before allocating.
pub(super) fn check_count(
    count: u64,
    element: &ElementOps<'_>,
    source: &dyn InputStream,
) -> Result<usize> {
    let available = source.remaining_hint();
    let truncated = |needed| Error::DataTruncated {
        offset: source.position(),
        needed,
        available: available.unwrap_or(0),
    };
    let count = usize::try_from(count).map_err(|_| truncated(usize::MAX))?;
    let needed = count.saturating_mul(element.min_wire_size());
    if available.is_some_and(|available| needed > available) {
        return Err(truncated(needed));
    }
    // no stream holds more elements than the address space
    count
        .checked_mul(element.size())
        .ok_or_else(|| truncated(usize::MAX))?;
    Ok(count)
}
