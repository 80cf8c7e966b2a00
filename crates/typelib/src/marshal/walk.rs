// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Program walker shared by every marshalling operation.
//!
//! The walker owns the buffer cursor and the array/container iteration.
//! Operations only see flat regions and container objects, so init, copy,
//! dump and load cannot disagree on where a field lives.

use crate::container::{ElementOps, CONTAINER_OBJECT_SIZE};
use crate::error::{Error, Result};
use crate::layout::{ContainerEntry, LayoutOp, MemoryLayout};

/// Callbacks for the regions of a program. Returning `false` stops the walk.
pub(crate) trait RegionVisitor {
    /// `len` bytes of data at `offset`.
    fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool>;

    /// `len` bytes of padding at `offset`.
    fn skip(&mut self, _offset: usize, _len: usize) -> Result<bool> {
        Ok(true)
    }

    /// Container object at `offset`, opened by instruction `op_index`.
    fn container(
        &mut self,
        offset: usize,
        op_index: usize,
        entry: &ContainerEntry,
        element: ElementOps<'_>,
    ) -> Result<bool>;
}

/// Walk `layout.ops()[start..end]` with the buffer cursor at `base`.
///
/// Returns the cursor after the program, or `None` if the visitor stopped.
pub(crate) fn walk<V: RegionVisitor + ?Sized>(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    base: usize,
    visitor: &mut V,
) -> Result<Option<usize>> {
    let ops = layout.ops();
    let mut offset = base;
    let mut i = start;
    while i < end {
        match ops[i] {
            LayoutOp::Memcpy(n) => {
                if !visitor.memcpy(offset, n)? {
                    return Ok(None);
                }
                offset += n;
            }
            LayoutOp::Skip(n) => {
                if !visitor.skip(offset, n)? {
                    return Ok(None);
                }
                offset += n;
            }
            LayoutOp::Array(count) => {
                let body_end = layout.end_of(i);
                match walk_array(layout, i + 1, body_end, count, offset, visitor)? {
                    Some(next) => offset = next,
                    None => return Ok(None),
                }
                i = body_end;
            }
            LayoutOp::Container(_) => {
                let (entry, element) = layout
                    .element_ops(i)
                    .ok_or_else(|| Error::bytecode(i, "container slot out of range"))?;
                if !visitor.container(offset, i, entry, element)? {
                    return Ok(None);
                }
                offset += CONTAINER_OBJECT_SIZE;
                i = layout.end_of(i);
            }
            LayoutOp::End => return Err(Error::bytecode(i, "END outside of a block")),
        }
        i += 1;
    }
    Ok(Some(offset))
}

fn walk_array<V: RegionVisitor + ?Sized>(
    layout: &MemoryLayout,
    start: usize,
    end: usize,
    count: usize,
    base: usize,
    visitor: &mut V,
) -> Result<Option<usize>> {
    if count == 0 {
        return Ok(Some(base));
    }
    // Bulk path: an array of plain bytes is one region.
    if let [LayoutOp::Memcpy(n)] = layout.ops()[start..end] {
        let len = n
            .checked_mul(count)
            .ok_or_else(|| Error::bytecode(start, "array size overflows"))?;
        return Ok(visitor.memcpy(base, len)?.then_some(base + len));
    }

    let Some(first_end) = walk(layout, start, end, base, visitor)? else {
        return Ok(None);
    };
    let stride = first_end - base;
    if stride == 0 {
        return Ok(Some(first_end));
    }
    let mut offset = first_end;
    for _ in 1..count {
        match walk(layout, start, end, offset, visitor)? {
            Some(next) => debug_assert_eq!(next, offset + stride),
            None => return Ok(None),
        }
        offset += stride;
    }
    Ok(Some(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(char, usize, usize)>,
        stop_after: Option<usize>,
    }

    impl Recorder {
        fn record(&mut self, kind: char, offset: usize, len: usize) -> bool {
            self.events.push((kind, offset, len));
            self.stop_after.map_or(true, |limit| self.events.len() < limit)
        }
    }

    impl RegionVisitor for Recorder {
        fn memcpy(&mut self, offset: usize, len: usize) -> Result<bool> {
            Ok(self.record('m', offset, len))
        }

        fn skip(&mut self, offset: usize, len: usize) -> Result<bool> {
            Ok(self.record('s', offset, len))
        }

        fn container(
            &mut self,
            offset: usize,
            _op_index: usize,
            _entry: &ContainerEntry,
            element: ElementOps<'_>,
        ) -> Result<bool> {
            Ok(self.record('c', offset, element.size()))
        }
    }

    fn decode(code: &[u64]) -> MemoryLayout {
        MemoryLayout::from_bytecode(&Registry::new(), code).expect("valid bytecode")
    }

    #[test]
    fn test_walk_array_strides() {
        use crate::layout::opcode::*;
        // ARRAY 3 { MEMCPY 2, SKIP 2 } END, MEMCPY 1
        let layout = decode(&[ARRAY, 3, MEMCPY, 2, SKIP, 2, END, MEMCPY, 1]);
        let mut recorder = Recorder::default();
        let end = walk(&layout, 0, layout.ops().len(), 0, &mut recorder).expect("walk");
        assert_eq!(end, Some(13));
        assert_eq!(
            recorder.events,
            vec![
                ('m', 0, 2),
                ('s', 2, 2),
                ('m', 4, 2),
                ('s', 6, 2),
                ('m', 8, 2),
                ('s', 10, 2),
                ('m', 12, 1),
            ]
        );
    }

    #[test]
    fn test_walk_bulk_array() {
        use crate::layout::opcode::*;
        let layout = decode(&[SKIP, 4, ARRAY, 5, MEMCPY, 8, END]);
        let mut recorder = Recorder::default();
        let end = walk(&layout, 0, layout.ops().len(), 0, &mut recorder).expect("walk");
        assert_eq!(end, Some(44));
        assert_eq!(recorder.events, vec![('s', 0, 4), ('m', 4, 40)]);
    }

    #[test]
    fn test_walk_stops_when_visitor_says_so() {
        use crate::layout::opcode::*;
        let layout = decode(&[MEMCPY, 1, SKIP, 1, MEMCPY, 1]);
        let mut recorder = Recorder {
            stop_after: Some(2),
            ..Recorder::default()
        };
        let end = walk(&layout, 0, layout.ops().len(), 0, &mut recorder).expect("walk");
        assert_eq!(end, None);
        assert_eq!(recorder.events.len(), 2);
    }

    #[test]
    fn test_walk_container_advances_by_object_size() {
        let mut registry = Registry::with_standard_types();
        let vector = registry.build("/std/vector</int32_t>").expect("vector");
        let layout = MemoryLayout::of(registry.type_ref(vector)).expect("layout");
        let mut recorder = Recorder::default();
        let end = walk(&layout, 0, layout.ops().len(), 0, &mut recorder).expect("walk");
        assert_eq!(end, Some(CONTAINER_OBJECT_SIZE));
        assert_eq!(recorder.events, vec![('c', 0, 4)]);
    }
}
