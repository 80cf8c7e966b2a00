// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Memory layout compiler.
//!
//! Turns a type into a flat program describing its bytes:
//!
//! | Instruction | Meaning |
//! |-------------|---------|
//! | `Memcpy(n)` | `n` bytes carrying information |
//! | `Skip(n)` | `n` bytes of padding |
//! | `Array(count) ... End` | `count` repetitions of the enclosed program |
//! | `Container(slot) ... End` | container object; the enclosed program is one element |
//!
//! The program is what the marshalling interpreter executes; it never
//! looks at the type again. Programs can be stored as integers with
//! [`MemoryLayout::to_bytecode`] and read back against a registry with
//! [`MemoryLayout::from_bytecode`].


use crate::config::{LayoutOptions, CONTAINER_COUNT_SIZE};
use crate::container::{Container, ElementOps, CONTAINER_OBJECT_SIZE};
use crate::error::{Error, Result};
use crate::marshal::walk::{self, RegionVisitor};
use crate::registry::Registry;
use crate::types::{TypeId, TypeKind, TypeRef};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Program
// ============================================================================

/// One instruction of a layout program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOp {
    /// Bytes carrying information.
    Memcpy(usize),
    /// Padding.
    Skip(usize),
    /// Start of a repeated block.
    Array(usize),
    /// Start of a container block; the operand indexes the container table.
    Container(usize),
    /// End of the innermost block.
    End,
}

/// Bytecode opcodes.
pub mod opcode {
    pub const MEMCPY: u64 = 0;
    pub const SKIP: u64 = 1;
    pub const ARRAY: u64 = 2;
    pub const END: u64 = 3;
    pub const CONTAINER: u64 = 4;
}

/// Container referenced by a `Container` instruction.
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    type_id: TypeId,
    name: String,
    element_size: usize,
    ops: Arc<dyn Container>,
}

impl ContainerEntry {
    /// Container type in the registry the layout was compiled from.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Container type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of one element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Runtime implementation.
    pub fn ops(&self) -> &dyn Container {
        self.ops.as_ref()
    }
}

impl PartialEq for ContainerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.element_size == other.element_size
            && self.ops.kind() == other.ops.kind()
    }
}

/// Top-level position of a container object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSlot {
    /// Byte offset of the object in a value buffer.
    pub offset: usize,
    /// Index of the `Container` instruction.
    pub op_index: usize,
}

/// Compiled layout of a type.
#[derive(Debug, Clone)]
pub struct MemoryLayout {
    ops: Vec<LayoutOp>,
    /// For each block instruction, the index of its `End`.
    ends: Vec<usize>,
    containers: Vec<ContainerEntry>,
    size: usize,
    trailing_padding: usize,
    slots: Vec<ContainerSlot>,
}

impl PartialEq for MemoryLayout {
    fn eq(&self, other: &Self) -> bool {
        self.ops == other.ops && self.size == other.size && self.containers == other.containers
    }
}

impl MemoryLayout {
    /// Compile `ty` with the default options.
    pub fn of(ty: TypeRef<'_>) -> Result<Self> {
        compile(ty, LayoutOptions::default())
    }

    fn assemble(
        ops: Vec<LayoutOp>,
        containers: Vec<ContainerEntry>,
        size: usize,
        trailing_padding: usize,
    ) -> Result<Self> {
        let ends = match_ends(&ops)?;
        let mut layout = Self {
            ops,
            ends,
            containers,
            size,
            trailing_padding,
            slots: Vec::new(),
        };
        if !layout.containers.is_empty() {
            let mut collector = SlotCollector::default();
            walk::walk(&layout, 0, layout.ops.len(), 0, &mut collector)?;
            layout.slots = collector.slots;
        }
        Ok(layout)
    }

    /// Program instructions.
    pub fn ops(&self) -> &[LayoutOp] {
        &self.ops
    }

    /// Size of a value buffer.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Padding stripped from the end of the program.
    pub fn trailing_padding(&self) -> usize {
        self.trailing_padding
    }

    /// Containers referenced by the program.
    pub fn containers(&self) -> &[ContainerEntry] {
        &self.containers
    }

    /// Top-level container objects, in buffer order.
    pub fn slots(&self) -> &[ContainerSlot] {
        &self.slots
    }

    /// Values are plain bytes: no container anywhere.
    pub fn is_plain(&self) -> bool {
        self.containers.is_empty()
    }

    /// The whole value is one MEMCPY region.
    pub fn is_memcpy(&self) -> bool {
        matches!(self.ops.as_slice(), [LayoutOp::Memcpy(n)] if *n == self.size)
    }

    /// Index of the `End` closing the block opened at `index`.
    pub(crate) fn end_of(&self, index: usize) -> usize {
        self.ends[index]
    }

    /// Container entry and element program of the block opened at
    /// `op_index`.
    pub fn element_ops(&self, op_index: usize) -> Option<(&ContainerEntry, ElementOps<'_>)> {
        let LayoutOp::Container(slot) = *self.ops.get(op_index)? else {
            return None;
        };
        let entry = self.containers.get(slot)?;
        let ops = ElementOps::new(self, op_index + 1, self.ends[op_index], entry.element_size);
        Some((entry, ops))
    }

    /// Top-level container whose object starts at `offset`.
    pub fn slot_at(&self, offset: usize) -> Option<ContainerSlot> {
        self.slots.iter().copied().find(|s| s.offset == offset)
    }

    /// Minimum number of wire bytes of the program `start..end`.
    pub(crate) fn min_wire_size(&self, start: usize, end: usize) -> usize {
        let mut total = 0usize;
        let mut i = start;
        while i < end {
            match self.ops[i] {
                LayoutOp::Memcpy(n) => total = total.saturating_add(n),
                LayoutOp::Skip(_) | LayoutOp::End => {}
                LayoutOp::Array(count) => {
                    let body = self.min_wire_size(i + 1, self.ends[i]);
                    total = total.saturating_add(count.saturating_mul(body));
                    i = self.ends[i];
                }
                LayoutOp::Container(_) => {
                    total = total.saturating_add(CONTAINER_COUNT_SIZE);
                    i = self.ends[i];
                }
            }
            i += 1;
        }
        total
    }

    // ========================================================================
    // Bytecode
    // ========================================================================

    /// Integer encoding of the program. Container operands are the
    /// container type handles.
    pub fn to_bytecode(&self) -> Vec<u64> {
        let mut code = Vec::with_capacity(self.ops.len() * 2);
        for op in &self.ops {
            match *op {
                LayoutOp::Memcpy(n) => code.extend([opcode::MEMCPY, n as u64]),
                LayoutOp::Skip(n) => code.extend([opcode::SKIP, n as u64]),
                LayoutOp::Array(count) => code.extend([opcode::ARRAY, count as u64]),
                LayoutOp::Container(slot) => code.extend([
                    opcode::CONTAINER,
                    self.containers[slot].type_id.index() as u64,
                ]),
                LayoutOp::End => code.push(opcode::END),
            }
        }
        code
    }

    /// Decode a program produced by [`MemoryLayout::to_bytecode`],
    /// resolving container handles in `registry`.
    ///
    /// The stripped trailing padding is not part of the encoding, so the
    /// decoded size is the extent of the program.
    pub fn from_bytecode(registry: &Registry, code: &[u64]) -> Result<Self> {
        let mut ops = Vec::new();
        let mut containers = Vec::new();
        let mut position = 0;
        while position < code.len() {
            let opcode = code[position];
            if opcode == opcode::END {
                ops.push(LayoutOp::End);
                position += 1;
                continue;
            }
            let operand = code
                .get(position + 1)
                .ok_or_else(|| Error::bytecode(position, "missing operand"))?;
            let operand = usize::try_from(*operand)
                .map_err(|_| Error::bytecode(position + 1, "operand out of range"))?;
            let op = match opcode {
                opcode::MEMCPY => LayoutOp::Memcpy(operand),
                opcode::SKIP => LayoutOp::Skip(operand),
                opcode::ARRAY => LayoutOp::Array(operand),
                opcode::CONTAINER => {
                    if u32::try_from(operand).is_err() {
                        return Err(Error::bytecode(position + 1, "container handle out of range"));
                    }
                    let id = TypeId::from_index(operand);
                    if !registry.contains_id(id) {
                        return Err(Error::bytecode(position + 1, "unknown container type"));
                    }
                    let ty = registry.type_ref(id);
                    let TypeKind::Container(container) = ty.kind() else {
                        return Err(Error::bytecode(
                            position + 1,
                            format!("{} is not a container", ty.name()),
                        ));
                    };
                    containers.push(ContainerEntry {
                        type_id: id,
                        name: ty.name().to_string(),
                        element_size: registry.type_of(container.element()).size(),
                        ops: Arc::clone(container.ops()),
                    });
                    LayoutOp::Container(containers.len() - 1)
                }
                other => {
                    return Err(Error::bytecode(position, format!("unknown opcode {other}")))
                }
            };
            ops.push(op);
            position += 2;
        }

        let ends = match_ends(&ops)?;
        let size = extent(&ops, &ends, &containers, 0, ops.len())?;
        MemoryLayout::assemble(ops, containers, size, 0)
    }
}

impl fmt::Display for MemoryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for op in &self.ops {
            if *op == LayoutOp::End {
                depth = depth.saturating_sub(1);
            }
            write!(f, "{:width$}", "", width = depth * 2)?;
            match op {
                LayoutOp::Memcpy(n) => writeln!(f, "MEMCPY {n}")?,
                LayoutOp::Skip(n) => writeln!(f, "SKIP {n}")?,
                LayoutOp::Array(count) => writeln!(f, "ARRAY {count}")?,
                LayoutOp::Container(slot) => {
                    writeln!(f, "CONTAINER {}", self.containers[*slot].name)?;
                }
                LayoutOp::End => writeln!(f, "END")?,
            }
            if matches!(op, LayoutOp::Array(_) | LayoutOp::Container(_)) {
                depth += 1;
            }
        }
        Ok(())
    }
}

/// Deepest ARRAY/CONTAINER nesting a layout program may have.
pub const MAX_NESTING: usize = 256;

fn match_ends(ops: &[LayoutOp]) -> Result<Vec<usize>> {
    let mut ends = vec![0; ops.len()];
    let mut open = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        match op {
            LayoutOp::Array(_) | LayoutOp::Container(_) => {
                if open.len() == MAX_NESTING {
                    return Err(Error::bytecode(
                        i,
                        format!("blocks nested deeper than {MAX_NESTING}"),
                    ));
                }
                open.push(i);
            }
            LayoutOp::End => {
                let start = open
                    .pop()
                    .ok_or_else(|| Error::bytecode(i, "END without an open block"))?;
                ends[start] = i;
            }
            LayoutOp::Memcpy(_) | LayoutOp::Skip(_) => {}
        }
    }
    match open.pop() {
        Some(start) => Err(Error::bytecode(start, "block is never closed")),
        None => Ok(ends),
    }
}

/// Bytes covered by `ops[start..end]`, checking container bodies against
/// their element size.
fn extent(
    ops: &[LayoutOp],
    ends: &[usize],
    containers: &[ContainerEntry],
    start: usize,
    end: usize,
) -> Result<usize> {
    let overflow = |i| Error::bytecode(i, "program size overflows");
    let mut total = 0usize;
    let mut i = start;
    while i < end {
        let bytes = match ops[i] {
            LayoutOp::Memcpy(n) | LayoutOp::Skip(n) => n,
            LayoutOp::End => 0,
            LayoutOp::Array(count) => {
                let body = extent(ops, ends, containers, i + 1, ends[i])?;
                let bytes = count.checked_mul(body).ok_or_else(|| overflow(i))?;
                i = ends[i];
                bytes
            }
            LayoutOp::Container(slot) => {
                let body = extent(ops, ends, containers, i + 1, ends[i])?;
                if body != containers[slot].element_size {
                    return Err(Error::bytecode(
                        i,
                        format!(
                            "element program covers {body} bytes, {} expects {}",
                            containers[slot].name, containers[slot].element_size
                        ),
                    ));
                }
                i = ends[i];
                CONTAINER_OBJECT_SIZE
            }
        };
        total = total.checked_add(bytes).ok_or_else(|| overflow(i))?;
        i += 1;
    }
    Ok(total)
}

#[derive(Default)]
struct SlotCollector {
    slots: Vec<ContainerSlot>,
}

impl RegionVisitor for SlotCollector {
    fn memcpy(&mut self, _offset: usize, _len: usize) -> Result<bool> {
        Ok(true)
    }

    fn container(
        &mut self,
        offset: usize,
        op_index: usize,
        _entry: &ContainerEntry,
        _element: ElementOps<'_>,
    ) -> Result<bool> {
        self.slots.push(ContainerSlot { offset, op_index });
        Ok(true)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compile the layout of `ty`.
pub fn compile(ty: TypeRef<'_>, options: LayoutOptions) -> Result<MemoryLayout> {
    let mut compiler = Compiler {
        options,
        ops: Vec::new(),
        containers: Vec::new(),
        in_progress: Vec::new(),
        padding_tail: 0,
    };
    compiler.add(ty)?;

    let mut trailing_padding = 0;
    if options.remove_trailing_skips {
        if let Some(LayoutOp::Skip(n)) = compiler.ops.last() {
            trailing_padding = *n;
            compiler.ops.pop();
        }
    }
    let layout = MemoryLayout::assemble(
        compiler.ops,
        compiler.containers,
        ty.size(),
        trailing_padding,
    )?;
    log::trace!(
        "[Layout] {} compiled to {} ops, {} containers",
        ty.name(),
        layout.ops.len(),
        layout.containers.len()
    );
    Ok(layout)
}

struct Compiler {
    options: LayoutOptions,
    ops: Vec<LayoutOp>,
    containers: Vec<ContainerEntry>,
    /// Compounds being compiled, to refuse types containing themselves.
    in_progress: Vec<TypeId>,
    /// Bytes of the last `Skip` that are compound padding.
    padding_tail: usize,
}

impl Compiler {
    fn push_memcpy(&mut self, mut n: usize) {
        if n == 0 {
            return;
        }
        if self.options.merge_skip_copy {
            // padding between two copied runs is copied along
            if let [.., LayoutOp::Memcpy(_), LayoutOp::Skip(pad)] = self.ops.as_slice() {
                if *pad == self.padding_tail {
                    n += *pad;
                    self.ops.pop();
                }
            }
            self.padding_tail = 0;
            if let Some(LayoutOp::Memcpy(last)) = self.ops.last_mut() {
                *last += n;
                return;
            }
        }
        self.padding_tail = 0;
        self.ops.push(LayoutOp::Memcpy(n));
    }

    /// Skip `n` bytes; `padding` marks compound gaps, as opposed to opaque
    /// data.
    fn push_skip(&mut self, n: usize, padding: bool) {
        if n == 0 {
            return;
        }
        let extend =
            self.options.merge_skip_copy && matches!(self.ops.last(), Some(LayoutOp::Skip(_)));
        if extend {
            if let Some(LayoutOp::Skip(last)) = self.ops.last_mut() {
                *last += n;
            }
        } else {
            self.ops.push(LayoutOp::Skip(n));
            self.padding_tail = 0;
        }
        self.padding_tail = if padding { self.padding_tail + n } else { 0 };
    }

    fn add(&mut self, ty: TypeRef<'_>) -> Result<()> {
        match ty.kind() {
            TypeKind::Null => Err(Error::unsupported(ty.name(), "null types have no layout")),
            TypeKind::Numeric(_) | TypeKind::Enum(_) => {
                self.push_memcpy(ty.size());
                Ok(())
            }
            TypeKind::Pointer(_) => {
                if !self.options.accept_pointers {
                    return Err(Error::NoLayout {
                        name: ty.name().to_string(),
                        reason: "is a pointer".to_string(),
                    });
                }
                self.push_memcpy(ty.size());
                Ok(())
            }
            TypeKind::Opaque => {
                if !self.options.accept_opaques {
                    return Err(Error::NoLayout {
                        name: ty.name().to_string(),
                        reason: "is an opaque type".to_string(),
                    });
                }
                self.push_skip(ty.size(), false);
                Ok(())
            }
            TypeKind::Compound(compound) => {
                if self.in_progress.contains(&ty.id()) {
                    return Err(Error::unsupported(ty.name(), "contains itself by value"));
                }
                self.in_progress.push(ty.id());
                let mut cursor = 0;
                for field in compound.fields_by_offset() {
                    if field.offset() < cursor {
                        return Err(Error::unsupported(
                            ty.name(),
                            format!("field {} overlaps the previous field", field.name()),
                        ));
                    }
                    self.push_skip(field.offset() - cursor, true);
                    let field_type = ty.field_type(field);
                    self.add(field_type)?;
                    cursor = field.offset() + field_type.size();
                }
                self.push_skip(ty.size().saturating_sub(cursor), true);
                self.in_progress.pop();
                Ok(())
            }
            TypeKind::Array { element, dimension } => {
                self.add_array(TypeRef::new(ty.registry(), *element), *dimension)
            }
            TypeKind::Container(container) => {
                let element = TypeRef::new(ty.registry(), container.element());
                self.containers.push(ContainerEntry {
                    type_id: ty.id(),
                    name: ty.name().to_string(),
                    element_size: element.size(),
                    ops: Arc::clone(container.ops()),
                });
                self.ops.push(LayoutOp::Container(self.containers.len() - 1));
                self.add(element)?;
                self.ops.push(LayoutOp::End);
                Ok(())
            }
        }
    }

    fn add_array(&mut self, element: TypeRef<'_>, dimension: usize) -> Result<()> {
        let start = self.ops.len();
        let containers = self.containers.len();
        let padding_tail = self.padding_tail;
        self.ops.push(LayoutOp::Array(dimension));
        self.add(element)?;

        let body = &self.ops[start + 1..];
        let single_memcpy = matches!(body, [LayoutOp::Memcpy(n)] if *n == element.size());
        let all_skip = body.iter().all(|op| matches!(op, LayoutOp::Skip(_)));

        let bytes = element.size().saturating_mul(dimension);
        if !(single_memcpy || all_skip || dimension == 0) {
            self.ops.push(LayoutOp::End);
            return Ok(());
        }
        self.ops.truncate(start);
        self.containers.truncate(containers);
        self.padding_tail = padding_tail;
        if single_memcpy {
            self.push_memcpy(bytes);
        } else if all_skip {
            self.push_skip(bytes, false);
        }
        Ok(())
    }
}
