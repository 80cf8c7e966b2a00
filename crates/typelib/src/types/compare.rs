// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural comparison of type graphs.
//!
//! Both walks carry the set of `(left, right)` pairs already under
//! comparison. A pair found in the set is assumed equal, which is what
//! makes self-referential compounds terminate. A mismatch anywhere
//! aborts the whole walk, so a pair left in the set is never wrong.

use super::{TypeKind, TypeRef};
use crate::types::TypeId;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Names and representation must match.
    Same,
    /// Representation must match; names are ignored.
    Cast,
}

struct Walk {
    mode: Mode,
    visited: HashSet<(TypeId, TypeId)>,
}

impl Walk {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            visited: HashSet::new(),
        }
    }

    fn compare(&mut self, lhs: TypeRef<'_>, rhs: TypeRef<'_>) -> bool {
        if lhs == rhs {
            return true;
        }
        if !self.visited.insert((lhs.id(), rhs.id())) {
            return true;
        }
        if self.mode == Mode::Same && lhs.name() != rhs.name() {
            return false;
        }
        lhs.category() == rhs.category() && lhs.size() == rhs.size() && self.compare_kinds(lhs, rhs)
    }

    fn compare_kinds(&mut self, lhs: TypeRef<'_>, rhs: TypeRef<'_>) -> bool {
        let left = |id| TypeRef::new(lhs.registry(), id);
        let right = |id| TypeRef::new(rhs.registry(), id);

        match (lhs.kind(), rhs.kind()) {
            (TypeKind::Null, TypeKind::Null) | (TypeKind::Opaque, TypeKind::Opaque) => true,
            (TypeKind::Numeric(a), TypeKind::Numeric(b)) => a == b,
            (TypeKind::Enum(a), TypeKind::Enum(b)) => match self.mode {
                Mode::Same => a == b,
                Mode::Cast => a.is_subset_of(b),
            },
            (TypeKind::Compound(a), TypeKind::Compound(b)) => {
                a.len() == b.len()
                    && a.fields().iter().zip(b.fields()).all(|(fa, fb)| {
                        (self.mode == Mode::Cast || fa.name() == fb.name())
                            && fa.offset() == fb.offset()
                            && self.compare(left(fa.type_id()), right(fb.type_id()))
                    })
            }
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => self.compare(left(*a), right(*b)),
            (
                TypeKind::Array {
                    element: ea,
                    dimension: da,
                },
                TypeKind::Array {
                    element: eb,
                    dimension: db,
                },
            ) => da == db && self.compare(left(*ea), right(*eb)),
            (TypeKind::Container(a), TypeKind::Container(b)) => {
                a.kind() == b.kind() && self.compare(left(a.element()), right(b.element()))
            }
            _ => false,
        }
    }
}

/// Structural equality, including names.
pub(crate) fn is_same(lhs: TypeRef<'_>, rhs: TypeRef<'_>) -> bool {
    Walk::new(Mode::Same).compare(lhs, rhs)
}

/// Representation equality; names ignored, enums compared by inclusion.
pub(crate) fn can_cast_to(lhs: TypeRef<'_>, rhs: TypeRef<'_>) -> bool {
    Walk::new(Mode::Cast).compare(lhs, rhs)
}
