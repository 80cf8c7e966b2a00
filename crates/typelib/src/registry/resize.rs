// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Propagating size changes (e.g. another pointer width) through a
//! registry.

use super::Registry;
use crate::error::Result;
use crate::types::{TypeId, TypeKind};
use std::collections::{BTreeMap, HashMap};

/// Old and new size of every type a resize touched, by type name.
pub type SizeChanges = BTreeMap<String, (usize, usize)>;

impl Registry {
    /// Set the sizes of the named types, then update every type that
    /// depends on them.
    ///
    /// Compound fields move by the growth of the fields that end before
    /// them; the compound grows by the largest field growth. Arrays are
    /// recomputed from their element.
    pub fn resize(&mut self, new_sizes: &BTreeMap<String, usize>) -> Result<SizeChanges> {
        let mut old_sizes: HashMap<TypeId, usize> = HashMap::new();
        let mut seeded = Vec::new();
        for (name, &size) in new_sizes {
            let id = self.resolve(name)?;
            seeded.push(id);
            let old = self.type_of(id).size();
            if old != size {
                old_sizes.insert(id, old);
                self.types[id.index()].set_size(size);
            }
        }
        if old_sizes.is_empty() {
            return Ok(SizeChanges::new());
        }

        for id in self.dependency_order() {
            if seeded.contains(&id) {
                continue;
            }
            let old = self.type_of(id).size();
            let new = match *self.type_of(id).kind() {
                TypeKind::Array { element, dimension } => {
                    self.type_of(element).size().saturating_mul(dimension)
                }
                TypeKind::Compound(_) => self.resize_compound(id, &old_sizes),
                _ => old,
            };
            if new != old {
                old_sizes.insert(id, old);
                self.types[id.index()].set_size(new);
            }
        }

        let changes: SizeChanges = old_sizes
            .iter()
            .map(|(id, &old)| {
                let ty = self.type_of(*id);
                (ty.name().to_string(), (old, ty.size()))
            })
            .collect();
        log::debug!("[Registry::resize] {} types changed size", changes.len());
        Ok(changes)
    }

    /// Shift the fields of a compound; returns its new size.
    fn resize_compound(&mut self, id: TypeId, old_sizes: &HashMap<TypeId, usize>) -> usize {
        let ty = self.type_of(id);
        let old_size = ty.size();
        let size_of = |field_type: TypeId| self.type_of(field_type).size();
        let old_size_of =
            |field_type: TypeId| old_sizes.get(&field_type).copied().unwrap_or(size_of(field_type));

        let mut order: Vec<usize> = (0..ty.fields().len()).collect();
        order.sort_by_key(|&i| ty.fields()[i].offset());

        // (old end, growth) of every field placed so far
        let mut placed: Vec<(usize, isize)> = Vec::with_capacity(order.len());
        let mut new_offsets = vec![0usize; order.len()];
        for &i in &order {
            let field = &ty.fields()[i];
            let shift = placed
                .iter()
                .filter(|(old_end, _)| *old_end <= field.offset())
                .map(|(_, growth)| *growth)
                .max()
                .unwrap_or(0);
            let new_offset = (field.offset() as isize + shift).max(0) as usize;
            let old_end = field.offset() + old_size_of(field.type_id());
            let new_end = new_offset + size_of(field.type_id());
            placed.push((old_end, new_end as isize - old_end as isize));
            new_offsets[i] = new_offset;
        }

        let growth = placed.iter().map(|(_, g)| *g).max().unwrap_or(0);
        let new_size = (old_size as isize + growth).max(0) as usize;

        if let Some(compound) = self.types[id.index()].as_compound_mut() {
            for (field, offset) in compound.fields_mut().iter_mut().zip(new_offsets) {
                field.set_offset(offset);
            }
        }
        new_size
    }
}
