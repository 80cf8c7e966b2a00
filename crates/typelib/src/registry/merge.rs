// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Copying type graphs between registries.
//!
//! A merge maps every source handle to a target handle. Types already
//! present in the target under the same name are reused when structurally
//! identical and refused otherwise. Compounds are allocated before their
//! fields are merged, so a field pointing back to its compound finds the
//! target handle in the mapping and the walk terminates.

use super::{Entry, NameKey, Registry};
use crate::error::{Error, Result};
use crate::types::{Field, Type, TypeId, TypeKind, TypeRef};
use std::collections::{BTreeMap, HashMap};

/// Source handle -> target handle.
type Mapping = HashMap<TypeId, TypeId>;

/// Registry state restored when a merge fails halfway.
struct Checkpoint {
    types: usize,
    names: BTreeMap<NameKey, Entry>,
}

impl Registry {
    /// Copy `source` and everything it depends on into this registry.
    ///
    /// On error the registry is left as it was before the call.
    pub fn merge_type(&mut self, source: TypeRef<'_>) -> Result<TypeId> {
        self.atomically(|registry| registry.merge_with(source, &mut Mapping::new()))
    }

    /// Copy every type and alias of `other` into this registry.
    ///
    /// On error the registry is left as it was before the call.
    pub fn merge(&mut self, other: &Registry) -> Result<()> {
        self.atomically(|registry| registry.merge_all(other))
    }

    pub(super) fn atomically<T>(
        &mut self,
        apply: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = Checkpoint {
            types: self.types.len(),
            names: self.names.clone(),
        };
        let result = apply(self);
        if let Err(err) = &result {
            log::debug!(
                "[Registry] rolling back {} types: {}",
                self.types.len() - checkpoint.types,
                err
            );
            self.types.truncate(checkpoint.types);
            self.names = checkpoint.names;
            self.rebuild_view();
        }
        result
    }

    fn merge_all(&mut self, other: &Registry) -> Result<()> {
        let mut mapping = Mapping::new();
        for entry in other.iter().filter(|e| !e.alias) {
            self.merge_with(entry.ty, &mut mapping)?;
        }
        let mut aliases = 0usize;
        for entry in other.iter().filter(|e| e.alias) {
            let Some(&target) = mapping.get(&entry.ty.id()) else {
                continue;
            };
            if let Some(existing) = self.get(entry.name) {
                if existing.id() == target || existing.is_same(entry.ty) {
                    continue;
                }
                return Err(Error::DefinitionMismatch(entry.name.to_string()));
            }
            let base = self.type_of(target).name().to_string();
            self.alias(&base, entry.name, entry.source_id)?;
            aliases += 1;
        }
        log::debug!(
            "[Registry::merge] merged {} types ({} new aliases), registry now holds {}",
            mapping.len(),
            aliases,
            self.len()
        );
        Ok(())
    }

    fn merge_with(&mut self, source: TypeRef<'_>, mapping: &mut Mapping) -> Result<TypeId> {
        if let Some(&id) = mapping.get(&source.id()) {
            return Ok(id);
        }
        if let Some(existing) = self.get(source.name()) {
            if existing.is_same(source) {
                let id = existing.id();
                mapping.insert(source.id(), id);
                return Ok(id);
            }
            return Err(Error::DefinitionMismatch(source.name().to_string()));
        }

        let origin = source.registry().source_of(source.name());
        if let TypeKind::Compound(compound) = source.kind() {
            let mut shell = Type::compound(source.name());
            shell.set_size(source.size());
            shell.metadata_mut().merge(source.metadata());
            let id = self.add(shell, origin)?;
            mapping.insert(source.id(), id);

            for field in compound.fields() {
                let field_type = self.merge_with(source.field_type(field), mapping)?;
                let field_size = self.type_of(field_type).size();
                let merged = self.types[id.index()]
                    .push_field(Field::new(field.name(), field_type, field.offset()), field_size)?;
                merged.metadata_mut().merge(field.metadata());
            }
            return Ok(id);
        }

        let mut targets = Mapping::new();
        for dependency in source.depends_on() {
            let dependency_ref = TypeRef::new(source.registry(), dependency);
            targets.insert(dependency, self.merge_with(dependency_ref, mapping)?);
        }
        let mut kind = source.kind().clone();
        kind.map_ids(|id| targets.get(&id).copied().unwrap_or(id));
        let mut ty = Type::new(source.name(), source.size(), kind);
        ty.metadata_mut().merge(source.metadata());
        let id = self.add(ty, origin)?;
        mapping.insert(source.id(), id);
        Ok(id)
    }

    /// New registry holding only `names`, what they depend on, and the
    /// aliases of those types.
    pub fn minimal(&self, names: &[&str]) -> Result<Registry> {
        let mut result = Registry {
            factories: self.factories.clone(),
            ..Registry::new()
        };
        let mut mapping = Mapping::new();
        for name in names {
            let id = self.resolve(name)?;
            result.merge_with(self.type_ref(id), &mut mapping)?;
        }
        for entry in self.iter().filter(|e| e.alias) {
            if let Some(&target) = mapping.get(&entry.ty.id()) {
                let base = result.type_of(target).name().to_string();
                result.alias(&base, entry.name, entry.source_id)?;
            }
        }
        Ok(result)
    }
}
