// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry.
//!
//! The registry owns every [`Type`] in an arena and binds names to them.
//! Names are absolute (`/A/B/C`). Relative lookups go through a view of
//! the names visible from the default namespace: every level from the
//! root down to the default namespace contributes its names, inner levels
//! shadowing outer ones.
//!
//! # Example
//!
//! ```
//! use typelib::Registry;
//!
//! let mut registry = Registry::with_standard_types();
//! let id = registry.build("/double[4]").expect("array of doubles");
//! assert_eq!(registry.type_ref(id).size(), 32);
//! ```

mod builder;
mod merge;
mod resize;


pub use builder::{CompoundBuilder, EnumBuilder};

use crate::config::{CHAR_TYPE_NAME, NULL_TYPE_NAME, STANDARD_SOURCE_ID, VOID_TYPE_NAME};
use crate::container::{builtin_factories, ContainerFactory};
use crate::error::{Error, Result};
use crate::types::name::{self, Modifier};
use crate::types::{Field, MetaData, NumericCategory, Type, TypeId, TypeKind, TypeRef};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Numeric types every standard registry starts with.
const STANDARD_NUMERICS: [(&str, usize, NumericCategory); 11] = [
    ("/int8_t", 1, NumericCategory::SInt),
    ("/int16_t", 2, NumericCategory::SInt),
    ("/int32_t", 4, NumericCategory::SInt),
    ("/int64_t", 8, NumericCategory::SInt),
    ("/uint8_t", 1, NumericCategory::UInt),
    ("/uint16_t", 2, NumericCategory::UInt),
    ("/uint32_t", 4, NumericCategory::UInt),
    ("/uint64_t", 8, NumericCategory::UInt),
    ("/float", 4, NumericCategory::Float),
    ("/double", 8, NumericCategory::Float),
    ("/bool", 1, NumericCategory::UInt),
];

/// Map key ordering names by namespace depth, then lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NameKey {
    depth: usize,
    name: String,
}

impl NameKey {
    fn new(name: &str) -> Self {
        Self {
            depth: name::depth(name),
            name: name.to_string(),
        }
    }
}

impl Ord for NameKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for NameKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: TypeId,
    persistent: bool,
    source_id: Option<String>,
    alias: bool,
}

/// One name of the registry, as yielded by [`Registry::iter`].
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry<'a> {
    /// Absolute name (the type's own name, or an alias).
    pub name: &'a str,
    /// Type bound to the name.
    pub ty: TypeRef<'a>,
    /// Whether the name belongs in exported dumps.
    pub persistent: bool,
    /// Origin of the definition, if recorded.
    pub source_id: Option<&'a str>,
    /// Whether the name is an alias.
    pub alias: bool,
}

/// Owner of a set of types and of their names.
#[derive(Debug, Clone)]
pub struct Registry {
    types: Vec<Type>,
    names: BTreeMap<NameKey, Entry>,
    /// Relative name -> (namespace level depth, type).
    current: HashMap<String, (usize, TypeId)>,
    namespace: String,
    factories: BTreeMap<String, ContainerFactory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry with the built-in container kinds registered.
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            names: BTreeMap::new(),
            current: HashMap::new(),
            namespace: "/".to_string(),
            factories: BTreeMap::new(),
        };
        for (kind, factory) in builtin_factories() {
            registry.register_container_factory(kind, factory);
        }
        registry
    }

    /// Registry holding the fixed-width integers, `/float`, `/double`,
    /// `/bool`, `/char` and the null types.
    pub fn with_standard_types() -> Self {
        let mut registry = Self::new();
        let mut int8 = None;
        for (name, size, category) in STANDARD_NUMERICS {
            let id = registry.own_standard(Type::numeric(name, size, category));
            if name == "/int8_t" {
                int8 = Some(id);
            }
        }
        let null = registry.own_standard(Type::null(NULL_TYPE_NAME));
        registry.bind_standard_alias(VOID_TYPE_NAME, null);
        if let Some(int8) = int8 {
            registry.bind_standard_alias(CHAR_TYPE_NAME, int8);
        }
        registry
    }

    /// Add the standard types to a registry that may already hold some of
    /// them. Fails like [`Registry::add`] / [`Registry::alias`] on a
    /// conflicting definition, leaving the registry unchanged.
    pub fn add_standard_types(&mut self) -> Result<()> {
        self.atomically(|registry| {
            let source = Some(STANDARD_SOURCE_ID);
            for (name, size, category) in STANDARD_NUMERICS {
                registry.add(Type::numeric(name, size, category), source)?;
            }
            registry.add(Type::null(NULL_TYPE_NAME), source)?;
            registry.alias(NULL_TYPE_NAME, VOID_TYPE_NAME, source)?;
            registry.alias("/int8_t", CHAR_TYPE_NAME, source)
        })
    }

    /// Push a standard type into a fresh registry; names are known valid
    /// and unbound.
    fn own_standard(&mut self, ty: Type) -> TypeId {
        let id = TypeId::from_index(self.types.len());
        let type_name = ty.name().to_string();
        self.types.push(ty);
        self.bind(&type_name, Self::standard_entry(id, false));
        id
    }

    fn bind_standard_alias(&mut self, alias: &str, id: TypeId) {
        self.bind(alias, Self::standard_entry(id, true));
    }

    fn standard_entry(id: TypeId, alias: bool) -> Entry {
        Entry {
            id,
            persistent: false,
            source_id: Some(STANDARD_SOURCE_ID.to_string()),
            alias,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Type of a handle issued by this registry.
    ///
    /// # Panics
    ///
    /// Panics if `id` comes from another registry.
    pub fn type_of(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    /// View of a handle issued by this registry.
    pub fn type_ref(&self, id: TypeId) -> TypeRef<'_> {
        TypeRef::new(self, id)
    }

    /// Whether `id` designates a type of this registry.
    pub fn contains_id(&self, id: TypeId) -> bool {
        id.index() < self.types.len()
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.names.get(&NameKey::new(name))
    }

    /// Type bound to `name`. Absolute names are looked up globally,
    /// relative ones through the default namespace.
    pub fn get(&self, name: &str) -> Option<TypeRef<'_>> {
        let id = if name.starts_with('/') {
            self.entry(name)?.id
        } else {
            self.current.get(name)?.1
        };
        Some(self.type_ref(id))
    }

    /// Like [`Registry::get`], failing with `Undefined`.
    pub fn resolve(&self, name: &str) -> Result<TypeId> {
        self.get(name)
            .map(|t| t.id())
            .ok_or_else(|| Error::Undefined(name.to_string()))
    }

    /// Whether `name` resolves.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether `name` resolves, building derived types on demand.
    pub fn has_or_build(&mut self, name: &str) -> bool {
        self.build(name).is_ok()
    }

    /// Resolve `name`, deriving pointer, array and container types the
    /// registry does not hold yet.
    ///
    /// Modifiers apply left to right after the base name: `/int32_t*[4]`
    /// is an array of 4 pointers, `/int32_t[2][3]` an array of 3 `[2]`
    /// arrays.
    pub fn build(&mut self, name: &str) -> Result<TypeId> {
        if let Some(existing) = self.get(name) {
            return Ok(existing.id());
        }

        let (base, modifiers) = name::split_modifiers(name);
        if !modifiers.is_empty() {
            let mut id = self.build(base)?;
            for modifier in modifiers {
                id = match modifier {
                    Modifier::Pointer => self.pointer_to(id)?,
                    Modifier::Array(dimension) => self.array_of(id, dimension)?,
                };
            }
            return Ok(id);
        }

        if let Some((kind, arguments)) = name::split_template(name) {
            let factory = self.factory(kind)?;
            let arguments = arguments
                .into_iter()
                .map(|argument| self.build(argument))
                .collect::<Result<Vec<_>>>()?;
            return factory(self, &arguments);
        }

        if let Ok(factory) = self.factory(name) {
            return factory(self, &[]);
        }
        Err(Error::Undefined(name.to_string()))
    }

    fn factory(&self, kind: &str) -> Result<ContainerFactory> {
        let absolute = if kind.starts_with('/') {
            kind.to_string()
        } else {
            format!("/{kind}")
        };
        self.factories
            .get(&absolute)
            .copied()
            .ok_or_else(|| Error::Undefined(kind.to_string()))
    }

    // ========================================================================
    // Derived types
    // ========================================================================

    /// Pointer to `target`, created on first request.
    pub fn pointer_to(&mut self, target: TypeId) -> Result<TypeId> {
        let pointer_name = name::pointer_name(self.type_of(target).name());
        if let Some(existing) = self.get(&pointer_name) {
            return match existing.kind() {
                TypeKind::Pointer(t) if *t == target => Ok(existing.id()),
                _ => Err(Error::AlreadyDefined(pointer_name)),
            };
        }
        self.add(Type::pointer(pointer_name, target), None)
    }

    /// Array of `dimension` elements, created on first request.
    pub fn array_of(&mut self, element: TypeId, dimension: usize) -> Result<TypeId> {
        let array_name = name::array_name(self.type_of(element).name(), dimension);
        if let Some(existing) = self.get(&array_name) {
            return match existing.kind() {
                TypeKind::Array {
                    element: e,
                    dimension: d,
                } if *e == element && *d == dimension => Ok(existing.id()),
                _ => Err(Error::AlreadyDefined(array_name)),
            };
        }
        let array = Type::array(array_name, self.type_ref(element), dimension);
        self.add(array, None)
    }

    /// Instance of container `kind` over `element`.
    pub fn container(&mut self, kind: &str, element: TypeId) -> Result<TypeId> {
        let factory = self.factory(kind)?;
        factory(self, &[element])
    }

    /// Register (or replace) the factory of a container kind.
    pub fn register_container_factory(&mut self, kind: impl Into<String>, factory: ContainerFactory) {
        self.factories.insert(kind.into(), factory);
    }

    /// Registered container kinds.
    pub fn container_kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    // ========================================================================
    // Definition
    // ========================================================================

    /// Take ownership of `ty` and bind it to its name.
    ///
    /// Adding a definition identical to the one already bound is a no-op
    /// returning the existing handle.
    pub fn add(&mut self, ty: Type, source_id: Option<&str>) -> Result<TypeId> {
        if !name::is_valid_type_name(ty.name(), true) {
            return Err(Error::BadName(ty.name().to_string()));
        }
        if let Some(entry) = self.entry(ty.name()) {
            if !entry.alias && self.type_of(entry.id).same_definition(&ty) {
                return Ok(entry.id);
            }
            return Err(Error::AlreadyDefined(ty.name().to_string()));
        }
        if let Some(missing) = ty
            .kind()
            .dependencies()
            .into_iter()
            .find(|id| !self.contains_id(*id))
        {
            return Err(Error::Undefined(missing.to_string()));
        }

        let persistent = source_id != Some(STANDARD_SOURCE_ID) && !self.is_derived(&ty);
        let id = TypeId::from_index(self.types.len());
        let type_name = ty.name().to_string();
        self.types.push(ty);
        self.bind(
            &type_name,
            Entry {
                id,
                persistent,
                source_id: source_id.map(str::to_string),
                alias: false,
            },
        );
        Ok(id)
    }

    /// Pointer / array carrying its canonical derived name.
    fn is_derived(&self, ty: &Type) -> bool {
        match ty.kind() {
            TypeKind::Pointer(target) => {
                ty.name() == name::pointer_name(self.type_of(*target).name())
            }
            TypeKind::Array { element, dimension } => {
                ty.name() == name::array_name(self.type_of(*element).name(), *dimension)
            }
            _ => false,
        }
    }

    /// Bind `new_name` to the type `base` resolves to.
    pub fn alias(&mut self, base: &str, new_name: &str, source_id: Option<&str>) -> Result<()> {
        if !name::is_valid_type_name(new_name, true) {
            return Err(Error::BadName(new_name.to_string()));
        }
        let id = self.resolve(base)?;
        if let Some(entry) = self.entry(new_name) {
            if entry.id == id {
                return Ok(());
            }
            return Err(Error::AlreadyDefinedName(new_name.to_string()));
        }
        self.bind(
            new_name,
            Entry {
                id,
                persistent: source_id != Some(STANDARD_SOURCE_ID),
                source_id: source_id.map(str::to_string),
                alias: true,
            },
        );
        Ok(())
    }

    fn bind(&mut self, name: &str, entry: Entry) {
        self.expose(name, entry.id);
        self.names.insert(NameKey::new(name), entry);
    }

    /// Add `name` to the relative view where it is visible.
    fn expose(&mut self, name: &str, id: TypeId) {
        for (depth, level) in name::namespace_levels(&self.namespace).into_iter().enumerate() {
            let Some(relative) = name::relative_name(name, level) else {
                continue;
            };
            let shadowed = self
                .current
                .get(relative)
                .is_some_and(|(existing, _)| *existing > depth);
            if !shadowed {
                self.current.insert(relative.to_string(), (depth, id));
            }
        }
    }

    fn rebuild_view(&mut self) {
        self.current.clear();
        let bindings: Vec<(String, TypeId)> = self
            .names
            .iter()
            .map(|(key, entry)| (key.name.clone(), entry.id))
            .collect();
        for (name, id) in bindings {
            self.expose(&name, id);
        }
    }

    /// Append a field to a compound already owned by the registry.
    ///
    /// This is how self-referential compounds are built: add the empty
    /// compound, derive the pointer to it, then add the fields.
    pub fn add_field(
        &mut self,
        compound: TypeId,
        field_name: &str,
        field_type: TypeId,
        offset: usize,
    ) -> Result<()> {
        if !self.contains_id(compound) {
            return Err(Error::Undefined(compound.to_string()));
        }
        if !self.contains_id(field_type) {
            return Err(Error::Undefined(field_type.to_string()));
        }
        let field_size = self.type_of(field_type).size();
        self.types[compound.index()]
            .push_field(Field::new(field_name, field_type, offset), field_size)
            .map(|_| ())
    }

    /// Override the size of a type (compound padding).
    pub fn set_size(&mut self, id: TypeId, size: usize) -> Result<()> {
        let ty = self
            .types
            .get_mut(id.index())
            .ok_or_else(|| Error::Undefined(id.to_string()))?;
        ty.set_size(size);
        Ok(())
    }

    /// Metadata of a type.
    pub fn metadata_mut(&mut self, id: TypeId) -> Option<&mut MetaData> {
        self.types.get_mut(id.index()).map(Type::metadata_mut)
    }

    /// Metadata of one field of a compound.
    pub fn field_metadata_mut(&mut self, compound: TypeId, field: &str) -> Option<&mut MetaData> {
        self.types
            .get_mut(compound.index())?
            .as_compound_mut()?
            .field_mut(field)
            .map(Field::metadata_mut)
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    /// Make `namespace` the base of relative lookups.
    pub fn set_default_namespace(&mut self, namespace: &str) -> Result<()> {
        let namespace = name::normalize_namespace(namespace);
        if !name::is_valid_namespace(&namespace, true) {
            return Err(Error::BadName(namespace));
        }
        self.namespace = namespace;
        self.rebuild_view();
        Ok(())
    }

    /// Base of relative lookups (`/` by default).
    pub fn default_namespace(&self) -> &str {
        &self.namespace
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Whether `name` belongs in exported dumps. Unknown names are not.
    pub fn is_persistent(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|e| e.persistent)
    }

    /// Source the definition bound to `name` came from.
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.entry(name)?.source_id.as_deref()
    }

    /// Whether `name` is an alias.
    pub fn is_alias(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|e| e.alias)
    }

    /// Every name, aliases included, in map order.
    pub fn iter(&self) -> impl Iterator<Item = RegistryEntry<'_>> {
        self.names.iter().map(move |(key, entry)| RegistryEntry {
            name: &key.name,
            ty: self.type_ref(entry.id),
            persistent: entry.persistent,
            source_id: entry.source_id.as_deref(),
            alias: entry.alias,
        })
    }

    /// Every bound name, in map order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|key| key.name.as_str())
    }

    /// Aliases bound to `id`.
    pub fn aliases_of(&self, id: TypeId) -> Vec<&str> {
        self.names
            .iter()
            .filter(|(_, entry)| entry.alias && entry.id == id)
            .map(|(key, _)| key.name.as_str())
            .collect()
    }

    /// Drop every alias.
    pub fn clear_aliases(&mut self) {
        self.names.retain(|_, entry| !entry.alias);
        self.rebuild_view();
    }

    /// Number of owned types (aliases excluded).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Every owned type, each after the types it depends on.
    ///
    /// Cycles (through pointers) are broken where the walk first comes back
    /// to a type it is still visiting.
    pub fn dependency_order(&self) -> Vec<TypeId> {
        fn visit(registry: &Registry, id: TypeId, seen: &mut HashSet<TypeId>, order: &mut Vec<TypeId>) {
            if !seen.insert(id) {
                return;
            }
            for dependency in registry.type_of(id).kind().dependencies() {
                visit(registry, dependency, seen, order);
            }
            order.push(id);
        }

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.types.len());
        for index in 0..self.types.len() {
            visit(self, TypeId::from_index(index), &mut seen, &mut order);
        }
        order
    }
}
