// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::config::{ENUM_SIZE, POINTER_SIZE};
use crate::registry::{CompoundBuilder, EnumBuilder};

fn point(registry: &mut Registry, name: &str) -> TypeId {
    CompoundBuilder::new(name)
        .field("x", "/int32_t")
        .field("y", "/int32_t")
        .build(registry)
        .expect("point")
}

/// `/Node { /Node* next; /int32_t value; }`
fn linked_node(registry: &mut Registry) -> TypeId {
    let node = registry.add(Type::compound("/Node"), None).expect("node shell");
    let next = registry.pointer_to(node).expect("node pointer");
    let int = registry.resolve("/int32_t").expect("int32");
    registry.add_field(node, "next", next, 0).expect("next");
    registry
        .add_field(node, "value", int, POINTER_SIZE)
        .expect("value");
    registry
        .set_size(node, POINTER_SIZE * 2)
        .expect("padded size");
    node
}

#[test]
fn test_constructors_and_categories() {
    let mut registry = Registry::with_standard_types();
    let double = registry.resolve("/double").expect("double");
    let pointer = registry.build("/double*").expect("pointer");
    let array = registry.build("/double[3]").expect("array");
    let vector = registry.build("/std/vector</double>").expect("vector");
    let color = EnumBuilder::new("/Color")
        .variant("RED")
        .build(&mut registry)
        .expect("enum");
    let handle = registry
        .add(Type::opaque("/Handle", 12), None)
        .expect("opaque");

    let cases = [
        (double, Category::Numeric, 8),
        (pointer, Category::Pointer, POINTER_SIZE),
        (array, Category::Array, 24),
        (vector, Category::Container, CONTAINER_OBJECT_SIZE),
        (color, Category::Enum, ENUM_SIZE),
        (handle, Category::Opaque, 12),
    ];
    for (id, category, size) in cases {
        let ty = registry.type_ref(id);
        assert_eq!(ty.category(), category, "{}", ty.name());
        assert_eq!(ty.size(), size, "{}", ty.name());
    }
    assert_eq!(
        registry.get("/nil").expect("null type").category(),
        Category::Null
    );
    assert_eq!(registry.type_ref(pointer).indirection().map(|t| t.id()), Some(double));
    assert_eq!(registry.type_ref(array).indirection().map(|t| t.id()), Some(double));
    assert_eq!(registry.type_ref(vector).indirection().map(|t| t.id()), Some(double));
    assert!(registry.type_ref(double).indirection().is_none());
}

#[test]
fn test_add_field_grows_compound() {
    let registry = Registry::with_standard_types();
    let int = registry.get("/int32_t").expect("int32");
    let mut compound = Type::compound("/S");
    compound.add_field("a", int, 0).expect("a");
    compound.add_field("b", int, 8).expect("b");
    assert_eq!(compound.size(), 12);

    let err = compound.add_field("a", int, 16).expect_err("duplicate field");
    assert!(matches!(err, Error::AlreadyDefinedName(name) if name == "/S.a"));

    let mut scalar = Type::numeric("/n", 4, NumericCategory::SInt);
    assert!(matches!(
        scalar.add_field("x", int, 0),
        Err(Error::UnsupportedType { .. })
    ));
}

#[test]
fn test_depends_on_and_trailing_padding() {
    let mut registry = Registry::with_standard_types();
    let id = CompoundBuilder::new("/Padded")
        .field("wide", "/int64_t")
        .field("narrow", "/int8_t")
        .build(&mut registry)
        .expect("compound");
    let padded = registry.type_ref(id);
    assert_eq!(padded.size(), 16);
    assert_eq!(padded.trailing_padding(), 7);

    let expected: BTreeSet<TypeId> = ["/int64_t", "/int8_t"]
        .iter()
        .map(|n| registry.resolve(n).expect("scalar"))
        .collect();
    assert_eq!(padded.depends_on(), expected);
}

#[test]
fn test_is_same_across_registries() {
    let mut left = Registry::with_standard_types();
    let mut right = Registry::with_standard_types();
    let a = point(&mut left, "/Point");
    let b = point(&mut right, "/Point");

    let (a, b) = (left.type_ref(a), right.type_ref(b));
    assert_ne!(a, b);
    assert!(a.is_same(b));
    assert!(b.is_same(a));
}

#[test]
fn test_is_same_detects_moved_field() {
    let mut left = Registry::with_standard_types();
    let mut right = Registry::with_standard_types();
    let a = CompoundBuilder::new("/Tagged")
        .field("tag", "/int8_t")
        .field("value", "/int16_t")
        .build(&mut left)
        .expect("tagged");

    let tag = right.get("/int8_t").expect("int8");
    let value = right.get("/int16_t").expect("int16");
    let mut moved = Type::compound("/Tagged");
    moved.add_field("tag", tag, 0).expect("tag");
    moved.add_field("value", value, 1).expect("value");
    moved.set_size(4);
    let b = right.add(moved, None).expect("moved");

    let (a, b) = (left.type_ref(a), right.type_ref(b));
    assert_eq!(a.size(), b.size());
    assert!(!a.is_same(b));
    assert!(!a.can_cast_to(b));
}

#[test]
fn test_is_same_terminates_on_cycles() {
    let mut left = Registry::with_standard_types();
    let mut right = Registry::with_standard_types();
    let a = linked_node(&mut left);
    let b = linked_node(&mut right);
    assert!(left.type_ref(a).is_same(right.type_ref(b)));

    let mut other = Registry::with_standard_types();
    let node = other.add(Type::compound("/Node"), None).expect("node");
    let next = other.pointer_to(node).expect("pointer");
    let int = other.resolve("/int32_t").expect("int32");
    other.add_field(node, "next", next, 0).expect("next");
    other
        .add_field(node, "count", int, POINTER_SIZE)
        .expect("renamed field");
    other.set_size(node, POINTER_SIZE * 2).expect("size");
    assert!(!left.type_ref(a).is_same(other.type_ref(node)));
    assert!(left.type_ref(a).can_cast_to(other.type_ref(node)));
}

#[test]
fn test_can_cast_ignores_names() {
    let mut registry = Registry::with_standard_types();
    let a = point(&mut registry, "/Point");
    let b = CompoundBuilder::new("/Pair")
        .field("first", "/int32_t")
        .field("second", "/int32_t")
        .build(&mut registry)
        .expect("pair");
    let (a, b) = (registry.type_ref(a), registry.type_ref(b));
    assert!(!a.is_same(b));
    assert!(a.can_cast_to(b));

    let wide = registry.get("/int64_t").expect("int64");
    assert!(!a.can_cast_to(wide));
}

#[test]
fn test_enum_cast_is_inclusion() {
    let mut registry = Registry::new();
    let small = EnumBuilder::new("/Small")
        .variant("A")
        .variant("B")
        .build(&mut registry)
        .expect("small");
    let large = EnumBuilder::new("/Large")
        .variant("A")
        .variant("B")
        .variant("C")
        .build(&mut registry)
        .expect("large");
    let (small, large) = (registry.type_ref(small), registry.type_ref(large));
    assert!(small.can_cast_to(large));
    assert!(!large.can_cast_to(small));
}

#[test]
fn test_map_ids_rewrites_references() {
    let mut kind = TypeKind::Array {
        element: TypeId::from_index(3),
        dimension: 2,
    };
    kind.map_ids(|id| TypeId::from_index(id.index() + 10));
    assert_eq!(kind.indirection(), Some(TypeId::from_index(13)));
    assert_eq!(kind.category(), Category::Array);
}
