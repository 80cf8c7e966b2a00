// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Relative name resolution through the default namespace.

use typelib::{CompoundBuilder, Registry, TypeId};

fn add_marker(registry: &mut Registry, name: &str) -> TypeId {
    CompoundBuilder::new(name)
        .field("tag", "/uint8_t")
        .build(registry)
        .expect("marker type")
}

#[test]
fn test_innermost_namespace_wins() {
    let mut registry = Registry::with_standard_types();
    registry.set_default_namespace("/A/B/").expect("namespace");

    let root = add_marker(&mut registry, "/C");
    assert_eq!(registry.resolve("C").ok(), Some(root));

    let middle = add_marker(&mut registry, "/A/C");
    assert_eq!(registry.resolve("C").ok(), Some(middle));

    let inner = add_marker(&mut registry, "/A/B/C");
    assert_eq!(registry.resolve("C").ok(), Some(inner));
    assert_eq!(registry.resolve("/A/B/C").ok(), Some(inner));
    assert_eq!(registry.resolve("/C").ok(), Some(root));
}

#[test]
fn test_switching_namespaces() {
    let mut registry = Registry::with_standard_types();
    let left = add_marker(&mut registry, "/left/Item");
    let right = add_marker(&mut registry, "/right/Item");
    assert!(registry.get("Item").is_none());
    assert_eq!(registry.resolve("left/Item").ok(), Some(left));

    registry.set_default_namespace("/left").expect("left");
    assert_eq!(registry.resolve("Item").ok(), Some(left));
    registry.set_default_namespace("/right/").expect("right");
    assert_eq!(registry.resolve("Item").ok(), Some(right));
    registry.set_default_namespace("/").expect("root");
    assert!(registry.get("Item").is_none());
}

#[test]
fn test_relative_field_types() {
    let mut registry = Registry::with_standard_types();
    let point = add_marker(&mut registry, "/geo/Point");
    registry.set_default_namespace("/geo/").expect("namespace");

    let id = CompoundBuilder::new("/geo/Segment")
        .field("from", "Point")
        .field("to", "Point[1]")
        .build(&mut registry)
        .expect("segment");
    let segment = registry.type_ref(id);
    let from = segment.field("from").expect("from");
    assert_eq!(from.type_id(), point);
    let to = segment.field("to").expect("to");
    assert_eq!(
        segment.field_type(to).indirection().map(|t| t.id()),
        Some(point)
    );
}

#[test]
fn test_aliases_resolve_relatively() {
    let mut registry = Registry::with_standard_types();
    registry
        .alias("/int32_t", "/net/Port", None)
        .expect("alias");
    registry.set_default_namespace("/net/").expect("namespace");
    assert_eq!(
        registry.resolve("Port").ok(),
        registry.resolve("/int32_t").ok()
    );
}
