// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conformance against the layouts rustc gives `#[repr(C)]` structures.

use super::*;
use crate::registry::CompoundBuilder;
use crate::types::Type;
use std::mem::size_of;

#[repr(C)]
#[allow(dead_code)]
struct A {
    a: i64,
    b: i32,
    c: i8,
    d: i16,
}

#[repr(C)]
#[allow(dead_code)]
struct Mixed {
    c: i8,
    d: f64,
    s: i16,
    p: *const u8,
    f: f32,
}

#[repr(C)]
#[allow(dead_code)]
struct Nested {
    tag: u8,
    inner: A,
    samples: [i16; 3],
    values: Vec<u8>,
    last: u8,
}

fn offsets(registry: &Registry, id: TypeId) -> Vec<(String, usize)> {
    registry
        .type_ref(id)
        .fields()
        .iter()
        .map(|f| (f.name().to_string(), f.offset()))
        .collect()
}

fn expected(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
    pairs.iter().map(|(n, o)| (n.to_string(), *o)).collect()
}

#[test]
fn test_native_alignments_are_probed() {
    let packing = Packing::native();
    assert_eq!(packing.primitive_alignment(1), Some(1));
    assert_eq!(packing.primitive_alignment(2), Some(std::mem::align_of::<i16>()));
    assert_eq!(packing.primitive_alignment(4), Some(std::mem::align_of::<i32>()));
    assert_eq!(packing.primitive_alignment(8), Some(std::mem::align_of::<i64>()));
    assert_eq!(
        packing.named_alignment("/std/vector</double>"),
        Some(std::mem::align_of::<Vec<u8>>())
    );
    assert_eq!(packing.named_alignment("/Unknown"), None);
}

#[test]
fn test_repr_c_simple_struct() {
    let mut registry = Registry::with_standard_types();
    let id = CompoundBuilder::new("/A")
        .field("a", "/int64_t")
        .field("b", "/int32_t")
        .field("c", "/int8_t")
        .field("d", "/int16_t")
        .build(&mut registry)
        .expect("A");

    assert_eq!(
        offsets(&registry, id),
        expected(&[
            ("a", offset_of!(A, a)),
            ("b", offset_of!(A, b)),
            ("c", offset_of!(A, c)),
            ("d", offset_of!(A, d)),
        ])
    );
    assert_eq!(registry.type_ref(id).size(), size_of::<A>());
    assert_eq!(size_of_compound(&registry, id), Ok(size_of::<A>()));
}

#[test]
fn test_repr_c_mixed_scalars() {
    let mut registry = Registry::with_standard_types();
    let id = CompoundBuilder::new("/Mixed")
        .field("c", "/int8_t")
        .field("d", "/double")
        .field("s", "/int16_t")
        .field("p", "/uint8_t*")
        .field("f", "/float")
        .build(&mut registry)
        .expect("Mixed");

    assert_eq!(
        offsets(&registry, id),
        expected(&[
            ("c", offset_of!(Mixed, c)),
            ("d", offset_of!(Mixed, d)),
            ("s", offset_of!(Mixed, s)),
            ("p", offset_of!(Mixed, p)),
            ("f", offset_of!(Mixed, f)),
        ])
    );
    assert_eq!(registry.type_ref(id).size(), size_of::<Mixed>());
}

#[test]
fn test_repr_c_nested_arrays_and_containers() {
    let mut registry = Registry::with_standard_types();
    CompoundBuilder::new("/A")
        .field("a", "/int64_t")
        .field("b", "/int32_t")
        .field("c", "/int8_t")
        .field("d", "/int16_t")
        .build(&mut registry)
        .expect("A");
    let id = CompoundBuilder::new("/Nested")
        .field("tag", "/uint8_t")
        .field("inner", "/A")
        .field("samples", "/int16_t[3]")
        .field("values", "/std/vector</uint8_t>")
        .field("last", "/uint8_t")
        .build(&mut registry)
        .expect("Nested");

    assert_eq!(
        offsets(&registry, id),
        expected(&[
            ("tag", offset_of!(Nested, tag)),
            ("inner", offset_of!(Nested, inner)),
            ("samples", offset_of!(Nested, samples)),
            ("values", offset_of!(Nested, values)),
            ("last", offset_of!(Nested, last)),
        ])
    );
    assert_eq!(registry.type_ref(id).size(), size_of::<Nested>());
}

#[test]
fn test_offsets_are_monotonic() {
    let mut registry = Registry::with_standard_types();
    let names = ["/int8_t", "/double", "/int16_t", "/int8_t[5]", "/int32_t", "/float"];
    let mut builder = CompoundBuilder::new("/Monotonic");
    for (i, name) in names.iter().enumerate() {
        builder = builder.field(format!("f{i}"), *name);
    }
    let id = builder.build(&mut registry).expect("compound");

    let ty = registry.type_ref(id);
    let mut end = 0;
    for field in ty.fields() {
        assert!(field.offset() >= end, "{} overlaps", field.name());
        end = field.offset() + ty.field_type(field).size();
    }
    assert!(size_of_compound(&registry, id).expect("size") >= end);
}

#[test]
fn test_empty_compound_is_null_structure() {
    let mut registry = Registry::new();
    let id = registry.add(Type::compound("/Empty"), None).expect("empty");
    assert_eq!(
        size_of_compound(&registry, id),
        Err(PackingError::FoundNullStructure("/Empty".into()))
    );
}

#[test]
fn test_partial_overlap_is_union_error() {
    let mut registry = Registry::with_standard_types();
    let id = CompoundBuilder::new("/Skewed")
        .field_at("a", "/int32_t", 0)
        .field_at("b", "/int32_t", 2)
        .build(&mut registry);
    assert!(matches!(
        id,
        Err(crate::Error::Packing(PackingError::FoundUnion(name))) if name == "/Skewed"
    ));

    let union = CompoundBuilder::new("/Union")
        .field_at("i", "/int32_t", 0)
        .field_at("d", "/double", 0)
        .build(&mut registry)
        .expect("union of fields at offset 0");
    assert_eq!(registry.type_ref(union).size(), 8);
}

#[test]
fn test_opaque_alignment_by_prefix() {
    let mut registry = Registry::with_standard_types();
    let handle = registry
        .add(Type::opaque("/os/Handle", 8), None)
        .expect("opaque");
    let int8 = registry.resolve("/int8_t").expect("int8");
    let first = crate::types::Field::new("flag", int8, 0);

    let err = offset_of(&registry, Some(&first), handle).expect_err("unknown opaque");
    assert_eq!(err, PackingError::Unknown("/os/Handle".into()));

    let packing = Packing::native().clone().with_opaque_alignment("/os/", 8);
    assert_eq!(packing.offset_of(&registry, Some(&first), handle), Ok(8));
}

#[test]
fn test_custom_tables() {
    let registry = Registry::with_standard_types();
    let int8 = registry.resolve("/int8_t").expect("int8");
    let int64 = registry.resolve("/int64_t").expect("int64");
    let first = crate::types::Field::new("a", int8, 0);

    // 32-bit ABI where 8-byte scalars align on 4
    let packing = Packing::from_tables(vec![(1, 1), (2, 2), (4, 4), (8, 4)], Vec::new());
    assert_eq!(packing.offset_of(&registry, Some(&first), int64), Ok(4));
    assert_eq!(packing.offset_of(&registry, None, int64), Ok(0));
}
