// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Wire round trips through the public API: containers, nested compounds,
// randomized contents and file-backed streams.

#![allow(clippy::float_cmp)]
#![allow(clippy::cast_possible_truncation)]

use std::fs::File;
use std::io::{Seek, SeekFrom};
use typelib::{CompoundBuilder, IoSink, IoSource, Registry, TypeRef, Value};

fn offset_of_field(ty: TypeRef<'_>, name: &str) -> usize {
    ty.field(name)
        .map(|f| f.offset())
        .unwrap_or_else(|| panic!("{} has no field {name}", ty.name()))
}

fn doubles(value: &Value, offset: usize) -> Vec<f64> {
    let mut out = Vec::new();
    value
        .visit_elements(offset, |bytes| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            out.push(f64::from_ne_bytes(raw));
            true
        })
        .expect("visit");
    out
}

#[test]
fn test_vector_of_five_doubles() {
    let mut registry = Registry::with_standard_types();
    let id = registry.build("/std/vector</double>").expect("vector");
    let mut value = Value::of(registry.type_ref(id)).expect("value");

    let input = [0.5, -1.25, 3.0e10, f64::MIN_POSITIVE, 42.0];
    for x in input {
        value.push_element(0, &x.to_ne_bytes()).expect("push");
    }
    let wire = value.to_bytes().expect("dump");
    assert_eq!(wire.len(), 8 + 5 * 8);
    assert_eq!(&wire[..8], &5u64.to_ne_bytes());

    let mut reloaded = Value::of(registry.type_ref(id)).expect("value");
    reloaded.load_from_slice(&wire).expect("load");
    assert_eq!(doubles(&reloaded, 0), input);
    assert_eq!(reloaded, value);
}

#[test]
fn test_empty_vector_is_just_the_count() {
    let mut registry = Registry::with_standard_types();
    let id = registry.build("/std/vector</int16_t>").expect("vector");
    let value = Value::of(registry.type_ref(id)).expect("value");
    assert_eq!(value.to_bytes().expect("dump"), 0u64.to_ne_bytes().to_vec());
}

#[test]
fn test_string_round_trip() {
    let mut registry = Registry::with_standard_types();
    let id = CompoundBuilder::new("/Message")
        .field("code", "/uint16_t")
        .field("text", "/std/string")
        .build(&mut registry)
        .expect("compound");
    let ty = registry.type_ref(id);
    let text = offset_of_field(ty, "text");

    let mut value = Value::of(ty).expect("value");
    value.write(0, 404u16).expect("code");
    for byte in b"not found" {
        value.push_element(text, &[*byte]).expect("push char");
    }
    let wire = value.to_bytes().expect("dump");
    assert_eq!(wire.len(), 2 + 8 + 9);

    let mut reloaded = Value::of(ty).expect("value");
    reloaded.load_from_slice(&wire).expect("load");
    assert_eq!(reloaded.read::<u16>(0).expect("code"), 404);
    assert_eq!(reloaded.container_bytes(text).expect("text"), b"not found");
}

#[test]
fn test_nested_compounds_and_arrays() {
    let mut registry = Registry::with_standard_types();
    CompoundBuilder::new("/geo/Point")
        .field("x", "/float")
        .field("y", "/float")
        .field("flag", "/uint8_t")
        .build(&mut registry)
        .expect("point");
    let id = CompoundBuilder::new("/geo/Path")
        .field("id", "/uint32_t")
        .field("corners", "/geo/Point[2]")
        .field("points", "/std/vector</geo/Point>")
        .build(&mut registry)
        .expect("path");
    let ty = registry.type_ref(id);
    let point_size = registry.get("/geo/Point").expect("point").size();
    let points = offset_of_field(ty, "points");
    let corners = offset_of_field(ty, "corners");

    let mut value = Value::of(ty).expect("value");
    value.write(0, 7u32).expect("id");
    value.write(corners, 1.5f32).expect("corner x");
    value.write(corners + point_size + 8, 1u8).expect("corner flag");
    let mut element = vec![0u8; point_size];
    element[..4].copy_from_slice(&2.0f32.to_ne_bytes());
    element[8] = 1;
    value.push_element(points, &element).expect("push");

    let wire = value.to_bytes().expect("dump");
    // id, two corners without their tail padding, then count and one point
    assert_eq!(wire.len(), 4 + 2 * 9 + 8 + 9);

    let mut reloaded = Value::of(ty).expect("value");
    reloaded.load_from_slice(&wire).expect("load");
    assert_eq!(reloaded, value);
    assert_eq!(reloaded.read::<f32>(corners).expect("x"), 1.5);
    assert_eq!(
        reloaded.element_bytes(points, 0).expect("element").map(|e| e[8]),
        Some(1)
    );
}

#[test]
fn test_randomized_vectors() {
    let mut registry = Registry::with_standard_types();
    let id = CompoundBuilder::new("/Series")
        .field("stamp", "/int64_t")
        .field("samples", "/std/vector</int32_t>")
        .field("labels", "/std/vector</std/string>")
        .build(&mut registry)
        .expect("compound");
    let series = registry.type_ref(id);
    let samples = offset_of_field(series, "samples");
    let labels = offset_of_field(series, "labels");
    let string = registry.get("/std/string").expect("string");

    let mut rng = fastrand::Rng::with_seed(0x7e57);
    for _ in 0..50 {
        let mut value = Value::of(series).expect("value");
        value.write(0, rng.i64(..)).expect("stamp");
        for _ in 0..rng.usize(0..64) {
            value
                .push_element(samples, &rng.i32(..).to_ne_bytes())
                .expect("push sample");
        }
        for _ in 0..rng.usize(0..4) {
            let mut label = Value::of(string).expect("label");
            for _ in 0..rng.usize(0..16) {
                label.push_element(0, &[rng.alphanumeric() as u8]).expect("char");
            }
            value.push_value(labels, &label).expect("push label");
        }

        let wire = value.to_bytes().expect("dump");
        let mut reloaded = Value::of(series).expect("value");
        reloaded.load_from_slice(&wire).expect("load");
        assert_eq!(reloaded, value);
        assert_eq!(reloaded.to_bytes().expect("dump again"), wire);
    }
}

#[test]
fn test_file_backed_streams() {
    let mut registry = Registry::with_standard_types();
    let id = registry.build("/std/vector</uint64_t>").expect("vector");
    let ty = registry.type_ref(id);

    let mut value = Value::of(ty).expect("value");
    for x in [1u64, 1 << 40, u64::MAX] {
        value.push_element(0, &x.to_ne_bytes()).expect("push");
    }

    let file = tempfile::tempfile().expect("tempfile");
    let mut sink = IoSink::new(file);
    value.dump(&mut sink).expect("dump to file");
    let mut file = sink.into_inner().expect("flush");
    file.seek(SeekFrom::Start(0)).expect("rewind");

    let mut source = IoSource::new(file);
    let mut reloaded = Value::of(ty).expect("value");
    reloaded.load(&mut source).expect("load from file");
    assert_eq!(reloaded, value);

    // the file holds exactly one value
    let mut rest = [0u8; 1];
    assert!(typelib::InputStream::read(&mut source, &mut rest).is_err());
}

#[test]
fn test_truncated_file_fails() {
    let mut registry = Registry::with_standard_types();
    let id = registry.build("/std/vector</uint64_t>").expect("vector");
    let ty = registry.type_ref(id);

    let mut wire = 3u64.to_ne_bytes().to_vec();
    wire.extend_from_slice(&9u64.to_ne_bytes());

    let mut file: File = tempfile::tempfile().expect("tempfile");
    std::io::Write::write_all(&mut file, &wire).expect("write");
    file.seek(SeekFrom::Start(0)).expect("rewind");

    let mut reloaded = Value::of(ty).expect("value");
    let err = reloaded
        .load(&mut IoSource::new(file))
        .expect_err("missing elements");
    assert!(matches!(err, typelib::Error::DataTruncated { .. }));
}

#[test]
fn test_unbounded_source_with_huge_count() {
    let mut registry = Registry::with_standard_types();
    let doubles = registry.build("/std/vector</double>").expect("vector");
    let labels = registry
        .build("/std/vector</std/string>")
        .expect("vector of strings");
    let text = registry.build("/std/string").expect("string");

    for id in [doubles, labels, text] {
        for count in [1u64 << 60, 1 << 40, u64::MAX] {
            let mut value = Value::of(registry.type_ref(id)).expect("value");
            let source = std::io::Cursor::new(count.to_ne_bytes());
            let err = value
                .load(&mut IoSource::new(source))
                .expect_err("count without elements");
            assert!(
                matches!(err, typelib::Error::DataTruncated { .. }),
                "{} with count {count}: {err}",
                registry.type_ref(id).name()
            );
            // the value is still usable after the failed load
            assert_eq!(value.element_count(0).expect("count"), 0);
        }
    }
}
