// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Marshalling Benchmarks
//!
//! Measures the interpreter on the two shapes that matter:
//! - flat compounds (a single MEMCPY run)
//! - compounds holding containers of plain and nested elements
//!
//! Layout compilation is measured separately since callers are expected to
//! compile once and reuse the layout.

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use typelib::{CompoundBuilder, MemoryLayout, Registry, TypeId, Value};

fn flat_type(registry: &mut Registry) -> TypeId {
    CompoundBuilder::new("/bench/Pose")
        .field("stamp", "/uint64_t")
        .field("frame", "/int16_t")
        .field("position", "/double[3]")
        .field("orientation", "/double[4]")
        .field("valid", "/bool")
        .build(registry)
        .expect("pose")
}

fn container_type(registry: &mut Registry) -> TypeId {
    CompoundBuilder::new("/bench/Scan")
        .field("stamp", "/uint64_t")
        .field("ranges", "/std/vector</float>")
        .field("tags", "/std/vector</std/string>")
        .build(registry)
        .expect("scan")
}

fn scan_value(registry: &Registry, id: TypeId, ranges: usize) -> Value {
    let scan = registry.type_ref(id);
    let ranges_offset = scan.field("ranges").map(|f| f.offset()).expect("ranges");
    let tags_offset = scan.field("tags").map(|f| f.offset()).expect("tags");
    let string = registry.get("/std/string").expect("string");

    let mut value = Value::of(scan).expect("value");
    for i in 0..ranges {
        value
            .push_element(ranges_offset, &(i as f32).to_ne_bytes())
            .expect("push range");
    }
    for tag in ["lidar", "front", "calibrated"] {
        let mut text = Value::of(string).expect("tag");
        for byte in tag.bytes() {
            text.push_element(0, &[byte]).expect("char");
        }
        value.push_value(tags_offset, &text).expect("push tag");
    }
    value
}

fn bench_flat(c: &mut Criterion) {
    let mut registry = Registry::with_standard_types();
    let id = flat_type(&mut registry);
    let value = Value::of(registry.type_ref(id)).expect("value");
    let wire = value.to_bytes().expect("dump");

    let mut group = c.benchmark_group("flat");
    group.throughput(Throughput::Bytes(wire.len() as u64));
    group.bench_function("dump", |b| {
        b.iter(|| black_box(value.to_bytes().expect("dump")));
    });
    let mut target = Value::new(Arc::clone(value.layout())).expect("target");
    group.bench_function("load", |b| {
        b.iter(|| target.load_from_slice(black_box(&wire)).expect("load"));
    });
    group.bench_function("compare", |b| {
        let other = value.clone();
        b.iter(|| black_box(other == value));
    });
    group.finish();
}

fn bench_containers(c: &mut Criterion) {
    let mut registry = Registry::with_standard_types();
    let id = container_type(&mut registry);

    let mut group = c.benchmark_group("containers");
    for ranges in [16usize, 1024, 65_536] {
        let value = scan_value(&registry, id, ranges);
        let wire = value.to_bytes().expect("dump");
        group.throughput(Throughput::Bytes(wire.len() as u64));

        group.bench_with_input(BenchmarkId::new("dump", ranges), &value, |b, value| {
            let mut out = Vec::with_capacity(wire.len());
            b.iter(|| {
                out.clear();
                value.dump(&mut out).expect("dump");
                black_box(out.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("load", ranges), &wire, |b, wire| {
            let mut target = Value::new(Arc::clone(value.layout())).expect("target");
            b.iter(|| target.load_from_slice(black_box(wire)).expect("load"));
        });
        group.bench_with_input(BenchmarkId::new("clone", ranges), &value, |b, value| {
            b.iter(|| black_box(value.clone()));
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut registry = Registry::with_standard_types();
    let flat = flat_type(&mut registry);
    let nested = container_type(&mut registry);

    c.bench_function("compile_flat", |b| {
        b.iter(|| MemoryLayout::of(registry.type_ref(black_box(flat))).expect("layout"));
    });
    c.bench_function("compile_containers", |b| {
        b.iter(|| MemoryLayout::of(registry.type_ref(black_box(nested))).expect("layout"));
    });
}

criterion_group!(benches, bench_flat, bench_containers, bench_compile);
criterion_main!(benches);
