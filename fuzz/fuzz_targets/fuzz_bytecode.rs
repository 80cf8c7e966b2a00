// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use typelib::layout::opcode;
use typelib::{MemoryLayout, Registry, Value};

fuzz_target!(|data: &[u8]| {
    let mut registry = Registry::with_standard_types();
    let _ = registry.build("/std/vector</int32_t>");
    let _ = registry.build("/std/string");

    let code: Vec<u64> = data
        .chunks(2)
        .map(|chunk| u64::from(chunk[0]) | u64::from(*chunk.get(1).unwrap_or(&0)) << 8)
        .collect();

    // Nested repeat counts multiply; keep the walk small
    let mut repeats = 1u64;
    let mut position = 0;
    while position < code.len() {
        if code[position] == opcode::END {
            position += 1;
            continue;
        }
        if code[position] == opcode::ARRAY {
            let count = code.get(position + 1).copied().unwrap_or(0);
            repeats = repeats.saturating_mul(count.max(1));
        }
        position += 2;
    }
    if repeats > 1 << 16 {
        return;
    }

    // Fuzz bytecode decoding
    let Ok(layout) = MemoryLayout::from_bytecode(&registry, &code) else {
        return;
    };
    assert_eq!(layout.to_bytecode(), code);

    // Decoded programs must drive a value through its whole lifecycle
    if layout.size() <= 1 << 16 {
        if let Ok(value) = Value::new(Arc::new(layout)) {
            let _ = value.to_bytes();
        }
    }
});
