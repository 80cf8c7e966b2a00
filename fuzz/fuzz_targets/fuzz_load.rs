// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};
use typelib::{CompoundBuilder, MemoryLayout, Registry, Value};

fn layout() -> &'static Arc<MemoryLayout> {
    static LAYOUT: OnceLock<Arc<MemoryLayout>> = OnceLock::new();
    LAYOUT.get_or_init(|| {
        let mut registry = Registry::with_standard_types();
        let id = CompoundBuilder::new("/fuzz/Record")
            .field("id", "/uint32_t")
            .field("flags", "/uint8_t[3]")
            .field("values", "/std/vector</double>")
            .field("names", "/std/vector</std/string>")
            .field("tail", "/int16_t")
            .build(&mut registry)
            .expect("fuzz record");
        Arc::new(MemoryLayout::of(registry.type_ref(id)).expect("layout"))
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut value) = Value::new(Arc::clone(layout())) else {
        return;
    };
    // Any input must either load or fail cleanly; a loaded value re-encodes
    // to a prefix of the input.
    if value.load_from_slice(data).is_ok() {
        let wire = value.to_bytes().expect("dump of a loaded value");
        assert!(data.starts_with(&wire));
    }
});
