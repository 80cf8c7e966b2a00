// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration: well-known names, native sizes and layout options.
//!
//! Every constant the registry, the packing engine and the marshalling code
//! agree on lives here. **Do not hardcode these elsewhere.**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (type names, native sizes,
//!   wire format widths)
//! - **Level 2 (Per call)**: [`LayoutOptions`] passed to the layout compiler

use std::mem;
use std::os::raw::c_int;

// =======================================================================
// Well-known names
// =======================================================================

/// Source id of the types added by `Registry::with_standard_types`.
///
/// Types carrying this source are never persistent.
pub const STANDARD_SOURCE_ID: &str = "typelib-standard";

/// Kind name of the vector-like container.
pub const VECTOR_KIND: &str = "/std/vector";

/// Kind name (and full type name) of the string-like container.
pub const STRING_KIND: &str = "/std/string";

/// Canonical name of the null type.
pub const NULL_TYPE_NAME: &str = "/nil";

/// Alias of [`NULL_TYPE_NAME`] registered with the standard types.
pub const VOID_TYPE_NAME: &str = "/void";

/// Element type used by [`STRING_KIND`] when built from its bare name.
pub const CHAR_TYPE_NAME: &str = "/char";

/// Namespace separator.
pub const NAMESPACE_SEPARATOR: char = '/';

// =======================================================================
// Native sizes (build platform)
// =======================================================================

/// Size of a native data pointer.
pub const POINTER_SIZE: usize = mem::size_of::<*const u8>();

/// Size of an enum value (C `int`).
pub const ENUM_SIZE: usize = mem::size_of::<c_int>();

// =======================================================================
// Wire format
// =======================================================================

/// Width of the element count written before each container payload.
///
/// Counts are `u64` in native byte order, like every MEMCPY payload.
pub const CONTAINER_COUNT_SIZE: usize = mem::size_of::<u64>();

// =======================================================================
// Layout options
// =======================================================================

/// Options of the memory layout compiler.
///
/// The defaults refuse pointers and opaques and enable both
/// post-processing passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Treat pointers as opaque scalars copied byte for byte.
    pub accept_pointers: bool,
    /// Skip opaque types wholesale instead of refusing them.
    pub accept_opaques: bool,
    /// Merge adjacent MEMCPY/SKIP runs at the same nesting level.
    pub merge_skip_copy: bool,
    /// Strip a trailing top-level SKIP.
    pub remove_trailing_skips: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            accept_pointers: false,
            accept_opaques: false,
            merge_skip_copy: true,
            remove_trailing_skips: true,
        }
    }
}

impl LayoutOptions {
    /// Default options with pointers accepted.
    #[must_use]
    pub fn with_pointers(mut self) -> Self {
        self.accept_pointers = true;
        self
    }

    /// Default options with opaques accepted.
    #[must_use]
    pub fn with_opaques(mut self) -> Self {
        self.accept_opaques = true;
        self
    }

    /// Disable both post-processing passes (raw compiler output).
    #[must_use]
    pub fn unoptimized(mut self) -> Self {
        self.merge_skip_copy = false;
        self.remove_trailing_skips = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_options_defaults() {
        let options = LayoutOptions::default();
        assert!(!options.accept_pointers);
        assert!(!options.accept_opaques);
        assert!(options.merge_skip_copy);
        assert!(options.remove_trailing_skips);
    }

    #[test]
    fn test_layout_options_builders() {
        let options = LayoutOptions::default().with_pointers().unoptimized();
        assert!(options.accept_pointers);
        assert!(!options.merge_skip_copy);
        assert!(!options.remove_trailing_skips);
    }

    #[test]
    fn test_native_sizes() {
        assert_eq!(POINTER_SIZE, mem::size_of::<usize>());
        assert_eq!(CONTAINER_COUNT_SIZE, 8);
    }
}
