// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the registry, the layout compiler and the marshalling
//! interpreter.
//!
//! Module-specific failures (`PackingError`, `EnumError`) keep their own enums
//! and convert into [`Error`] through `From`, so `?` works across layers.

use crate::packing::PackingError;
use crate::types::EnumError;
use thiserror::Error;

/// Every failure the crate can report.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// Name does not resolve in the registry.
    #[error("undefined type {0}")]
    Undefined(String),
    /// A different definition is already registered under this name.
    #[error("type {0} is already defined with a different definition")]
    AlreadyDefined(String),
    /// The name is already bound to another type (alias collision).
    #[error("name {0} is already bound to another type")]
    AlreadyDefinedName(String),
    /// Name failed grammar validation.
    #[error("invalid type name {0:?}")]
    BadName(String),
    /// Merging two registries found incompatible definitions for one name.
    #[error("incompatible definitions found for {0}")]
    DefinitionMismatch(String),
    /// Operation cannot represent this type category.
    #[error("unsupported type {name}: {reason}")]
    UnsupportedType {
        /// Offending type name.
        name: String,
        /// Why the operation refused it.
        reason: String,
    },

    // ========================================================================
    // Layout Errors
    // ========================================================================
    /// Layout compiler refused the type (pointer or opaque without opt-in).
    #[error("cannot compute a memory layout for {name}: {reason}")]
    NoLayout {
        /// Offending type name.
        name: String,
        /// Why no layout exists.
        reason: String,
    },
    /// Packing engine has no probe entry for the requested type.
    #[error(transparent)]
    Packing(#[from] PackingError),
    /// Enum symbol/value lookup or definition failure.
    #[error(transparent)]
    Enum(#[from] EnumError),
    /// Corrupted layout program.
    #[error("invalid layout bytecode at position {position}: {reason}")]
    UnknownLayoutBytecode {
        /// Index of the offending instruction.
        position: usize,
        /// Description of the defect.
        reason: String,
    },

    // ========================================================================
    // Marshalling Errors
    // ========================================================================
    /// Two values (or a value and a layout) describe different types.
    #[error("marshalled type mismatch: expected {expected}, found {found}")]
    MarshalledTypeMismatch {
        /// Type the operation expected.
        expected: String,
        /// Type the operation received.
        found: String,
    },
    /// Source ran out of data before the program completed.
    #[error("data truncated at offset {offset}: need {needed} bytes, {available} available")]
    DataTruncated {
        /// Stream offset of the failed read.
        offset: usize,
        /// Bytes requested.
        needed: usize,
        /// Bytes left in the source.
        available: usize,
    },
    /// Unconsumed bytes after a top-level load exceed the trailing padding.
    #[error("{extra} trailing bytes left after load, at most {allowed} allowed")]
    TrailingData {
        /// Bytes left in the source.
        extra: usize,
        /// Trailing padding of the loaded type.
        allowed: usize,
    },
    /// Fixed-size sink has no room left.
    #[error("buffer full at offset {offset}: need {needed} bytes, {available} available")]
    BufferFull {
        /// Sink offset of the failed write.
        offset: usize,
        /// Bytes to write.
        needed: usize,
        /// Room left in the sink.
        available: usize,
    },
    /// Value buffer is smaller than the type it is supposed to hold.
    #[error("buffer of {actual} bytes cannot hold a {expected}-byte value")]
    BufferSize {
        /// Size of the type.
        expected: usize,
        /// Size of the buffer.
        actual: usize,
    },
    /// Raw byte write would clobber a container object.
    #[error("write to bytes {offset}..{end} overlaps a container object")]
    OverlapsContainer {
        /// Start of the rejected write.
        offset: usize,
        /// End of the rejected write.
        end: usize,
    },
    /// Underlying stream I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn unsupported(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bytecode(position: usize, reason: impl Into<String>) -> Self {
        Self::UnknownLayoutBytecode {
            position,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_variants() {
        let err = Error::DataTruncated {
            offset: 12,
            needed: 8,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "data truncated at offset 12: need 8 bytes, 3 available"
        );

        let err = Error::unsupported("/A", "overlapping fields");
        assert_eq!(err.to_string(), "unsupported type /A: overlapping fields");

        let err = Error::TrailingData {
            extra: 4,
            allowed: 2,
        };
        assert_eq!(
            err.to_string(),
            "4 trailing bytes left after load, at most 2 allowed"
        );
    }

    #[test]
    fn test_packing_error_converts() {
        let err: Error = PackingError::FoundNullStructure("/Empty".into()).into();
        assert!(matches!(
            err,
            Error::Packing(PackingError::FoundNullStructure(_))
        ));
    }
}
