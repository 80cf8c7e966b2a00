// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Typelib - runtime type descriptions and binary marshalling
//!
//! Describes C-like data types at runtime (numbers, enums, structs/unions,
//! arrays, pointers, opaque types and variable-length containers), keeps
//! them in namespaced registries, reproduces the native compiler's struct
//! layout, and moves values of those types in and out of a compact wire
//! encoding.
//!
//! ## Quick Start
//!
//! ```rust
//! use typelib::{CompoundBuilder, Registry, Result, Value};
//!
//! fn main() -> Result<()> {
//!     let mut registry = Registry::with_standard_types();
//!     let id = CompoundBuilder::new("/Sample")
//!         .field("stamp", "/uint64_t")
//!         .field("values", "/std/vector</double>")
//!         .build(&mut registry)?;
//!
//!     let sample = registry.type_ref(id);
//!     let values = sample.field("values").map(|f| f.offset()).unwrap_or_default();
//!
//!     let mut value = Value::of(sample)?;
//!     value.write(0, 1_700_000_000u64)?;
//!     value.push_element(values, &2.5f64.to_ne_bytes())?;
//!
//!     let wire = value.to_bytes()?;
//!     assert_eq!(wire.len(), 8 + 8 + 8);
//!
//!     let mut copy = Value::of(sample)?;
//!     copy.load_from_slice(&wire)?;
//!     assert_eq!(copy, value);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Registry: names, namespaces, aliases, merge, resize, builders      |
//! +---------------------------------------------------------------------+
//! |  Types: tagged kinds, structural comparison, metadata               |
//! |  Packing: native alignment probes, field offsets, compound sizes    |
//! +---------------------------------------------------------------------+
//! |  Layout: MEMCPY / SKIP / ARRAY / CONTAINER program, bytecode        |
//! +---------------------------------------------------------------------+
//! |  Marshal: init / zero / destroy / copy / compare / dump / load      |
//! |  Containers: /std/vector, /std/string                               |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Registry`] | Owns types, resolves names, derives pointers/arrays/containers |
//! | [`TypeRef`] | Borrowed view of a registered type |
//! | [`MemoryLayout`] | Compiled program the marshalling functions execute |
//! | [`Value`] | Owned, initialised value buffer |
//!
//! ## Modules Overview
//!
//! - [`registry`] - Type registries (start here)
//! - [`types`] - Type model and naming rules
//! - [`packing`] - Native struct layout emulation
//! - [`layout`] - Layout compiler
//! - [`marshal`] - Marshalling interpreter and streams
//! - [`container`] - Container kinds and the `Container` trait

/// Constants and layout options.
pub mod config;
/// Variable-length container kinds.
pub mod container;
/// Crate error type.
pub mod error;
/// Memory layout compiler.
pub mod layout;
/// Marshalling interpreter.
pub mod marshal;
/// Native struct packing emulation.
pub mod packing;
/// Type registries.
pub mod registry;
/// Type model.
pub mod types;

pub use config::LayoutOptions;
pub use container::{Container, ContainerFactory, ContainerObject, ElementOps, StdString, Vector};
pub use error::{Error, Result};
pub use layout::{compile, LayoutOp, MemoryLayout};
pub use marshal::{InputStream, IoSink, IoSource, OutputStream, SliceReader, SliceWriter, Value};
pub use packing::{Packing, PackingError};
pub use registry::{CompoundBuilder, EnumBuilder, Registry, RegistryEntry};
pub use types::{
    Category, Compound, ContainerType, EnumError, EnumType, Field, MetaData, NumericCategory,
    Type, TypeId, TypeKind, TypeRef,
};
