//! # hessian-graph
//!
//! The type-resolution and object-graph core of a Hessian-style binary remote-object
//! protocol: given a runtime type (when encoding) or a wire type name (when decoding), it
//! selects the codec that handles it, caches that choice, and tracks object and class
//! identity so shared and cyclic graphs cross the wire with their shape intact.
//!
//! ## Overview
//!
//! Every value on the wire is dispatched to a codec. Codecs are found in three steps:
//!
//! 1.  **Primitive table:** built-in scalars, their arrays and the platform value types
//!     (decimal, guid, locale, null marker) map straight to dedicated codecs and have
//!     unique wire names.
//! 2.  **Capability resolver:** any other type is classified by a fixed, ordered list of
//!     nine rules (map, nullable, array, enum, sequence, stream, error, custom contract,
//!     reflective object). The first matching rule wins.
//! 3.  **Codec cache:** the result of step 2 is built once per type, even when many
//!     threads ask for it at the same time, and shared afterwards.
//!
//! When decoding, a wire type name is resolved back to a decoder: through the primitive
//! table, the cache, the `"["` array prefix (recursively, `"[[int"` is array of array of
//! int) and finally the loaded type spaces. A name nobody knows decodes as a generic
//! map or list instead of failing the call.
//!
//! ## Identity
//!
//! Within one graph, the first occurrence of an instance is written in full and every
//! later occurrence becomes a back-reference to its index. A class schema is written once
//! and later instances only carry their field values. The decoder assigns indices in the
//! same stream order, and registers each instance before reading its children, so cycles
//! decode to the same shared [`ObjectRef`].
//!
//! ## Core Concepts
//!
//! - [`TypeDescriptor`] / [`TypeSpace`]: the runtime type model the resolver classifies.
//! - [`Value`] / [`ObjectRef`]: the dynamic values the codecs encode and decode.
//! - [`SerializerFactory`]: codec resolution and caching.
//! - [`HessianWriter`] / [`HessianReader`]: the byte stream and its reference tables.
//! - [`Hessian`]: one-call encode and decode, with [`HessianOptions`] for configuration.
//! - [`WireObject`]: typed conversions, derivable for plain structs.
//!
//! ## Usage
//!
//! ```rust
//! use hessian_graph::{Hessian, Result, WireObject};
//!
//! #[derive(Debug, PartialEq, WireObject)]
//! #[hessian(name = "app.Point")]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! fn main() -> Result<()> {
//!     let options = Hessian::builder();
//!     let bytes = options.to_bytes(&Point { x: 1, y: 2 })?;
//!     let back: Point = options.from_bytes(&bytes)?;
//!     assert_eq!(back, Point { x: 1, y: 2 });
//!     Ok(())
//! }
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** the crate forbids `unsafe` code.
//! * **No Panics:** no `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** all failures correspond to a [`HessianError`]; recovered
//!   per-field problems are reported as [`Warning`]s instead.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets the derive's `hessian_graph::` paths resolve inside this crate's own tests.
extern crate self as hessian_graph;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod codec;
pub mod error;
pub mod factory;
pub mod format;
pub mod inspector;
pub mod reader;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES ---
pub mod cache;
pub mod io;
pub mod refs;

// --- MACRO SUPPORT MODULES ---

/// Typed conversions and runtime utilities used by the derived code.
pub mod rt;

// --- RE-EXPORTS ---

pub use api::{Decoded, Encoded, Hessian, HessianOptions};
pub use error::{HessianError, Result, Warning};
pub use factory::{FactoryBuilder, SerializerFactory};
pub use format::{ClassDefinition, ClassState};
pub use inspector::{StreamInspector, StreamReport};
pub use io::HessianWriter;
pub use reader::HessianReader;
pub use registry::PrimitiveTable;
pub use resolver::{Capability, Direction};
pub use rt::WireObject;
pub use types::{
    Capabilities, FieldInfo, PrimitiveKind, TypeDescriptor, TypeInfo, TypeSpace, WireContract,
};
pub use value::{Object, ObjectBody, ObjectRef, Value};

// Re-export the derive macro so it is accessible as `hessian_graph::WireObject`
pub use hessian_graph_derive::WireObject;
