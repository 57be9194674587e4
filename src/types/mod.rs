//! Runtime type model.
//!
//! This module defines the descriptors the codec resolver classifies, the interned
//! built-in types, and the loaded type spaces searched by wire name.

/// Interned built-in descriptors.
pub mod builtin;
/// Defines `TypeDescriptor`, `TypeInfo` and friends.
pub mod descriptor;
/// Defines `TypeSpace` and `TypeSpaces`.
pub mod space;

pub use descriptor::{
    Capabilities, FieldInfo, PrimitiveKind, ReadResolveFn, TypeDescriptor, TypeInfo,
    TypeInfoBuilder, TypeShape, Visibility, WireContract,
};
pub use space::{TypeSpace, TypeSpaces};
