//! Capability classification for types the primitive table does not know.
//!
//! Rules are tried in a fixed order and the first match wins. The order matters because
//! capabilities overlap: a map type is often also iterable, an error type may also be a
//! sequence, and arrays report the sequence capability.
//!
//! | # | rule | codec |
//! |---|------|-------|
//! | 1 | map-like | map |
//! | 2 | nullable wrapper (decode only) | the wrapped type's decoder |
//! | 3 | array | array over the element codec |
//! | 4 | enumeration | enum |
//! | 5 | sequence-like | sequence |
//! | 6 | byte/character stream | stream |
//! | 7 | error | error |
//! | 8 | custom wire contract | the contract |
//! | 9 | anything else | reflective object |
//!
//! Classification never fails: rule 9 takes everything.

use std::fmt;
use std::sync::Arc;

use crate::types::{Capabilities, TypeDescriptor, TypeShape, WireContract};

/// Which codec a type resolves to.
#[derive(Clone)]
pub enum Capability {
    /// Rule 1.
    Map,
    /// Rule 2, carrying the wrapped type.
    Nullable(TypeDescriptor),
    /// Rule 3, carrying the element type.
    Array(TypeDescriptor),
    /// Rule 4.
    Enumeration,
    /// Rule 5.
    Sequence,
    /// Rule 6.
    Stream,
    /// Rule 7.
    Error,
    /// Rule 8.
    Custom(Arc<dyn WireContract>),
    /// Rule 9.
    Reflective,
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map => f.write_str("Map"),
            Self::Nullable(inner) => write!(f, "Nullable({})", inner.name()),
            Self::Array(element) => write!(f, "Array({})", element.name()),
            Self::Enumeration => f.write_str("Enumeration"),
            Self::Sequence => f.write_str("Sequence"),
            Self::Stream => f.write_str("Stream"),
            Self::Error => f.write_str("Error"),
            Self::Custom(_) => f.write_str("Custom"),
            Self::Reflective => f.write_str("Reflective"),
        }
    }
}

impl Capability {
    /// Position in the priority order (1-based).
    pub fn rule(&self) -> u8 {
        match self {
            Self::Map => 1,
            Self::Nullable(_) => 2,
            Self::Array(_) => 3,
            Self::Enumeration => 4,
            Self::Sequence => 5,
            Self::Stream => 6,
            Self::Error => 7,
            Self::Custom(_) => 8,
            Self::Reflective => 9,
        }
    }
}

/// Direction of the codec being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Resolving a serializer.
    Encode,
    /// Resolving a deserializer.
    Decode,
}

/// Classifies `ty`.
///
/// Nullable wrappers are only unwrapped when decoding. Values never carry a nullable
/// type, so the encoder never asks for one.
pub fn classify(ty: &TypeDescriptor, direction: Direction) -> Capability {
    let caps = ty.capabilities();
    let capability = if caps.contains(Capabilities::MAP) {
        Capability::Map
    } else if let (TypeShape::Nullable(inner), Direction::Decode) = (ty.shape(), direction) {
        Capability::Nullable(inner.clone())
    } else if let TypeShape::Array(element) = ty.shape() {
        Capability::Array(element.clone())
    } else if matches!(ty.shape(), TypeShape::Enum(_)) {
        Capability::Enumeration
    } else if caps.contains(Capabilities::SEQUENCE) {
        Capability::Sequence
    } else if caps.contains(Capabilities::STREAM) {
        Capability::Stream
    } else if caps.contains(Capabilities::ERROR) {
        Capability::Error
    } else if let Some(contract) = ty.contract() {
        Capability::Custom(contract.clone())
    } else {
        Capability::Reflective
    };
    log::trace!(
        "[resolver] '{}' ({direction:?}) -> rule {} {capability:?}",
        ty.name(),
        capability.rule()
    );
    capability
}
