//! Centralized error handling for hessian-graph.
//!
//! Every failure is surfaced through [`HessianError`]; the library itself never panics.
//! Recoverable, per-field problems are not errors: they are reported through the
//! [`Warning`] channel of the stream that hit them, so a partially populated object is
//! always distinguishable from a fully decoded one.
//!
//! ## Error Categories
//!
//! - **I/O Errors** ([`HessianError::Io`]): the underlying reader or writer failed,
//!   including a truncated stream (`UnexpectedEof`).
//! - **Protocol Errors** ([`HessianError::Protocol`]): the byte stream violates the grammar.
//! - **Dangling References** ([`HessianError::DanglingReference`]): a back-reference points
//!   at an instance that was never registered.
//! - **Schema Mismatches** ([`HessianError::SchemaMismatch`]): a class body disagrees with
//!   the field list declared for its class.
//! - **Type Mismatches** ([`HessianError::TypeMismatch`]): a codec was handed a value it
//!   cannot represent.
//! - **Incomplete Results** ([`HessianError::Incomplete`]): strict mode refused a result that
//!   carried warnings.
//! - **Internal Errors** ([`HessianError::Internal`]): logic errors (should not occur).
//!
//! ## Usage
//!
//! ```rust
//! use hessian_graph::{Hessian, HessianError, Value};
//!
//! match Hessian::deserialize(&[b'Q', 0, 0, 0, 7]) {
//!     Err(HessianError::DanglingReference { index, .. }) => assert_eq!(index, 7),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # let _ = Value::Null;
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for hessian-graph operations.
pub type Result<T> = std::result::Result<T, HessianError>;

/// The master error enum covering all failure domains.
///
/// This type is `Clone` so errors can be captured by parallel batch operations and
/// returned from the calling thread. I/O errors are wrapped in `Arc` for that reason.
#[derive(Debug, Clone)]
pub enum HessianError {
    /// Low-level I/O failure, including truncated input.
    Io(Arc<io::Error>),

    /// The stream does not follow the wire grammar (unknown tag, unexpected end marker,
    /// undefined class index, unknown enum constant, ...).
    ///
    /// The message always names the offending tag, wire type name or index.
    Protocol(String),

    /// A back-reference named an instance index that has not been registered yet.
    ///
    /// This is either a forward reference or a reference into a truncated stream.
    DanglingReference {
        /// The index carried by the back-reference marker.
        index: u32,
        /// Number of instances registered when the marker was read.
        len: usize,
    },

    /// A class body or definition disagrees with the schema declared for its class.
    SchemaMismatch {
        /// Wire name of the class.
        class: String,
        /// Field list previously declared (or required by the codec).
        expected: Vec<String>,
        /// Field list found on the wire.
        found: Vec<String>,
    },

    /// A codec received a value it cannot encode.
    TypeMismatch {
        /// What the codec handles.
        expected: String,
        /// What it was handed.
        found: String,
    },

    /// Strict mode rejected a result that carried warnings.
    Incomplete(Vec<Warning>),

    /// Logic error inside the library. Please report it.
    Internal(String),
}

impl fmt::Display for HessianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Protocol(s) => write!(f, "Protocol Error: {s}"),
            Self::DanglingReference { index, len } => write!(
                f,
                "Protocol Error: back-reference #{index} points past the {len} registered instances"
            ),
            Self::SchemaMismatch {
                class,
                expected,
                found,
            } => write!(
                f,
                "Schema Error: class '{class}' declares fields {expected:?} but the stream carries {found:?}"
            ),
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type Error: expected {expected}, found {found}")
            }
            Self::Incomplete(warnings) => {
                write!(f, "Incomplete Result: {} warning(s)", warnings.len())?;
                if let Some(first) = warnings.first() {
                    write!(f, ", first: {first}")?;
                }
                Ok(())
            }
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for HessianError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HessianError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl HessianError {
    /// Returns true for failures caused by a malformed stream rather than by the transport.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::DanglingReference { .. } | Self::SchemaMismatch { .. }
        )
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// A recovered, non-fatal problem observed while encoding or decoding.
///
/// Warnings are collected by the stream that observed them and logged at `warn` level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The object did not carry a value for a declared field; null was written/kept.
    MissingField {
        /// Class wire name.
        class: String,
        /// Field name.
        field: String,
    },
    /// The stream carried a field the local type does not declare; it was skipped.
    UnknownField {
        /// Class wire name.
        class: String,
        /// Field name.
        field: String,
    },
    /// The stream value could not be converted to the declared field type; the field
    /// was left null.
    FieldTypeMismatch {
        /// Class wire name.
        class: String,
        /// Field name.
        field: String,
        /// Declared field type.
        expected: String,
    },
    /// No loaded type space knows this wire name; a generic structure was produced.
    UnresolvedType {
        /// The wire type name.
        wire_name: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { class, field } => {
                write!(f, "{class}.{field} had no value")
            }
            Self::UnknownField { class, field } => {
                write!(f, "{class}.{field} is not declared locally and was skipped")
            }
            Self::FieldTypeMismatch {
                class,
                field,
                expected,
            } => write!(f, "{class}.{field} could not be read as {expected}"),
            Self::UnresolvedType { wire_name } => {
                write!(f, "type '{wire_name}' is not loaded; decoded as a generic map")
            }
        }
    }
}
