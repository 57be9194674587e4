//! Defines the structural framing of the wire format.
//!
//! # Layout
//! Every value starts with a one-byte tag. Multi-byte numbers are big-endian.
//!
//! ```text
//! N                         null
//! T | F                     boolean
//! I i32 | L i64 | D f64     numbers (byte, sbyte, short travel as I; float as D)
//! S u32 utf8                string (char travels as a 1-char string)
//! B u32 bytes               binary
//! d i64                     date, epoch millis
//! H ... Z                   untyped map
//! M type ... Z              typed map
//! V type i32 ... Z          list or array (length -1 when unknown)
//! C name i32 S...           class definition: name, field count, field names
//! O i32                     instance of class definition #n, then its field values
//! Q i32                     back-reference to instance #n
//! ```
//!
//! `type` and `name` are `u16` length-prefixed UTF-8.

use crate::error::{HessianError, Result};

/// One-byte value tags.
pub mod tag {
    /// Null.
    pub const NULL: u8 = b'N';
    /// Boolean true.
    pub const TRUE: u8 = b'T';
    /// Boolean false.
    pub const FALSE: u8 = b'F';
    /// Big-endian i32.
    pub const INT: u8 = b'I';
    /// Big-endian i64.
    pub const LONG: u8 = b'L';
    /// Big-endian f64.
    pub const DOUBLE: u8 = b'D';
    /// u32 length, then UTF-8 bytes.
    pub const STRING: u8 = b'S';
    /// u32 length, then raw bytes.
    pub const BINARY: u8 = b'B';
    /// Big-endian i64 of epoch milliseconds.
    pub const DATE: u8 = b'd';
    /// Untyped map: key/value pairs up to `END`.
    pub const UNTYPED_MAP: u8 = b'H';
    /// Typed map: u16-length type name, then pairs up to `END`.
    pub const TYPED_MAP: u8 = b'M';
    /// List: u16-length type name, i32 length, then elements up to `END`.
    pub const LIST: u8 = b'V';
    /// Closes a map or list.
    pub const END: u8 = b'Z';
    /// Class definition: u16-length name, i32 field count, field-name strings.
    pub const CLASS_DEF: u8 = b'C';
    /// Instance of the class definition with the following i32 index.
    pub const OBJECT: u8 = b'O';
    /// Back-reference to the instance with the following i32 index.
    pub const BACK_REF: u8 = b'Q';
}

/// Prefix marking an array wire name: `"[T"` is array-of-T.
pub const ARRAY_PREFIX: char = '[';

/// Length marker for lists whose size is not known up front.
pub const UNKNOWN_LENGTH: i32 = -1;

/// Outcome of `write_object_begin`.
///
/// Replaces the legacy integer sentinel (`< -1`, `== -1`, otherwise) with explicit cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassState {
    /// The class schema is already on the stream; write the field values only.
    Known(u32),
    /// The class schema has not been written; write the field count and names, call
    /// `write_object_begin` again, then write the field values.
    NewClass,
    /// The stream already wrote the complete value; write nothing.
    AlreadyWritten,
}

impl ClassState {
    /// Sentinel used by the legacy integer protocol for [`ClassState::AlreadyWritten`].
    pub const ALREADY_WRITTEN_SENTINEL: i32 = -2;
    /// Sentinel used by the legacy integer protocol for [`ClassState::NewClass`].
    pub const NEW_CLASS_SENTINEL: i32 = -1;

    /// Decodes the legacy integer protocol.
    pub fn from_sentinel(raw: i32) -> Self {
        match raw {
            r if r < Self::NEW_CLASS_SENTINEL => Self::AlreadyWritten,
            Self::NEW_CLASS_SENTINEL => Self::NewClass,
            r => Self::Known(r.unsigned_abs()),
        }
    }

    /// Encodes into the legacy integer protocol.
    pub fn to_sentinel(self) -> i32 {
        match self {
            Self::AlreadyWritten => Self::ALREADY_WRITTEN_SENTINEL,
            Self::NewClass => Self::NEW_CLASS_SENTINEL,
            Self::Known(index) => i32::try_from(index).unwrap_or(i32::MAX),
        }
    }
}

/// A class schema as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    /// Class wire name.
    pub name: String,
    /// Field names in transmission order.
    pub fields: Vec<String>,
}

impl ClassDefinition {
    /// Creates a definition.
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Whether the definition carries exactly `expected`, in order.
    pub fn has_fields(&self, expected: &[&str]) -> bool {
        self.fields.len() == expected.len()
            && self.fields.iter().zip(expected).all(|(a, b)| a == b)
    }

    /// Fails with a schema mismatch unless the definition carries exactly `expected`.
    pub fn require_fields(&self, expected: &[&str]) -> Result<()> {
        if self.has_fields(expected) {
            return Ok(());
        }
        Err(HessianError::SchemaMismatch {
            class: self.name.clone(),
            expected: expected.iter().map(|s| (*s).to_owned()).collect(),
            found: self.fields.clone(),
        })
    }
}

/// Validates a decoded length field.
pub(crate) fn list_length(raw: i32) -> Result<Option<usize>> {
    match raw {
        UNKNOWN_LENGTH => Ok(None),
        n if n >= 0 => Ok(Some(n.unsigned_abs() as usize)),
        n => Err(HessianError::Protocol(format!("negative list length {n}"))),
    }
}
