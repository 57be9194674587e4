//! Built-in scalars: the codecs behind the primitive table's scalar entries.
//!
//! The wire has fewer numeric forms than the value model, so narrow types widen on the
//! way out (`byte`, `sbyte`, `short` as int; `float` as double; `char` as a one-character
//! string) and are narrowed back by [`coerce`] when the reader knows the expected type.

use crate::error::{HessianError, Result};
use crate::types::{PrimitiveKind, TypeDescriptor};
use crate::value::Value;

use super::{Deserializer, ObjectOutput, Serializer};

/// Writes one scalar kind.
#[derive(Debug)]
pub struct BasicSerializer {
    kind: PrimitiveKind,
}

impl BasicSerializer {
    /// Creates a serializer for `kind`.
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }
}

impl Serializer for BasicSerializer {
    fn write_object(&self, value: &Value, out: &mut dyn ObjectOutput) -> Result<()> {
        match coerce(self.kind, value.clone())? {
            Value::Null => out.write_null(),
            Value::Bool(v) => out.write_bool(v),
            Value::Byte(v) => out.write_int(i32::from(v)),
            Value::SByte(v) => out.write_int(i32::from(v)),
            Value::Short(v) => out.write_int(i32::from(v)),
            Value::Int(v) => out.write_int(v),
            Value::Long(v) => out.write_long(v),
            Value::Float(v) => out.write_double(f64::from(v)),
            Value::Double(v) => out.write_double(v),
            Value::Char(c) => out.write_string(c.encode_utf8(&mut [0; 4])),
            Value::String(s) => out.write_string(&s),
            Value::Date(millis) => out.write_date(millis),
            other => Err(HessianError::mismatch(
                self.kind.wire_name(),
                other.kind_name(),
            )),
        }
    }
}

/// Narrows wire scalars to one scalar kind.
#[derive(Debug)]
pub struct BasicDeserializer {
    ty: TypeDescriptor,
    kind: PrimitiveKind,
}

impl BasicDeserializer {
    /// Creates a deserializer for `kind`.
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            ty: TypeDescriptor::primitive(kind),
            kind,
        }
    }
}

impl Deserializer for BasicDeserializer {
    fn own_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn from_scalar(&self, value: Value) -> Result<Value> {
        coerce(self.kind, value)
    }
}

/// Converts `value` to `kind`, failing with a type mismatch when the value does not fit.
///
/// `Null` passes through unchanged.
pub fn coerce(kind: PrimitiveKind, value: Value) -> Result<Value> {
    let fail = |value: &Value| HessianError::mismatch(kind.wire_name(), value.kind_name());
    let integral = |value: &Value| value.as_i64().ok_or_else(|| fail(value));

    let converted = match (kind, &value) {
        (_, Value::Null) => Value::Null,
        (PrimitiveKind::Bool, Value::Bool(b)) => Value::Bool(*b),
        (PrimitiveKind::Byte, v) => Value::Byte(u8::try_from(integral(v)?).map_err(|_| fail(v))?),
        (PrimitiveKind::SByte, v) => {
            Value::SByte(i8::try_from(integral(v)?).map_err(|_| fail(v))?)
        }
        (PrimitiveKind::Short, v) => {
            Value::Short(i16::try_from(integral(v)?).map_err(|_| fail(v))?)
        }
        (PrimitiveKind::Int, v) => Value::Int(i32::try_from(integral(v)?).map_err(|_| fail(v))?),
        (PrimitiveKind::Long, v) => Value::Long(integral(v)?),
        (PrimitiveKind::Float, v) => Value::Float(v.as_f64().ok_or_else(|| fail(v))? as f32),
        (PrimitiveKind::Double, v) => Value::Double(v.as_f64().ok_or_else(|| fail(v))?),
        (PrimitiveKind::Char, Value::Char(c)) => Value::Char(*c),
        (PrimitiveKind::Char, Value::String(s)) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(fail(&value)),
            }
        }
        (PrimitiveKind::String, Value::String(s)) => Value::String(s.clone()),
        (PrimitiveKind::String, Value::Char(c)) => Value::String(c.to_string()),
        (PrimitiveKind::Date, Value::Date(millis) | Value::Long(millis)) => Value::Date(*millis),
        (_, v) => return Err(fail(v)),
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrows_wire_forms() -> Result<()> {
        assert!(matches!(coerce(PrimitiveKind::Short, Value::Int(7))?, Value::Short(7)));
        assert!(matches!(coerce(PrimitiveKind::Byte, Value::Int(255))?, Value::Byte(255)));
        assert!(matches!(
            coerce(PrimitiveKind::Float, Value::Double(0.5))?,
            Value::Float(f) if f == 0.5
        ));
        assert!(matches!(
            coerce(PrimitiveKind::Char, Value::String("x".into()))?,
            Value::Char('x')
        ));
        assert!(matches!(coerce(PrimitiveKind::Int, Value::Null)?, Value::Null));
        Ok(())
    }

    #[test]
    fn rejects_values_that_do_not_fit() {
        assert!(coerce(PrimitiveKind::Byte, Value::Int(256)).is_err());
        assert!(coerce(PrimitiveKind::Char, Value::String("xy".into())).is_err());
        assert!(coerce(PrimitiveKind::Bool, Value::Int(1)).is_err());
        assert!(coerce(PrimitiveKind::Int, Value::String("1".into())).is_err());
    }
}
