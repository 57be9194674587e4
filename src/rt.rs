// src/rt.rs

//! The typed convenience layer and runtime support for `#[derive(WireObject)]`.
//!
//! [`WireObject`] maps a Rust type onto a [`TypeDescriptor`] and converts values to and
//! from the dynamic [`Value`] model. It is implemented here for scalars, `String`,
//! `Vec<T>`, `Option<T>`, `Box<T>` and `HashMap<String, V>`; structs get it from the
//! derive.

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::codec::basic::coerce;
use crate::error::{HessianError, Result};
use crate::types::{PrimitiveKind, TypeDescriptor, builtin};
use crate::value::{ObjectBody, Value};

/// A Rust type with a wire representation.
pub trait WireObject: Sized {
    /// The runtime type describing `Self`.
    fn type_descriptor() -> TypeDescriptor;

    /// Converts `self` into the dynamic model.
    fn to_value(&self) -> Value;

    /// Rebuilds `Self` from a decoded value.
    fn from_value(value: &Value) -> Result<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl WireObject for $ty {
                fn type_descriptor() -> TypeDescriptor {
                    builtin::primitive(PrimitiveKind::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::$kind(self.clone())
                }

                fn from_value(value: &Value) -> Result<Self> {
                    match coerce(PrimitiveKind::$kind, value.clone())? {
                        Value::$kind(v) => Ok(v),
                        other => Err(HessianError::mismatch(
                            PrimitiveKind::$kind.wire_name(),
                            other.kind_name(),
                        )),
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    u8 => Byte,
    i8 => SByte,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
}

impl<T: WireObject> WireObject for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::array_of(&T::type_descriptor())
    }

    fn to_value(&self) -> Value {
        Value::list(
            Self::type_descriptor(),
            self.iter().map(WireObject::to_value).collect(),
        )
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Binary(bytes) => bytes.iter().map(|b| T::from_value(&Value::Byte(*b))).collect(),
            Value::Ref(obj) => match obj.read().body() {
                ObjectBody::List(items) => items.iter().map(T::from_value).collect(),
                ObjectBody::Bytes(bytes) => {
                    bytes.iter().map(|b| T::from_value(&Value::Byte(*b))).collect()
                }
                other => Err(HessianError::mismatch("list", other.kind_name())),
            },
            other => Err(HessianError::mismatch("list", other.kind_name())),
        }
    }
}

impl<T: WireObject> WireObject for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::nullable(&T::type_descriptor())
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, WireObject::to_value)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: WireObject> WireObject for Box<T> {
    fn type_descriptor() -> TypeDescriptor {
        T::type_descriptor()
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }

    fn from_value(value: &Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<V: WireObject, S: BuildHasher + Default> WireObject for HashMap<String, V, S> {
    fn type_descriptor() -> TypeDescriptor {
        builtin::generic_map()
    }

    fn to_value(&self) -> Value {
        let mut entries: Vec<_> = self
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.to_value()))
            .collect();
        entries.sort_by(|a, b| a.0.as_str().cmp(&b.0.as_str()));
        Value::generic_map(entries)
    }

    fn from_value(value: &Value) -> Result<Self> {
        let obj = value.expect_object("map")?;
        let guard = obj.read();
        match guard.body() {
            ObjectBody::Map(entries) => entries
                .iter()
                .map(|(k, v)| -> Result<(String, V)> {
                    let key = k
                        .as_str()
                        .ok_or_else(|| HessianError::mismatch("string key", k.kind_name()))?;
                    Ok((key.to_owned(), V::from_value(v)?))
                })
                .collect(),
            ObjectBody::Fields(fields) => fields
                .iter()
                .map(|(k, v)| -> Result<(String, V)> { Ok((k.clone(), V::from_value(v)?)) })
                .collect(),
            other => Err(HessianError::mismatch("map", other.kind_name())),
        }
    }
}

/// Reads a named field of a decoded object; absent fields read as null.
#[doc(hidden)]
pub fn field<T: WireObject>(value: &Value, class: &str, name: &str) -> Result<T> {
    let obj = value.expect_object(class)?;
    let raw = obj.field(name).unwrap_or(Value::Null);
    T::from_value(&raw).map_err(|e| match e {
        HessianError::TypeMismatch { expected, found } => HessianError::TypeMismatch {
            expected: format!("{class}.{name}: {expected}"),
            found,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_narrow_from_wire_forms() -> Result<()> {
        assert_eq!(i16::from_value(&Value::Int(12))?, 12);
        assert_eq!(char::from_value(&Value::String("z".into()))?, 'z');
        assert!(u8::from_value(&Value::Int(-1)).is_err());
        assert!(i32::from_value(&Value::Null).is_err());
        Ok(())
    }

    #[test]
    fn containers() -> Result<()> {
        let v = vec![1i32, 2, 3];
        assert_eq!(Vec::<i32>::from_value(&v.to_value())?, v);
        assert!(Vec::<i32>::type_descriptor().ptr_eq(&TypeDescriptor::array_of(
            &builtin::primitive(PrimitiveKind::Int)
        )));
        assert_eq!(Vec::<u8>::from_value(&Value::Binary(vec![4, 5]))?, vec![4, 5]);
        assert_eq!(Option::<i64>::from_value(&Value::Null)?, None);

        let mut m = HashMap::new();
        m.insert("a".to_owned(), true);
        assert_eq!(HashMap::<String, bool>::from_value(&m.to_value())?, m);
        Ok(())
    }
}
