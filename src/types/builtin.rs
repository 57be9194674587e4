//! Process-wide interned descriptors for the built-in types.
//!
//! These are created once, on first use, and never change. Interning matters because
//! the primitive codec table is keyed by descriptor identity.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::descriptor::{Capabilities, PrimitiveKind, TypeDescriptor, TypeInfo, TypeShape};

/// Wire name of the platform decimal type.
pub const DECIMAL_WIRE_NAME: &str = "decimal";
/// Wire name of the platform globally-unique-id type.
pub const GUID_WIRE_NAME: &str = "guid";
/// Wire name of the platform culture/locale type.
pub const LOCALE_WIRE_NAME: &str = "locale";
/// Wire name of the platform null-marker type.
pub const DBNULL_WIRE_NAME: &str = "dbnull";

struct Builtins {
    scalars: HashMap<PrimitiveKind, TypeDescriptor>,
    arrays: HashMap<PrimitiveKind, TypeDescriptor>,
    map: TypeDescriptor,
    list: TypeDescriptor,
    decimal: TypeDescriptor,
    guid: TypeDescriptor,
    locale: TypeDescriptor,
    dbnull: TypeDescriptor,
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(|| {
    let mut scalars = HashMap::new();
    let mut arrays = HashMap::new();
    for kind in PrimitiveKind::ALL {
        let scalar = TypeInfo::with_shape(kind.wire_name(), TypeShape::Primitive(kind)).build();
        if kind.has_array_form() {
            let array = TypeInfo::with_shape(
                format!("[{}", kind.wire_name()),
                TypeShape::Array(scalar.clone()),
            )
            .capability(Capabilities::SEQUENCE)
            .build();
            arrays.insert(kind, array);
        }
        scalars.insert(kind, scalar);
    }

    let string = scalars
        .get(&PrimitiveKind::String)
        .cloned()
        .unwrap_or_else(|| TypeInfo::class("string").build());
    let value_type = |name: &str| TypeInfo::class(name).field("value", string.clone()).build();

    Builtins {
        map: TypeInfo::class("map").capability(Capabilities::MAP).build(),
        list: TypeInfo::class("list")
            .capability(Capabilities::SEQUENCE)
            .build(),
        decimal: value_type(DECIMAL_WIRE_NAME),
        guid: value_type(GUID_WIRE_NAME),
        locale: value_type(LOCALE_WIRE_NAME),
        dbnull: TypeInfo::class(DBNULL_WIRE_NAME).build(),
        scalars,
        arrays,
    }
});

/// The interned scalar descriptor.
pub fn primitive(kind: PrimitiveKind) -> TypeDescriptor {
    match BUILTINS.scalars.get(&kind) {
        Some(ty) => ty.clone(),
        // Every kind is inserted at initialization.
        None => TypeInfo::with_shape(kind.wire_name(), TypeShape::Primitive(kind)).build(),
    }
}

/// The interned scalar array descriptor (`[int`, `[string`, ...).
pub fn primitive_array(kind: PrimitiveKind) -> Option<TypeDescriptor> {
    BUILTINS.arrays.get(&kind).cloned()
}

/// The generic map type used for untyped maps and unresolved class names.
pub fn generic_map() -> TypeDescriptor {
    BUILTINS.map.clone()
}

/// The generic list type used for untyped lists.
pub fn generic_list() -> TypeDescriptor {
    BUILTINS.list.clone()
}

/// Platform big-decimal type (single `value` string field).
pub fn decimal() -> TypeDescriptor {
    BUILTINS.decimal.clone()
}

/// Platform globally-unique-id type (single `value` string field).
pub fn guid() -> TypeDescriptor {
    BUILTINS.guid.clone()
}

/// Platform culture/locale type (single `value` string field).
pub fn locale() -> TypeDescriptor {
    BUILTINS.locale.clone()
}

/// Platform null-marker type (no fields).
pub fn dbnull() -> TypeDescriptor {
    BUILTINS.dbnull.clone()
}
