#![allow(missing_docs)]

use std::sync::{Arc, Barrier};
use std::thread;

use hessian_graph::codec::{Deserializer, Serializer};
use hessian_graph::types::builtin;
use hessian_graph::{
    Capabilities, PrimitiveKind, SerializerFactory, TypeDescriptor, TypeInfo, TypeSpace,
};
use proptest::prelude::*;

fn addr<T: ?Sized>(codec: &Arc<T>) -> *const () {
    Arc::as_ptr(codec) as *const ()
}

fn heavy() -> TypeDescriptor {
    TypeInfo::class("app.Heavy")
        .field("id", builtin::primitive(PrimitiveKind::Long))
        .field("label", builtin::primitive(PrimitiveKind::String))
        .build()
}

// --- CONCURRENCY ---

/// Sixteen threads asking for the same reflective codec at once get one shared instance.
#[test]
fn concurrent_first_use_builds_one_serializer() {
    let factory = SerializerFactory::new();
    let ty = heavy();
    let barrier = Barrier::new(16);

    let codecs: Vec<Arc<dyn Serializer>> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    factory.get_serializer(&ty)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("resolver thread panicked"))
            .collect()
    });

    assert!(codecs.iter().all(|c| addr(c) == addr(&codecs[0])));
    assert_eq!(factory.cached(), (1, 0));
}

#[test]
fn concurrent_first_use_builds_one_deserializer() {
    let factory = SerializerFactory::new();
    let space = TypeSpace::new("app").with_type(heavy());
    factory.load_type_space(space);
    let barrier = Barrier::new(16);

    let codecs: Vec<Arc<dyn Deserializer>> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    factory
                        .get_deserializer_by_name("app.Heavy")
                        .expect("app.Heavy is loaded")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("resolver thread panicked"))
            .collect()
    });

    assert!(codecs.iter().all(|c| addr(c) == addr(&codecs[0])));
    assert_eq!(factory.cached(), (0, 1));
}

// --- PRIORITY ORDER ---

#[test]
fn map_capability_wins_over_sequence() {
    let factory = SerializerFactory::new();
    let both = TypeInfo::class("app.Multimap")
        .capability(Capabilities::SEQUENCE.with(Capabilities::MAP))
        .build();
    let codec = format!("{:?}", factory.get_serializer(&both));
    assert!(codec.starts_with("MapSerializer"), "{codec}");
}

#[test]
fn sequence_capability_wins_over_error() {
    let factory = SerializerFactory::new();
    let failure = TypeInfo::class("app.BatchFailure")
        .capability(Capabilities::ERROR.with(Capabilities::SEQUENCE))
        .build();
    let codec = format!("{:?}", factory.get_deserializer(&failure));
    assert!(codec.starts_with("SequenceDeserializer"), "{codec}");
}

#[test]
fn plain_class_falls_through_to_reflective() {
    let factory = SerializerFactory::new();
    let codec = format!("{:?}", factory.get_serializer(&heavy()));
    assert!(codec.starts_with("ObjectSerializer"), "{codec}");
}

// --- NULLABLE ---

#[test]
fn nullable_resolves_to_the_wrapped_decoder() {
    let factory = SerializerFactory::new();
    let int = builtin::primitive(PrimitiveKind::Int);
    let maybe = TypeDescriptor::nullable(&int);

    let wrapped = factory.get_deserializer(&maybe);
    let plain = factory.get_deserializer(&int);
    assert_eq!(addr(&wrapped), addr(&plain));
    assert!(wrapped.own_type().ptr_eq(&int));
    assert_eq!(factory.cached(), (0, 0));
}

// --- WIRE NAMES ---

#[test]
fn nested_array_names_recurse() {
    let factory = SerializerFactory::new();
    let decoder = factory
        .get_deserializer_by_name("[[[int")
        .expect("nested int arrays resolve");

    let three = decoder.own_type();
    assert_eq!(three.name(), "[[[int");
    let two = three.element_type().expect("array of arrays");
    assert_eq!(two.name(), "[[int");
    let one = two.element_type().expect("array of int arrays");
    let int_array = builtin::primitive_array(PrimitiveKind::Int).expect("int has an array form");
    assert!(one.ptr_eq(&int_array));
    assert!(
        one.element_type()
            .is_some_and(|int| int.ptr_eq(&builtin::primitive(PrimitiveKind::Int)))
    );

    // Cached under both wire names, and stable.
    assert_eq!(factory.cached(), (0, 2));
    let again = factory
        .get_deserializer_by_name("[[[int")
        .expect("still resolves");
    assert_eq!(addr(&decoder), addr(&again));
}

#[test]
fn unknown_names_do_not_resolve() {
    let factory = SerializerFactory::new();
    assert!(factory.get_deserializer_by_name("").is_none());
    assert!(factory.get_deserializer_by_name("app.Missing").is_none());
    assert!(factory.get_deserializer_by_name("[[app.Missing").is_none());
    assert_eq!(factory.cached(), (0, 0));
}

#[test]
fn type_spaces_are_searched_in_load_order() {
    let factory = SerializerFactory::new();
    let first = TypeInfo::class("app.Point").build();
    let second = TypeInfo::class("app.Point").build();
    factory.load_type_space(TypeSpace::new("first").with_type(first.clone()));
    factory.load_type_space(TypeSpace::new("second").with_type(second));

    let decoder = factory
        .get_deserializer_by_name("app.Point")
        .expect("loaded");
    assert!(decoder.own_type().ptr_eq(&first));

    let array = factory
        .get_deserializer_by_name("[app.Point")
        .expect("array of a loaded type");
    assert!(
        array
            .own_type()
            .element_type()
            .is_some_and(|e| e.ptr_eq(&first))
    );
}

#[test]
fn platform_types_resolve_by_wire_name() {
    let factory = SerializerFactory::new();
    for name in ["decimal", "guid", "locale", "dbnull"] {
        assert!(factory.get_deserializer_by_name(name).is_some(), "{name}");
    }
    let bare = SerializerFactory::builder().platform_types(false).build();
    assert!(bare.get_deserializer_by_name("decimal").is_none());
}

proptest! {
    #[test]
    fn array_prefix_depth_matches_nesting(depth in 0usize..8) {
        let factory = SerializerFactory::new();
        let name = format!("{}int", "[".repeat(depth));
        let decoder = factory.get_deserializer_by_name(&name);
        prop_assert!(decoder.is_some());
        let decoder = decoder.unwrap();
        prop_assert_eq!(decoder.own_type().name(), name.as_str());

        let mut nesting = 0;
        let mut cursor = decoder.own_type().clone();
        while let Some(element) = cursor.element_type().cloned() {
            nesting += 1;
            cursor = element;
        }
        prop_assert_eq!(nesting, depth);
        prop_assert!(cursor.ptr_eq(&builtin::primitive(PrimitiveKind::Int)));
    }
}
