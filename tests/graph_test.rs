#![allow(missing_docs)]

use std::thread;

use hessian_graph::codec::{ObjectOutput, Serializer};
use hessian_graph::reader::MAX_DEPTH;
use hessian_graph::types::builtin;
use hessian_graph::{
    ClassState, Hessian, HessianError, ObjectBody, ObjectRef, PrimitiveKind, Result,
    SerializerFactory, StreamInspector, TypeDescriptor, TypeInfo, TypeSpace, Value, Warning,
};

fn int() -> TypeDescriptor {
    builtin::primitive(PrimitiveKind::Int)
}

fn string() -> TypeDescriptor {
    builtin::primitive(PrimitiveKind::String)
}

fn point_type() -> TypeDescriptor {
    TypeInfo::class("app.Point")
        .field("x", int())
        .field("y", int())
        .build()
}

fn point(ty: &TypeDescriptor, x: i32, y: i32) -> Value {
    Value::object(ty.clone(), [("x", Value::Int(x)), ("y", Value::Int(y))])
}

fn object(value: &Value) -> ObjectRef {
    value
        .as_ref_object()
        .cloned()
        .expect("decoded value is an object")
}

/// A node type whose `next` field is declared as its base, so the field can point back
/// at any node.
fn node_types() -> (TypeDescriptor, TypeDescriptor) {
    let base = TypeInfo::class("app.Linked").build();
    let node = TypeInfo::class("app.Node")
        .base(base.clone())
        .field("name", string())
        .field("next", base.clone())
        .build();
    (base, node)
}

// --- IDENTITY ---

#[test]
fn shared_instance_is_written_once_and_decoded_once() -> Result<()> {
    let point_ty = point_type();
    let pair_ty = TypeInfo::class("app.Pair")
        .field("left", point_ty.clone())
        .field("right", point_ty.clone())
        .build();
    let factory = SerializerFactory::builder()
        .type_space(
            TypeSpace::new("app")
                .with_type(point_ty.clone())
                .with_type(pair_ty.clone()),
        )
        .build();
    let options = Hessian::builder().factory(&factory);

    let shared = point(&point_ty, 3, 4);
    let pair = Value::object(
        pair_ty,
        [("left", shared.clone()), ("right", shared.clone())],
    );
    let bytes = options.serialize(&pair)?;

    let report = StreamInspector::inspect(&bytes)?;
    assert_eq!(report.back_references, 1);
    assert_eq!(report.objects_per_class.get("app.Point"), Some(&1));
    assert_eq!(report.roots, 1);

    let decoded = object(&options.deserialize(&bytes)?);
    let left = decoded.field("left").expect("left is set");
    let right = decoded.field("right").expect("right is set");
    assert!(left.same_as(&right));

    // One instance: a write through one handle is visible through the other.
    object(&left).write().set("x", Value::Int(9))?;
    assert!(matches!(object(&right).field("x"), Some(Value::Int(9))));
    Ok(())
}

#[test]
fn cycles_decode_to_the_same_instances() -> Result<()> {
    let (base, node_ty) = node_types();
    let factory = SerializerFactory::builder()
        .type_space(TypeSpace::new("app").with_type(base).with_type(node_ty.clone()))
        .build();
    let options = Hessian::builder().factory(&factory);

    let a = Value::object(node_ty.clone(), [("name", Value::from("a")), ("next", Value::Null)]);
    let b = Value::object(node_ty, [("name", Value::from("b")), ("next", a.clone())]);
    object(&a).write().set("next", b)?;

    let bytes = options.serialize(&a)?;
    let report = StreamInspector::inspect(&bytes)?;
    assert_eq!(report.class_definitions.len(), 1);
    assert_eq!(report.objects_per_class.get("app.Node"), Some(&2));
    assert_eq!(report.back_references, 1);

    let decoded = options.deserialize(&bytes)?;
    let first = object(&decoded);
    let second = first.field("next").expect("a.next");
    let back = object(&second).field("next").expect("b.next");
    assert!(back.same_as(&decoded));
    assert!(matches!(object(&second).field("name"), Some(Value::String(s)) if s == "b"));
    Ok(())
}

#[test]
fn one_schema_for_many_instances() -> Result<()> {
    let point_ty = point_type();
    let factory = SerializerFactory::new();
    let options = Hessian::builder().factory(&factory);

    let points = (0..100).map(|i| point(&point_ty, i, -i)).collect();
    let bytes = options.serialize(&Value::generic_list(points))?;

    let report = StreamInspector::inspect(&bytes)?;
    assert_eq!(report.class_definitions.len(), 1);
    assert_eq!(report.class_definitions[0].name, "app.Point");
    assert_eq!(report.class_definitions[0].fields, vec!["x", "y"]);
    assert_eq!(report.objects_per_class.get("app.Point"), Some(&100));
    assert_eq!(report.lists, 1);
    assert_eq!(report.back_references, 0);

    let decoded = options.deserialize(&bytes)?;
    let items = object(&decoded)
        .read()
        .items()
        .map(<[Value]>::to_vec)
        .expect("a list");
    assert_eq!(items.len(), 100);
    for (i, item) in (0..100).zip(&items) {
        let p = object(item);
        assert!(matches!(p.field("x"), Some(Value::Int(x)) if x == i));
        assert!(matches!(p.field("y"), Some(Value::Int(y)) if y == -i));
    }
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            assert!(!a.same_as(b));
        }
    }
    Ok(())
}

#[test]
fn tables_reset_between_graphs() -> Result<()> {
    let point_ty = point_type();
    let factory = SerializerFactory::new();
    let options = Hessian::builder().factory(&factory);
    let p = point(&point_ty, 1, 2);

    let first = options.serialize(&p)?;
    let second = options.serialize(&p)?;
    assert_eq!(first, second);
    assert_eq!(StreamInspector::inspect(&second)?.back_references, 0);
    Ok(())
}

// --- UNKNOWN TYPES ---

#[test]
fn unknown_class_decodes_as_a_generic_map() -> Result<()> {
    let point_ty = point_type();
    let bytes = Hessian::builder()
        .factory(&SerializerFactory::new())
        .serialize(&point(&point_ty, 7, 8))?;

    // A peer with no type spaces loaded.
    let reader = SerializerFactory::new();
    let decoded = Hessian::builder().factory(&reader).decode(&bytes)?;
    assert_eq!(
        decoded.warnings,
        vec![Warning::UnresolvedType {
            wire_name: "app.Point".into()
        }]
    );

    let obj = object(&decoded.value);
    assert!(obj.type_descriptor().ptr_eq(&builtin::generic_map()));
    assert_eq!(obj.read().wire_name(), Some("app.Point"));
    assert!(matches!(obj.field("x"), Some(Value::Int(7))));
    assert!(matches!(obj.field("y"), Some(Value::Int(8))));
    Ok(())
}

#[test]
fn strict_mode_rejects_partial_results() -> Result<()> {
    let point_ty = point_type();
    let bytes = Hessian::builder()
        .factory(&SerializerFactory::new())
        .serialize(&point(&point_ty, 1, 1))?;

    let reader = SerializerFactory::new();
    let result = Hessian::builder().factory(&reader).strict(true).decode(&bytes);
    match result {
        Err(HessianError::Incomplete(warnings)) => assert_eq!(warnings.len(), 1),
        other => panic!("expected Incomplete, got {other:?}"),
    }
    Ok(())
}

#[test]
fn field_drift_is_recovered_per_field() -> Result<()> {
    // The sender's Point has an extra field and sends a string where we expect an int.
    let sent = TypeInfo::class("app.Point")
        .field("x", string())
        .field("z", int())
        .build();
    let bytes = Hessian::builder().factory(&SerializerFactory::new()).serialize(
        &Value::object(sent, [("x", Value::from("seven")), ("z", Value::Int(1))]),
    )?;

    let local = point_type();
    let factory = SerializerFactory::builder()
        .type_space(TypeSpace::new("app").with_type(local))
        .build();
    let decoded = Hessian::builder().factory(&factory).decode(&bytes)?;

    let obj = object(&decoded.value);
    assert!(matches!(obj.field("x"), Some(Value::Null)));
    assert!(matches!(obj.field("y"), Some(Value::Null)));
    assert!(obj.field("z").is_none());
    assert!(decoded.warnings.contains(&Warning::FieldTypeMismatch {
        class: "app.Point".into(),
        field: "x".into(),
        expected: "int".into(),
    }));
    assert!(decoded.warnings.contains(&Warning::UnknownField {
        class: "app.Point".into(),
        field: "z".into(),
    }));
    assert!(decoded.warnings.contains(&Warning::MissingField {
        class: "app.Point".into(),
        field: "y".into(),
    }));
    Ok(())
}

#[test]
fn mismatched_list_element_leaves_the_next_field_intact() -> Result<()> {
    let sent = TypeInfo::class("app.Holder")
        .field("nums", TypeDescriptor::array_of(&string()))
        .field("tail", string())
        .build();
    let nums = Value::list(
        TypeDescriptor::array_of(&string()),
        vec![Value::from("a"), Value::from("b")],
    );
    let bytes = Hessian::builder().factory(&SerializerFactory::new()).serialize(
        &Value::object(sent, [("nums", nums), ("tail", Value::from("ok"))]),
    )?;

    let local = TypeInfo::class("app.Holder")
        .field("nums", TypeDescriptor::array_of(&int()))
        .field("tail", string())
        .build();
    let factory = SerializerFactory::builder()
        .type_space(TypeSpace::new("app").with_type(local))
        .build();
    let decoded = Hessian::builder().factory(&factory).decode(&bytes)?;

    let obj = object(&decoded.value);
    assert!(matches!(obj.field("nums"), Some(Value::Null)));
    assert!(matches!(obj.field("tail"), Some(Value::String(s)) if s == "ok"));
    assert_eq!(
        decoded.warnings,
        vec![Warning::FieldTypeMismatch {
            class: "app.Holder".into(),
            field: "nums".into(),
            expected: "[int".into(),
        }]
    );
    Ok(())
}

#[test]
fn foreign_class_in_a_leaf_or_enum_field_is_recovered() -> Result<()> {
    let pt = TypeInfo::class("app.Pt").field("x", int()).build();
    let sent = TypeInfo::class("app.Order")
        .field("color", pt.clone())
        .field("price", pt.clone())
        .field("tail", string())
        .build();
    let bytes = Hessian::builder().factory(&SerializerFactory::new()).serialize(
        &Value::object(
            sent,
            [
                ("color", Value::object(pt.clone(), [("x", Value::Int(1))])),
                ("price", Value::object(pt, [("x", Value::Int(2))])),
                ("tail", Value::from("ok")),
            ],
        ),
    )?;

    let color = TypeDescriptor::enumeration("app.Color", ["RED"]);
    let local = TypeInfo::class("app.Order")
        .field("color", color.clone())
        .field("price", builtin::decimal())
        .field("tail", string())
        .build();
    let factory = SerializerFactory::builder()
        .type_space(TypeSpace::new("app").with_type(color).with_type(local))
        .build();
    let decoded = Hessian::builder().factory(&factory).decode(&bytes)?;

    let obj = object(&decoded.value);
    assert!(matches!(obj.field("color"), Some(Value::Null)));
    assert!(matches!(obj.field("price"), Some(Value::Null)));
    assert!(matches!(obj.field("tail"), Some(Value::String(s)) if s == "ok"));
    assert!(decoded.warnings.contains(&Warning::FieldTypeMismatch {
        class: "app.Order".into(),
        field: "color".into(),
        expected: "app.Color".into(),
    }));
    assert!(decoded.warnings.contains(&Warning::FieldTypeMismatch {
        class: "app.Order".into(),
        field: "price".into(),
        expected: "decimal".into(),
    }));
    Ok(())
}

// --- TYPED VALUES ---

#[test]
fn nested_arrays_and_enums_round_trip() -> Result<()> {
    let int_array = builtin::primitive_array(PrimitiveKind::Int).expect("int arrays exist");
    let grid_ty = TypeDescriptor::array_of(&int_array);
    let color = TypeDescriptor::enumeration("app.Color", ["RED", "GREEN"]);
    let factory = SerializerFactory::builder()
        .type_space(TypeSpace::new("app").with_type(color.clone()))
        .build();
    let options = Hessian::builder().factory(&factory);

    let grid = Value::list(
        grid_ty,
        vec![
            Value::list(int_array.clone(), vec![Value::Int(1), Value::Int(2)]),
            Value::list(int_array, vec![Value::Int(3)]),
        ],
    );
    let green = Value::enumeration(color, "GREEN");
    let root = Value::generic_list(vec![grid, green.clone(), green]);

    let decoded = options.decode(&options.serialize(&root)?)?;
    assert!(decoded.warnings.is_empty());
    let items = object(&decoded.value).read().items().map(<[Value]>::to_vec);
    let items = items.expect("a list");

    let grid = object(&items[0]);
    assert_eq!(grid.type_descriptor().name(), "[[int");
    let rows = grid.read().items().map(<[Value]>::to_vec).expect("rows");
    assert_eq!(object(&rows[0]).read().items().map(<[Value]>::len), Some(2));

    assert!(matches!(object(&items[1]).read().body(), ObjectBody::Enum(c) if c == "GREEN"));
    assert!(items[1].same_as(&items[2]));
    Ok(())
}

#[test]
fn platform_values_round_trip() -> Result<()> {
    let factory = SerializerFactory::new();
    let options = Hessian::builder().factory(&factory);
    let root = Value::generic_list(vec![
        Value::decimal("12.50"),
        Value::guid("6f9619ff-8b86-d011-b42d-00cf4fc964ff"),
        Value::dbnull(),
    ]);
    let decoded = options.decode(&options.serialize(&root)?)?;
    assert!(decoded.warnings.is_empty());
    let items = object(&decoded.value)
        .read()
        .items()
        .map(<[Value]>::to_vec)
        .expect("a list");
    assert!(object(&items[0]).type_descriptor().ptr_eq(&builtin::decimal()));
    assert!(matches!(object(&items[0]).field("value"), Some(Value::String(s)) if s == "12.50"));
    assert!(object(&items[2]).type_descriptor().ptr_eq(&builtin::dbnull()));
    Ok(())
}

// --- MALFORMED STREAMS ---

#[test]
fn back_reference_past_the_table_is_dangling() {
    let result = Hessian::deserialize(&[b'Q', 0, 0, 0, 0]);
    assert!(matches!(
        result,
        Err(HessianError::DanglingReference { index: 0, len: 0 })
    ));
}

#[test]
fn conflicting_class_redefinition_is_a_schema_mismatch() {
    let mut bytes = Vec::new();
    for field in [b'x', b'y'] {
        bytes.extend_from_slice(&[b'C', 0, 1, b'A', 0, 0, 0, 1, b'S', 0, 0, 0, 1, field]);
    }
    bytes.push(b'N');
    let result = Hessian::deserialize(&bytes);
    assert!(matches!(result, Err(HessianError::SchemaMismatch { class, .. }) if class == "A"));
}

#[test]
fn unknown_enum_constant_is_a_protocol_error() -> Result<()> {
    let color = TypeDescriptor::enumeration("app.Color", ["RED"]);
    let wider = TypeDescriptor::enumeration("app.Color", ["RED", "BLUE"]);
    let bytes = Hessian::builder()
        .factory(&SerializerFactory::new())
        .serialize(&Value::enumeration(wider, "BLUE"))?;

    let factory = SerializerFactory::builder()
        .type_space(TypeSpace::new("app").with_type(color))
        .build();
    let result = Hessian::builder().factory(&factory).deserialize(&bytes);
    assert!(matches!(result, Err(HessianError::Protocol(msg)) if msg.contains("BLUE")));
    Ok(())
}

/// A single-field class `A` followed by `levels` instances, each nested in the last.
fn nested_instances(levels: usize) -> Vec<u8> {
    let mut bytes = vec![b'C', 0, 1, b'A', 0, 0, 0, 1, b'S', 0, 0, 0, 1, b'n'];
    for _ in 0..levels {
        bytes.extend_from_slice(&[b'O', 0, 0, 0, 0]);
    }
    bytes.push(b'N');
    bytes
}

#[test]
fn nesting_past_the_limit_fails_without_overflowing_the_stack() {
    // A spawned thread gets the default stack, like a rayon worker.
    let deep = thread::spawn(|| Hessian::deserialize(&nested_instances(MAX_DEPTH + 1)))
        .join()
        .expect("decoder thread overflowed");
    assert!(matches!(deep, Err(HessianError::Protocol(msg)) if msg.contains("nesting")));

    let limit = thread::spawn(|| Hessian::deserialize(&nested_instances(MAX_DEPTH)))
        .join()
        .expect("decoder thread overflowed");
    assert!(limit.is_ok());
}

#[test]
fn typed_nesting_past_the_limit_fails_on_a_worker_thread() {
    let bytes = {
        let mut bytes = vec![b'C', 0, 8];
        bytes.extend_from_slice(b"app.Node");
        bytes.extend_from_slice(&[0, 0, 0, 2, b'S', 0, 0, 0, 4]);
        bytes.extend_from_slice(b"name");
        bytes.extend_from_slice(&[b'S', 0, 0, 0, 4]);
        bytes.extend_from_slice(b"next");
        for _ in 0..=MAX_DEPTH {
            bytes.extend_from_slice(&[b'O', 0, 0, 0, 0, b'N']);
        }
        bytes.push(b'N');
        bytes
    };
    let result = thread::spawn(move || {
        let (base, node) = node_types();
        let factory = SerializerFactory::builder()
            .type_space(TypeSpace::new("app").with_type(base).with_type(node))
            .build();
        Hessian::builder().factory(&factory).deserialize(&bytes)
    })
    .join()
    .expect("decoder thread overflowed");
    assert!(matches!(result, Err(HessianError::Protocol(_))));
}

// --- OUTPUT PROTOCOL ---

/// Records calls and reports every class as already written.
#[derive(Default)]
struct AlreadyWrittenOutput {
    calls: Vec<String>,
}

impl ObjectOutput for AlreadyWrittenOutput {
    fn write_value(&mut self, _value: &Value) -> Result<()> {
        self.calls.push("value".into());
        Ok(())
    }
    fn write_null(&mut self) -> Result<()> {
        self.calls.push("null".into());
        Ok(())
    }
    fn write_bool(&mut self, _value: bool) -> Result<()> {
        self.calls.push("bool".into());
        Ok(())
    }
    fn write_int(&mut self, _value: i32) -> Result<()> {
        self.calls.push("int".into());
        Ok(())
    }
    fn write_long(&mut self, _value: i64) -> Result<()> {
        self.calls.push("long".into());
        Ok(())
    }
    fn write_double(&mut self, _value: f64) -> Result<()> {
        self.calls.push("double".into());
        Ok(())
    }
    fn write_string(&mut self, _value: &str) -> Result<()> {
        self.calls.push("string".into());
        Ok(())
    }
    fn write_date(&mut self, _millis: i64) -> Result<()> {
        self.calls.push("date".into());
        Ok(())
    }
    fn write_binary(&mut self, _bytes: &[u8]) -> Result<()> {
        self.calls.push("binary".into());
        Ok(())
    }
    fn write_map_begin(&mut self, _type_name: Option<&str>) -> Result<()> {
        self.calls.push("map".into());
        Ok(())
    }
    fn write_map_end(&mut self) -> Result<()> {
        self.calls.push("map end".into());
        Ok(())
    }
    fn write_list_begin(&mut self, _len: Option<usize>, _type_name: &str) -> Result<()> {
        self.calls.push("list".into());
        Ok(())
    }
    fn write_list_end(&mut self) -> Result<()> {
        self.calls.push("list end".into());
        Ok(())
    }
    fn write_object_begin(&mut self, class_name: &str) -> Result<ClassState> {
        self.calls.push(format!("begin {class_name}"));
        Ok(ClassState::AlreadyWritten)
    }
    fn write_class_field_count(&mut self, _count: usize) -> Result<()> {
        self.calls.push("count".into());
        Ok(())
    }
    fn add_ref(&mut self, _obj: &ObjectRef) -> Result<bool> {
        self.calls.push("ref".into());
        Ok(false)
    }
    fn warn(&mut self, _warning: Warning) {}
}

#[test]
fn already_written_suppresses_the_body() -> Result<()> {
    let point_ty = point_type();
    let factory = SerializerFactory::new();
    let mut out = AlreadyWrittenOutput::default();
    factory
        .get_serializer(&point_ty)
        .write_object(&point(&point_ty, 1, 2), &mut out)?;
    assert_eq!(out.calls, vec!["ref", "begin app.Point"]);
    Ok(())
}
