//! Attribute resolution against host objects

use indexmap::IndexMap;

use hostplate::resolver::{attempt_accessor, lookup_static, AccessorAttempt, StaticLookup};
use hostplate::value::TypeDescriptor;
use hostplate::{
    bind, normalize, resolve_instance, resolve_static, ArgumentSource, AssignError, BindError,
    BindOutcome, DynamicObject, DynamicType, HostError, Resolution, TemplateGroup, Value,
};
use pretty_assertions::assert_eq;

#[test]
fn test_normalize_falsy_values_are_absent() {
    let falsy = [
        Value::Null,
        Value::Bool(false),
        Value::Int(0),
        Value::Float(0.0),
        Value::from(""),
        Value::List(Vec::new()),
        Value::Map(IndexMap::new()),
        Value::object(DynamicObject::new("Empty").falsy()),
    ];
    for value in falsy {
        assert_eq!(normalize(value.clone()), None, "{:?} should be absent", value);
    }
}

#[test]
fn test_normalize_is_identity_for_truthy_values() {
    let object = Value::object(DynamicObject::new("Thing"));
    let normalized = normalize(object.clone()).expect("objects are truthy");
    assert!(normalized.same_as(&object));

    let list = Value::List(vec![Value::Null]);
    assert_eq!(normalize(list.clone()), Some(list));
    assert_eq!(normalize(Value::from("0")), Some(Value::from("0")));
}

#[test]
fn test_ambiguous_static_is_not_found() {
    let ty = DynamicType::new("Overloaded")
        .with_static("Parse", "first")
        .with_static("Parse", "second")
        .with_static("Unique", "only");

    let descriptor: &dyn TypeDescriptor = &ty;

    assert_eq!(lookup_static(descriptor, "Parse"), StaticLookup::Ambiguous(2));
    assert_eq!(resolve_static(Some(descriptor), "Parse"), Resolution::NotFound);
    assert_eq!(
        resolve_static(Some(descriptor), "Unique"),
        Resolution::Bound(Value::from("only"))
    );
    assert_eq!(resolve_static(None, "Unique"), Resolution::NotFound);
}

#[test]
fn test_accessor_fallback_equals_normalized_result() {
    let with_total = Value::object(
        DynamicObject::new("Invoice").with_accessor("GetTotal", || Ok(Value::Int(99))),
    );
    assert_eq!(
        resolve_instance(&with_total, "Total"),
        Resolution::Bound(Value::Int(99))
    );

    let with_empty = Value::object(
        DynamicObject::new("Invoice").with_accessor("GetNotes", || Ok(Value::from(""))),
    );
    assert_eq!(resolve_instance(&with_empty, "Notes"), Resolution::Absent);
}

#[test]
fn test_property_shadows_accessor() {
    let both = Value::object(
        DynamicObject::new("Invoice")
            .with_property("Total", "from property")
            .with_accessor("GetTotal", || Ok(Value::from("from accessor"))),
    );
    assert_eq!(
        resolve_instance(&both, "Total"),
        Resolution::Bound(Value::from("from property"))
    );
}

#[test]
fn test_throwing_accessor_is_not_found() {
    let object = Value::object(
        DynamicObject::new("Flaky").with_accessor("GetState", || Err(HostError::new("boom"))),
    );
    assert_eq!(resolve_instance(&object, "State"), Resolution::NotFound);

    let Value::Object(host) = &object else {
        unreachable!()
    };
    assert!(matches!(
        attempt_accessor(host.as_ref(), "State"),
        AccessorAttempt::Failed(_)
    ));
}

#[test]
fn test_accessor_must_be_accessor_shaped() {
    let object = Value::object(
        DynamicObject::new("Shapes")
            .with_method("GetVoid", 0, true, |_| Ok(Value::Null))
            .with_method("GetWithArg", 1, false, |args| Ok(args[0].clone())),
    );
    assert_eq!(resolve_instance(&object, "Void"), Resolution::NotFound);
    assert_eq!(resolve_instance(&object, "WithArg"), Resolution::NotFound);
}

#[test]
fn test_overloads_pick_the_accessor_shaped_one() {
    let object = Value::object(
        DynamicObject::new("Overloads")
            .with_method("GetItem", 1, false, |_| Ok(Value::from("indexed")))
            .with_accessor("GetItem", || Ok(Value::from("default"))),
    );
    assert_eq!(
        resolve_instance(&object, "Item"),
        Resolution::Bound(Value::from("default"))
    );

    let ambiguous = Value::object(
        DynamicObject::new("Overloads")
            .with_accessor("GetItem", || Ok(Value::from("a")))
            .with_accessor("GetItem", || Ok(Value::from("b"))),
    );
    assert_eq!(resolve_instance(&ambiguous, "Item"), Resolution::NotFound);
}

#[test]
fn test_type_precedence_when_binding() {
    let mut group = TemplateGroup::new("g");
    group
        .define("t", vec!["X".to_string()], "<X>")
        .expect("Should define");
    let mut instance = group.instance_of("t").expect("Should exist");

    let ty = Value::object(
        DynamicType::new("T")
            .with_static("X", "static")
            .with_property("X", "instance"),
    );
    bind(&mut instance, &ArgumentSource::Object(ty)).expect("Should bind");
    assert_eq!(instance.attribute("X"), Some(&Value::from("static")));
}

#[test]
fn test_falsy_static_wins_over_instance_property() {
    let ty = Value::object(
        DynamicType::new("T")
            .with_static("X", 0)
            .with_property("X", "instance"),
    );
    assert_eq!(resolve_instance(&ty, "X"), Resolution::Absent);

    let mut group = TemplateGroup::new("g");
    group
        .define("t", vec!["X".to_string()], "<X>")
        .expect("Should define");
    let mut instance = group.instance_of("t").expect("Should exist");
    let resolved = bind(&mut instance, &ArgumentSource::Object(ty)).expect("Should bind");

    assert_eq!(instance.attribute("X"), None);
    let x = resolved
        .iter()
        .find(|r| r.name == "X")
        .expect("X should have been considered");
    assert_eq!(x.outcome, BindOutcome::Absent);
}

#[test]
fn test_bind_raises_only_for_real_assignment_failures() {
    let mut group = TemplateGroup::new("g");
    group
        .define("t", vec!["name".to_string()], "<name>")
        .expect("Should define");

    let mut instance = group.instance_of("t").expect("Should exist");
    let undeclared = ArgumentSource::Map(vec![("other".to_string(), Value::from("x"))]);
    let resolved = bind(&mut instance, &undeclared).expect("Undeclared names are skipped");
    assert_eq!(resolved[0].outcome, BindOutcome::NotDeclared);

    let mut instance = group.instance_of("t").expect("Should exist");
    let implicit = ArgumentSource::Map(vec![("it".to_string(), Value::from("x"))]);
    match bind(&mut instance, &implicit) {
        Err(BindError::Assignment { source, .. }) => {
            assert!(matches!(source, AssignError::ImplicitAttribute { .. }))
        }
        other => panic!("Expected assignment failure, got {:?}", other),
    }
}
