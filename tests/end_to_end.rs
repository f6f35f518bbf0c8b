//! End-to-end rendering through the invocation pipeline

use hostplate::template::AssignError;
use hostplate::{
    invoke, invoke_definition, render, BindError, BindOutcome, CollectingSink, DynamicObject,
    DynamicType, HostError, InvokeConfig, Locale, RenderError, TemplateGroup, Value,
};
use pretty_assertions::assert_eq;

fn group(source: &str) -> TemplateGroup {
    let sink = CollectingSink::new();
    let group = TemplateGroup::from_group_source("test", source, &sink);
    assert!(sink.is_empty(), "group should compile: {:?}", sink.diagnostics());
    group
}

#[test]
fn test_hello_world_from_map() {
    let params: Value = [("name", "World")].into_iter().collect();
    assert_eq!(
        render("Hello, <name>!", Some(params)).expect("Should render"),
        "Hello, World!"
    );
}

#[test]
fn test_falsy_accessor_is_never_bound() {
    let counter = Value::object(
        DynamicObject::new("Counter").with_accessor("GetCount", || Ok(Value::Int(0))),
    );
    let invocation =
        invoke_definition("[<count>]<if(count)> has items<endif>", Some(counter.clone()), &InvokeConfig::default())
            .expect("Should render");

    // `count` is declared but the object only offers `GetCount`, so nothing binds
    assert_eq!(invocation.output.as_deref(), Some("[]"));
    assert!(invocation.diagnostics.is_empty());

    let invocation = invoke_definition("[<Count>]", Some(counter), &InvokeConfig::default())
        .expect("Should render");
    assert_eq!(invocation.output.as_deref(), Some("[]"));
    assert_eq!(invocation.attributes.len(), 1);
    assert_eq!(invocation.attributes[0].outcome, BindOutcome::Absent);
    assert!(invocation.diagnostics.is_empty());
}

#[test]
fn test_undeclared_property_is_skipped() {
    let item = Value::object(
        DynamicObject::new("Item")
            .with_property("title", "Widget")
            .with_property("extra", "ignored"),
    );
    let invocation = invoke_definition("<title>", Some(item), &InvokeConfig::default())
        .expect("Should render");

    assert_eq!(invocation.output.as_deref(), Some("Widget"));
    let extra = invocation
        .attributes
        .iter()
        .find(|a| a.name == "extra")
        .expect("extra should have been considered");
    assert_eq!(extra.outcome, BindOutcome::NotDeclared);
}

#[test]
fn test_unterminated_expression_diagnostic() {
    let invocation =
        invoke_definition("Hello, <name", None, &InvokeConfig::default()).expect("Should invoke");
    assert_eq!(invocation.output, None);

    let diagnostic = &invocation.diagnostics[0];
    assert_eq!(diagnostic.line, 1);
    assert_eq!(diagnostic.column, 8);
    assert_eq!(diagnostic.source_line, "Hello, <name");
    insta::assert_snapshot!(
        diagnostic.to_string(),
        @"default 1:8: premature EOF: expression is missing '>'"
    );

    match render("Hello, <name", None) {
        Err(RenderError::Compile(diagnostics)) => assert_eq!(diagnostics.len(), 1),
        other => panic!("Expected compile error, got {:?}", other),
    }
}

#[test]
fn test_type_statics_take_precedence_end_to_end() {
    let ty = Value::object(
        DynamicType::new("Palette")
            .with_static("Primary", "#336699")
            .with_property("Primary", "instance value"),
    );
    let output = render("<Name>: <Primary>", Some(ty)).expect("Should render");
    assert_eq!(output, "Palette: #336699");
}

#[test]
fn test_throwing_accessor_does_not_abort() {
    let report = Value::object(
        DynamicObject::new("Report")
            .with_property("Title", "Q3")
            .with_accessor("GetSummary", || Err(HostError::new("database offline"))),
    );
    let output = render("<Title><if(Summary)>: <Summary><endif>", Some(report))
        .expect("Should render");
    assert_eq!(output, "Q3");
}

#[test]
fn test_nested_accessors_resolve_during_render() {
    let customer = Value::object(
        DynamicObject::new("Customer")
            .with_property("Name", "Ada")
            .with_accessor("GetTier", || Ok(Value::from("gold"))),
    );
    let order = Value::object(
        DynamicObject::new("Order")
            .with_property("Customer", customer)
            .with_property(
                "Lines",
                Value::List(vec![Value::from("bolts"), Value::from("nuts")]),
            ),
    );

    let output = render(
        "<Customer.Name> (<Customer.Tier>): <Lines; separator=\", \">",
        Some(order),
    )
    .expect("Should render");
    assert_eq!(output, "Ada (gold): bolts, nuts");
}

#[test]
fn test_group_invocation_with_sub_templates() {
    let group = group(
        r#"
        // Report templates
        report(title, rows) ::= <<
<title>
<rows:row(); separator="\n">
>>

        row(r) ::= "<i>. <r>"
        "#,
    );

    let params: Value = [
        ("title", Value::from("Fruit")),
        (
            "rows",
            Value::List(vec![Value::from("apple"), Value::Null, Value::from("pear")]),
        ),
    ]
    .into_iter()
    .collect();

    let invocation = invoke(&group, Some("report"), Some(params), &InvokeConfig::default())
        .expect("Should render");
    insta::assert_snapshot!(invocation.output.unwrap_or_default(), @r"
    Fruit
    1. apple
    2. pear
    ");
}

#[test]
fn test_fresh_instance_per_invocation() {
    let group = group(r#"greet(name) ::= "Hi <name>""#);
    let config = InvokeConfig::default();

    let first: Value = [("name", "Ada")].into_iter().collect();
    let out = invoke(&group, None, Some(first), &config).expect("Should render");
    assert_eq!(out.output.as_deref(), Some("Hi Ada"));

    let out = invoke(&group, None, None, &config).expect("Should render");
    assert_eq!(out.output.as_deref(), Some("Hi "));
}

#[test]
fn test_locale_controls_float_rendering() {
    let params: Value = [("ratio", 2.5)].into_iter().collect();
    let config = InvokeConfig::default().with_locale(Locale::new("fr-FR"));
    let out = invoke_definition("<ratio>", Some(params.clone()), &config).expect("Should render");
    assert_eq!(out.output.as_deref(), Some("2,5"));

    let out = invoke_definition("<ratio>", Some(params), &InvokeConfig::default())
        .expect("Should render");
    assert_eq!(out.output.as_deref(), Some("2.5"));
}

#[test]
fn test_config_file_parameters() {
    let config = InvokeConfig::from_toml(
        r#"
        locale = "de-DE"

        [parameters]
        name = "Config"
        items = [1, 2, 3]
        "#,
    )
    .expect("Should parse config");

    let out = invoke_definition("<name>: <items; separator=\"+\">", None, &config)
        .expect("Should render");
    assert_eq!(out.output.as_deref(), Some("Config: 1+2+3"));
}

#[test]
fn test_binding_failure_ends_invocation() {
    let group = group(r#"greet(name) ::= "Hi <name>""#);
    let params: Value = [("name", "Ada"), ("it", "implicit")].into_iter().collect();

    match invoke(&group, None, Some(params), &InvokeConfig::default()) {
        Err(RenderError::Binding(BindError::Assignment {
            attribute,
            template,
            source,
        })) => {
            assert_eq!(attribute, "it");
            assert_eq!(template, "greet");
            assert!(matches!(source, AssignError::ImplicitAttribute { .. }));
        }
        other => panic!("Expected binding failure, got {:?}", other),
    }

    // The group is untouched and the next invocation renders normally
    let params: Value = [("name", "Ada")].into_iter().collect();
    let out = invoke(&group, None, Some(params), &InvokeConfig::default()).expect("Should render");
    assert_eq!(out.output.as_deref(), Some("Hi Ada"));
}


#[test]
fn test_config_dates_render_through_format_option() {
    let config = InvokeConfig::from_toml(
        r#"
        locale = "en-GB"

        [parameters]
        due = 2024-07-01T09:00:00Z
        "#,
    )
    .expect("Should parse config");

    let out = invoke_definition(
        r#"Due <due; format="date:medium"> at <due; format="time:short">"#,
        None,
        &config,
    )
    .expect("Should render");
    assert_eq!(out.output.as_deref(), Some("Due 1 Jul 2024 at 09:00"));
    assert!(out.diagnostics.is_empty());
}
