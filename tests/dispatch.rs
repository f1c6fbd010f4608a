mod common;

use std::sync::Arc;

use common::{Boom, Button};
use sprig::{
    ClassLoader, HostClass, HostField, HostMethod, HostType, InterpreterConfig, ResolutionOrder,
    SprigError, Value,
};

fn expect_str(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected String, found {}", value.type_name()))
        .to_string()
}

fn eval_str(source: &str) -> String {
    let (mut interpreter, _) = common::interpreter();
    let value = interpreter.eval(source).expect("evaluation should succeed");
    expect_str(&value)
}

#[test]
fn exact_match_wins_over_widening() {
    assert_eq!(eval_str("import ui.*; return Greeter.describe(1);"), "int");
    assert_eq!(eval_str("import ui.*; return Greeter.describe(1L);"), "long");
    assert_eq!(eval_str("import ui.*; return Greeter.describe(\"s\");"), "String");
}

#[test]
fn widening_picks_the_most_specific_target() {
    assert_eq!(eval_str("import ui.*; return Greeter.describe((byte) 1);"), "int");
    assert_eq!(eval_str("import ui.*; return Greeter.describe(2.5f);"), "double");
}

#[test]
fn boxing_is_the_last_resort() {
    assert_eq!(eval_str("import ui.*; return Greeter.describe(true);"), "Object");
    assert_eq!(eval_str("import ui.*; return Greeter.describe('c');"), "int");
}

#[test]
fn ambiguous_overloads_are_reported() {
    let (mut interpreter, _) = common::interpreter();
    let err = interpreter
        .eval("import ui.*; Greeter.pick(1, 2);")
        .expect_err("neither overload is more specific");
    match err {
        SprigError::Eval(err) => {
            assert!(err.message.contains("ambiguous"));
            assert!(err.message.contains("pick(int, long)"));
            assert!(err.message.contains("pick(long, int)"));
        }
        other => panic!("expected evaluation error, found {other:?}"),
    }
}

#[test]
fn qualified_names_reach_classes_without_imports() {
    assert_eq!(eval_str("return ui.Greeter.GREETING;"), "hello");
    let (mut interpreter, _) = common::interpreter();
    let pi = interpreter.eval("return Math.PI;").expect("lang is imported by default");
    assert!(pi.as_f64().is_some_and(|pi| pi > 3.14));
    let max = interpreter
        .eval("return lang.Integer.MAX_VALUE;")
        .expect("qualified static field");
    assert_eq!(max.as_i64(), Some(i64::from(i32::MAX)));
}

#[test]
fn host_instances_expose_fields_methods_and_properties() {
    let value = eval_str(
        r#"
        import ui.Button;
        b = new Button("ok");
        b.label = "go";
        b.click();
        b.click();
        return b.label + " " + b.clicks;
        "#,
    );
    assert_eq!(value, "go 2");
}

#[test]
fn interfaces_cannot_be_instantiated() {
    let (mut interpreter, _) = common::interpreter();
    let err = interpreter
        .eval("import ui.*; new Runnable();")
        .expect_err("interfaces have no constructor");
    assert!(err.to_string().contains("cannot instantiate"));
}

#[test]
fn host_exceptions_surface_as_target_errors() {
    let (mut interpreter, _) = common::interpreter();
    let err = interpreter
        .eval(r#"import ui.*; b = new Button("x"); b.fail("bad wiring");"#)
        .expect_err("host method raises");
    assert_eq!(err.classify(), "Target error");
    match &err {
        SprigError::Target(target) => {
            let boom = target.cause().downcast_ref::<Boom>().expect("original error kept");
            assert_eq!(boom.0, "bad wiring");
            assert!(std::error::Error::source(target).is_some());
            assert!(target.cause().same_as(&target.cause().clone()));
        }
        other => panic!("expected target error, found {other:?}"),
    }
}

#[test]
fn inaccessible_methods_are_evaluation_errors() {
    let (mut interpreter, _) = common::interpreter();
    let err = interpreter
        .eval("ui.Greeter.secret();")
        .expect_err("method is not accessible");
    match err {
        SprigError::Eval(err) => assert!(err.message.contains("not accessible")),
        other => panic!("expected evaluation error, found {other:?}"),
    }
}

#[test]
fn bound_object_members_resolve_unqualified() {
    let (mut interpreter, _) = common::interpreter();
    let button = Arc::new(Button::new("bound"));
    interpreter
        .global()
        .import_object(button.clone())
        .expect("bind button");

    let label = interpreter.eval("return label;").expect("bound field");
    assert_eq!(expect_str(&label), "bound");
    interpreter.eval("click(); label = \"renamed\";").expect("bound method and field");
    assert_eq!(*button.clicks.lock(), 1);
    assert_eq!(*button.label.lock(), "renamed");
}

#[test]
fn scripted_methods_shadow_bound_object_methods() {
    let (mut interpreter, _) = common::interpreter();
    let button = Arc::new(Button::new("bound"));
    interpreter
        .global()
        .import_object(button.clone())
        .expect("bind button");

    let value = interpreter
        .eval(r#"click() { return "scripted"; } return click();"#)
        .expect("scripted click");
    assert_eq!(expect_str(&value), "scripted");
    assert_eq!(*button.clicks.lock(), 0);
}

#[test]
fn resolution_order_decides_between_bound_fields_and_outer_locals() {
    let script = "return label;";
    for (order, expected) in [
        (ResolutionOrder::LocalThenBound, "bound"),
        (ResolutionOrder::ChainThenBound, "global"),
    ] {
        let (mut interpreter, _) =
            common::with_config(InterpreterConfig::default().resolution_order(order));
        interpreter.set("label", "global").expect("set outer local");
        let child = interpreter.global().child("widget").expect("child namespace");
        child
            .import_object(Arc::new(Button::new("bound")))
            .expect("bind button");
        let value = interpreter.eval_in(script, &child).expect("resolve label");
        assert_eq!(expect_str(&value), expected, "order {order:?}");
    }
}

#[test]
fn strings_answer_host_methods() {
    assert_eq!(eval_str(r#"return "  padded ".trim().substring(1, 4);"#), "add");
    assert_eq!(eval_str(r#"return String.valueOf(12) + "!";"#), "12!");
    let (mut interpreter, _) = common::interpreter();
    let index = interpreter
        .eval(r#"return "hello".indexOf("l");"#)
        .expect("indexOf");
    assert_eq!(index.as_i64(), Some(2));
}

#[test]
fn string_builder_chains_appends() {
    assert_eq!(
        eval_str(
            r#"
            sb = new StringBuilder("a");
            sb.append(1).append('b').append(true);
            return sb.toString();
            "#
        ),
        "a1btrue"
    );
}

struct PluginLoader;

impl ClassLoader for PluginLoader {
    fn load_class(&self, name: &str) -> Option<Arc<HostClass>> {
        match name {
            "plugin.Version" => Some(Arc::new(
                HostClass::new("plugin.Version")
                    .field(HostField::constant("CURRENT", 3).make_static())
                    .method(HostMethod::new_static(
                        "bump",
                        vec![HostType::Primitive(sprig::PrimitiveKind::Int)],
                        |args| Ok(Value::from(args[0].as_i64().unwrap_or_default() as i32 + 1)),
                    )),
            )),
            _ => None,
        }
    }
}

#[test]
fn external_class_loader_supplies_classes() {
    let (mut interpreter, _) = common::interpreter();
    interpreter.set_class_loader(Arc::new(PluginLoader));
    let value = interpreter
        .eval("import plugin.Version; return Version.bump(Version.CURRENT);")
        .expect("loader classes resolve");
    assert_eq!(value.as_i64(), Some(4));

    let err = interpreter
        .eval("import plugin.Missing;")
        .expect_err("unknown class");
    assert!(err.to_string().contains("plugin.Missing"));
}
