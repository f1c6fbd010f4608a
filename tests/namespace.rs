mod common;

use std::sync::Arc;

use common::Button;
use sprig::{CallStack, LhsTarget, Primitive, Value};

#[test]
fn call_stack_tracks_frames() {
    let (interpreter, _) = common::interpreter();
    let global = interpreter.global().clone();
    let child = global.child("frame").expect("child namespace");

    let mut stack = CallStack::new(global.id());
    assert_eq!(stack.depth(), 1);
    stack.push(child.id());
    assert_eq!(stack.top(), Some(child.id()));
    assert_eq!(stack.frames(), &[global.id(), child.id()]);
    assert_eq!(stack.pop(), Some(child.id()));
    stack.clear();
    assert_eq!(stack.depth(), 0);
    assert_eq!(stack.top(), None);
    stack.reset(global.id());
    assert_eq!(stack.frames(), &[global.id()]);
}

#[test]
fn child_bindings_shadow_parent_bindings() {
    let (interpreter, _) = common::interpreter();
    let global = interpreter.global();
    let child = global.child("inner").expect("child namespace");
    global.set_variable("x", 1).expect("bind global x");
    child.set_variable("x", 2).expect("bind child x");
    global.set_variable("y", "only global").expect("bind y");

    let x = child.resolve_variable("x").expect("lookup").expect("x bound");
    assert_eq!(x.as_primitive(), Some(Primitive::Int(2)));
    let x = global.resolve_variable("x").expect("lookup").expect("x bound");
    assert_eq!(x.as_primitive(), Some(Primitive::Int(1)));
    let y = child.resolve_variable("y").expect("lookup").expect("y inherited");
    assert_eq!(y.as_str(), Some("only global"));
    assert_eq!(child.resolve_variable("z").expect("lookup"), None);

    let parent = child.parent().expect("parent lookup").expect("child has a parent");
    assert_eq!(parent.id(), global.id());
    assert_eq!(child.name().expect("name"), "inner");
    assert!(global.parent().expect("parent lookup").is_none());
}

#[test]
fn ambient_system_object_is_visible_everywhere() {
    let (mut interpreter, _) = common::interpreter();
    let system = interpreter
        .global()
        .resolve_variable("system")
        .expect("lookup")
        .expect("system is ambient");
    assert!(system.as_object().is_some());
    let version = interpreter.eval("return system.version;").expect("version");
    assert_eq!(version.as_str(), Some(env!("CARGO_PKG_VERSION")));
}

#[test]
fn class_imports_resolve_simple_names() {
    let (interpreter, _) = common::interpreter();
    let ns = interpreter.global().child("importer").expect("child namespace");
    assert!(ns.resolve_variable("Button").expect("lookup").is_none());
    ns.import_class("ui.Button").expect("import Button");
    let class = ns.resolve_variable("Button").expect("lookup").expect("class bound");
    assert_eq!(class.to_string(), "class ui.Button");
    assert!(ns.import_class("no.Such").is_err());

    ns.import_package("ui").expect("import package");
    assert!(ns.resolve_variable("Greeter").expect("lookup").is_some());
}

#[test]
fn name_resolver_targets_the_defining_frame() {
    let (mut interpreter, _) = common::interpreter();
    interpreter.eval("total = 1;").expect("define total");
    let child = interpreter.global().child("worker").expect("child namespace");

    let lhs = child.get_name_resolver("total").expect("resolve total");
    assert!(lhs.is_variable());
    match lhs.target() {
        LhsTarget::Variable { scope, .. } => assert_eq!(*scope, interpreter.global().id()),
        other => panic!("expected variable target, found {other:?}"),
    }
    lhs.assign(Value::from(5)).expect("assign through resolver");
    assert_eq!(lhs.read().expect("read back").as_i64(), Some(5));

    let fresh = child.get_name_resolver("fresh").expect("resolve fresh");
    match fresh.target() {
        LhsTarget::Variable { scope, .. } => assert_eq!(*scope, child.id()),
        other => panic!("expected variable target, found {other:?}"),
    }
}

#[test]
fn bound_object_fields_become_assignment_targets() {
    let (interpreter, _) = common::interpreter();
    let ns = interpreter.global().child("bound").expect("child namespace");
    let button = Arc::new(Button::new("before"));
    ns.import_object(button.clone()).expect("bind button");

    let label = ns.resolve_variable("label").expect("lookup").expect("field visible");
    assert_eq!(label.as_str(), Some("before"));
    let lhs = ns.get_name_resolver("label").expect("resolve label");
    assert!(matches!(lhs.target(), LhsTarget::Field { .. }));
    lhs.assign(Value::string("after")).expect("write field");
    assert_eq!(*button.label.lock(), "after");
}

#[test]
fn resolve_method_applies_overload_selection() {
    let (mut interpreter, _) = common::interpreter();
    interpreter
        .eval(r#"f(int a) { return 1; } f(String s) { return 2; }"#)
        .expect("define overloads");
    let global = interpreter.global();

    let by_int = global
        .resolve_method("f", &[Value::from(3)])
        .expect("lookup")
        .expect("int overload");
    assert_eq!(by_int.signature(), "f(int a)");
    let by_text = global
        .resolve_method("f", &[Value::string("x")])
        .expect("lookup")
        .expect("String overload");
    assert_eq!(by_text.signature(), "f(String s)");
    assert!(global
        .resolve_method("f", &[Value::from(true)])
        .expect("lookup")
        .is_none());
    assert_eq!(global.method_names().expect("names"), vec!["f".to_string()]);
}

#[test]
fn variables_and_methods_can_be_removed() {
    let (mut interpreter, _) = common::interpreter();
    interpreter.eval("a = 1; b = 2; helper() { return a; }").expect("define");
    let global = interpreter.global();

    let names = global.variable_names().expect("names");
    assert!(names.contains(&"a".to_string()));
    assert!(names.contains(&"b".to_string()));

    assert!(global.unset_variable("a").expect("unset a"));
    assert!(!global.unset_variable("a").expect("unset a again"));
    assert!(interpreter.eval("return helper();").is_err());

    assert!(interpreter.global().remove_method("helper").expect("remove helper"));
    assert!(interpreter.eval("helper();").is_err());
    interpreter.eval(r#"unset("b");"#).expect("unset command");
    assert!(interpreter.global().resolve_variable("b").expect("lookup").is_none());
}

#[test]
fn block_scopes_are_reclaimed() {
    let (mut interpreter, _) = common::interpreter();
    let before = interpreter.runtime().live_scopes();
    interpreter
        .eval(
            r#"
            sum = 0;
            for (int i = 0; i < 10; i++) { int square = i * i; sum += square; }
            for (int x : new int[3]) { sum++; }
            "#,
        )
        .expect("loops run");
    assert_eq!(interpreter.runtime().live_scopes(), before);
}

#[test]
fn retained_method_frames_outlive_their_call() {
    let (mut interpreter, _) = common::interpreter();
    let before = interpreter.runtime().live_scopes();
    interpreter
        .eval("make() { kept = 1; return this; } o = make();")
        .expect("object survives");
    assert!(interpreter.runtime().live_scopes() > before);
    let kept = interpreter.eval("return o.kept;").expect("frame still readable");
    assert_eq!(kept.as_i64(), Some(1));
}

#[test]
fn unreachable_object_frames_are_freed() {
    let (mut interpreter, _) = common::interpreter();
    let before = interpreter.runtime().live_scopes();
    interpreter
        .eval("make() { kept = 1; return this; } for (int i = 0; i < 50; i++) { o = make(); }")
        .expect("objects created");
    assert_eq!(interpreter.runtime().live_scopes(), before + 1);

    interpreter.eval("o = null;").expect("drop last object");
    assert_eq!(interpreter.runtime().live_scopes(), before);
}

#[test]
fn declaring_a_method_does_not_pin_its_frame() {
    let (mut interpreter, _) = common::interpreter();
    let before = interpreter.runtime().live_scopes();
    let value = interpreter
        .eval(
            r#"
            outer(n) { inner() { return n * 2; } return inner(); }
            total = 0;
            for (int i = 0; i < 20; i++) { total += outer(i); }
            return total;
            "#,
        )
        .expect("nested methods run");
    assert_eq!(value.as_i64(), Some(380));
    assert_eq!(interpreter.runtime().live_scopes(), before);
}

#[test]
fn adapters_keep_their_frame_until_dropped() {
    let (mut interpreter, _) = common::interpreter();
    let before = interpreter.runtime().live_scopes();
    let object = interpreter
        .eval("make() { run() { ran = true; } return this; } return make();")
        .expect("object created");
    let scope = object.as_object().expect("scripted object").scope;
    let adapter = interpreter
        .runtime()
        .namespace(scope)
        .as_interface(&["ui.Runnable"])
        .expect("frame implements Runnable");
    drop(object);
    assert_eq!(interpreter.runtime().live_scopes(), before + 1);

    adapter.invoke("run", &[]).expect("frame still callable");
    drop(adapter);
    assert_eq!(interpreter.runtime().live_scopes(), before);
}
