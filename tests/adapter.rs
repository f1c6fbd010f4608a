mod common;

use std::{sync::Arc, thread};

use sprig::{HostObject, InterfaceAdapter, InterpreterConfig, SprigError, Value};

fn expect_str(value: Option<Value>) -> String {
    let value = value.expect("adapter returned a value");
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected String, found {}", value.type_name()))
        .to_string()
}

#[test]
fn named_method_then_generic_invoke_then_identity() {
    let (mut interpreter, _) = common::interpreter();
    let listener = interpreter.global().child("listener").expect("child namespace");
    interpreter
        .eval_in(
            r#"
            onClick(e) { return "named " + e; }
            invoke(name, args) { return "generic " + name + "/" + args.length; }
            "#,
            &listener,
        )
        .expect("define listener methods");
    let adapter = listener
        .as_interface(&["ui.ClickListener"])
        .expect("namespace implements ClickListener");

    let named = adapter.invoke("onClick", &[Value::string("e")]).expect("onClick");
    assert_eq!(expect_str(named), "named e");

    assert!(listener.remove_method("onClick").expect("remove onClick"));
    let generic = adapter.invoke("onClick", &[Value::string("e")]).expect("fallback");
    assert_eq!(expect_str(generic), "generic onClick/1");

    assert!(listener.remove_method("invoke").expect("remove invoke"));
    let text = adapter.invoke("toString", &[]).expect("toString");
    assert_eq!(
        expect_str(text),
        "'this' reference to NameSpace: listener implementing ui.ClickListener"
    );
    let hash = adapter.invoke("hashCode", &[]).expect("hashCode");
    assert!(hash.and_then(|h| h.as_i64()).is_some());

    let myself = Value::host(adapter.clone());
    let same = adapter.invoke("equals", &[myself]).expect("equals");
    assert_eq!(same.and_then(|v| v.as_bool()), Some(true));
    let other = adapter
        .invoke("equals", &[Value::string("other")])
        .expect("equals");
    assert_eq!(other.and_then(|v| v.as_bool()), Some(false));

    let err = adapter
        .invoke("onClick", &[Value::string("e")])
        .expect_err("nothing implements onClick");
    match err {
        SprigError::Eval(err) => {
            assert!(err.message.contains("onClick"));
            assert!(err.message.contains("listener"));
        }
        other => panic!("expected evaluation error, found {other:?}"),
    }
}

#[test]
fn methods_defined_after_creation_are_picked_up() {
    let (mut interpreter, _) = common::interpreter();
    let adapter = interpreter
        .get_interface(&["ui.Runnable"])
        .expect("global implements Runnable");
    assert!(adapter.invoke("run", &[]).is_err());

    interpreter
        .eval(r#"ran = 0; run() { ran++; }"#)
        .expect("define run");
    assert_eq!(adapter.invoke("run", &[]).expect("run"), None);
    let ran = interpreter.get("ran").expect("get ran").expect("ran bound");
    assert_eq!(ran.as_i64(), Some(1));
}

#[test]
fn one_adapter_serves_several_interfaces() {
    let (mut interpreter, _) = common::interpreter();
    interpreter
        .eval(r#"run() { return "running"; } name() { return "task"; } onClick(e) { return e; }"#)
        .expect("define methods");
    let adapter = interpreter
        .get_interface(&["ui.Task", "ui.ClickListener"])
        .expect("multi-interface adapter");

    assert_eq!(
        adapter.interface_names(),
        vec!["ui.Task".to_string(), "ui.ClickListener".to_string()]
    );
    assert!(adapter.instance_of("ui.Task"));
    assert!(adapter.instance_of("ui.Runnable"));
    assert!(adapter.instance_of("ui.ClickListener"));
    assert!(!adapter.instance_of("ui.ActionListener"));

    assert_eq!(expect_str(adapter.invoke("run", &[]).expect("run")), "running");
    assert_eq!(expect_str(adapter.invoke("name", &[]).expect("name")), "task");
}

#[test]
fn only_interfaces_can_be_implemented() {
    let (interpreter, _) = common::interpreter();
    let err = interpreter
        .get_interface(&["ui.Button"])
        .expect_err("Button is a class");
    assert!(err.to_string().contains("not an interface"));

    let err = interpreter
        .get_interface(&["ui.Nope"])
        .expect_err("unknown interface");
    assert!(err.to_string().contains("ui.Nope"));
}

#[test]
fn adapters_can_be_called_from_other_threads() {
    let (mut interpreter, _) = common::interpreter();
    interpreter
        .eval("count = 0; run() { count++; }")
        .expect("define run");
    let adapter: Arc<InterfaceAdapter> = interpreter
        .get_interface(&["ui.Runnable"])
        .expect("global implements Runnable");

    for _ in 0..4 {
        let adapter = Arc::clone(&adapter);
        thread::spawn(move || adapter.invoke("run", &[]).map(|_| ()))
            .join()
            .expect("worker thread finished")
            .expect("run succeeded");
    }

    let count = interpreter.get("count").expect("get count").expect("count bound");
    assert_eq!(count.as_i64(), Some(4));
}

#[test]
fn script_objects_adapt_when_passed_to_interface_parameters() {
    let (mut interpreter, _) = common::interpreter();
    let value = interpreter
        .eval(
            r#"
            import ui.*;
            clicked = 0;
            actionPerformed(e) { clicked++; }
            b = new Button("go");
            b.addActionListener(this);
            b.click();
            b.click();
            return clicked;
            "#,
        )
        .expect("listener round trip");
    assert_eq!(value.as_i64(), Some(2));
}

#[test]
fn casting_to_an_interface_wraps_the_namespace() {
    let (mut interpreter, _) = common::interpreter();
    let value = interpreter
        .eval(
            r#"
            import ui.*;
            ran = false;
            run() { ran = true; }
            r = (Runnable) this;
            r.run();
            return ran;
            "#,
        )
        .expect("cast and call");
    assert_eq!(value.as_bool(), Some(true));

    let described = interpreter.eval("return r.toString();").expect("toString");
    assert_eq!(
        described.as_str(),
        Some("'this' reference to NameSpace: global implementing ui.Runnable")
    );
}

#[test]
fn script_calls_on_adapters_use_adapter_identity() {
    let (mut interpreter, _) = common::interpreter();
    let value = interpreter
        .eval(
            r#"
            import ui.*;
            l = (ClickListener) this;
            m = (ClickListener) this;
            return l.equals(l) + " " + l.equals(m) + " " + l.equals(this);
            "#,
        )
        .expect("identity calls");
    assert_eq!(value.as_str(), Some("true false false"));

    let from_script = interpreter.eval("return l.hashCode();").expect("script hashCode");
    let adapter = interpreter.get("l").expect("get l").expect("l bound");
    let adapter = adapter
        .downcast_host::<InterfaceAdapter>()
        .expect("l holds an adapter");
    let from_host = adapter.invoke("hashCode", &[]).expect("host hashCode");
    assert_eq!(from_script.as_i64(), from_host.and_then(|h| h.as_i64()));
}

#[test]
fn scripted_equals_still_overrides_adapter_identity() {
    let (mut interpreter, _) = common::interpreter();
    let value = interpreter
        .eval(
            r#"
            import ui.*;
            equals(other) { return true; }
            l = (ClickListener) this;
            return l.equals("anything");
            "#,
        )
        .expect("scripted equals");
    assert_eq!(value.as_bool(), Some(true));
}

#[test]
fn recursion_through_host_callbacks_hits_the_depth_limit() {
    let (mut interpreter, _) =
        common::with_config(InterpreterConfig::default().max_call_depth(20));
    let err = interpreter
        .eval(
            r#"
            import ui.*;
            b = new Button("loop");
            actionPerformed(e) { b.click(); }
            b.addActionListener(this);
            b.click();
            "#,
        )
        .expect_err("listener re-enters itself without bound");
    assert_eq!(err.classify(), "Target error");
    assert!(err.to_string().contains("maximum call depth 20"));

    let value = interpreter
        .eval("f(n) { if (n == 0) return 0; return f(n - 1); } return f(15);")
        .expect("depth budget is returned after the failure");
    assert_eq!(value.as_i64(), Some(0));
}

#[test]
fn host_failures_inside_adapted_calls_keep_their_cause() {
    let (mut interpreter, _) = common::interpreter();
    interpreter
        .eval(r#"run() { Integer.parseInt("nope"); }"#)
        .expect("define run");
    let adapter = interpreter
        .get_interface(&["ui.Runnable"])
        .expect("global implements Runnable");
    match adapter.invoke("run", &[]) {
        Err(SprigError::Target(err)) => {
            assert!(err
                .cause()
                .downcast_ref::<std::num::ParseIntError>()
                .is_some());
        }
        other => panic!("expected target error, found {other:?}"),
    }
}
