mod common;

use std::{fs, io::Cursor, path::Path, sync::Arc};

use sprig::{
    CaptureConsole, Interpreter, InterpreterConfig, Primitive, ReaderLines, Repl, SprigError,
    Value,
};
use tempfile::tempdir;

fn eval(source: &str) -> Value {
    let mut interpreter = Interpreter::with_console(Arc::new(CaptureConsole::new()));
    interpreter.eval(source).expect("evaluation should succeed")
}

fn eval_error(source: &str) -> SprigError {
    let mut interpreter = Interpreter::with_console(Arc::new(CaptureConsole::new()));
    match interpreter.eval(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn expect_int(value: &Value) -> i64 {
    match value.as_primitive() {
        Some(Primitive::Int(n)) => i64::from(n),
        Some(Primitive::Long(n)) => n,
        _ => panic!("expected int, found {}", value.type_name()),
    }
}

fn expect_bool(value: &Value) -> bool {
    value
        .as_bool()
        .unwrap_or_else(|| panic!("expected boolean, found {}", value.type_name()))
}

fn expect_str(value: &Value) -> &str {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected String, found {}", value.type_name()))
}

fn expect_eval_message(err: &SprigError) -> &str {
    match err {
        SprigError::Eval(err) => &err.message,
        other => panic!("expected evaluation error, found {other:?}"),
    }
}

fn path_literal(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn evaluates_basic_arithmetic() {
    let value = eval("return 2 + 2;");
    assert_eq!(expect_int(&value), 4);
}

#[test]
fn assigns_and_returns_sum() {
    let value = eval("a = 2; b = 3; return a + b;");
    assert_eq!(expect_int(&value), 5);
}

#[test]
fn returns_last_statement_value_from_script() {
    let value = eval(
        r#"
        x = 40;
        x + 2
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn return_stops_remaining_statements() {
    let console = Arc::new(CaptureConsole::new());
    let mut interpreter = Interpreter::with_console(console.clone());
    let value = interpreter
        .eval(r#"return 7; print("unreachable");"#)
        .expect("evaluation should succeed");
    assert_eq!(expect_int(&value), 7);
    assert!(console.output().is_empty());
}

#[test]
fn reports_undefined_method_by_name() {
    let err = eval_error("foo();");
    assert!(expect_eval_message(&err).contains("foo"));
    assert_eq!(err.classify(), "Evaluation error");
}

#[test]
fn reports_undefined_variable() {
    let err = eval_error("return missing + 1;");
    assert!(expect_eval_message(&err).contains("missing"));
}

#[test]
fn recursive_scripted_method() {
    let value = eval(
        r#"
        int fact(int n) {
            if (n <= 1) return 1;
            return n * fact(n - 1);
        }
        return fact(5);
        "#,
    );
    assert_eq!(expect_int(&value), 120);
}

#[test]
fn methods_are_visible_before_their_declaration_in_a_block() {
    let value = eval(
        r#"
        {
            x = twice(4);
            int twice(int n) { return n * 2; }
        }
        return x;
        "#,
    );
    assert_eq!(expect_int(&value), 8);
}

#[test]
fn loops_honour_break_and_continue() {
    let value = eval(
        r#"
        int total = 0;
        for (int i = 1; i <= 10; i++) {
            if (i % 2 == 0) continue;
            if (i > 7) break;
            total += i;
        }
        return total;
        "#,
    );
    assert_eq!(expect_int(&value), 16);
}

#[test]
fn while_and_do_loops() {
    let value = eval(
        r#"
        i = 0;
        do { i++; } while (i < 5);
        while (i < 8) i++;
        return i;
        "#,
    );
    assert_eq!(expect_int(&value), 8);
}

#[test]
fn enhanced_for_walks_arrays_and_strings() {
    let sum = eval(
        r#"
        int[] xs = {1, 2, 3};
        sum = 0;
        for (int x : xs) sum += x;
        return sum;
        "#,
    );
    assert_eq!(expect_int(&sum), 6);

    let count = eval(
        r#"
        n = 0;
        for (char c : "abc") n++;
        return n;
        "#,
    );
    assert_eq!(expect_int(&count), 3);
}

#[test]
fn string_concatenation_and_methods() {
    let value = eval(
        r#"
        s = "Hello";
        return s + ", " + s.toUpperCase() + " " + s.length();
        "#,
    );
    assert_eq!(expect_str(&value), "Hello, HELLO 5");
}

#[test]
fn typed_declaration_rejects_incompatible_value() {
    let err = eval_error(r#"int x = "text";"#);
    assert!(expect_eval_message(&err).contains("cannot convert"));
}

#[test]
fn integral_constants_narrow_when_they_fit() {
    let value = eval("byte b = 10; return b;");
    assert_eq!(value.as_primitive(), Some(Primitive::Byte(10)));

    let err = eval_error("byte b = 300;");
    assert!(matches!(err, SprigError::Eval(_)));
}

#[test]
fn compound_assignment_keeps_declared_type() {
    let value = eval("int x = 5; x += 1.5; return x;");
    assert_eq!(value.as_primitive(), Some(Primitive::Int(6)));
}

#[test]
fn integer_division_by_zero_is_an_error() {
    let err = eval_error("return 1 / 0;");
    assert!(expect_eval_message(&err).contains("by zero"));
}

#[test]
fn logical_operators_short_circuit() {
    let value = eval(
        r#"
        called = false;
        mark() { called = true; return true; }
        r = false && mark();
        return called;
        "#,
    );
    assert!(!expect_bool(&value));
}

#[test]
fn arrays_index_and_report_bounds() {
    let value = eval("int[] a = new int[3]; a[1] = 5; return a[1] + a.length;");
    assert_eq!(expect_int(&value), 8);

    let err = eval_error("int[] a = new int[2]; return a[2];");
    assert!(expect_eval_message(&err).contains("out of bounds"));
}

#[test]
fn explicit_casts() {
    assert_eq!(eval("return (int) 3.9;").as_primitive(), Some(Primitive::Int(3)));
    assert_eq!(eval("return (char) 65;").as_primitive(), Some(Primitive::Char('A')));
}

#[test]
fn break_outside_loop_is_an_error() {
    let err = eval_error("break;");
    assert!(expect_eval_message(&err).contains("outside of a loop"));
}

#[test]
fn scripted_objects_keep_their_state() {
    let value = eval(
        r#"
        counter() {
            count = 0;
            increment() { count++; return count; }
            return this;
        }
        c = counter();
        c.increment();
        return c.increment();
        "#,
    );
    assert_eq!(expect_int(&value), 2);
}

#[test]
fn object_fields_are_assignable() {
    let value = eval(
        r#"
        make() { v = 3; return this; }
        o = make();
        o.v = 10;
        return o.v;
        "#,
    );
    assert_eq!(expect_int(&value), 10);
}

#[test]
fn super_reaches_the_enclosing_namespace() {
    let value = eval(
        r#"
        x = "outer";
        probe() {
            String x = "inner";
            return super.x + "/" + x;
        }
        return probe();
        "#,
    );
    assert_eq!(expect_str(&value), "outer/inner");
}

#[test]
fn objects_fall_back_to_generic_invoke() {
    let value = eval(
        r#"
        make() {
            invoke(name, args) { return name + args.length; }
            return this;
        }
        o = make();
        return o.anything(1, 2);
        "#,
    );
    assert_eq!(expect_str(&value), "anything2");
}

#[test]
fn objects_answer_identity_methods() {
    let value = eval("make() { return this; } return make().toString();");
    assert_eq!(expect_str(&value), "'this' reference to NameSpace: make");

    let same = eval("make() { return this; } o = make(); return o.equals(o);");
    assert!(expect_bool(&same));
}

#[test]
fn scripted_overloads_pick_by_argument_type() {
    let value = eval(
        r#"
        f(int x) { return "int"; }
        f(String s) { return "string"; }
        f(x) { return "loose"; }
        return f(1) + f("a") + f(2.5);
        "#,
    );
    assert_eq!(expect_str(&value), "intstringloose");
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let (mut interpreter, _) = common::with_config(InterpreterConfig::default().max_call_depth(25));
    let err = interpreter
        .eval("down(n) { return down(n + 1); } down(0);")
        .expect_err("recursion should be cut off");
    assert!(expect_eval_message(&err).contains("maximum call depth 25"));
    assert_eq!(interpreter.call_stack().depth(), 1);
}

#[test]
fn failed_call_leaves_stack_at_global() {
    let (mut interpreter, _) = common::interpreter();
    interpreter
        .eval("broken() { return nothing; } broken();")
        .expect_err("undefined symbol inside method");
    assert_eq!(interpreter.call_stack().depth(), 1);
    assert_eq!(interpreter.call_stack().top(), Some(interpreter.global().id()));
}

#[test]
fn set_get_and_unset_round_trip() {
    let (mut interpreter, _) = common::interpreter();
    interpreter.set("x", 5).expect("set x");
    interpreter.set("s", "text").expect("set s");
    interpreter.set("d", 2.5f64).expect("set d");
    interpreter.set("n", Value::null()).expect("set n");

    let x = interpreter.get("x").expect("get x").expect("x is bound");
    assert_eq!(x.as_primitive(), Some(Primitive::Int(5)));
    let s = interpreter.get("s").expect("get s").expect("s is bound");
    assert_eq!(expect_str(&s), "text");
    assert_eq!(interpreter.get("n").expect("get n"), None);
    let is_null = interpreter.eval("return n == null;").expect("n still exists");
    assert!(expect_bool(&is_null));

    let doubled = interpreter.eval("return x * 2;").expect("script sees host value");
    assert_eq!(expect_int(&doubled), 10);

    interpreter.unset("x").expect("unset x");
    let err = interpreter.get("x").expect_err("x is gone");
    assert!(expect_eval_message(&err).contains("x"));
    interpreter.unset("never_defined").expect("unsetting an unknown name is a no-op");
}

#[test]
fn set_reaches_object_fields_and_unset_rejects_them() {
    let (mut interpreter, _) = common::interpreter();
    interpreter
        .eval("make() { v = 1; return this; } o = make();")
        .expect("create object");
    interpreter.set("o.v", 9).expect("assign field through path");
    let v = interpreter.eval("return o.v;").expect("read field");
    assert_eq!(expect_int(&v), 9);

    let err = interpreter.unset("Math.PI").expect_err("static fields cannot be unset");
    assert!(expect_eval_message(&err).contains("does not name a variable"));
}

#[test]
fn eval_command_runs_in_the_caller_frame() {
    let value = eval(r#"eval("y = 21"); return y * 2;"#);
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn print_writes_to_the_console() {
    let (mut interpreter, console) = common::interpreter();
    interpreter
        .eval(r#"print("hi"); print(1 + 2);"#)
        .expect("print succeeds");
    assert_eq!(console.output(), "hi\n3\n");
}

#[test]
fn sources_file_and_returns_its_value() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("seven.sprig");
    fs::write(&path, "x = 3;\nreturn x + 4;\nprint(\"never\");\n").expect("write script");

    let (mut interpreter, console) = common::interpreter();
    let value = interpreter.source(&path).expect("source succeeds");
    assert_eq!(expect_int(&value), 7);
    assert!(console.output().is_empty());
    let x = interpreter.get("x").expect("get x").expect("x defined by sourced file");
    assert_eq!(expect_int(&x), 3);
}

#[test]
fn source_command_resolves_against_working_directory() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("lib.sprig"), "helper() { return 11; }").expect("write library");

    let (mut interpreter, _) = common::interpreter();
    let script = format!(
        r#"cd("{}"); source("lib.sprig"); return helper();"#,
        path_literal(dir.path())
    );
    let value = interpreter.eval(&script).expect("source through cd");
    assert_eq!(expect_int(&value), 11);
}

#[test]
fn sourced_host_failure_keeps_label_and_stack() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("parse.sprig");
    fs::write(&path, "ok = Integer.parseInt(\"12\");\nbad = Integer.parseInt(\"x\");\n")
        .expect("write script");

    let (mut interpreter, _) = common::interpreter();
    let err = interpreter.source(&path).expect_err("parseInt should fail");
    match &err {
        SprigError::Target(target) => {
            assert!(target
                .cause()
                .downcast_ref::<std::num::ParseIntError>()
                .is_some());
        }
        other => panic!("expected target error, found {other:?}"),
    }
    let label = err.source_label().expect("error carries the file label");
    assert!(label.ends_with("parse.sprig"));
    assert_eq!(interpreter.call_stack().depth(), 1);
    let ok = interpreter.get("ok").expect("get ok").expect("first line ran");
    assert_eq!(expect_int(&ok), 12);
}

#[test]
fn missing_source_file_is_an_evaluation_error() {
    let (mut interpreter, _) = common::interpreter();
    let err = interpreter
        .source("/definitely/not/here.sprig")
        .expect_err("missing file");
    assert!(expect_eval_message(&err).contains("cannot read"));
}

#[test]
fn eval_reader_labels_errors() {
    let (mut interpreter, _) = common::interpreter();
    let global = interpreter.global().clone();
    let err = interpreter
        .eval_reader(Cursor::new("a = 1;\nunknown();"), &global, "inline.sprig")
        .expect_err("unknown method");
    assert_eq!(err.source_label(), Some("inline.sprig"));
    assert!(err.to_string().contains("inline.sprig"));
}

#[test]
fn parse_errors_are_classified() {
    let err = eval_error("x = ;");
    assert!(matches!(err, SprigError::Parse(_)));
    assert_eq!(err.classify(), "Parser error");
}

#[test]
fn interactive_loop_reports_and_continues() {
    let config = InterpreterConfig::default()
        .interactive(true)
        .exit_on_eof(false)
        .show_results(true);
    let (mut interpreter, console) = common::with_config(config);
    let mut lines = ReaderLines::new(Cursor::new("x = 1 +\n2;\nfoo();\nx * 10;\n"));
    interpreter.run_with(&mut lines).expect("loop ends at end of input");

    assert_eq!(console.output(), "3\n30\n");
    assert!(console.errors().starts_with("// Evaluation error"));
    assert!(console.errors().contains("foo"));
}

#[test]
fn interactive_sessions_exit_at_end_of_input_by_default() {
    let config = InterpreterConfig::default();
    assert!(config.exit_on_eof);
    assert!(!config.interactive);

    let mut repl = Repl::new();
    let config = repl.interpreter().runtime().config();
    assert!(config.interactive);
    assert!(!config.exit_on_eof);
}

#[test]
fn batch_loop_stops_at_first_error() {
    let (mut interpreter, console) = common::interpreter();
    let mut lines = ReaderLines::new(Cursor::new("print(\"one\");\nfoo();\nprint(\"two\");\n"));
    let err = interpreter
        .run_with(&mut lines)
        .expect_err("non-interactive loop fails");
    assert!(matches!(err, SprigError::Eval(_)));
    assert_eq!(console.output(), "one\n");
}

#[test]
fn run_reads_from_the_console() {
    let console = Arc::new(CaptureConsole::with_input([
        "total = 0;",
        "for (int i = 0; i < 4; i++)",
        "  total += i;",
        "print(total);",
    ]));
    let mut interpreter = Interpreter::with_console(console.clone());
    interpreter.run().expect("console input evaluates");
    assert_eq!(console.output(), "6\n");
}
