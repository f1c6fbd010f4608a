use std::{any::Any, path::Path};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    diagnostics::{EvalError, Result},
    eval::Evaluator,
    host::{ClassRegistry, HostClass, HostException, HostField, HostMethod, HostObject, HostType},
    lhs::LhsTarget,
    primitive::PrimitiveKind,
    runtime::{self, CWD_VARIABLE},
    value::Value,
};

type HostResult<T> = std::result::Result<T, HostException>;

pub(crate) type CommandFn = fn(&mut Evaluator<'_>, &[Value]) -> Result<Value>;

/// A utility command reachable from every namespace (`print`, `source`, ...).
#[derive(Clone, Copy)]
pub(crate) struct NativeCommand {
    pub name: &'static str,
    /// `usize::MAX` accepts any argument count.
    pub arity: usize,
    pub callback: CommandFn,
}

impl NativeCommand {
    pub fn accepts(&self, count: usize) -> bool {
        self.arity == usize::MAX || self.arity == count
    }
}

fn native(name: &'static str, arity: usize, callback: CommandFn) -> NativeCommand {
    NativeCommand {
        name,
        arity,
        callback,
    }
}

pub(crate) fn commands() -> IndexMap<&'static str, NativeCommand> {
    let mut table = IndexMap::new();
    for command in [
        native("print", 1, cmd_print),
        native("error", 1, cmd_error),
        native("eval", 1, cmd_eval),
        native("source", 1, cmd_source),
        native("pwd", 0, cmd_pwd),
        native("cd", 1, cmd_cd),
        native("unset", 1, cmd_unset),
    ] {
        table.insert(command.name, command);
    }
    table
}

fn expect_string<'v>(args: &'v [Value], index: usize, name: &str) -> Result<&'v str> {
    args.get(index).and_then(Value::as_str).ok_or_else(|| {
        let found = args
            .get(index)
            .map(Value::type_name)
            .unwrap_or_else(|| "nothing".into());
        EvalError::new(format!("`{name}` expected String but found {found}")).into()
    })
}

fn cmd_print(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    ev.runtime.console().println(&args[0].to_string());
    Ok(Value::void())
}

fn cmd_error(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    ev.runtime.console().error(&args[0].to_string());
    Ok(Value::void())
}

fn cmd_eval(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    let text = expect_string(args, 0, "eval")?;
    let mut text = text.trim_end().to_string();
    if !text.ends_with(';') && !text.ends_with('}') {
        text.push(';');
    }
    ev.eval_text(&text, None)
}

fn cmd_source(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    let path = expect_string(args, 0, "source")?;
    let scope = ev.scope()?;
    runtime::source_file(ev.runtime, Path::new(path), scope)
}

fn cmd_pwd(ev: &mut Evaluator<'_>, _args: &[Value]) -> Result<Value> {
    Ok(Value::string(ev.runtime.working_dir().display().to_string()))
}

fn cmd_cd(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    let path = expect_string(args, 0, "cd")?;
    let target = ev.runtime.resolve_path(path);
    if !target.is_dir() {
        return Err(EvalError::new(format!("no such directory: {}", target.display())).into());
    }
    let global = ev.runtime.global_scope();
    ev.runtime
        .define_variable(global, CWD_VARIABLE, Value::string(target.display().to_string()), None)?;
    Ok(Value::void())
}

fn cmd_unset(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    let name = expect_string(args, 0, "unset")?;
    let scope = ev.scope()?;
    let lhs = ev.runtime.name_resolver(scope, name)?;
    match lhs.target() {
        LhsTarget::Variable { scope, name } => {
            ev.runtime.namespace(*scope).unset_variable(name)?;
            Ok(Value::void())
        }
        _ => Err(EvalError::new(format!("`{name}` is not a variable")).into()),
    }
}

fn text_of(receiver: Option<&Value>) -> HostResult<String> {
    receiver
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| HostException::msg("receiver is not a String"))
}

fn int_arg(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::as_i64).unwrap_or_default()
}

fn double_arg(args: &[Value], index: usize) -> f64 {
    args.get(index).and_then(Value::as_f64).unwrap_or_default()
}

fn str_arg(args: &[Value], index: usize) -> HostResult<String> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| HostException::msg("null String argument"))
}

/// Char-indexed slice `[begin, end)` with bounds reported like the host would.
fn char_slice(text: &str, begin: i64, end: i64) -> HostResult<String> {
    let len = text.chars().count() as i64;
    if begin < 0 || end > len || begin > end {
        return Err(HostException::msg(format!(
            "begin {begin}, end {end}, length {len}"
        )));
    }
    Ok(text
        .chars()
        .skip(begin as usize)
        .take((end - begin) as usize)
        .collect())
}

fn string_class() -> HostClass {
    let int = HostType::Primitive(PrimitiveKind::Int);
    HostClass::new("lang.String")
        .method(HostMethod::new("length", vec![], |receiver, _| {
            Ok(Value::from(text_of(receiver)?.chars().count() as i32))
        }))
        .method(HostMethod::new("charAt", vec![int.clone()], |receiver, args| {
            let text = text_of(receiver)?;
            let index = int_arg(args, 0);
            usize::try_from(index)
                .ok()
                .and_then(|i| text.chars().nth(i))
                .map(Value::from)
                .ok_or_else(|| HostException::msg(format!("String index out of range: {index}")))
        }))
        .method(HostMethod::new("substring", vec![int.clone()], |receiver, args| {
            let text = text_of(receiver)?;
            let end = text.chars().count() as i64;
            char_slice(&text, int_arg(args, 0), end).map(Value::string)
        }))
        .method(HostMethod::new("substring", vec![int.clone(), int], |receiver, args| {
            let text = text_of(receiver)?;
            char_slice(&text, int_arg(args, 0), int_arg(args, 1)).map(Value::string)
        }))
        .method(HostMethod::new("toUpperCase", vec![], |receiver, _| {
            Ok(Value::string(text_of(receiver)?.to_uppercase()))
        }))
        .method(HostMethod::new("toLowerCase", vec![], |receiver, _| {
            Ok(Value::string(text_of(receiver)?.to_lowercase()))
        }))
        .method(HostMethod::new("trim", vec![], |receiver, _| {
            Ok(Value::string(text_of(receiver)?.trim()))
        }))
        .method(HostMethod::new("indexOf", vec![HostType::String], |receiver, args| {
            let text = text_of(receiver)?;
            let needle = str_arg(args, 0)?;
            let index = text
                .find(&needle)
                .map(|byte| text[..byte].chars().count() as i32)
                .unwrap_or(-1);
            Ok(Value::from(index))
        }))
        .method(HostMethod::new("startsWith", vec![HostType::String], |receiver, args| {
            Ok(Value::from(text_of(receiver)?.starts_with(&str_arg(args, 0)?)))
        }))
        .method(HostMethod::new("endsWith", vec![HostType::String], |receiver, args| {
            Ok(Value::from(text_of(receiver)?.ends_with(&str_arg(args, 0)?)))
        }))
        .method(HostMethod::new("equals", vec![HostType::Object], |receiver, args| {
            let text = text_of(receiver)?;
            Ok(Value::from(args[0].as_str() == Some(text.as_str())))
        }))
        .method(HostMethod::new_static("valueOf", vec![HostType::Object], |args| {
            Ok(Value::string(args[0].to_string()))
        }))
}

fn math_class() -> HostClass {
    let int = || HostType::Primitive(PrimitiveKind::Int);
    let long = || HostType::Primitive(PrimitiveKind::Long);
    let double = || HostType::Primitive(PrimitiveKind::Double);
    HostClass::new("lang.Math")
        .field(HostField::constant("PI", std::f64::consts::PI))
        .field(HostField::constant("E", std::f64::consts::E))
        .method(HostMethod::new_static("max", vec![int(), int()], |args| {
            Ok(Value::from(int_arg(args, 0).max(int_arg(args, 1)) as i32))
        }))
        .method(HostMethod::new_static("max", vec![long(), long()], |args| {
            Ok(Value::from(int_arg(args, 0).max(int_arg(args, 1))))
        }))
        .method(HostMethod::new_static("max", vec![double(), double()], |args| {
            Ok(Value::from(double_arg(args, 0).max(double_arg(args, 1))))
        }))
        .method(HostMethod::new_static("min", vec![int(), int()], |args| {
            Ok(Value::from(int_arg(args, 0).min(int_arg(args, 1)) as i32))
        }))
        .method(HostMethod::new_static("min", vec![long(), long()], |args| {
            Ok(Value::from(int_arg(args, 0).min(int_arg(args, 1))))
        }))
        .method(HostMethod::new_static("min", vec![double(), double()], |args| {
            Ok(Value::from(double_arg(args, 0).min(double_arg(args, 1))))
        }))
        .method(HostMethod::new_static("abs", vec![int()], |args| {
            Ok(Value::from((int_arg(args, 0) as i32).wrapping_abs()))
        }))
        .method(HostMethod::new_static("abs", vec![long()], |args| {
            Ok(Value::from(int_arg(args, 0).wrapping_abs()))
        }))
        .method(HostMethod::new_static("abs", vec![double()], |args| {
            Ok(Value::from(double_arg(args, 0).abs()))
        }))
        .method(HostMethod::new_static("pow", vec![double(), double()], |args| {
            Ok(Value::from(double_arg(args, 0).powf(double_arg(args, 1))))
        }))
        .method(HostMethod::new_static("sqrt", vec![double()], |args| {
            Ok(Value::from(double_arg(args, 0).sqrt()))
        }))
}

fn integer_class() -> HostClass {
    HostClass::new("lang.Integer")
        .field(HostField::constant("MAX_VALUE", i32::MAX))
        .field(HostField::constant("MIN_VALUE", i32::MIN))
        .method(HostMethod::new_static("parseInt", vec![HostType::String], |args| {
            let text = str_arg(args, 0)?;
            text.parse::<i32>()
                .map(Value::from)
                .map_err(HostException::new)
        }))
}

/// Plain instance of `lang.Object`.
#[derive(Debug, Default)]
pub struct PlainObject;

impl HostObject for PlainObject {
    fn class_name(&self) -> &str {
        "lang.Object"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mutable text buffer behind `lang.StringBuilder`.
#[derive(Debug, Default)]
pub struct StringBuilder {
    text: Mutex<String>,
}

impl StringBuilder {
    pub fn contents(&self) -> String {
        self.text.lock().clone()
    }
}

impl HostObject for StringBuilder {
    fn class_name(&self) -> &str {
        "lang.StringBuilder"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self) -> String {
        self.contents()
    }
}

fn builder_of(receiver: Option<&Value>) -> HostResult<&StringBuilder> {
    receiver
        .and_then(Value::downcast_host::<StringBuilder>)
        .ok_or_else(|| HostException::msg("receiver is not a StringBuilder"))
}

fn string_builder_class() -> HostClass {
    HostClass::new("lang.StringBuilder")
        .constructor(vec![], |_| Ok(Value::from_host(StringBuilder::default())))
        .constructor(vec![HostType::String], |args| {
            let builder = StringBuilder::default();
            builder.text.lock().push_str(&str_arg(args, 0)?);
            Ok(Value::from_host(builder))
        })
        .method(HostMethod::new("append", vec![HostType::Object], |receiver, args| {
            builder_of(receiver)?.text.lock().push_str(&args[0].to_string());
            Ok(receiver.cloned().unwrap_or_else(Value::null))
        }))
        .method(HostMethod::new("length", vec![], |receiver, _| {
            Ok(Value::from(builder_of(receiver)?.contents().chars().count() as i32))
        }))
        .method(HostMethod::new("toString", vec![], |receiver, _| {
            Ok(Value::string(builder_of(receiver)?.contents()))
        }))
}

/// Registers the `lang` package every interpreter starts with.
pub(crate) fn install_classes(registry: &ClassRegistry) {
    registry.register(HostClass::new("lang.Object").constructor(vec![], |_| Ok(Value::from_host(PlainObject))));
    registry.register(string_class());
    registry.register(math_class());
    registry.register(integer_class());
    registry.register(string_builder_class());
}
