//! Method dispatch: finding the callable an invocation names, picking the
//! most specific overload, and converting arguments to parameter types.

use std::{
    cell::Cell,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{
    adapter::InterfaceAdapter,
    diagnostics::{EvalError, Result, SprigError, TargetError},
    eval::{Evaluator, Flow},
    host::{HostClass, HostMethod, HostObject, HostType},
    namespace::{ScopeId, ScopeKind, ScriptMethod},
    primitive::{Primitive, PrimitiveKind},
    runtime::Runtime,
    stdlib::NativeCommand,
    value::{ArrayRef, ScriptObject, Value, ValueKind},
};

thread_local! {
    /// Scripted calls in flight on this thread. Shared by every evaluator so
    /// re-entry through host callbacks and adapters counts toward the limit.
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One scripted call's claim on the thread's call depth, given back on drop.
struct DepthGuard {
    depth: usize,
}

impl DepthGuard {
    fn enter(limit: usize, method: &str) -> Result<Self> {
        let depth = CALL_DEPTH.with(Cell::get);
        if depth >= limit {
            return Err(EvalError::new(format!(
                "maximum call depth {limit} exceeded calling `{method}`"
            ))
            .into());
        }
        CALL_DEPTH.with(|cell| cell.set(depth + 1));
        Ok(Self { depth: depth + 1 })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|cell| cell.set(cell.get().saturating_sub(1)));
    }
}

/// Which conversion rules apply when a value meets a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conversion {
    /// Declarations and stores: narrowing of integral constants is allowed.
    Assignment,
    /// Argument passing: widening only.
    Invocation,
}

/// Applicability phases, tried in order; a later phase is only consulted
/// when no candidate applies in an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Exact,
    Widening,
    Boxing,
}

/// Something an unqualified call can land on.
pub(crate) enum Callable {
    Scripted(ScriptMethod),
    Host { receiver: Value, method: HostMethod },
    Command(NativeCommand),
    /// A scripted `invoke(name, args)` catching calls nothing else answers.
    Generic(ScriptMethod),
}

/// One tier of unqualified method lookup.
pub(crate) trait MethodResolver: Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        runtime: &Runtime,
        scope: ScopeId,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Callable>>;
}

struct ScriptedMethods;

impl MethodResolver for ScriptedMethods {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn resolve(&self, runtime: &Runtime, scope: ScopeId, method: &str, args: &[Value]) -> Result<Option<Callable>> {
        let levels = runtime.scripted_overloads(scope, method)?;
        Ok(select_scripted(runtime, levels, args)?.map(Callable::Scripted))
    }
}

struct BoundObjectMethods;

impl MethodResolver for BoundObjectMethods {
    fn name(&self) -> &'static str {
        "bound object"
    }

    fn resolve(&self, runtime: &Runtime, scope: ScopeId, method: &str, args: &[Value]) -> Result<Option<Callable>> {
        for object in runtime.bound_objects(scope)? {
            let Some(class) = runtime.load_class(object.class_name()) else {
                continue;
            };
            let candidates = class.methods_named(method).filter(|m| !m.is_static);
            if let Some(found) = select_host(runtime, candidates, args)? {
                return Ok(Some(Callable::Host {
                    receiver: Value::host(object),
                    method: found.clone(),
                }));
            }
        }
        Ok(None)
    }
}

struct AmbientCommands;

impl MethodResolver for AmbientCommands {
    fn name(&self) -> &'static str {
        "command"
    }

    fn resolve(&self, runtime: &Runtime, _scope: ScopeId, method: &str, args: &[Value]) -> Result<Option<Callable>> {
        Ok(runtime
            .command(method)
            .filter(|command| command.accepts(args.len()))
            .map(Callable::Command))
    }
}

struct GenericInvoke;

impl MethodResolver for GenericInvoke {
    fn name(&self) -> &'static str {
        "invoke"
    }

    fn resolve(&self, runtime: &Runtime, scope: ScopeId, _method: &str, _args: &[Value]) -> Result<Option<Callable>> {
        Ok(runtime
            .method_by_arity(scope, "invoke", 2)?
            .map(Callable::Generic))
    }
}

static RESOLVERS: &[&dyn MethodResolver] = &[
    &ScriptedMethods,
    &BoundObjectMethods,
    &AmbientCommands,
    &GenericInvoke,
];

fn describe_args(args: &[Value]) -> String {
    let types: Vec<String> = args.iter().map(Value::type_name).collect();
    types.join(", ")
}

fn scope_hash(scope: ScopeId) -> i32 {
    let mut hasher = DefaultHasher::new();
    scope.hash(&mut hasher);
    hasher.finish() as i32
}

impl Evaluator<'_> {
    /// `name(args)` with no receiver, tried against each resolver tier in turn.
    pub(crate) fn invoke_unqualified(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let scope = self.scope()?;
        for resolver in RESOLVERS {
            if let Some(callable) = resolver.resolve(self.runtime, scope, name, &args)? {
                trace!(resolver = resolver.name(), method = name, "resolved call");
                return self.call(callable, name, args);
            }
        }
        Err(EvalError::new(format!(
            "method `{name}({})` not found in namespace `{}`",
            describe_args(&args),
            self.runtime.scope_name(scope)?
        ))
        .into())
    }

    fn call(&mut self, callable: Callable, name: &str, args: Vec<Value>) -> Result<Value> {
        match callable {
            Callable::Scripted(method) => self.invoke_scripted(&method, args),
            Callable::Host { receiver, method } => {
                let args = coerce_args(self.runtime, &method.params, &args)?;
                call_host(&method, Some(&receiver), &args)
            }
            Callable::Command(command) => (command.callback)(self, &args),
            Callable::Generic(method) => self.invoke_generic(&method, name, args),
        }
    }

    pub(crate) fn invoke_generic(&mut self, method: &ScriptMethod, name: &str, args: Vec<Value>) -> Result<Value> {
        let packed = Value::array(ArrayRef::new(HostType::Object, args));
        self.invoke_scripted(method, vec![Value::string(name), packed])
    }

    /// `target.name(args)`.
    pub(crate) fn invoke_on(&mut self, target: &Value, name: &str, args: Vec<Value>) -> Result<Value> {
        match target.kind() {
            ValueKind::Object(object) => self.invoke_object(object, name, args),
            ValueKind::Host(host) => {
                if let Some(adapter) = host.as_any().downcast_ref::<InterfaceAdapter>() {
                    if let Some(value) = adapter.identity_call(name, &args)? {
                        return Ok(value);
                    }
                    let object = adapter.script_object();
                    return self.invoke_object(&object, name, args);
                }
                if let Some(class) = self.runtime.load_class(host.class_name()) {
                    if let Some(value) = self.invoke_host(&class, Some(target), name, &args)? {
                        return Ok(value);
                    }
                }
                match (name, args.as_slice()) {
                    ("toString", []) => Ok(Value::string(host.describe())),
                    ("equals", [other]) => Ok(Value::from(target == other)),
                    ("hashCode", []) => Ok(Value::from(Arc::as_ptr(host) as *const () as usize as i32)),
                    _ => Err(EvalError::new(format!(
                        "method `{name}({})` not found on {}",
                        describe_args(&args),
                        host.class_name()
                    ))
                    .into()),
                }
            }
            ValueKind::Class(class) => self.invoke_host(class, None, name, &args)?.ok_or_else(|| {
                EvalError::new(format!(
                    "static method `{name}({})` not found on {}",
                    describe_args(&args),
                    class.name
                ))
                .into()
            }),
            ValueKind::String(_) => {
                let class = self
                    .runtime
                    .load_class("lang.String")
                    .ok_or_else(|| EvalError::new("no class information for String"))?;
                self.invoke_host(&class, Some(target), name, &args)?.ok_or_else(|| {
                    EvalError::new(format!("method `{name}({})` not found on String", describe_args(&args))).into()
                })
            }
            ValueKind::Primitive(Primitive::Null) => {
                Err(EvalError::new(format!("attempt to invoke method `{name}` on null value")).into())
            }
            _ => Err(EvalError::new(format!(
                "cannot invoke method `{name}` on a value of type {}",
                target.type_name()
            ))
            .into()),
        }
    }

    /// Runs the overload of `name` on `class` that fits `args`; statics when
    /// there is no receiver.
    fn invoke_host(
        &mut self,
        class: &HostClass,
        receiver: Option<&Value>,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let wants_static = receiver.is_none();
        let candidates = class
            .methods_named(name)
            .filter(|m| m.is_static == wants_static);
        let Some(method) = select_host(self.runtime, candidates, args)? else {
            return Ok(None);
        };
        let args = coerce_args(self.runtime, &method.params, args)?;
        call_host(method, receiver, &args).map(Some)
    }

    /// Method call on a scripted object: its own methods, then its generic
    /// `invoke`, then the identity defaults every object answers.
    pub(crate) fn invoke_object(&mut self, object: &ScriptObject, name: &str, args: Vec<Value>) -> Result<Value> {
        let levels = self.runtime.scripted_overloads(object.scope, name)?;
        if let Some(method) = select_scripted(self.runtime, levels, &args)? {
            return self.invoke_scripted(&method, args);
        }
        if let Some(generic) = self.runtime.method_by_arity(object.scope, "invoke", 2)? {
            return self.invoke_generic(&generic, name, args);
        }
        match (name, args.as_slice()) {
            ("toString", []) => Ok(Value::string(format!(
                "'this' reference to NameSpace: {}",
                object.name
            ))),
            ("hashCode", []) => Ok(Value::from(scope_hash(object.scope))),
            ("equals", [other]) => Ok(Value::from(
                other.as_object().is_some_and(|o| o.scope == object.scope),
            )),
            _ => Err(EvalError::new(format!(
                "method `{name}({})` not found in namespace `{}`",
                describe_args(&args),
                object.name
            ))
            .into()),
        }
    }

    /// Calls a scripted method in a fresh frame chained to its declaring
    /// namespace.
    pub(crate) fn invoke_scripted(&mut self, method: &ScriptMethod, args: Vec<Value>) -> Result<Value> {
        if args.len() != method.arity() {
            return Err(EvalError::new(format!(
                "`{}` expects {} argument(s), got {}",
                method.signature(),
                method.arity(),
                args.len()
            ))
            .into());
        }
        let declared = method
            .params
            .iter()
            .map(|param| {
                param
                    .ty
                    .as_ref()
                    .map(|ty| self.runtime.resolve_type(method.declaring, ty))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        let return_type = method
            .return_type
            .as_ref()
            .map(|ty| self.runtime.resolve_type(method.declaring, ty))
            .transpose()?;

        let guard = DepthGuard::enter(self.runtime.config().max_call_depth, &method.name)?;
        debug!(method = %method.signature(), depth = guard.depth, "invoking scripted method");
        let result = self.in_scope(&method.name, ScopeKind::Call, method.declaring, |ev| {
            let frame = ev.scope()?;
            for ((param, ty), arg) in method.params.iter().zip(&declared).zip(args) {
                let value = match ty {
                    Some(ty) => coerce(ev.runtime, ty, arg, Conversion::Invocation)?,
                    None => arg,
                };
                ev.runtime.define_variable(frame, &param.name, value, ty.clone())?;
            }
            match ev.eval_block(&method.body, true)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal(_) => Ok(Value::void()),
                Flow::Break | Flow::Continue => Err(EvalError::new(format!(
                    "`break` or `continue` outside of a loop in `{}`",
                    method.name
                ))
                .into()),
            }
        });
        drop(guard);
        let value = result?;
        match return_type {
            Some(HostType::Primitive(PrimitiveKind::Void)) | None => Ok(value),
            Some(_) if value.is_void() => Ok(value),
            Some(ty) => coerce(self.runtime, &ty, value, Conversion::Assignment),
        }
    }

    /// `new Class(args)`.
    pub(crate) fn construct(&mut self, class: &HostClass, args: Vec<Value>) -> Result<Value> {
        if class.is_interface {
            return Err(EvalError::new(format!("cannot instantiate interface {}", class.name)).into());
        }
        let constructor = select_host(self.runtime, class.constructors.iter(), &args)?.ok_or_else(|| {
            EvalError::new(format!(
                "no constructor {}({}) found",
                class.name,
                describe_args(&args)
            ))
        })?;
        let args = coerce_args(self.runtime, &constructor.params, &args)?;
        call_host(constructor, None, &args)
    }
}

/// Picks the overload of a scripted method for `args`. `levels` holds the
/// overloads of each frame, innermost first; the first frame with an
/// applicable overload wins.
pub(crate) fn select_scripted(
    runtime: &Runtime,
    levels: Vec<Vec<ScriptMethod>>,
    args: &[Value],
) -> Result<Option<ScriptMethod>> {
    for level in levels {
        let mut methods = Vec::new();
        let mut signatures = Vec::new();
        for method in level.into_iter().filter(|m| m.arity() == args.len()) {
            let params = method
                .params
                .iter()
                .map(|param| match &param.ty {
                    Some(ty) => runtime.resolve_type(method.declaring, ty),
                    None => Ok(HostType::Object),
                })
                .collect::<Result<Vec<_>>>()?;
            signatures.push(params);
            methods.push(method);
        }
        let views: Vec<&[HostType]> = signatures.iter().map(Vec::as_slice).collect();
        match most_specific(runtime, &views, args) {
            Ok(Some(index)) => return Ok(Some(methods.swap_remove(index))),
            Ok(None) => continue,
            Err(tied) => {
                let names: Vec<String> = tied.iter().map(|&i| methods[i].signature()).collect();
                return Err(ambiguity(&names));
            }
        }
    }
    Ok(None)
}

/// Picks the most specific host method among `candidates` for `args`.
pub(crate) fn select_host<'m>(
    runtime: &Runtime,
    candidates: impl Iterator<Item = &'m HostMethod>,
    args: &[Value],
) -> Result<Option<&'m HostMethod>> {
    let methods: Vec<&HostMethod> = candidates.collect();
    let views: Vec<&[HostType]> = methods.iter().map(|m| m.params.as_slice()).collect();
    match most_specific(runtime, &views, args) {
        Ok(found) => Ok(found.map(|index| methods[index])),
        Err(tied) => {
            let names: Vec<String> = tied.iter().map(|&i| methods[i].signature()).collect();
            Err(ambiguity(&names))
        }
    }
}

fn ambiguity(signatures: &[String]) -> SprigError {
    EvalError::new(format!(
        "ambiguous method call; candidates: {}",
        signatures.join(", ")
    ))
    .into()
}

/// Index of the single most specific applicable signature, or the tied set
/// when several are maximal.
fn most_specific(
    runtime: &Runtime,
    signatures: &[&[HostType]],
    args: &[Value],
) -> std::result::Result<Option<usize>, Vec<usize>> {
    for phase in [Phase::Exact, Phase::Widening, Phase::Boxing] {
        let applicable: Vec<usize> = (0..signatures.len())
            .filter(|&i| {
                let params = signatures[i];
                params.len() == args.len()
                    && params
                        .iter()
                        .zip(args)
                        .all(|(param, arg)| conversion(runtime, arg, param).is_some_and(|p| p <= phase))
            })
            .collect();
        if applicable.is_empty() {
            continue;
        }
        let maximal: Vec<usize> = applicable
            .iter()
            .copied()
            .filter(|&i| {
                !applicable
                    .iter()
                    .any(|&j| j != i && strictly_more_specific(runtime, signatures[j], signatures[i]))
            })
            .collect();
        return match maximal.as_slice() {
            [only] => Ok(Some(*only)),
            [first, rest @ ..] if rest.iter().all(|&j| signatures[j] == signatures[*first]) => Ok(Some(*first)),
            _ => Err(maximal),
        };
    }
    Ok(None)
}

fn strictly_more_specific(runtime: &Runtime, a: &[HostType], b: &[HostType]) -> bool {
    let covers = |x: &[HostType], y: &[HostType]| x.iter().zip(y).all(|(p, q)| assignable(runtime, p, q));
    covers(a, b) && !covers(b, a)
}

/// Whether every value of type `from` is also a `to`.
fn assignable(runtime: &Runtime, from: &HostType, to: &HostType) -> bool {
    match (from, to) {
        _ if from == to => true,
        (HostType::Primitive(a), HostType::Primitive(b)) => a.can_widen_to(*b),
        (_, HostType::Object) => true,
        (HostType::Class(a), HostType::Class(b)) => is_subtype(runtime, a, b),
        (HostType::Array(a), HostType::Array(b)) => {
            a.primitive_kind().is_none() && assignable(runtime, a, b)
        }
        _ => false,
    }
}

/// How `value` reaches a parameter of type `param`, if it can.
fn conversion(runtime: &Runtime, value: &Value, param: &HostType) -> Option<Phase> {
    match (value.kind(), param) {
        (ValueKind::Primitive(Primitive::Void), _) => None,
        (ValueKind::Primitive(Primitive::Null), HostType::Primitive(_)) => None,
        (ValueKind::Primitive(Primitive::Null), _) => Some(Phase::Widening),
        (ValueKind::Primitive(p), HostType::Primitive(kind)) => {
            if p.kind() == *kind {
                Some(Phase::Exact)
            } else if p.kind().can_widen_to(*kind) {
                Some(Phase::Widening)
            } else {
                None
            }
        }
        (ValueKind::Primitive(_), HostType::Object) => Some(Phase::Boxing),
        (ValueKind::Primitive(p), HostType::Class(name)) => {
            is_box_of(p.kind(), name).then_some(Phase::Boxing)
        }
        (ValueKind::String(_), HostType::String) => Some(Phase::Exact),
        (ValueKind::String(_), HostType::Object) => Some(Phase::Widening),
        (ValueKind::Array(array), HostType::Array(element)) => {
            if array.element == **element {
                Some(Phase::Exact)
            } else if array.element.primitive_kind().is_none()
                && assignable(runtime, &array.element, element)
            {
                Some(Phase::Widening)
            } else {
                None
            }
        }
        (ValueKind::Host(host), HostType::Class(name)) => {
            if host.class_name() == name {
                Some(Phase::Exact)
            } else if host_is(runtime, host.as_ref(), name) {
                Some(Phase::Widening)
            } else {
                None
            }
        }
        (ValueKind::Object(_), HostType::Class(name)) => runtime
            .load_class(name)
            .filter(|class| class.is_interface)
            .map(|_| Phase::Widening),
        (ValueKind::Array(_) | ValueKind::Host(_) | ValueKind::Object(_) | ValueKind::Class(_), HostType::Object) => {
            Some(Phase::Widening)
        }
        _ => None,
    }
}

fn is_box_of(kind: PrimitiveKind, name: &str) -> bool {
    let boxed = match kind {
        PrimitiveKind::Boolean => "Boolean",
        PrimitiveKind::Char => "Character",
        PrimitiveKind::Byte => "Byte",
        PrimitiveKind::Short => "Short",
        PrimitiveKind::Int => "Integer",
        PrimitiveKind::Long => "Long",
        PrimitiveKind::Float => "Float",
        PrimitiveKind::Double => "Double",
        PrimitiveKind::Void | PrimitiveKind::Null => return false,
    };
    name == boxed || name.strip_prefix("lang.") == Some(boxed)
}

fn is_subtype(runtime: &Runtime, from: &str, to: &str) -> bool {
    let mut pending = vec![from.to_string()];
    let mut seen: Vec<String> = Vec::new();
    while let Some(name) = pending.pop() {
        if name == to {
            return true;
        }
        if seen.contains(&name) {
            continue;
        }
        if let Some(class) = runtime.load_class(&name) {
            if class.answers_to(to) {
                return true;
            }
            pending.extend(class.supertypes.iter().cloned());
        }
        seen.push(name);
    }
    false
}

fn host_is(runtime: &Runtime, host: &dyn HostObject, type_name: &str) -> bool {
    host.class_name() == type_name || host.instance_of(type_name) || is_subtype(runtime, host.class_name(), type_name)
}

/// Converts `value` for storage in, or passing to, a slot of type `ty`.
pub(crate) fn coerce(runtime: &Runtime, ty: &HostType, value: Value, conversion: Conversion) -> Result<Value> {
    let mismatch = |value: &Value| -> SprigError {
        EvalError::new(format!("cannot convert {} to {ty}", value.type_name())).into()
    };
    if value.is_void() {
        return Err(EvalError::new(format!("void value used where {ty} is expected")).into());
    }
    match ty {
        HostType::Primitive(kind) => {
            let primitive = value
                .as_primitive()
                .filter(|p| !p.is_null())
                .ok_or_else(|| mismatch(&value))?;
            let converted = match conversion {
                Conversion::Assignment => primitive.assign_to(*kind),
                Conversion::Invocation => primitive
                    .widen_to(*kind)
                    .ok_or_else(|| format!("cannot convert {} to {kind}", primitive.kind())),
            };
            converted
                .map(Value::from)
                .map_err(|message| EvalError::new(message).into())
        }
        HostType::String => match value.kind() {
            ValueKind::String(_) | ValueKind::Primitive(Primitive::Null) => Ok(value),
            _ => Err(mismatch(&value)),
        },
        HostType::Object => Ok(value),
        HostType::Class(name) => {
            if value.is_null() {
                return Ok(value);
            }
            let class = runtime.load_class(name);
            match value.kind() {
                ValueKind::Object(object) => match &class {
                    Some(class) if class.is_interface => {
                        let adapter = InterfaceAdapter::new(runtime, object.scope, &[name.as_str()])?;
                        Ok(Value::from_host(adapter))
                    }
                    Some(_) => Err(mismatch(&value)),
                    None => Ok(value),
                },
                ValueKind::Host(host) if host_is(runtime, host.as_ref(), name) => Ok(value),
                ValueKind::Primitive(p) if is_box_of(p.kind(), name) => Ok(value),
                _ if class.is_none() => Ok(value),
                _ => Err(mismatch(&value)),
            }
        }
        HostType::Array(element) => match value.kind() {
            ValueKind::Primitive(Primitive::Null) => Ok(value),
            ValueKind::Array(array)
                if array.element == **element
                    || (array.element.primitive_kind().is_none()
                        && assignable(runtime, &array.element, element)) =>
            {
                Ok(value)
            }
            _ => Err(mismatch(&value)),
        },
    }
}

/// Explicit `(Type) value` conversion.
pub(crate) fn cast(runtime: &Runtime, ty: &HostType, value: Value) -> Result<Value> {
    match ty {
        HostType::Primitive(kind) => {
            let primitive = value
                .as_primitive()
                .filter(|p| !p.is_null() && !p.is_void())
                .ok_or_else(|| EvalError::new(format!("cannot cast {} to {kind}", value.type_name())))?;
            primitive
                .cast_to(*kind)
                .map(Value::from)
                .map_err(|message| EvalError::new(message).into())
        }
        _ => coerce(runtime, ty, value, Conversion::Assignment),
    }
}

pub(crate) fn coerce_args(runtime: &Runtime, params: &[HostType], args: &[Value]) -> Result<Vec<Value>> {
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| coerce(runtime, param, arg.clone(), Conversion::Invocation))
        .collect()
}

/// Invokes a host method; a host failure surfaces as a `TargetError` that
/// keeps the original exception.
pub(crate) fn call_host(method: &HostMethod, receiver: Option<&Value>, args: &[Value]) -> Result<Value> {
    if !method.accessible {
        return Err(EvalError::new(format!("method `{}` is not accessible", method.signature())).into());
    }
    let Some(invoker) = method.invoker() else {
        return Err(EvalError::new(format!(
            "method `{}` is abstract and cannot be invoked",
            method.signature()
        ))
        .into());
    };
    if args.len() != method.arity() {
        return Err(EvalError::new(format!(
            "`{}` expects {} argument(s), got {}",
            method.signature(),
            method.arity(),
            args.len()
        ))
        .into());
    }
    debug!(method = %method.signature(), "invoking host method");
    invoker(receiver, args).map_err(|cause| {
        TargetError::new(format!("`{}` raised an exception", method.signature()), cause).into()
    })
}
