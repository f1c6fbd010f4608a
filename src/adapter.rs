//! Scripted namespaces presented to the host as implementations of host
//! interfaces.

use std::{any::Any, fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    callstack::CallStack,
    diagnostics::{EvalError, Result},
    eval::Evaluator,
    host::{HostClass, HostMethod, HostObject},
    namespace::{ScopeHold, ScopeId, ScriptMethod},
    runtime::Runtime,
    value::{ScriptObject, Value},
};

/// Class name adapters report to the host.
pub const ADAPTER_CLASS: &str = "sprig.ScriptAdapter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Identity {
    ToString,
    HashCode,
    Equals,
}

impl Identity {
    fn for_method(name: &str, arity: usize) -> Option<Identity> {
        match (name, arity) {
            ("toString", 0) => Some(Identity::ToString),
            ("hashCode", 0) => Some(Identity::HashCode),
            ("equals", 1) => Some(Identity::Equals),
            _ => None,
        }
    }
}

/// Where a call on the adapter goes.
#[derive(Debug, Clone)]
enum Dispatch {
    /// A scripted method with the interface method's name and arity.
    Named(ScriptMethod),
    /// The namespace's `invoke(name, args)` catch-all.
    Generic(ScriptMethod),
    Identity(Identity),
    Missing,
}

#[derive(Debug, Default)]
struct DispatchTable {
    epoch: Option<u64>,
    entries: IndexMap<(String, usize), Dispatch>,
}

/// A host object whose interface methods run scripted methods of one
/// namespace. Safe to call from any thread; each call gets its own stack.
pub struct InterfaceAdapter {
    runtime: Runtime,
    scope: ScopeId,
    hold: ScopeHold,
    label: String,
    interfaces: Vec<Arc<HostClass>>,
    table: RwLock<DispatchTable>,
}

impl fmt::Debug for InterfaceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceAdapter")
            .field("scope", &self.scope)
            .field("label", &self.label)
            .field("interfaces", &self.interface_names())
            .finish()
    }
}

impl fmt::Display for InterfaceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'this' reference to NameSpace: {} implementing {}",
            self.label,
            self.interface_names().join(", ")
        )
    }
}

impl InterfaceAdapter {
    /// Binds the namespace `scope` to the named interfaces. Every name must
    /// resolve to a host interface.
    pub fn new(runtime: &Runtime, scope: ScopeId, interfaces: &[&str]) -> Result<Self> {
        let mut classes = Vec::with_capacity(interfaces.len());
        for name in interfaces {
            let class = runtime
                .lookup_class(scope, name)?
                .ok_or_else(|| EvalError::new(format!("interface `{name}` not found")))?;
            if !class.is_interface {
                return Err(EvalError::new(format!("`{}` is not an interface", class.name)).into());
            }
            classes.push(class);
        }
        let hold = runtime.hold_scope(scope)?;
        let adapter = Self {
            runtime: runtime.clone(),
            scope,
            hold,
            label: runtime.scope_name(scope)?,
            interfaces: classes,
            table: RwLock::new(DispatchTable::default()),
        };
        adapter.refresh()?;
        debug!(adapter = %adapter, "created interface adapter");
        Ok(adapter)
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces.iter().map(|class| class.name.clone()).collect()
    }

    pub(crate) fn script_object(&self) -> ScriptObject {
        ScriptObject::new(self.hold.clone(), self.label.clone())
    }

    /// Abstract methods of the interfaces and everything they extend.
    fn abstract_methods(&self) -> Vec<HostMethod> {
        let mut pending: Vec<Arc<HostClass>> = self.interfaces.clone();
        let mut seen: Vec<String> = Vec::new();
        let mut methods = Vec::new();
        while let Some(class) = pending.pop() {
            if seen.contains(&class.name) {
                continue;
            }
            seen.push(class.name.clone());
            methods.extend(
                class
                    .methods
                    .iter()
                    .filter(|m| !m.is_static && m.invoker().is_none())
                    .cloned(),
            );
            pending.extend(
                class
                    .supertypes
                    .iter()
                    .filter_map(|name| self.runtime.load_class(name)),
            );
        }
        methods
    }

    fn resolve(&self, name: &str, arity: usize) -> Result<Dispatch> {
        if let Some(method) = self.runtime.method_by_arity(self.scope, name, arity)? {
            return Ok(Dispatch::Named(method));
        }
        if let Some(method) = self.runtime.method_by_arity(self.scope, "invoke", 2)? {
            return Ok(Dispatch::Generic(method));
        }
        Ok(Identity::for_method(name, arity).map_or(Dispatch::Missing, Dispatch::Identity))
    }

    /// Rebuilds the dispatch table when scripted methods changed since the
    /// last build.
    fn refresh(&self) -> Result<()> {
        let epoch = self.runtime.methods_epoch();
        let first_build = {
            let table = self.table.read();
            if table.epoch == Some(epoch) {
                return Ok(());
            }
            table.epoch.is_none()
        };
        let mut entries = IndexMap::new();
        for method in self.abstract_methods() {
            let key = (method.name.clone(), method.arity());
            if entries.contains_key(&key) {
                continue;
            }
            let dispatch = self.resolve(&method.name, method.arity())?;
            if first_build && matches!(dispatch, Dispatch::Missing) {
                warn!(
                    method = %method.signature(),
                    namespace = %self.label,
                    "interface method has no scripted implementation"
                );
            }
            entries.insert(key, dispatch);
        }
        let mut table = self.table.write();
        table.epoch = Some(epoch);
        table.entries = entries;
        Ok(())
    }

    fn dispatch_for(&self, method: &str, arity: usize) -> Result<Dispatch> {
        self.refresh()?;
        let cached = self
            .table
            .read()
            .entries
            .get(&(method.to_string(), arity))
            .cloned();
        match cached {
            Some(dispatch) => Ok(dispatch),
            None => self.resolve(method, arity),
        }
    }

    /// Runs `method` with `args`. A void or null result comes back as `None`.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        let dispatch = self.dispatch_for(method, args.len())?;
        let mut stack = CallStack::new(self.scope);
        let mut evaluator = Evaluator::new(&self.runtime, &mut stack);
        let value = match dispatch {
            Dispatch::Named(target) => evaluator.invoke_scripted(&target, args.to_vec())?,
            Dispatch::Generic(target) => evaluator.invoke_generic(&target, method, args.to_vec())?,
            Dispatch::Identity(identity) => self.identity(identity, args),
            Dispatch::Missing => {
                return Err(EvalError::new(format!(
                    "method `{method}` with {} argument(s) is not implemented by namespace `{}`",
                    args.len(),
                    self.label
                ))
                .into());
            }
        };
        Ok((!value.is_void() && !value.is_null()).then_some(value))
    }

    /// The identity default answering `method`, when no scripted method
    /// or generic `invoke` takes the call first.
    pub(crate) fn identity_call(&self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        match self.dispatch_for(method, args.len())? {
            Dispatch::Identity(identity) => Ok(Some(self.identity(identity, args))),
            _ => Ok(None),
        }
    }

    fn identity(&self, identity: Identity, args: &[Value]) -> Value {
        match identity {
            Identity::ToString => Value::string(self.to_string()),
            Identity::HashCode => Value::from(self as *const Self as usize as i32),
            Identity::Equals => {
                let same = args.first().and_then(Value::as_host).is_some_and(|other| {
                    std::ptr::eq(Arc::as_ptr(other) as *const (), self as *const Self as *const ())
                });
                Value::from(same)
            }
        }
    }

    fn implements(&self, type_name: &str) -> bool {
        let mut pending: Vec<Arc<HostClass>> = self.interfaces.clone();
        let mut seen: Vec<String> = Vec::new();
        while let Some(class) = pending.pop() {
            if class.answers_to(type_name) {
                return true;
            }
            if seen.contains(&class.name) {
                continue;
            }
            seen.push(class.name.clone());
            pending.extend(
                class
                    .supertypes
                    .iter()
                    .filter_map(|name| self.runtime.load_class(name)),
            );
        }
        false
    }
}

impl HostObject for InterfaceAdapter {
    fn class_name(&self) -> &str {
        ADAPTER_CLASS
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn instance_of(&self, type_name: &str) -> bool {
        self.implements(type_name)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}
