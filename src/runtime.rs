use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{error, info, trace};

use crate::{
    callstack::CallStack,
    config::InterpreterConfig,
    console::Console,
    diagnostics::{EvalError, InterpreterError, Result, SprigError},
    eval::{Evaluator, Flow},
    host::{ClassLoader, ClassRegistry, HostClass},
    namespace::{NameSpace, ReleaseQueue, ScopeArena, ScopeId, ScopeKind, Variable},
    parser::Parser,
    stdlib::{self, NativeCommand},
    value::{ScriptObject, Value},
};

/// Global variable holding the working directory `source()` resolves
/// relative paths against.
pub const CWD_VARIABLE: &str = "$cwd";

/// State shared by an interpreter, the child interpreters it spawns for
/// `source()`, and every adapter built from its namespaces.
struct RuntimeState {
    scopes: Mutex<ScopeArena>,
    releases: ReleaseQueue,
    loader: RwLock<Option<Arc<dyn ClassLoader>>>,
    classes: ClassRegistry,
    commands: IndexMap<&'static str, NativeCommand>,
    console: Arc<dyn Console>,
    config: InterpreterConfig,
    global: ScopeId,
    utilities: ScopeId,
}

/// Cheap, thread-safe handle on the shared interpreter state.
#[derive(Clone)]
pub struct Runtime(Arc<RuntimeState>);

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("global", &self.0.global)
            .field("live_scopes", &self.live_scopes())
            .finish()
    }
}

fn seed(scopes: &mut ScopeArena, scope: ScopeId, name: &str, value: Value) {
    if let Ok(record) = scopes.get_mut(scope) {
        record.variables.insert(
            name.to_string(),
            Variable {
                value,
                declared: None,
            },
        );
    }
}

impl Runtime {
    pub fn new(config: InterpreterConfig, console: Arc<dyn Console>) -> Self {
        let mut scopes = ScopeArena::default();
        let global = scopes.create("global", ScopeKind::Root, None);
        let utilities = scopes.create("utilities", ScopeKind::Root, None);
        let system = scopes.create("system", ScopeKind::Root, None);
        seed(&mut scopes, system, "version", Value::string(env!("CARGO_PKG_VERSION")));
        if let Ok(hold) = scopes.hold(system) {
            seed(
                &mut scopes,
                utilities,
                "system",
                Value::object(ScriptObject::new(hold, "system")),
            );
        }
        let cwd = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| ".".into());
        seed(&mut scopes, global, CWD_VARIABLE, Value::string(cwd));
        if let Ok(record) = scopes.get_mut(global) {
            record.package_imports = config.default_imports.clone();
        }

        let classes = ClassRegistry::new();
        stdlib::install_classes(&classes);

        let releases = scopes.release_queue();
        Self(Arc::new(RuntimeState {
            scopes: Mutex::new(scopes),
            releases,
            loader: RwLock::new(None),
            classes,
            commands: stdlib::commands(),
            console,
            config,
            global,
            utilities,
        }))
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.0.config
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        &self.0.console
    }

    /// Locks the arena after applying releases queued by dropped holds.
    /// Freed frames are dropped unlocked, since their values may queue more.
    pub(crate) fn scopes(&self) -> MutexGuard<'_, ScopeArena> {
        loop {
            let pending = std::mem::take(&mut *self.0.releases.lock());
            let mut scopes = self.0.scopes.lock();
            if pending.is_empty() {
                return scopes;
            }
            let freed: Vec<_> = pending.into_iter().flat_map(|id| scopes.release(id)).collect();
            drop(scopes);
            trace!(frames = freed.len(), "freed unreachable frames");
            drop(freed);
        }
    }

    /// Classes scripts can see without a custom loader.
    pub fn classes(&self) -> &ClassRegistry {
        &self.0.classes
    }

    /// Routes host type resolution through `loader` first.
    pub fn set_class_loader(&self, loader: Arc<dyn ClassLoader>) {
        *self.0.loader.write() = Some(loader);
    }

    pub fn load_class(&self, name: &str) -> Option<Arc<HostClass>> {
        let external = self.0.loader.read().clone();
        external
            .and_then(|loader| loader.load_class(name))
            .or_else(|| self.0.classes.load_class(name))
    }

    pub fn global_scope(&self) -> ScopeId {
        self.0.global
    }

    pub(crate) fn utilities_scope(&self) -> ScopeId {
        self.0.utilities
    }

    pub fn namespace(&self, id: ScopeId) -> NameSpace {
        NameSpace::new(self.clone(), id)
    }

    pub fn live_scopes(&self) -> usize {
        self.scopes().live_count()
    }

    pub(crate) fn command(&self, name: &str) -> Option<NativeCommand> {
        self.0.commands.get(name).copied()
    }

    /// The working directory scripts see, `.` when unset.
    pub fn working_dir(&self) -> PathBuf {
        let value = self
            .scopes()
            .get(self.0.global)
            .ok()
            .and_then(|record| record.variables.get(CWD_VARIABLE).map(|v| v.value.clone()));
        value
            .as_ref()
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir().join(path)
        }
    }
}

/// Evaluates `source` one top-level unit at a time in the evaluator's
/// current frame. A `return` stops evaluation and yields its value;
/// otherwise the last unit's value is returned.
pub(crate) fn eval_units(ev: &mut Evaluator<'_>, source: &str, label: Option<&str>) -> Result<Value> {
    let mut parser = Parser::new(source);
    let mut last = Value::void();
    loop {
        let unit = parser
            .next_unit()
            .map_err(|diag| SprigError::from(diag).with_source(label))?;
        let Some(unit) = unit else {
            break;
        };
        let baseline = ev.stack.depth();
        let flow = ev.eval_stmt(&unit);
        check_depth(ev.stack, baseline)?;
        match flow.map_err(|err| err.with_source(label))? {
            Flow::Normal(value) => last = value,
            Flow::Return(value) => return Ok(value),
            Flow::Break | Flow::Continue => {
                return Err(SprigError::from(EvalError::new("`break` or `continue` outside of a loop"))
                    .at(unit.span, "statement")
                    .with_source(label));
            }
        }
        trace!(label = label.unwrap_or("<eval>"), "unit evaluated");
    }
    Ok(last)
}

/// A unit must leave the stack as deep as it found it.
pub(crate) fn check_depth(stack: &mut CallStack, baseline: usize) -> Result<()> {
    let depth = stack.depth();
    if depth == baseline {
        return Ok(());
    }
    error!(expected = baseline, found = depth, "call stack depth changed across a unit");
    stack.split_off(baseline);
    Err(InterpreterError::new(format!(
        "call stack depth {depth} does not match baseline {baseline}"
    ))
    .into())
}

/// Evaluates a file into `scope` on a fresh call stack; errors carry the
/// file's path as their source label.
pub(crate) fn source_file(runtime: &Runtime, path: &Path, scope: ScopeId) -> Result<Value> {
    let resolved = runtime.resolve_path(path);
    let label = resolved.display().to_string();
    info!(path = %label, "sourcing file");
    let text = fs::read_to_string(&resolved).map_err(|err| {
        SprigError::from(EvalError::new(format!("cannot read `{label}`: {err}"))).with_source(Some(&label))
    })?;
    let mut stack = CallStack::new(scope);
    let mut evaluator = Evaluator::new(runtime, &mut stack);
    eval_units(&mut evaluator, &text, Some(&label))
}
