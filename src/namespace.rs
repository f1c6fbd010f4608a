//! Scope frames. Frames live in an arena addressed by generation-checked
//! ids; each frame names at most one parent, which always predates it.
//!
//! Frames are reference counted. A live frame counts once against its
//! parent, the call stack counts once while a frame is pushed, and every
//! `ScopeHold` counts once. A frame is freed when its count reaches zero.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    adapter::InterfaceAdapter,
    ast::{Param, Stmt, TypeName},
    config::ResolutionOrder,
    diagnostics::{EvalError, InterpreterError, Result, SprigError, TargetError},
    dispatch,
    host::{HostClass, HostRef, HostType},
    lhs::{Lhs, LhsTarget},
    runtime::Runtime,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// How a frame came to exist. Untyped assignments to unknown names inside a
/// `Block` land in the nearest enclosing non-block frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Call,
    Block,
}

/// Scopes whose holds were dropped and which still need releasing.
pub(crate) type ReleaseQueue = Arc<Mutex<Vec<ScopeId>>>;

/// A counted claim on a scope, taken by scripted objects and adapters. The
/// frame and its ancestors stay alive until the last clone is dropped.
#[derive(Clone)]
pub struct ScopeHold(Arc<HoldInner>);

struct HoldInner {
    id: ScopeId,
    releases: Weak<Mutex<Vec<ScopeId>>>,
}

impl ScopeHold {
    pub fn id(&self) -> ScopeId {
        self.0.id
    }
}

impl fmt::Debug for ScopeHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeHold").field(&self.0.id).finish()
    }
}

impl Drop for HoldInner {
    // Drops can happen with the arena locked, so the release is queued and
    // applied on the next arena access.
    fn drop(&mut self) {
        if let Some(queue) = self.releases.upgrade() {
            queue.lock().push(self.id);
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Variable {
    pub value: Value,
    pub declared: Option<HostType>,
}

/// A scripted method: a closure over the namespace that declared it.
#[derive(Debug, Clone)]
pub struct ScriptMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeName>,
    pub body: Arc<Vec<Stmt>>,
    pub declaring: ScopeId,
}

impl ScriptMethod {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|param| match &param.ty {
                Some(ty) => format!("{ty} {}", param.name),
                None => param.name.clone(),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    fn same_signature(&self, other: &ScriptMethod) -> bool {
        self.arity() == other.arity()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}

#[derive(Debug)]
pub(crate) struct ScopeRecord {
    pub name: String,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub variables: IndexMap<String, Variable>,
    pub methods: IndexMap<String, Vec<ScriptMethod>>,
    /// Simple name to qualified class name.
    pub class_imports: IndexMap<String, String>,
    pub package_imports: Vec<String>,
    pub bound: Option<HostRef>,
    refs: usize,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<ScopeRecord>,
}

#[derive(Debug, Default)]
pub(crate) struct ScopeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    methods_epoch: u64,
    releases: ReleaseQueue,
}

impl ScopeArena {
    pub fn release_queue(&self) -> ReleaseQueue {
        Arc::clone(&self.releases)
    }

    /// Creates a frame holding one reference for its creator, who must
    /// `release` it when done.
    pub fn create(&mut self, name: &str, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        if let Some(parent) = parent {
            self.retain(parent);
        }
        let record = ScopeRecord {
            name: name.to_string(),
            kind,
            parent,
            variables: IndexMap::new(),
            methods: IndexMap::new(),
            class_imports: IndexMap::new(),
            package_imports: Vec::new(),
            bound: None,
            refs: 1,
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.record = Some(record);
                ScopeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    record: Some(record),
                });
                ScopeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    pub fn get(&self, id: ScopeId) -> std::result::Result<&ScopeRecord, InterpreterError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_ref())
            .ok_or_else(|| InterpreterError::new(format!("stale namespace reference {id}")))
    }

    pub fn get_mut(
        &mut self,
        id: ScopeId,
    ) -> std::result::Result<&mut ScopeRecord, InterpreterError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
            .ok_or_else(|| InterpreterError::new(format!("stale namespace reference {id}")))
    }

    pub fn retain(&mut self, id: ScopeId) {
        if let Ok(record) = self.get_mut(id) {
            record.refs += 1;
        }
    }

    pub fn hold(&mut self, id: ScopeId) -> std::result::Result<ScopeHold, InterpreterError> {
        self.get_mut(id)?.refs += 1;
        Ok(ScopeHold(Arc::new(HoldInner {
            id,
            releases: Arc::downgrade(&self.releases),
        })))
    }

    /// Drops one reference to `id`, freeing it and then any ancestors left
    /// unreferenced. The freed records are handed back so the caller can
    /// drop their values after unlocking the arena.
    #[must_use]
    pub fn release(&mut self, id: ScopeId) -> Vec<ScopeRecord> {
        let mut freed = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor.take() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                break;
            };
            if slot.generation != current.generation {
                break;
            }
            let Some(record) = slot.record.as_mut() else {
                break;
            };
            record.refs = record.refs.saturating_sub(1);
            if record.refs > 0 {
                break;
            }
            if let Some(record) = slot.record.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                cursor = record.parent;
                freed.push(record);
            }
        }
        freed
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.record.is_some()).count()
    }

    pub fn methods_epoch(&self) -> u64 {
        self.methods_epoch
    }

    pub fn define_method(
        &mut self,
        scope: ScopeId,
        method: ScriptMethod,
    ) -> std::result::Result<(), InterpreterError> {
        let record = self.get_mut(scope)?;
        let overloads = record.methods.entry(method.name.clone()).or_default();
        match overloads.iter_mut().find(|m| m.same_signature(&method)) {
            Some(existing) => *existing = method,
            None => overloads.push(method),
        }
        self.methods_epoch += 1;
        Ok(())
    }

    pub fn remove_method(
        &mut self,
        scope: ScopeId,
        name: &str,
    ) -> std::result::Result<bool, InterpreterError> {
        let removed = self.get_mut(scope)?.methods.shift_remove(name).is_some();
        if removed {
            self.methods_epoch += 1;
        }
        Ok(removed)
    }

    /// `scope` followed by its ancestors.
    pub fn chain(&self, scope: ScopeId) -> std::result::Result<Vec<ScopeId>, InterpreterError> {
        let mut chain = Vec::new();
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            cursor = self.get(id)?.parent;
            chain.push(id);
        }
        Ok(chain)
    }
}

/// One frame's contribution to unqualified name resolution.
struct FrameProbe {
    local: Option<Value>,
    bound: Option<HostRef>,
}

impl Runtime {
    pub(crate) fn new_scope(&self, name: &str, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.scopes().create(name, kind, parent)
    }

    pub(crate) fn release_scope(&self, id: ScopeId) {
        let freed = self.scopes().release(id);
        drop(freed);
    }

    pub(crate) fn hold_scope(&self, id: ScopeId) -> Result<ScopeHold> {
        Ok(self.scopes().hold(id)?)
    }

    pub(crate) fn scope_name(&self, id: ScopeId) -> Result<String> {
        Ok(self.scopes().get(id)?.name.clone())
    }

    pub(crate) fn methods_epoch(&self) -> u64 {
        self.scopes().methods_epoch()
    }

    /// Nearest frame that is not a plain block: where `this` points and where
    /// untyped assignments to unknown names are defined.
    pub(crate) fn definition_scope(&self, scope: ScopeId) -> Result<ScopeId> {
        let scopes = self.scopes();
        let mut cursor = scope;
        loop {
            let record = scopes.get(cursor)?;
            match (record.kind, record.parent) {
                (ScopeKind::Block, Some(parent)) => cursor = parent,
                _ => return Ok(cursor),
            }
        }
    }

    pub(crate) fn define_variable(
        &self,
        scope: ScopeId,
        name: &str,
        value: Value,
        declared: Option<HostType>,
    ) -> Result<()> {
        let mut scopes = self.scopes();
        scopes
            .get_mut(scope)?
            .variables
            .insert(name.to_string(), Variable { value, declared });
        Ok(())
    }

    pub(crate) fn define_method(&self, method: ScriptMethod) -> Result<()> {
        self.scopes().define_method(method.declaring, method)?;
        Ok(())
    }

    fn probes(&self, scope: ScopeId, name: &str) -> Result<(Vec<FrameProbe>, Option<Value>)> {
        let scopes = self.scopes();
        let mut probes = Vec::new();
        for id in scopes.chain(scope)? {
            let record = scopes.get(id)?;
            probes.push(FrameProbe {
                local: record.variables.get(name).map(|v| v.value.clone()),
                bound: record.bound.clone(),
            });
        }
        let ambient = scopes
            .get(self.utilities_scope())?
            .variables
            .get(name)
            .map(|v| v.value.clone());
        Ok((probes, ambient))
    }

    /// Unqualified variable lookup: locals and bound objects up the chain,
    /// then imported classes, then the ambient utility namespace.
    pub(crate) fn resolve_variable(&self, scope: ScopeId, name: &str) -> Result<Option<Value>> {
        let (probes, ambient) = self.probes(scope, name)?;
        match self.config().resolution_order {
            ResolutionOrder::LocalThenBound => {
                for probe in &probes {
                    if let Some(value) = &probe.local {
                        return Ok(Some(value.clone()));
                    }
                    if let Some(object) = &probe.bound {
                        if let Some(value) = self.bound_field(object, name)? {
                            return Ok(Some(value));
                        }
                    }
                }
            }
            ResolutionOrder::ChainThenBound => {
                if let Some(value) = probes.iter().find_map(|p| p.local.clone()) {
                    return Ok(Some(value));
                }
                for object in probes.iter().filter_map(|p| p.bound.as_ref()) {
                    if let Some(value) = self.bound_field(object, name)? {
                        return Ok(Some(value));
                    }
                }
            }
        }
        if let Some(class) = self.lookup_class(scope, name)? {
            return Ok(Some(Value::class(class)));
        }
        Ok(ambient)
    }

    fn bound_field(&self, object: &HostRef, name: &str) -> Result<Option<Value>> {
        let Some(class) = self.load_class(object.class_name()) else {
            return Ok(None);
        };
        let Some(field) = class.field_named(name).filter(|f| !f.is_static) else {
            return Ok(None);
        };
        let receiver = Value::host(Arc::clone(object));
        field
            .get(Some(&receiver))
            .map(Some)
            .map_err(|cause| {
                SprigError::from(TargetError::new(
                    format!("reading field `{name}` of {}", object.class_name()),
                    cause,
                ))
            })
    }

    /// Resolves an assignment target for an unqualified name.
    pub(crate) fn name_resolver(&self, scope: ScopeId, name: &str) -> Result<Lhs> {
        let frames: Vec<(ScopeId, bool, Option<HostRef>)> = {
            let scopes = self.scopes();
            let mut frames = Vec::new();
            for id in scopes.chain(scope)? {
                let record = scopes.get(id)?;
                frames.push((id, record.variables.contains_key(name), record.bound.clone()));
            }
            frames
        };
        let bound_target = |object: &HostRef| -> Option<LhsTarget> {
            let class = self.load_class(object.class_name())?;
            class
                .field_named(name)
                .filter(|f| !f.is_static)
                .map(|_| LhsTarget::Field {
                    object: Value::host(Arc::clone(object)),
                    class: Arc::clone(&class),
                    field: name.to_string(),
                })
        };
        let variable = |id: ScopeId| LhsTarget::Variable {
            scope: id,
            name: name.to_string(),
        };
        match self.config().resolution_order {
            ResolutionOrder::LocalThenBound => {
                for (id, local, bound) in &frames {
                    if *local {
                        return Ok(Lhs::new(self, variable(*id)));
                    }
                    if let Some(target) = bound.as_ref().and_then(bound_target) {
                        return Ok(Lhs::new(self, target));
                    }
                }
            }
            ResolutionOrder::ChainThenBound => {
                if let Some((id, _, _)) = frames.iter().find(|(_, local, _)| *local) {
                    return Ok(Lhs::new(self, variable(*id)));
                }
                for bound in frames.iter().filter_map(|(_, _, bound)| bound.as_ref()) {
                    if let Some(target) = bound_target(bound) {
                        return Ok(Lhs::new(self, target));
                    }
                }
            }
        }
        let home = self.definition_scope(scope)?;
        Ok(Lhs::new(self, variable(home)))
    }

    /// Class lookup by qualified name, or by simple name through the imports
    /// visible from `scope`.
    pub(crate) fn lookup_class(&self, scope: ScopeId, name: &str) -> Result<Option<Arc<HostClass>>> {
        if name.contains('.') {
            return Ok(self.load_class(name));
        }
        let mut candidates = Vec::new();
        {
            let scopes = self.scopes();
            for id in scopes.chain(scope)? {
                let record = scopes.get(id)?;
                if let Some(qualified) = record.class_imports.get(name) {
                    candidates.push(qualified.clone());
                }
                candidates.extend(
                    record
                        .package_imports
                        .iter()
                        .map(|package| format!("{package}.{name}")),
                );
            }
        }
        candidates.push(name.to_string());
        Ok(candidates.iter().find_map(|candidate| self.load_class(candidate)))
    }

    /// Overloads named `name`, grouped by frame from innermost outwards.
    pub(crate) fn scripted_overloads(&self, scope: ScopeId, name: &str) -> Result<Vec<Vec<ScriptMethod>>> {
        let scopes = self.scopes();
        let mut levels = Vec::new();
        for id in scopes.chain(scope)? {
            if let Some(overloads) = scopes.get(id)?.methods.get(name) {
                levels.push(overloads.clone());
            }
        }
        Ok(levels)
    }

    /// First scripted method named `name` taking `arity` arguments, ignoring
    /// parameter types.
    pub(crate) fn method_by_arity(&self, scope: ScopeId, name: &str, arity: usize) -> Result<Option<ScriptMethod>> {
        Ok(self
            .scripted_overloads(scope, name)?
            .into_iter()
            .flatten()
            .find(|method| method.arity() == arity))
    }

    pub(crate) fn bound_objects(&self, scope: ScopeId) -> Result<Vec<HostRef>> {
        let scopes = self.scopes();
        let mut objects = Vec::new();
        for id in scopes.chain(scope)? {
            if let Some(object) = &scopes.get(id)?.bound {
                objects.push(Arc::clone(object));
            }
        }
        Ok(objects)
    }

    pub(crate) fn resolve_type(&self, scope: ScopeId, ty: &TypeName) -> Result<HostType> {
        self.qualify(scope, HostType::from_type_name(ty))
    }

    fn qualify(&self, scope: ScopeId, ty: HostType) -> Result<HostType> {
        Ok(match ty {
            HostType::Class(name) => match self.lookup_class(scope, &name)? {
                Some(class) if class.name == "lang.String" => HostType::String,
                Some(class) if class.name == "lang.Object" => HostType::Object,
                Some(class) => HostType::Class(class.name.clone()),
                None => HostType::Class(name),
            },
            HostType::Array(element) => HostType::array_of(self.qualify(scope, *element)?),
            other => other,
        })
    }
}

/// Host-facing handle on one namespace frame.
#[derive(Clone)]
pub struct NameSpace {
    runtime: Runtime,
    id: ScopeId,
}

impl fmt::Debug for NameSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameSpace").field("id", &self.id).finish()
    }
}

impl NameSpace {
    pub(crate) fn new(runtime: Runtime, id: ScopeId) -> Self {
        Self { runtime, id }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn name(&self) -> Result<String> {
        self.runtime.scope_name(self.id)
    }

    pub fn parent(&self) -> Result<Option<NameSpace>> {
        let parent = self.runtime.scopes().get(self.id)?.parent;
        Ok(parent.map(|id| NameSpace::new(self.runtime.clone(), id)))
    }

    /// A new, host-owned frame chained to this one; it lives as long as the
    /// runtime.
    pub fn child(&self, name: &str) -> Result<NameSpace> {
        let mut scopes = self.runtime.scopes();
        scopes.get(self.id)?;
        let id = scopes.create(name, ScopeKind::Call, Some(self.id));
        Ok(NameSpace::new(self.runtime.clone(), id))
    }

    /// Binds `name` in this frame, shadowing outer bindings.
    pub fn set_variable(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.runtime.define_variable(self.id, name, value.into(), None)
    }

    pub fn resolve_variable(&self, name: &str) -> Result<Option<Value>> {
        self.runtime.resolve_variable(self.id, name)
    }

    /// The scripted method a call `name(args)` made from this frame would run.
    pub fn resolve_method(&self, name: &str, args: &[Value]) -> Result<Option<ScriptMethod>> {
        let levels = self.runtime.scripted_overloads(self.id, name)?;
        dispatch::select_scripted(&self.runtime, levels, args)
    }

    pub fn get_name_resolver(&self, name: &str) -> Result<Lhs> {
        self.runtime.name_resolver(self.id, name)
    }

    pub fn import_class(&self, qualified: &str) -> Result<()> {
        if self.runtime.load_class(qualified).is_none() {
            return Err(EvalError::new(format!("class `{qualified}` not found")).into());
        }
        let simple = qualified.rsplit('.').next().unwrap_or(qualified).to_string();
        let mut scopes = self.runtime.scopes();
        scopes
            .get_mut(self.id)?
            .class_imports
            .insert(simple, qualified.to_string());
        Ok(())
    }

    pub fn import_package(&self, package: &str) -> Result<()> {
        let mut scopes = self.runtime.scopes();
        let record = scopes.get_mut(self.id)?;
        if !record.package_imports.iter().any(|p| p == package) {
            record.package_imports.push(package.to_string());
        }
        Ok(())
    }

    /// Makes `object`'s instance fields and methods resolvable unqualified
    /// from this frame.
    pub fn import_object(&self, object: HostRef) -> Result<()> {
        let mut scopes = self.runtime.scopes();
        scopes.get_mut(self.id)?.bound = Some(object);
        Ok(())
    }

    /// Removes a variable bound directly in this frame.
    pub fn unset_variable(&self, name: &str) -> Result<bool> {
        let mut scopes = self.runtime.scopes();
        Ok(scopes
            .get_mut(self.id)?
            .variables
            .shift_remove(name)
            .is_some())
    }

    /// Removes every overload of `name` declared in this frame.
    pub fn remove_method(&self, name: &str) -> Result<bool> {
        Ok(self.runtime.scopes().remove_method(self.id, name)?)
    }

    pub fn variable_names(&self) -> Result<Vec<String>> {
        Ok(self
            .runtime
            .scopes()
            .get(self.id)?
            .variables
            .keys()
            .cloned()
            .collect())
    }

    pub fn method_names(&self) -> Result<Vec<String>> {
        Ok(self
            .runtime
            .scopes()
            .get(self.id)?
            .methods
            .keys()
            .cloned()
            .collect())
    }

    /// Wraps this namespace as an object implementing the named host interfaces.
    pub fn as_interface(&self, interfaces: &[&str]) -> Result<Arc<InterfaceAdapter>> {
        InterfaceAdapter::new(&self.runtime, self.id, interfaces).map(Arc::new)
    }
}
