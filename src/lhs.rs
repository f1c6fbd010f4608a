use std::sync::Arc;

use crate::{
    diagnostics::{EvalError, Result, SprigError, TargetError},
    dispatch::{self, Conversion},
    host::{HostClass, HostException},
    namespace::ScopeId,
    runtime::Runtime,
    value::{ArrayRef, Value},
};

/// What an assignable reference points at.
#[derive(Debug, Clone)]
pub enum LhsTarget {
    Variable { scope: ScopeId, name: String },
    Field { object: Value, class: Arc<HostClass>, field: String },
    StaticField { class: Arc<HostClass>, field: String },
    ArrayElement { array: ArrayRef, index: usize },
    /// A bean-style property reached through `getX`/`isX` and `setX`.
    Property { object: Value, class: Arc<HostClass>, name: String },
}

/// A resolved assignment target, consumed right after resolution.
#[derive(Clone)]
pub struct Lhs {
    runtime: Runtime,
    target: LhsTarget,
}

impl std::fmt::Debug for Lhs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Lhs").field(&self.target).finish()
    }
}

fn host_failure(action: String, cause: HostException) -> SprigError {
    SprigError::from(TargetError::new(action, cause))
}

impl Lhs {
    pub(crate) fn new(runtime: &Runtime, target: LhsTarget) -> Self {
        Self {
            runtime: runtime.clone(),
            target,
        }
    }

    pub fn target(&self) -> &LhsTarget {
        &self.target
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.target, LhsTarget::Variable { .. })
    }

    pub fn read(&self) -> Result<Value> {
        match &self.target {
            LhsTarget::Variable { scope, name } => {
                let value = self
                    .runtime
                    .scopes()
                    .get(*scope)?
                    .variables
                    .get(name)
                    .map(|v| v.value.clone());
                value.ok_or_else(|| EvalError::new(format!("undefined symbol `{name}`")).into())
            }
            LhsTarget::Field { object, class, field } => {
                let host_field = class
                    .field_named(field)
                    .ok_or_else(|| EvalError::new(format!("no field `{field}` on {}", class.name)))?;
                host_field
                    .get(Some(object))
                    .map_err(|cause| host_failure(format!("reading field `{field}`"), cause))
            }
            LhsTarget::StaticField { class, field } => {
                let host_field = class
                    .field_named(field)
                    .ok_or_else(|| EvalError::new(format!("no static field `{field}` on {}", class.name)))?;
                host_field
                    .get(None)
                    .map_err(|cause| host_failure(format!("reading field `{field}`"), cause))
            }
            LhsTarget::ArrayElement { array, index } => array.get(*index).ok_or_else(|| {
                EvalError::new(format!(
                    "array index {index} out of bounds for length {}",
                    array.len()
                ))
                .into()
            }),
            LhsTarget::Property { object, class, name } => {
                let capitalized = capitalize(name);
                let getter = [format!("get{capitalized}"), format!("is{capitalized}")]
                    .into_iter()
                    .find_map(|getter| {
                        class
                            .methods
                            .iter()
                            .find(|m| m.name == getter && m.arity() == 0 && !m.is_static)
                            .cloned()
                    })
                    .ok_or_else(|| EvalError::new(format!("no property `{name}` on {}", class.name)))?;
                dispatch::call_host(&getter, Some(object), &[])
            }
        }
    }

    /// Stores `value`, applying assignment conversion for typed targets, and
    /// returns what was stored.
    pub fn assign(&self, value: Value) -> Result<Value> {
        match &self.target {
            LhsTarget::Variable { scope, name } => {
                let declared = self
                    .runtime
                    .scopes()
                    .get(*scope)?
                    .variables
                    .get(name)
                    .and_then(|v| v.declared.clone());
                let stored = match &declared {
                    Some(ty) => dispatch::coerce(&self.runtime, ty, value, Conversion::Assignment)?,
                    None => value,
                };
                self.runtime
                    .define_variable(*scope, name, stored.clone(), declared)?;
                Ok(stored)
            }
            LhsTarget::Field { object, class, field } => {
                let setter = class
                    .field_named(field)
                    .and_then(|f| f.setter().cloned())
                    .ok_or_else(|| EvalError::new(format!("field `{field}` of {} is not writable", class.name)))?;
                setter(Some(object), value.clone())
                    .map_err(|cause| host_failure(format!("writing field `{field}`"), cause))?;
                Ok(value)
            }
            LhsTarget::StaticField { class, field } => {
                let setter = class
                    .field_named(field)
                    .filter(|f| f.is_static)
                    .and_then(|f| f.setter().cloned())
                    .ok_or_else(|| EvalError::new(format!("static field `{field}` of {} is not writable", class.name)))?;
                setter(None, value.clone())
                    .map_err(|cause| host_failure(format!("writing field `{field}`"), cause))?;
                Ok(value)
            }
            LhsTarget::ArrayElement { array, index } => {
                let stored = dispatch::coerce(&self.runtime, &array.element, value, Conversion::Assignment)?;
                if !array.set(*index, stored.clone()) {
                    return Err(EvalError::new(format!(
                        "array index {index} out of bounds for length {}",
                        array.len()
                    ))
                    .into());
                }
                Ok(stored)
            }
            LhsTarget::Property { object, class, name } => {
                let setter_name = format!("set{}", capitalize(name));
                let candidates: Vec<_> = class
                    .methods_named(&setter_name)
                    .filter(|m| m.arity() == 1 && !m.is_static)
                    .collect();
                let args = [value.clone()];
                let setter = dispatch::select_host(&self.runtime, candidates.into_iter(), &args)?
                    .ok_or_else(|| EvalError::new(format!("no writable property `{name}` on {}", class.name)))?;
                let args = dispatch::coerce_args(&self.runtime, &setter.params, &args)?;
                dispatch::call_host(setter, Some(object), &args)?;
                Ok(value)
            }
        }
    }
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
