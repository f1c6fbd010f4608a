use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
    host::{HostClass, HostObject, HostRef, HostType},
    namespace::{ScopeHold, ScopeId},
    primitive::{Primitive, PrimitiveKind},
};

/// A script value. Cloning is cheap and values may cross threads.
#[derive(Clone, Debug)]
pub struct Value(pub Arc<ValueKind>);

#[derive(Debug)]
pub enum ValueKind {
    Primitive(Primitive),
    String(String),
    Array(ArrayRef),
    /// A `this` reference to a scripted namespace.
    Object(ScriptObject),
    Host(HostRef),
    /// A host class, the target of static calls and field access.
    Class(Arc<HostClass>),
}

/// Shared, mutable array storage with reference semantics.
#[derive(Clone, Debug)]
pub struct ArrayRef {
    pub element: HostType,
    items: Arc<Mutex<Vec<Value>>>,
}

impl ArrayRef {
    pub fn new(element: HostType, items: Vec<Value>) -> Self {
        Self {
            element,
            items: Arc::new(Mutex::new(items)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.lock().get(index).cloned()
    }

    /// Stores `value` at `index`; returns false when out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.items.lock().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

/// A scripted object: the namespace a method ran in, kept alive after the
/// call for as long as the object is reachable.
#[derive(Clone, Debug)]
pub struct ScriptObject {
    pub scope: ScopeId,
    pub name: String,
    hold: ScopeHold,
}

impl ScriptObject {
    pub(crate) fn new(hold: ScopeHold, name: impl Into<String>) -> Self {
        Self {
            scope: hold.id(),
            name: name.into(),
            hold,
        }
    }
}

impl PartialEq for ScriptObject {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope
    }
}

impl Eq for ScriptObject {}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn void() -> Self {
        Self::new(ValueKind::Primitive(Primitive::Void))
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Primitive(Primitive::Null))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn array(array: ArrayRef) -> Self {
        Self::new(ValueKind::Array(array))
    }

    pub fn host(object: HostRef) -> Self {
        Self::new(ValueKind::Host(object))
    }

    /// Wraps a concrete host object.
    pub fn from_host<T: HostObject>(object: T) -> Self {
        Self::host(Arc::new(object))
    }

    pub fn class(class: Arc<HostClass>) -> Self {
        Self::new(ValueKind::Class(class))
    }

    pub fn object(object: ScriptObject) -> Self {
        Self::new(ValueKind::Object(object))
    }

    pub fn zero_of(kind: PrimitiveKind) -> Self {
        let primitive = match kind {
            PrimitiveKind::Boolean => Primitive::Bool(false),
            PrimitiveKind::Char => Primitive::Char('\0'),
            PrimitiveKind::Byte => Primitive::Byte(0),
            PrimitiveKind::Short => Primitive::Short(0),
            PrimitiveKind::Int => Primitive::Int(0),
            PrimitiveKind::Long => Primitive::Long(0),
            PrimitiveKind::Float => Primitive::Float(0.0),
            PrimitiveKind::Double => Primitive::Double(0.0),
            PrimitiveKind::Void => Primitive::Void,
            PrimitiveKind::Null => Primitive::Null,
        };
        Self::from(primitive)
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind(), ValueKind::Primitive(Primitive::Null))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind(), ValueKind::Primitive(Primitive::Void))
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self.kind() {
            ValueKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_primitive().and_then(|p| p.as_bool())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_primitive().and_then(|p| p.as_i64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_primitive().and_then(|p| p.as_f64())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.kind() {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self.kind() {
            ValueKind::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostRef> {
        match self.kind() {
            ValueKind::Host(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self.kind() {
            ValueKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn downcast_host<T: HostObject>(&self) -> Option<&T> {
        self.as_host()
            .and_then(|object| object.as_any().downcast_ref::<T>())
    }

    /// Name of the value's runtime type, as used in diagnostics.
    pub fn type_name(&self) -> String {
        match self.kind() {
            ValueKind::Primitive(p) => p.kind().name().to_string(),
            ValueKind::String(_) => "String".into(),
            ValueKind::Array(array) => format!("{}[]", array.element),
            ValueKind::Object(_) => "this".into(),
            ValueKind::Host(object) => object.class_name().to_string(),
            ValueKind::Class(_) => "Class".into(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.kind(), other.kind()) {
            (ValueKind::Primitive(a), ValueKind::Primitive(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::Array(a), ValueKind::Array(b)) => a.ptr_eq(b),
            (ValueKind::Object(a), ValueKind::Object(b)) => a.scope == b.scope,
            (ValueKind::Host(a), ValueKind::Host(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (ValueKind::Class(a), ValueKind::Class(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::Primitive(p) => write!(f, "{p}"),
            ValueKind::String(s) => f.write_str(s),
            ValueKind::Array(array) => {
                let items: Vec<String> = array.snapshot().iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            ValueKind::Object(object) => {
                write!(f, "'this' reference to NameSpace: {}", object.name)
            }
            ValueKind::Host(object) => f.write_str(&object.describe()),
            ValueKind::Class(class) => write!(f, "class {}", class.name),
        }
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Value::new(ValueKind::Primitive(value))
    }
}

macro_rules! primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::from(Primitive::$variant(value))
                }
            }
        )*
    };
}

primitive_from! {
    bool => Bool,
    char => Char,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl From<HostRef> for Value {
    fn from(value: HostRef) -> Self {
        Value::host(value)
    }
}

impl From<ArrayRef> for Value {
    fn from(value: ArrayRef) -> Self {
        Value::array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Value::null)
    }
}
