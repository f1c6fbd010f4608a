//! The host introspection seam: what the runtime needs to know about host
//! objects and classes to resolve fields, constructors and overloaded methods.

use std::{any::Any, error::Error, fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{ast::TypeName, primitive::PrimitiveKind, value::Value};

pub type HostRef = Arc<dyn HostObject>;

/// Callable body of a host method or constructor. Receives the receiver
/// (`None` for statics and constructors) and already-coerced arguments.
pub type Invoker = Arc<dyn Fn(Option<&Value>, &[Value]) -> Result<Value, HostException> + Send + Sync>;

pub type FieldGetter = Arc<dyn Fn(Option<&Value>) -> Result<Value, HostException> + Send + Sync>;
pub type FieldSetter = Arc<dyn Fn(Option<&Value>, Value) -> Result<(), HostException> + Send + Sync>;

/// An object owned by the host application and visible to scripts.
pub trait HostObject: Any + Send + Sync + fmt::Debug {
    /// Fully qualified name used to look up the object's [`HostClass`].
    fn class_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Extra structural typing for objects that implement interfaces their
    /// class record does not list.
    fn instance_of(&self, _type_name: &str) -> bool {
        false
    }

    fn describe(&self) -> String {
        self.class_name().to_string()
    }
}

/// A parameter or field type as seen by overload resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    Primitive(PrimitiveKind),
    String,
    Object,
    Class(String),
    Array(Box<HostType>),
}

impl HostType {
    pub fn class(name: impl Into<String>) -> Self {
        HostType::Class(name.into())
    }

    pub fn array_of(element: HostType) -> Self {
        HostType::Array(Box::new(element))
    }

    pub fn from_type_name(ty: &TypeName) -> Self {
        let mut host = match PrimitiveKind::from_type_name(&ty.name) {
            Some(kind) => HostType::Primitive(kind),
            None => match ty.name.as_str() {
                "String" | "lang.String" => HostType::String,
                "Object" | "lang.Object" => HostType::Object,
                other => HostType::Class(other.to_string()),
            },
        };
        for _ in 0..ty.dims {
            host = HostType::array_of(host);
        }
        host
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            HostType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Zero value a fresh variable or array slot of this type holds.
    pub fn default_value(&self) -> Value {
        match self {
            HostType::Primitive(kind) => Value::zero_of(*kind),
            _ => Value::null(),
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Primitive(kind) => write!(f, "{kind}"),
            HostType::String => f.write_str("String"),
            HostType::Object => f.write_str("Object"),
            HostType::Class(name) => f.write_str(name),
            HostType::Array(element) => write!(f, "{element}[]"),
        }
    }
}

/// A method or constructor exposed by a host class.
#[derive(Clone)]
pub struct HostMethod {
    pub name: String,
    pub params: Vec<HostType>,
    pub is_static: bool,
    pub accessible: bool,
    invoker: Option<Invoker>,
}

impl HostMethod {
    pub fn new<F>(name: impl Into<String>, params: Vec<HostType>, body: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> Result<Value, HostException> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            is_static: false,
            accessible: true,
            invoker: Some(Arc::new(body)),
        }
    }

    pub fn new_static<F>(name: impl Into<String>, params: Vec<HostType>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostException> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            is_static: true,
            accessible: true,
            invoker: Some(Arc::new(move |_, args: &[Value]| body(args))),
        }
    }

    /// An interface method with no body.
    pub fn abstract_method(name: impl Into<String>, params: Vec<HostType>) -> Self {
        Self {
            name: name.into(),
            params,
            is_static: false,
            accessible: true,
            invoker: None,
        }
    }

    pub fn inaccessible(mut self) -> Self {
        self.accessible = false;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn invoker(&self) -> Option<&Invoker> {
        self.invoker.as_ref()
    }

    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMethod")
            .field("signature", &self.signature())
            .field("is_static", &self.is_static)
            .field("accessible", &self.accessible)
            .finish()
    }
}

#[derive(Clone)]
pub struct HostField {
    pub name: String,
    pub is_static: bool,
    getter: FieldGetter,
    setter: Option<FieldSetter>,
}

impl HostField {
    pub fn new<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<Value, HostException> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_static: false,
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// A read-only static field holding `value`.
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            is_static: true,
            getter: Arc::new(move |_| Ok(value.clone())),
            setter: None,
        }
    }

    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(Option<&Value>, Value) -> Result<(), HostException> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn get(&self, receiver: Option<&Value>) -> Result<Value, HostException> {
        (self.getter)(receiver)
    }

    pub fn setter(&self) -> Option<&FieldSetter> {
        self.setter.as_ref()
    }
}

impl fmt::Debug for HostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostField")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// Reflective description of a host class or interface.
#[derive(Debug, Clone)]
pub struct HostClass {
    pub name: String,
    pub is_interface: bool,
    pub supertypes: Vec<String>,
    pub constructors: Vec<HostMethod>,
    pub methods: Vec<HostMethod>,
    pub fields: Vec<HostField>,
}

impl HostClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_interface: false,
            supertypes: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            is_interface: true,
            ..Self::new(name)
        }
    }

    /// Declares a supertype (superclass or implemented interface).
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn constructor<F>(mut self, params: Vec<HostType>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostException> + Send + Sync + 'static,
    {
        let name = self.simple_name().to_string();
        self.constructors
            .push(HostMethod::new_static(name, params, body));
        self
    }

    pub fn method(mut self, method: HostMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: HostField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HostMethod> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn field_named(&self, name: &str) -> Option<&HostField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` spells this class, fully qualified or by simple name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || (!name.contains('.') && self.simple_name() == name)
    }
}

/// Resolves host type names to class records.
pub trait ClassLoader: Send + Sync {
    fn load_class(&self, name: &str) -> Option<Arc<HostClass>>;
}

/// Default [`ClassLoader`]: a name-keyed table of registered classes.
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<IndexMap<String, Arc<HostClass>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: HostClass) -> Arc<HostClass> {
        let class = Arc::new(class);
        self.classes
            .write()
            .insert(class.name.clone(), Arc::clone(&class));
        class
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.classes.read().keys().cloned().collect()
    }
}

impl ClassLoader for ClassRegistry {
    fn load_class(&self, name: &str) -> Option<Arc<HostClass>> {
        self.classes.read().get(name).cloned()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct HostMessage(String);

/// An error raised by host code, kept intact so callers can inspect it.
#[derive(Clone)]
pub struct HostException(Arc<dyn Error + Send + Sync>);

impl HostException {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(HostMessage(message.into()))
    }

    pub fn get(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Identity comparison: true only for clones of the same raised exception.
    pub fn same_as(&self, other: &HostException) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostException").field(&self.0).finish()
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
