//! Embeddable scripting runtime: a Java-flavoured script language evaluated
//! against host objects described through a small introspection seam.

pub mod adapter;
pub mod ast;
pub mod callstack;
pub mod config;
pub mod console;
pub mod diagnostics;
mod dispatch;
mod eval;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod lhs;
pub mod namespace;
pub mod parser;
pub mod primitive;
pub mod repl;
pub mod runtime;
mod stdlib;
pub mod value;

pub use adapter::InterfaceAdapter;
pub use callstack::CallStack;
pub use config::{InterpreterConfig, ResolutionOrder};
pub use console::{CaptureConsole, Console, StdConsole};
pub use diagnostics::{
    Diagnostic, DiagnosticKind, EvalError, InterpreterError, SourceSpan, SprigError, TargetError,
};
pub use host::{
    ClassLoader, ClassRegistry, HostClass, HostException, HostField, HostMethod, HostObject,
    HostRef, HostType,
};
pub use interpreter::Interpreter;
pub use lhs::{Lhs, LhsTarget};
pub use namespace::{NameSpace, ScopeId, ScriptMethod};
pub use primitive::{Primitive, PrimitiveKind};
pub use repl::{LineSource, ReaderLines, Repl};
pub use runtime::Runtime;
pub use value::{ArrayRef, ScriptObject, Value, ValueKind};
