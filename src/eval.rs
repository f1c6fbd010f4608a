use tracing::trace;

use crate::{
    ast::{BinaryOp, Expr, ExprKind, Literal, MethodDecl, Step, Stmt, StmtKind, TypeName, UnaryOp},
    callstack::CallStack,
    diagnostics::{EvalError, InterpreterError, Result, SprigError},
    dispatch::{self, Conversion},
    lhs::{Lhs, LhsTarget},
    namespace::{ScopeId, ScopeKind, ScriptMethod},
    primitive::Primitive,
    runtime::Runtime,
    value::{ArrayRef, ScriptObject, Value, ValueKind},
};

/// Outcome of a statement. `Return` tunnels unchanged through blocks and
/// loops until a method-call boundary unwraps it.
#[derive(Debug, Clone)]
pub(crate) enum Flow {
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// Walks the tree against one call stack.
pub(crate) struct Evaluator<'a> {
    pub(crate) runtime: &'a Runtime,
    pub(crate) stack: &'a mut CallStack,
}

impl<'a> Evaluator<'a> {
    pub fn new(runtime: &'a Runtime, stack: &'a mut CallStack) -> Self {
        Self {
            runtime,
            stack,
        }
    }

    pub fn scope(&self) -> Result<ScopeId> {
        self.stack
            .top()
            .ok_or_else(|| InterpreterError::new("evaluation with an empty call stack").into())
    }

    /// Runs `body` inside a fresh frame chained to `parent`; the frame is
    /// popped and released on every exit path.
    pub fn in_scope<T>(
        &mut self,
        name: &str,
        kind: ScopeKind,
        parent: ScopeId,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let id = self.runtime.new_scope(name, kind, Some(parent));
        self.stack.push(id);
        let result = body(self);
        let popped = self.stack.pop();
        self.runtime.release_scope(id);
        if popped != Some(id) {
            return Err(InterpreterError::new(format!(
                "call stack out of step: expected frame {id} on top"
            ))
            .into());
        }
        result
    }

    pub fn eval_block(&mut self, stmts: &[Stmt], in_place: bool) -> Result<Flow> {
        if !in_place {
            let parent = self.scope()?;
            return self.in_scope("block", ScopeKind::Block, parent, |ev| ev.eval_block(stmts, true));
        }
        for stmt in stmts {
            if let StmtKind::Method(decl) = &stmt.kind {
                self.declare_method(decl)?;
            }
        }
        let mut last = Value::void();
        for stmt in stmts {
            if matches!(stmt.kind, StmtKind::Method(_)) {
                continue;
            }
            match self.eval_stmt(stmt)? {
                Flow::Normal(value) => last = value,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn declare_method(&mut self, decl: &MethodDecl) -> Result<()> {
        let declaring = self.scope()?;
        trace!(method = %decl.name, "declaring scripted method");
        self.runtime.define_method(ScriptMethod {
            name: decl.name.clone(),
            params: decl.params.clone(),
            return_type: decl.return_type.clone(),
            body: decl.body.clone(),
            declaring,
        })
    }

    fn void() -> Result<Flow> {
        Ok(Flow::Normal(Value::void()))
    }

    pub fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => Ok(Flow::Normal(self.eval_expr(expr)?)),
            StmtKind::VarDecl { ty, declarators } => {
                let scope = self.scope()?;
                let declared = self.runtime.resolve_type(scope, ty)?;
                for declarator in declarators {
                    let value = match &declarator.initializer {
                        Some(init) => self.eval_expr(init)?,
                        None => declared.default_value(),
                    };
                    let value = dispatch::coerce(self.runtime, &declared, value, Conversion::Assignment)
                        .map_err(|err| err.at(declarator.span, format!("declaration of `{}`", declarator.name)))?;
                    self.runtime
                        .define_variable(scope, &declarator.name, value, Some(declared.clone()))?;
                }
                Self::void()
            }
            StmtKind::Method(decl) => {
                self.declare_method(decl)?;
                Self::void()
            }
            StmtKind::Block(stmts) => self.eval_block(stmts, false),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_condition(condition)? {
                    self.eval_stmt(then_branch)
                } else if let Some(branch) = else_branch {
                    self.eval_stmt(branch)
                } else {
                    Self::void()
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval_condition(condition)? {
                    match self.eval_stmt(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal(_) | Flow::Continue => {}
                    }
                }
                Self::void()
            }
            StmtKind::DoWhile { body, condition } => {
                loop {
                    match self.eval_stmt(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal(_) | Flow::Continue => {}
                    }
                    if !self.eval_condition(condition)? {
                        break;
                    }
                }
                Self::void()
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let parent = self.scope()?;
                self.in_scope("for", ScopeKind::Block, parent, |ev| {
                    for stmt in init {
                        ev.eval_stmt(stmt)?;
                    }
                    loop {
                        if let Some(condition) = condition {
                            if !ev.eval_condition(condition)? {
                                break;
                            }
                        }
                        match ev.eval_stmt(body)? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal(_) | Flow::Continue => {}
                        }
                        for expr in update {
                            ev.eval_expr(expr)?;
                        }
                    }
                    Self::void()
                })
            }
            StmtKind::ForEach {
                ty,
                binding,
                iterable,
                body,
            } => self.eval_for_each(ty.as_ref(), binding, iterable, body),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::void(),
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Import { path, wildcard } => {
                let namespace = self.runtime.namespace(self.scope()?);
                if *wildcard {
                    namespace.import_package(path)?;
                } else {
                    namespace
                        .import_class(path)
                        .map_err(|err| err.at(stmt.span, format!("import `{path}`")))?;
                }
                Self::void()
            }
            StmtKind::Empty => Self::void(),
        }
    }

    fn eval_for_each(
        &mut self,
        ty: Option<&TypeName>,
        binding: &str,
        iterable: &Expr,
        body: &Stmt,
    ) -> Result<Flow> {
        let source = self.eval_expr(iterable)?;
        let items = match source.kind() {
            ValueKind::Array(array) => array.snapshot(),
            ValueKind::String(s) => s.chars().map(Value::from).collect(),
            _ => {
                return Err(SprigError::from(EvalError::new(format!(
                    "cannot iterate over a value of type {}",
                    source.type_name()
                )))
                .at(iterable.span, iterable.describe()));
            }
        };
        let parent = self.scope()?;
        let declared = ty.map(|ty| self.runtime.resolve_type(parent, ty)).transpose()?;
        for item in items {
            let flow = self.in_scope("foreach", ScopeKind::Block, parent, |ev| {
                let frame = ev.scope()?;
                let item = match &declared {
                    Some(ty) => dispatch::coerce(ev.runtime, ty, item, Conversion::Assignment)?,
                    None => item,
                };
                ev.runtime
                    .define_variable(frame, binding, item, declared.clone())?;
                ev.eval_stmt(body)
            })?;
            match flow {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal(_) | Flow::Continue => {}
            }
        }
        Self::void()
    }

    fn eval_condition(&mut self, expr: &Expr) -> Result<bool> {
        let value = self.eval_expr(expr)?;
        value.as_bool().ok_or_else(|| {
            SprigError::from(EvalError::new(format!(
                "condition must be boolean, found {}",
                value.type_name()
            )))
            .at(expr.span, expr.describe())
        })
    }

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        self.eval_expr_kind(expr)
            .map_err(|err| err.at(expr.span, expr.describe()))
    }

    fn eval_expr_kind(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Int(n) => Value::from(*n),
                Literal::Long(n) => Value::from(*n),
                Literal::Float(n) => Value::from(*n),
                Literal::Double(n) => Value::from(*n),
                Literal::Char(c) => Value::from(*c),
                Literal::Bool(b) => Value::from(*b),
                Literal::String(s) => Value::string(s.as_str()),
                Literal::Null => Value::null(),
                Literal::Void => Value::void(),
            }),
            ExprKind::Name(name) => self.resolve_name(name),
            ExprKind::This => self.this_value(),
            ExprKind::Super => self.super_value(),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ExprKind::Unary { op, expr: operand } => {
                let value = self.eval_expr(operand)?;
                let primitive = value.as_primitive().filter(|p| !p.is_null()).ok_or_else(|| {
                    EvalError::new(format!("bad operand type {} for unary operator", value.type_name()))
                })?;
                let result = match op {
                    UnaryOp::Negate => primitive.negate(),
                    UnaryOp::Plus => primitive.unary_plus(),
                    UnaryOp::Not => primitive.not(),
                };
                result.map(Value::from).map_err(|msg| EvalError::new(msg).into())
            }
            ExprKind::Assign { target, op, value } => {
                let lhs = self.lhs_for(target)?;
                let rhs = self.eval_expr(value)?;
                let stored = match op {
                    None => rhs,
                    Some(op) => {
                        let current = lhs.read()?;
                        let combined = self.apply_binary(*op, &current, &rhs)?;
                        match (current.as_primitive(), combined.as_primitive()) {
                            (Some(cur), Some(new)) if !cur.is_null() => new
                                .cast_to(cur.kind())
                                .map(Value::from)
                                .map_err(EvalError::new)?,
                            _ => combined,
                        }
                    }
                };
                lhs.assign(stored)
            }
            ExprKind::PreStep { step, target } => self.eval_step(*step, target, true),
            ExprKind::PostStep { step, target } => self.eval_step(*step, target, false),
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                if self.eval_condition(condition)? {
                    self.eval_expr(then_value)
                } else {
                    self.eval_expr(else_value)
                }
            }
            ExprKind::Call { name, args } => {
                let args = self.eval_args(args)?;
                self.invoke_unqualified(name, args)
            }
            ExprKind::MethodCall { target, name, args } => {
                let receiver = self.eval_expr(target)?;
                let args = self.eval_args(args)?;
                self.invoke_on(&receiver, name, args)
            }
            ExprKind::Field { target, field } => {
                if let Some(path) = expr.qualified_name() {
                    if let Some(value) = self.resolve_class_path(&path)? {
                        return Ok(value);
                    }
                }
                let object = self.eval_expr(target)?;
                self.read_member(&object, field)
            }
            ExprKind::Index { target, index } => {
                let lhs = self.index_lhs(target, index)?;
                lhs.read()
            }
            ExprKind::New { class, args } => {
                let scope = self.scope()?;
                let host_class = self
                    .runtime
                    .lookup_class(scope, &class.name)?
                    .ok_or_else(|| EvalError::new(format!("class `{}` not found", class.name)))?;
                let args = self.eval_args(args)?;
                self.construct(&host_class, args)
            }
            ExprKind::NewArray { element, length } => {
                let element = self.runtime.resolve_type(self.scope()?, element)?;
                let length = self.eval_expr(length)?;
                let length = length
                    .as_primitive()
                    .filter(|p| p.kind().is_integral())
                    .and_then(|p| p.as_i64())
                    .ok_or_else(|| EvalError::new(format!("array length must be an integer, found {}", length.type_name())))?;
                let length = usize::try_from(length)
                    .map_err(|_| EvalError::new(format!("negative array size {length}")))?;
                let items = vec![element.default_value(); length];
                Ok(Value::array(ArrayRef::new(element, items)))
            }
            ExprKind::ArrayInit { element, items } => {
                let element = self.runtime.resolve_type(self.scope()?, element)?;
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.eval_expr(item)?;
                    values.push(dispatch::coerce(self.runtime, &element, value, Conversion::Assignment)?);
                }
                Ok(Value::array(ArrayRef::new(element, values)))
            }
            ExprKind::Cast { ty, expr: operand } => {
                let value = self.eval_expr(operand)?;
                let target = self.runtime.resolve_type(self.scope()?, ty)?;
                dispatch::cast(self.runtime, &target, value)
            }
            ExprKind::Group(inner) => self.eval_expr(inner),
        }
    }

    pub fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval_expr(arg)).collect()
    }

    fn resolve_name(&mut self, name: &str) -> Result<Value> {
        let scope = self.scope()?;
        self.runtime
            .resolve_variable(scope, name)?
            .ok_or_else(|| EvalError::new(format!("undefined symbol `{name}`")).into())
    }

    /// A dotted path whose root is not a variable, read as a class name
    /// followed by static member accesses: `lang.Math.PI`.
    fn resolve_class_path(&mut self, path: &str) -> Result<Option<Value>> {
        let scope = self.scope()?;
        let segments: Vec<&str> = path.split('.').collect();
        if self.runtime.resolve_variable(scope, segments[0])?.is_some() {
            return Ok(None);
        }
        for split in (2..=segments.len()).rev() {
            let class_name = segments[..split].join(".");
            if let Some(class) = self.runtime.lookup_class(scope, &class_name)? {
                let mut value = Value::class(class);
                for member in &segments[split..] {
                    value = self.read_member(&value, member)?;
                }
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn this_value(&mut self) -> Result<Value> {
        let scope = self.runtime.definition_scope(self.scope()?)?;
        self.object_for(scope)
    }

    fn super_value(&mut self) -> Result<Value> {
        let scope = self.runtime.definition_scope(self.scope()?)?;
        let parent = self
            .runtime
            .namespace(scope)
            .parent()?
            .ok_or_else(|| EvalError::new("`super` used in the root namespace"))?;
        let parent = self.runtime.definition_scope(parent.id())?;
        self.object_for(parent)
    }

    fn object_for(&mut self, scope: ScopeId) -> Result<Value> {
        let hold = self.runtime.hold_scope(scope)?;
        let name = self.runtime.scope_name(scope)?;
        Ok(Value::object(ScriptObject::new(hold, name)))
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let lhs = self.eval_condition(left)?;
            if (op == BinaryOp::And) != lhs {
                return Ok(Value::from(lhs));
            }
            return self.eval_condition(right).map(Value::from);
        }
        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;
        self.apply_binary(op, &lhs, &rhs)
    }

    pub fn apply_binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        let is_text = |v: &Value| matches!(v.kind(), ValueKind::String(_));
        if op == BinaryOp::Add && (is_text(lhs) || is_text(rhs)) {
            return Ok(Value::string(format!("{lhs}{rhs}")));
        }
        match (lhs.as_primitive(), rhs.as_primitive()) {
            (Some(a), Some(b)) if !a.is_null() && !b.is_null() => a
                .binary(op, b)
                .map(Value::from)
                .map_err(|msg| EvalError::new(msg).into()),
            _ => match op {
                BinaryOp::Equal => Ok(Value::from(lhs == rhs)),
                BinaryOp::NotEqual => Ok(Value::from(lhs != rhs)),
                _ => Err(EvalError::new(format!(
                    "bad operand types for `{}`: {} and {}",
                    op.symbol(),
                    lhs.type_name(),
                    rhs.type_name()
                ))
                .into()),
            },
        }
    }

    fn eval_step(&mut self, step: Step, target: &Expr, prefix: bool) -> Result<Value> {
        let lhs = self.lhs_for(target)?;
        let current = lhs.read()?;
        let primitive = current
            .as_primitive()
            .filter(|p| p.kind().is_numeric())
            .ok_or_else(|| EvalError::new(format!("bad operand type {} for increment", current.type_name())))?;
        let delta = match step {
            Step::Increment => 1,
            Step::Decrement => -1,
        };
        let next = Value::from(primitive.step(delta).map_err(EvalError::new)?);
        lhs.assign(next.clone())?;
        Ok(if prefix { next } else { current })
    }

    /// Resolves an expression used as an assignment target.
    pub fn lhs_for(&mut self, target: &Expr) -> Result<Lhs> {
        match &target.kind {
            ExprKind::Name(name) => {
                let scope = self.scope()?;
                self.runtime.name_resolver(scope, name)
            }
            ExprKind::Field { target: object, field } => {
                let object = self.eval_expr(object)?;
                self.member_lhs(&object, field)
            }
            ExprKind::Index { target: array, index } => self.index_lhs(array, index),
            ExprKind::Group(inner) => self.lhs_for(inner),
            _ => Err(SprigError::from(EvalError::new("invalid assignment target"))
                .at(target.span, target.describe())),
        }
    }

    fn index_lhs(&mut self, target: &Expr, index: &Expr) -> Result<Lhs> {
        let array = self.eval_expr(target)?;
        let array = array
            .as_array()
            .cloned()
            .ok_or_else(|| EvalError::new(format!("cannot index a value of type {}", array.type_name())))?;
        let index = self.eval_expr(index)?;
        let position = index
            .as_primitive()
            .filter(|p| p.kind().is_integral())
            .and_then(|p| p.as_i64())
            .ok_or_else(|| EvalError::new(format!("array index must be an integer, found {}", index.type_name())))?;
        let index = usize::try_from(position).map_err(|_| {
            EvalError::new(format!("array index {position} out of bounds for length {}", array.len()))
        })?;
        Ok(Lhs::new(self.runtime, LhsTarget::ArrayElement { array, index }))
    }

    fn member_lhs(&mut self, object: &Value, member: &str) -> Result<Lhs> {
        match object.kind() {
            ValueKind::Object(script) => self.runtime.name_resolver(script.scope, member),
            ValueKind::Host(host) => {
                let class = self.runtime.load_class(host.class_name()).ok_or_else(|| {
                    EvalError::new(format!("no class information for {}", host.class_name()))
                })?;
                let target = if class.field_named(member).is_some_and(|f| !f.is_static) {
                    LhsTarget::Field {
                        object: object.clone(),
                        class,
                        field: member.to_string(),
                    }
                } else {
                    LhsTarget::Property {
                        object: object.clone(),
                        class,
                        name: member.to_string(),
                    }
                };
                Ok(Lhs::new(self.runtime, target))
            }
            ValueKind::Class(class) => Ok(Lhs::new(
                self.runtime,
                LhsTarget::StaticField {
                    class: class.clone(),
                    field: member.to_string(),
                },
            )),
            ValueKind::Primitive(Primitive::Null) => {
                Err(EvalError::new(format!("null value has no field `{member}`")).into())
            }
            _ => Err(EvalError::new(format!(
                "a value of type {} has no field `{member}`",
                object.type_name()
            ))
            .into()),
        }
    }

    pub fn read_member(&mut self, object: &Value, member: &str) -> Result<Value> {
        match object.kind() {
            ValueKind::Array(array) if member == "length" => Ok(Value::from(array.len() as i32)),
            ValueKind::Object(script) => self
                .runtime
                .resolve_variable(script.scope, member)?
                .ok_or_else(|| {
                    EvalError::new(format!("no field `{member}` in namespace `{}`", script.name)).into()
                }),
            _ => self.member_lhs(object, member)?.read(),
        }
    }

    /// `eval(text)` from inside a script: units run in the caller's frame.
    pub fn eval_text(&mut self, source: &str, label: Option<&str>) -> Result<Value> {
        crate::runtime::eval_units(self, source, label)
    }
}
