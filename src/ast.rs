use std::sync::Arc;

use crate::diagnostics::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Bool(bool),
    String(String),
    Null,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Increment,
    Decrement,
}

/// A declared type: a primitive keyword or a (possibly qualified) class name,
/// with array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub name: String,
    pub dims: usize,
}

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dims: 0,
        }
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeName>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Name(String),
    This,
    Super,
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
    PreStep {
        step: Step,
        target: Box<Expr>,
    },
    PostStep {
        step: Step,
        target: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    MethodCall {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Field {
        target: Box<Expr>,
        field: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    New {
        class: TypeName,
        args: Vec<Expr>,
    },
    NewArray {
        element: TypeName,
        length: Box<Expr>,
    },
    ArrayInit {
        element: TypeName,
        items: Vec<Expr>,
    },
    Cast {
        ty: TypeName,
        expr: Box<Expr>,
    },
    Group(Box<Expr>),
}

impl Expr {
    /// Dotted name spelled by a chain of names and field accesses, e.g. `app.ui.Button`.
    pub fn qualified_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Name(name) => Some(name.clone()),
            ExprKind::Field { target, field } => {
                target.qualified_name().map(|prefix| format!("{prefix}.{field}"))
            }
            _ => None,
        }
    }

    /// Short description used to tag errors with the offending node.
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Literal(_) => "literal".into(),
            ExprKind::Name(name) => format!("`{name}`"),
            ExprKind::This => "`this`".into(),
            ExprKind::Super => "`super`".into(),
            ExprKind::Binary { op, .. } => format!("operator `{}`", op.symbol()),
            ExprKind::Unary { .. } => "unary expression".into(),
            ExprKind::Assign { target, .. } => match target.qualified_name() {
                Some(name) => format!("assignment to `{name}`"),
                None => "assignment".into(),
            },
            ExprKind::PreStep { .. } | ExprKind::PostStep { .. } => "increment".into(),
            ExprKind::Conditional { .. } => "conditional expression".into(),
            ExprKind::Call { name, .. } => format!("method invocation `{name}()`"),
            ExprKind::MethodCall { name, .. } => format!("method invocation `.{name}()`"),
            ExprKind::Field { field, .. } => format!("field access `.{field}`"),
            ExprKind::Index { .. } => "array index".into(),
            ExprKind::New { class, .. } => format!("allocation `new {class}()`"),
            ExprKind::NewArray { element, .. } | ExprKind::ArrayInit { element, .. } => {
                format!("allocation `new {element}[]`")
            }
            ExprKind::Cast { ty, .. } => format!("cast to `{ty}`"),
            ExprKind::Group(inner) => inner.describe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub initializer: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeName>,
    pub body: Arc<Vec<Stmt>>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    VarDecl {
        ty: TypeName,
        declarators: Vec<Declarator>,
    },
    Method(MethodDecl),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        init: Vec<Stmt>,
        condition: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        ty: Option<TypeName>,
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Import {
        path: String,
        wildcard: bool,
    },
    Empty,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}
