//! Abstract Syntax Tree consumed by the Ferrule checker
//!
//! The parser lives outside this crate; it hands the checker a `Program`
//! built from these types (directly or as JSON). Expressions carry a unique
//! `NodeId` so their computed types can be reported back to the backend.

pub mod build;
pub mod span;

pub use span::SourceLines;

use crate::diagnostics::Span;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for expression nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Generate a new unique node ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A whole program: every module the checker should see
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub modules: Vec<ModuleNode>,
}

/// A single module (one source file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleNode {
    #[serde(default)]
    pub span: Span,
    pub name: String,
    #[serde(default)]
    pub file_path: PathBuf,
    /// Source text, used to render line context in diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub body: Vec<Stmt>,
}

/// Type expression as written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeExpr {
    /// Builtin or user-defined name (e.g., `int`, `Point`, `geo::Point`)
    Named {
        #[serde(default)]
        span: Span,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
        name: String,
    },
    /// `*T`
    Pointer {
        #[serde(default)]
        span: Span,
        pointee: Box<TypeExpr>,
    },
    /// `[T; N]` or `[T]`
    Array {
        #[serde(default)]
        span: Span,
        element: Box<TypeExpr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Box<Expr>>,
    },
    /// `fn(A, B) -> R`
    Function {
        #[serde(default)]
        span: Span,
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. }
            | TypeExpr::Pointer { span, .. }
            | TypeExpr::Array { span, .. }
            | TypeExpr::Function { span, .. } => *span,
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExprKind {
    // Literals
    Int { value: i64 },
    Float { value: f64 },
    Bool { value: bool },
    Char { value: char },
    Str { value: String },

    // Names
    Ident { name: String },
    /// `alias::name`
    Qualified { module: String, name: String },

    // Operations
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `object.member`
    Member {
        object: Box<Expr>,
        member: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `start..end`, inclusive of both bounds
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
    },

    // Compound
    StructLit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
        name: String,
        fields: Vec<(String, Expr)>,
    },
    ArrayLit {
        elements: Vec<Expr>,
    },

    // Type-directed
    /// `cast<T>(value)`
    Cast {
        ty: TypeExpr,
        value: Box<Expr>,
    },
    /// `sizeof<T>`
    SizeOf {
        ty: TypeExpr,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    /// `*p`
    Deref,
    /// `&x`
    AddrOf,
}

/// A braced statement list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(default)]
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StmtKind {
    /// `let`/`var`/`const` declaration
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    /// `use "module" as alias;`
    Use {
        module: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expr>,
    },
    /// `if`, any number of `elif`, optional `else`
    If {
        branches: Vec<(Expr, Block)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_block: Option<Block>,
    },
    /// `loop`, `loop (cond)`, or `loop (init; cond; step)`
    Loop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Box<Stmt>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cond: Option<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<Expr>,
        body: Block,
    },
    Break,
    Continue,
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Block>,
    },
    /// `defer stmt;`
    Defer {
        stmt: Box<Stmt>,
    },
    Block {
        block: Block,
    },
    Expr {
        expr: Expr,
    },
}

/// Variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Expr>,
    #[serde(default)]
    pub is_mutable: bool,
    #[serde(default)]
    pub is_public: bool,
}

/// Function (or method) declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
    pub body: Block,
    #[serde(default)]
    pub is_public: bool,
    /// `#returns_ownership`
    #[serde(default)]
    pub returns_ownership: bool,
    /// `#takes_ownership`
    #[serde(default)]
    pub takes_ownership: bool,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub span: Span,
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default)]
    pub takes_ownership: bool,
}

/// Struct declaration with data fields and methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    pub fields: Vec<StructField>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    #[serde(default)]
    pub span: Span,
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default)]
    pub is_public: bool,
}

/// A method declared inside a struct body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    #[serde(default)]
    pub span: Span,
    pub decl: FnDecl,
}

/// Enum declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    pub members: Vec<String>,
}

/// One `case a, b: { ... }` arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    #[serde(default)]
    pub span: Span,
    pub values: Vec<Expr>,
    pub body: Block,
}
