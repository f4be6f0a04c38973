//! Convenience constructors for building ASTs in code
//!
//! Used by embedding front ends and by the test suites. `module` stamps line
//! numbers onto any node that has none: statements get consecutive lines in
//! source order and expressions inherit the line of their statement.

use super::*;

pub fn program(modules: Vec<ModuleNode>) -> Program {
    Program { modules }
}

/// A module whose file path is `<name>.fe` and whose lines are numbered
pub fn module(name: &str, body: Vec<Stmt>) -> ModuleNode {
    let mut body = body;
    let mut next = 1;
    number_stmts(&mut body, &mut next);
    ModuleNode {
        span: Span::point(1, 1),
        name: name.to_string(),
        file_path: PathBuf::from(format!("{}.fe", name)),
        source: None,
        body,
    }
}

impl ModuleNode {
    /// Attach source text for line context in diagnostics
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// =========================================================================
// Types
// =========================================================================

pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::Named {
        span: Span::default(),
        module: None,
        name: name.to_string(),
    }
}

pub fn qualified_ty(module: &str, name: &str) -> TypeExpr {
    TypeExpr::Named {
        span: Span::default(),
        module: Some(module.to_string()),
        name: name.to_string(),
    }
}

pub fn ptr(pointee: TypeExpr) -> TypeExpr {
    TypeExpr::Pointer {
        span: Span::default(),
        pointee: Box::new(pointee),
    }
}

pub fn array_ty(element: TypeExpr, size: Option<i64>) -> TypeExpr {
    TypeExpr::Array {
        span: Span::default(),
        element: Box::new(element),
        size: size.map(|n| Box::new(int(n))),
    }
}

pub fn fn_ty(params: Vec<TypeExpr>, ret: TypeExpr) -> TypeExpr {
    TypeExpr::Function {
        span: Span::default(),
        params,
        ret: Box::new(ret),
    }
}

// =========================================================================
// Expressions
// =========================================================================

pub fn expr(kind: ExprKind) -> Expr {
    Expr {
        id: NodeId::new(),
        span: Span::default(),
        kind,
    }
}

pub fn int(value: i64) -> Expr {
    expr(ExprKind::Int { value })
}

pub fn float(value: f64) -> Expr {
    expr(ExprKind::Float { value })
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::Bool { value })
}

pub fn ch(value: char) -> Expr {
    expr(ExprKind::Char { value })
}

pub fn string(value: &str) -> Expr {
    expr(ExprKind::Str {
        value: value.to_string(),
    })
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::Ident {
        name: name.to_string(),
    })
}

pub fn qualified(module: &str, name: &str) -> Expr {
    expr(ExprKind::Qualified {
        module: module.to_string(),
        name: name.to_string(),
    })
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn deref(operand: Expr) -> Expr {
    unary(UnaryOp::Deref, operand)
}

pub fn addr_of(operand: Expr) -> Expr {
    unary(UnaryOp::AddrOf, operand)
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
    })
}

pub fn member(object: Expr, name: &str) -> Expr {
    expr(ExprKind::Member {
        object: Box::new(object),
        member: name.to_string(),
    })
}

pub fn index(object: Expr, idx: Expr) -> Expr {
    expr(ExprKind::Index {
        object: Box::new(object),
        index: Box::new(idx),
    })
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    expr(ExprKind::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn range(start: Expr, end: Expr) -> Expr {
    expr(ExprKind::Range {
        start: Box::new(start),
        end: Box::new(end),
    })
}

pub fn struct_lit(name: &str, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::StructLit {
        module: None,
        name: name.to_string(),
        fields: fields
            .into_iter()
            .map(|(n, e)| (n.to_string(), e))
            .collect(),
    })
}

pub fn array_lit(elements: Vec<Expr>) -> Expr {
    expr(ExprKind::ArrayLit { elements })
}

pub fn cast(ty: TypeExpr, value: Expr) -> Expr {
    expr(ExprKind::Cast {
        ty,
        value: Box::new(value),
    })
}

pub fn size_of(ty: TypeExpr) -> Expr {
    expr(ExprKind::SizeOf { ty })
}

/// `alloc(size)`
pub fn alloc(size: i64) -> Expr {
    call(ident("alloc"), vec![int(size)])
}

/// `cast<*T>(alloc(size))`
pub fn alloc_as(pointee: TypeExpr, size: i64) -> Expr {
    cast(ptr(pointee), alloc(size))
}

/// `free(name);`
pub fn free(name: &str) -> Stmt {
    expr_stmt(call(ident("free"), vec![ident(name)]))
}

// =========================================================================
// Statements
// =========================================================================

pub fn stmt(kind: StmtKind) -> Stmt {
    Stmt {
        span: Span::default(),
        kind,
    }
}

/// Mutable variable declaration
pub fn var(name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
    stmt(StmtKind::Var(VarDecl {
        name: name.to_string(),
        ty,
        value,
        is_mutable: true,
        is_public: false,
    }))
}

/// Mutable variable with an initializer
pub fn let_(name: &str, ty: Option<TypeExpr>, value: Expr) -> Stmt {
    var(name, ty, Some(value))
}

/// Immutable declaration
pub fn const_(name: &str, ty: Option<TypeExpr>, value: Expr) -> Stmt {
    stmt(StmtKind::Var(VarDecl {
        name: name.to_string(),
        ty,
        value: Some(value),
        is_mutable: false,
        is_public: false,
    }))
}

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr { expr: e })
}

pub fn ret(value: Option<Expr>) -> Stmt {
    stmt(StmtKind::Return { value })
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block {
        span: Span::default(),
        stmts,
    }
}

pub fn block_stmt(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block {
        block: block(stmts),
    })
}

pub fn if_(branches: Vec<(Expr, Vec<Stmt>)>, else_block: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::If {
        branches: branches
            .into_iter()
            .map(|(cond, body)| (cond, block(body)))
            .collect(),
        else_block: else_block.map(block),
    })
}

pub fn while_(cond: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Loop {
        init: None,
        cond: Some(cond),
        step: None,
        body: block(body),
    })
}

pub fn for_(init: Stmt, cond: Expr, step: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Loop {
        init: Some(Box::new(init)),
        cond: Some(cond),
        step: Some(step),
        body: block(body),
    })
}

pub fn break_() -> Stmt {
    stmt(StmtKind::Break)
}

pub fn continue_() -> Stmt {
    stmt(StmtKind::Continue)
}

pub fn switch(scrutinee: Expr, cases: Vec<SwitchCase>, default: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::Switch {
        scrutinee,
        cases,
        default: default.map(block),
    })
}

pub fn case(values: Vec<Expr>, body: Vec<Stmt>) -> SwitchCase {
    SwitchCase {
        span: Span::default(),
        values,
        body: block(body),
    }
}

pub fn defer(inner: Stmt) -> Stmt {
    stmt(StmtKind::Defer {
        stmt: Box::new(inner),
    })
}

/// `use "module";` or `use "module" as alias;`
pub fn use_(module: &str, alias: Option<&str>) -> Stmt {
    stmt(StmtKind::Use {
        module: module.to_string(),
        alias: alias.map(str::to_string),
    })
}

// =========================================================================
// Declarations
// =========================================================================

pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        span: Span::default(),
        name: name.to_string(),
        ty,
        takes_ownership: false,
    }
}

impl Param {
    /// Mark the parameter `#takes_ownership`
    pub fn owned(mut self) -> Self {
        self.takes_ownership = true;
        self
    }
}

pub fn func(name: &str, params: Vec<Param>, return_type: TypeExpr, body: Vec<Stmt>) -> FnDecl {
    FnDecl {
        name: name.to_string(),
        params,
        return_type,
        body: block(body),
        is_public: false,
        returns_ownership: false,
        takes_ownership: false,
    }
}

impl FnDecl {
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Mark the function `#returns_ownership`
    pub fn returns_ownership(mut self) -> Self {
        self.returns_ownership = true;
        self
    }

    /// Mark the function `#takes_ownership`
    pub fn takes_ownership(mut self) -> Self {
        self.takes_ownership = true;
        self
    }

    pub fn stmt(self) -> Stmt {
        stmt(StmtKind::Fn(self))
    }
}

pub fn field(name: &str, ty: TypeExpr) -> StructField {
    StructField {
        span: Span::default(),
        name: name.to_string(),
        ty,
        is_public: false,
    }
}

impl StructField {
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }
}

pub fn method(decl: FnDecl) -> Method {
    Method {
        span: Span::default(),
        decl,
    }
}

pub fn struct_decl(name: &str, fields: Vec<StructField>, methods: Vec<Method>) -> StructDecl {
    StructDecl {
        name: name.to_string(),
        is_public: false,
        fields,
        methods,
    }
}

impl StructDecl {
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn stmt(self) -> Stmt {
        stmt(StmtKind::Struct(self))
    }
}

pub fn enum_decl(name: &str, members: &[&str]) -> EnumDecl {
    EnumDecl {
        name: name.to_string(),
        is_public: false,
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

impl EnumDecl {
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn stmt(self) -> Stmt {
        stmt(StmtKind::Enum(self))
    }
}

impl Stmt {
    /// Pin the statement to a source line
    pub fn at(mut self, line: usize) -> Self {
        self.span = Span::point(line, 1);
        self
    }
}

// =========================================================================
// Line numbering
// =========================================================================

fn number_stmts(stmts: &mut [Stmt], next: &mut usize) {
    for stmt in stmts {
        number_stmt(stmt, next);
    }
}

fn number_stmt(stmt: &mut Stmt, next: &mut usize) {
    if stmt.span.line == 0 {
        stmt.span = Span::point(*next, 1);
    }
    *next = (*next).max(stmt.span.line + 1);
    let line = stmt.span.line;

    match &mut stmt.kind {
        StmtKind::Var(decl) => {
            if let Some(t) = &mut decl.ty {
                stamp_type(t, line);
            }
            if let Some(v) = &mut decl.value {
                stamp_expr(v, line);
            }
        }
        StmtKind::Fn(decl) => number_fn(decl, line, next),
        StmtKind::Struct(decl) => {
            for f in &mut decl.fields {
                if f.span.line == 0 {
                    f.span = Span::point(*next, 1);
                    *next += 1;
                }
                stamp_type(&mut f.ty, f.span.line);
            }
            for m in &mut decl.methods {
                if m.span.line == 0 {
                    m.span = Span::point(*next, 1);
                    *next += 1;
                }
                let method_line = m.span.line;
                number_fn(&mut m.decl, method_line, next);
            }
        }
        StmtKind::Enum(_)
        | StmtKind::Use { .. }
        | StmtKind::Break
        | StmtKind::Continue => {}
        StmtKind::Return { value } => {
            if let Some(v) = value {
                stamp_expr(v, line);
            }
        }
        StmtKind::If {
            branches,
            else_block,
        } => {
            for (cond, body) in branches {
                stamp_expr(cond, line);
                number_block(body, next);
            }
            if let Some(body) = else_block {
                number_block(body, next);
            }
        }
        StmtKind::Loop {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                init.span = Span::point(line, 1);
                number_inner(init, line, next);
            }
            if let Some(c) = cond {
                stamp_expr(c, line);
            }
            if let Some(s) = step {
                stamp_expr(s, line);
            }
            number_block(body, next);
        }
        StmtKind::Switch {
            scrutinee,
            cases,
            default,
        } => {
            stamp_expr(scrutinee, line);
            for case in cases {
                if case.span.line == 0 {
                    case.span = Span::point(*next, 1);
                    *next += 1;
                }
                for v in &mut case.values {
                    stamp_expr(v, case.span.line);
                }
                number_block(&mut case.body, next);
            }
            if let Some(body) = default {
                number_block(body, next);
            }
        }
        StmtKind::Defer { stmt: inner } => {
            inner.span = Span::point(line, 1);
            number_inner(inner, line, next);
        }
        StmtKind::Block { block } => number_block(block, next),
        StmtKind::Expr { expr } => stamp_expr(expr, line),
    }
}

/// Number a statement that shares its parent's line
fn number_inner(stmt: &mut Stmt, line: usize, next: &mut usize) {
    let saved = *next;
    *next = line;
    number_stmt(stmt, next);
    *next = (*next).max(saved);
}

fn number_fn(decl: &mut FnDecl, line: usize, next: &mut usize) {
    for p in &mut decl.params {
        if p.span.line == 0 {
            p.span = Span::new(line, 1, p.name.len().max(1));
        }
        stamp_type(&mut p.ty, line);
    }
    stamp_type(&mut decl.return_type, line);
    number_block(&mut decl.body, next);
}

fn number_block(block: &mut Block, next: &mut usize) {
    if block.span.line == 0 {
        block.span = Span::point(*next, 1);
    }
    number_stmts(&mut block.stmts, next);
}

fn stamp_type(ty: &mut TypeExpr, line: usize) {
    match ty {
        TypeExpr::Named { span, name, .. } => {
            if span.line == 0 {
                *span = Span::new(line, 1, name.len().max(1));
            }
        }
        TypeExpr::Pointer { span, pointee } => {
            if span.line == 0 {
                *span = Span::point(line, 1);
            }
            stamp_type(pointee, line);
        }
        TypeExpr::Array {
            span,
            element,
            size,
        } => {
            if span.line == 0 {
                *span = Span::point(line, 1);
            }
            stamp_type(element, line);
            if let Some(size) = size {
                stamp_expr(size, line);
            }
        }
        TypeExpr::Function { span, params, ret } => {
            if span.line == 0 {
                *span = Span::point(line, 1);
            }
            for p in params {
                stamp_type(p, line);
            }
            stamp_type(ret, line);
        }
    }
}

fn stamp_expr(e: &mut Expr, line: usize) {
    if e.span.line == 0 {
        let length = match &e.kind {
            ExprKind::Ident { name } => name.len(),
            _ => 1,
        };
        e.span = Span::new(line, 1, length.max(1));
    }

    match &mut e.kind {
        ExprKind::Int { .. }
        | ExprKind::Float { .. }
        | ExprKind::Bool { .. }
        | ExprKind::Char { .. }
        | ExprKind::Str { .. }
        | ExprKind::Ident { .. }
        | ExprKind::Qualified { .. } => {}
        ExprKind::Binary { lhs, rhs, .. } => {
            stamp_expr(lhs, line);
            stamp_expr(rhs, line);
        }
        ExprKind::Unary { operand, .. } => stamp_expr(operand, line),
        ExprKind::Call { callee, args } => {
            stamp_expr(callee, line);
            for a in args {
                stamp_expr(a, line);
            }
        }
        ExprKind::Member { object, .. } => stamp_expr(object, line),
        ExprKind::Index { object, index } => {
            stamp_expr(object, line);
            stamp_expr(index, line);
        }
        ExprKind::Assign { target, value } => {
            stamp_expr(target, line);
            stamp_expr(value, line);
        }
        ExprKind::Range { start, end } => {
            stamp_expr(start, line);
            stamp_expr(end, line);
        }
        ExprKind::StructLit { fields, .. } => {
            for (_, v) in fields {
                stamp_expr(v, line);
            }
        }
        ExprKind::ArrayLit { elements } => {
            for el in elements {
                stamp_expr(el, line);
            }
        }
        ExprKind::Cast { ty, value } => {
            stamp_type(ty, line);
            stamp_expr(value, line);
        }
        ExprKind::SizeOf { ty } => stamp_type(ty, line),
    }
}
