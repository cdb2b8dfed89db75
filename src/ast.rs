//! C5's syntax tree.
//!
//! The original implementation represents every node as a heterogeneous
//! tuple tagged by a leading string (`('binop', '+', lhs, rhs, loc)`) with
//! location stripped off the end before codegen. Here each syntactic
//! category gets its own enum, and every node carries a `Span` directly
//! instead of packing it as a trailing tuple element.

use crate::types::Type;

/// Source position a node starts at. 1-based line, 0-based column, matching
/// `original_source/c5c/lexer.py`'s token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Span { line, column }
    }
}

/// A field in a struct declaration.
#[derive(Debug, Clone)]
pub struct Field {
    pub ty: Type,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: Type,
    pub name: String,
}

/// Top-level declarations, plus `include`, which the resolver consumes and
/// removes before anything downstream sees the tree.
#[derive(Debug, Clone)]
pub enum Decl {
    Include { path: String, span: Span },
    Struct { name: String, fields: Vec<Field>, span: Span },
    Enum { name: String, variants: Vec<String>, span: Span },
    /// `type N { T1, T2, ... };` — a tagged-union alias.
    TypeAlias { name: String, members: Vec<Type>, span: Span },
    /// `let` at top level: a public (global) variable.
    PubVar { ty: Type, name: String, init: Option<Expr>, span: Span },
    Extern { ret: Type, name: String, params: Vec<Param>, varargs: bool, span: Span },
    Func { ret: Type, name: String, params: Vec<Param>, body: Vec<Stmt>, span: Span },
    Macro { name: String, params: Vec<String>, body: Vec<Stmt>, span: Span },
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Include { span, .. }
            | Decl::Struct { span, .. }
            | Decl::Enum { span, .. }
            | Decl::TypeAlias { span, .. }
            | Decl::PubVar { span, .. }
            | Decl::Extern { span, .. }
            | Decl::Func { span, .. }
            | Decl::Macro { span, .. } => *span,
        }
    }

    /// The declared name, for every variant that introduces one. Used by the
    /// resolver to rewrite names to `stem::name` on namespacing.
    pub fn name(&self) -> Option<&str> {
        match self {
            Decl::Include { .. } => None,
            Decl::Struct { name, .. }
            | Decl::Enum { name, .. }
            | Decl::TypeAlias { name, .. }
            | Decl::PubVar { name, .. }
            | Decl::Extern { name, .. }
            | Decl::Func { name, .. }
            | Decl::Macro { name, .. } => Some(name),
        }
    }

    pub fn set_name(&mut self, new_name: String) {
        match self {
            Decl::Include { .. } => {}
            Decl::Struct { name, .. }
            | Decl::Enum { name, .. }
            | Decl::TypeAlias { name, .. }
            | Decl::PubVar { name, .. }
            | Decl::Extern { name, .. }
            | Decl::Func { name, .. }
            | Decl::Macro { name, .. } => *name = new_name,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl { ty: Type, name: String, init: Option<Expr>, span: Span },
    Expr { expr: Expr, span: Span },
    If { cond: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>, span: Span },
    While { cond: Expr, body: Vec<Stmt>, span: Span },
    DoWhile { body: Vec<Stmt>, cond: Expr, span: Span },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Expr>, body: Vec<Stmt>, span: Span },
    Foreach { idx: String, val: String, iterable: Expr, body: Vec<Stmt>, span: Span },
    Switch { scrutinee: Expr, cases: Vec<(Expr, Vec<Stmt>)>, default: Option<Vec<Stmt>>, span: Span },
    Break { span: Span },
    Return { value: Option<Expr>, span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Foreach { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Break { span }
            | Stmt::Return { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Leq => "<=",
            BinOp::Geq => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Deref,
    AddrOf,
    Plus,
    Neg,
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit { value: i64, span: Span },
    FloatLit { value: f64, span: Span },
    CharLit { value: i64, span: Span },
    StringLit { value: String, span: Span },
    Id { name: String, span: Span },
    /// `a::b::c` — namespace-qualified reference (enum variant or
    /// namespaced global/function).
    NamespaceAccess { path: Vec<String>, span: Span },
    MemberAccess { base: Box<Expr>, field: String, span: Span },
    ArrowAccess { base: Box<Expr>, field: String, span: Span },
    ArrayAccess { base: Box<Expr>, index: Box<Expr>, span: Span },
    Call { target: Box<Expr>, args: Vec<Expr>, span: Span },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    Unary { op: UnaryOp, operand: Box<Expr>, span: Span },
    Assign { target: Box<Expr>, value: Box<Expr>, span: Span },
    /// `{ e1, e2, ... }` — meaning (array/struct/union literal) resolved by
    /// the analyzer from the enclosing context, per spec.md §4.2.
    InitList { elements: Vec<Expr>, span: Span },
    /// `fnct(params) { body }` — a capture-free lambda lowered to a
    /// top-level function by codegen; see `codegen/runtime.rs`.
    Lambda { ret: Type, params: Vec<Param>, body: Vec<Stmt>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::CharLit { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::Id { span, .. }
            | Expr::NamespaceAccess { span, .. }
            | Expr::MemberAccess { span, .. }
            | Expr::ArrowAccess { span, .. }
            | Expr::ArrayAccess { span, .. }
            | Expr::Call { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Assign { span, .. }
            | Expr::InitList { span, .. }
            | Expr::Lambda { span, .. } => *span,
        }
    }
}

/// The whole program after parsing and include resolution: every `Decl`
/// flattened into one list (includes are consumed by the resolver and do
/// not survive into this list post-resolution).
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
}

impl Program {
    pub fn new() -> Self {
        Program { decls: Vec::new() }
    }

    pub fn find_func(&self, name: &str) -> Option<&Decl> {
        self.decls.iter().find(|d| matches!(d, Decl::Func { name: n, .. } if n == name))
    }

    pub fn structs(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter().filter(|d| matches!(d, Decl::Struct { .. }))
    }

    pub fn funcs(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter().filter(|d| matches!(d, Decl::Func { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decl_name_round_trips_through_set_name() {
        let mut d = Decl::Func {
            ret: Type::INT,
            name: "foo".to_string(),
            params: vec![],
            body: vec![],
            span: Span::new(1, 0),
        };
        assert_eq!(d.name(), Some("foo"));
        d.set_name("std::foo".to_string());
        assert_eq!(d.name(), Some("std::foo"));
    }

    #[test]
    fn include_has_no_name() {
        let d = Decl::Include { path: "std.c5h".to_string(), span: Span::default() };
        assert_eq!(d.name(), None);
    }

    #[test]
    fn program_find_func() {
        let mut p = Program::new();
        p.decls.push(Decl::Func {
            ret: Type::Void,
            name: "main".to_string(),
            params: vec![],
            body: vec![],
            span: Span::default(),
        });
        assert!(p.find_func("main").is_some());
        assert!(p.find_func("nope").is_none());
    }

    #[test]
    fn binop_as_str_matches_source_spelling() {
        assert_eq!(BinOp::Leq.as_str(), "<=");
        assert!(BinOp::Leq.is_comparison());
        assert!(!BinOp::Add.is_comparison());
    }
}
