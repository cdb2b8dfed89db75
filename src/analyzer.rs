//! Semantic analyzer.
//!
//! Grounded on `original_source/c5c/analyzer.py`: a two-pass walk over the
//! flattened, macro-expanded `Program` — `scan_declarations` collects every
//! function/struct/enum/alias/global signature first (so forward references
//! work), then `analyze` walks every statement and expression checking
//! symbol resolution, type compatibility, integer-literal ranges, and
//! control-flow misuse, collecting diagnostics rather than failing fast.
//!
//! Scoping follows the original exactly: only `func`, `foreach`, and
//! `lambda` push a new scope frame. `if`/`while`/`for`/`switch` bodies
//! declare locals straight into their enclosing function's frame (C5 has no
//! block scoping below function level).

use crate::ast::{BinOp, Decl, Expr, Program, Span, Stmt, UnaryOp};
use crate::diagnostics::{Code, Diagnostic, DiagnosticSink};
use crate::types::Type;
use std::collections::{HashMap, HashSet};

struct FuncInfo {
    ret: Type,
    min_args: usize,
    varargs: bool,
    is_extern: bool,
}

pub struct Analyzer {
    sink: DiagnosticSink,
    scopes: Vec<HashMap<String, Type>>,
    var_spans: HashMap<String, Span>,
    func_spans: HashMap<String, Span>,
    functions: HashMap<String, FuncInfo>,
    structs: HashMap<String, Vec<(Type, String)>>,
    enums: HashMap<String, Vec<String>>,
    aliases: HashMap<String, Vec<Type>>,
    used_vars: HashSet<String>,
    used_funcs: HashSet<String>,
    break_depth: usize,
}

impl Analyzer {
    pub fn new() -> Self {
        let mut used_funcs = HashSet::new();
        used_funcs.insert("main".to_string());
        Analyzer {
            sink: DiagnosticSink::new(),
            scopes: vec![HashMap::new()],
            var_spans: HashMap::new(),
            func_spans: HashMap::new(),
            functions: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            aliases: HashMap::new(),
            used_vars: HashSet::new(),
            used_funcs,
            break_depth: 0,
        }
    }

    /// Run the full analysis, returning the collected diagnostics (both
    /// errors and warnings; the caller decides whether errors block
    /// codegen, per spec.md §7).
    pub fn analyze(mut self, program: &Program) -> Vec<Diagnostic> {
        self.scan_declarations(program);

        if !self.functions.contains_key("main") {
            self.sink.push(
                Diagnostic::error(1, 0, "no entry point: define 'int main()' or 'void main()'")
                    .with_tip("C5 programs require a main function"),
            );
        }

        for decl in &program.decls {
            self.analyze_decl(decl);
        }

        for (name, ty) in &self.scopes[0] {
            if !self.used_vars.contains(name) && !self.functions.contains_key(name) {
                let span = self.var_spans.get(name).copied().unwrap_or_default();
                self.sink.push(
                    Diagnostic::warning(span.line, span.column, format!("variable '{}' ({}) is never used", name, ty))
                        .with_tip("remove it or use it"),
                );
            }
        }
        for name in self.functions.keys() {
            let info = &self.functions[name];
            if !self.used_funcs.contains(name) && name != "main" && !info.is_extern {
                let span = self.func_spans.get(name).copied().unwrap_or_default();
                self.sink.push(
                    Diagnostic::warning(span.line, span.column, format!("function '{}' is never called", name))
                        .with_tip("remove it or call it"),
                );
            }
        }

        self.sink.finalize()
    }

    fn scan_declarations(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Func { ret, name, params, span, .. } => {
                    if self.functions.contains_key(name) {
                        self.error(*span, Code::Redeclaration, format!("function '{}' already declared", name));
                    }
                    self.functions.insert(
                        name.clone(),
                        FuncInfo { ret: ret.clone(), min_args: params.len(), varargs: false, is_extern: false },
                    );
                    self.func_spans.insert(name.clone(), *span);
                }
                Decl::Extern { ret, name, params, varargs, span } => {
                    self.functions.insert(
                        name.clone(),
                        FuncInfo { ret: ret.clone(), min_args: params.len(), varargs: *varargs, is_extern: true },
                    );
                    self.func_spans.insert(name.clone(), *span);
                }
                Decl::Struct { name, fields, .. } => {
                    let members = fields.iter().map(|f| (f.ty.clone(), f.name.clone())).collect();
                    self.structs.insert(name.clone(), members);
                }
                Decl::Enum { name, variants, .. } => {
                    self.enums.insert(name.clone(), variants.clone());
                }
                Decl::TypeAlias { name, members, span } => {
                    if self.aliases.contains_key(name) {
                        self.error(*span, Code::Redeclaration, format!("type alias '{}' already declared", name));
                    }
                    self.aliases.insert(name.clone(), members.clone());
                }
                Decl::PubVar { ty, name, span, .. } => {
                    if self.scopes[0].contains_key(name) {
                        self.error(*span, Code::Redeclaration, format!("'{}' already declared", name));
                    }
                    self.scopes[0].insert(name.clone(), ty.clone());
                    self.var_spans.insert(name.clone(), *span);
                }
                Decl::Include { .. } | Decl::Macro { .. } => {}
            }
        }
    }

    fn error(&mut self, span: Span, code: Code, message: impl Into<String>) {
        debug_assert_eq!(code.severity(), crate::diagnostics::Severity::Error);
        self.sink.push(Diagnostic::error(span.line, span.column, message).with_tip(tip_for(code)));
    }

    fn warn(&mut self, span: Span, code: Code, message: impl Into<String>) {
        debug_assert_eq!(code.severity(), crate::diagnostics::Severity::Warning);
        self.sink.push(Diagnostic::warning(span.line, span.column, message).with_tip(tip_for(code)));
    }

    // ---- declarations ----

    fn analyze_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Func { params, body, span, .. } => {
                self.scopes.push(HashMap::new());
                for p in params {
                    self.declare_local(&p.name, p.ty.clone(), *span);
                }
                for s in body {
                    self.analyze_stmt(s);
                }
                let frame = self.scopes.pop().unwrap();
                self.warn_unused_locals(&frame);
            }
            Decl::PubVar { init: Some(init), .. } => self.analyze_expr(init),
            _ => {}
        }
    }

    fn warn_unused_locals(&mut self, frame: &HashMap<String, Type>) {
        for (name, ty) in frame {
            if !self.used_vars.contains(name) {
                let span = self.var_spans.get(name).copied().unwrap_or_default();
                self.sink.push(
                    Diagnostic::warning(span.line, span.column, format!("variable '{}' ({}) is never used", name, ty))
                        .with_tip("remove it or use it"),
                );
            }
        }
    }

    fn declare_local(&mut self, name: &str, ty: Type, span: Span) {
        self.var_spans.insert(name.to_string(), span);
        self.scopes.last_mut().unwrap().insert(name.to_string(), ty);
    }

    // ---- statements ----

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { ty, name, init, span } => {
                if self.scopes.last().unwrap().contains_key(name) {
                    self.error(*span, Code::Redeclaration, format!("'{}' already declared in this scope", name));
                }
                self.declare_local(name, ty.clone(), *span);
                if let Some(init) = init {
                    self.analyze_expr(init);
                    self.check_initializer(ty, init, *span);
                }
            }
            Stmt::Expr { expr, .. } => self.analyze_expr(expr),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                self.analyze_expr(cond);
                for s in then_branch {
                    self.analyze_stmt(s);
                }
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        self.analyze_stmt(s);
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                self.analyze_expr(cond);
                self.break_depth += 1;
                for s in body {
                    self.analyze_stmt(s);
                }
                self.break_depth -= 1;
            }
            Stmt::DoWhile { body, cond, .. } => {
                self.break_depth += 1;
                for s in body {
                    self.analyze_stmt(s);
                }
                self.break_depth -= 1;
                self.analyze_expr(cond);
            }
            Stmt::For { init, cond, step, body, .. } => {
                if let Some(init) = init {
                    self.analyze_stmt(init);
                }
                self.break_depth += 1;
                if let Some(cond) = cond {
                    self.analyze_expr(cond);
                }
                if let Some(step) = step {
                    self.analyze_expr(step);
                }
                for s in body {
                    self.analyze_stmt(s);
                }
                self.break_depth -= 1;
            }
            Stmt::Foreach { idx, val, iterable, body, span } => {
                self.analyze_expr(iterable);
                let array_ty = self.expr_type(iterable);
                let elem_ty = array_ty.array_elem().unwrap_or(Type::INT);
                self.scopes.push(HashMap::new());
                self.declare_local(idx, Type::INT, *span);
                self.declare_local(val, elem_ty, *span);
                self.break_depth += 1;
                for s in body {
                    self.analyze_stmt(s);
                }
                self.break_depth -= 1;
                let frame = self.scopes.pop().unwrap();
                self.warn_unused_locals(&frame);
            }
            Stmt::Switch { scrutinee, cases, default, span } => {
                self.analyze_expr(scrutinee);
                let cond_ty = self.expr_type(scrutinee);
                let normalized = cond_ty.normalize();
                let is_enum_like = matches!(normalized, Type::Named(n) if self.enums.contains_key(n));
                if !normalized.is_integer() && !is_enum_like {
                    self.error(
                        *span,
                        Code::TypeMismatch,
                        format!("switch condition must be an integer or enum type, not {}", cond_ty),
                    );
                }
                let mut seen_values = HashSet::new();
                for (value, body) in cases {
                    if let Some(v) = literal_int_value(value) {
                        if !seen_values.insert(v) {
                            self.error(value.span(), Code::Redeclaration, format!("duplicate case value {}", v));
                        }
                    }
                    self.break_depth += 1;
                    for s in body {
                        self.analyze_stmt(s);
                    }
                    self.break_depth -= 1;
                }
                if let Some(default) = default {
                    self.break_depth += 1;
                    for s in default {
                        self.analyze_stmt(s);
                    }
                    self.break_depth -= 1;
                }
            }
            Stmt::Break { span } => {
                if self.break_depth == 0 {
                    self.error(*span, Code::ControlFlowMisuse, "'break' outside a loop or switch");
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.analyze_expr(value);
                }
            }
        }
    }

    fn check_initializer(&mut self, ty: &Type, init: &Expr, span: Span) {
        match init {
            Expr::InitList { elements, .. } => self.check_struct_initializer(ty, elements, span),
            Expr::Lambda { .. } => {}
            Expr::IntLit { value, .. } => self.check_int_literal(ty, *value, span),
            Expr::CharLit { value, .. } => self.check_int_literal(ty, *value, span),
            Expr::FloatLit { value, .. } => self.check_float_literal(ty, *value, span),
            _ => {
                if let Some(v) = eval_constant_int(init) {
                    self.check_int_literal(ty, v, span);
                } else {
                    let init_ty = self.expr_type(init);
                    if !self.types_compatible(ty, &init_ty) {
                        self.error(span, Code::TypeMismatch, format!("cannot initialize {} with {}", ty, init_ty));
                    }
                }
            }
        }
    }

    fn check_struct_initializer(&mut self, ty: &Type, elements: &[Expr], span: Span) {
        let Type::Named(name) = ty.normalize() else { return };
        let Some(fields) = self.structs.get(name).cloned() else { return };
        for (i, elem) in elements.iter().enumerate() {
            if i >= fields.len() {
                self.error(span, Code::StructMemberError, format!("too many initializers for struct {}", name));
                break;
            }
            let field_ty = fields[i].0.clone();
            self.check_initializer(&field_ty, elem, span);
        }
    }

    // ---- expressions ----

    fn analyze_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLit { .. } | Expr::FloatLit { .. } | Expr::CharLit { .. } | Expr::StringLit { .. } => {}
            Expr::Id { name, span } => {
                if self.lookup(name).is_some() {
                    self.used_vars.insert(name.clone());
                } else {
                    self.error(*span, Code::UndefinedSymbol, format!("undefined symbol '{}'", name));
                }
            }
            Expr::NamespaceAccess { path, span } => {
                let joined = path.join("::");
                let base = &path[0];
                if self.scopes[0].contains_key(&joined) {
                    self.used_vars.insert(joined);
                } else if self.enums.contains_key(base) || self.enums.contains_key(&joined) {
                    // enum variant reference
                } else if self.functions.contains_key(&joined) {
                    self.used_funcs.insert(joined);
                } else {
                    self.error(*span, Code::EnumNamespaceAccess, format!("unresolved namespace access '{}'", joined));
                }
            }
            Expr::MemberAccess { base, field, span } => {
                self.analyze_expr(base);
                let base_ty = self.expr_type(base);
                if !self.member_access_valid(&base_ty) {
                    self.error(*span, Code::StructMemberError, format!("'.' access on non-struct type {}", base_ty));
                } else {
                    self.check_field_exists(&base_ty, field, *span);
                }
            }
            Expr::ArrowAccess { base, field, span } => {
                self.analyze_expr(base);
                let base_ty = self.expr_type(base);
                if !base_ty.normalize().is_pointer() {
                    self.error(*span, Code::StructMemberError, format!("'->' access on non-pointer type {}", base_ty));
                } else {
                    self.check_field_exists(&base_ty.pointee(), field, *span);
                }
            }
            Expr::ArrayAccess { base, index, .. } => {
                self.analyze_expr(base);
                self.analyze_expr(index);
            }
            Expr::Call { target, args, span } => self.analyze_call(target, args, *span),
            Expr::Binary { op, lhs, rhs, span } => {
                self.analyze_expr(lhs);
                self.analyze_expr(rhs);
                let lhs_ty = self.expr_type(lhs);
                if lhs_ty.normalize().is_string() && !matches!(op, BinOp::Add | BinOp::Sub) {
                    self.error(*span, Code::IllegalStringOp, format!("strings only support + and -, not {}", op.as_str()));
                }
                if matches!(op, BinOp::Div | BinOp::Mod) && literal_int_value(rhs) == Some(0) {
                    self.error(*span, Code::DivisionByZero, "division by a literal zero");
                }
                if matches!(op, BinOp::Add | BinOp::Sub) && literal_int_value(rhs) == Some(0) {
                    self.warn(*span, Code::NeutralArithmetic, format!("redundant {} 0", op.as_str()));
                }
            }
            Expr::Unary { op: UnaryOp::Deref, operand, span } => {
                self.analyze_expr(operand);
                let ty = self.expr_type(operand);
                if !ty.normalize().is_pointer() {
                    self.error(*span, Code::TypeMismatch, format!("cannot dereference non-pointer type {}", ty));
                }
            }
            Expr::Unary { operand, .. } => self.analyze_expr(operand),
            Expr::Assign { target, value, span } => {
                self.analyze_expr(target);
                self.analyze_expr(value);
                let target_ty = self.expr_type(target);
                match value.as_ref() {
                    Expr::IntLit { value, .. } | Expr::CharLit { value, .. } => {
                        self.check_int_literal(&target_ty, *value, *span)
                    }
                    Expr::FloatLit { value, .. } => self.check_float_literal(&target_ty, *value, *span),
                    _ => {
                        let value_ty = self.expr_type(value);
                        if !self.types_compatible(&target_ty, &value_ty) {
                            self.error(*span, Code::TypeMismatch, format!("cannot assign {} to {}", value_ty, target_ty));
                        }
                    }
                }
                if let Expr::Id { name, .. } = target.as_ref() {
                    if self.lookup(name).map(|t| t.is_const()).unwrap_or(false) {
                        self.error(*span, Code::ConstViolation, format!("'{}' is const and cannot be modified", name));
                    }
                }
            }
            Expr::InitList { elements, .. } => {
                for e in elements {
                    self.analyze_expr(e);
                }
            }
            Expr::Lambda { params, body, span, .. } => {
                self.scopes.push(HashMap::new());
                for p in params {
                    self.declare_local(&p.name, p.ty.clone(), *span);
                }
                for s in body {
                    self.analyze_stmt(s);
                }
                let frame = self.scopes.pop().unwrap();
                self.warn_unused_locals(&frame);
            }
        }
    }

    fn analyze_call(&mut self, target: &Expr, args: &[Expr], span: Span) {
        if let Expr::MemberAccess { base, .. } = target {
            self.analyze_expr(base);
            for a in args {
                self.analyze_expr(a);
            }
            return;
        }

        let name = match target {
            Expr::Id { name, .. } => name.clone(),
            Expr::NamespaceAccess { path, .. } => path.join("::"),
            _ => {
                self.analyze_expr(target);
                for a in args {
                    self.analyze_expr(a);
                }
                return;
            }
        };

        let is_func_ptr = matches!(target, Expr::Id { .. }) && self.lookup(&name).is_some();
        if is_func_ptr {
            self.used_vars.insert(name);
        } else if name == "c_str" {
            // built-in, arity unchecked
        } else if let Some(info) = self.functions.get(&name) {
            self.used_funcs.insert(name.clone());
            if args.len() < info.min_args {
                self.error(span, Code::ArityMismatch, format!("'{}' expects at least {} argument(s)", name, info.min_args));
            } else if !info.varargs && args.len() > info.min_args {
                self.error(span, Code::ArityMismatch, format!("'{}' expects exactly {} argument(s)", name, info.min_args));
            }
        } else {
            self.error(span, Code::FunctionNotDeclared, format!("call to undeclared function '{}'", name));
        }
        for a in args {
            self.analyze_expr(a);
        }
    }

    fn member_access_valid(&self, base_ty: &Type) -> bool {
        match base_ty.normalize() {
            Type::Named(name) => self.structs.contains_key(name),
            Type::Array(_) => true,
            Type::Pointer(inner) => matches!(inner.normalize(), Type::Named(n) if self.structs.contains_key(n)),
            _ => false,
        }
    }

    fn check_field_exists(&mut self, struct_ty: &Type, field: &str, span: Span) {
        let Type::Named(name) = struct_ty.normalize() else { return };
        if let Some(fields) = self.structs.get(name) {
            if !fields.iter().any(|(_, n)| n == field) {
                self.error(span, Code::StructMemberError, format!("struct '{}' has no field '{}'", name, field));
            }
        }
    }

    fn check_int_literal(&mut self, ty: &Type, value: i64, span: Span) {
        if let Type::Named(name) = ty.normalize() {
            if let Some(members) = self.aliases.get(name).cloned() {
                let fits = members.iter().any(|m| self.int_literal_fits(m, value));
                if !fits {
                    self.error(span, Code::IntegerOverflow, format!("{} does not fit in any integer member of {}", value, name));
                }
                return;
            }
        }
        if ty.normalize().is_integer() {
            if !self.int_literal_fits(ty, value) {
                let (lo, hi) = int_bounds(ty);
                self.error(span, Code::IntegerOverflow, format!("value {} does not fit in {} (range {}..{})", value, ty, lo, hi));
            }
        } else {
            self.error(span, Code::TypeMismatch, format!("integer literal cannot initialize type {}", ty));
        }
    }

    fn int_literal_fits(&self, ty: &Type, value: i64) -> bool {
        if !ty.normalize().is_integer() {
            return false;
        }
        let (lo, hi) = int_bounds(ty);
        value >= lo && value <= hi
    }

    fn check_float_literal(&mut self, ty: &Type, value: f64, span: Span) {
        if let Type::Named(name) = ty.normalize() {
            if let Some(members) = self.aliases.get(name).cloned() {
                let fits = members.iter().any(|m| match m.normalize() {
                    Type::Float { bits: 64 } => true,
                    Type::Float { bits: 32 } => float32_exact(value),
                    _ => false,
                });
                if !fits {
                    self.error(span, Code::TypeMismatch, format!("float literal {} cannot initialize union {}", value, name));
                }
                return;
            }
        }
        match ty.normalize() {
            Type::Float { bits: 64 } => {}
            Type::Float { bits: 32 } => {
                if !float32_exact(value) {
                    self.warn(span, Code::NarrowingConversion, format!("{} is not exactly representable in float<32>", value));
                }
            }
            other => self.error(span, Code::TypeMismatch, format!("float literal cannot initialize type {}", other)),
        }
    }

    fn types_compatible(&self, target: &Type, source: &Type) -> bool {
        if let Type::Named(name) = target.normalize() {
            if let Some(members) = self.aliases.get(name) {
                return members.iter().any(|m| self.types_compatible(m, source));
            }
        }
        if let Type::Named(name) = source.normalize() {
            if self.aliases.contains_key(name) {
                return false;
            }
        }
        normalize_numeric_width(target.normalize()) == normalize_numeric_width(source.normalize())
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// Mirrors `_get_type`: infer an expression's static type from literals,
    /// scope lookups, and structural rules (pointer arithmetic preserves the
    /// pointer side, unsigned is contagious, etc).
    fn expr_type(&self, expr: &Expr) -> Type {
        match expr {
            Expr::IntLit { .. } => Type::INT,
            Expr::FloatLit { .. } => Type::Float { bits: 64 },
            Expr::CharLit { .. } => Type::CHAR,
            Expr::StringLit { .. } => Type::String,
            Expr::Id { name, .. } => self.lookup(name).cloned().unwrap_or(Type::INT),
            Expr::NamespaceAccess { path, .. } => {
                let joined = path.join("::");
                if let Some(t) = self.scopes[0].get(&joined) {
                    t.clone()
                } else if self.enums.contains_key(&path[0]) {
                    Type::Named(path[0].clone())
                } else if let Some(info) = self.functions.get(&joined) {
                    info.ret.clone()
                } else {
                    Type::INT
                }
            }
            Expr::Unary { op: UnaryOp::AddrOf, operand, .. } => Type::pointer(self.expr_type(operand)),
            Expr::Unary { op: UnaryOp::Deref, operand, .. } => self.expr_type(operand).pointee(),
            Expr::Unary { operand, .. } => self.expr_type(operand),
            Expr::MemberAccess { base, field, .. } => self.field_type(&self.expr_type(base), field),
            Expr::ArrowAccess { base, field, .. } => self.field_type(&self.expr_type(base).pointee(), field),
            Expr::ArrayAccess { base, .. } => {
                let base_ty = self.expr_type(base);
                if let Some(elem) = base_ty.array_elem() {
                    elem
                } else if base_ty.normalize().is_string() || base_ty.normalize().is_pointer() {
                    Type::CHAR
                } else {
                    Type::INT
                }
            }
            Expr::Call { target, .. } => self.call_type(target),
            Expr::Binary { op, lhs, rhs, .. } => self.binary_type(*op, lhs, rhs),
            Expr::Assign { target, .. } => self.expr_type(target),
            Expr::InitList { .. } => Type::INT,
            Expr::Lambda { ret, .. } => ret.clone(),
        }
    }

    fn field_type(&self, base_ty: &Type, field: &str) -> Type {
        let target = match base_ty.normalize() {
            Type::Pointer(inner) => inner.normalize().clone(),
            other => other.clone(),
        };
        if let Type::Named(name) = &target {
            if let Some(fields) = self.structs.get(name) {
                if let Some((ty, _)) = fields.iter().find(|(_, n)| n == field) {
                    return ty.clone();
                }
            }
        }
        Type::INT
    }

    fn call_type(&self, target: &Expr) -> Type {
        if let Expr::MemberAccess { base, field, .. } = target {
            let base_ty = self.expr_type(base);
            if base_ty.normalize().is_array() {
                return match field.as_str() {
                    "length" => Type::INT,
                    "pop" => base_ty.array_elem().unwrap_or(Type::INT),
                    _ => Type::Void,
                };
            }
        }
        let name = match target {
            Expr::Id { name, .. } => name.clone(),
            Expr::NamespaceAccess { path, .. } => path.join("::"),
            _ => return Type::INT,
        };
        if name == "c_str" {
            return Type::pointer(Type::CHAR);
        }
        self.functions.get(&name).map(|f| f.ret.clone()).unwrap_or(Type::INT)
    }

    fn binary_type(&self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Type {
        let lhs_ty = self.expr_type(lhs);
        let rhs_ty = self.expr_type(rhs);
        if lhs_ty.normalize().is_pointer() {
            if rhs_ty.normalize().is_integer() && matches!(op, BinOp::Add | BinOp::Sub) {
                return lhs_ty;
            }
            if rhs_ty.normalize().is_pointer() && op == BinOp::Sub {
                return Type::INT;
            }
        } else if rhs_ty.normalize().is_pointer() && lhs_ty.normalize().is_integer() && op == BinOp::Add {
            return rhs_ty;
        }
        match (lhs_ty.normalize(), rhs_ty.normalize()) {
            (Type::Int { signed: false, .. }, _) => lhs_ty,
            (_, Type::Int { signed: false, bits }) => Type::Int { bits: *bits, signed: false },
            _ => lhs_ty,
        }
    }
}

fn normalize_numeric_width(ty: &Type) -> Type {
    match ty {
        Type::Int { bits: 64, signed } => Type::Int { bits: 64, signed: *signed },
        Type::Float { .. } => Type::Float { bits: 64 },
        other => other.clone(),
    }
}

fn int_bounds(ty: &Type) -> (i64, i64) {
    match ty.normalize() {
        Type::Int { bits, signed } => crate::types::int_range(*bits, *signed),
        _ => (i64::MIN, i64::MAX),
    }
}

fn float32_exact(value: f64) -> bool {
    (value as f32) as f64 == value
}

fn literal_int_value(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::IntLit { value, .. } | Expr::CharLit { value, .. } => Some(*value),
        _ => None,
    }
}

/// A small constant-integer evaluator used only to range-check initializers
/// at analysis time; the AST-rewriting constant folder used by codegen lives
/// in `fold.rs` and is intentionally separate, mirroring
/// `analyzer.py::_eval_constant_int` being distinct from `optimizer.py`.
fn eval_constant_int(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::IntLit { value, .. } => Some(*value),
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = eval_constant_int(lhs)?;
            let r = eval_constant_int(rhs)?;
            match op {
                BinOp::Add => l.checked_add(r),
                BinOp::Sub => l.checked_sub(r),
                BinOp::Mul => l.checked_mul(r),
                BinOp::Div if r != 0 => Some(l / r),
                BinOp::Mod if r != 0 => Some(l % r),
                _ => None,
            }
        }
        _ => None,
    }
}

fn tip_for(code: Code) -> &'static str {
    use Code::*;
    match code {
        UndefinedSymbol => "check the spelling or declare it before use",
        TypeMismatch => "convert one side to match the other",
        IntegerOverflow => "use a wider type or a smaller literal",
        DivisionByZero => "guard the divisor before dividing",
        FunctionNotDeclared => "declare or include the function before calling it",
        Redeclaration => "rename one of the conflicting declarations",
        StructMemberError => "check the struct's field list",
        EnumNamespaceAccess => "check the enum or namespace name",
        IllegalStringOp => "strings only support + and -",
        ConstViolation => "const variables can't be reassigned",
        ArityMismatch => "match the call to the function's parameter list",
        MissingEntry => "add a main function",
        ControlFlowMisuse => "break only makes sense inside a loop or switch",
        UnusedSymbol => "remove it or use it",
        NeutralArithmetic => "this operation has no effect",
        NarrowingConversion => "the value may lose precision",
        WastedExpression => "the result of this expression is discarded",
        UnreachableCode => "this code can never run",
        EmptyControlledBody => "this control statement has nothing to do",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn diagnostics(src: &str) -> Vec<Diagnostic> {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        Analyzer::new().analyze(&program)
    }

    #[test]
    fn undefined_symbol_is_an_error() {
        let ds = diagnostics("int main() { return y; }");
        assert!(ds.iter().any(|d| d.message.contains("undefined symbol")));
    }

    #[test]
    fn integer_overflow_is_detected() {
        let ds = diagnostics("int main() { int<8> x = 200; return 0; }");
        assert!(ds.iter().any(|d| d.message.contains("does not fit")));
    }

    #[test]
    fn division_by_zero_literal_is_an_error() {
        let ds = diagnostics("int main() { return 1 / 0; }");
        assert!(ds.iter().any(|d| d.message.contains("division by a literal zero")));
    }

    #[test]
    fn unused_local_is_a_warning() {
        let ds = diagnostics("int main() { int x = 1; return 0; }");
        assert!(ds.iter().any(|d| d.message.contains("is never used")));
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let ds = diagnostics("int main() { break; return 0; }");
        assert!(ds.iter().any(|d| d.message.contains("'break'")));
    }

    #[test]
    fn missing_main_is_an_error() {
        let ds = diagnostics("int helper() { return 0; }");
        assert!(ds.iter().any(|d| d.message.contains("no entry point")));
    }

    #[test]
    fn struct_field_access_is_checked() {
        let ds = diagnostics("struct P { int x; };\nint main() { P p; return p.y; }");
        assert!(ds.iter().any(|d| d.message.contains("no field 'y'")));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let ds = diagnostics("int f(int a) { return a; }\nint main() { return f(1, 2); }");
        assert!(ds.iter().any(|d| d.message.contains("expects exactly")));
    }
}
