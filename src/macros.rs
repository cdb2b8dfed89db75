//! Macro expansion.
//!
//! Grounded on `original_source/c5c/macros.py`: macros are textual, not
//! hygienic — a call site `name(args)` used as an expression is rewritten by
//! substituting the macro's parameter names for the supplied argument
//! expressions throughout a copy of its body, then, per spec.md §4.4,
//! collapsing a single trailing `return expr;` body down to `expr` so the
//! macro can be used in expression position. A macro whose body is not a
//! single `return` remains usable only in statement position, where its
//! statements are spliced in directly.

use crate::ast::{Decl, Expr, Program, Stmt};
use std::collections::HashMap;

struct MacroDef {
    params: Vec<String>,
    body: Vec<Stmt>,
}

pub struct MacroExpander {
    macros: HashMap<String, MacroDef>,
}

impl MacroExpander {
    pub fn new() -> Self {
        MacroExpander { macros: HashMap::new() }
    }

    /// Expand every macro call site in `program` and drop the `Decl::Macro`
    /// declarations (they have no codegen counterpart once expanded).
    pub fn expand(&mut self, mut program: Program) -> Result<Program, String> {
        self.collect(&program);

        let mut out = Vec::with_capacity(program.decls.len());
        for decl in program.decls.drain(..) {
            match decl {
                Decl::Macro { .. } => {}
                Decl::Func { ret, name, params, body, span } => {
                    let body = self.expand_stmts(body)?;
                    out.push(Decl::Func { ret, name, params, body, span });
                }
                other => out.push(other),
            }
        }
        program.decls = out;
        Ok(program)
    }

    fn collect(&mut self, program: &Program) {
        for decl in &program.decls {
            if let Decl::Macro { name, params, body, .. } = decl {
                self.macros.insert(name.clone(), MacroDef { params: params.clone(), body: body.clone() });
            }
        }
    }

    fn expand_stmts(&self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, String> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.expand_stmt(stmt)?);
        }
        Ok(out)
    }

    /// One statement may expand into several (a macro call used as a
    /// statement splices its whole body in).
    fn expand_stmt(&self, stmt: Stmt) -> Result<Vec<Stmt>, String> {
        let expanded = match stmt {
            Stmt::Expr { expr, span } => {
                if let Expr::Call { target, args, .. } = &expr {
                    if let Expr::Id { name, .. } = target.as_ref() {
                        if let Some(def) = self.macros.get(name) {
                            let args = args
                                .iter()
                                .map(|a| self.expand_expr(a.clone()))
                                .collect::<Result<Vec<_>, _>>()?;
                            return self.instantiate_as_stmts(def, &args, span);
                        }
                    }
                }
                vec![Stmt::Expr { expr: self.expand_expr(expr)?, span }]
            }
            Stmt::VarDecl { ty, name, init, span } => {
                vec![Stmt::VarDecl { ty, name, init: init.map(|e| self.expand_expr(e)).transpose()?, span }]
            }
            Stmt::If { cond, then_branch, else_branch, span } => vec![Stmt::If {
                cond: self.expand_expr(cond)?,
                then_branch: self.expand_stmts(then_branch)?,
                else_branch: else_branch.map(|b| self.expand_stmts(b)).transpose()?,
                span,
            }],
            Stmt::While { cond, body, span } => {
                vec![Stmt::While { cond: self.expand_expr(cond)?, body: self.expand_stmts(body)?, span }]
            }
            Stmt::DoWhile { body, cond, span } => {
                vec![Stmt::DoWhile { body: self.expand_stmts(body)?, cond: self.expand_expr(cond)?, span }]
            }
            Stmt::For { init, cond, step, body, span } => vec![Stmt::For {
                init: init.map(|s| self.expand_stmt_single(*s)).transpose()?.map(Box::new),
                cond: cond.map(|e| self.expand_expr(e)).transpose()?,
                step: step.map(|e| self.expand_expr(e)).transpose()?,
                body: self.expand_stmts(body)?,
                span,
            }],
            Stmt::Foreach { idx, val, iterable, body, span } => vec![Stmt::Foreach {
                idx,
                val,
                iterable: self.expand_expr(iterable)?,
                body: self.expand_stmts(body)?,
                span,
            }],
            Stmt::Switch { scrutinee, cases, default, span } => {
                let mut out_cases = Vec::with_capacity(cases.len());
                for (value, body) in cases {
                    out_cases.push((self.expand_expr(value)?, self.expand_stmts(body)?));
                }
                vec![Stmt::Switch {
                    scrutinee: self.expand_expr(scrutinee)?,
                    cases: out_cases,
                    default: default.map(|b| self.expand_stmts(b)).transpose()?,
                    span,
                }]
            }
            Stmt::Break { span } => vec![Stmt::Break { span }],
            Stmt::Return { value, span } => {
                vec![Stmt::Return { value: value.map(|e| self.expand_expr(e)).transpose()?, span }]
            }
        };
        Ok(expanded)
    }

    /// A single-statement position (for-loop init) cannot splice multiple
    /// statements; a macro call there must expand to exactly one.
    fn expand_stmt_single(&self, stmt: Stmt) -> Result<Stmt, String> {
        let mut expanded = self.expand_stmt(stmt)?;
        if expanded.len() != 1 {
            return Err("macro expansion in for-loop init must produce exactly one statement".to_string());
        }
        Ok(expanded.remove(0))
    }

    fn expand_expr(&self, expr: Expr) -> Result<Expr, String> {
        Ok(match expr {
            Expr::Call { target, args, span } => {
                let args = args.into_iter().map(|a| self.expand_expr(a)).collect::<Result<Vec<_>, _>>()?;
                if let Expr::Id { name, .. } = target.as_ref() {
                    if let Some(def) = self.macros.get(name) {
                        return self.instantiate_as_expr(def, &args, span);
                    }
                }
                Expr::Call { target: Box::new(self.expand_expr(*target)?), args, span }
            }
            Expr::Binary { op, lhs, rhs, span } => Expr::Binary {
                op,
                lhs: Box::new(self.expand_expr(*lhs)?),
                rhs: Box::new(self.expand_expr(*rhs)?),
                span,
            },
            Expr::Unary { op, operand, span } => {
                Expr::Unary { op, operand: Box::new(self.expand_expr(*operand)?), span }
            }
            Expr::Assign { target, value, span } => Expr::Assign {
                target: Box::new(self.expand_expr(*target)?),
                value: Box::new(self.expand_expr(*value)?),
                span,
            },
            Expr::MemberAccess { base, field, span } => {
                Expr::MemberAccess { base: Box::new(self.expand_expr(*base)?), field, span }
            }
            Expr::ArrowAccess { base, field, span } => {
                Expr::ArrowAccess { base: Box::new(self.expand_expr(*base)?), field, span }
            }
            Expr::ArrayAccess { base, index, span } => Expr::ArrayAccess {
                base: Box::new(self.expand_expr(*base)?),
                index: Box::new(self.expand_expr(*index)?),
                span,
            },
            Expr::InitList { elements, span } => {
                let elements = elements.into_iter().map(|e| self.expand_expr(e)).collect::<Result<Vec<_>, _>>()?;
                Expr::InitList { elements, span }
            }
            Expr::Lambda { ret, params, body, span } => {
                Expr::Lambda { ret, params, body: self.expand_stmts(body)?, span }
            }
            leaf => leaf,
        })
    }

    /// Substitute `args` for `def`'s parameters throughout a copy of its
    /// body, collapsing a single `return expr;` body to `expr` (spec.md
    /// §4.4's expression-position rule).
    fn instantiate_as_expr(&self, def: &MacroDef, args: &[Expr], span: crate::ast::Span) -> Result<Expr, String> {
        check_arity(def, args, span)?;
        let bindings = bindings(def, args);
        if let [Stmt::Return { value: Some(value), .. }] = def.body.as_slice() {
            return self.expand_expr(substitute_expr(value, &bindings));
        }
        Err(format!(
            "{}:{}: macro used as an expression must have a single 'return' statement as its body",
            span.line, span.column
        ))
    }

    fn instantiate_as_stmts(&self, def: &MacroDef, args: &[Expr], span: crate::ast::Span) -> Result<Vec<Stmt>, String> {
        check_arity(def, args, span)?;
        let bindings = bindings(def, args);
        let substituted: Vec<Stmt> = def.body.iter().map(|s| substitute_stmt(s, &bindings)).collect();
        self.expand_stmts(substituted)
    }
}

fn check_arity(def: &MacroDef, args: &[Expr], span: crate::ast::Span) -> Result<(), String> {
    if def.params.len() != args.len() {
        return Err(format!(
            "{}:{}: macro expects {} argument(s), got {}",
            span.line,
            span.column,
            def.params.len(),
            args.len()
        ));
    }
    Ok(())
}

fn bindings<'a>(def: &'a MacroDef, args: &'a [Expr]) -> HashMap<&'a str, &'a Expr> {
    def.params.iter().map(String::as_str).zip(args.iter()).collect()
}

fn substitute_expr(expr: &Expr, bindings: &HashMap<&str, &Expr>) -> Expr {
    match expr {
        Expr::Id { name, .. } => {
            if let Some(replacement) = bindings.get(name.as_str()) {
                (*replacement).clone()
            } else {
                expr.clone()
            }
        }
        Expr::Call { target, args, span } => Expr::Call {
            target: Box::new(substitute_expr(target, bindings)),
            args: args.iter().map(|a| substitute_expr(a, bindings)).collect(),
            span: *span,
        },
        Expr::Binary { op, lhs, rhs, span } => Expr::Binary {
            op: *op,
            lhs: Box::new(substitute_expr(lhs, bindings)),
            rhs: Box::new(substitute_expr(rhs, bindings)),
            span: *span,
        },
        Expr::Unary { op, operand, span } => {
            Expr::Unary { op: *op, operand: Box::new(substitute_expr(operand, bindings)), span: *span }
        }
        Expr::Assign { target, value, span } => Expr::Assign {
            target: Box::new(substitute_expr(target, bindings)),
            value: Box::new(substitute_expr(value, bindings)),
            span: *span,
        },
        Expr::MemberAccess { base, field, span } => {
            Expr::MemberAccess { base: Box::new(substitute_expr(base, bindings)), field: field.clone(), span: *span }
        }
        Expr::ArrowAccess { base, field, span } => {
            Expr::ArrowAccess { base: Box::new(substitute_expr(base, bindings)), field: field.clone(), span: *span }
        }
        Expr::ArrayAccess { base, index, span } => Expr::ArrayAccess {
            base: Box::new(substitute_expr(base, bindings)),
            index: Box::new(substitute_expr(index, bindings)),
            span: *span,
        },
        Expr::InitList { elements, span } => {
            Expr::InitList { elements: elements.iter().map(|e| substitute_expr(e, bindings)).collect(), span: *span }
        }
        Expr::Lambda { ret, params, body, span } => Expr::Lambda {
            ret: ret.clone(),
            params: params.clone(),
            body: body.iter().map(|s| substitute_stmt(s, bindings)).collect(),
            span: *span,
        },
        leaf => leaf.clone(),
    }
}

fn substitute_stmt(stmt: &Stmt, bindings: &HashMap<&str, &Expr>) -> Stmt {
    match stmt {
        Stmt::VarDecl { ty, name, init, span } => Stmt::VarDecl {
            ty: ty.clone(),
            name: name.clone(),
            init: init.as_ref().map(|e| substitute_expr(e, bindings)),
            span: *span,
        },
        Stmt::Expr { expr, span } => Stmt::Expr { expr: substitute_expr(expr, bindings), span: *span },
        Stmt::If { cond, then_branch, else_branch, span } => Stmt::If {
            cond: substitute_expr(cond, bindings),
            then_branch: then_branch.iter().map(|s| substitute_stmt(s, bindings)).collect(),
            else_branch: else_branch.as_ref().map(|b| b.iter().map(|s| substitute_stmt(s, bindings)).collect()),
            span: *span,
        },
        Stmt::While { cond, body, span } => Stmt::While {
            cond: substitute_expr(cond, bindings),
            body: body.iter().map(|s| substitute_stmt(s, bindings)).collect(),
            span: *span,
        },
        Stmt::DoWhile { body, cond, span } => Stmt::DoWhile {
            body: body.iter().map(|s| substitute_stmt(s, bindings)).collect(),
            cond: substitute_expr(cond, bindings),
            span: *span,
        },
        Stmt::For { init, cond, step, body, span } => Stmt::For {
            init: init.as_ref().map(|s| Box::new(substitute_stmt(s, bindings))),
            cond: cond.as_ref().map(|e| substitute_expr(e, bindings)),
            step: step.as_ref().map(|e| substitute_expr(e, bindings)),
            body: body.iter().map(|s| substitute_stmt(s, bindings)).collect(),
            span: *span,
        },
        Stmt::Foreach { idx, val, iterable, body, span } => Stmt::Foreach {
            idx: idx.clone(),
            val: val.clone(),
            iterable: substitute_expr(iterable, bindings),
            body: body.iter().map(|s| substitute_stmt(s, bindings)).collect(),
            span: *span,
        },
        Stmt::Switch { scrutinee, cases, default, span } => Stmt::Switch {
            scrutinee: substitute_expr(scrutinee, bindings),
            cases: cases
                .iter()
                .map(|(v, b)| (substitute_expr(v, bindings), b.iter().map(|s| substitute_stmt(s, bindings)).collect()))
                .collect(),
            default: default.as_ref().map(|b| b.iter().map(|s| substitute_stmt(s, bindings)).collect()),
            span: *span,
        },
        Stmt::Break { span } => Stmt::Break { span: *span },
        Stmt::Return { value, span } => {
            Stmt::Return { value: value.as_ref().map(|e| substitute_expr(e, bindings)), span: *span }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn expand(src: &str) -> Program {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        MacroExpander::new().expand(program).unwrap()
    }

    #[test]
    fn expression_macro_substitutes_args() {
        let program = expand(
            "macro square(x) { return x * x; }\nint main() { return square(5); }",
        );
        let Decl::Func { body, .. } = &program.decls[0] else { panic!() };
        let Stmt::Return { value: Some(Expr::Binary { op, lhs, rhs, .. }), .. } = &body[0] else { panic!() };
        assert_eq!(*op, crate::ast::BinOp::Mul);
        assert!(matches!(**lhs, Expr::IntLit { value: 5, .. }));
        assert!(matches!(**rhs, Expr::IntLit { value: 5, .. }));
    }

    #[test]
    fn macro_decl_is_removed_after_expansion() {
        let program = expand("macro id(x) { return x; }\nint main() { return id(1); }");
        assert_eq!(program.decls.len(), 1);
    }

    #[test]
    fn statement_macro_splices_body() {
        let program = expand(
            "macro twice(s) { s; s; }\nint main() { twice(1); return 0; }",
        );
        let Decl::Func { body, .. } = &program.decls[0] else { panic!() };
        // twice(1) splices to two expression statements, then the original return.
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let program = Parser::new("macro add(a, b) { return a + b; }\nint main() { return add(1); }")
            .unwrap()
            .parse_program()
            .unwrap();
        assert!(MacroExpander::new().expand(program).is_err());
    }
}
