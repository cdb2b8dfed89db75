//! Constant folding.
//!
//! Grounded on `original_source/c5c/optimizer.py::Optimizer._opt_ast`: a
//! recursive rewrite that collapses a `binop` of two integer literals into a
//! single literal, applied once to the whole tree before codegen (codegen
//! itself does not special-case this; it sees either a literal or a real
//! computation). The original also strips source-location data off each
//! node tuple in this same pass; since this tree carries `Span` on typed
//! fields rather than a trailing tuple element, there is nothing to strip
//! here, so this module is folding-only.

use crate::ast::{BinOp, Decl, Expr, Program, Stmt};

pub fn fold_program(mut program: Program) -> Program {
    for decl in &mut program.decls {
        fold_decl(decl);
    }
    program
}

fn fold_decl(decl: &mut Decl) {
    match decl {
        Decl::Func { body, .. } | Decl::Macro { body, .. } => fold_stmts(body),
        Decl::PubVar { init: Some(init), .. } => fold_expr_in_place(init),
        _ => {}
    }
}

fn fold_stmts(stmts: &mut [Stmt]) {
    for s in stmts {
        fold_stmt(s);
    }
}

fn fold_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::VarDecl { init: Some(init), .. } => fold_expr_in_place(init),
        Stmt::VarDecl { init: None, .. } => {}
        Stmt::Expr { expr, .. } => fold_expr_in_place(expr),
        Stmt::If { cond, then_branch, else_branch, .. } => {
            fold_expr_in_place(cond);
            fold_stmts(then_branch);
            if let Some(else_branch) = else_branch {
                fold_stmts(else_branch);
            }
        }
        Stmt::While { cond, body, .. } => {
            fold_expr_in_place(cond);
            fold_stmts(body);
        }
        Stmt::DoWhile { body, cond, .. } => {
            fold_stmts(body);
            fold_expr_in_place(cond);
        }
        Stmt::For { init, cond, step, body, .. } => {
            if let Some(init) = init {
                fold_stmt(init);
            }
            if let Some(cond) = cond {
                fold_expr_in_place(cond);
            }
            if let Some(step) = step {
                fold_expr_in_place(step);
            }
            fold_stmts(body);
        }
        Stmt::Foreach { iterable, body, .. } => {
            fold_expr_in_place(iterable);
            fold_stmts(body);
        }
        Stmt::Switch { scrutinee, cases, default, .. } => {
            fold_expr_in_place(scrutinee);
            for (value, body) in cases {
                fold_expr_in_place(value);
                fold_stmts(body);
            }
            if let Some(default) = default {
                fold_stmts(default);
            }
        }
        Stmt::Break { .. } => {}
        Stmt::Return { value: Some(value), .. } => fold_expr_in_place(value),
        Stmt::Return { value: None, .. } => {}
    }
}

fn fold_expr_in_place(expr: &mut Expr) {
    let placeholder = Expr::IntLit { value: 0, span: expr.span() };
    let taken = std::mem::replace(expr, placeholder);
    *expr = fold_expr(taken);
}

/// Recursively fold `expr`, collapsing integer-literal binops bottom-up.
fn fold_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Binary { op, lhs, rhs, span } => {
            let lhs = fold_expr(*lhs);
            let rhs = fold_expr(*rhs);
            if let (Expr::IntLit { value: l, .. }, Expr::IntLit { value: r, .. }) = (&lhs, &rhs) {
                if let Some(folded) = fold_int_binop(op, *l, *r) {
                    return Expr::IntLit { value: folded, span };
                }
            }
            Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span }
        }
        Expr::Unary { op, operand, span } => Expr::Unary { op, operand: Box::new(fold_expr(*operand)), span },
        Expr::Assign { target, value, span } => {
            Expr::Assign { target: Box::new(fold_expr(*target)), value: Box::new(fold_expr(*value)), span }
        }
        Expr::MemberAccess { base, field, span } => {
            Expr::MemberAccess { base: Box::new(fold_expr(*base)), field, span }
        }
        Expr::ArrowAccess { base, field, span } => {
            Expr::ArrowAccess { base: Box::new(fold_expr(*base)), field, span }
        }
        Expr::ArrayAccess { base, index, span } => {
            Expr::ArrayAccess { base: Box::new(fold_expr(*base)), index: Box::new(fold_expr(*index)), span }
        }
        Expr::Call { target, args, span } => {
            Expr::Call { target: Box::new(fold_expr(*target)), args: args.into_iter().map(fold_expr).collect(), span }
        }
        Expr::InitList { elements, span } => {
            Expr::InitList { elements: elements.into_iter().map(fold_expr).collect(), span }
        }
        Expr::Lambda { ret, params, mut body, span } => {
            fold_stmts(&mut body);
            Expr::Lambda { ret, params, body, span }
        }
        leaf @ (Expr::IntLit { .. }
        | Expr::FloatLit { .. }
        | Expr::CharLit { .. }
        | Expr::StringLit { .. }
        | Expr::Id { .. }
        | Expr::NamespaceAccess { .. }) => leaf,
    }
}

/// Mirrors the operator subset `_opt_ast` folds: `+ - * /` and the six
/// comparisons, collapsed to `1`/`0`. Division by zero is left unfolded so
/// the analyzer's diagnostic (not a folding-time panic) is what the user
/// sees.
fn fold_int_binop(op: BinOp, l: i64, r: i64) -> Option<i64> {
    match op {
        BinOp::Add => l.checked_add(r),
        BinOp::Sub => l.checked_sub(r),
        BinOp::Mul => l.checked_mul(r),
        BinOp::Div if r != 0 => Some(l / r),
        BinOp::Mod if r != 0 => Some(l % r),
        BinOp::Div | BinOp::Mod => None,
        BinOp::Eq => Some((l == r) as i64),
        BinOp::Neq => Some((l != r) as i64),
        BinOp::Lt => Some((l < r) as i64),
        BinOp::Gt => Some((l > r) as i64),
        BinOp::Leq => Some((l <= r) as i64),
        BinOp::Geq => Some((l >= r) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn fold_src(src: &str) -> Program {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        fold_program(program)
    }

    #[test]
    fn folds_arithmetic_binop() {
        let program = fold_src("int main() { return 2 + 3 * 4; }");
        let Decl::Func { body, .. } = program.find_func("main").unwrap() else { unreachable!() };
        let Stmt::Return { value: Some(Expr::IntLit { value, .. }), .. } = &body[0] else {
            panic!("expected folded literal return, got {:?}", body[0])
        };
        assert_eq!(*value, 14);
    }

    #[test]
    fn folds_comparison_to_zero_or_one() {
        let program = fold_src("int main() { return 3 < 5; }");
        let Decl::Func { body, .. } = program.find_func("main").unwrap() else { unreachable!() };
        let Stmt::Return { value: Some(Expr::IntLit { value, .. }), .. } = &body[0] else {
            panic!("expected folded literal return, got {:?}", body[0])
        };
        assert_eq!(*value, 1);
    }

    #[test]
    fn leaves_division_by_literal_zero_unfolded() {
        let program = fold_src("int main() { return 1 / 0; }");
        let Decl::Func { body, .. } = program.find_func("main").unwrap() else { unreachable!() };
        assert!(matches!(&body[0], Stmt::Return { value: Some(Expr::Binary { .. }), .. }));
    }

    #[test]
    fn folds_nested_expressions_inside_if() {
        let program = fold_src("int main() { if (1 + 1 == 2) { return 1 + 1; } return 0; }");
        let Decl::Func { body, .. } = program.find_func("main").unwrap() else { unreachable!() };
        let Stmt::If { cond, then_branch, .. } = &body[0] else { panic!("expected if") };
        assert!(matches!(cond, Expr::IntLit { value: 1, .. }));
        assert!(matches!(&then_branch[0], Stmt::Return { value: Some(Expr::IntLit { value: 2, .. }), .. }));
    }
}
