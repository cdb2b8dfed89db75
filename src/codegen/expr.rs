//! Expression code generation.
//!
//! Grounded on `original_source/c5c/codegen.py::gen_expr`: every expression
//! leaves its value in `%rax` (integers, pointers, chars, strings) or
//! `%xmm0` (floats); callers that need the value elsewhere move it out
//! before it can be clobbered. `%r11` is reserved across an expression's
//! evaluation for an in-progress lvalue address (set by `lvalue()` in
//! `lvalue.rs`); this module only touches it to consume one, never to hold
//! one across a nested call.

use super::error::{CgResult, CodegenError};
use super::lvalue::{Location, Lvalue};
use super::state::CodeGen;
use crate::ast::{BinOp, Expr, UnaryOp};
use crate::types::Type;

const INT_ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
const FLOAT_ARG_REGS: [&str; 8] =
    ["%xmm0", "%xmm1", "%xmm2", "%xmm3", "%xmm4", "%xmm5", "%xmm6", "%xmm7"];

impl CodeGen {
    /// Generate code for `expr`, leaving its value in `%rax`/`%xmm0`, and
    /// return its static type.
    pub(super) fn gen_expr(&mut self, expr: &Expr) -> CgResult<Type> {
        match expr {
            Expr::IntLit { value, .. } => {
                self.text.push(format!("    mov ${}, %rax", value));
                Ok(Type::INT)
            }
            Expr::CharLit { value, .. } => {
                self.text.push(format!("    mov ${}, %rax", value));
                Ok(Type::CHAR)
            }
            Expr::FloatLit { value, .. } => {
                let label = self.float_label(64, *value);
                self.text.push(format!("    movsd {}(%rip), %xmm0", label));
                Ok(Type::Float { bits: 64 })
            }
            Expr::StringLit { value, .. } => {
                let label = self.string_label(value);
                self.text.push(format!("    lea {}(%rip), %rax", label));
                Ok(Type::String)
            }
            Expr::Id { .. } | Expr::NamespaceAccess { .. } | Expr::MemberAccess { .. } | Expr::ArrowAccess { .. } | Expr::ArrayAccess { .. } => {
                let lv = self.lvalue(expr)?;
                self.load(&lv)?;
                Ok(lv.ty)
            }
            Expr::Unary { op, operand, .. } => self.gen_unary(*op, operand),
            Expr::Binary { op, lhs, rhs, .. } => self.gen_binop(*op, lhs, rhs),
            Expr::Assign { target, value, .. } => self.gen_assign(target, value),
            Expr::Call { target, args, .. } => self.gen_call(target, args),
            Expr::InitList { .. } => Err(CodegenError::Logic(
                "initializer list can only appear directly in a variable declaration".to_string(),
            )),
            Expr::Lambda { .. } => {
                let name = self.lower_lambda(expr)?;
                self.text.push(format!("    lea {}(%rip), %rax", name));
                Ok(Type::FnPtr)
            }
        }
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: &Expr) -> CgResult<Type> {
        match op {
            UnaryOp::AddrOf => {
                let lv = self.lvalue(operand)?;
                self.text.push(format!("    lea {}, %rax", lv.operand()));
                Ok(Type::pointer(lv.ty))
            }
            UnaryOp::Deref => {
                let lv = self.lvalue(operand)?;
                self.load(&lv)?;
                Ok(lv.ty)
            }
            UnaryOp::Neg => {
                let ty = self.gen_expr(operand)?;
                if ty.normalize().is_float() {
                    self.text.push("    xorpd %xmm1, %xmm1".to_string());
                    self.text.push("    subsd %xmm0, %xmm1".to_string());
                    self.text.push("    movsd %xmm1, %xmm0".to_string());
                } else {
                    self.text.push("    neg %rax".to_string());
                }
                Ok(ty)
            }
            UnaryOp::Plus => self.gen_expr(operand),
        }
    }

    fn gen_binop(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> CgResult<Type> {
        let lhs_ty = self.expr_type_hint(lhs);
        let rhs_ty = self.expr_type_hint(rhs);

        if lhs_ty.normalize().is_string() {
            return self.gen_string_binop(op, lhs, rhs);
        }
        if lhs_ty.normalize().is_float() || rhs_ty.normalize().is_float() {
            return self.gen_float_binop(op, lhs, rhs);
        }
        if lhs_ty.normalize().is_pointer() && matches!(op, BinOp::Add | BinOp::Sub) {
            return self.gen_pointer_binop(op, lhs, &lhs_ty, rhs, &rhs_ty);
        }

        self.gen_expr(lhs)?;
        self.text.push("    push %rax".to_string());
        self.gen_expr(rhs)?;
        self.text.push("    mov %rax, %rcx".to_string());
        self.text.push("    pop %rax".to_string());
        self.emit_int_binop(op);
        let result_unsigned = !lhs_ty.is_signed() || !rhs_ty.is_signed();
        Ok(if op.is_comparison() {
            Type::INT
        } else if result_unsigned {
            Type::Int { bits: 64, signed: false }
        } else {
            Type::INT
        })
    }

    fn emit_int_binop(&mut self, op: BinOp) {
        match op {
            BinOp::Add => self.text.push("    add %rcx, %rax".to_string()),
            BinOp::Sub => self.text.push("    sub %rcx, %rax".to_string()),
            BinOp::Mul => self.text.push("    imul %rcx, %rax".to_string()),
            BinOp::Div => {
                self.text.push("    cqto".to_string());
                self.text.push("    idiv %rcx".to_string());
            }
            BinOp::Mod => {
                self.text.push("    cqto".to_string());
                self.text.push("    idiv %rcx".to_string());
                self.text.push("    mov %rdx, %rax".to_string());
            }
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq => {
                self.text.push("    cmp %rcx, %rax".to_string());
                let setcc = match op {
                    BinOp::Eq => "sete",
                    BinOp::Neq => "setne",
                    BinOp::Lt => "setl",
                    BinOp::Gt => "setg",
                    BinOp::Leq => "setle",
                    BinOp::Geq => "setge",
                    _ => unreachable!(),
                };
                self.text.push(format!("    {} %al", setcc));
                self.text.push("    movzbl %al, %eax".to_string());
            }
        }
    }

    fn gen_float_binop(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> CgResult<Type> {
        self.gen_expr(lhs)?;
        self.text.push("    sub $8, %rsp".to_string());
        self.text.push("    movsd %xmm0, (%rsp)".to_string());
        self.gen_expr(rhs)?;
        self.text.push("    movsd %xmm0, %xmm1".to_string());
        self.text.push("    movsd (%rsp), %xmm0".to_string());
        self.text.push("    add $8, %rsp".to_string());
        match op {
            BinOp::Add => self.text.push("    addsd %xmm1, %xmm0".to_string()),
            BinOp::Sub => self.text.push("    subsd %xmm1, %xmm0".to_string()),
            BinOp::Mul => self.text.push("    mulsd %xmm1, %xmm0".to_string()),
            BinOp::Div => self.text.push("    divsd %xmm1, %xmm0".to_string()),
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq => {
                self.text.push("    comisd %xmm1, %xmm0".to_string());
                let setcc = match op {
                    BinOp::Eq => "sete",
                    BinOp::Neq => "setne",
                    BinOp::Lt => "setb",
                    BinOp::Gt => "seta",
                    BinOp::Leq => "setbe",
                    BinOp::Geq => "setae",
                    _ => unreachable!(),
                };
                self.text.push(format!("    {} %al", setcc));
                self.text.push("    movzbl %al, %eax".to_string());
                return Ok(Type::INT);
            }
            BinOp::Mod => return Err(CodegenError::Logic("'%' is not defined on floats".to_string())),
        }
        Ok(Type::Float { bits: 64 })
    }

    fn gen_pointer_binop(&mut self, op: BinOp, lhs: &Expr, lhs_ty: &Type, rhs: &Expr, rhs_ty: &Type) -> CgResult<Type> {
        if op == BinOp::Sub && rhs_ty.normalize().is_pointer() {
            let elem_sz = self.sizeof(&lhs_ty.pointee()).max(1) as i64;
            self.gen_expr(lhs)?;
            self.text.push("    push %rax".to_string());
            self.gen_expr(rhs)?;
            self.text.push("    mov %rax, %rcx".to_string());
            self.text.push("    pop %rax".to_string());
            self.text.push("    sub %rcx, %rax".to_string());
            self.text.push(format!("    mov ${}, %rcx", elem_sz));
            self.text.push("    cqto".to_string());
            self.text.push("    idiv %rcx".to_string());
            return Ok(Type::INT);
        }
        let elem_sz = self.sizeof(&lhs_ty.pointee()).max(1);
        self.gen_expr(lhs)?;
        self.text.push("    push %rax".to_string());
        self.gen_expr(rhs)?;
        if elem_sz != 1 {
            self.text.push(format!("    imul ${}, %rax", elem_sz));
        }
        self.text.push("    mov %rax, %rcx".to_string());
        self.text.push("    pop %rax".to_string());
        match op {
            BinOp::Add => self.text.push("    add %rcx, %rax".to_string()),
            BinOp::Sub => self.text.push("    sub %rcx, %rax".to_string()),
            _ => unreachable!("caller only routes Add/Sub here"),
        }
        Ok(lhs_ty.clone())
    }

    fn gen_string_binop(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> CgResult<Type> {
        self.gen_expr(lhs)?;
        self.text.push("    push %rax".to_string());
        self.gen_expr(rhs)?;
        self.text.push("    mov %rax, %rsi".to_string());
        self.text.push("    pop %rdi".to_string());
        match op {
            BinOp::Add => {
                self.uses_str_add = true;
                self.text.push("    call __c5_str_add".to_string());
            }
            BinOp::Sub => {
                self.uses_str_sub = true;
                self.text.push("    call __c5_str_sub".to_string());
            }
            other => return Err(CodegenError::Logic(format!("strings only support + and -, not {}", other.as_str()))),
        }
        Ok(Type::String)
    }

    fn gen_assign(&mut self, target: &Expr, value: &Expr) -> CgResult<Type> {
        let lv = self.lvalue(target)?;
        let save_r11 = matches!(lv.loc, Location::Indirect(_));
        if save_r11 {
            self.text.push("    push %r11".to_string());
        }
        let val_ty = self.gen_expr(value)?;
        if save_r11 {
            self.text.push("    pop %r11".to_string());
        }
        self.store(&lv, &val_ty)?;
        Ok(lv.ty)
    }

    fn gen_call(&mut self, target: &Expr, args: &[Expr]) -> CgResult<Type> {
        if let Expr::MemberAccess { base, field, .. } = target {
            let base_ty = self.expr_type_hint(base);
            if base_ty.normalize().is_array() {
                return self.gen_array_method(base, field, args);
            }
        }

        let (name, is_func_ptr) = match target {
            Expr::Id { name, .. } => (name.clone(), self.locals.contains_key(name)),
            Expr::NamespaceAccess { path, .. } => (path.join("::"), false),
            _ => return Err(CodegenError::Logic("unsupported call target".to_string())),
        };

        if name == "c_str" {
            self.gen_expr(&args[0])?;
            return Ok(Type::pointer(Type::CHAR));
        }

        let mut kinds: Vec<Option<u32>> = Vec::with_capacity(args.len());
        for arg in args {
            let arg_ty = self.expr_type_hint(arg);
            if matches!(arg_ty.normalize(), Type::Named(n) if self.structs.contains_key(n)) {
                // Structs are passed by address; the callee copies them in.
                let lv = self.lvalue(arg)?;
                self.text.push(format!("    lea {}, %rax", lv.operand()));
                self.text.push("    push %rax".to_string());
                kinds.push(None);
                continue;
            }
            let ty = self.gen_expr(arg)?;
            match ty.normalize() {
                Type::Float { bits } => {
                    self.text.push("    sub $8, %rsp".to_string());
                    let mnemonic = if *bits == 32 { "movss" } else { "movsd" };
                    self.text.push(format!("    {} %xmm0, (%rsp)", mnemonic));
                    kinds.push(Some(*bits));
                }
                _ => {
                    self.text.push("    push %rax".to_string());
                    kinds.push(None);
                }
            }
        }

        let mut int_idx = 0usize;
        let mut float_idx = 0usize;
        let mut assigned = Vec::with_capacity(kinds.len());
        for k in &kinds {
            match k {
                Some(_) if float_idx < FLOAT_ARG_REGS.len() => {
                    assigned.push(Some(FLOAT_ARG_REGS[float_idx]));
                    float_idx += 1;
                }
                None if int_idx < INT_ARG_REGS.len() => {
                    assigned.push(Some(INT_ARG_REGS[int_idx]));
                    int_idx += 1;
                }
                _ => assigned.push(None),
            }
        }
        if assigned.iter().any(|a| a.is_none()) {
            return Err(CodegenError::Logic(format!(
                "call to '{}' passes more than {} integer or {} float arguments, which this codegen does not support",
                name,
                INT_ARG_REGS.len(),
                FLOAT_ARG_REGS.len()
            )));
        }

        for i in (0..kinds.len()).rev() {
            let reg = assigned[i].unwrap();
            if let Some(bits) = kinds[i] {
                let mnemonic = if bits == 32 { "movss" } else { "movsd" };
                self.text.push(format!("    {} (%rsp), {}", mnemonic, reg));
                self.text.push("    add $8, %rsp".to_string());
            } else {
                self.text.push(format!("    pop {}", reg));
            }
        }

        let is_varargs = self.func_sigs.get(&name).map(|s| s.varargs).unwrap_or(false);
        if is_varargs {
            self.text.push(format!("    mov ${}, %al", float_idx));
        }

        if is_func_ptr {
            let (off, _) = self.locals.get(&name).cloned().unwrap();
            self.text.push(format!("    call *{}(%rbp)", off));
        } else {
            let mangled = Self::mangle(&name);
            let is_extern = !self.func_sigs.contains_key(&name) || self.globals.contains_key(&name);
            let suffix = if is_extern { "@PLT" } else { "" };
            let _ = is_extern;
            self.text.push(format!("    call {}{}", mangled, suffix));
        }

        Ok(self.func_sigs.get(&name).map(|s| s.ret.clone()).unwrap_or(Type::INT))
    }

    fn gen_array_method(&mut self, base: &Expr, field: &str, args: &[Expr]) -> CgResult<Type> {
        let array_ty = self.expr_type_hint(base);
        let elem_ty = array_ty.array_elem().unwrap_or(Type::INT);
        let elem_sz = self.sizeof(&elem_ty).max(1);
        let lv = self.lvalue(base)?;
        let struct_off = match &lv.loc {
            Location::Local(off) => format!("{}(%rbp)", off),
            Location::Global(name, off) => {
                if *off == 0 {
                    format!("{}(%rip)", name)
                } else {
                    format!("{}+{}(%rip)", name, off)
                }
            }
            Location::Indirect(off) => format!("{}(%r11)", off),
        };
        let indirect_base = matches!(lv.loc, Location::Indirect(_));

        match field {
            "length" => {
                self.text.push(format!("    mov 8+{}, %rax", struct_off));
                Ok(Type::INT)
            }
            "clear" => {
                self.text.push(format!("    movq $0, 8+{}", struct_off));
                Ok(Type::Void)
            }
            "push" => {
                self.uses_array_push = true;
                if indirect_base {
                    self.text.push("    push %r11".to_string());
                }
                self.gen_expr(&args[0])?;
                if indirect_base {
                    self.text.push("    pop %r11".to_string());
                }
                self.text.push("    push %rax".to_string());
                self.text.push(format!("    lea {}, %rdi", struct_off));
                self.text.push(format!("    mov ${}, %rsi", elem_sz));
                self.text.push("    call __c5_array_ensure_space".to_string());
                self.text.push("    pop %rax".to_string());
                self.text.push(format!("    mov 8+{}, %rcx", struct_off));
                self.text.push(format!("    mov {}, %rdx", struct_off));
                if elem_sz == 1 {
                    self.text.push("    mov %al, (%rdx, %rcx, 1)".to_string());
                } else {
                    self.text.push(format!("    imul ${}, %rcx", elem_sz));
                    self.text.push("    mov %rax, (%rdx, %rcx, 1)".to_string());
                }
                self.text.push(format!("    incq 8+{}", struct_off));
                Ok(Type::Void)
            }
            "pop" => {
                self.uses_array_pop = true;
                self.text.push(format!("    decq 8+{}", struct_off));
                self.text.push(format!("    mov 8+{}, %rcx", struct_off));
                self.text.push(format!("    mov {}, %rdx", struct_off));
                if elem_sz == 1 {
                    self.text.push("    movzbl (%rdx, %rcx, 1), %eax".to_string());
                } else {
                    self.text.push(format!("    imul ${}, %rcx", elem_sz));
                    self.text.push("    mov (%rdx, %rcx, 1), %rax".to_string());
                }
                Ok(elem_ty)
            }
            other => Err(CodegenError::Logic(format!("arrays have no method '{}'", other))),
        }
    }

    /// Move `lv`'s value into `%rax`/`%xmm0`, sized and sign-extended per
    /// its type.
    fn load(&mut self, lv: &Lvalue) -> CgResult<()> {
        let operand = lv.operand();
        match lv.ty.normalize() {
            Type::Float { bits: 32 } => self.text.push(format!("    movss {}, %xmm0", operand)),
            Type::Float { .. } => self.text.push(format!("    movsd {}, %xmm0", operand)),
            Type::Int { bits: 8, signed: true } => self.text.push(format!("    movsbq {}, %rax", operand)),
            Type::Int { bits: 8, signed: false } => self.text.push(format!("    movzbq {}, %rax", operand)),
            Type::Int { bits: 16, signed: true } => self.text.push(format!("    movswq {}, %rax", operand)),
            Type::Int { bits: 16, signed: false } => self.text.push(format!("    movzwq {}, %rax", operand)),
            Type::Int { bits: 32, signed: true } => self.text.push(format!("    movslq {}, %rax", operand)),
            Type::Int { bits: 32, signed: false } => self.text.push(format!("    mov {}, %eax", operand)),
            _ => self.text.push(format!("    mov {}, %rax", operand)),
        }
        Ok(())
    }

    /// Store `%rax`/`%xmm0` into `lv`, truncated to its size.
    fn store(&mut self, lv: &Lvalue, _val_ty: &Type) -> CgResult<()> {
        let operand = lv.operand();
        match lv.ty.normalize() {
            Type::Float { bits: 32 } => self.text.push(format!("    movss %xmm0, {}", operand)),
            Type::Float { .. } => self.text.push(format!("    movsd %xmm0, {}", operand)),
            Type::Int { bits: 8, .. } => self.text.push(format!("    mov %al, {}", operand)),
            Type::Int { bits: 16, .. } => self.text.push(format!("    mov %ax, {}", operand)),
            Type::Int { bits: 32, .. } => self.text.push(format!("    mov %eax, {}", operand)),
            _ => self.text.push(format!("    mov %rax, {}", operand)),
        }
        Ok(())
    }

    /// A pure (non-emitting) type inference used to pick codegen strategy
    /// before evaluating an expression, mirroring
    /// `original_source/c5c/codegen.py::_get_expr_type`.
    pub(super) fn expr_type_hint(&self, expr: &Expr) -> Type {
        match expr {
            Expr::IntLit { .. } => Type::INT,
            Expr::CharLit { .. } => Type::CHAR,
            Expr::FloatLit { .. } => Type::Float { bits: 64 },
            Expr::StringLit { .. } => Type::String,
            Expr::Id { name, .. } => self
                .locals
                .get(name)
                .map(|(_, ty)| ty.clone())
                .or_else(|| self.globals.get(name).cloned())
                .unwrap_or(Type::INT),
            Expr::NamespaceAccess { path, .. } => {
                let joined = path.join("::");
                self.globals.get(&joined).cloned().unwrap_or(Type::INT)
            }
            Expr::Unary { op: UnaryOp::AddrOf, operand, .. } => Type::pointer(self.expr_type_hint(operand)),
            Expr::Unary { op: UnaryOp::Deref, operand, .. } => self.expr_type_hint(operand).pointee(),
            Expr::Unary { operand, .. } => self.expr_type_hint(operand),
            Expr::MemberAccess { base, field, .. } => self.field_type_hint(&self.expr_type_hint(base), field),
            Expr::ArrowAccess { base, field, .. } => self.field_type_hint(&self.expr_type_hint(base).pointee(), field),
            Expr::ArrayAccess { base, .. } => {
                let base_ty = self.expr_type_hint(base);
                base_ty.array_elem().unwrap_or_else(|| if base_ty.normalize().is_string() { Type::CHAR } else { Type::INT })
            }
            Expr::Assign { target, .. } => self.expr_type_hint(target),
            Expr::Binary { op, lhs, .. } if !op.is_comparison() => self.expr_type_hint(lhs),
            Expr::Binary { .. } => Type::INT,
            Expr::Call { target, .. } => match target.as_ref() {
                Expr::Id { name, .. } if name == "c_str" => Type::pointer(Type::CHAR),
                Expr::Id { name, .. } => self.func_sigs.get(name).map(|s| s.ret.clone()).unwrap_or(Type::INT),
                Expr::NamespaceAccess { path, .. } => {
                    self.func_sigs.get(&path.join("::")).map(|s| s.ret.clone()).unwrap_or(Type::INT)
                }
                Expr::MemberAccess { base, field, .. } => {
                    let base_ty = self.expr_type_hint(base);
                    if base_ty.normalize().is_array() {
                        match field.as_str() {
                            "length" => Type::INT,
                            "pop" => base_ty.array_elem().unwrap_or(Type::INT),
                            _ => Type::Void,
                        }
                    } else {
                        Type::INT
                    }
                }
                _ => Type::INT,
            },
            Expr::InitList { .. } => Type::INT,
            Expr::Lambda { ret, .. } => ret.clone(),
        }
    }

    fn field_type_hint(&self, base_ty: &Type, field: &str) -> Type {
        if let Type::Named(name) = base_ty.normalize() {
            if let Some(layout) = self.structs.get(name) {
                if let Some((_, ty, _)) = layout.field(field) {
                    return ty.clone();
                }
            }
        }
        Type::INT
    }
}
