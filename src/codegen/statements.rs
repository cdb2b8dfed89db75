//! Statement and function code generation, and the top-level driver.
//!
//! Grounded on `original_source/c5c/codegen.py::generate`/`gen_func`/
//! `gen_stmt`. Struct arguments and struct-valued locals are always passed
//! and stored by address here rather than split across up to two SysV
//! integer registers the way the original's `gen_func` does for structs
//! `<= 16` bytes; this keeps `Location::Local` a uniform "this offset holds
//! the actual bytes" model instead of needing a second representation for
//! "this offset holds a pointer to the bytes elsewhere". Passing a struct to
//! an external (non-C5) function is out of scope for this language.

use super::error::{CgResult, CodegenError};
use super::state::{CodeGen, FuncSig};
use crate::ast::{Decl, Expr, Program, Stmt};
use crate::types::{layout_struct, Type};

const INT_ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
const FLOAT_ARG_REGS: [&str; 8] =
    ["%xmm0", "%xmm1", "%xmm2", "%xmm3", "%xmm4", "%xmm5", "%xmm6", "%xmm7"];

/// Frame size reserved for every function's locals, mirroring the
/// original's own fixed `sub $512, %rsp` rather than a precisely computed
/// frame.
pub(super) const FRAME_SIZE: i32 = 512;

impl CodeGen {
    /// Run the full codegen pass over a resolved, analyzed, folded program
    /// and return the finished assembly text.
    pub fn generate(program: &Program) -> CgResult<String> {
        let mut cg = CodeGen::new();
        cg.register_decls(program)?;
        for decl in &program.decls {
            if let Decl::Func { .. } = decl {
                cg.gen_func(decl)?;
            }
        }
        cg.assemble()
    }

    fn register_decls(&mut self, program: &Program) -> CgResult<()> {
        for decl in &program.decls {
            if let Decl::Enum { name, variants, .. } = decl {
                self.enums.insert(name.clone(), crate::types::EnumLayout { variants: variants.clone() });
            }
        }
        for decl in &program.decls {
            if let Decl::Struct { name, fields, .. } = decl {
                let raw: Vec<(Type, String)> = fields.iter().map(|f| (f.ty.clone(), f.name.clone())).collect();
                let layout = layout_struct(&raw, &self.structs, &self.enums, &self.aliases);
                self.structs.insert(name.clone(), layout);
            }
        }
        for decl in &program.decls {
            match decl {
                Decl::TypeAlias { name, members, .. } => {
                    let size = members.iter().map(|m| self.sizeof(m)).max().unwrap_or(1).max(1);
                    self.aliases.insert(name.clone(), crate::types::AliasLayout { members: members.clone(), size });
                }
                Decl::Extern { ret, name, varargs, .. } => {
                    self.func_sigs.insert(name.clone(), FuncSig { ret: ret.clone(), varargs: *varargs });
                }
                Decl::Func { ret, name, .. } => {
                    self.func_sigs.insert(name.clone(), FuncSig { ret: ret.clone(), varargs: false });
                }
                Decl::PubVar { ty, name, .. } => {
                    self.globals.insert(name.clone(), ty.clone());
                }
                _ => {}
            }
        }
        for decl in &program.decls {
            if let Decl::PubVar { ty, name, init, .. } = decl {
                self.emit_pub_var(ty, name, init.as_ref())?;
            }
        }
        Ok(())
    }

    fn emit_pub_var(&mut self, ty: &Type, name: &str, init: Option<&Expr>) -> CgResult<()> {
        let mangled = Self::mangle(name);
        let sz = self.sizeof(ty);
        self.data.push(format!(".global {}", mangled));
        self.data.push(format!("{}:", mangled));
        match init {
            Some(Expr::IntLit { value, .. }) | Some(Expr::CharLit { value, .. }) => {
                let directive = size_directive(sz);
                self.data.push(format!("    .{} {}", directive, value));
            }
            Some(Expr::FloatLit { value, .. }) => {
                if sz == 4 {
                    self.data.push(format!("    .float {:?}", *value as f32));
                } else {
                    self.data.push(format!("    .double {:?}", value));
                }
            }
            Some(Expr::StringLit { value, .. }) => {
                let label = self.string_label(value);
                self.data.push(format!("    .quad {}", label));
            }
            _ => {
                self.data.push(format!("    .zero {}", sz.max(1)));
            }
        }
        Ok(())
    }

    fn gen_func(&mut self, decl: &Decl) -> CgResult<()> {
        let Decl::Func { ret, name, params, body, .. } = decl else {
            return Err(CodegenError::Logic("gen_func called on a non-function decl".to_string()));
        };
        self.locals.clear();
        self.local_offset = 0;
        self.current_func_ret = ret.clone();
        self.func_has_return = false;
        self.break_targets.clear();

        let mangled = Self::mangle(name);
        self.text.push(format!(".global {}", mangled));
        self.text.push(format!("{}:", mangled));
        self.text.push("    push %rbp".to_string());
        self.text.push("    mov %rsp, %rbp".to_string());
        self.text.push(format!("    sub ${}, %rsp", FRAME_SIZE));

        let mut int_idx = 0usize;
        let mut float_idx = 0usize;

        let struct_return = matches!(ret.normalize(), Type::Named(n) if self.structs.contains_key(n));
        if struct_return {
            let off = self.alloc_local(8);
            self.locals.insert("__ret_ptr".to_string(), (off, Type::pointer(ret.clone())));
            self.text.push(format!("    mov {}, {}(%rbp)", INT_ARG_REGS[int_idx], off));
            int_idx += 1;
        }

        for p in params {
            match p.ty.normalize() {
                Type::Float { bits } => {
                    let off = self.alloc_local(8);
                    self.locals.insert(p.name.clone(), (off, p.ty.clone()));
                    let reg = FLOAT_ARG_REGS.get(float_idx).ok_or_else(|| {
                        CodegenError::Logic(format!("function '{}' takes more float parameters than this codegen supports", name))
                    })?;
                    let mnemonic = if *bits == 32 { "movss" } else { "movsd" };
                    self.text.push(format!("    {} {}, {}(%rbp)", mnemonic, reg, off));
                    float_idx += 1;
                }
                Type::Array(_) => {
                    let off = self.alloc_local(24);
                    self.locals.insert(p.name.clone(), (off, p.ty.clone()));
                    for slot in 0..3 {
                        let reg = INT_ARG_REGS.get(int_idx).ok_or_else(|| {
                            CodegenError::Logic(format!("function '{}' takes more parameters than this codegen supports", name))
                        })?;
                        self.text.push(format!("    mov {}, {}(%rbp)", reg, off + slot * 8));
                        int_idx += 1;
                    }
                }
                Type::Named(n) if self.structs.contains_key(n) => {
                    let size = self.structs.get(n).unwrap().size;
                    let off = self.alloc_local(size as i32);
                    self.locals.insert(p.name.clone(), (off, p.ty.clone()));
                    let reg = INT_ARG_REGS.get(int_idx).ok_or_else(|| {
                        CodegenError::Logic(format!("function '{}' takes more parameters than this codegen supports", name))
                    })?;
                    self.text.push(format!("    lea {}(%rbp), %rdi", off));
                    self.text.push(format!("    mov {}, %rsi", reg));
                    self.text.push(format!("    mov ${}, %rdx", size));
                    self.text.push("    call memcpy@PLT".to_string());
                    int_idx += 1;
                }
                _ => {
                    let off = self.alloc_local(8);
                    self.locals.insert(p.name.clone(), (off, p.ty.clone()));
                    let reg = INT_ARG_REGS.get(int_idx).ok_or_else(|| {
                        CodegenError::Logic(format!("function '{}' takes more parameters than this codegen supports", name))
                    })?;
                    self.text.push(format!("    mov {}, {}(%rbp)", reg, off));
                    int_idx += 1;
                }
            }
        }

        for stmt in body {
            self.gen_stmt(stmt)?;
        }

        if !self.func_has_return {
            if name == "main" {
                self.text.push("    mov $0, %eax".to_string());
            }
            self.text.push("    leave".to_string());
            self.text.push("    ret".to_string());
        }
        Ok(())
    }

    fn alloc_local(&mut self, size: i32) -> i32 {
        self.local_offset -= size.max(8);
        self.local_offset
    }

    pub(super) fn gen_stmt(&mut self, stmt: &Stmt) -> CgResult<()> {
        match stmt {
            Stmt::VarDecl { ty, name, init, .. } => self.gen_var_decl(ty, name, init.as_ref()),
            Stmt::Expr { expr, .. } => {
                self.gen_expr(expr)?;
                Ok(())
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                let else_label = self.new_label("else");
                let end_label = self.new_label("endif");
                self.gen_expr(cond)?;
                self.text.push("    cmp $0, %rax".to_string());
                self.text.push(format!("    je {}", else_label));
                for s in then_branch {
                    self.gen_stmt(s)?;
                }
                self.text.push(format!("    jmp {}", end_label));
                self.text.push(format!("{}:", else_label));
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        self.gen_stmt(s)?;
                    }
                }
                self.text.push(format!("{}:", end_label));
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                let start = self.new_label("while");
                let end = self.new_label("endwhile");
                self.text.push(format!("{}:", start));
                self.gen_expr(cond)?;
                self.text.push("    cmp $0, %rax".to_string());
                self.text.push(format!("    je {}", end));
                self.break_targets.push(end.clone());
                for s in body {
                    self.gen_stmt(s)?;
                }
                self.break_targets.pop();
                self.text.push(format!("    jmp {}", start));
                self.text.push(format!("{}:", end));
                Ok(())
            }
            Stmt::DoWhile { body, cond, .. } => {
                let start = self.new_label("dowhile");
                let end = self.new_label("enddowhile");
                self.text.push(format!("{}:", start));
                self.break_targets.push(end.clone());
                for s in body {
                    self.gen_stmt(s)?;
                }
                self.break_targets.pop();
                self.gen_expr(cond)?;
                self.text.push("    cmp $0, %rax".to_string());
                self.text.push(format!("    jne {}", start));
                self.text.push(format!("{}:", end));
                Ok(())
            }
            Stmt::For { init, cond, step, body, .. } => {
                if let Some(init) = init {
                    self.gen_stmt(init)?;
                }
                let start = self.new_label("for");
                let end = self.new_label("endfor");
                self.text.push(format!("{}:", start));
                if let Some(cond) = cond {
                    self.gen_expr(cond)?;
                    self.text.push("    cmp $0, %rax".to_string());
                    self.text.push(format!("    je {}", end));
                }
                self.break_targets.push(end.clone());
                for s in body {
                    self.gen_stmt(s)?;
                }
                self.break_targets.pop();
                if let Some(step) = step {
                    self.gen_expr(step)?;
                }
                self.text.push(format!("    jmp {}", start));
                self.text.push(format!("{}:", end));
                Ok(())
            }
            Stmt::Foreach { idx, val, iterable, body, .. } => self.gen_foreach(idx, val, iterable, body),
            Stmt::Switch { scrutinee, cases, default, .. } => self.gen_switch(scrutinee, cases, default.as_deref()),
            Stmt::Break { span } => {
                let target = self
                    .break_targets
                    .last()
                    .cloned()
                    .ok_or_else(|| CodegenError::Logic(format!("break outside a loop or switch at {:?}", span)))?;
                self.text.push(format!("    jmp {}", target));
                Ok(())
            }
            Stmt::Return { value, .. } => self.gen_return(value.as_ref()),
        }
    }

    fn gen_var_decl(&mut self, ty: &Type, name: &str, init: Option<&Expr>) -> CgResult<()> {
        let size = self.sizeof(ty).max(8) as i32;
        let off = self.alloc_local(size);
        self.locals.insert(name.to_string(), (off, ty.clone()));

        match (ty.normalize(), init) {
            (Type::Named(n), Some(Expr::InitList { elements, .. })) if self.structs.contains_key(n) => {
                let fields = self.structs.get(n).unwrap().fields.clone();
                for (i, elem) in elements.iter().enumerate() {
                    if let Some((_, field_ty, field_off)) = fields.get(i) {
                        self.gen_expr(elem)?;
                        let operand = format!("{}(%rbp)", off + *field_off as i32);
                        self.store_sized(&operand, field_ty);
                    }
                }
                Ok(())
            }
            (Type::Named(n), Some(rhs)) if self.structs.contains_key(n) => {
                let size = self.structs.get(n).unwrap().size;
                let rhs_lv = self.lvalue(rhs)?;
                self.text.push(format!("    lea {}(%rbp), %rdi", off));
                self.text.push(format!("    lea {}, %rsi", rhs_lv.operand()));
                self.text.push(format!("    mov ${}, %rdx", size));
                self.text.push("    call memcpy@PLT".to_string());
                Ok(())
            }
            (Type::Array(elem), Some(Expr::InitList { elements, .. })) => {
                let elem_sz = self.sizeof(elem).max(1);
                let cap = elements.len().max(1) as i64;
                self.text.push(format!("    mov ${}, %rdi", cap * elem_sz as i64));
                self.text.push("    call malloc@PLT".to_string());
                self.text.push(format!("    mov %rax, {}(%rbp)", off));
                for (i, elem_expr) in elements.iter().enumerate() {
                    self.gen_expr(elem_expr)?;
                    self.text.push(format!("    mov {}(%rbp), %r11", off));
                    let element_operand = format!("{}(%r11)", i as i64 * elem_sz as i64);
                    self.store_sized(&element_operand, elem);
                }
                self.text.push(format!("    movq ${}, 8+{}(%rbp)", elements.len(), off));
                self.text.push(format!("    movq ${}, 16+{}(%rbp)", cap, off));
                Ok(())
            }
            (_, Some(init)) => {
                self.gen_expr(init)?;
                let operand = format!("{}(%rbp)", off);
                self.store_sized(&operand, ty);
                Ok(())
            }
            (_, None) => Ok(()),
        }
    }

    fn store_sized(&mut self, operand: &str, ty: &Type) {
        match ty.normalize() {
            Type::Float { bits: 32 } => self.text.push(format!("    movss %xmm0, {}", operand)),
            Type::Float { .. } => self.text.push(format!("    movsd %xmm0, {}", operand)),
            Type::Int { bits: 8, .. } => self.text.push(format!("    mov %al, {}", operand)),
            Type::Int { bits: 16, .. } => self.text.push(format!("    mov %ax, {}", operand)),
            Type::Int { bits: 32, .. } => self.text.push(format!("    mov %eax, {}", operand)),
            _ => self.text.push(format!("    mov %rax, {}", operand)),
        }
    }

    fn gen_foreach(&mut self, idx: &str, val: &str, iterable: &Expr, body: &[Stmt]) -> CgResult<()> {
        let iter_ty = self.expr_type_hint(iterable);
        let elem_ty = iter_ty.array_elem().unwrap_or(Type::CHAR);
        let elem_sz = self.sizeof(&elem_ty).max(1);

        let lv = self.lvalue(iterable)?;
        let base_off = self.alloc_local(8);
        self.text.push(format!("    mov {}, %rax", lv.operand()));
        self.text.push(format!("    mov %rax, {}(%rbp)", base_off));
        let len_off = self.alloc_local(8);
        self.text.push(format!("    mov 8+{}, %rax", lv.operand()));
        self.text.push(format!("    mov %rax, {}(%rbp)", len_off));

        let idx_off = self.alloc_local(8);
        self.locals.insert(idx.to_string(), (idx_off, Type::INT));
        self.text.push(format!("    movq $0, {}(%rbp)", idx_off));
        let val_off = self.alloc_local(8);
        self.locals.insert(val.to_string(), (val_off, elem_ty.clone()));

        let start = self.new_label("foreach");
        let end = self.new_label("endforeach");
        self.text.push(format!("{}:", start));
        self.text.push(format!("    mov {}(%rbp), %rax", idx_off));
        self.text.push(format!("    cmp {}(%rbp), %rax", len_off));
        self.text.push(format!("    jge {}", end));

        self.text.push(format!("    mov {}(%rbp), %r11", base_off));
        self.text.push(format!("    mov {}(%rbp), %rax", idx_off));
        if elem_sz != 1 {
            self.text.push(format!("    imul ${}, %rax", elem_sz));
        }
        self.text.push("    add %rax, %r11".to_string());
        let elem_operand = "0(%r11)".to_string();
        match elem_ty.normalize() {
            Type::Int { bits: 8, signed: true } => self.text.push(format!("    movsbq {}, %rax", elem_operand)),
            Type::Int { bits: 8, signed: false } => self.text.push(format!("    movzbq {}, %rax", elem_operand)),
            _ => self.text.push(format!("    mov {}, %rax", elem_operand)),
        }
        self.text.push(format!("    mov %rax, {}(%rbp)", val_off));

        self.break_targets.push(end.clone());
        for s in body {
            self.gen_stmt(s)?;
        }
        self.break_targets.pop();

        self.text.push(format!("    incq {}(%rbp)", idx_off));
        self.text.push(format!("    jmp {}", start));
        self.text.push(format!("{}:", end));
        Ok(())
    }

    fn gen_switch(&mut self, scrutinee: &Expr, cases: &[(Expr, Vec<Stmt>)], default: Option<&[Stmt]>) -> CgResult<()> {
        let end = self.new_label("endswitch");
        self.gen_expr(scrutinee)?;
        self.text.push("    push %rax".to_string());

        let mut case_labels = Vec::with_capacity(cases.len());
        for (value, _) in cases {
            let label = self.new_label("case");
            self.text.push("    mov (%rsp), %rax".to_string());
            self.gen_expr(value)?;
            self.text.push("    mov %rax, %rcx".to_string());
            self.text.push("    mov (%rsp), %rax".to_string());
            self.text.push("    cmp %rcx, %rax".to_string());
            self.text.push(format!("    je {}", label));
            case_labels.push(label);
        }
        let default_label = self.new_label("default");
        self.text.push(format!("    jmp {}", default_label));

        self.break_targets.push(end.clone());
        for ((_, body), label) in cases.iter().zip(case_labels) {
            self.text.push(format!("{}:", label));
            for s in body {
                self.gen_stmt(s)?;
            }
        }
        self.text.push(format!("{}:", default_label));
        if let Some(default) = default {
            for s in default {
                self.gen_stmt(s)?;
            }
        }
        self.break_targets.pop();

        self.text.push(format!("{}:", end));
        self.text.push("    add $8, %rsp".to_string());
        Ok(())
    }

    fn gen_return(&mut self, value: Option<&Expr>) -> CgResult<()> {
        self.func_has_return = true;
        let ret_ty = self.current_func_ret.clone();
        if let Some(value) = value {
            if matches!(ret_ty.normalize(), Type::Named(n) if self.structs.contains_key(n)) {
                let size = self.sizeof(&ret_ty);
                let (ret_ptr_off, _) = *self.locals.get("__ret_ptr").ok_or_else(|| {
                    CodegenError::Logic("struct-returning function missing hidden return pointer".to_string())
                })?;
                match value {
                    Expr::InitList { elements, .. } => {
                        let Type::Named(n) = ret_ty.normalize() else { unreachable!() };
                        let fields = self.structs.get(n).unwrap().fields.clone();
                        self.text.push(format!("    mov {}(%rbp), %r11", ret_ptr_off));
                        self.text.push("    push %r11".to_string());
                        for (i, elem) in elements.iter().enumerate() {
                            if let Some((_, field_ty, field_off)) = fields.get(i) {
                                self.gen_expr(elem)?;
                                self.text.push("    mov (%rsp), %r11".to_string());
                                let operand = format!("{}(%r11)", field_off);
                                self.store_sized(&operand, field_ty);
                            }
                        }
                        self.text.push("    add $8, %rsp".to_string());
                    }
                    other => {
                        let src_lv = self.lvalue(other)?;
                        self.text.push(format!("    mov {}(%rbp), %rdi", ret_ptr_off));
                        self.text.push(format!("    lea {}, %rsi", src_lv.operand()));
                        self.text.push(format!("    mov ${}, %rdx", size));
                        self.text.push("    call memcpy@PLT".to_string());
                    }
                }
            } else {
                self.gen_expr(value)?;
            }
        }
        self.text.push("    leave".to_string());
        self.text.push("    ret".to_string());
        Ok(())
    }

    /// Assemble the finished output: rodata, data, the peephole-optimized
    /// main text, lowered lambda bodies (each optimized independently, as
    /// the original does), then the conditionally-emitted runtime helpers
    /// and the stack-note terminator GNU/Linux expects.
    fn assemble(&mut self) -> CgResult<String> {
        let mut out = String::new();
        if !self.rodata.is_empty() {
            out.push_str(".section .rodata\n");
            for line in &self.rodata {
                out.push_str(line);
                out.push('\n');
            }
        }
        if !self.data.is_empty() {
            out.push_str(".section .data\n");
            for line in &self.data {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(".text\n");
        for line in super::peephole::optimize(&self.text) {
            out.push_str(&line);
            out.push('\n');
        }
        for lambda in self.lambda_funcs.clone() {
            for line in super::peephole::optimize(&lambda) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        if self.uses_str_add {
            out.push_str(super::runtime::STR_ADD_ASM);
        }
        if self.uses_str_sub {
            out.push_str(super::runtime::STR_SUB_ASM);
        }
        if self.uses_array_push {
            out.push_str(super::runtime::ARRAY_ENSURE_SPACE_ASM);
        }
        out.push_str(".section .note.GNU-stack,\"\",@progbits\n");
        Ok(out)
    }
}

fn size_directive(sz: u32) -> &'static str {
    match sz {
        1 => "byte",
        2 => "short",
        4 => "long",
        _ => "quad",
    }
}
