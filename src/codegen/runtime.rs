//! Runtime helper assembly and lambda lowering.
//!
//! The string-concatenation/subtraction helpers are emitted close to
//! verbatim from `original_source/c5c/codegen.py::_get_str_add_asm`/
//! `_get_str_sub_asm` (a pure instruction-sequence translation; GAS syntax
//! is unchanged between the two). They are only appended to the output when
//! `uses_str_add`/`uses_str_sub` is set, matching the original's
//! conditional emission.

use super::error::CgResult;
use super::state::CodeGen;
use crate::ast::Expr;

pub(super) const STR_ADD_ASM: &str = r#"
__c5_str_add:
    push %rbp
    mov %rsp, %rbp
    push %rbx
    push %r12
    mov %rdi, %rbx
    mov %rsi, %r12
    mov %rbx, %rdi
    call strlen@PLT
    mov %rax, %r13
    mov %r12, %rdi
    call strlen@PLT
    add %r13, %rax
    add $1, %rax
    mov %rax, %rdi
    call malloc@PLT
    mov %rax, %r14
    mov %r14, %rdi
    mov %rbx, %rsi
    call strcpy@PLT
    mov %r14, %rdi
    mov %r12, %rsi
    call strcat@PLT
    mov %r14, %rax
    pop %r12
    pop %rbx
    leave
    ret
"#;

pub(super) const STR_SUB_ASM: &str = r#"
__c5_str_sub:
    push %rbp
    mov %rsp, %rbp
    push %rbx
    push %r12
    mov %rdi, %rbx
    mov %rsi, %r12
    mov %rbx, %rdi
    call strdup@PLT
    mov %rax, %r13
    mov %r13, %rdi
    mov %r12, %rsi
    call strstr@PLT
    test %rax, %rax
    je .Lstrsub_done
    mov %rax, %rdi
    mov %r12, %rsi
    call strlen@PLT
    mov %rax, %rdx
    mov %rdi, %rax
    add %rdx, %rdi
    mov %rax, %rsi
    call strlen@PLT
    sub %rdx, %rax
    inc %rax
    mov %rax, %rdx
    mov %rsi, %rdi
    mov %rdi, %rsi
    call memmove@PLT
.Lstrsub_done:
    mov %r13, %rax
    pop %r12
    pop %rbx
    leave
    ret
"#;

pub(super) const ARRAY_ENSURE_SPACE_ASM: &str = r#"
__c5_array_ensure_space:
    push %rbp
    mov %rsp, %rbp
    sub $16, %rsp
    mov %rdi, -8(%rbp)
    mov %rsi, -16(%rbp)
    mov -8(%rbp), %rax
    mov 8(%rax), %rcx
    mov 16(%rax), %rdx
    cmp %rdx, %rcx
    jl .Lensure_done
    mov -8(%rbp), %rax
    mov 16(%rax), %rcx
    lea (%rcx, %rcx, 1), %rcx
    cmp $0, %rcx
    jne .Lensure_has_cap
    mov $8, %rcx
.Lensure_has_cap:
    mov -8(%rbp), %rax
    mov %rcx, 16(%rax)
    mov (%rax), %rdi
    mov -16(%rbp), %rsi
    imul %rcx, %rsi
    call realloc@PLT
    mov -8(%rbp), %rcx
    mov %rax, (%rcx)
.Lensure_done:
    leave
    ret
"#;

impl CodeGen {
    /// Lower a capture-free lambda into a synthetic top-level function and
    /// return its mangled label.
    pub(super) fn lower_lambda(&mut self, lambda: &Expr) -> CgResult<String> {
        let Expr::Lambda { ret, params, body, .. } = lambda else {
            unreachable!("lower_lambda called on a non-lambda expression");
        };

        self.lambda_count += 1;
        let name = format!("__c5_lambda_{}", self.lambda_count);

        let saved_locals = std::mem::take(&mut self.locals);
        let saved_offset = self.local_offset;
        let saved_ret = self.current_func_ret.clone();
        let saved_has_return = self.func_has_return;
        let saved_text = std::mem::take(&mut self.text);

        self.local_offset = 0;
        self.current_func_ret = ret.clone();
        self.func_has_return = false;

        self.text.push(format!("{}:", name));
        self.text.push("    push %rbp".to_string());
        self.text.push("    mov %rsp, %rbp".to_string());
        self.text.push(format!("    sub ${}, %rsp", super::statements::FRAME_SIZE));

        const INT_ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
        for (i, p) in params.iter().enumerate() {
            let off = self.local_offset - 8;
            self.local_offset = off;
            self.locals.insert(p.name.clone(), (off, p.ty.clone()));
            if let Some(reg) = INT_ARG_REGS.get(i) {
                self.text.push(format!("    mov {}, {}(%rbp)", reg, off));
            }
        }

        for stmt in body {
            self.gen_stmt(stmt)?;
        }
        if !self.func_has_return {
            self.text.push("    leave".to_string());
            self.text.push("    ret".to_string());
        }

        let lambda_body = std::mem::replace(&mut self.text, saved_text);
        self.lambda_funcs.push(lambda_body);

        self.locals = saved_locals;
        self.local_offset = saved_offset;
        self.current_func_ret = saved_ret;
        self.func_has_return = saved_has_return;

        Ok(name)
    }
}
