//! Lvalue addressing.
//!
//! The original computes an address as a raw assembly operand string
//! (`"8(%rbp)"`, `"(%r11)"`) and pattern-matches on its textual shape
//! (`'(%rbp)' in base_addr`) to combine offsets — see
//! `original_source/c5c/codegen.py::get_lvalue`. Here the same addressing
//! modes are a closed `Location` enum, so combining a struct field's offset
//! with its base is a plain integer add instead of a string search.

use super::error::{CgResult, CodegenError};
use super::state::CodeGen;
use crate::ast::{Expr, UnaryOp};
use crate::types::Type;

#[derive(Debug, Clone)]
pub(super) enum Location {
    /// `{offset}(%rbp)`.
    Local(i32),
    /// `{name}(%rip)`, optionally offset into a field.
    Global(String, i32),
    /// An address already computed into `%r11`, offset by a constant (for a
    /// struct field reached through a pointer or array element).
    Indirect(i32),
}

pub(super) struct Lvalue {
    pub loc: Location,
    pub ty: Type,
}

impl Lvalue {
    pub fn operand(&self) -> String {
        match &self.loc {
            Location::Local(off) => format!("{}(%rbp)", off),
            Location::Global(name, 0) => format!("{}(%rip)", name),
            Location::Global(name, off) => format!("{}+{}(%rip)", name, off),
            Location::Indirect(off) => format!("{}(%r11)", off),
        }
    }
}

impl CodeGen {
    /// Resolve `expr` to an address, mirroring `get_lvalue`. May emit
    /// instructions that leave the computed address in `%r11`.
    pub(super) fn lvalue(&mut self, expr: &Expr) -> CgResult<Lvalue> {
        match expr {
            Expr::Id { name, .. } => {
                if let Some((off, ty)) = self.locals.get(name).cloned() {
                    Ok(Lvalue { loc: Location::Local(off), ty })
                } else if let Some(ty) = self.globals.get(name).cloned() {
                    Ok(Lvalue { loc: Location::Global(Self::mangle(name), 0), ty })
                } else {
                    Err(CodegenError::Logic(format!("unknown variable '{}'", name)))
                }
            }
            Expr::NamespaceAccess { path, .. } => {
                let joined = path.join("::");
                let ty = self
                    .globals
                    .get(&joined)
                    .cloned()
                    .ok_or_else(|| CodegenError::Logic(format!("unknown namespaced variable '{}'", joined)))?;
                Ok(Lvalue { loc: Location::Global(Self::mangle(&joined), 0), ty })
            }
            Expr::MemberAccess { base, field, .. } => {
                let base_lv = self.lvalue(base)?;
                let (field_ty, field_off) = self.field_offset(&base_lv.ty, field)?;
                let loc = match base_lv.loc {
                    Location::Local(off) => Location::Local(off + field_off as i32),
                    Location::Global(name, off) => Location::Global(name, off + field_off as i32),
                    Location::Indirect(off) => Location::Indirect(off + field_off as i32),
                };
                Ok(Lvalue { loc, ty: field_ty })
            }
            Expr::ArrowAccess { base, field, .. } => {
                self.gen_expr(base)?;
                self.text.push("    mov %rax, %r11".to_string());
                let base_ty = self.expr_type_hint(base).pointee();
                let (field_ty, field_off) = self.field_offset(&base_ty, field)?;
                Ok(Lvalue { loc: Location::Indirect(field_off as i32), ty: field_ty })
            }
            Expr::ArrayAccess { base, index, .. } => self.array_element_lvalue(base, index),
            Expr::Unary { op: UnaryOp::Deref, operand, .. } => {
                self.gen_expr(operand)?;
                self.text.push("    mov %rax, %r11".to_string());
                let pointee = self.expr_type_hint(operand).pointee();
                Ok(Lvalue { loc: Location::Indirect(0), ty: pointee })
            }
            other => Err(CodegenError::Logic(format!("not an lvalue: {:?}", other))),
        }
    }

    fn field_offset(&self, struct_ty: &Type, field: &str) -> CgResult<(Type, u32)> {
        let Type::Named(name) = struct_ty.normalize() else {
            return Err(CodegenError::Logic(format!("'{}' is not a struct type", struct_ty)));
        };
        let layout = self
            .structs
            .get(name)
            .ok_or_else(|| CodegenError::Logic(format!("unknown struct type '{}'", name)))?;
        let (_, ty, off) =
            layout.field(field).ok_or_else(|| CodegenError::Logic(format!("struct '{}' has no field '{}'", name, field)))?;
        Ok((ty.clone(), *off))
    }

    /// `base[index]`: load the element's data pointer into `%r11`, add the
    /// scaled index, and return an indirect lvalue at offset 0.
    fn array_element_lvalue(&mut self, base: &Expr, index: &Expr) -> CgResult<Lvalue> {
        let base_ty = self.expr_type_hint(base);
        let normalized = base_ty.normalize().clone();

        let elem_ty = match &normalized {
            // The array struct's first field *is* the data pointer, at
            // offset 0, so loading the lvalue's operand already yields the
            // pointer value — same as the plain-pointer and string cases.
            Type::Array(elem) => (**elem).clone(),
            Type::String => Type::CHAR,
            Type::Pointer(elem) => (**elem).clone(),
            other => return Err(CodegenError::Logic(format!("cannot index into type {}", other))),
        };
        let elem_sz = self.sizeof(&elem_ty);

        let base_lv = self.lvalue(base)?;
        self.text.push(format!("    mov {}, %r11", base_lv.operand()));
        self.text.push("    push %r11".to_string());
        self.gen_expr(index)?;
        self.text.push("    pop %r11".to_string());
        if elem_sz != 1 {
            self.text.push(format!("    imul ${}, %rax", elem_sz));
        }
        self.text.push("    add %rax, %r11".to_string());
        Ok(Lvalue { loc: Location::Indirect(0), ty: elem_ty })
    }
}
