//! Code generator state.
//!
//! Grounded on `original_source/c5c/codegen.py::CodeGen.__init__`: one
//! mutable struct threaded through every codegen call, holding the
//! declaration tables built from the program's top-level decls plus the
//! growing output buffers (`.rodata`/`.data`/`.text`).

use crate::types::{AliasLayout, EnumLayout, StructLayout, Type};
use std::collections::HashMap;

pub(super) struct FuncSig {
    pub ret: Type,
    pub varargs: bool,
}

pub struct CodeGen {
    pub(super) rodata: Vec<String>,
    pub(super) data: Vec<String>,
    pub(super) text: Vec<String>,

    pub(super) structs: HashMap<String, StructLayout>,
    pub(super) enums: HashMap<String, EnumLayout>,
    pub(super) aliases: HashMap<String, AliasLayout>,
    pub(super) func_sigs: HashMap<String, FuncSig>,
    pub(super) globals: HashMap<String, Type>,

    pub(super) locals: HashMap<String, (i32, Type)>,
    pub(super) local_offset: i32,

    pub(super) label_count: usize,
    pub(super) string_literals: HashMap<String, String>,
    pub(super) float_literals: HashMap<String, String>,

    pub(super) current_func_ret: Type,
    pub(super) func_has_return: bool,
    pub(super) break_targets: Vec<String>,

    pub(super) lambda_count: usize,
    pub(super) lambda_funcs: Vec<Vec<String>>,

    pub(super) uses_str_add: bool,
    pub(super) uses_str_sub: bool,
    pub(super) uses_array_push: bool,
    pub(super) uses_array_pop: bool,
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            rodata: Vec::new(),
            data: Vec::new(),
            text: Vec::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            aliases: HashMap::new(),
            func_sigs: HashMap::new(),
            globals: HashMap::new(),
            locals: HashMap::new(),
            local_offset: 0,
            label_count: 0,
            string_literals: HashMap::new(),
            float_literals: HashMap::new(),
            current_func_ret: Type::Void,
            func_has_return: false,
            break_targets: Vec::new(),
            lambda_count: 0,
            lambda_funcs: Vec::new(),
            uses_str_add: false,
            uses_str_sub: false,
            uses_array_push: false,
            uses_array_pop: false,
        }
    }

    pub(super) fn sizeof(&self, ty: &Type) -> u32 {
        crate::types::sizeof(ty, &self.structs, &self.enums, &self.aliases)
    }

    pub(super) fn new_label(&mut self, prefix: &str) -> String {
        self.label_count += 1;
        format!(".L{}{}", prefix, self.label_count)
    }

    /// Mangle `::`-namespaced names into valid assembler symbols, per
    /// `original_source/c5c/codegen.py::mangle`.
    pub(super) fn mangle(name: &str) -> String {
        name.replace("::", "_")
    }

    pub(super) fn string_label(&mut self, value: &str) -> String {
        if let Some(label) = self.string_literals.get(value) {
            return label.clone();
        }
        let label = format!(".Lstr{}", self.string_literals.len());
        self.rodata.push(format!("{}:", label));
        self.rodata.push(format!("    .string {:?}", value));
        self.string_literals.insert(value.to_string(), label.clone());
        label
    }

    pub(super) fn float_label(&mut self, bits: u32, value: f64) -> String {
        let key = format!("{}:{}", bits, value.to_bits());
        if let Some(label) = self.float_literals.get(&key) {
            return label.clone();
        }
        let label = format!(".Lflt{}", self.float_literals.len());
        self.rodata.push(format!("{}:", label));
        if bits == 32 {
            self.rodata.push(format!("    .float {:?}", value as f32));
        } else {
            self.rodata.push(format!("    .double {:?}", value));
        }
        self.float_literals.insert(key, label.clone());
        label
    }
}
