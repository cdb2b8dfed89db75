//! C5's type system.
//!
//! The original implementation represents types as strings (`"unsigned
//! int<32>*"`) and re-parses that grammar throughout the analyzer and code
//! generator. `Type` replaces that with a tagged enum so every consumer
//! matches on structure instead of slicing text.

use std::fmt;

/// A C5 type.
///
/// `signed`/`unsigned`/`const` from the source grammar are carried as flags
/// on `Int` (signedness) and as a wrapper (`Const`) rather than as string
/// prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `int`, `char`, `int<N>`. `char` is `Int { bits: 8, signed: true }`;
    /// plain `int` is `Int { bits: 64, signed: true }`.
    Int { bits: u32, signed: bool },
    /// `float<32>` / `float<64>` (plain `float` normalizes to 64).
    Float { bits: u32 },
    /// `void`.
    Void,
    /// `string`.
    String,
    /// `T*`. Pointer chains are nested: `T**` is `Pointer(Pointer(T))`.
    Pointer(Box<Type>),
    /// `array<T>`, a 24-byte fat pointer at runtime.
    Array(Box<Type>),
    /// A function-pointer value (`fnct` lambdas, assigned to locals).
    FnPtr,
    /// A struct, enum, or union-alias referenced by name. Parsed uniformly
    /// (the grammar can't tell which at the use site — a bare identifier
    /// base type); which kind it is gets resolved by consulting the
    /// declaration tables built in `analyzer.rs`'s pre-pass, mirroring
    /// `original_source/c5c/codegen.py`'s `is_struct_type`/`is_enum_type`
    /// checks against its own declaration dicts.
    Named(String),
    /// `const T`.
    Const(Box<Type>),
}

impl Type {
    pub const INT: Type = Type::Int { bits: 64, signed: true };
    pub const CHAR: Type = Type::Int { bits: 8, signed: true };

    pub fn pointer(inner: Type) -> Type {
        Type::Pointer(Box::new(inner))
    }

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.normalize(), Type::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.normalize(), Type::Array(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.normalize(), Type::Int { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self.normalize(), Type::Float { .. })
    }

    pub fn is_string(&self) -> bool {
        matches!(self.normalize(), Type::String)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.normalize(), Type::Int { signed: true, .. })
    }

    /// Strip a `const` wrapper, if present. Used for comparisons; `const`
    /// affects writability, not type identity.
    pub fn normalize(&self) -> &Type {
        match self {
            Type::Const(inner) => inner.normalize(),
            other => other,
        }
    }

    pub fn strip_const(&self) -> Type {
        self.normalize().clone()
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Type::Const(_))
    }

    /// The pointee type of a pointer, or `int<8>` for `void*` per spec.md
    /// §4.6's pointer-arithmetic scaling rule.
    pub fn pointee(&self) -> Type {
        match self.normalize() {
            Type::Pointer(inner) => match inner.normalize() {
                Type::Void => Type::CHAR.clone(),
                t => t.clone(),
            },
            other => other.clone(),
        }
    }

    pub fn array_elem(&self) -> Option<Type> {
        match self.normalize() {
            Type::Array(elem) => Some((**elem).clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int { bits: 64, signed: true } => write!(f, "int"),
            Type::Int { bits: 8, signed: true } => write!(f, "char"),
            Type::Int { bits, signed: true } => write!(f, "int<{}>", bits),
            Type::Int { bits, signed: false } => write!(f, "unsigned int<{}>", bits),
            Type::Float { bits: 64 } => write!(f, "float"),
            Type::Float { bits } => write!(f, "float<{}>", bits),
            Type::Void => write!(f, "void"),
            Type::String => write!(f, "string"),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Array(elem) => write!(f, "array<{}>", elem),
            Type::FnPtr => write!(f, "fnptr"),
            Type::Named(name) => write!(f, "{}", name),
            Type::Const(inner) => write!(f, "const {}", inner),
        }
    }
}

/// Signed/unsigned range for an `N`-bit integer, per spec.md §4.5.
pub fn int_range(bits: u32, signed: bool) -> (i64, i64) {
    if signed {
        let min = if bits >= 64 { i64::MIN } else { -(1i64 << (bits - 1)) };
        let max = if bits >= 64 { i64::MAX } else { (1i64 << (bits - 1)) - 1 };
        (min, max)
    } else {
        let max = if bits >= 64 { i64::MAX } else { (1i64 << bits) - 1 };
        (0, max)
    }
}

/// Layout of a declared struct: ordered fields, each with a byte offset,
/// and the struct's total padded size.
#[derive(Debug, Clone)]
pub struct StructLayout {
    pub fields: Vec<(String, Type, u32)>,
    pub size: u32,
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&(String, Type, u32)> {
        self.fields.iter().find(|(n, _, _)| n == name)
    }
}

/// Ordered variant list of a declared enum; the value of variant `i` is `i`.
#[derive(Debug, Clone)]
pub struct EnumLayout {
    pub variants: Vec<String>,
}

impl EnumLayout {
    pub fn index_of(&self, name: &str) -> Option<i64> {
        self.variants.iter().position(|v| v == name).map(|i| i as i64)
    }
}

/// A `type N { T1, T2, ... }` tagged-union alias: storage is the max of the
/// members' sizes, compatibility is "any member matches".
#[derive(Debug, Clone)]
pub struct AliasLayout {
    pub members: Vec<Type>,
    pub size: u32,
}

/// Byte size of a type, given struct/enum/alias layouts for resolving named
/// sizes. Mirrors `original_source/c5c/codegen.py::sizeof`: enums are 4
/// bytes, a genuinely unresolved name falls back to a single word.
pub fn sizeof(
    ty: &Type,
    structs: &std::collections::HashMap<String, StructLayout>,
    enums: &std::collections::HashMap<String, EnumLayout>,
    aliases: &std::collections::HashMap<String, AliasLayout>,
) -> u32 {
    match ty.normalize() {
        Type::Int { bits, .. } => (*bits).div_ceil(8).max(1),
        Type::Float { bits } => bits / 8,
        Type::Void => 0,
        Type::String => 8,
        Type::Pointer(_) | Type::FnPtr => 8,
        Type::Array(_) => 24,
        Type::Named(name) => {
            if let Some(s) = structs.get(name) {
                s.size
            } else if enums.contains_key(name) {
                4
            } else if let Some(a) = aliases.get(name) {
                a.size
            } else {
                8
            }
        }
        Type::Const(_) => unreachable!("normalize strips const"),
    }
}

/// Compute a struct's field layout from its declared (type, name) list, per
/// spec.md §3: each field aligned to `min(sizeof(field), 8)`, size padded to
/// a multiple of 8.
pub fn layout_struct(
    fields: &[(Type, String)],
    structs: &std::collections::HashMap<String, StructLayout>,
    enums: &std::collections::HashMap<String, EnumLayout>,
    aliases: &std::collections::HashMap<String, AliasLayout>,
) -> StructLayout {
    let mut cursor: u32 = 0;
    let mut laid_out = Vec::with_capacity(fields.len());
    for (ty, name) in fields {
        let sz = sizeof(ty, structs, enums, aliases);
        let align = sz.clamp(1, 8);
        let offset = cursor.div_ceil(align) * align;
        laid_out.push((name.clone(), ty.clone(), offset));
        cursor = offset + sz;
    }
    let total = if fields.is_empty() { 0 } else { cursor.div_ceil(8).max(1) * 8 };
    StructLayout { fields: laid_out, size: total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_source_spelling() {
        assert_eq!(Type::INT.to_string(), "int");
        assert_eq!(Type::CHAR.to_string(), "char");
        assert_eq!(Type::Int { bits: 32, signed: true }.to_string(), "int<32>");
        assert_eq!(Type::Int { bits: 32, signed: false }.to_string(), "unsigned int<32>");
        assert_eq!(Type::Float { bits: 32 }.to_string(), "float<32>");
        assert_eq!(Type::pointer(Type::INT).to_string(), "int*");
        assert_eq!(Type::array(Type::INT).to_string(), "array<int>");
    }

    #[test]
    fn const_is_transparent_to_normalize() {
        let t = Type::Const(Box::new(Type::INT));
        assert_eq!(t.normalize(), &Type::INT);
        assert!(t.is_const());
        assert!(!Type::INT.is_const());
    }

    #[test]
    fn int_range_matches_bit_width() {
        assert_eq!(int_range(8, true), (-128, 127));
        assert_eq!(int_range(8, false), (0, 255));
        assert_eq!(int_range(32, true), (-2147483648, 2147483647));
        assert_eq!(int_range(32, false), (0, 4294967295));
    }

    #[test]
    fn struct_layout_pads_to_eight() {
        let structs = std::collections::HashMap::new();
        let enums = std::collections::HashMap::new();
        let aliases = std::collections::HashMap::new();
        let fields = vec![(Type::CHAR, "a".to_string()), (Type::INT, "b".to_string())];
        let layout = layout_struct(&fields, &structs, &enums, &aliases);
        assert_eq!(layout.fields[0].2, 0);
        assert_eq!(layout.fields[1].2, 8);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn pointee_of_void_star_is_char() {
        let voidptr = Type::pointer(Type::Void);
        assert_eq!(voidptr.pointee(), Type::CHAR);
    }
}
