//! Type representation and the compatibility lattice
//!
//! Types are immutable value trees. Struct types carry only an interned id
//! and their name; members live in the [`StructTable`] so a struct can refer
//! to itself while it is still being built.

mod structs;

pub use structs::{MemberKind, StructBuilder, StructDef, StructId, StructMember, StructTable};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names the checker treats as primitive types
pub const BUILTIN_TYPES: &[&str] = &["int", "float", "double", "bool", "char", "string", "void"];

/// Numeric types in promotion order
const NUMERIC_LADDER: &[&str] = &["int", "float", "double"];

/// A checked type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// Primitive, or a nominal enum marker
    Basic(String),
    Pointer(Box<Type>),
    Array {
        element: Box<Type>,
        size: Option<ArraySize>,
    },
    Struct {
        id: StructId,
        name: String,
    },
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
}

/// Array length as written in the type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArraySize {
    Literal(i64),
    /// e.g. `[int; N]`
    Symbolic(String),
}

/// Verdict of [`types_match`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeMatchResult {
    /// No implicit conversion exists
    Incompatible,
    /// An implicit conversion exists
    Compatible,
    /// Identical types
    Exact,
}

impl TypeMatchResult {
    /// True unless the types are incompatible
    pub fn is_match(self) -> bool {
        self != TypeMatchResult::Incompatible
    }
}

impl Type {
    pub fn basic(name: &str) -> Self {
        Type::Basic(name.to_string())
    }

    pub fn int() -> Self {
        Type::basic("int")
    }

    pub fn bool() -> Self {
        Type::basic("bool")
    }

    pub fn void() -> Self {
        Type::basic("void")
    }

    pub fn pointer(pointee: Type) -> Self {
        Type::Pointer(Box::new(pointee))
    }

    pub fn array(element: Type, size: Option<ArraySize>) -> Self {
        Type::Array {
            element: Box::new(element),
            size,
        }
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Basic(name) if name == "void")
    }

    /// A non-builtin basic type, i.e. an enum tag
    pub fn is_enum_like(&self) -> bool {
        matches!(self, Type::Basic(name) if !is_builtin_type(name))
    }

    /// The struct behind a value or a pointer to it
    pub fn struct_id(&self) -> Option<StructId> {
        match self {
            Type::Struct { id, .. } => Some(*id),
            Type::Pointer(inner) => match inner.as_ref() {
                Type::Struct { id, .. } => Some(*id),
                _ => None,
            },
            _ => None,
        }
    }
}

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

pub fn is_numeric_type(ty: &Type) -> bool {
    matches!(ty, Type::Basic(name) if NUMERIC_LADDER.contains(&name.as_str()))
}

pub fn is_pointer_type(ty: &Type) -> bool {
    matches!(ty, Type::Pointer(_))
}

pub fn is_array_type(ty: &Type) -> bool {
    matches!(ty, Type::Array { .. })
}

/// Integers, chars and enum tags can index arrays
pub fn is_integer_like(ty: &Type) -> bool {
    match ty {
        Type::Basic(name) => name == "int" || name == "char" || !is_builtin_type(name),
        _ => false,
    }
}

/// Result type of an arithmetic operation on two numeric operands
pub fn promote_numeric(a: &Type, b: &Type) -> Option<Type> {
    let rank = |t: &Type| match t {
        Type::Basic(name) => NUMERIC_LADDER.iter().position(|n| n == name),
        _ => None,
    };
    let highest = rank(a)?.max(rank(b)?);
    Some(Type::basic(NUMERIC_LADDER[highest]))
}

/// Three-valued compatibility between two types
pub fn types_match(a: &Type, b: &Type) -> TypeMatchResult {
    use TypeMatchResult::*;

    if a == b {
        return Exact;
    }

    match (a, b) {
        (Type::Struct { name: x, .. }, Type::Struct { name: y, .. }) => {
            if x == y {
                Exact
            } else {
                Incompatible
            }
        }
        (Type::Basic(x), Type::Basic(y)) => {
            if x == y {
                return Exact;
            }
            let enum_int_bridge =
                (!is_builtin_type(x) && y == "int") || (x == "int" && !is_builtin_type(y));
            if enum_int_bridge || (is_numeric_type(a) && is_numeric_type(b)) {
                Compatible
            } else {
                Incompatible
            }
        }
        (Type::Basic(s), Type::Pointer(p)) | (Type::Pointer(p), Type::Basic(s))
            if s == "string" =>
        {
            if matches!(p.as_ref(), Type::Basic(c) if c == "char") {
                Compatible
            } else {
                Incompatible
            }
        }
        (Type::Pointer(x), Type::Pointer(y)) => types_match(x, y),
        (
            Type::Array {
                element: ea,
                size: sa,
            },
            Type::Array {
                element: eb,
                size: sb,
            },
        ) => {
            let element = types_match(ea, eb);
            if !element.is_match() {
                return Incompatible;
            }
            match (sa, sb) {
                (Some(ArraySize::Literal(n)), Some(ArraySize::Literal(m))) if n != m => {
                    Incompatible
                }
                _ => element,
            }
        }
        (Type::Array { element, .. }, Type::Pointer(p))
        | (Type::Pointer(p), Type::Array { element, .. }) => types_match(element, p),
        _ => Incompatible,
    }
}

/// Render a type for diagnostics
pub fn type_to_string(ty: &Type) -> String {
    ty.to_string()
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(name) => write!(f, "{}", name),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Array { element, .. } => write!(f, "{}[]", element),
            Type::Struct { name, .. } => write!(f, "struct {}", name),
            Type::Function { params, ret } => write!(f, "fn({} params) -> {}", params.len(), ret),
        }
    }
}

#[cfg(test)]
mod tests;
