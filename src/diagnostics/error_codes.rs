//! Diagnostic tag definitions
//!
//! Tags are stable strings consumed by the error reporter and the LSP
//! diagnostics converter.

/// Structural errors: fatal to the current declaration only
pub mod structural {
    pub const DUPLICATE_SYMBOL: &str = "Duplicate Symbol";
    pub const UNDEFINED_IDENTIFIER: &str = "Undefined Identifier";
    pub const ARGUMENT_COUNT_MISMATCH: &str = "Argument Count Mismatch";
    pub const INVALID_CONTROL_FLOW: &str = "Invalid Control Flow";
    pub const MISSING_FIELD: &str = "Missing Field";
}

/// Type errors: fatal to the current expression's result
pub mod types {
    pub const TYPE_MISMATCH: &str = "Type Mismatch";
    pub const UNKNOWN_TYPE: &str = "Unknown Type";
    pub const NOT_CALLABLE: &str = "Not Callable";
    pub const INVALID_OPERAND: &str = "Invalid Operand";
    pub const NOT_INDEXABLE: &str = "Not Indexable";
    pub const UNKNOWN_MEMBER: &str = "Unknown Member";
    pub const PRIVATE_ACCESS: &str = "Private Access";
    pub const IMMUTABLE_ASSIGNMENT: &str = "Immutable Assignment";
    pub const RETURN_MISMATCH: &str = "Return Mismatch";
    pub const NON_EXHAUSTIVE_SWITCH: &str = "Non Exhaustive Switch";
}

/// Module resolution errors
pub mod modules {
    pub const DUPLICATE_MODULE: &str = "Duplicate Module";
    pub const MODULE_NOT_FOUND: &str = "Module Not Found";
    pub const CIRCULAR_DEPENDENCY: &str = "Circular Dependency";
    pub const INVALID_MODULE_ACCESS: &str = "Invalid Module Access";
}

/// Memory-safety findings: always advisory
pub mod memory {
    pub const DOUBLE_FREE: &str = "Double Free";
    pub const USE_AFTER_FREE: &str = "Use After Free";
    pub const MEMORY_LEAK: &str = "Memory Leak";
    pub const UNTRACKED_FREE: &str = "Untracked Free";
}

/// Warnings
pub mod warnings {
    pub const REDUNDANT_DEFAULT: &str = "Redundant Default";
}
