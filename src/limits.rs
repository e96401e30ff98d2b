//! Implementation limits for WebAssembly parsing.
//!
//! These limits are aligned with V8's limits from src/wasm/wasm-limits.h.
//! They prevent OOM from malformed input claiming unrealistic counts, and
//! keep behaviour compatible with mainstream WebAssembly tooling.

/// Maximum number of type definitions in a module
pub const MAX_TYPES: u32 = 1_000_000;

/// Maximum number of defined functions in a module
pub const MAX_FUNCTIONS: u32 = 1_000_000;

/// Maximum number of imports in a module
pub const MAX_IMPORTS: u32 = 1_000_000;

/// Maximum number of exports in a module
pub const MAX_EXPORTS: u32 = 1_000_000;

/// Maximum number of globals in a module
pub const MAX_GLOBALS: u32 = 1_000_000;

/// Maximum number of events (exception tags) in a module
pub const MAX_EVENTS: u32 = 1_000_000;

/// Maximum number of data segments in a module
pub const MAX_DATA_SEGMENTS: u32 = 100_000;

/// Maximum number of element segments in a module
pub const MAX_ELEMENT_SEGMENTS: u32 = 100_000;

/// Maximum number of tables in a module
pub const MAX_TABLES: u32 = 100_000;

/// Maximum number of memories in a module
pub const MAX_MEMORIES: u32 = 100_000;

/// Maximum function body size in bytes
pub const MAX_FUNCTION_SIZE: u32 = 7_654_321;

/// Maximum number of function parameters
pub const MAX_FUNCTION_PARAMS: u32 = 1_000;

/// Maximum number of function return values
pub const MAX_FUNCTION_RETURNS: u32 = 1_000;

/// Maximum number of local variables in a function
pub const MAX_FUNCTION_LOCALS: u32 = 50_000;

/// Maximum number of labels in a br_table instruction
pub const MAX_BR_TABLE_LABELS: u32 = 65_536;

/// Maximum number of value types in a typed select instruction
pub const MAX_SELECT_TYPED_VALUES: u32 = 1_000;

/// Maximum memory pages for 32-bit addressing (4 GB)
pub const MAX_MEMORY_PAGES_32: u32 = 65_536;

/// Maximum memory pages for 64-bit addressing (16 GB)
pub const MAX_MEMORY_PAGES_64: u64 = 262_144;
