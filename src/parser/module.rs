//! Structural entities of a module and the materialized [`Module`] view.
//!
//! Every entity borrows from the input buffer where it can: names are
//! `&str` sub-slices, data segment payloads and code bodies are `&[u8]`
//! sub-slices. The buffer must outlive every entity derived from it.
//!
//! The lazy path ([`crate::parser::section`]) never builds a `Module`; this
//! view exists for callers that want the whole module at once, in particular
//! the validator.

use crate::error::ErrorSink;
use crate::features::Features;
use crate::location::Location;
use crate::parser::encoding::{ExternalKind, Mutability, RefType, SectionId, ValueType};
use crate::parser::instruction::Instruction;
use std::fmt;

/// A function signature: parameter types and result types.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
    pub location: Location,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) -> {}",
            self.params
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", "),
            if self.results.is_empty() {
                "nil".to_string()
            } else {
                self.results
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<String>>()
                    .join(", ")
            }
        )
    }
}

/// Size bounds of a table or memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u64,
    pub max: Option<u64>,
    pub shared: bool,
    pub memory64: bool,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min={}", self.min)?;
        if let Some(max) = self.max {
            write!(f, " max={max}")?;
        }
        if self.shared {
            write!(f, " shared")?;
        }
        if self.memory64 {
            write!(f, " i64")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub elem: RefType,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutability: Mutability,
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mutability, self.value_type)
    }
}

/// An exception event type (exceptions proposal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventType {
    /// Event attribute; only `0` (exception) is defined.
    pub attribute: u32,
    pub type_index: u32,
}

/// What an import brings into the module.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    Function { type_index: u32 },
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
    Event(EventType),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDesc::Function { .. } => ExternalKind::Function,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
            ImportDesc::Event(_) => ExternalKind::Event,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import<'a> {
    pub module: &'a str,
    pub name: &'a str,
    pub desc: ImportDesc,
    pub location: Location,
}

impl fmt::Display for Import<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{} kind={}", self.module, self.name, self.desc.kind())
    }
}

/// An entry of the function section: the signature of a defined function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub type_index: u32,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub table_type: TableType,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    pub memory_type: MemoryType,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub location: Location,
}

/// A constant expression: exactly one producer instruction plus `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    pub producer: Instruction,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: ConstExpr,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export<'a> {
    pub name: &'a str,
    pub kind: ExternalKind,
    pub index: u32,
    pub location: Location,
}

impl fmt::Display for Export<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}[{}]", self.name, self.kind, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Start {
    pub func_index: u32,
    pub location: Location,
}

/// Placement of an element or data segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentMode {
    /// Copied into a table or memory at instantiation.
    Active { index: u32, offset: ConstExpr },
    /// Available to `table.init` / `memory.init`.
    Passive,
    /// Element-only: declares references without placing them.
    Declared,
}

/// Initializers of an element segment.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementInit {
    Functions(Vec<u32>),
    Expressions(Vec<ConstExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    pub elem_type: RefType,
    pub mode: SegmentMode,
    pub init: ElementInit,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment<'a> {
    pub mode: SegmentMode,
    pub init: &'a [u8],
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataCount {
    pub count: u32,
    pub location: Location,
}

/// A run of locals of one type in a code body header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalsGroup {
    pub count: u32,
    pub value_type: ValueType,
}

/// A function body: local groups plus the raw expression bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Code<'a> {
    pub locals: Vec<LocalsGroup>,
    /// The expression bytes, including the final `end`.
    pub expr: &'a [u8],
    /// Absolute offset of the first expression byte, for instruction
    /// locations.
    pub expr_offset: usize,
    pub location: Location,
}

impl Code<'_> {
    /// Expand the local groups into a flat list of local types.
    pub fn local_types(&self) -> Vec<ValueType> {
        let total: u64 = self.locals.iter().map(|g| u64::from(g.count)).sum();
        let mut locals = Vec::with_capacity(total as usize);
        for group in &self.locals {
            for _ in 0..group.count {
                locals.push(group.value_type);
            }
        }
        locals
    }

    /// Total number of declared locals, without expanding them.
    pub fn local_count(&self) -> u64 {
        self.locals.iter().map(|g| u64::from(g.count)).sum()
    }
}

/// A custom section: a name and an opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomSection<'a> {
    pub name: &'a str,
    pub payload: &'a [u8],
    pub location: Location,
}

/// A known or custom section encountered while walking the module, in order
/// of appearance. The validator uses this to check canonical ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSummary {
    pub id: SectionId,
    pub location: Location,
}

/// A whole module, materialized.
///
/// Produced by [`Module::parse`], which attempts every section and records
/// all diagnostics in the caller's sink rather than stopping at the first
/// problem. A `Module` may therefore be partial; callers that need
/// well-formedness should check the sink and run
/// [`crate::validate::validate`].
#[derive(Debug, Default)]
pub struct Module<'a> {
    pub types: Vec<FunctionType>,
    pub imports: Vec<Import<'a>>,
    pub functions: Vec<Function>,
    pub tables: Vec<Table>,
    pub memories: Vec<Memory>,
    pub globals: Vec<Global>,
    pub events: Vec<Event>,
    pub exports: Vec<Export<'a>>,
    pub start: Option<Start>,
    pub elements: Vec<ElementSegment>,
    pub code: Vec<Code<'a>>,
    pub data: Vec<DataSegment<'a>>,
    pub data_count: Option<DataCount>,
    pub customs: Vec<CustomSection<'a>>,
    /// Sections in order of appearance, custom sections included.
    pub sections: Vec<SectionSummary>,
}

impl<'a> Module<'a> {
    /// Parse a whole module, collecting every diagnostic in `sink`.
    pub fn parse(bytes: &'a [u8], features: Features, sink: &ErrorSink) -> Module<'a> {
        crate::parser::read::read_module(bytes, features, sink)
    }

    /// One line per present section, for tooling output.
    pub fn to_header_string(&self) -> String {
        let mut result = String::new();
        for summary in &self.sections {
            result.push_str(&format!(
                "{:>10} start=0x{:08x} end=0x{:08x} (size=0x{:08x})\n",
                summary.id.name(),
                summary.location.start,
                summary.location.end,
                summary.location.len()
            ));
        }
        result
    }

    /// Per-entity detail listing, for tooling output.
    pub fn to_details_string(&self) -> String {
        let mut result = String::new();
        if !self.types.is_empty() {
            result.push_str(&format!("Type[{}]:\n", self.types.len()));
            for (i, ty) in self.types.iter().enumerate() {
                result.push_str(&format!(" - type[{i}] {ty}\n"));
            }
        }
        if !self.imports.is_empty() {
            result.push_str(&format!("Import[{}]:\n", self.imports.len()));
            for (i, import) in self.imports.iter().enumerate() {
                result.push_str(&format!(" - import[{i}] {import}\n"));
            }
        }
        if !self.functions.is_empty() {
            result.push_str(&format!("Function[{}]:\n", self.functions.len()));
            for (i, function) in self.functions.iter().enumerate() {
                result.push_str(&format!(" - func[{i}] sig={}\n", function.type_index));
            }
        }
        if !self.tables.is_empty() {
            result.push_str(&format!("Table[{}]:\n", self.tables.len()));
            for (i, table) in self.tables.iter().enumerate() {
                result.push_str(&format!(
                    " - table[{i}] {} {}\n",
                    table.table_type.elem, table.table_type.limits
                ));
            }
        }
        if !self.memories.is_empty() {
            result.push_str(&format!("Memory[{}]:\n", self.memories.len()));
            for (i, memory) in self.memories.iter().enumerate() {
                result.push_str(&format!(" - memory[{i}] {}\n", memory.memory_type.limits));
            }
        }
        if !self.globals.is_empty() {
            result.push_str(&format!("Global[{}]:\n", self.globals.len()));
            for (i, global) in self.globals.iter().enumerate() {
                result.push_str(&format!(
                    " - global[{i}] {} init={}\n",
                    global.global_type, global.init.producer
                ));
            }
        }
        if !self.exports.is_empty() {
            result.push_str(&format!("Export[{}]:\n", self.exports.len()));
            for (i, export) in self.exports.iter().enumerate() {
                result.push_str(&format!(" - export[{i}] {export}\n"));
            }
        }
        if let Some(start) = &self.start {
            result.push_str(&format!("Start:\n - func[{}]\n", start.func_index));
        }
        if !self.elements.is_empty() {
            result.push_str(&format!("Element[{}]:\n", self.elements.len()));
            for (i, segment) in self.elements.iter().enumerate() {
                let count = match &segment.init {
                    ElementInit::Functions(fs) => fs.len(),
                    ElementInit::Expressions(es) => es.len(),
                };
                result.push_str(&format!(
                    " - segment[{i}] {} count={count}\n",
                    segment.elem_type
                ));
            }
        }
        if !self.code.is_empty() {
            result.push_str(&format!("Code[{}]:\n", self.code.len()));
            for (i, code) in self.code.iter().enumerate() {
                result.push_str(&format!(
                    " - func[{i}] size={} locals={}\n",
                    code.location.len(),
                    code.local_count()
                ));
            }
        }
        if !self.data.is_empty() {
            result.push_str(&format!("Data[{}]:\n", self.data.len()));
            for (i, segment) in self.data.iter().enumerate() {
                let preview = &segment.init[..segment.init.len().min(16)];
                result.push_str(&format!(
                    " - segment[{i}] size={} bytes={}{}\n",
                    segment.init.len(),
                    hex::encode(preview),
                    if segment.init.len() > preview.len() {
                        ".."
                    } else {
                        ""
                    }
                ));
            }
        }
        for custom in &self.customs {
            result.push_str(&format!(
                "Custom \"{}\" size={}\n",
                custom.name,
                custom.payload.len()
            ));
        }
        result
    }

    /// The signature of function `index`, imports first, if both the index
    /// and its type index are in range.
    pub fn function_type(&self, index: u32) -> Option<&FunctionType> {
        let mut remaining = index as usize;
        for import in &self.imports {
            if let ImportDesc::Function { type_index } = import.desc {
                if remaining == 0 {
                    return self.types.get(type_index as usize);
                }
                remaining -= 1;
            }
        }
        let function = self.functions.get(remaining)?;
        self.types.get(function.type_index as usize)
    }

    /// Number of imported functions.
    pub fn imported_function_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Function { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_type_display() {
        let ty = FunctionType {
            params: vec![ValueType::I32, ValueType::I64],
            results: vec![ValueType::F64],
            location: Location::default(),
        };
        assert_eq!(format!("{ty}"), "(i32, i64) -> f64");

        let nullary = FunctionType {
            params: vec![],
            results: vec![],
            location: Location::default(),
        };
        assert_eq!(format!("{nullary}"), "() -> nil");
    }

    #[test]
    fn code_local_expansion() {
        let code = Code {
            locals: vec![
                LocalsGroup {
                    count: 2,
                    value_type: ValueType::I32,
                },
                LocalsGroup {
                    count: 1,
                    value_type: ValueType::F64,
                },
            ],
            expr: &[0x0b],
            expr_offset: 0,
            location: Location::default(),
        };
        assert_eq!(code.local_count(), 3);
        assert_eq!(
            code.local_types(),
            vec![ValueType::I32, ValueType::I32, ValueType::F64]
        );
    }

    #[test]
    fn limits_display() {
        let limits = Limits {
            min: 1,
            max: Some(16),
            shared: true,
            memory64: false,
        };
        assert_eq!(format!("{limits}"), "min=1 max=16 shared");
    }
}
