//! Module-level validation: index spaces, section ordering, limits, and
//! cross-section consistency.
//!
//! [`ModuleContext`] flattens the module's index spaces (imports first, then
//! definitions) so both this pass and the per-function type checker resolve
//! indices the same way.

use crate::error::{Error, ErrorKind, ErrorSink, Reported};
use crate::features::Features;
use crate::limits;
use crate::location::Location;
use crate::parser::encoding::{ExternalKind, Mutability, RefType, SectionId, ValueType};
use crate::parser::instruction::Immediate;
use crate::parser::module::{
    ConstExpr, ElementInit, EventType, FunctionType, GlobalType, Limits, MemoryType, Module,
    SegmentMode, TableType,
};
use crate::parser::opcodes::Opcode;
use std::collections::HashSet;

/// Flattened index spaces of a module, imports first.
pub struct ModuleContext<'m> {
    pub features: Features,
    pub types: &'m [FunctionType],
    /// Type index of every function, imports first.
    pub functions: Vec<u32>,
    pub imported_functions: usize,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<GlobalType>,
    pub imported_globals: usize,
    pub events: Vec<EventType>,
    pub data_count: Option<u32>,
    pub element_count: u32,
}

impl<'m> ModuleContext<'m> {
    pub fn build(module: &'m Module, features: Features) -> Self {
        let mut functions = Vec::new();
        let mut tables = Vec::new();
        let mut memories = Vec::new();
        let mut globals = Vec::new();
        let mut events = Vec::new();

        for import in &module.imports {
            match &import.desc {
                crate::parser::module::ImportDesc::Function { type_index } => {
                    functions.push(*type_index)
                }
                crate::parser::module::ImportDesc::Table(tt) => tables.push(*tt),
                crate::parser::module::ImportDesc::Memory(mt) => memories.push(*mt),
                crate::parser::module::ImportDesc::Global(gt) => globals.push(*gt),
                crate::parser::module::ImportDesc::Event(et) => events.push(*et),
            }
        }
        let imported_functions = functions.len();
        let imported_globals = globals.len();

        functions.extend(module.functions.iter().map(|f| f.type_index));
        tables.extend(module.tables.iter().map(|t| t.table_type));
        memories.extend(module.memories.iter().map(|m| m.memory_type));
        globals.extend(module.globals.iter().map(|g| g.global_type));
        events.extend(module.events.iter().map(|e| e.event_type));

        Self {
            features,
            types: &module.types,
            functions,
            imported_functions,
            tables,
            memories,
            globals,
            imported_globals,
            events,
            data_count: module.data_count.map(|dc| dc.count),
            element_count: module.elements.len() as u32,
        }
    }

    /// The signature of function `index` (imports first), if valid.
    pub fn function_type(&self, index: u32) -> Option<&FunctionType> {
        let type_index = *self.functions.get(index as usize)?;
        self.types.get(type_index as usize)
    }

    /// The index type of memory 0: `i64` for 64-bit memories, else `i32`.
    pub fn memory_index_type(&self) -> ValueType {
        match self.memories.first() {
            Some(mt) if mt.limits.memory64 => ValueType::I64,
            _ => ValueType::I32,
        }
    }

    /// The feature a value type is gated on.
    pub fn value_type_features(vt: ValueType) -> Features {
        match vt {
            ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64 => Features::MVP,
            ValueType::V128 => Features::SIMD,
            ValueType::FuncRef | ValueType::ExternRef | ValueType::NullRef => {
                Features::REFERENCE_TYPES
            }
            ValueType::ExnRef => Features::EXCEPTIONS,
        }
    }

    /// Report a `FeatureDisabled` diagnostic if `required` is not enabled.
    pub fn require(
        &self,
        required: Features,
        location: Location,
        what: &str,
        sink: &ErrorSink,
    ) -> Result<(), Reported> {
        if self.features.contains(required) {
            Ok(())
        } else {
            Err(sink.report(Error::new(
                ErrorKind::FeatureDisabled,
                location,
                format!("{what} requires the {} feature", required.name()),
            )))
        }
    }
}

/// Check a constant expression against an expected type. Returns the
/// produced type when it could be determined.
pub fn check_const_expr(
    ctx: &ModuleContext,
    expr: &ConstExpr,
    expected: ValueType,
    sink: &ErrorSink,
) {
    let location = expr.producer.location;
    let produced = match (expr.producer.opcode, &expr.producer.immediate) {
        (Opcode::I32Const, _) => Some(ValueType::I32),
        (Opcode::I64Const, _) => Some(ValueType::I64),
        (Opcode::F32Const, _) => Some(ValueType::F32),
        (Opcode::F64Const, _) => Some(ValueType::F64),
        (Opcode::GlobalGet, Immediate::Index(index)) => {
            if *index as usize >= ctx.imported_globals {
                sink.report(Error::new(
                    ErrorKind::InvalidConstExpr,
                    location,
                    format!("global.get in a constant expression may only name an imported global, got {index}"),
                ));
                None
            } else {
                let global = &ctx.globals[*index as usize];
                if global.mutability == Mutability::Var {
                    sink.report(Error::new(
                        ErrorKind::InvalidConstExpr,
                        location,
                        format!("global.get in a constant expression may not name the mutable global {index}"),
                    ));
                    None
                } else {
                    Some(global.value_type)
                }
            }
        }
        (Opcode::RefNull, Immediate::RefType(rt)) => {
            let _ = ctx.require(
                ModuleContext::value_type_features(ValueType::from(*rt)),
                location,
                "ref.null",
                sink,
            );
            Some(ValueType::from(*rt))
        }
        (Opcode::RefFunc, Immediate::Index(index)) => {
            let _ = ctx.require(Features::REFERENCE_TYPES, location, "ref.func", sink);
            if *index as usize >= ctx.functions.len() {
                sink.report(Error::new(
                    ErrorKind::IndexOutOfBounds,
                    location,
                    format!("ref.func names unknown function {index}"),
                ));
            }
            Some(ValueType::FuncRef)
        }
        _ => {
            // The reader only lets producers through; anything else is a
            // malformed immediate pairing.
            sink.report(Error::new(
                ErrorKind::InvalidConstExpr,
                location,
                format!("illegal constant expression producer {}", expr.producer),
            ));
            None
        }
    };

    if let Some(produced) = produced {
        if produced != expected {
            sink.report(Error::new(
                ErrorKind::TypeMismatch,
                location,
                format!("constant expression produces {produced}, expected {expected}"),
            ));
        }
    }
}

fn check_limits(
    limits: &Limits,
    max_allowed: u64,
    what: &str,
    location: Location,
    features: Features,
    sink: &ErrorSink,
) {
    if let Some(max) = limits.max {
        if max < limits.min {
            sink.report(Error::new(
                ErrorKind::BadLimits,
                location,
                format!("{what} min {} is larger than max {max}", limits.min),
            ));
        }
    }
    if limits.min > max_allowed {
        sink.report(Error::new(
            ErrorKind::BadLimits,
            location,
            format!("{what} min {} exceeds the allowed maximum {max_allowed}", limits.min),
        ));
    }
    if limits.shared {
        if !features.contains(Features::THREADS) {
            sink.report(Error::new(
                ErrorKind::FeatureDisabled,
                location,
                "shared limits require the threads feature",
            ));
        }
        if limits.max.is_none() {
            sink.report(Error::new(
                ErrorKind::BadLimits,
                location,
                format!("shared {what} must declare a maximum size"),
            ));
        }
    }
    if limits.memory64 && !features.contains(Features::MEMORY64) {
        sink.report(Error::new(
            ErrorKind::FeatureDisabled,
            location,
            "64-bit limits require the memory64 feature",
        ));
    }
}

fn check_table_type(
    ctx: &ModuleContext,
    table_type: &TableType,
    location: Location,
    sink: &ErrorSink,
) {
    if table_type.elem != RefType::FuncRef {
        let _ = ctx.require(
            Features::REFERENCE_TYPES,
            location,
            "non-funcref table element type",
            sink,
        );
    }
    check_limits(
        &table_type.limits,
        u64::from(u32::MAX),
        "table",
        location,
        ctx.features,
        sink,
    );
}

fn check_memory_type(
    ctx: &ModuleContext,
    memory_type: &MemoryType,
    location: Location,
    sink: &ErrorSink,
) {
    let max_pages = if memory_type.limits.memory64 {
        limits::MAX_MEMORY_PAGES_64
    } else {
        u64::from(limits::MAX_MEMORY_PAGES_32)
    };
    check_limits(
        &memory_type.limits,
        max_pages,
        "memory",
        location,
        ctx.features,
        sink,
    );
    if let Some(max) = memory_type.limits.max {
        if max > max_pages {
            sink.report(Error::new(
                ErrorKind::BadLimits,
                location,
                format!("memory max {max} exceeds the allowed maximum {max_pages}"),
            ));
        }
    }
}

fn check_global_type(
    ctx: &ModuleContext,
    global_type: &GlobalType,
    location: Location,
    imported: bool,
    sink: &ErrorSink,
) {
    let _ = ctx.require(
        ModuleContext::value_type_features(global_type.value_type),
        location,
        "global type",
        sink,
    );
    if imported && global_type.mutability == Mutability::Var {
        let _ = ctx.require(
            Features::MUTABLE_GLOBALS,
            location,
            "imported mutable global",
            sink,
        );
    }
}

fn check_event_type(
    ctx: &ModuleContext,
    event_type: &EventType,
    location: Location,
    sink: &ErrorSink,
) {
    let _ = ctx.require(Features::EXCEPTIONS, location, "event", sink);
    if event_type.attribute != 0 {
        sink.report(Error::new(
            ErrorKind::BadLimits,
            location,
            format!("unknown event attribute {}", event_type.attribute),
        ));
    }
    match ctx.types.get(event_type.type_index as usize) {
        None => {
            sink.report(Error::new(
                ErrorKind::IndexOutOfBounds,
                location,
                format!("event names unknown type {}", event_type.type_index),
            ));
        }
        Some(ty) if !ty.results.is_empty() => {
            sink.report(Error::new(
                ErrorKind::TypeMismatch,
                location,
                "event types may not have results",
            ));
        }
        Some(_) => {}
    }
}

fn check_section_order(module: &Module, sink: &ErrorSink) {
    let mut seen: HashSet<SectionId> = HashSet::new();
    let mut last_order = 0;
    for summary in &module.sections {
        if summary.id == SectionId::Custom {
            continue;
        }
        if !seen.insert(summary.id) {
            sink.report(Error::new(
                ErrorKind::DuplicateSection,
                summary.location,
                format!("duplicate {} section", summary.id),
            ));
            continue;
        }
        let order = summary.id.order();
        if order < last_order {
            sink.report(Error::new(
                ErrorKind::BadSectionOrder,
                summary.location,
                format!("{} section out of order", summary.id),
            ));
        }
        last_order = last_order.max(order);
    }
}

/// Run every module-level rule, reporting all findings to `sink`.
pub fn validate_module(ctx: &ModuleContext, module: &Module, sink: &ErrorSink) {
    let _scope = sink.enter("module");
    check_section_order(module, sink);

    // Types: the value types they mention must be enabled.
    for ty in &module.types {
        for &vt in ty.params.iter().chain(&ty.results) {
            let _ = ctx.require(
                ModuleContext::value_type_features(vt),
                ty.location,
                "value type",
                sink,
            );
        }
        if ty.results.len() > 1 {
            let _ = ctx.require(
                Features::MULTI_VALUE,
                ty.location,
                "multiple result types",
                sink,
            );
        }
    }

    // Imports.
    for import in &module.imports {
        let _scope = sink.enter("import");
        match &import.desc {
            crate::parser::module::ImportDesc::Function { type_index } => {
                if ctx.types.get(*type_index as usize).is_none() {
                    sink.report(Error::new(
                        ErrorKind::IndexOutOfBounds,
                        import.location,
                        format!("import names unknown type {type_index}"),
                    ));
                }
            }
            crate::parser::module::ImportDesc::Table(tt) => {
                check_table_type(ctx, tt, import.location, sink)
            }
            crate::parser::module::ImportDesc::Memory(mt) => {
                check_memory_type(ctx, mt, import.location, sink)
            }
            crate::parser::module::ImportDesc::Global(gt) => {
                check_global_type(ctx, gt, import.location, true, sink)
            }
            crate::parser::module::ImportDesc::Event(et) => {
                check_event_type(ctx, et, import.location, sink)
            }
        }
    }

    // Functions: type indices in range.
    for function in &module.functions {
        if ctx.types.get(function.type_index as usize).is_none() {
            sink.report(Error::new(
                ErrorKind::IndexOutOfBounds,
                function.location,
                format!("function names unknown type {}", function.type_index),
            ));
        }
    }

    // Tables: count and types.
    if ctx.tables.len() > 1 && !ctx.features.contains(Features::REFERENCE_TYPES) {
        sink.report(Error::new(
            ErrorKind::FeatureDisabled,
            module
                .tables
                .first()
                .map(|t| t.location)
                .unwrap_or_default(),
            "multiple tables require the reference-types feature",
        ));
    }
    for table in &module.tables {
        check_table_type(ctx, &table.table_type, table.location, sink);
    }

    // Memories: at most one unless reference types are enabled, with valid
    // limits.
    if ctx.memories.len() > 1 && !ctx.features.contains(Features::REFERENCE_TYPES) {
        sink.report(Error::new(
            ErrorKind::FeatureDisabled,
            module
                .memories
                .first()
                .map(|m| m.location)
                .unwrap_or_default(),
            "multiple memories require the reference-types feature",
        ));
    }
    for memory in &module.memories {
        check_memory_type(ctx, &memory.memory_type, memory.location, sink);
    }

    // Events.
    for event in &module.events {
        check_event_type(ctx, &event.event_type, event.location, sink);
    }

    // Globals: types and initializers.
    for global in &module.globals {
        let _scope = sink.enter("global");
        check_global_type(ctx, &global.global_type, global.location, false, sink);
        check_const_expr(ctx, &global.init, global.global_type.value_type, sink);
    }

    // Exports: unique names, indices in range, feature rules.
    let mut export_names: HashSet<&str> = HashSet::new();
    for export in &module.exports {
        let _scope = sink.enter("export");
        if !export_names.insert(export.name) {
            sink.report(Error::new(
                ErrorKind::DuplicateName,
                export.location,
                format!("duplicate export name \"{}\"", export.name),
            ));
        }
        let space_len = match export.kind {
            ExternalKind::Function => ctx.functions.len(),
            ExternalKind::Table => ctx.tables.len(),
            ExternalKind::Memory => ctx.memories.len(),
            ExternalKind::Global => ctx.globals.len(),
            ExternalKind::Event => ctx.events.len(),
        };
        if export.index as usize >= space_len {
            sink.report(Error::new(
                ErrorKind::IndexOutOfBounds,
                export.location,
                format!(
                    "export names unknown {} {}",
                    export.kind, export.index
                ),
            ));
        } else if export.kind == ExternalKind::Global {
            let global = &ctx.globals[export.index as usize];
            if global.mutability == Mutability::Var {
                let _ = ctx.require(
                    Features::MUTABLE_GLOBALS,
                    export.location,
                    "exported mutable global",
                    sink,
                );
            }
        }
    }

    // Start function: must exist with type [] -> [].
    if let Some(start) = &module.start {
        let _scope = sink.enter("start");
        match ctx.function_type(start.func_index) {
            None => {
                sink.report(Error::new(
                    ErrorKind::IndexOutOfBounds,
                    start.location,
                    format!("start names unknown function {}", start.func_index),
                ));
            }
            Some(ty) if !ty.params.is_empty() || !ty.results.is_empty() => {
                sink.report(Error::new(
                    ErrorKind::TypeMismatch,
                    start.location,
                    format!("start function must have type () -> nil, got {ty}"),
                ));
            }
            Some(_) => {}
        }
    }

    // Element segments.
    for segment in &module.elements {
        let _scope = sink.enter("element segment");
        if !matches!(segment.mode, SegmentMode::Active { .. })
            || matches!(segment.init, ElementInit::Expressions(_))
        {
            let _ = ctx.require(
                Features::BULK_MEMORY,
                segment.location,
                "non-MVP element segment encoding",
                sink,
            );
        }
        if let SegmentMode::Active { index, offset } = &segment.mode {
            if *index as usize >= ctx.tables.len() {
                sink.report(Error::new(
                    ErrorKind::IndexOutOfBounds,
                    segment.location,
                    format!("element segment names unknown table {index}"),
                ));
            }
            check_const_expr(ctx, offset, ValueType::I32, sink);
        }
        match &segment.init {
            ElementInit::Functions(indices) => {
                for index in indices {
                    if *index as usize >= ctx.functions.len() {
                        sink.report(Error::new(
                            ErrorKind::IndexOutOfBounds,
                            segment.location,
                            format!("element segment names unknown function {index}"),
                        ));
                    }
                }
            }
            ElementInit::Expressions(exprs) => {
                for expr in exprs {
                    check_const_expr(ctx, expr, ValueType::from(segment.elem_type), sink);
                }
            }
        }
    }

    // Code section count must agree with the function section.
    if module.code.len() != module.functions.len() {
        let location = module
            .sections
            .iter()
            .find(|s| s.id == SectionId::Code)
            .map(|s| s.location)
            .unwrap_or_default();
        sink.report(Error::new(
            ErrorKind::LengthMismatch,
            location,
            format!(
                "function and code section counts disagree: {} != {}",
                module.functions.len(),
                module.code.len()
            ),
        ));
    }

    // Data segments and the DataCount section.
    if let Some(dc) = &module.data_count {
        if dc.count as usize != module.data.len() {
            sink.report(Error::new(
                ErrorKind::LengthMismatch,
                dc.location,
                format!(
                    "data count section says {} segments, data section has {}",
                    dc.count,
                    module.data.len()
                ),
            ));
        }
    }
    for segment in &module.data {
        let _scope = sink.enter("data segment");
        match &segment.mode {
            SegmentMode::Active { index, offset } => {
                if *index as usize >= ctx.memories.len() {
                    sink.report(Error::new(
                        ErrorKind::IndexOutOfBounds,
                        segment.location,
                        format!("data segment names unknown memory {index}"),
                    ));
                }
                check_const_expr(ctx, offset, ctx.memory_index_type(), sink);
            }
            SegmentMode::Passive => {
                let _ = ctx.require(
                    Features::BULK_MEMORY,
                    segment.location,
                    "passive data segment",
                    sink,
                );
            }
            SegmentMode::Declared => {}
        }
    }
}
