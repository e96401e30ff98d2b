//! Entity readers: one function per structural entity of the binary format.
//!
//! Readers take a cursor and a [`ReadContext`] and report failures to the
//! context's sink with the label stack active at the failure point. The
//! [`Reported`] marker propagates upward so a failure is recorded exactly
//! once. [`read_module`] drives the whole-module path; the lazy path reaches
//! the same readers through [`ReadItem`].

use crate::error::{Error, ErrorKind, Reported};
use crate::features::Features;
use crate::limits;
use crate::location::Location;
use crate::parser::cursor::Cursor;
use crate::parser::encoding::{
    self, ExternalKind, Mutability, RefType, SectionId, ValueType, LIMITS_HAS_MAX,
    LIMITS_MEMORY64, LIMITS_SHARED, TYPE_FUNC,
};
use crate::parser::instruction::Instruction;
use crate::parser::module::{
    Code, ConstExpr, CustomSection, DataCount, DataSegment, ElementInit, ElementSegment, Event,
    EventType, Export, Function, FunctionType, Global, GlobalType, Import, ImportDesc, Limits,
    LocalsGroup, Memory, MemoryType, Module, SectionSummary, Start, Table, TableType,
};
use crate::parser::opcodes::Opcode;
use crate::parser::section::{LazyItems, Section, SectionIter};
use crate::parser::ReadContext;

/// An entity that can be read as one element of a section's vector.
pub trait ReadItem<'a>: Sized {
    /// Context label pushed while reading one of these.
    const LABEL: &'static str;

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported>;
}

// -- Small shared readers ----------------------------------------------------

fn read_value_type(cursor: &mut Cursor, ctx: &ReadContext) -> Result<ValueType, Reported> {
    let start = cursor.pos();
    let byte = ctx.sink.check(cursor.read_byte())?;
    ValueType::decode(byte).ok_or_else(|| {
        ctx.sink.report(Error::new(
            ErrorKind::UnknownValueType,
            cursor.location_from(start),
            format!("invalid value type 0x{byte:02x}"),
        ))
    })
}

fn read_ref_type(cursor: &mut Cursor, ctx: &ReadContext) -> Result<RefType, Reported> {
    let start = cursor.pos();
    let byte = ctx.sink.check(cursor.read_byte())?;
    RefType::decode(byte).ok_or_else(|| {
        ctx.sink.report(Error::new(
            ErrorKind::UnknownValueType,
            cursor.location_from(start),
            format!("invalid reference type 0x{byte:02x}"),
        ))
    })
}

fn read_value_types(
    cursor: &mut Cursor,
    ctx: &ReadContext,
    max: u32,
    what: &str,
) -> Result<Vec<ValueType>, Reported> {
    let _scope = ctx.sink.enter(what);
    let start = cursor.pos();
    let count = ctx.sink.check(cursor.read_count())?;
    if count > max {
        return Err(ctx.sink.report(Error::new(
            ErrorKind::LengthMismatch,
            cursor.location_from(start),
            format!("{what} count {count} exceeds implementation limit"),
        )));
    }
    let mut types = Vec::with_capacity(count as usize);
    for _ in 0..count {
        types.push(read_value_type(cursor, ctx)?);
    }
    Ok(types)
}

fn read_limits(cursor: &mut Cursor, ctx: &ReadContext) -> Result<Limits, Reported> {
    let _scope = ctx.sink.enter("limits");
    let start = cursor.pos();
    let flags = {
        let _flags = ctx.sink.enter("flags");
        ctx.sink.check(cursor.read_var_u32())?
    };
    if flags & !(LIMITS_HAS_MAX | LIMITS_SHARED | LIMITS_MEMORY64) != 0 {
        return Err(ctx.sink.report(Error::new(
            ErrorKind::BadLimits,
            cursor.location_from(start),
            format!("unknown limits flags 0x{flags:02x}"),
        )));
    }
    let memory64 = flags & LIMITS_MEMORY64 != 0;
    let read_bound = |cursor: &mut Cursor| -> Result<u64, Error> {
        if memory64 {
            cursor.read_var_u64()
        } else {
            cursor.read_var_u32().map(u64::from)
        }
    };
    let min = {
        let _min = ctx.sink.enter("min");
        ctx.sink.check(read_bound(cursor))?
    };
    let max = if flags & LIMITS_HAS_MAX != 0 {
        let _max = ctx.sink.enter("max");
        Some(ctx.sink.check(read_bound(cursor))?)
    } else {
        None
    };
    Ok(Limits {
        min,
        max,
        shared: flags & LIMITS_SHARED != 0,
        memory64,
    })
}

fn read_table_type(cursor: &mut Cursor, ctx: &ReadContext) -> Result<TableType, Reported> {
    let elem = read_ref_type(cursor, ctx)?;
    let limits = read_limits(cursor, ctx)?;
    Ok(TableType { elem, limits })
}

fn read_global_type(cursor: &mut Cursor, ctx: &ReadContext) -> Result<GlobalType, Reported> {
    let value_type = read_value_type(cursor, ctx)?;
    let start = cursor.pos();
    let byte = ctx.sink.check(cursor.read_byte())?;
    let mutability = Mutability::decode(byte).ok_or_else(|| {
        ctx.sink.report(Error::new(
            ErrorKind::UnknownValueType,
            cursor.location_from(start),
            format!("invalid mutability 0x{byte:02x}"),
        ))
    })?;
    Ok(GlobalType {
        value_type,
        mutability,
    })
}

fn read_event_type(cursor: &mut Cursor, ctx: &ReadContext) -> Result<EventType, Reported> {
    let attribute = ctx.sink.check(cursor.read_var_u32())?;
    let type_index = ctx.sink.check(cursor.read_var_u32())?;
    Ok(EventType {
        attribute,
        type_index,
    })
}

/// Read a constant expression: exactly one producer instruction plus `end`.
pub fn read_const_expr(cursor: &mut Cursor, ctx: &ReadContext) -> Result<ConstExpr, Reported> {
    let _scope = ctx.sink.enter("constant expression");
    let start = cursor.pos();
    let producer = ctx.sink.check(Instruction::read(cursor))?;
    match producer.opcode {
        Opcode::I32Const
        | Opcode::I64Const
        | Opcode::F32Const
        | Opcode::F64Const
        | Opcode::GlobalGet
        | Opcode::RefNull
        | Opcode::RefFunc => {}
        _ => {
            return Err(ctx.sink.report(Error::new(
                ErrorKind::InvalidConstExpr,
                producer.location,
                format!("illegal instruction in constant expression: {producer}"),
            )))
        }
    }
    let terminator = ctx.sink.check(Instruction::read(cursor))?;
    if terminator.opcode != Opcode::End {
        return Err(ctx.sink.report(Error::new(
            ErrorKind::InvalidConstExpr,
            terminator.location,
            "expected end instruction in constant expression",
        )));
    }
    Ok(ConstExpr {
        producer,
        location: cursor.location_from(start),
    })
}

// -- Section entities --------------------------------------------------------

impl<'a> ReadItem<'a> for FunctionType {
    const LABEL: &'static str = "func type";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let form = ctx.sink.check(cursor.read_byte())?;
        if form != TYPE_FUNC {
            return Err(ctx.sink.report(Error::new(
                ErrorKind::UnknownValueType,
                cursor.location_from(start),
                format!("unknown type form 0x{form:02x}"),
            )));
        }
        let params = read_value_types(cursor, ctx, limits::MAX_FUNCTION_PARAMS, "param types")?;
        let results = read_value_types(cursor, ctx, limits::MAX_FUNCTION_RETURNS, "result types")?;
        Ok(FunctionType {
            params,
            results,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Import<'a> {
    const LABEL: &'static str = "import";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let module = {
            let _name = ctx.sink.enter("module name");
            ctx.sink.check(cursor.read_name())?
        };
        let name = {
            let _name = ctx.sink.enter("field name");
            ctx.sink.check(cursor.read_name())?
        };
        let kind_start = cursor.pos();
        let kind_byte = ctx.sink.check(cursor.read_byte())?;
        let kind = ExternalKind::decode(kind_byte).ok_or_else(|| {
            ctx.sink.report(Error::new(
                ErrorKind::UnknownValueType,
                cursor.location_from(kind_start),
                format!("invalid external kind 0x{kind_byte:02x}"),
            ))
        })?;
        let desc = match kind {
            ExternalKind::Function => ImportDesc::Function {
                type_index: ctx.sink.check(cursor.read_var_u32())?,
            },
            ExternalKind::Table => ImportDesc::Table(read_table_type(cursor, ctx)?),
            ExternalKind::Memory => ImportDesc::Memory(MemoryType {
                limits: read_limits(cursor, ctx)?,
            }),
            ExternalKind::Global => ImportDesc::Global(read_global_type(cursor, ctx)?),
            ExternalKind::Event => ImportDesc::Event(read_event_type(cursor, ctx)?),
        };
        Ok(Import {
            module,
            name,
            desc,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Function {
    const LABEL: &'static str = "function";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let type_index = ctx.sink.check(cursor.read_var_u32())?;
        Ok(Function {
            type_index,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Table {
    const LABEL: &'static str = "table";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let table_type = read_table_type(cursor, ctx)?;
        Ok(Table {
            table_type,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Memory {
    const LABEL: &'static str = "memory";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let limits = read_limits(cursor, ctx)?;
        Ok(Memory {
            memory_type: MemoryType { limits },
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Global {
    const LABEL: &'static str = "global";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let global_type = read_global_type(cursor, ctx)?;
        let init = read_const_expr(cursor, ctx)?;
        Ok(Global {
            global_type,
            init,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Event {
    const LABEL: &'static str = "event";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let event_type = read_event_type(cursor, ctx)?;
        Ok(Event {
            event_type,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Export<'a> {
    const LABEL: &'static str = "export";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let name = {
            let _name = ctx.sink.enter("name");
            ctx.sink.check(cursor.read_name())?
        };
        let kind_start = cursor.pos();
        let kind_byte = ctx.sink.check(cursor.read_byte())?;
        let kind = ExternalKind::decode(kind_byte).ok_or_else(|| {
            ctx.sink.report(Error::new(
                ErrorKind::UnknownValueType,
                cursor.location_from(kind_start),
                format!("invalid external kind 0x{kind_byte:02x}"),
            ))
        })?;
        let index = ctx.sink.check(cursor.read_var_u32())?;
        Ok(Export {
            name,
            kind,
            index,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for ElementSegment {
    const LABEL: &'static str = "element segment";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let flags = ctx.sink.check(cursor.read_var_u32())?;
        if flags > 7 {
            return Err(ctx.sink.report(Error::new(
                ErrorKind::LengthMismatch,
                cursor.location_from(start),
                format!("unknown element segment flags {flags}"),
            )));
        }

        // Bit 0: non-active; bit 1: explicit table index (active) or
        // declarative (non-active); bit 2: expression initializers.
        let active = flags & 0b001 == 0;
        let explicit_index = flags & 0b010 != 0;
        let expressions = flags & 0b100 != 0;

        let mode = if active {
            let index = if explicit_index {
                ctx.sink.check(cursor.read_var_u32())?
            } else {
                0
            };
            let offset = {
                let _offset = ctx.sink.enter("offset");
                read_const_expr(cursor, ctx)?
            };
            crate::parser::module::SegmentMode::Active { index, offset }
        } else if explicit_index {
            crate::parser::module::SegmentMode::Declared
        } else {
            crate::parser::module::SegmentMode::Passive
        };

        // Flags 0 and 4 (active, table 0) have an implicit funcref element
        // type; every other form spells it: an elemkind byte (0x00) for
        // function-index segments, a reference type for expression segments.
        let elem_type = if flags & 0b011 == 0 {
            RefType::FuncRef
        } else if expressions {
            read_ref_type(cursor, ctx)?
        } else {
            let kind_start = cursor.pos();
            let kind = ctx.sink.check(cursor.read_byte())?;
            if kind != 0x00 {
                return Err(ctx.sink.report(Error::new(
                    ErrorKind::UnknownValueType,
                    cursor.location_from(kind_start),
                    format!("unknown element kind 0x{kind:02x}"),
                )));
            }
            RefType::FuncRef
        };

        let count = ctx.sink.check(cursor.read_count())?;
        let init = if expressions {
            let mut exprs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                exprs.push(read_const_expr(cursor, ctx)?);
            }
            ElementInit::Expressions(exprs)
        } else {
            let mut funcs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                funcs.push(ctx.sink.check(cursor.read_var_u32())?);
            }
            ElementInit::Functions(funcs)
        };

        Ok(ElementSegment {
            elem_type,
            mode,
            init,
            location: cursor.location_from(start),
        })
    }
}

impl<'a> ReadItem<'a> for Code<'a> {
    const LABEL: &'static str = "code";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let size_start = cursor.pos();
        let body_size = ctx.sink.check(cursor.read_count())?;
        if body_size > limits::MAX_FUNCTION_SIZE {
            return Err(ctx.sink.report(Error::new(
                ErrorKind::LengthMismatch,
                cursor.location_from(size_start),
                "function body size exceeds implementation limit",
            )));
        }
        let mut body = ctx.sink.check(cursor.subview(body_size as usize))?;
        let body_start = body.pos();

        let group_count = {
            let _locals = ctx.sink.enter("local decls");
            ctx.sink.check(body.read_count())?
        };
        let mut locals = Vec::with_capacity(group_count as usize);
        let mut total: u64 = 0;
        for _ in 0..group_count {
            let _locals = ctx.sink.enter("local decl");
            let count = ctx.sink.check(body.read_var_u32())?;
            let value_type = read_value_type(&mut body, ctx)?;
            total += u64::from(count);
            if total > u64::from(limits::MAX_FUNCTION_LOCALS) {
                return Err(ctx.sink.report(Error::new(
                    ErrorKind::LengthMismatch,
                    Location::at(body.pos()),
                    "local count exceeds implementation limit",
                )));
            }
            locals.push(LocalsGroup { count, value_type });
        }

        let expr_offset = body.pos();
        let expr = body.rest();
        Ok(Code {
            locals,
            expr,
            expr_offset,
            location: Location::new(body_start, body.end()),
        })
    }
}

impl<'a> ReadItem<'a> for DataSegment<'a> {
    const LABEL: &'static str = "data segment";

    fn read_item(cursor: &mut Cursor<'a>, ctx: &ReadContext) -> Result<Self, Reported> {
        let _scope = ctx.sink.enter(Self::LABEL);
        let start = cursor.pos();
        let flags = ctx.sink.check(cursor.read_var_u32())?;
        let mode = match flags {
            0 | 2 => {
                let index = if flags == 2 {
                    ctx.sink.check(cursor.read_var_u32())?
                } else {
                    0
                };
                let offset = {
                    let _offset = ctx.sink.enter("offset");
                    read_const_expr(cursor, ctx)?
                };
                crate::parser::module::SegmentMode::Active { index, offset }
            }
            1 => crate::parser::module::SegmentMode::Passive,
            _ => {
                return Err(ctx.sink.report(Error::new(
                    ErrorKind::LengthMismatch,
                    cursor.location_from(start),
                    format!("unknown data segment flags {flags}"),
                )))
            }
        };
        let len = ctx.sink.check(cursor.read_count())?;
        let init = ctx.sink.check(cursor.read_bytes(len as usize))?;
        Ok(DataSegment {
            mode,
            init,
            location: cursor.location_from(start),
        })
    }
}

// -- Whole-module driver -----------------------------------------------------

/// Read and check the 8-byte module header. Magic or version mismatches are
/// reported but do not stop section parsing; a truncated header does.
pub fn read_header(cursor: &mut Cursor, sink: &crate::error::ErrorSink) -> bool {
    let start = cursor.pos();
    let magic = match sink.check(cursor.read_bytes(4)) {
        Ok(magic) => magic,
        Err(_) => return false,
    };
    if magic != encoding::MAGIC {
        sink.report(Error::new(
            ErrorKind::BadMagic,
            Location::new(start, start + 4),
            format!(
                "magic mismatch: expected {:02x?}, got {magic:02x?}",
                encoding::MAGIC
            ),
        ));
    }
    let version_start = cursor.pos();
    let version = match sink.check(cursor.read_bytes(4)) {
        Ok(version) => version,
        Err(_) => return false,
    };
    if version != encoding::VERSION {
        sink.report(Error::new(
            ErrorKind::BadVersion,
            Location::new(version_start, version_start + 4),
            format!(
                "version mismatch: expected {:02x?}, got {version:02x?}",
                encoding::VERSION
            ),
        ));
    }
    true
}

fn collect_entities<'a, T: ReadItem<'a>>(
    payload: Cursor<'a>,
    ctx: ReadContext,
    max_count: u32,
    out: &mut Vec<T>,
) {
    let mut items = LazyItems::new(payload, ctx, max_count);
    out.extend(items.by_ref());
    if !items.failed() && items.leftover() > 0 {
        ctx.sink.report(Error::new(
            ErrorKind::LengthMismatch,
            Location::at(items.pos()),
            format!("{} trailing bytes after section contents", items.leftover()),
        ));
    }
}

/// Parse a whole module into a [`Module`], attempting every section and
/// collecting all diagnostics in `sink`.
pub fn read_module<'a>(bytes: &'a [u8], features: Features, sink: &crate::error::ErrorSink) -> Module<'a> {
    let mut cursor = Cursor::new(bytes);
    let mut module = Module::default();

    if !read_header(&mut cursor, sink) {
        return module;
    }

    let ctx = ReadContext::new(features, sink);
    for section in SectionIter::new(cursor, ctx) {
        module.sections.push(SectionSummary {
            id: section.id(),
            location: section.location(),
        });
        let location = section.location();
        match section {
            Section::Custom { name, payload, location } => {
                module.customs.push(CustomSection {
                    name,
                    payload: payload.rest(),
                    location,
                });
            }
            Section::Known { id, payload, .. } => {
                let mut payload = payload;
                match id {
                    SectionId::Type => {
                        collect_entities(payload, ctx, limits::MAX_TYPES, &mut module.types)
                    }
                    SectionId::Import => {
                        collect_entities(payload, ctx, limits::MAX_IMPORTS, &mut module.imports)
                    }
                    SectionId::Function => collect_entities(
                        payload,
                        ctx,
                        limits::MAX_FUNCTIONS,
                        &mut module.functions,
                    ),
                    SectionId::Table => {
                        collect_entities(payload, ctx, limits::MAX_TABLES, &mut module.tables)
                    }
                    SectionId::Memory => {
                        collect_entities(payload, ctx, limits::MAX_MEMORIES, &mut module.memories)
                    }
                    SectionId::Global => {
                        collect_entities(payload, ctx, limits::MAX_GLOBALS, &mut module.globals)
                    }
                    SectionId::Export => {
                        collect_entities(payload, ctx, limits::MAX_EXPORTS, &mut module.exports)
                    }
                    SectionId::Start => {
                        let _scope = sink.enter("start");
                        if let Ok(func_index) = sink.check(payload.read_var_u32()) {
                            module.start = Some(Start {
                                func_index,
                                location,
                            });
                        }
                    }
                    SectionId::Element => collect_entities(
                        payload,
                        ctx,
                        limits::MAX_ELEMENT_SEGMENTS,
                        &mut module.elements,
                    ),
                    SectionId::Code => {
                        collect_entities(payload, ctx, limits::MAX_FUNCTIONS, &mut module.code)
                    }
                    SectionId::Data => collect_entities(
                        payload,
                        ctx,
                        limits::MAX_DATA_SEGMENTS,
                        &mut module.data,
                    ),
                    SectionId::DataCount => {
                        let _scope = sink.enter("data count");
                        if let Ok(count) = sink.check(payload.read_var_u32()) {
                            module.data_count = Some(DataCount { count, location });
                        }
                    }
                    SectionId::Event => {
                        collect_entities(payload, ctx, limits::MAX_EVENTS, &mut module.events)
                    }
                    SectionId::Custom => unreachable!("custom handled above"),
                }
            }
        }
    }
    log::debug!(
        "parsed {} sections with {} diagnostics",
        module.sections.len(),
        sink.len()
    );
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSink;
    use crate::parser::module::SegmentMode;

    fn ctx_and_sink() -> ErrorSink {
        ErrorSink::new()
    }

    fn parse(bytes: &[u8]) -> (Module<'_>, Vec<crate::error::Diagnostic>) {
        let sink = ErrorSink::new();
        let module = read_module(bytes, Features::all(), &sink);
        let diagnostics = sink.into_vec();
        (module, diagnostics)
    }

    #[test]
    fn empty_module() {
        let (module, diagnostics) = parse(&[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
        assert!(diagnostics.is_empty());
        assert!(module.sections.is_empty());
    }

    #[test]
    fn bad_version_reported_at_offset_4() {
        let (module, diagnostics) = parse(&[0x00, 0x61, 0x73, 0x6d, 0x02, 0x00, 0x00, 0x00]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error.kind, ErrorKind::BadVersion);
        assert_eq!(diagnostics[0].error.location.start, 4);
        assert!(module.sections.is_empty());
    }

    #[test]
    fn bad_magic_still_attempts_sections() {
        let (module, diagnostics) = parse(&[
            0xde, 0xad, 0xbe, 0xef, 0x01, 0x00, 0x00, 0x00, // bad magic
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // valid type section
        ]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error.kind, ErrorKind::BadMagic);
        assert_eq!(module.types.len(), 1);
    }

    #[test]
    fn single_empty_signature() {
        let (module, diagnostics) = parse(&[
            0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01, 0x04, 0x01, 0x60, 0x00, 0x00,
        ]);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(module.types.len(), 1);
        assert!(module.types[0].params.is_empty());
        assert!(module.types[0].results.is_empty());
    }

    #[test]
    fn limits_forms() {
        let sink = ctx_and_sink();
        let ctx = ReadContext::new(Features::all(), &sink);

        let mut cursor = Cursor::new(&[0x00, 0x01]);
        let limits = read_limits(&mut cursor, &ctx).unwrap();
        assert_eq!(limits.min, 1);
        assert_eq!(limits.max, None);
        assert!(!limits.shared);

        let mut cursor = Cursor::new(&[0x01, 0x01, 0x10]);
        let limits = read_limits(&mut cursor, &ctx).unwrap();
        assert_eq!(limits.max, Some(16));

        let mut cursor = Cursor::new(&[0x03, 0x01, 0x10]);
        let limits = read_limits(&mut cursor, &ctx).unwrap();
        assert!(limits.shared);

        let mut cursor = Cursor::new(&[0x40, 0x00]);
        assert!(read_limits(&mut cursor, &ctx).is_err());
        assert_eq!(sink.to_vec().last().unwrap().error.kind, ErrorKind::BadLimits);
    }

    #[test]
    fn const_expr_requires_producer_plus_end() {
        let sink = ctx_and_sink();
        let ctx = ReadContext::new(Features::all(), &sink);

        let mut cursor = Cursor::new(&[0x41, 0x2a, 0x0b]);
        let expr = read_const_expr(&mut cursor, &ctx).unwrap();
        assert_eq!(expr.producer.opcode, Opcode::I32Const);
        assert_eq!(expr.location, Location::new(0, 3));

        // i32.add is not a producer
        let mut cursor = Cursor::new(&[0x6a, 0x0b]);
        assert!(read_const_expr(&mut cursor, &ctx).is_err());
        assert_eq!(
            sink.to_vec().last().unwrap().error.kind,
            ErrorKind::InvalidConstExpr
        );

        // missing end
        let mut cursor = Cursor::new(&[0x41, 0x2a, 0x41, 0x01]);
        assert!(read_const_expr(&mut cursor, &ctx).is_err());
    }

    #[test]
    fn import_section_entities() {
        // (import "env" "f" (func (type 0)))
        let bytes = [
            0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // header
            0x02, 0x0b, 0x01, // import section, one entry
            0x03, b'e', b'n', b'v', 0x01, b'f', 0x00, 0x00, // "env" "f" func 0
        ];
        // payload is 8 bytes: fix the length byte
        let mut bytes = bytes.to_vec();
        bytes[9] = (bytes.len() - 10) as u8;
        let (module, diagnostics) = parse(&bytes);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].module, "env");
        assert_eq!(module.imports[0].name, "f");
        assert_eq!(
            module.imports[0].desc,
            ImportDesc::Function { type_index: 0 }
        );
    }

    #[test]
    fn invalid_utf8_import_name() {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        let payload = [0x01u8, 0x02, 0xff, 0xfe, 0x01, b'f', 0x00, 0x00];
        bytes.push(0x02);
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(&payload);
        let (module, diagnostics) = parse(&bytes);
        assert!(module.imports.is_empty());
        assert_eq!(diagnostics[0].error.kind, ErrorKind::InvalidUtf8);
        assert!(
            diagnostics[0].context.contains(&"module name".to_string()),
            "{:?}",
            diagnostics[0].context
        );
    }

    #[test]
    fn code_body_length_must_cover_locals_and_expr() {
        // A code entry: body_size 4, locals: 1 group (1 x i32), expr: end
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        let payload = [0x01u8, 0x04, 0x01, 0x01, 0x7f, 0x0b];
        bytes.push(0x0a);
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(&payload);
        let (module, diagnostics) = parse(&bytes);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(module.code.len(), 1);
        assert_eq!(module.code[0].local_count(), 1);
        assert_eq!(module.code[0].expr, &[0x0b]);
    }

    #[test]
    fn data_segment_modes() {
        let sink = ctx_and_sink();
        let ctx = ReadContext::new(Features::all(), &sink);

        // active, memory 0, offset i32.const 8, bytes "hi"
        let mut cursor = Cursor::new(&[0x00, 0x41, 0x08, 0x0b, 0x02, b'h', b'i']);
        let segment = DataSegment::read_item(&mut cursor, &ctx).unwrap();
        assert!(matches!(segment.mode, SegmentMode::Active { index: 0, .. }));
        assert_eq!(segment.init, b"hi");

        // passive
        let mut cursor = Cursor::new(&[0x01, 0x01, 0xaa]);
        let segment = DataSegment::read_item(&mut cursor, &ctx).unwrap();
        assert!(matches!(segment.mode, SegmentMode::Passive));
        assert_eq!(segment.init, &[0xaa]);
    }

    #[test]
    fn element_segment_flag_forms() {
        let sink = ctx_and_sink();
        let ctx = ReadContext::new(Features::all(), &sink);

        // flag 0: active, table 0, offset, func indices
        let mut cursor = Cursor::new(&[0x00, 0x41, 0x00, 0x0b, 0x02, 0x00, 0x01]);
        let segment = ElementSegment::read_item(&mut cursor, &ctx).unwrap();
        assert!(matches!(segment.mode, SegmentMode::Active { index: 0, .. }));
        assert_eq!(segment.init, ElementInit::Functions(vec![0, 1]));

        // flag 1: passive, elemkind 0x00, func indices
        let mut cursor = Cursor::new(&[0x01, 0x00, 0x01, 0x02]);
        let segment = ElementSegment::read_item(&mut cursor, &ctx).unwrap();
        assert!(matches!(segment.mode, SegmentMode::Passive));

        // flag 4: active table 0, expressions, implicit funcref (no type byte)
        let mut cursor = Cursor::new(&[0x04, 0x41, 0x00, 0x0b, 0x01, 0xd0, 0x70, 0x0b]);
        let segment = ElementSegment::read_item(&mut cursor, &ctx).unwrap();
        assert_eq!(segment.elem_type, RefType::FuncRef);
        assert!(matches!(segment.mode, SegmentMode::Active { index: 0, .. }));
        assert!(matches!(segment.init, ElementInit::Expressions(ref e) if e.len() == 1));

        // flag 5: passive, reftype, expressions
        let mut cursor = Cursor::new(&[0x05, 0x70, 0x01, 0xd0, 0x70, 0x0b]);
        let segment = ElementSegment::read_item(&mut cursor, &ctx).unwrap();
        assert_eq!(segment.elem_type, RefType::FuncRef);
        assert!(matches!(segment.init, ElementInit::Expressions(ref e) if e.len() == 1));

        // flag 3: declarative
        let mut cursor = Cursor::new(&[0x03, 0x00, 0x01, 0x00]);
        let segment = ElementSegment::read_item(&mut cursor, &ctx).unwrap();
        assert!(matches!(segment.mode, SegmentMode::Declared));

        assert!(sink.is_empty(), "{:?}", sink.to_vec());
    }

    #[test]
    fn section_payload_sizes_partition_the_module() {
        // header + two sections: the sum of payload lengths plus headers
        // plus the 8-byte preamble equals the module length.
        let bytes = [
            0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, //
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // type section
            0x0b, 0x01, 0x00, // data section, zero segments
        ];
        let (module, diagnostics) = parse(&bytes);
        assert!(diagnostics.is_empty());
        let mut covered = 8;
        for summary in &module.sections {
            covered += 2; // one-byte id + one-byte length in this fixture
            covered += summary.location.len();
        }
        assert_eq!(covered, bytes.len());
    }
}
