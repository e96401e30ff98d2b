//! Binary encoder: serializes a [`Module`] back to `.wasm` bytes.
//!
//! The encoder always emits canonical form: minimal LEB128 lengths, known
//! sections in canonical order (monotonically increasing section id), and
//! the shortest element/data segment flag encodings for each mode. For a module whose input already used canonical
//! encodings throughout, decode followed by encode reproduces the input
//! byte-for-byte; custom sections are appended after the known sections, so
//! byte-identity additionally requires they appeared there.

use crate::parser::encoding::{
    write_bytes, write_f32, write_f64, write_name, write_var_s32, write_var_s64, write_var_u32,
    write_var_u64, BLOCK_TYPE_VOID, LIMITS_HAS_MAX, LIMITS_MEMORY64, LIMITS_SHARED, MAGIC,
    SectionId, TYPE_FUNC, VERSION,
};
use crate::parser::encoding::{BlockType, ExternalKind};
use crate::parser::instruction::{Immediate, Instruction};
use crate::parser::module::{
    ConstExpr, ElementInit, FunctionType, Global, Limits, Module, SegmentMode,
};

/// Serialize a module to binary form.
pub fn encode_module(module: &Module) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION);

    if !module.types.is_empty() {
        write_section(&mut out, SectionId::Type, encode_types(&module.types));
    }
    if !module.imports.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.imports.len() as u32);
        for import in &module.imports {
            write_name(&mut payload, import.module);
            write_name(&mut payload, import.name);
            match &import.desc {
                crate::parser::module::ImportDesc::Function { type_index } => {
                    payload.push(ExternalKind::Function as u8);
                    write_var_u32(&mut payload, *type_index);
                }
                crate::parser::module::ImportDesc::Table(tt) => {
                    payload.push(ExternalKind::Table as u8);
                    payload.push(tt.elem.encode());
                    write_limits(&mut payload, &tt.limits);
                }
                crate::parser::module::ImportDesc::Memory(mt) => {
                    payload.push(ExternalKind::Memory as u8);
                    write_limits(&mut payload, &mt.limits);
                }
                crate::parser::module::ImportDesc::Global(gt) => {
                    payload.push(ExternalKind::Global as u8);
                    payload.push(gt.value_type.encode());
                    payload.push(gt.mutability as u8);
                }
                crate::parser::module::ImportDesc::Event(et) => {
                    payload.push(ExternalKind::Event as u8);
                    write_var_u32(&mut payload, et.attribute);
                    write_var_u32(&mut payload, et.type_index);
                }
            }
        }
        write_section(&mut out, SectionId::Import, payload);
    }
    if !module.functions.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.functions.len() as u32);
        for function in &module.functions {
            write_var_u32(&mut payload, function.type_index);
        }
        write_section(&mut out, SectionId::Function, payload);
    }
    if !module.tables.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.tables.len() as u32);
        for table in &module.tables {
            payload.push(table.table_type.elem.encode());
            write_limits(&mut payload, &table.table_type.limits);
        }
        write_section(&mut out, SectionId::Table, payload);
    }
    if !module.memories.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.memories.len() as u32);
        for memory in &module.memories {
            write_limits(&mut payload, &memory.memory_type.limits);
        }
        write_section(&mut out, SectionId::Memory, payload);
    }
    if !module.globals.is_empty() {
        write_section(&mut out, SectionId::Global, encode_globals(&module.globals));
    }
    if !module.exports.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.exports.len() as u32);
        for export in &module.exports {
            write_name(&mut payload, export.name);
            payload.push(export.kind as u8);
            write_var_u32(&mut payload, export.index);
        }
        write_section(&mut out, SectionId::Export, payload);
    }
    if let Some(start) = &module.start {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, start.func_index);
        write_section(&mut out, SectionId::Start, payload);
    }
    if !module.elements.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.elements.len() as u32);
        for segment in &module.elements {
            write_element_segment(&mut payload, segment);
        }
        write_section(&mut out, SectionId::Element, payload);
    }
    if !module.code.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.code.len() as u32);
        for code in &module.code {
            let mut body = Vec::new();
            write_var_u32(&mut body, code.locals.len() as u32);
            for group in &code.locals {
                write_var_u32(&mut body, group.count);
                body.push(group.value_type.encode());
            }
            body.extend_from_slice(code.expr);
            write_bytes(&mut payload, &body);
        }
        write_section(&mut out, SectionId::Code, payload);
    }
    if !module.data.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.data.len() as u32);
        for segment in &module.data {
            match &segment.mode {
                SegmentMode::Active { index: 0, offset } => {
                    write_var_u32(&mut payload, 0);
                    write_const_expr(&mut payload, offset);
                }
                SegmentMode::Active { index, offset } => {
                    write_var_u32(&mut payload, 2);
                    write_var_u32(&mut payload, *index);
                    write_const_expr(&mut payload, offset);
                }
                SegmentMode::Passive | SegmentMode::Declared => {
                    write_var_u32(&mut payload, 1);
                }
            }
            write_bytes(&mut payload, segment.init);
        }
        write_section(&mut out, SectionId::Data, payload);
    }
    if let Some(data_count) = &module.data_count {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, data_count.count);
        write_section(&mut out, SectionId::DataCount, payload);
    }
    if !module.events.is_empty() {
        let mut payload = Vec::new();
        write_var_u32(&mut payload, module.events.len() as u32);
        for event in &module.events {
            write_var_u32(&mut payload, event.event_type.attribute);
            write_var_u32(&mut payload, event.event_type.type_index);
        }
        write_section(&mut out, SectionId::Event, payload);
    }
    for custom in &module.customs {
        let mut payload = Vec::new();
        write_name(&mut payload, custom.name);
        payload.extend_from_slice(custom.payload);
        write_section(&mut out, SectionId::Custom, payload);
    }

    out
}

fn write_section(out: &mut Vec<u8>, id: SectionId, payload: Vec<u8>) {
    out.push(id as u8);
    write_bytes(out, &payload);
}

fn encode_types(types: &[FunctionType]) -> Vec<u8> {
    let mut payload = Vec::new();
    write_var_u32(&mut payload, types.len() as u32);
    for ty in types {
        payload.push(TYPE_FUNC);
        write_var_u32(&mut payload, ty.params.len() as u32);
        for vt in &ty.params {
            payload.push(vt.encode());
        }
        write_var_u32(&mut payload, ty.results.len() as u32);
        for vt in &ty.results {
            payload.push(vt.encode());
        }
    }
    payload
}

fn encode_globals(globals: &[Global]) -> Vec<u8> {
    let mut payload = Vec::new();
    write_var_u32(&mut payload, globals.len() as u32);
    for global in globals {
        payload.push(global.global_type.value_type.encode());
        payload.push(global.global_type.mutability as u8);
        write_const_expr(&mut payload, &global.init);
    }
    payload
}

fn write_limits(out: &mut Vec<u8>, limits: &Limits) {
    let mut flags = 0;
    if limits.max.is_some() {
        flags |= LIMITS_HAS_MAX;
    }
    if limits.shared {
        flags |= LIMITS_SHARED;
    }
    if limits.memory64 {
        flags |= LIMITS_MEMORY64;
    }
    write_var_u32(out, flags);
    if limits.memory64 {
        write_var_u64(out, limits.min);
        if let Some(max) = limits.max {
            write_var_u64(out, max);
        }
    } else {
        write_var_u32(out, limits.min as u32);
        if let Some(max) = limits.max {
            write_var_u32(out, max as u32);
        }
    }
}

fn write_element_segment(out: &mut Vec<u8>, segment: &crate::parser::module::ElementSegment) {
    let expressions = matches!(segment.init, ElementInit::Expressions(_));
    let expr_bit = if expressions { 0b100 } else { 0 };

    match &segment.mode {
        SegmentMode::Active { index: 0, offset } => {
            write_var_u32(out, expr_bit);
            write_const_expr(out, offset);
        }
        SegmentMode::Active { index, offset } => {
            write_var_u32(out, expr_bit | 0b010);
            write_var_u32(out, *index);
            write_const_expr(out, offset);
            write_elem_type(out, segment, expressions);
        }
        SegmentMode::Passive => {
            write_var_u32(out, expr_bit | 0b001);
            write_elem_type(out, segment, expressions);
        }
        SegmentMode::Declared => {
            write_var_u32(out, expr_bit | 0b011);
            write_elem_type(out, segment, expressions);
        }
    }

    match &segment.init {
        ElementInit::Functions(indices) => {
            write_var_u32(out, indices.len() as u32);
            for index in indices {
                write_var_u32(out, *index);
            }
        }
        ElementInit::Expressions(exprs) => {
            write_var_u32(out, exprs.len() as u32);
            for expr in exprs {
                write_const_expr(out, expr);
            }
        }
    }
}

fn write_elem_type(
    out: &mut Vec<u8>,
    segment: &crate::parser::module::ElementSegment,
    expressions: bool,
) {
    if expressions {
        out.push(segment.elem_type.encode());
    } else {
        // Function-index segments spell their type as elemkind 0x00.
        out.push(0x00);
    }
}

fn write_const_expr(out: &mut Vec<u8>, expr: &ConstExpr) {
    write_instruction(out, &expr.producer);
    out.push(0x0b);
}

/// Append one instruction: its opcode encoding, then its immediate.
pub fn write_instruction(out: &mut Vec<u8>, instruction: &Instruction) {
    let info = instruction.opcode.info();
    match info.prefix {
        None => out.push(info.code as u8),
        Some(prefix) => {
            out.push(prefix);
            write_var_u32(out, info.code);
        }
    }

    match &instruction.immediate {
        Immediate::None => {}
        Immediate::Block(block_type) => match block_type {
            BlockType::Void => out.push(BLOCK_TYPE_VOID),
            BlockType::Value(vt) => out.push(vt.encode()),
            BlockType::Index(index) => write_var_s64(out, i64::from(*index)),
        },
        Immediate::Index(index) => write_var_u32(out, *index),
        Immediate::CallIndirect {
            type_index,
            table_index,
        } => {
            write_var_u32(out, *type_index);
            write_var_u32(out, *table_index);
        }
        Immediate::BrTable {
            targets,
            default_target,
        } => {
            write_var_u32(out, targets.len() as u32);
            for target in targets {
                write_var_u32(out, *target);
            }
            write_var_u32(out, *default_target);
        }
        Immediate::BrOnExn {
            label_index,
            event_index,
        } => {
            write_var_u32(out, *label_index);
            write_var_u32(out, *event_index);
        }
        Immediate::Byte(byte) => out.push(*byte),
        Immediate::MemArg(memarg) => {
            write_var_u32(out, memarg.align_log2);
            write_var_u64(out, memarg.offset);
        }
        Immediate::MemArgLane { memarg, lane } => {
            write_var_u32(out, memarg.align_log2);
            write_var_u64(out, memarg.offset);
            out.push(*lane);
        }
        Immediate::Lane(lane) => out.push(*lane),
        Immediate::I32(value) => write_var_s32(out, *value),
        Immediate::I64(value) => write_var_s64(out, *value),
        Immediate::F32(value) => write_f32(out, *value),
        Immediate::F64(value) => write_f64(out, *value),
        Immediate::V128(bytes) | Immediate::Shuffle(bytes) => out.extend_from_slice(bytes),
        Immediate::IndexPair(first, second) => {
            write_var_u32(out, *first);
            write_var_u32(out, *second);
        }
        Immediate::ValueTypes(types) => {
            write_var_u32(out, types.len() as u32);
            for vt in types {
                out.push(vt.encode());
            }
        }
        Immediate::RefType(rt) => out.push(rt.encode()),
    }
}
