//! The instruction type checker: a stack-polymorphic abstract interpreter.
//!
//! Per function, a value stack of `Val(type) | Unknown` and a label stack of
//! control frames. Each frame records its start and end types, the value
//! stack height at entry, and whether the rest of the frame is unreachable.
//! After `unreachable` (or `br`, `return`, `throw`), pops at the frame's
//! base height produce `Unknown`, which satisfies any expectation until the
//! frame ends.

use crate::error::{Error, ErrorKind, ErrorSink, Reported};
use crate::features::Features;
use crate::location::Location;
use crate::parser::cursor::Cursor;
use crate::parser::encoding::{BlockType, RefType, ValueType};
use crate::parser::instruction::{Immediate, Instruction, InstructionIter, MemArg};
use crate::parser::module::Code;
use crate::parser::opcodes::Opcode;
use crate::validate::module::ModuleContext;

const I32: ValueType = ValueType::I32;
const I64: ValueType = ValueType::I64;
const F32: ValueType = ValueType::F32;
const F64: ValueType = ValueType::F64;
const V128: ValueType = ValueType::V128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaybeType {
    Val(ValueType),
    Unknown,
}

struct CtrlFrame {
    opcode: Opcode,
    start_types: Vec<ValueType>,
    end_types: Vec<ValueType>,
    height: usize,
    unreachable: bool,
}

impl CtrlFrame {
    /// The types a branch to this frame's label must supply: the start
    /// types for a loop (branching restarts it), the end types otherwise.
    fn label_types(&self) -> &[ValueType] {
        if self.opcode == Opcode::Loop {
            &self.start_types
        } else {
            &self.end_types
        }
    }
}

/// Validate one function body against its declared signature.
pub fn validate_function(
    ctx: &ModuleContext,
    code: &Code,
    defined_index: usize,
    sink: &ErrorSink,
) {
    let _scope = sink.enter("code");
    let func_index = (ctx.imported_functions + defined_index) as u32;
    let Some(ftype) = ctx.function_type(func_index) else {
        // The dangling type index was already reported at module level.
        return;
    };

    let mut locals = ftype.params.clone();
    locals.extend(code.local_types());
    for group in &code.locals {
        if !ctx
            .features
            .contains(ModuleContext::value_type_features(group.value_type))
        {
            sink.report(Error::new(
                ErrorKind::FeatureDisabled,
                code.location,
                format!(
                    "local of type {} requires the {} feature",
                    group.value_type,
                    ModuleContext::value_type_features(group.value_type).name()
                ),
            ));
            return;
        }
    }

    let mut validator = CodeValidator {
        ctx,
        sink,
        locals,
        results: ftype.results.clone(),
        vals: Vec::new(),
        ctrls: Vec::new(),
        offset: code.expr_offset,
        seen_final_end: false,
    };
    let results = validator.results.clone();
    validator.push_ctrl(Opcode::Block, Vec::new(), results);

    for result in InstructionIter::new(Cursor::new(code.expr)) {
        match result {
            Err(e) => {
                sink.report(Error::new(
                    e.kind,
                    validator.absolute(e.location),
                    e.message,
                ));
                return;
            }
            Ok(instruction) => {
                if validator.seen_final_end {
                    validator.fail(
                        ErrorKind::UnbalancedControl,
                        instruction.location,
                        "instruction after the function's final end",
                    );
                    return;
                }
                if validator.instr(&instruction).is_err() {
                    return;
                }
            }
        }
    }

    if !validator.seen_final_end {
        sink.report(Error::new(
            ErrorKind::UnbalancedControl,
            Location::at(code.expr_offset + code.expr.len()),
            "function body has no final end",
        ));
    }
}

struct CodeValidator<'v, 'm> {
    ctx: &'v ModuleContext<'m>,
    sink: &'v ErrorSink,
    locals: Vec<ValueType>,
    results: Vec<ValueType>,
    vals: Vec<MaybeType>,
    ctrls: Vec<CtrlFrame>,
    /// Offset of the expression in the original input; instruction
    /// locations are relative to the expression bytes.
    offset: usize,
    seen_final_end: bool,
}

impl CodeValidator<'_, '_> {
    fn absolute(&self, relative: Location) -> Location {
        Location::new(relative.start + self.offset, relative.end + self.offset)
    }

    fn fail(&self, kind: ErrorKind, at: Location, message: impl Into<String>) -> Reported {
        self.sink
            .report(Error::new(kind, self.absolute(at), message))
    }

    // -- Value stack ----------------------------------------------------------

    fn push(&mut self, ty: ValueType) {
        self.vals.push(MaybeType::Val(ty));
    }

    fn push_many(&mut self, types: &[ValueType]) {
        for &ty in types {
            self.push(ty);
        }
    }

    fn pop_any(&mut self, at: Location) -> Result<MaybeType, Reported> {
        let Some(frame) = self.ctrls.last() else {
            return Err(self.fail(
                ErrorKind::UnbalancedControl,
                at,
                "no control frame to pop from",
            ));
        };
        if self.vals.len() == frame.height {
            return if frame.unreachable {
                Ok(MaybeType::Unknown)
            } else {
                Err(self.fail(ErrorKind::StackUnderflow, at, "value stack is empty"))
            };
        }
        match self.vals.pop() {
            Some(value) => Ok(value),
            None => Err(self.fail(ErrorKind::StackUnderflow, at, "value stack is empty")),
        }
    }

    fn pop_expect(&mut self, expected: ValueType, at: Location) -> Result<MaybeType, Reported> {
        match self.pop_any(at)? {
            MaybeType::Unknown => Ok(MaybeType::Unknown),
            MaybeType::Val(actual) if actual == expected => Ok(MaybeType::Val(actual)),
            MaybeType::Val(actual) => Err(self.fail(
                ErrorKind::TypeMismatch,
                at,
                format!("expected {expected}, got {actual}"),
            )),
        }
    }

    fn pop_many(&mut self, types: &[ValueType], at: Location) -> Result<(), Reported> {
        for &ty in types.iter().rev() {
            self.pop_expect(ty, at)?;
        }
        Ok(())
    }

    fn sig(&mut self, params: &[ValueType], results: &[ValueType], at: Location) -> Result<(), Reported> {
        self.pop_many(params, at)?;
        self.push_many(results);
        Ok(())
    }

    // -- Label stack ----------------------------------------------------------

    fn push_ctrl(&mut self, opcode: Opcode, start_types: Vec<ValueType>, end_types: Vec<ValueType>) {
        let height = self.vals.len();
        let starts = start_types.clone();
        self.ctrls.push(CtrlFrame {
            opcode,
            start_types,
            end_types,
            height,
            unreachable: false,
        });
        self.push_many(&starts);
    }

    fn pop_ctrl(&mut self, at: Location) -> Result<CtrlFrame, Reported> {
        let Some(frame) = self.ctrls.last() else {
            return Err(self.fail(
                ErrorKind::UnbalancedControl,
                at,
                "end with no open block",
            ));
        };
        let end_types = frame.end_types.clone();
        let height = frame.height;
        self.pop_many(&end_types, at)?;
        if self.vals.len() != height {
            return Err(self.fail(
                ErrorKind::TypeMismatch,
                at,
                format!(
                    "{} extra values on the stack at the end of the block",
                    self.vals.len() - height
                ),
            ));
        }
        match self.ctrls.pop() {
            Some(frame) => Ok(frame),
            None => Err(self.fail(ErrorKind::UnbalancedControl, at, "end with no open block")),
        }
    }

    fn set_unreachable(&mut self) {
        if let Some(frame) = self.ctrls.last_mut() {
            self.vals.truncate(frame.height);
            frame.unreachable = true;
        }
    }

    fn frame_at(&self, depth: u32, at: Location) -> Result<&CtrlFrame, Reported> {
        let len = self.ctrls.len();
        if (depth as usize) < len {
            Ok(&self.ctrls[len - 1 - depth as usize])
        } else {
            Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("branch depth {depth} exceeds the {len} open blocks"),
            ))
        }
    }

    // -- Shared immediate checks ----------------------------------------------

    fn require(&self, required: Features, at: Location, what: &str) -> Result<(), Reported> {
        if self.ctx.features.contains(required) {
            Ok(())
        } else {
            Err(self.fail(
                ErrorKind::FeatureDisabled,
                at,
                format!("{what} requires the {} feature", required.name()),
            ))
        }
    }

    fn block_signature(
        &self,
        block_type: BlockType,
        at: Location,
    ) -> Result<(Vec<ValueType>, Vec<ValueType>), Reported> {
        match block_type {
            BlockType::Void => Ok((Vec::new(), Vec::new())),
            BlockType::Value(ty) => {
                self.require(ModuleContext::value_type_features(ty), at, "block type")?;
                Ok((Vec::new(), vec![ty]))
            }
            BlockType::Index(index) => {
                let Some(ty) = self.ctx.types.get(index as usize) else {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("block names unknown type {index}"),
                    ));
                };
                if !ty.params.is_empty() || ty.results.len() > 1 {
                    self.require(Features::MULTI_VALUE, at, "multi-value block type")?;
                }
                Ok((ty.params.clone(), ty.results.clone()))
            }
        }
    }

    /// Check a mem-arg: memory 0 exists, the alignment does not exceed (or
    /// for atomics, differs from) the natural alignment, and the offset fits
    /// the memory's index type. Returns the index type.
    fn check_memarg(
        &self,
        opcode: Opcode,
        memarg: &MemArg,
        at: Location,
    ) -> Result<ValueType, Reported> {
        if self.ctx.memories.is_empty() {
            return Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                "memory access with no memory defined",
            ));
        }
        let natural = opcode.natural_align_log2().unwrap_or(0);
        if memarg.align_log2 > natural {
            return Err(self.fail(
                ErrorKind::InvalidAlignment,
                at,
                format!(
                    "alignment 2**{} exceeds the natural alignment 2**{natural}",
                    memarg.align_log2
                ),
            ));
        }
        if opcode.is_atomic() && memarg.align_log2 != natural {
            return Err(self.fail(
                ErrorKind::InvalidAlignment,
                at,
                "atomic access must use the natural alignment",
            ));
        }
        let index_type = self.ctx.memory_index_type();
        if index_type == I32 && memarg.offset > u64::from(u32::MAX) {
            return Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("offset {} does not fit a 32-bit memory", memarg.offset),
            ));
        }
        Ok(index_type)
    }

    fn check_lane(&self, opcode: Opcode, lane: u8, at: Location) -> Result<(), Reported> {
        let lanes = opcode.lane_count().unwrap_or(0);
        if u32::from(lane) >= lanes {
            return Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("lane index {lane} out of range for {lanes} lanes"),
            ));
        }
        Ok(())
    }

    fn check_zero_byte(&self, byte: u8, at: Location) -> Result<(), Reported> {
        if byte != 0 {
            return Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("reserved byte must be zero, got {byte}"),
            ));
        }
        Ok(())
    }

    fn local(&self, index: u32, at: Location) -> Result<ValueType, Reported> {
        match self.locals.get(index as usize) {
            Some(&ty) => Ok(ty),
            None => Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("unknown local {index}"),
            )),
        }
    }

    fn global(&self, index: u32, at: Location) -> Result<crate::parser::module::GlobalType, Reported> {
        match self.ctx.globals.get(index as usize) {
            Some(&ty) => Ok(ty),
            None => Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("unknown global {index}"),
            )),
        }
    }

    fn table(&self, index: u32, at: Location) -> Result<crate::parser::module::TableType, Reported> {
        match self.ctx.tables.get(index as usize) {
            Some(&ty) => Ok(ty),
            None => Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("unknown table {index}"),
            )),
        }
    }

    fn call_signature(&self, func_index: u32, at: Location) -> Result<(Vec<ValueType>, Vec<ValueType>), Reported> {
        match self.ctx.function_type(func_index) {
            Some(ty) => Ok((ty.params.clone(), ty.results.clone())),
            None => Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("call names unknown function {func_index}"),
            )),
        }
    }

    fn event_params(&self, event_index: u32, at: Location) -> Result<Vec<ValueType>, Reported> {
        let Some(event) = self.ctx.events.get(event_index as usize) else {
            return Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("unknown event {event_index}"),
            ));
        };
        match self.ctx.types.get(event.type_index as usize) {
            Some(ty) => Ok(ty.params.clone()),
            None => Err(self.fail(
                ErrorKind::IndexOutOfBounds,
                at,
                format!("event names unknown type {}", event.type_index),
            )),
        }
    }

    // -- Memory access shapes -------------------------------------------------

    fn load(&mut self, value: ValueType, opcode: Opcode, memarg: &MemArg, at: Location) -> Result<(), Reported> {
        let index_type = self.check_memarg(opcode, memarg, at)?;
        self.pop_expect(index_type, at)?;
        self.push(value);
        Ok(())
    }

    fn store(&mut self, value: ValueType, opcode: Opcode, memarg: &MemArg, at: Location) -> Result<(), Reported> {
        let index_type = self.check_memarg(opcode, memarg, at)?;
        self.pop_expect(value, at)?;
        self.pop_expect(index_type, at)?;
        Ok(())
    }

    fn atomic_rmw(&mut self, value: ValueType, opcode: Opcode, memarg: &MemArg, at: Location) -> Result<(), Reported> {
        let index_type = self.check_memarg(opcode, memarg, at)?;
        self.pop_expect(value, at)?;
        self.pop_expect(index_type, at)?;
        self.push(value);
        Ok(())
    }

    fn atomic_cmpxchg(&mut self, value: ValueType, opcode: Opcode, memarg: &MemArg, at: Location) -> Result<(), Reported> {
        let index_type = self.check_memarg(opcode, memarg, at)?;
        self.pop_expect(value, at)?;
        self.pop_expect(value, at)?;
        self.pop_expect(index_type, at)?;
        self.push(value);
        Ok(())
    }

    // -- The dispatch ---------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn instr(&mut self, instruction: &Instruction) -> Result<(), Reported> {
        use Opcode::*;

        let at = instruction.location;
        let opcode = instruction.opcode;

        self.require(opcode.required_features(), at, opcode.mnemonic())?;

        match (opcode, &instruction.immediate) {
            // -- Control ------------------------------------------------------
            (Unreachable, _) => {
                self.set_unreachable();
                Ok(())
            }
            (Nop, _) => Ok(()),

            (Block | Loop | If | Try, Immediate::Block(block_type)) => {
                if opcode == If {
                    self.pop_expect(I32, at)?;
                }
                let (params, results) = self.block_signature(*block_type, at)?;
                self.pop_many(&params, at)?;
                self.push_ctrl(opcode, params, results);
                Ok(())
            }

            (Else, _) => {
                let frame = self.pop_ctrl(at)?;
                if frame.opcode != If {
                    return Err(self.fail(
                        ErrorKind::UnbalancedControl,
                        at,
                        "else outside of an if block",
                    ));
                }
                self.push_ctrl(Else, frame.start_types, frame.end_types);
                Ok(())
            }

            (Catch, _) => {
                let frame = self.pop_ctrl(at)?;
                if frame.opcode != Try {
                    return Err(self.fail(
                        ErrorKind::UnbalancedControl,
                        at,
                        "catch outside of a try block",
                    ));
                }
                // The catch body starts with the caught exception reference.
                self.push_ctrl(Catch, vec![ValueType::ExnRef], frame.end_types);
                Ok(())
            }

            (End, _) => {
                let frame = self.pop_ctrl(at)?;
                self.push_many(&frame.end_types);
                if self.ctrls.is_empty() {
                    self.seen_final_end = true;
                }
                Ok(())
            }

            (Br, Immediate::Index(depth)) => {
                let label = self.frame_at(*depth, at)?.label_types().to_vec();
                self.pop_many(&label, at)?;
                self.set_unreachable();
                Ok(())
            }

            (BrIf, Immediate::Index(depth)) => {
                self.pop_expect(I32, at)?;
                let label = self.frame_at(*depth, at)?.label_types().to_vec();
                self.pop_many(&label, at)?;
                self.push_many(&label);
                Ok(())
            }

            (
                BrTable,
                Immediate::BrTable {
                    targets,
                    default_target,
                },
            ) => {
                self.pop_expect(I32, at)?;
                let default_label = self.frame_at(*default_target, at)?.label_types().to_vec();
                for target in targets {
                    let label = self.frame_at(*target, at)?.label_types();
                    if label != default_label.as_slice() {
                        return Err(self.fail(
                            ErrorKind::TypeMismatch,
                            at,
                            format!(
                                "br_table target {target} expects [{}], default expects [{}]",
                                display_types(label),
                                display_types(&default_label)
                            ),
                        ));
                    }
                }
                self.pop_many(&default_label, at)?;
                self.set_unreachable();
                Ok(())
            }

            (Return, _) => {
                let results = self.results.clone();
                self.pop_many(&results, at)?;
                self.set_unreachable();
                Ok(())
            }

            (Call, Immediate::Index(func_index)) => {
                let (params, results) = self.call_signature(*func_index, at)?;
                self.pop_many(&params, at)?;
                self.push_many(&results);
                Ok(())
            }

            (
                CallIndirect,
                Immediate::CallIndirect {
                    type_index,
                    table_index,
                },
            ) => {
                let table = self.table(*table_index, at)?;
                if table.elem != RefType::FuncRef {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        "call_indirect requires a funcref table",
                    ));
                }
                let Some(ty) = self.ctx.types.get(*type_index as usize) else {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("call_indirect names unknown type {type_index}"),
                    ));
                };
                let (params, results) = (ty.params.clone(), ty.results.clone());
                self.pop_expect(I32, at)?;
                self.pop_many(&params, at)?;
                self.push_many(&results);
                Ok(())
            }

            (ReturnCall, Immediate::Index(func_index)) => {
                let (params, results) = self.call_signature(*func_index, at)?;
                if results != self.results {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        "return_call target results do not match the caller's results",
                    ));
                }
                self.pop_many(&params, at)?;
                self.set_unreachable();
                Ok(())
            }

            (
                ReturnCallIndirect,
                Immediate::CallIndirect {
                    type_index,
                    table_index,
                },
            ) => {
                let table = self.table(*table_index, at)?;
                if table.elem != RefType::FuncRef {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        "return_call_indirect requires a funcref table",
                    ));
                }
                let Some(ty) = self.ctx.types.get(*type_index as usize) else {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("return_call_indirect names unknown type {type_index}"),
                    ));
                };
                if ty.results != self.results {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        "return_call_indirect target results do not match the caller's results",
                    ));
                }
                let params = ty.params.clone();
                self.pop_expect(I32, at)?;
                self.pop_many(&params, at)?;
                self.set_unreachable();
                Ok(())
            }

            // -- Exceptions ---------------------------------------------------
            (Throw, Immediate::Index(event_index)) => {
                let params = self.event_params(*event_index, at)?;
                self.pop_many(&params, at)?;
                self.set_unreachable();
                Ok(())
            }

            (Rethrow, _) => {
                self.pop_expect(ValueType::ExnRef, at)?;
                self.set_unreachable();
                Ok(())
            }

            (
                BrOnExn,
                Immediate::BrOnExn {
                    label_index,
                    event_index,
                },
            ) => {
                self.pop_expect(ValueType::ExnRef, at)?;
                let params = self.event_params(*event_index, at)?;
                let label = self.frame_at(*label_index, at)?.label_types().to_vec();
                if label != params {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        format!(
                            "br_on_exn label expects [{}], event carries [{}]",
                            display_types(&label),
                            display_types(&params)
                        ),
                    ));
                }
                self.push(ValueType::ExnRef);
                Ok(())
            }

            // -- Parametric ---------------------------------------------------
            (Drop, _) => {
                self.pop_any(at)?;
                Ok(())
            }

            (Select, _) => {
                self.pop_expect(I32, at)?;
                let first = self.pop_any(at)?;
                let second = self.pop_any(at)?;
                let is_num_or_vec = |mt: MaybeType| match mt {
                    MaybeType::Unknown => true,
                    MaybeType::Val(vt) => vt.is_num() || vt.is_vec(),
                };
                if !is_num_or_vec(first) || !is_num_or_vec(second) {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        "untyped select requires numeric or vector operands",
                    ));
                }
                match (first, second) {
                    (MaybeType::Val(a), MaybeType::Val(b)) if a != b => Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        format!("select operands disagree: {a} vs {b}"),
                    )),
                    (MaybeType::Val(a), _) => {
                        self.push(a);
                        Ok(())
                    }
                    (MaybeType::Unknown, MaybeType::Val(b)) => {
                        self.push(b);
                        Ok(())
                    }
                    (MaybeType::Unknown, MaybeType::Unknown) => {
                        self.vals.push(MaybeType::Unknown);
                        Ok(())
                    }
                }
            }

            (SelectT, Immediate::ValueTypes(types)) => {
                if types.len() != 1 {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        format!("typed select requires exactly one type, got {}", types.len()),
                    ));
                }
                let ty = types[0];
                self.require(ModuleContext::value_type_features(ty), at, "select type")?;
                self.pop_expect(I32, at)?;
                self.pop_expect(ty, at)?;
                self.pop_expect(ty, at)?;
                self.push(ty);
                Ok(())
            }

            // -- Variables ----------------------------------------------------
            (LocalGet, Immediate::Index(index)) => {
                let ty = self.local(*index, at)?;
                self.push(ty);
                Ok(())
            }
            (LocalSet, Immediate::Index(index)) => {
                let ty = self.local(*index, at)?;
                self.pop_expect(ty, at)?;
                Ok(())
            }
            (LocalTee, Immediate::Index(index)) => {
                let ty = self.local(*index, at)?;
                self.pop_expect(ty, at)?;
                self.push(ty);
                Ok(())
            }
            (GlobalGet, Immediate::Index(index)) => {
                let global = self.global(*index, at)?;
                self.push(global.value_type);
                Ok(())
            }
            (GlobalSet, Immediate::Index(index)) => {
                let global = self.global(*index, at)?;
                if global.mutability == crate::parser::encoding::Mutability::Const {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        format!("global {index} is immutable"),
                    ));
                }
                self.pop_expect(global.value_type, at)?;
                Ok(())
            }

            // -- Tables -------------------------------------------------------
            (TableGet, Immediate::Index(index)) => {
                let table = self.table(*index, at)?;
                self.pop_expect(I32, at)?;
                self.push(ValueType::from(table.elem));
                Ok(())
            }
            (TableSet, Immediate::Index(index)) => {
                let table = self.table(*index, at)?;
                self.pop_expect(ValueType::from(table.elem), at)?;
                self.pop_expect(I32, at)?;
                Ok(())
            }
            (TableGrow, Immediate::Index(index)) => {
                let table = self.table(*index, at)?;
                self.pop_expect(I32, at)?;
                self.pop_expect(ValueType::from(table.elem), at)?;
                self.push(I32);
                Ok(())
            }
            (TableSize, Immediate::Index(index)) => {
                self.table(*index, at)?;
                self.push(I32);
                Ok(())
            }
            (TableFill, Immediate::Index(index)) => {
                let table = self.table(*index, at)?;
                self.pop_expect(I32, at)?;
                self.pop_expect(ValueType::from(table.elem), at)?;
                self.pop_expect(I32, at)?;
                Ok(())
            }
            (TableCopy, Immediate::IndexPair(dst, src)) => {
                let dst_table = self.table(*dst, at)?;
                let src_table = self.table(*src, at)?;
                if dst_table.elem != src_table.elem {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        at,
                        "table.copy between tables of different element types",
                    ));
                }
                self.sig(&[I32, I32, I32], &[], at)
            }
            (TableInit, Immediate::IndexPair(segment, table_index)) => {
                self.table(*table_index, at)?;
                if *segment >= self.ctx.element_count {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("unknown element segment {segment}"),
                    ));
                }
                self.sig(&[I32, I32, I32], &[], at)
            }
            (ElemDrop, Immediate::Index(segment)) => {
                if *segment >= self.ctx.element_count {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("unknown element segment {segment}"),
                    ));
                }
                Ok(())
            }

            // -- Memory management --------------------------------------------
            (MemorySize, Immediate::Byte(byte)) => {
                self.check_zero_byte(*byte, at)?;
                if self.ctx.memories.is_empty() {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        "memory.size with no memory defined",
                    ));
                }
                self.push(self.ctx.memory_index_type());
                Ok(())
            }
            (MemoryGrow, Immediate::Byte(byte)) => {
                self.check_zero_byte(*byte, at)?;
                if self.ctx.memories.is_empty() {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        "memory.grow with no memory defined",
                    ));
                }
                let index_type = self.ctx.memory_index_type();
                self.pop_expect(index_type, at)?;
                self.push(index_type);
                Ok(())
            }
            (MemoryInit, Immediate::IndexPair(segment, memory)) => {
                self.check_zero_byte(*memory as u8, at)?;
                if self.ctx.memories.is_empty() {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        "memory.init with no memory defined",
                    ));
                }
                let Some(count) = self.ctx.data_count else {
                    return Err(self.fail(
                        ErrorKind::LengthMismatch,
                        at,
                        "memory.init requires a data count section",
                    ));
                };
                if *segment >= count {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("unknown data segment {segment}"),
                    ));
                }
                let index_type = self.ctx.memory_index_type();
                self.sig(&[index_type, I32, I32], &[], at)
            }
            (DataDrop, Immediate::Index(segment)) => {
                let Some(count) = self.ctx.data_count else {
                    return Err(self.fail(
                        ErrorKind::LengthMismatch,
                        at,
                        "data.drop requires a data count section",
                    ));
                };
                if *segment >= count {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("unknown data segment {segment}"),
                    ));
                }
                Ok(())
            }
            (MemoryCopy, Immediate::IndexPair(dst, src)) => {
                self.check_zero_byte(*dst as u8, at)?;
                self.check_zero_byte(*src as u8, at)?;
                if self.ctx.memories.is_empty() {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        "memory.copy with no memory defined",
                    ));
                }
                let index_type = self.ctx.memory_index_type();
                self.sig(&[index_type, index_type, index_type], &[], at)
            }
            (MemoryFill, Immediate::Index(memory)) => {
                self.check_zero_byte(*memory as u8, at)?;
                if self.ctx.memories.is_empty() {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        "memory.fill with no memory defined",
                    ));
                }
                let index_type = self.ctx.memory_index_type();
                self.sig(&[index_type, I32, index_type], &[], at)
            }

            // -- References ---------------------------------------------------
            (RefNull, Immediate::RefType(rt)) => {
                self.require(
                    ModuleContext::value_type_features(ValueType::from(*rt)),
                    at,
                    "ref.null type",
                )?;
                self.push(ValueType::from(*rt));
                Ok(())
            }
            (RefIsNull, _) => {
                match self.pop_any(at)? {
                    MaybeType::Unknown => {}
                    MaybeType::Val(vt) if vt.is_ref() => {}
                    MaybeType::Val(vt) => {
                        return Err(self.fail(
                            ErrorKind::TypeMismatch,
                            at,
                            format!("ref.is_null requires a reference, got {vt}"),
                        ))
                    }
                }
                self.push(I32);
                Ok(())
            }
            (RefFunc, Immediate::Index(index)) => {
                if *index as usize >= self.ctx.functions.len() {
                    return Err(self.fail(
                        ErrorKind::IndexOutOfBounds,
                        at,
                        format!("ref.func names unknown function {index}"),
                    ));
                }
                self.push(ValueType::FuncRef);
                Ok(())
            }

            // -- Memory loads and stores --------------------------------------
            (I32Load | I32Load8S | I32Load8U | I32Load16S | I32Load16U, Immediate::MemArg(m)) => {
                self.load(I32, opcode, m, at)
            }
            (
                I64Load | I64Load8S | I64Load8U | I64Load16S | I64Load16U | I64Load32S
                | I64Load32U,
                Immediate::MemArg(m),
            ) => self.load(I64, opcode, m, at),
            (F32Load, Immediate::MemArg(m)) => self.load(F32, opcode, m, at),
            (F64Load, Immediate::MemArg(m)) => self.load(F64, opcode, m, at),
            (I32Store | I32Store8 | I32Store16, Immediate::MemArg(m)) => {
                self.store(I32, opcode, m, at)
            }
            (I64Store | I64Store8 | I64Store16 | I64Store32, Immediate::MemArg(m)) => {
                self.store(I64, opcode, m, at)
            }
            (F32Store, Immediate::MemArg(m)) => self.store(F32, opcode, m, at),
            (F64Store, Immediate::MemArg(m)) => self.store(F64, opcode, m, at),

            // -- Numeric constants --------------------------------------------
            (I32Const, _) => {
                self.push(I32);
                Ok(())
            }
            (I64Const, _) => {
                self.push(I64);
                Ok(())
            }
            (F32Const, _) => {
                self.push(F32);
                Ok(())
            }
            (F64Const, _) => {
                self.push(F64);
                Ok(())
            }

            // -- i32 numerics -------------------------------------------------
            (I32Eqz, _) => self.sig(&[I32], &[I32], at),
            (I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS
            | I32GeU, _) => self.sig(&[I32, I32], &[I32], at),
            (I32Clz | I32Ctz | I32Popcnt | I32Extend8S | I32Extend16S, _) => {
                self.sig(&[I32], &[I32], at)
            }
            (I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And
            | I32Or | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr, _) => {
                self.sig(&[I32, I32], &[I32], at)
            }

            // -- i64 numerics -------------------------------------------------
            (I64Eqz, _) => self.sig(&[I64], &[I32], at),
            (I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS
            | I64GeU, _) => self.sig(&[I64, I64], &[I32], at),
            (I64Clz | I64Ctz | I64Popcnt | I64Extend8S | I64Extend16S | I64Extend32S, _) => {
                self.sig(&[I64], &[I64], at)
            }
            (I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And
            | I64Or | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr, _) => {
                self.sig(&[I64, I64], &[I64], at)
            }

            // -- f32 numerics -------------------------------------------------
            (F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge, _) => {
                self.sig(&[F32, F32], &[I32], at)
            }
            (F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt, _) => {
                self.sig(&[F32], &[F32], at)
            }
            (F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign, _) => {
                self.sig(&[F32, F32], &[F32], at)
            }

            // -- f64 numerics -------------------------------------------------
            (F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge, _) => {
                self.sig(&[F64, F64], &[I32], at)
            }
            (F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt, _) => {
                self.sig(&[F64], &[F64], at)
            }
            (F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign, _) => {
                self.sig(&[F64, F64], &[F64], at)
            }

            // -- Conversions --------------------------------------------------
            (I32WrapI64, _) => self.sig(&[I64], &[I32], at),
            (I32TruncF32S | I32TruncF32U | I32TruncSatF32S | I32TruncSatF32U
            | I32ReinterpretF32, _) => self.sig(&[F32], &[I32], at),
            (I32TruncF64S | I32TruncF64U | I32TruncSatF64S | I32TruncSatF64U, _) => {
                self.sig(&[F64], &[I32], at)
            }
            (I64ExtendI32S | I64ExtendI32U, _) => self.sig(&[I32], &[I64], at),
            (I64TruncF32S | I64TruncF32U | I64TruncSatF32S | I64TruncSatF32U, _) => {
                self.sig(&[F32], &[I64], at)
            }
            (I64TruncF64S | I64TruncF64U | I64TruncSatF64S | I64TruncSatF64U
            | I64ReinterpretF64, _) => self.sig(&[F64], &[I64], at),
            (F32ConvertI32S | F32ConvertI32U | F32ReinterpretI32, _) => {
                self.sig(&[I32], &[F32], at)
            }
            (F32ConvertI64S | F32ConvertI64U, _) => self.sig(&[I64], &[F32], at),
            (F32DemoteF64, _) => self.sig(&[F64], &[F32], at),
            (F64ConvertI32S | F64ConvertI32U, _) => self.sig(&[I32], &[F64], at),
            (F64ConvertI64S | F64ConvertI64U | F64ReinterpretI64, _) => {
                self.sig(&[I64], &[F64], at)
            }
            (F64PromoteF32, _) => self.sig(&[F32], &[F64], at),

            // -- SIMD loads, stores, constants --------------------------------
            (
                V128Load | V128Load8x8S | V128Load8x8U | V128Load16x4S | V128Load16x4U
                | V128Load32x2S | V128Load32x2U | V128Load8Splat | V128Load16Splat
                | V128Load32Splat | V128Load64Splat | V128Load32Zero | V128Load64Zero,
                Immediate::MemArg(m),
            ) => self.load(V128, opcode, m, at),
            (V128Store, Immediate::MemArg(m)) => self.store(V128, opcode, m, at),
            (
                V128Load8Lane | V128Load16Lane | V128Load32Lane | V128Load64Lane,
                Immediate::MemArgLane { memarg, lane },
            ) => {
                self.check_lane(opcode, *lane, at)?;
                let index_type = self.check_memarg(opcode, memarg, at)?;
                self.pop_expect(V128, at)?;
                self.pop_expect(index_type, at)?;
                self.push(V128);
                Ok(())
            }
            (
                V128Store8Lane | V128Store16Lane | V128Store32Lane | V128Store64Lane,
                Immediate::MemArgLane { memarg, lane },
            ) => {
                self.check_lane(opcode, *lane, at)?;
                let index_type = self.check_memarg(opcode, memarg, at)?;
                self.pop_expect(V128, at)?;
                self.pop_expect(index_type, at)?;
                Ok(())
            }
            (V128Const, _) => {
                self.push(V128);
                Ok(())
            }

            // -- SIMD lane access ---------------------------------------------
            (I8x16Shuffle, Immediate::Shuffle(lanes)) => {
                for &lane in lanes {
                    if lane >= 32 {
                        return Err(self.fail(
                            ErrorKind::IndexOutOfBounds,
                            at,
                            format!("shuffle lane index {lane} out of range"),
                        ));
                    }
                }
                self.sig(&[V128, V128], &[V128], at)
            }
            (I8x16ExtractLaneS | I8x16ExtractLaneU | I16x8ExtractLaneS | I16x8ExtractLaneU
            | I32x4ExtractLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128], &[I32], at)
            }
            (I64x2ExtractLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128], &[I64], at)
            }
            (F32x4ExtractLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128], &[F32], at)
            }
            (F64x2ExtractLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128], &[F64], at)
            }
            (I8x16ReplaceLane | I16x8ReplaceLane | I32x4ReplaceLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128, I32], &[V128], at)
            }
            (I64x2ReplaceLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128, I64], &[V128], at)
            }
            (F32x4ReplaceLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128, F32], &[V128], at)
            }
            (F64x2ReplaceLane, Immediate::Lane(lane)) => {
                self.check_lane(opcode, *lane, at)?;
                self.sig(&[V128, F64], &[V128], at)
            }

            // -- SIMD splats --------------------------------------------------
            (I8x16Splat | I16x8Splat | I32x4Splat, _) => self.sig(&[I32], &[V128], at),
            (I64x2Splat, _) => self.sig(&[I64], &[V128], at),
            (F32x4Splat, _) => self.sig(&[F32], &[V128], at),
            (F64x2Splat, _) => self.sig(&[F64], &[V128], at),

            // -- SIMD three-operand -------------------------------------------
            (V128Bitselect, _) => self.sig(&[V128, V128, V128], &[V128], at),

            // -- SIMD boolean reductions --------------------------------------
            (V128AnyTrue | I8x16AllTrue | I16x8AllTrue | I32x4AllTrue | I64x2AllTrue
            | I8x16Bitmask | I16x8Bitmask | I32x4Bitmask | I64x2Bitmask, _) => {
                self.sig(&[V128], &[I32], at)
            }

            // -- SIMD shifts --------------------------------------------------
            (I8x16Shl | I8x16ShrS | I8x16ShrU | I16x8Shl | I16x8ShrS | I16x8ShrU | I32x4Shl
            | I32x4ShrS | I32x4ShrU | I64x2Shl | I64x2ShrS | I64x2ShrU, _) => {
                self.sig(&[V128, I32], &[V128], at)
            }

            // -- SIMD unary ---------------------------------------------------
            (V128Not | I8x16Abs | I8x16Neg | I8x16Popcnt | I16x8Abs | I16x8Neg | I32x4Abs
            | I32x4Neg | I64x2Abs | I64x2Neg | F32x4Abs | F32x4Neg | F32x4Sqrt | F32x4Ceil
            | F32x4Floor | F32x4Trunc | F32x4Nearest | F64x2Abs | F64x2Neg | F64x2Sqrt
            | F64x2Ceil | F64x2Floor | F64x2Trunc | F64x2Nearest
            | I16x8ExtaddPairwiseI8x16S | I16x8ExtaddPairwiseI8x16U
            | I32x4ExtaddPairwiseI16x8S | I32x4ExtaddPairwiseI16x8U
            | I16x8ExtendLowI8x16S | I16x8ExtendHighI8x16S | I16x8ExtendLowI8x16U
            | I16x8ExtendHighI8x16U | I32x4ExtendLowI16x8S | I32x4ExtendHighI16x8S
            | I32x4ExtendLowI16x8U | I32x4ExtendHighI16x8U | I64x2ExtendLowI32x4S
            | I64x2ExtendHighI32x4S | I64x2ExtendLowI32x4U | I64x2ExtendHighI32x4U
            | F32x4DemoteF64x2Zero | F64x2PromoteLowF32x4 | I32x4TruncSatF32x4S
            | I32x4TruncSatF32x4U | F32x4ConvertI32x4S | F32x4ConvertI32x4U
            | I32x4TruncSatF64x2SZero | I32x4TruncSatF64x2UZero | F64x2ConvertLowI32x4S
            | F64x2ConvertLowI32x4U, _) => self.sig(&[V128], &[V128], at),

            // -- SIMD binary --------------------------------------------------
            (I8x16Swizzle | V128And | V128AndNot | V128Or | V128Xor
            | I8x16Eq | I8x16Ne | I8x16LtS | I8x16LtU | I8x16GtS | I8x16GtU | I8x16LeS
            | I8x16LeU | I8x16GeS | I8x16GeU | I16x8Eq | I16x8Ne | I16x8LtS | I16x8LtU
            | I16x8GtS | I16x8GtU | I16x8LeS | I16x8LeU | I16x8GeS | I16x8GeU | I32x4Eq
            | I32x4Ne | I32x4LtS | I32x4LtU | I32x4GtS | I32x4GtU | I32x4LeS | I32x4LeU
            | I32x4GeS | I32x4GeU | I64x2Eq | I64x2Ne | I64x2LtS | I64x2GtS | I64x2LeS
            | I64x2GeS | F32x4Eq | F32x4Ne | F32x4Lt | F32x4Gt | F32x4Le | F32x4Ge | F64x2Eq
            | F64x2Ne | F64x2Lt | F64x2Gt | F64x2Le | F64x2Ge
            | I8x16NarrowI16x8S | I8x16NarrowI16x8U | I16x8NarrowI32x4S | I16x8NarrowI32x4U
            | I8x16Add | I8x16AddSatS | I8x16AddSatU | I8x16Sub | I8x16SubSatS | I8x16SubSatU
            | I8x16MinS | I8x16MinU | I8x16MaxS | I8x16MaxU | I8x16AvgrU
            | I16x8Add | I16x8AddSatS | I16x8AddSatU | I16x8Sub | I16x8SubSatS | I16x8SubSatU
            | I16x8Mul | I16x8MinS | I16x8MinU | I16x8MaxS | I16x8MaxU | I16x8AvgrU
            | I16x8Q15MulrSatS | I16x8ExtmulLowI8x16S | I16x8ExtmulHighI8x16S
            | I16x8ExtmulLowI8x16U | I16x8ExtmulHighI8x16U
            | I32x4Add | I32x4Sub | I32x4Mul | I32x4MinS | I32x4MinU | I32x4MaxS | I32x4MaxU
            | I32x4DotI16x8S | I32x4ExtmulLowI16x8S | I32x4ExtmulHighI16x8S
            | I32x4ExtmulLowI16x8U | I32x4ExtmulHighI16x8U
            | I64x2Add | I64x2Sub | I64x2Mul | I64x2ExtmulLowI32x4S | I64x2ExtmulHighI32x4S
            | I64x2ExtmulLowI32x4U | I64x2ExtmulHighI32x4U
            | F32x4Add | F32x4Sub | F32x4Mul | F32x4Div | F32x4Min | F32x4Max | F32x4Pmin
            | F32x4Pmax | F64x2Add | F64x2Sub | F64x2Mul | F64x2Div | F64x2Min | F64x2Max
            | F64x2Pmin | F64x2Pmax, _) => self.sig(&[V128, V128], &[V128], at),

            // -- Atomics ------------------------------------------------------
            (MemoryAtomicNotify, Immediate::MemArg(m)) => {
                let index_type = self.check_memarg(opcode, m, at)?;
                self.pop_expect(I32, at)?;
                self.pop_expect(index_type, at)?;
                self.push(I32);
                Ok(())
            }
            (MemoryAtomicWait32, Immediate::MemArg(m)) => {
                let index_type = self.check_memarg(opcode, m, at)?;
                self.pop_expect(I64, at)?;
                self.pop_expect(I32, at)?;
                self.pop_expect(index_type, at)?;
                self.push(I32);
                Ok(())
            }
            (MemoryAtomicWait64, Immediate::MemArg(m)) => {
                let index_type = self.check_memarg(opcode, m, at)?;
                self.pop_expect(I64, at)?;
                self.pop_expect(I64, at)?;
                self.pop_expect(index_type, at)?;
                self.push(I32);
                Ok(())
            }
            (AtomicFence, Immediate::Byte(byte)) => self.check_zero_byte(*byte, at),

            (I32AtomicLoad | I32AtomicLoad8U | I32AtomicLoad16U, Immediate::MemArg(m)) => {
                self.load(I32, opcode, m, at)
            }
            (I64AtomicLoad | I64AtomicLoad8U | I64AtomicLoad16U | I64AtomicLoad32U,
                Immediate::MemArg(m)) => self.load(I64, opcode, m, at),
            (I32AtomicStore | I32AtomicStore8 | I32AtomicStore16, Immediate::MemArg(m)) => {
                self.store(I32, opcode, m, at)
            }
            (I64AtomicStore | I64AtomicStore8 | I64AtomicStore16 | I64AtomicStore32,
                Immediate::MemArg(m)) => self.store(I64, opcode, m, at),

            (I32AtomicRmwAdd | I32AtomicRmw8AddU | I32AtomicRmw16AddU | I32AtomicRmwSub
            | I32AtomicRmw8SubU | I32AtomicRmw16SubU | I32AtomicRmwAnd | I32AtomicRmw8AndU
            | I32AtomicRmw16AndU | I32AtomicRmwOr | I32AtomicRmw8OrU | I32AtomicRmw16OrU
            | I32AtomicRmwXor | I32AtomicRmw8XorU | I32AtomicRmw16XorU | I32AtomicRmwXchg
            | I32AtomicRmw8XchgU | I32AtomicRmw16XchgU, Immediate::MemArg(m)) => {
                self.atomic_rmw(I32, opcode, m, at)
            }
            (I64AtomicRmwAdd | I64AtomicRmw8AddU | I64AtomicRmw16AddU | I64AtomicRmw32AddU
            | I64AtomicRmwSub | I64AtomicRmw8SubU | I64AtomicRmw16SubU | I64AtomicRmw32SubU
            | I64AtomicRmwAnd | I64AtomicRmw8AndU | I64AtomicRmw16AndU | I64AtomicRmw32AndU
            | I64AtomicRmwOr | I64AtomicRmw8OrU | I64AtomicRmw16OrU | I64AtomicRmw32OrU
            | I64AtomicRmwXor | I64AtomicRmw8XorU | I64AtomicRmw16XorU | I64AtomicRmw32XorU
            | I64AtomicRmwXchg | I64AtomicRmw8XchgU | I64AtomicRmw16XchgU
            | I64AtomicRmw32XchgU, Immediate::MemArg(m)) => self.atomic_rmw(I64, opcode, m, at),
            (I32AtomicRmwCmpxchg | I32AtomicRmw8CmpxchgU | I32AtomicRmw16CmpxchgU,
                Immediate::MemArg(m)) => self.atomic_cmpxchg(I32, opcode, m, at),
            (I64AtomicRmwCmpxchg | I64AtomicRmw8CmpxchgU | I64AtomicRmw16CmpxchgU
            | I64AtomicRmw32CmpxchgU, Immediate::MemArg(m)) => {
                self.atomic_cmpxchg(I64, opcode, m, at)
            }

            // An opcode whose immediate does not match its table row can only
            // come from a hand-built instruction.
            (opcode, immediate) => Err(self.fail(
                ErrorKind::TypeMismatch,
                at,
                format!("instruction {opcode} has malformed immediate {immediate:?}"),
            )),
        }
    }
}

fn display_types(types: &[ValueType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(", ")
}
