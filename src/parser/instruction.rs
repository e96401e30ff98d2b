//! Instruction representation and decoding.
//!
//! An [`Instruction`] is a tagged record: an [`Opcode`] plus an
//! [`Immediate`]. The immediate shape is selected by the opcode's row in the
//! static table ([`Opcode::immediate_kind`]), so decoding is a single
//! dispatch over [`ImmediateKind`] rather than a per-opcode tree.

use crate::error::{Error, ErrorKind};
use crate::limits;
use crate::location::Location;
use crate::parser::cursor::Cursor;
use crate::parser::encoding::{
    BlockType, RefType, ValueType, BLOCK_TYPE_VOID, PREFIX_ATOMIC, PREFIX_MISC, PREFIX_SIMD,
};
use crate::parser::opcodes::{ImmediateKind, Opcode};
use std::fmt;

/// The `(align log2, offset)` immediate of memory access instructions.
///
/// The offset is read as a 64-bit value; whether it fits 32 bits is a
/// validation question that depends on the memory's index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    pub align_log2: u32,
    pub offset: u64,
}

impl MemArg {
    fn read(cursor: &mut Cursor) -> Result<Self, Error> {
        let align_log2 = cursor.read_var_u32()?;
        let offset = cursor.read_var_u64()?;
        Ok(MemArg { align_log2, offset })
    }
}

/// The immediate operand of an instruction, one variant per shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Immediate {
    None,
    Block(BlockType),
    Index(u32),
    CallIndirect { type_index: u32, table_index: u32 },
    BrTable { targets: Vec<u32>, default_target: u32 },
    BrOnExn { label_index: u32, event_index: u32 },
    Byte(u8),
    MemArg(MemArg),
    MemArgLane { memarg: MemArg, lane: u8 },
    Lane(u8),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128([u8; 16]),
    Shuffle([u8; 16]),
    IndexPair(u32, u32),
    ValueTypes(Vec<ValueType>),
    RefType(RefType),
}

/// One decoded instruction with its location in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub immediate: Immediate,
    pub location: Location,
}

impl Instruction {
    /// Decode one instruction: opcode (single byte or prefix + LEB128
    /// sub-opcode), then the immediate shape from the opcode table.
    pub fn read(cursor: &mut Cursor) -> Result<Instruction, Error> {
        let start = cursor.pos();
        let first = cursor.read_byte()?;

        let opcode = match first {
            PREFIX_MISC | PREFIX_SIMD | PREFIX_ATOMIC => {
                let code = cursor.read_var_u32()?;
                Opcode::lookup(Some(first), code).ok_or_else(|| {
                    Error::new(
                        ErrorKind::UnknownOpcode,
                        cursor.location_from(start),
                        format!("unknown opcode 0x{first:02x} {code}"),
                    )
                })?
            }
            _ => Opcode::lookup(None, u32::from(first)).ok_or_else(|| {
                Error::new(
                    ErrorKind::UnknownOpcode,
                    cursor.location_from(start),
                    format!("unknown opcode 0x{first:02x}"),
                )
            })?,
        };

        let immediate = read_immediate(cursor, opcode)?;
        Ok(Instruction {
            opcode,
            immediate,
            location: cursor.location_from(start),
        })
    }
}

fn read_block_type(cursor: &mut Cursor) -> Result<BlockType, Error> {
    let start = cursor.pos();
    let Some(byte) = cursor.peek_byte() else {
        return Err(Error::new(
            ErrorKind::TruncatedInput,
            Location::at(start),
            "unable to read block type",
        ));
    };
    if byte == BLOCK_TYPE_VOID {
        cursor.read_byte()?;
        return Ok(BlockType::Void);
    }
    if let Some(value_type) = ValueType::decode(byte) {
        cursor.read_byte()?;
        return Ok(BlockType::Value(value_type));
    }
    // Anything else is a signed 33-bit type index.
    let index = cursor.read_var_s33()?;
    if !(0..=i64::from(u32::MAX)).contains(&index) {
        return Err(Error::new(
            ErrorKind::UnknownValueType,
            cursor.location_from(start),
            format!("invalid block type index {index}"),
        ));
    }
    Ok(BlockType::Index(index as u32))
}

fn read_immediate(cursor: &mut Cursor, opcode: Opcode) -> Result<Immediate, Error> {
    let imm = match opcode.immediate_kind() {
        ImmediateKind::None => Immediate::None,
        ImmediateKind::Block => Immediate::Block(read_block_type(cursor)?),
        ImmediateKind::Index => Immediate::Index(cursor.read_var_u32()?),
        ImmediateKind::CallIndirect => Immediate::CallIndirect {
            type_index: cursor.read_var_u32()?,
            table_index: cursor.read_var_u32()?,
        },
        ImmediateKind::BrTable => {
            let start = cursor.pos();
            let count = cursor.read_count()?;
            if count > limits::MAX_BR_TABLE_LABELS {
                return Err(Error::new(
                    ErrorKind::LengthMismatch,
                    cursor.location_from(start),
                    "br_table label count exceeds implementation limit",
                ));
            }
            let mut targets = Vec::with_capacity(count as usize);
            for _ in 0..count {
                targets.push(cursor.read_var_u32()?);
            }
            let default_target = cursor.read_var_u32()?;
            Immediate::BrTable {
                targets,
                default_target,
            }
        }
        ImmediateKind::BrOnExn => Immediate::BrOnExn {
            label_index: cursor.read_var_u32()?,
            event_index: cursor.read_var_u32()?,
        },
        ImmediateKind::Byte => Immediate::Byte(cursor.read_byte()?),
        ImmediateKind::MemArg => Immediate::MemArg(MemArg::read(cursor)?),
        ImmediateKind::MemArgLane => {
            let memarg = MemArg::read(cursor)?;
            let lane = cursor.read_byte()?;
            Immediate::MemArgLane { memarg, lane }
        }
        ImmediateKind::Lane => Immediate::Lane(cursor.read_byte()?),
        ImmediateKind::I32 => Immediate::I32(cursor.read_var_s32()?),
        ImmediateKind::I64 => Immediate::I64(cursor.read_var_s64()?),
        ImmediateKind::F32 => Immediate::F32(cursor.read_f32()?),
        ImmediateKind::F64 => Immediate::F64(cursor.read_f64()?),
        ImmediateKind::V128 => Immediate::V128(cursor.read_v128()?),
        ImmediateKind::Shuffle => {
            let mut lanes = [0u8; 16];
            lanes.copy_from_slice(cursor.read_bytes(16)?);
            Immediate::Shuffle(lanes)
        }
        ImmediateKind::IndexPair => {
            Immediate::IndexPair(cursor.read_var_u32()?, cursor.read_var_u32()?)
        }
        ImmediateKind::ValueTypes => {
            let start = cursor.pos();
            let count = cursor.read_count()?;
            if count > limits::MAX_SELECT_TYPED_VALUES {
                return Err(Error::new(
                    ErrorKind::LengthMismatch,
                    cursor.location_from(start),
                    "select type count exceeds implementation limit",
                ));
            }
            let mut types = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let at = cursor.pos();
                let byte = cursor.read_byte()?;
                let vt = ValueType::decode(byte).ok_or_else(|| {
                    Error::new(
                        ErrorKind::UnknownValueType,
                        cursor.location_from(at),
                        format!("invalid value type 0x{byte:02x}"),
                    )
                })?;
                types.push(vt);
            }
            Immediate::ValueTypes(types)
        }
        ImmediateKind::RefType => {
            let at = cursor.pos();
            let byte = cursor.read_byte()?;
            let rt = RefType::decode(byte).ok_or_else(|| {
                Error::new(
                    ErrorKind::UnknownValueType,
                    cursor.location_from(at),
                    format!("invalid reference type 0x{byte:02x}"),
                )
            })?;
            Immediate::RefType(rt)
        }
    };
    Ok(imm)
}

/// Lazy sequence of instructions over an expression's bytes.
///
/// Stops at the end of the byte range; callers that need the structural
/// final `end` check it themselves (the validator tracks control frames).
/// A decode error ends the sequence after yielding the error.
pub struct InstructionIter<'a> {
    cursor: Cursor<'a>,
    failed: bool,
}

impl<'a> InstructionIter<'a> {
    pub fn new(cursor: Cursor<'a>) -> Self {
        Self {
            cursor,
            failed: false,
        }
    }

    /// The cursor position after the last yielded instruction.
    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }
}

impl Iterator for InstructionIter<'_> {
    type Item = Result<Instruction, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_empty() {
            return None;
        }
        match Instruction::read(&mut self.cursor) {
            Ok(instruction) => Some(Ok(instruction)),
            Err(e) => {
                self.failed = true;
                self.cursor.skip_to_end();
                Some(Err(e))
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match &self.immediate {
            Immediate::None => Ok(()),
            Immediate::Block(bt) => write!(f, "{bt}"),
            Immediate::Index(idx) => write!(f, " {idx}"),
            Immediate::CallIndirect {
                type_index,
                table_index,
            } => write!(f, " {table_index} (type {type_index})"),
            Immediate::BrTable {
                targets,
                default_target,
            } => {
                for target in targets {
                    write!(f, " {target}")?;
                }
                write!(f, " {default_target}")
            }
            Immediate::BrOnExn {
                label_index,
                event_index,
            } => write!(f, " {label_index} {event_index}"),
            Immediate::Byte(byte) => write!(f, " {byte}"),
            Immediate::MemArg(memarg) => write!(f, " {} {}", memarg.align_log2, memarg.offset),
            Immediate::MemArgLane { memarg, lane } => {
                write!(f, " {} {} {lane}", memarg.align_log2, memarg.offset)
            }
            Immediate::Lane(lane) => write!(f, " {lane}"),
            Immediate::I32(value) => write!(f, " {value}"),
            Immediate::I64(value) => write!(f, " {value}"),
            Immediate::F32(value) => write!(f, " {value}"),
            Immediate::F64(value) => write!(f, " {value}"),
            Immediate::V128(bytes) => {
                for byte in bytes {
                    write!(f, " 0x{byte:02x}")?;
                }
                Ok(())
            }
            Immediate::Shuffle(lanes) => {
                for lane in lanes {
                    write!(f, " {lane}")?;
                }
                Ok(())
            }
            Immediate::IndexPair(a, b) => write!(f, " {a} {b}"),
            Immediate::ValueTypes(types) => {
                for vt in types {
                    write!(f, " {vt}")?;
                }
                Ok(())
            }
            Immediate::RefType(rt) => write!(f, " {rt}"),
        }
    }
}
