//! The opcode space: every instruction in the single-byte base space plus the
//! `0xFC` (saturating truncation, bulk memory, table ops), `0xFD` (SIMD), and
//! `0xFE` (atomics) prefixed spaces.
//!
//! One static table drives everything: decoding (byte or prefix+subcode to
//! opcode), the immediate shape to read after the opcode, the mnemonic the
//! text format uses, and the feature that gates the instruction. The enum
//! variants and table rows are generated together, so `opcode as usize`
//! indexes its own table row.

use crate::features::Features;
use crate::parser::encoding::{PREFIX_ATOMIC, PREFIX_MISC, PREFIX_SIMD};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// The shape of the immediate that follows an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    /// No immediate.
    None,
    /// A block type (void, value type, or type index).
    Block,
    /// A single LEB128 index.
    Index,
    /// `(type_index, table_index)`.
    CallIndirect,
    /// `(targets*, default_target)`.
    BrTable,
    /// `(label_index, event_index)`.
    BrOnExn,
    /// A single raw byte, must be zero.
    Byte,
    /// `(align_log2, offset)`.
    MemArg,
    /// A mem-arg followed by a lane index byte.
    MemArgLane,
    /// A single lane index byte.
    Lane,
    /// Signed 32-bit LEB128 literal.
    I32,
    /// Signed 64-bit LEB128 literal.
    I64,
    /// Little-endian IEEE-754 f32 literal.
    F32,
    /// Little-endian IEEE-754 f64 literal.
    F64,
    /// 16 literal bytes.
    V128,
    /// 16 lane index bytes.
    Shuffle,
    /// A pair of LEB128 indices (init/copy instructions).
    IndexPair,
    /// A vector of value types (typed `select`).
    ValueTypes,
    /// A reference type byte (`ref.null`).
    RefType,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub opcode: Opcode,
    /// `None` for the single-byte space, or one of the prefix bytes.
    pub prefix: Option<u8>,
    /// The opcode byte, or the LEB128 sub-opcode after the prefix.
    pub code: u32,
    pub mnemonic: &'static str,
    pub immediate: ImmediateKind,
    /// Feature required to validate this opcode. Decoding is not gated.
    pub features: Features,
}

macro_rules! define_opcodes {
    ($($name:ident = $prefix:expr, $code:expr, $mnemonic:expr, $imm:ident, $feature:ident;)*) => {
        /// Every opcode this crate knows about.
        ///
        /// Variant order matches [`OPCODES`] row order, so `op as usize` is
        /// the opcode's row index.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($name,)*
        }

        /// The opcode table, one row per opcode.
        pub static OPCODES: &[OpcodeInfo] = &[
            $(OpcodeInfo {
                opcode: Opcode::$name,
                prefix: $prefix,
                code: $code,
                mnemonic: $mnemonic,
                immediate: ImmediateKind::$imm,
                features: Features::$feature,
            },)*
        ];
    };
}

#[rustfmt::skip]
define_opcodes! {
    // Control
    Unreachable = None, 0x00, "unreachable", None, MVP;
    Nop = None, 0x01, "nop", None, MVP;
    Block = None, 0x02, "block", Block, MVP;
    Loop = None, 0x03, "loop", Block, MVP;
    If = None, 0x04, "if", Block, MVP;
    Else = None, 0x05, "else", None, MVP;
    Try = None, 0x06, "try", Block, EXCEPTIONS;
    Catch = None, 0x07, "catch", None, EXCEPTIONS;
    Throw = None, 0x08, "throw", Index, EXCEPTIONS;
    Rethrow = None, 0x09, "rethrow", None, EXCEPTIONS;
    BrOnExn = None, 0x0a, "br_on_exn", BrOnExn, EXCEPTIONS;
    End = None, 0x0b, "end", None, MVP;
    Br = None, 0x0c, "br", Index, MVP;
    BrIf = None, 0x0d, "br_if", Index, MVP;
    BrTable = None, 0x0e, "br_table", BrTable, MVP;
    Return = None, 0x0f, "return", None, MVP;
    Call = None, 0x10, "call", Index, MVP;
    CallIndirect = None, 0x11, "call_indirect", CallIndirect, MVP;
    ReturnCall = None, 0x12, "return_call", Index, TAIL_CALL;
    ReturnCallIndirect = None, 0x13, "return_call_indirect", CallIndirect, TAIL_CALL;

    // Parametric
    Drop = None, 0x1a, "drop", None, MVP;
    Select = None, 0x1b, "select", None, MVP;
    SelectT = None, 0x1c, "select", ValueTypes, REFERENCE_TYPES;

    // Variable
    LocalGet = None, 0x20, "local.get", Index, MVP;
    LocalSet = None, 0x21, "local.set", Index, MVP;
    LocalTee = None, 0x22, "local.tee", Index, MVP;
    GlobalGet = None, 0x23, "global.get", Index, MVP;
    GlobalSet = None, 0x24, "global.set", Index, MVP;

    // Table
    TableGet = None, 0x25, "table.get", Index, REFERENCE_TYPES;
    TableSet = None, 0x26, "table.set", Index, REFERENCE_TYPES;

    // Memory
    I32Load = None, 0x28, "i32.load", MemArg, MVP;
    I64Load = None, 0x29, "i64.load", MemArg, MVP;
    F32Load = None, 0x2a, "f32.load", MemArg, MVP;
    F64Load = None, 0x2b, "f64.load", MemArg, MVP;
    I32Load8S = None, 0x2c, "i32.load8_s", MemArg, MVP;
    I32Load8U = None, 0x2d, "i32.load8_u", MemArg, MVP;
    I32Load16S = None, 0x2e, "i32.load16_s", MemArg, MVP;
    I32Load16U = None, 0x2f, "i32.load16_u", MemArg, MVP;
    I64Load8S = None, 0x30, "i64.load8_s", MemArg, MVP;
    I64Load8U = None, 0x31, "i64.load8_u", MemArg, MVP;
    I64Load16S = None, 0x32, "i64.load16_s", MemArg, MVP;
    I64Load16U = None, 0x33, "i64.load16_u", MemArg, MVP;
    I64Load32S = None, 0x34, "i64.load32_s", MemArg, MVP;
    I64Load32U = None, 0x35, "i64.load32_u", MemArg, MVP;
    I32Store = None, 0x36, "i32.store", MemArg, MVP;
    I64Store = None, 0x37, "i64.store", MemArg, MVP;
    F32Store = None, 0x38, "f32.store", MemArg, MVP;
    F64Store = None, 0x39, "f64.store", MemArg, MVP;
    I32Store8 = None, 0x3a, "i32.store8", MemArg, MVP;
    I32Store16 = None, 0x3b, "i32.store16", MemArg, MVP;
    I64Store8 = None, 0x3c, "i64.store8", MemArg, MVP;
    I64Store16 = None, 0x3d, "i64.store16", MemArg, MVP;
    I64Store32 = None, 0x3e, "i64.store32", MemArg, MVP;
    MemorySize = None, 0x3f, "memory.size", Byte, MVP;
    MemoryGrow = None, 0x40, "memory.grow", Byte, MVP;

    // Constants
    I32Const = None, 0x41, "i32.const", I32, MVP;
    I64Const = None, 0x42, "i64.const", I64, MVP;
    F32Const = None, 0x43, "f32.const", F32, MVP;
    F64Const = None, 0x44, "f64.const", F64, MVP;

    // i32 comparisons
    I32Eqz = None, 0x45, "i32.eqz", None, MVP;
    I32Eq = None, 0x46, "i32.eq", None, MVP;
    I32Ne = None, 0x47, "i32.ne", None, MVP;
    I32LtS = None, 0x48, "i32.lt_s", None, MVP;
    I32LtU = None, 0x49, "i32.lt_u", None, MVP;
    I32GtS = None, 0x4a, "i32.gt_s", None, MVP;
    I32GtU = None, 0x4b, "i32.gt_u", None, MVP;
    I32LeS = None, 0x4c, "i32.le_s", None, MVP;
    I32LeU = None, 0x4d, "i32.le_u", None, MVP;
    I32GeS = None, 0x4e, "i32.ge_s", None, MVP;
    I32GeU = None, 0x4f, "i32.ge_u", None, MVP;

    // i64 comparisons
    I64Eqz = None, 0x50, "i64.eqz", None, MVP;
    I64Eq = None, 0x51, "i64.eq", None, MVP;
    I64Ne = None, 0x52, "i64.ne", None, MVP;
    I64LtS = None, 0x53, "i64.lt_s", None, MVP;
    I64LtU = None, 0x54, "i64.lt_u", None, MVP;
    I64GtS = None, 0x55, "i64.gt_s", None, MVP;
    I64GtU = None, 0x56, "i64.gt_u", None, MVP;
    I64LeS = None, 0x57, "i64.le_s", None, MVP;
    I64LeU = None, 0x58, "i64.le_u", None, MVP;
    I64GeS = None, 0x59, "i64.ge_s", None, MVP;
    I64GeU = None, 0x5a, "i64.ge_u", None, MVP;

    // f32 comparisons
    F32Eq = None, 0x5b, "f32.eq", None, MVP;
    F32Ne = None, 0x5c, "f32.ne", None, MVP;
    F32Lt = None, 0x5d, "f32.lt", None, MVP;
    F32Gt = None, 0x5e, "f32.gt", None, MVP;
    F32Le = None, 0x5f, "f32.le", None, MVP;
    F32Ge = None, 0x60, "f32.ge", None, MVP;

    // f64 comparisons
    F64Eq = None, 0x61, "f64.eq", None, MVP;
    F64Ne = None, 0x62, "f64.ne", None, MVP;
    F64Lt = None, 0x63, "f64.lt", None, MVP;
    F64Gt = None, 0x64, "f64.gt", None, MVP;
    F64Le = None, 0x65, "f64.le", None, MVP;
    F64Ge = None, 0x66, "f64.ge", None, MVP;

    // i32 arithmetic
    I32Clz = None, 0x67, "i32.clz", None, MVP;
    I32Ctz = None, 0x68, "i32.ctz", None, MVP;
    I32Popcnt = None, 0x69, "i32.popcnt", None, MVP;
    I32Add = None, 0x6a, "i32.add", None, MVP;
    I32Sub = None, 0x6b, "i32.sub", None, MVP;
    I32Mul = None, 0x6c, "i32.mul", None, MVP;
    I32DivS = None, 0x6d, "i32.div_s", None, MVP;
    I32DivU = None, 0x6e, "i32.div_u", None, MVP;
    I32RemS = None, 0x6f, "i32.rem_s", None, MVP;
    I32RemU = None, 0x70, "i32.rem_u", None, MVP;
    I32And = None, 0x71, "i32.and", None, MVP;
    I32Or = None, 0x72, "i32.or", None, MVP;
    I32Xor = None, 0x73, "i32.xor", None, MVP;
    I32Shl = None, 0x74, "i32.shl", None, MVP;
    I32ShrS = None, 0x75, "i32.shr_s", None, MVP;
    I32ShrU = None, 0x76, "i32.shr_u", None, MVP;
    I32Rotl = None, 0x77, "i32.rotl", None, MVP;
    I32Rotr = None, 0x78, "i32.rotr", None, MVP;

    // i64 arithmetic
    I64Clz = None, 0x79, "i64.clz", None, MVP;
    I64Ctz = None, 0x7a, "i64.ctz", None, MVP;
    I64Popcnt = None, 0x7b, "i64.popcnt", None, MVP;
    I64Add = None, 0x7c, "i64.add", None, MVP;
    I64Sub = None, 0x7d, "i64.sub", None, MVP;
    I64Mul = None, 0x7e, "i64.mul", None, MVP;
    I64DivS = None, 0x7f, "i64.div_s", None, MVP;
    I64DivU = None, 0x80, "i64.div_u", None, MVP;
    I64RemS = None, 0x81, "i64.rem_s", None, MVP;
    I64RemU = None, 0x82, "i64.rem_u", None, MVP;
    I64And = None, 0x83, "i64.and", None, MVP;
    I64Or = None, 0x84, "i64.or", None, MVP;
    I64Xor = None, 0x85, "i64.xor", None, MVP;
    I64Shl = None, 0x86, "i64.shl", None, MVP;
    I64ShrS = None, 0x87, "i64.shr_s", None, MVP;
    I64ShrU = None, 0x88, "i64.shr_u", None, MVP;
    I64Rotl = None, 0x89, "i64.rotl", None, MVP;
    I64Rotr = None, 0x8a, "i64.rotr", None, MVP;

    // f32 arithmetic
    F32Abs = None, 0x8b, "f32.abs", None, MVP;
    F32Neg = None, 0x8c, "f32.neg", None, MVP;
    F32Ceil = None, 0x8d, "f32.ceil", None, MVP;
    F32Floor = None, 0x8e, "f32.floor", None, MVP;
    F32Trunc = None, 0x8f, "f32.trunc", None, MVP;
    F32Nearest = None, 0x90, "f32.nearest", None, MVP;
    F32Sqrt = None, 0x91, "f32.sqrt", None, MVP;
    F32Add = None, 0x92, "f32.add", None, MVP;
    F32Sub = None, 0x93, "f32.sub", None, MVP;
    F32Mul = None, 0x94, "f32.mul", None, MVP;
    F32Div = None, 0x95, "f32.div", None, MVP;
    F32Min = None, 0x96, "f32.min", None, MVP;
    F32Max = None, 0x97, "f32.max", None, MVP;
    F32Copysign = None, 0x98, "f32.copysign", None, MVP;

    // f64 arithmetic
    F64Abs = None, 0x99, "f64.abs", None, MVP;
    F64Neg = None, 0x9a, "f64.neg", None, MVP;
    F64Ceil = None, 0x9b, "f64.ceil", None, MVP;
    F64Floor = None, 0x9c, "f64.floor", None, MVP;
    F64Trunc = None, 0x9d, "f64.trunc", None, MVP;
    F64Nearest = None, 0x9e, "f64.nearest", None, MVP;
    F64Sqrt = None, 0x9f, "f64.sqrt", None, MVP;
    F64Add = None, 0xa0, "f64.add", None, MVP;
    F64Sub = None, 0xa1, "f64.sub", None, MVP;
    F64Mul = None, 0xa2, "f64.mul", None, MVP;
    F64Div = None, 0xa3, "f64.div", None, MVP;
    F64Min = None, 0xa4, "f64.min", None, MVP;
    F64Max = None, 0xa5, "f64.max", None, MVP;
    F64Copysign = None, 0xa6, "f64.copysign", None, MVP;

    // Conversions
    I32WrapI64 = None, 0xa7, "i32.wrap_i64", None, MVP;
    I32TruncF32S = None, 0xa8, "i32.trunc_f32_s", None, MVP;
    I32TruncF32U = None, 0xa9, "i32.trunc_f32_u", None, MVP;
    I32TruncF64S = None, 0xaa, "i32.trunc_f64_s", None, MVP;
    I32TruncF64U = None, 0xab, "i32.trunc_f64_u", None, MVP;
    I64ExtendI32S = None, 0xac, "i64.extend_i32_s", None, MVP;
    I64ExtendI32U = None, 0xad, "i64.extend_i32_u", None, MVP;
    I64TruncF32S = None, 0xae, "i64.trunc_f32_s", None, MVP;
    I64TruncF32U = None, 0xaf, "i64.trunc_f32_u", None, MVP;
    I64TruncF64S = None, 0xb0, "i64.trunc_f64_s", None, MVP;
    I64TruncF64U = None, 0xb1, "i64.trunc_f64_u", None, MVP;
    F32ConvertI32S = None, 0xb2, "f32.convert_i32_s", None, MVP;
    F32ConvertI32U = None, 0xb3, "f32.convert_i32_u", None, MVP;
    F32ConvertI64S = None, 0xb4, "f32.convert_i64_s", None, MVP;
    F32ConvertI64U = None, 0xb5, "f32.convert_i64_u", None, MVP;
    F32DemoteF64 = None, 0xb6, "f32.demote_f64", None, MVP;
    F64ConvertI32S = None, 0xb7, "f64.convert_i32_s", None, MVP;
    F64ConvertI32U = None, 0xb8, "f64.convert_i32_u", None, MVP;
    F64ConvertI64S = None, 0xb9, "f64.convert_i64_s", None, MVP;
    F64ConvertI64U = None, 0xba, "f64.convert_i64_u", None, MVP;
    F64PromoteF32 = None, 0xbb, "f64.promote_f32", None, MVP;
    I32ReinterpretF32 = None, 0xbc, "i32.reinterpret_f32", None, MVP;
    I64ReinterpretF64 = None, 0xbd, "i64.reinterpret_f64", None, MVP;
    F32ReinterpretI32 = None, 0xbe, "f32.reinterpret_i32", None, MVP;
    F64ReinterpretI64 = None, 0xbf, "f64.reinterpret_i64", None, MVP;

    // Sign extension
    I32Extend8S = None, 0xc0, "i32.extend8_s", None, SIGN_EXTENSION;
    I32Extend16S = None, 0xc1, "i32.extend16_s", None, SIGN_EXTENSION;
    I64Extend8S = None, 0xc2, "i64.extend8_s", None, SIGN_EXTENSION;
    I64Extend16S = None, 0xc3, "i64.extend16_s", None, SIGN_EXTENSION;
    I64Extend32S = None, 0xc4, "i64.extend32_s", None, SIGN_EXTENSION;

    // References
    RefNull = None, 0xd0, "ref.null", RefType, REFERENCE_TYPES;
    RefIsNull = None, 0xd1, "ref.is_null", None, REFERENCE_TYPES;
    RefFunc = None, 0xd2, "ref.func", Index, REFERENCE_TYPES;

    // 0xFC: saturating truncation
    I32TruncSatF32S = Some(PREFIX_MISC), 0x00, "i32.trunc_sat_f32_s", None, SATURATING_FLOAT_TO_INT;
    I32TruncSatF32U = Some(PREFIX_MISC), 0x01, "i32.trunc_sat_f32_u", None, SATURATING_FLOAT_TO_INT;
    I32TruncSatF64S = Some(PREFIX_MISC), 0x02, "i32.trunc_sat_f64_s", None, SATURATING_FLOAT_TO_INT;
    I32TruncSatF64U = Some(PREFIX_MISC), 0x03, "i32.trunc_sat_f64_u", None, SATURATING_FLOAT_TO_INT;
    I64TruncSatF32S = Some(PREFIX_MISC), 0x04, "i64.trunc_sat_f32_s", None, SATURATING_FLOAT_TO_INT;
    I64TruncSatF32U = Some(PREFIX_MISC), 0x05, "i64.trunc_sat_f32_u", None, SATURATING_FLOAT_TO_INT;
    I64TruncSatF64S = Some(PREFIX_MISC), 0x06, "i64.trunc_sat_f64_s", None, SATURATING_FLOAT_TO_INT;
    I64TruncSatF64U = Some(PREFIX_MISC), 0x07, "i64.trunc_sat_f64_u", None, SATURATING_FLOAT_TO_INT;

    // 0xFC: bulk memory
    MemoryInit = Some(PREFIX_MISC), 0x08, "memory.init", IndexPair, BULK_MEMORY;
    DataDrop = Some(PREFIX_MISC), 0x09, "data.drop", Index, BULK_MEMORY;
    MemoryCopy = Some(PREFIX_MISC), 0x0a, "memory.copy", IndexPair, BULK_MEMORY;
    MemoryFill = Some(PREFIX_MISC), 0x0b, "memory.fill", Index, BULK_MEMORY;
    TableInit = Some(PREFIX_MISC), 0x0c, "table.init", IndexPair, BULK_MEMORY;
    ElemDrop = Some(PREFIX_MISC), 0x0d, "elem.drop", Index, BULK_MEMORY;
    TableCopy = Some(PREFIX_MISC), 0x0e, "table.copy", IndexPair, BULK_MEMORY;
    TableGrow = Some(PREFIX_MISC), 0x0f, "table.grow", Index, REFERENCE_TYPES;
    TableSize = Some(PREFIX_MISC), 0x10, "table.size", Index, REFERENCE_TYPES;
    TableFill = Some(PREFIX_MISC), 0x11, "table.fill", Index, REFERENCE_TYPES;

    // 0xFD: SIMD loads/stores and constants
    V128Load = Some(PREFIX_SIMD), 0x00, "v128.load", MemArg, SIMD;
    V128Load8x8S = Some(PREFIX_SIMD), 0x01, "v128.load8x8_s", MemArg, SIMD;
    V128Load8x8U = Some(PREFIX_SIMD), 0x02, "v128.load8x8_u", MemArg, SIMD;
    V128Load16x4S = Some(PREFIX_SIMD), 0x03, "v128.load16x4_s", MemArg, SIMD;
    V128Load16x4U = Some(PREFIX_SIMD), 0x04, "v128.load16x4_u", MemArg, SIMD;
    V128Load32x2S = Some(PREFIX_SIMD), 0x05, "v128.load32x2_s", MemArg, SIMD;
    V128Load32x2U = Some(PREFIX_SIMD), 0x06, "v128.load32x2_u", MemArg, SIMD;
    V128Load8Splat = Some(PREFIX_SIMD), 0x07, "v128.load8_splat", MemArg, SIMD;
    V128Load16Splat = Some(PREFIX_SIMD), 0x08, "v128.load16_splat", MemArg, SIMD;
    V128Load32Splat = Some(PREFIX_SIMD), 0x09, "v128.load32_splat", MemArg, SIMD;
    V128Load64Splat = Some(PREFIX_SIMD), 0x0a, "v128.load64_splat", MemArg, SIMD;
    V128Store = Some(PREFIX_SIMD), 0x0b, "v128.store", MemArg, SIMD;
    V128Const = Some(PREFIX_SIMD), 0x0c, "v128.const", V128, SIMD;
    I8x16Shuffle = Some(PREFIX_SIMD), 0x0d, "i8x16.shuffle", Shuffle, SIMD;
    I8x16Swizzle = Some(PREFIX_SIMD), 0x0e, "i8x16.swizzle", None, SIMD;
    I8x16Splat = Some(PREFIX_SIMD), 0x0f, "i8x16.splat", None, SIMD;
    I16x8Splat = Some(PREFIX_SIMD), 0x10, "i16x8.splat", None, SIMD;
    I32x4Splat = Some(PREFIX_SIMD), 0x11, "i32x4.splat", None, SIMD;
    I64x2Splat = Some(PREFIX_SIMD), 0x12, "i64x2.splat", None, SIMD;
    F32x4Splat = Some(PREFIX_SIMD), 0x13, "f32x4.splat", None, SIMD;
    F64x2Splat = Some(PREFIX_SIMD), 0x14, "f64x2.splat", None, SIMD;
    I8x16ExtractLaneS = Some(PREFIX_SIMD), 0x15, "i8x16.extract_lane_s", Lane, SIMD;
    I8x16ExtractLaneU = Some(PREFIX_SIMD), 0x16, "i8x16.extract_lane_u", Lane, SIMD;
    I8x16ReplaceLane = Some(PREFIX_SIMD), 0x17, "i8x16.replace_lane", Lane, SIMD;
    I16x8ExtractLaneS = Some(PREFIX_SIMD), 0x18, "i16x8.extract_lane_s", Lane, SIMD;
    I16x8ExtractLaneU = Some(PREFIX_SIMD), 0x19, "i16x8.extract_lane_u", Lane, SIMD;
    I16x8ReplaceLane = Some(PREFIX_SIMD), 0x1a, "i16x8.replace_lane", Lane, SIMD;
    I32x4ExtractLane = Some(PREFIX_SIMD), 0x1b, "i32x4.extract_lane", Lane, SIMD;
    I32x4ReplaceLane = Some(PREFIX_SIMD), 0x1c, "i32x4.replace_lane", Lane, SIMD;
    I64x2ExtractLane = Some(PREFIX_SIMD), 0x1d, "i64x2.extract_lane", Lane, SIMD;
    I64x2ReplaceLane = Some(PREFIX_SIMD), 0x1e, "i64x2.replace_lane", Lane, SIMD;
    F32x4ExtractLane = Some(PREFIX_SIMD), 0x1f, "f32x4.extract_lane", Lane, SIMD;
    F32x4ReplaceLane = Some(PREFIX_SIMD), 0x20, "f32x4.replace_lane", Lane, SIMD;
    F64x2ExtractLane = Some(PREFIX_SIMD), 0x21, "f64x2.extract_lane", Lane, SIMD;
    F64x2ReplaceLane = Some(PREFIX_SIMD), 0x22, "f64x2.replace_lane", Lane, SIMD;

    // 0xFD: SIMD comparisons
    I8x16Eq = Some(PREFIX_SIMD), 0x23, "i8x16.eq", None, SIMD;
    I8x16Ne = Some(PREFIX_SIMD), 0x24, "i8x16.ne", None, SIMD;
    I8x16LtS = Some(PREFIX_SIMD), 0x25, "i8x16.lt_s", None, SIMD;
    I8x16LtU = Some(PREFIX_SIMD), 0x26, "i8x16.lt_u", None, SIMD;
    I8x16GtS = Some(PREFIX_SIMD), 0x27, "i8x16.gt_s", None, SIMD;
    I8x16GtU = Some(PREFIX_SIMD), 0x28, "i8x16.gt_u", None, SIMD;
    I8x16LeS = Some(PREFIX_SIMD), 0x29, "i8x16.le_s", None, SIMD;
    I8x16LeU = Some(PREFIX_SIMD), 0x2a, "i8x16.le_u", None, SIMD;
    I8x16GeS = Some(PREFIX_SIMD), 0x2b, "i8x16.ge_s", None, SIMD;
    I8x16GeU = Some(PREFIX_SIMD), 0x2c, "i8x16.ge_u", None, SIMD;
    I16x8Eq = Some(PREFIX_SIMD), 0x2d, "i16x8.eq", None, SIMD;
    I16x8Ne = Some(PREFIX_SIMD), 0x2e, "i16x8.ne", None, SIMD;
    I16x8LtS = Some(PREFIX_SIMD), 0x2f, "i16x8.lt_s", None, SIMD;
    I16x8LtU = Some(PREFIX_SIMD), 0x30, "i16x8.lt_u", None, SIMD;
    I16x8GtS = Some(PREFIX_SIMD), 0x31, "i16x8.gt_s", None, SIMD;
    I16x8GtU = Some(PREFIX_SIMD), 0x32, "i16x8.gt_u", None, SIMD;
    I16x8LeS = Some(PREFIX_SIMD), 0x33, "i16x8.le_s", None, SIMD;
    I16x8LeU = Some(PREFIX_SIMD), 0x34, "i16x8.le_u", None, SIMD;
    I16x8GeS = Some(PREFIX_SIMD), 0x35, "i16x8.ge_s", None, SIMD;
    I16x8GeU = Some(PREFIX_SIMD), 0x36, "i16x8.ge_u", None, SIMD;
    I32x4Eq = Some(PREFIX_SIMD), 0x37, "i32x4.eq", None, SIMD;
    I32x4Ne = Some(PREFIX_SIMD), 0x38, "i32x4.ne", None, SIMD;
    I32x4LtS = Some(PREFIX_SIMD), 0x39, "i32x4.lt_s", None, SIMD;
    I32x4LtU = Some(PREFIX_SIMD), 0x3a, "i32x4.lt_u", None, SIMD;
    I32x4GtS = Some(PREFIX_SIMD), 0x3b, "i32x4.gt_s", None, SIMD;
    I32x4GtU = Some(PREFIX_SIMD), 0x3c, "i32x4.gt_u", None, SIMD;
    I32x4LeS = Some(PREFIX_SIMD), 0x3d, "i32x4.le_s", None, SIMD;
    I32x4LeU = Some(PREFIX_SIMD), 0x3e, "i32x4.le_u", None, SIMD;
    I32x4GeS = Some(PREFIX_SIMD), 0x3f, "i32x4.ge_s", None, SIMD;
    I32x4GeU = Some(PREFIX_SIMD), 0x40, "i32x4.ge_u", None, SIMD;
    F32x4Eq = Some(PREFIX_SIMD), 0x41, "f32x4.eq", None, SIMD;
    F32x4Ne = Some(PREFIX_SIMD), 0x42, "f32x4.ne", None, SIMD;
    F32x4Lt = Some(PREFIX_SIMD), 0x43, "f32x4.lt", None, SIMD;
    F32x4Gt = Some(PREFIX_SIMD), 0x44, "f32x4.gt", None, SIMD;
    F32x4Le = Some(PREFIX_SIMD), 0x45, "f32x4.le", None, SIMD;
    F32x4Ge = Some(PREFIX_SIMD), 0x46, "f32x4.ge", None, SIMD;
    F64x2Eq = Some(PREFIX_SIMD), 0x47, "f64x2.eq", None, SIMD;
    F64x2Ne = Some(PREFIX_SIMD), 0x48, "f64x2.ne", None, SIMD;
    F64x2Lt = Some(PREFIX_SIMD), 0x49, "f64x2.lt", None, SIMD;
    F64x2Gt = Some(PREFIX_SIMD), 0x4a, "f64x2.gt", None, SIMD;
    F64x2Le = Some(PREFIX_SIMD), 0x4b, "f64x2.le", None, SIMD;
    F64x2Ge = Some(PREFIX_SIMD), 0x4c, "f64x2.ge", None, SIMD;

    // 0xFD: SIMD bitwise
    V128Not = Some(PREFIX_SIMD), 0x4d, "v128.not", None, SIMD;
    V128And = Some(PREFIX_SIMD), 0x4e, "v128.and", None, SIMD;
    V128AndNot = Some(PREFIX_SIMD), 0x4f, "v128.andnot", None, SIMD;
    V128Or = Some(PREFIX_SIMD), 0x50, "v128.or", None, SIMD;
    V128Xor = Some(PREFIX_SIMD), 0x51, "v128.xor", None, SIMD;
    V128Bitselect = Some(PREFIX_SIMD), 0x52, "v128.bitselect", None, SIMD;
    V128AnyTrue = Some(PREFIX_SIMD), 0x53, "v128.any_true", None, SIMD;

    // 0xFD: SIMD lane memory access
    V128Load8Lane = Some(PREFIX_SIMD), 0x54, "v128.load8_lane", MemArgLane, SIMD;
    V128Load16Lane = Some(PREFIX_SIMD), 0x55, "v128.load16_lane", MemArgLane, SIMD;
    V128Load32Lane = Some(PREFIX_SIMD), 0x56, "v128.load32_lane", MemArgLane, SIMD;
    V128Load64Lane = Some(PREFIX_SIMD), 0x57, "v128.load64_lane", MemArgLane, SIMD;
    V128Store8Lane = Some(PREFIX_SIMD), 0x58, "v128.store8_lane", MemArgLane, SIMD;
    V128Store16Lane = Some(PREFIX_SIMD), 0x59, "v128.store16_lane", MemArgLane, SIMD;
    V128Store32Lane = Some(PREFIX_SIMD), 0x5a, "v128.store32_lane", MemArgLane, SIMD;
    V128Store64Lane = Some(PREFIX_SIMD), 0x5b, "v128.store64_lane", MemArgLane, SIMD;
    V128Load32Zero = Some(PREFIX_SIMD), 0x5c, "v128.load32_zero", MemArg, SIMD;
    V128Load64Zero = Some(PREFIX_SIMD), 0x5d, "v128.load64_zero", MemArg, SIMD;
    F32x4DemoteF64x2Zero = Some(PREFIX_SIMD), 0x5e, "f32x4.demote_f64x2_zero", None, SIMD;
    F64x2PromoteLowF32x4 = Some(PREFIX_SIMD), 0x5f, "f64x2.promote_low_f32x4", None, SIMD;

    // 0xFD: i8x16 operations
    I8x16Abs = Some(PREFIX_SIMD), 0x60, "i8x16.abs", None, SIMD;
    I8x16Neg = Some(PREFIX_SIMD), 0x61, "i8x16.neg", None, SIMD;
    I8x16Popcnt = Some(PREFIX_SIMD), 0x62, "i8x16.popcnt", None, SIMD;
    I8x16AllTrue = Some(PREFIX_SIMD), 0x63, "i8x16.all_true", None, SIMD;
    I8x16Bitmask = Some(PREFIX_SIMD), 0x64, "i8x16.bitmask", None, SIMD;
    I8x16NarrowI16x8S = Some(PREFIX_SIMD), 0x65, "i8x16.narrow_i16x8_s", None, SIMD;
    I8x16NarrowI16x8U = Some(PREFIX_SIMD), 0x66, "i8x16.narrow_i16x8_u", None, SIMD;
    F32x4Ceil = Some(PREFIX_SIMD), 0x67, "f32x4.ceil", None, SIMD;
    F32x4Floor = Some(PREFIX_SIMD), 0x68, "f32x4.floor", None, SIMD;
    F32x4Trunc = Some(PREFIX_SIMD), 0x69, "f32x4.trunc", None, SIMD;
    F32x4Nearest = Some(PREFIX_SIMD), 0x6a, "f32x4.nearest", None, SIMD;
    I8x16Shl = Some(PREFIX_SIMD), 0x6b, "i8x16.shl", None, SIMD;
    I8x16ShrS = Some(PREFIX_SIMD), 0x6c, "i8x16.shr_s", None, SIMD;
    I8x16ShrU = Some(PREFIX_SIMD), 0x6d, "i8x16.shr_u", None, SIMD;
    I8x16Add = Some(PREFIX_SIMD), 0x6e, "i8x16.add", None, SIMD;
    I8x16AddSatS = Some(PREFIX_SIMD), 0x6f, "i8x16.add_sat_s", None, SIMD;
    I8x16AddSatU = Some(PREFIX_SIMD), 0x70, "i8x16.add_sat_u", None, SIMD;
    I8x16Sub = Some(PREFIX_SIMD), 0x71, "i8x16.sub", None, SIMD;
    I8x16SubSatS = Some(PREFIX_SIMD), 0x72, "i8x16.sub_sat_s", None, SIMD;
    I8x16SubSatU = Some(PREFIX_SIMD), 0x73, "i8x16.sub_sat_u", None, SIMD;
    F64x2Ceil = Some(PREFIX_SIMD), 0x74, "f64x2.ceil", None, SIMD;
    F64x2Floor = Some(PREFIX_SIMD), 0x75, "f64x2.floor", None, SIMD;
    I8x16MinS = Some(PREFIX_SIMD), 0x76, "i8x16.min_s", None, SIMD;
    I8x16MinU = Some(PREFIX_SIMD), 0x77, "i8x16.min_u", None, SIMD;
    I8x16MaxS = Some(PREFIX_SIMD), 0x78, "i8x16.max_s", None, SIMD;
    I8x16MaxU = Some(PREFIX_SIMD), 0x79, "i8x16.max_u", None, SIMD;
    F64x2Trunc = Some(PREFIX_SIMD), 0x7a, "f64x2.trunc", None, SIMD;
    I8x16AvgrU = Some(PREFIX_SIMD), 0x7b, "i8x16.avgr_u", None, SIMD;
    I16x8ExtaddPairwiseI8x16S = Some(PREFIX_SIMD), 0x7c, "i16x8.extadd_pairwise_i8x16_s", None, SIMD;
    I16x8ExtaddPairwiseI8x16U = Some(PREFIX_SIMD), 0x7d, "i16x8.extadd_pairwise_i8x16_u", None, SIMD;
    I32x4ExtaddPairwiseI16x8S = Some(PREFIX_SIMD), 0x7e, "i32x4.extadd_pairwise_i16x8_s", None, SIMD;
    I32x4ExtaddPairwiseI16x8U = Some(PREFIX_SIMD), 0x7f, "i32x4.extadd_pairwise_i16x8_u", None, SIMD;

    // 0xFD: i16x8 operations
    I16x8Abs = Some(PREFIX_SIMD), 0x80, "i16x8.abs", None, SIMD;
    I16x8Neg = Some(PREFIX_SIMD), 0x81, "i16x8.neg", None, SIMD;
    I16x8Q15MulrSatS = Some(PREFIX_SIMD), 0x82, "i16x8.q15mulr_sat_s", None, SIMD;
    I16x8AllTrue = Some(PREFIX_SIMD), 0x83, "i16x8.all_true", None, SIMD;
    I16x8Bitmask = Some(PREFIX_SIMD), 0x84, "i16x8.bitmask", None, SIMD;
    I16x8NarrowI32x4S = Some(PREFIX_SIMD), 0x85, "i16x8.narrow_i32x4_s", None, SIMD;
    I16x8NarrowI32x4U = Some(PREFIX_SIMD), 0x86, "i16x8.narrow_i32x4_u", None, SIMD;
    I16x8ExtendLowI8x16S = Some(PREFIX_SIMD), 0x87, "i16x8.extend_low_i8x16_s", None, SIMD;
    I16x8ExtendHighI8x16S = Some(PREFIX_SIMD), 0x88, "i16x8.extend_high_i8x16_s", None, SIMD;
    I16x8ExtendLowI8x16U = Some(PREFIX_SIMD), 0x89, "i16x8.extend_low_i8x16_u", None, SIMD;
    I16x8ExtendHighI8x16U = Some(PREFIX_SIMD), 0x8a, "i16x8.extend_high_i8x16_u", None, SIMD;
    I16x8Shl = Some(PREFIX_SIMD), 0x8b, "i16x8.shl", None, SIMD;
    I16x8ShrS = Some(PREFIX_SIMD), 0x8c, "i16x8.shr_s", None, SIMD;
    I16x8ShrU = Some(PREFIX_SIMD), 0x8d, "i16x8.shr_u", None, SIMD;
    I16x8Add = Some(PREFIX_SIMD), 0x8e, "i16x8.add", None, SIMD;
    I16x8AddSatS = Some(PREFIX_SIMD), 0x8f, "i16x8.add_sat_s", None, SIMD;
    I16x8AddSatU = Some(PREFIX_SIMD), 0x90, "i16x8.add_sat_u", None, SIMD;
    I16x8Sub = Some(PREFIX_SIMD), 0x91, "i16x8.sub", None, SIMD;
    I16x8SubSatS = Some(PREFIX_SIMD), 0x92, "i16x8.sub_sat_s", None, SIMD;
    I16x8SubSatU = Some(PREFIX_SIMD), 0x93, "i16x8.sub_sat_u", None, SIMD;
    F64x2Nearest = Some(PREFIX_SIMD), 0x94, "f64x2.nearest", None, SIMD;
    I16x8Mul = Some(PREFIX_SIMD), 0x95, "i16x8.mul", None, SIMD;
    I16x8MinS = Some(PREFIX_SIMD), 0x96, "i16x8.min_s", None, SIMD;
    I16x8MinU = Some(PREFIX_SIMD), 0x97, "i16x8.min_u", None, SIMD;
    I16x8MaxS = Some(PREFIX_SIMD), 0x98, "i16x8.max_s", None, SIMD;
    I16x8MaxU = Some(PREFIX_SIMD), 0x99, "i16x8.max_u", None, SIMD;
    I16x8AvgrU = Some(PREFIX_SIMD), 0x9b, "i16x8.avgr_u", None, SIMD;
    I16x8ExtmulLowI8x16S = Some(PREFIX_SIMD), 0x9c, "i16x8.extmul_low_i8x16_s", None, SIMD;
    I16x8ExtmulHighI8x16S = Some(PREFIX_SIMD), 0x9d, "i16x8.extmul_high_i8x16_s", None, SIMD;
    I16x8ExtmulLowI8x16U = Some(PREFIX_SIMD), 0x9e, "i16x8.extmul_low_i8x16_u", None, SIMD;
    I16x8ExtmulHighI8x16U = Some(PREFIX_SIMD), 0x9f, "i16x8.extmul_high_i8x16_u", None, SIMD;

    // 0xFD: i32x4 operations
    I32x4Abs = Some(PREFIX_SIMD), 0xa0, "i32x4.abs", None, SIMD;
    I32x4Neg = Some(PREFIX_SIMD), 0xa1, "i32x4.neg", None, SIMD;
    I32x4AllTrue = Some(PREFIX_SIMD), 0xa3, "i32x4.all_true", None, SIMD;
    I32x4Bitmask = Some(PREFIX_SIMD), 0xa4, "i32x4.bitmask", None, SIMD;
    I32x4ExtendLowI16x8S = Some(PREFIX_SIMD), 0xa7, "i32x4.extend_low_i16x8_s", None, SIMD;
    I32x4ExtendHighI16x8S = Some(PREFIX_SIMD), 0xa8, "i32x4.extend_high_i16x8_s", None, SIMD;
    I32x4ExtendLowI16x8U = Some(PREFIX_SIMD), 0xa9, "i32x4.extend_low_i16x8_u", None, SIMD;
    I32x4ExtendHighI16x8U = Some(PREFIX_SIMD), 0xaa, "i32x4.extend_high_i16x8_u", None, SIMD;
    I32x4Shl = Some(PREFIX_SIMD), 0xab, "i32x4.shl", None, SIMD;
    I32x4ShrS = Some(PREFIX_SIMD), 0xac, "i32x4.shr_s", None, SIMD;
    I32x4ShrU = Some(PREFIX_SIMD), 0xad, "i32x4.shr_u", None, SIMD;
    I32x4Add = Some(PREFIX_SIMD), 0xae, "i32x4.add", None, SIMD;
    I32x4Sub = Some(PREFIX_SIMD), 0xb1, "i32x4.sub", None, SIMD;
    I32x4Mul = Some(PREFIX_SIMD), 0xb5, "i32x4.mul", None, SIMD;
    I32x4MinS = Some(PREFIX_SIMD), 0xb6, "i32x4.min_s", None, SIMD;
    I32x4MinU = Some(PREFIX_SIMD), 0xb7, "i32x4.min_u", None, SIMD;
    I32x4MaxS = Some(PREFIX_SIMD), 0xb8, "i32x4.max_s", None, SIMD;
    I32x4MaxU = Some(PREFIX_SIMD), 0xb9, "i32x4.max_u", None, SIMD;
    I32x4DotI16x8S = Some(PREFIX_SIMD), 0xba, "i32x4.dot_i16x8_s", None, SIMD;
    I32x4ExtmulLowI16x8S = Some(PREFIX_SIMD), 0xbc, "i32x4.extmul_low_i16x8_s", None, SIMD;
    I32x4ExtmulHighI16x8S = Some(PREFIX_SIMD), 0xbd, "i32x4.extmul_high_i16x8_s", None, SIMD;
    I32x4ExtmulLowI16x8U = Some(PREFIX_SIMD), 0xbe, "i32x4.extmul_low_i16x8_u", None, SIMD;
    I32x4ExtmulHighI16x8U = Some(PREFIX_SIMD), 0xbf, "i32x4.extmul_high_i16x8_u", None, SIMD;

    // 0xFD: i64x2 operations
    I64x2Abs = Some(PREFIX_SIMD), 0xc0, "i64x2.abs", None, SIMD;
    I64x2Neg = Some(PREFIX_SIMD), 0xc1, "i64x2.neg", None, SIMD;
    I64x2AllTrue = Some(PREFIX_SIMD), 0xc3, "i64x2.all_true", None, SIMD;
    I64x2Bitmask = Some(PREFIX_SIMD), 0xc4, "i64x2.bitmask", None, SIMD;
    I64x2ExtendLowI32x4S = Some(PREFIX_SIMD), 0xc7, "i64x2.extend_low_i32x4_s", None, SIMD;
    I64x2ExtendHighI32x4S = Some(PREFIX_SIMD), 0xc8, "i64x2.extend_high_i32x4_s", None, SIMD;
    I64x2ExtendLowI32x4U = Some(PREFIX_SIMD), 0xc9, "i64x2.extend_low_i32x4_u", None, SIMD;
    I64x2ExtendHighI32x4U = Some(PREFIX_SIMD), 0xca, "i64x2.extend_high_i32x4_u", None, SIMD;
    I64x2Shl = Some(PREFIX_SIMD), 0xcb, "i64x2.shl", None, SIMD;
    I64x2ShrS = Some(PREFIX_SIMD), 0xcc, "i64x2.shr_s", None, SIMD;
    I64x2ShrU = Some(PREFIX_SIMD), 0xcd, "i64x2.shr_u", None, SIMD;
    I64x2Add = Some(PREFIX_SIMD), 0xce, "i64x2.add", None, SIMD;
    I64x2Sub = Some(PREFIX_SIMD), 0xd1, "i64x2.sub", None, SIMD;
    I64x2Mul = Some(PREFIX_SIMD), 0xd5, "i64x2.mul", None, SIMD;
    I64x2Eq = Some(PREFIX_SIMD), 0xd6, "i64x2.eq", None, SIMD;
    I64x2Ne = Some(PREFIX_SIMD), 0xd7, "i64x2.ne", None, SIMD;
    I64x2LtS = Some(PREFIX_SIMD), 0xd8, "i64x2.lt_s", None, SIMD;
    I64x2GtS = Some(PREFIX_SIMD), 0xd9, "i64x2.gt_s", None, SIMD;
    I64x2LeS = Some(PREFIX_SIMD), 0xda, "i64x2.le_s", None, SIMD;
    I64x2GeS = Some(PREFIX_SIMD), 0xdb, "i64x2.ge_s", None, SIMD;
    I64x2ExtmulLowI32x4S = Some(PREFIX_SIMD), 0xdc, "i64x2.extmul_low_i32x4_s", None, SIMD;
    I64x2ExtmulHighI32x4S = Some(PREFIX_SIMD), 0xdd, "i64x2.extmul_high_i32x4_s", None, SIMD;
    I64x2ExtmulLowI32x4U = Some(PREFIX_SIMD), 0xde, "i64x2.extmul_low_i32x4_u", None, SIMD;
    I64x2ExtmulHighI32x4U = Some(PREFIX_SIMD), 0xdf, "i64x2.extmul_high_i32x4_u", None, SIMD;

    // 0xFD: f32x4 operations
    F32x4Abs = Some(PREFIX_SIMD), 0xe0, "f32x4.abs", None, SIMD;
    F32x4Neg = Some(PREFIX_SIMD), 0xe1, "f32x4.neg", None, SIMD;
    F32x4Sqrt = Some(PREFIX_SIMD), 0xe3, "f32x4.sqrt", None, SIMD;
    F32x4Add = Some(PREFIX_SIMD), 0xe4, "f32x4.add", None, SIMD;
    F32x4Sub = Some(PREFIX_SIMD), 0xe5, "f32x4.sub", None, SIMD;
    F32x4Mul = Some(PREFIX_SIMD), 0xe6, "f32x4.mul", None, SIMD;
    F32x4Div = Some(PREFIX_SIMD), 0xe7, "f32x4.div", None, SIMD;
    F32x4Min = Some(PREFIX_SIMD), 0xe8, "f32x4.min", None, SIMD;
    F32x4Max = Some(PREFIX_SIMD), 0xe9, "f32x4.max", None, SIMD;
    F32x4Pmin = Some(PREFIX_SIMD), 0xea, "f32x4.pmin", None, SIMD;
    F32x4Pmax = Some(PREFIX_SIMD), 0xeb, "f32x4.pmax", None, SIMD;

    // 0xFD: f64x2 operations
    F64x2Abs = Some(PREFIX_SIMD), 0xec, "f64x2.abs", None, SIMD;
    F64x2Neg = Some(PREFIX_SIMD), 0xed, "f64x2.neg", None, SIMD;
    F64x2Sqrt = Some(PREFIX_SIMD), 0xef, "f64x2.sqrt", None, SIMD;
    F64x2Add = Some(PREFIX_SIMD), 0xf0, "f64x2.add", None, SIMD;
    F64x2Sub = Some(PREFIX_SIMD), 0xf1, "f64x2.sub", None, SIMD;
    F64x2Mul = Some(PREFIX_SIMD), 0xf2, "f64x2.mul", None, SIMD;
    F64x2Div = Some(PREFIX_SIMD), 0xf3, "f64x2.div", None, SIMD;
    F64x2Min = Some(PREFIX_SIMD), 0xf4, "f64x2.min", None, SIMD;
    F64x2Max = Some(PREFIX_SIMD), 0xf5, "f64x2.max", None, SIMD;
    F64x2Pmin = Some(PREFIX_SIMD), 0xf6, "f64x2.pmin", None, SIMD;
    F64x2Pmax = Some(PREFIX_SIMD), 0xf7, "f64x2.pmax", None, SIMD;

    // 0xFD: SIMD conversions
    I32x4TruncSatF32x4S = Some(PREFIX_SIMD), 0xf8, "i32x4.trunc_sat_f32x4_s", None, SIMD;
    I32x4TruncSatF32x4U = Some(PREFIX_SIMD), 0xf9, "i32x4.trunc_sat_f32x4_u", None, SIMD;
    F32x4ConvertI32x4S = Some(PREFIX_SIMD), 0xfa, "f32x4.convert_i32x4_s", None, SIMD;
    F32x4ConvertI32x4U = Some(PREFIX_SIMD), 0xfb, "f32x4.convert_i32x4_u", None, SIMD;
    I32x4TruncSatF64x2SZero = Some(PREFIX_SIMD), 0xfc, "i32x4.trunc_sat_f64x2_s_zero", None, SIMD;
    I32x4TruncSatF64x2UZero = Some(PREFIX_SIMD), 0xfd, "i32x4.trunc_sat_f64x2_u_zero", None, SIMD;
    F64x2ConvertLowI32x4S = Some(PREFIX_SIMD), 0xfe, "f64x2.convert_low_i32x4_s", None, SIMD;
    F64x2ConvertLowI32x4U = Some(PREFIX_SIMD), 0xff, "f64x2.convert_low_i32x4_u", None, SIMD;

    // 0xFE: atomics
    MemoryAtomicNotify = Some(PREFIX_ATOMIC), 0x00, "memory.atomic.notify", MemArg, THREADS;
    MemoryAtomicWait32 = Some(PREFIX_ATOMIC), 0x01, "memory.atomic.wait32", MemArg, THREADS;
    MemoryAtomicWait64 = Some(PREFIX_ATOMIC), 0x02, "memory.atomic.wait64", MemArg, THREADS;
    AtomicFence = Some(PREFIX_ATOMIC), 0x03, "atomic.fence", Byte, THREADS;
    I32AtomicLoad = Some(PREFIX_ATOMIC), 0x10, "i32.atomic.load", MemArg, THREADS;
    I64AtomicLoad = Some(PREFIX_ATOMIC), 0x11, "i64.atomic.load", MemArg, THREADS;
    I32AtomicLoad8U = Some(PREFIX_ATOMIC), 0x12, "i32.atomic.load8_u", MemArg, THREADS;
    I32AtomicLoad16U = Some(PREFIX_ATOMIC), 0x13, "i32.atomic.load16_u", MemArg, THREADS;
    I64AtomicLoad8U = Some(PREFIX_ATOMIC), 0x14, "i64.atomic.load8_u", MemArg, THREADS;
    I64AtomicLoad16U = Some(PREFIX_ATOMIC), 0x15, "i64.atomic.load16_u", MemArg, THREADS;
    I64AtomicLoad32U = Some(PREFIX_ATOMIC), 0x16, "i64.atomic.load32_u", MemArg, THREADS;
    I32AtomicStore = Some(PREFIX_ATOMIC), 0x17, "i32.atomic.store", MemArg, THREADS;
    I64AtomicStore = Some(PREFIX_ATOMIC), 0x18, "i64.atomic.store", MemArg, THREADS;
    I32AtomicStore8 = Some(PREFIX_ATOMIC), 0x19, "i32.atomic.store8", MemArg, THREADS;
    I32AtomicStore16 = Some(PREFIX_ATOMIC), 0x1a, "i32.atomic.store16", MemArg, THREADS;
    I64AtomicStore8 = Some(PREFIX_ATOMIC), 0x1b, "i64.atomic.store8", MemArg, THREADS;
    I64AtomicStore16 = Some(PREFIX_ATOMIC), 0x1c, "i64.atomic.store16", MemArg, THREADS;
    I64AtomicStore32 = Some(PREFIX_ATOMIC), 0x1d, "i64.atomic.store32", MemArg, THREADS;
    I32AtomicRmwAdd = Some(PREFIX_ATOMIC), 0x1e, "i32.atomic.rmw.add", MemArg, THREADS;
    I64AtomicRmwAdd = Some(PREFIX_ATOMIC), 0x1f, "i64.atomic.rmw.add", MemArg, THREADS;
    I32AtomicRmw8AddU = Some(PREFIX_ATOMIC), 0x20, "i32.atomic.rmw8.add_u", MemArg, THREADS;
    I32AtomicRmw16AddU = Some(PREFIX_ATOMIC), 0x21, "i32.atomic.rmw16.add_u", MemArg, THREADS;
    I64AtomicRmw8AddU = Some(PREFIX_ATOMIC), 0x22, "i64.atomic.rmw8.add_u", MemArg, THREADS;
    I64AtomicRmw16AddU = Some(PREFIX_ATOMIC), 0x23, "i64.atomic.rmw16.add_u", MemArg, THREADS;
    I64AtomicRmw32AddU = Some(PREFIX_ATOMIC), 0x24, "i64.atomic.rmw32.add_u", MemArg, THREADS;
    I32AtomicRmwSub = Some(PREFIX_ATOMIC), 0x25, "i32.atomic.rmw.sub", MemArg, THREADS;
    I64AtomicRmwSub = Some(PREFIX_ATOMIC), 0x26, "i64.atomic.rmw.sub", MemArg, THREADS;
    I32AtomicRmw8SubU = Some(PREFIX_ATOMIC), 0x27, "i32.atomic.rmw8.sub_u", MemArg, THREADS;
    I32AtomicRmw16SubU = Some(PREFIX_ATOMIC), 0x28, "i32.atomic.rmw16.sub_u", MemArg, THREADS;
    I64AtomicRmw8SubU = Some(PREFIX_ATOMIC), 0x29, "i64.atomic.rmw8.sub_u", MemArg, THREADS;
    I64AtomicRmw16SubU = Some(PREFIX_ATOMIC), 0x2a, "i64.atomic.rmw16.sub_u", MemArg, THREADS;
    I64AtomicRmw32SubU = Some(PREFIX_ATOMIC), 0x2b, "i64.atomic.rmw32.sub_u", MemArg, THREADS;
    I32AtomicRmwAnd = Some(PREFIX_ATOMIC), 0x2c, "i32.atomic.rmw.and", MemArg, THREADS;
    I64AtomicRmwAnd = Some(PREFIX_ATOMIC), 0x2d, "i64.atomic.rmw.and", MemArg, THREADS;
    I32AtomicRmw8AndU = Some(PREFIX_ATOMIC), 0x2e, "i32.atomic.rmw8.and_u", MemArg, THREADS;
    I32AtomicRmw16AndU = Some(PREFIX_ATOMIC), 0x2f, "i32.atomic.rmw16.and_u", MemArg, THREADS;
    I64AtomicRmw8AndU = Some(PREFIX_ATOMIC), 0x30, "i64.atomic.rmw8.and_u", MemArg, THREADS;
    I64AtomicRmw16AndU = Some(PREFIX_ATOMIC), 0x31, "i64.atomic.rmw16.and_u", MemArg, THREADS;
    I64AtomicRmw32AndU = Some(PREFIX_ATOMIC), 0x32, "i64.atomic.rmw32.and_u", MemArg, THREADS;
    I32AtomicRmwOr = Some(PREFIX_ATOMIC), 0x33, "i32.atomic.rmw.or", MemArg, THREADS;
    I64AtomicRmwOr = Some(PREFIX_ATOMIC), 0x34, "i64.atomic.rmw.or", MemArg, THREADS;
    I32AtomicRmw8OrU = Some(PREFIX_ATOMIC), 0x35, "i32.atomic.rmw8.or_u", MemArg, THREADS;
    I32AtomicRmw16OrU = Some(PREFIX_ATOMIC), 0x36, "i32.atomic.rmw16.or_u", MemArg, THREADS;
    I64AtomicRmw8OrU = Some(PREFIX_ATOMIC), 0x37, "i64.atomic.rmw8.or_u", MemArg, THREADS;
    I64AtomicRmw16OrU = Some(PREFIX_ATOMIC), 0x38, "i64.atomic.rmw16.or_u", MemArg, THREADS;
    I64AtomicRmw32OrU = Some(PREFIX_ATOMIC), 0x39, "i64.atomic.rmw32.or_u", MemArg, THREADS;
    I32AtomicRmwXor = Some(PREFIX_ATOMIC), 0x3a, "i32.atomic.rmw.xor", MemArg, THREADS;
    I64AtomicRmwXor = Some(PREFIX_ATOMIC), 0x3b, "i64.atomic.rmw.xor", MemArg, THREADS;
    I32AtomicRmw8XorU = Some(PREFIX_ATOMIC), 0x3c, "i32.atomic.rmw8.xor_u", MemArg, THREADS;
    I32AtomicRmw16XorU = Some(PREFIX_ATOMIC), 0x3d, "i32.atomic.rmw16.xor_u", MemArg, THREADS;
    I64AtomicRmw8XorU = Some(PREFIX_ATOMIC), 0x3e, "i64.atomic.rmw8.xor_u", MemArg, THREADS;
    I64AtomicRmw16XorU = Some(PREFIX_ATOMIC), 0x3f, "i64.atomic.rmw16.xor_u", MemArg, THREADS;
    I64AtomicRmw32XorU = Some(PREFIX_ATOMIC), 0x40, "i64.atomic.rmw32.xor_u", MemArg, THREADS;
    I32AtomicRmwXchg = Some(PREFIX_ATOMIC), 0x41, "i32.atomic.rmw.xchg", MemArg, THREADS;
    I64AtomicRmwXchg = Some(PREFIX_ATOMIC), 0x42, "i64.atomic.rmw.xchg", MemArg, THREADS;
    I32AtomicRmw8XchgU = Some(PREFIX_ATOMIC), 0x43, "i32.atomic.rmw8.xchg_u", MemArg, THREADS;
    I32AtomicRmw16XchgU = Some(PREFIX_ATOMIC), 0x44, "i32.atomic.rmw16.xchg_u", MemArg, THREADS;
    I64AtomicRmw8XchgU = Some(PREFIX_ATOMIC), 0x45, "i64.atomic.rmw8.xchg_u", MemArg, THREADS;
    I64AtomicRmw16XchgU = Some(PREFIX_ATOMIC), 0x46, "i64.atomic.rmw16.xchg_u", MemArg, THREADS;
    I64AtomicRmw32XchgU = Some(PREFIX_ATOMIC), 0x47, "i64.atomic.rmw32.xchg_u", MemArg, THREADS;
    I32AtomicRmwCmpxchg = Some(PREFIX_ATOMIC), 0x48, "i32.atomic.rmw.cmpxchg", MemArg, THREADS;
    I64AtomicRmwCmpxchg = Some(PREFIX_ATOMIC), 0x49, "i64.atomic.rmw.cmpxchg", MemArg, THREADS;
    I32AtomicRmw8CmpxchgU = Some(PREFIX_ATOMIC), 0x4a, "i32.atomic.rmw8.cmpxchg_u", MemArg, THREADS;
    I32AtomicRmw16CmpxchgU = Some(PREFIX_ATOMIC), 0x4b, "i32.atomic.rmw16.cmpxchg_u", MemArg, THREADS;
    I64AtomicRmw8CmpxchgU = Some(PREFIX_ATOMIC), 0x4c, "i64.atomic.rmw8.cmpxchg_u", MemArg, THREADS;
    I64AtomicRmw16CmpxchgU = Some(PREFIX_ATOMIC), 0x4d, "i64.atomic.rmw16.cmpxchg_u", MemArg, THREADS;
    I64AtomicRmw32CmpxchgU = Some(PREFIX_ATOMIC), 0x4e, "i64.atomic.rmw32.cmpxchg_u", MemArg, THREADS;
}

static BY_CODE: Lazy<HashMap<(Option<u8>, u32), Opcode>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(OPCODES.len());
    for info in OPCODES {
        let previous = map.insert((info.prefix, info.code), info.opcode);
        // `select` and typed `select` are distinct opcodes; everything else
        // must be unique in its space.
        debug_assert!(
            previous.is_none(),
            "duplicate encoding for {:?}",
            info.opcode
        );
    }
    map
});

impl Opcode {
    /// This opcode's table row.
    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODES[self as usize]
    }

    /// The text-format mnemonic.
    pub fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    /// The shape of the immediate following this opcode.
    pub fn immediate_kind(self) -> ImmediateKind {
        self.info().immediate
    }

    /// The feature required to validate this opcode.
    pub fn required_features(self) -> Features {
        self.info().features
    }

    /// Total function from the encoded form to the opcode.
    pub fn lookup(prefix: Option<u8>, code: u32) -> Option<Opcode> {
        BY_CODE.get(&(prefix, code)).copied()
    }

    /// Natural alignment (log2 of the access width in bytes) for memory and
    /// atomic access instructions; `None` for everything else.
    pub fn natural_align_log2(self) -> Option<u32> {
        use Opcode::*;
        let align = match self {
            I32Load8S | I32Load8U | I64Load8S | I64Load8U | I32Store8 | I64Store8
            | V128Load8Splat | V128Load8Lane | V128Store8Lane | I32AtomicLoad8U
            | I64AtomicLoad8U | I32AtomicStore8 | I64AtomicStore8 | I32AtomicRmw8AddU
            | I64AtomicRmw8AddU | I32AtomicRmw8SubU | I64AtomicRmw8SubU | I32AtomicRmw8AndU
            | I64AtomicRmw8AndU | I32AtomicRmw8OrU | I64AtomicRmw8OrU | I32AtomicRmw8XorU
            | I64AtomicRmw8XorU | I32AtomicRmw8XchgU | I64AtomicRmw8XchgU
            | I32AtomicRmw8CmpxchgU | I64AtomicRmw8CmpxchgU => 0,

            I32Load16S | I32Load16U | I64Load16S | I64Load16U | I32Store16 | I64Store16
            | V128Load16Splat | V128Load16Lane | V128Store16Lane | I32AtomicLoad16U
            | I64AtomicLoad16U | I32AtomicStore16 | I64AtomicStore16 | I32AtomicRmw16AddU
            | I64AtomicRmw16AddU | I32AtomicRmw16SubU | I64AtomicRmw16SubU
            | I32AtomicRmw16AndU | I64AtomicRmw16AndU | I32AtomicRmw16OrU | I64AtomicRmw16OrU
            | I32AtomicRmw16XorU | I64AtomicRmw16XorU | I32AtomicRmw16XchgU
            | I64AtomicRmw16XchgU | I32AtomicRmw16CmpxchgU | I64AtomicRmw16CmpxchgU => 1,

            I32Load | F32Load | I64Load32S | I64Load32U | I32Store | F32Store | I64Store32
            | V128Load32Splat | V128Load32Zero | V128Load32Lane | V128Store32Lane
            | MemoryAtomicNotify | MemoryAtomicWait32 | I32AtomicLoad | I64AtomicLoad32U
            | I32AtomicStore | I64AtomicStore32 | I32AtomicRmwAdd | I64AtomicRmw32AddU
            | I32AtomicRmwSub | I64AtomicRmw32SubU | I32AtomicRmwAnd | I64AtomicRmw32AndU
            | I32AtomicRmwOr | I64AtomicRmw32OrU | I32AtomicRmwXor | I64AtomicRmw32XorU
            | I32AtomicRmwXchg | I64AtomicRmw32XchgU | I32AtomicRmwCmpxchg
            | I64AtomicRmw32CmpxchgU => 2,

            I64Load | F64Load | I64Store | F64Store | V128Load8x8S | V128Load8x8U
            | V128Load16x4S | V128Load16x4U | V128Load32x2S | V128Load32x2U | V128Load64Splat
            | V128Load64Zero | V128Load64Lane | V128Store64Lane | MemoryAtomicWait64
            | I64AtomicLoad | I64AtomicStore | I64AtomicRmwAdd | I64AtomicRmwSub
            | I64AtomicRmwAnd | I64AtomicRmwOr | I64AtomicRmwXor | I64AtomicRmwXchg
            | I64AtomicRmwCmpxchg => 3,

            V128Load | V128Store => 4,

            _ => return Option::None,
        };
        Some(align)
    }

    /// Number of lanes addressed by this opcode's lane-index immediate;
    /// `None` for opcodes without one. Shuffle lane indices may be up to
    /// twice this (they select from two vectors).
    pub fn lane_count(self) -> Option<u32> {
        use Opcode::*;
        let lanes = match self {
            I8x16ExtractLaneS | I8x16ExtractLaneU | I8x16ReplaceLane | I8x16Shuffle
            | V128Load8Lane | V128Store8Lane => 16,
            I16x8ExtractLaneS | I16x8ExtractLaneU | I16x8ReplaceLane | V128Load16Lane
            | V128Store16Lane => 8,
            I32x4ExtractLane | I32x4ReplaceLane | F32x4ExtractLane | F32x4ReplaceLane
            | V128Load32Lane | V128Store32Lane => 4,
            I64x2ExtractLane | I64x2ReplaceLane | F64x2ExtractLane | F64x2ReplaceLane
            | V128Load64Lane | V128Store64Lane => 2,
            _ => return Option::None,
        };
        Some(lanes)
    }

    /// Whether this opcode is a memory or atomic access carrying a mem-arg.
    pub fn is_memory_access(self) -> bool {
        matches!(
            self.immediate_kind(),
            ImmediateKind::MemArg | ImmediateKind::MemArgLane
        ) || matches!(self, Opcode::MemorySize | Opcode::MemoryGrow | Opcode::MemoryFill)
    }

    /// Whether this opcode is in the atomic (`0xFE`) space.
    pub fn is_atomic(self) -> bool {
        self.info().prefix == Some(PREFIX_ATOMIC)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_order_matches_table_order() {
        for (index, info) in OPCODES.iter().enumerate() {
            assert_eq!(
                info.opcode as usize, index,
                "table row {index} out of order: {:?}",
                info.opcode
            );
        }
    }

    #[test]
    fn encodings_are_unique() {
        // Forces the BY_CODE debug assertion.
        assert!(Opcode::lookup(None, 0x00).is_some());
        assert_eq!(BY_CODE.len(), OPCODES.len());
    }

    #[test]
    fn base_space_lookups() {
        assert_eq!(Opcode::lookup(None, 0x00), Some(Opcode::Unreachable));
        assert_eq!(Opcode::lookup(None, 0x0b), Some(Opcode::End));
        assert_eq!(Opcode::lookup(None, 0x41), Some(Opcode::I32Const));
        assert_eq!(Opcode::lookup(None, 0x6a), Some(Opcode::I32Add));
        assert_eq!(Opcode::lookup(None, 0xd0), Some(Opcode::RefNull));
        assert_eq!(Opcode::lookup(None, 0x27), None);
        assert_eq!(Opcode::lookup(None, 0xc5), None);
    }

    #[test]
    fn prefixed_lookups() {
        assert_eq!(
            Opcode::lookup(Some(PREFIX_MISC), 0x00),
            Some(Opcode::I32TruncSatF32S)
        );
        assert_eq!(
            Opcode::lookup(Some(PREFIX_MISC), 0x08),
            Some(Opcode::MemoryInit)
        );
        assert_eq!(Opcode::lookup(Some(PREFIX_MISC), 0x12), None);
        assert_eq!(Opcode::lookup(Some(PREFIX_SIMD), 0x0c), Some(Opcode::V128Const));
        assert_eq!(
            Opcode::lookup(Some(PREFIX_SIMD), 0xff),
            Some(Opcode::F64x2ConvertLowI32x4U)
        );
        // Gaps in the SIMD space are unknown opcodes.
        assert_eq!(Opcode::lookup(Some(PREFIX_SIMD), 0x9a), None);
        assert_eq!(
            Opcode::lookup(Some(PREFIX_ATOMIC), 0x4e),
            Some(Opcode::I64AtomicRmw32CmpxchgU)
        );
        assert_eq!(Opcode::lookup(Some(PREFIX_ATOMIC), 0x4f), None);
    }

    #[test]
    fn mnemonics_and_features() {
        assert_eq!(Opcode::I32Add.mnemonic(), "i32.add");
        assert_eq!(Opcode::BrTable.immediate_kind(), ImmediateKind::BrTable);
        assert_eq!(Opcode::I32Extend8S.required_features(), Features::SIGN_EXTENSION);
        assert_eq!(Opcode::V128Const.required_features(), Features::SIMD);
        assert_eq!(Opcode::AtomicFence.required_features(), Features::THREADS);
        assert_eq!(Opcode::Unreachable.required_features(), Features::MVP);
    }

    #[test]
    fn natural_alignment() {
        assert_eq!(Opcode::I32Load8U.natural_align_log2(), Some(0));
        assert_eq!(Opcode::I32Load16S.natural_align_log2(), Some(1));
        assert_eq!(Opcode::I32Load.natural_align_log2(), Some(2));
        assert_eq!(Opcode::I64Load.natural_align_log2(), Some(3));
        assert_eq!(Opcode::V128Load.natural_align_log2(), Some(4));
        assert_eq!(Opcode::V128Load8x8S.natural_align_log2(), Some(3));
        assert_eq!(Opcode::I64AtomicRmwCmpxchg.natural_align_log2(), Some(3));
        assert_eq!(Opcode::I32Add.natural_align_log2(), None);
    }

    #[test]
    fn lane_counts() {
        assert_eq!(Opcode::I8x16ExtractLaneS.lane_count(), Some(16));
        assert_eq!(Opcode::I16x8ReplaceLane.lane_count(), Some(8));
        assert_eq!(Opcode::F32x4ExtractLane.lane_count(), Some(4));
        assert_eq!(Opcode::V128Load64Lane.lane_count(), Some(2));
        assert_eq!(Opcode::I8x16Add.lane_count(), None);
    }

    #[test]
    fn every_mnemonic_is_nonempty_and_lowercase() {
        for info in OPCODES {
            assert!(!info.mnemonic.is_empty());
            assert!(
                info.mnemonic
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_'),
                "unexpected character in mnemonic {:?}",
                info.mnemonic
            );
        }
    }
}
