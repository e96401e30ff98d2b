//! The closed keyword set of the text format.
//!
//! The table is built once from the opcode table (every mnemonic, with its
//! feature mask), the type names, the structural words, and the legacy
//! spellings that older tools emitted (`get_local`, `f32.convert_s/i32`,
//! ...). Both separator spellings of the conversion mnemonics resolve to the
//! same opcode.
//!
//! Matching is exact-match only; the lexer guarantees the no-trailing-
//! reserved boundary by always looking up a maximal reserved-character run.

use crate::parser::encoding::{RefType, ValueType};
use crate::parser::opcodes::{Opcode, OPCODES};
use crate::wat::token::{Keyword, ScriptNan, Word};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Legacy instruction spellings, kept for compatibility with older text.
static ALIASES: &[(&str, Opcode)] = &[
    ("get_local", Opcode::LocalGet),
    ("set_local", Opcode::LocalSet),
    ("tee_local", Opcode::LocalTee),
    ("get_global", Opcode::GlobalGet),
    ("set_global", Opcode::GlobalSet),
    ("current_memory", Opcode::MemorySize),
    ("grow_memory", Opcode::MemoryGrow),
    ("i32.wrap/i64", Opcode::I32WrapI64),
    ("i32.trunc_s/f32", Opcode::I32TruncF32S),
    ("i32.trunc_u/f32", Opcode::I32TruncF32U),
    ("i32.trunc_s/f64", Opcode::I32TruncF64S),
    ("i32.trunc_u/f64", Opcode::I32TruncF64U),
    ("i64.extend_s/i32", Opcode::I64ExtendI32S),
    ("i64.extend_u/i32", Opcode::I64ExtendI32U),
    ("i64.trunc_s/f32", Opcode::I64TruncF32S),
    ("i64.trunc_u/f32", Opcode::I64TruncF32U),
    ("i64.trunc_s/f64", Opcode::I64TruncF64S),
    ("i64.trunc_u/f64", Opcode::I64TruncF64U),
    ("f32.convert_s/i32", Opcode::F32ConvertI32S),
    ("f32.convert_u/i32", Opcode::F32ConvertI32U),
    ("f32.convert_s/i64", Opcode::F32ConvertI64S),
    ("f32.convert_u/i64", Opcode::F32ConvertI64U),
    ("f32.demote/f64", Opcode::F32DemoteF64),
    ("f64.convert_s/i32", Opcode::F64ConvertI32S),
    ("f64.convert_u/i32", Opcode::F64ConvertI32U),
    ("f64.convert_s/i64", Opcode::F64ConvertI64S),
    ("f64.convert_u/i64", Opcode::F64ConvertI64U),
    ("f64.promote/f32", Opcode::F64PromoteF32),
    ("i32.reinterpret/f32", Opcode::I32ReinterpretF32),
    ("i64.reinterpret/f64", Opcode::I64ReinterpretF64),
    ("f32.reinterpret/i32", Opcode::F32ReinterpretI32),
    ("f64.reinterpret/i64", Opcode::F64ReinterpretI64),
    ("i32.trunc_s:sat/f32", Opcode::I32TruncSatF32S),
    ("i32.trunc_u:sat/f32", Opcode::I32TruncSatF32U),
    ("i32.trunc_s:sat/f64", Opcode::I32TruncSatF64S),
    ("i32.trunc_u:sat/f64", Opcode::I32TruncSatF64U),
    ("i64.trunc_s:sat/f32", Opcode::I64TruncSatF32S),
    ("i64.trunc_u:sat/f32", Opcode::I64TruncSatF32U),
    ("i64.trunc_s:sat/f64", Opcode::I64TruncSatF64S),
    ("i64.trunc_u:sat/f64", Opcode::I64TruncSatF64U),
];

static VALUE_TYPES: &[(&str, ValueType)] = &[
    ("i32", ValueType::I32),
    ("i64", ValueType::I64),
    ("f32", ValueType::F32),
    ("f64", ValueType::F64),
    ("v128", ValueType::V128),
];

static REF_TYPES: &[(&str, RefType)] = &[
    ("funcref", RefType::FuncRef),
    ("externref", RefType::ExternRef),
    ("exnref", RefType::ExnRef),
    ("nullref", RefType::NullRef),
    // Pre-reference-types spelling of funcref.
    ("anyfunc", RefType::FuncRef),
];

static WORDS: &[(&str, Word)] = &[
    ("module", Word::Module),
    ("func", Word::Func),
    ("type", Word::Type),
    ("param", Word::Param),
    ("result", Word::Result),
    ("local", Word::Local),
    ("global", Word::Global),
    ("table", Word::Table),
    ("memory", Word::Memory),
    ("elem", Word::Elem),
    ("data", Word::Data),
    ("offset", Word::Offset),
    ("item", Word::Item),
    ("declare", Word::Declare),
    ("import", Word::Import),
    ("export", Word::Export),
    ("start", Word::Start),
    ("mut", Word::Mut),
    ("shared", Word::Shared),
    ("event", Word::Event),
    ("then", Word::Then),
    ("extern", Word::Extern),
    ("binary", Word::Binary),
    ("quote", Word::Quote),
    ("register", Word::Register),
    ("invoke", Word::Invoke),
    ("get", Word::Get),
    ("script", Word::Script),
    ("input", Word::Input),
    ("output", Word::Output),
    ("assert_return", Word::AssertReturn),
    ("assert_trap", Word::AssertTrap),
    ("assert_exhaustion", Word::AssertExhaustion),
    ("assert_invalid", Word::AssertInvalid),
    ("assert_malformed", Word::AssertMalformed),
    ("assert_unlinkable", Word::AssertUnlinkable),
    ("assert_return_canonical_nan", Word::AssertReturnCanonicalNan),
    ("assert_return_arithmetic_nan", Word::AssertReturnArithmeticNan),
];

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(OPCODES.len() + 128);

    // Instruction mnemonics. Plain `select` precedes the typed form in the
    // table and wins; the parser upgrades it when a type list follows.
    for info in OPCODES {
        map.entry(info.mnemonic).or_insert(Keyword::Instr {
            opcode: info.opcode,
            features: info.features,
        });
    }
    for (name, opcode) in ALIASES {
        map.insert(
            *name,
            Keyword::Instr {
                opcode: *opcode,
                features: opcode.required_features(),
            },
        );
    }
    for (name, vt) in VALUE_TYPES {
        map.insert(*name, Keyword::ValueType(*vt));
    }
    for (name, rt) in REF_TYPES {
        map.insert(*name, Keyword::RefType(*rt));
    }
    for (name, word) in WORDS {
        map.insert(*name, Keyword::Word(*word));
    }
    // Script-assertion literal classes. The number matcher rejects these
    // (no `0x` after the colon), so they reach keyword lookup intact.
    map.insert("nan:canonical", Keyword::Literal(ScriptNan::Canonical));
    map.insert("nan:arithmetic", Keyword::Literal(ScriptNan::Arithmetic));
    map
});

/// Exact-match lookup in the keyword set.
pub fn lookup(text: &str) -> Option<Keyword> {
    KEYWORDS.get(text).copied()
}
