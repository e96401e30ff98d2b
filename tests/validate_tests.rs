//! End-to-end validation scenarios.

mod common;

use common::{body, code_section, function_section, leb, module, type_section};
use wascope::error::{ErrorKind, ErrorSink};
use wascope::features::Features;
use wascope::parser::module::Module;
use wascope::validate::validate;

fn check(bytes: &[u8], features: Features) -> Vec<ErrorKind> {
    let sink = ErrorSink::new();
    let parsed = Module::parse(bytes, features, &sink);
    validate(&parsed, features, &sink);
    sink.into_vec().iter().map(|d| d.error.kind).collect()
}

#[test]
fn const_add_function_validates() {
    // (func (result i32) i32.const 1 i32.const 2 i32.add)
    let bytes = module(&[
        (1, type_section(&[(&[], &[0x7f])])),
        (3, function_section(&[0])),
        (
            10,
            code_section(&[body(&[0x41, 0x01, 0x41, 0x02, 0x6a, 0x0b])]),
        ),
    ]);
    assert_eq!(check(&bytes, Features::none()), vec![]);
}

#[test]
fn wrong_result_type_is_reported() {
    // (func (result i32) i64.const 1)
    let bytes = module(&[
        (1, type_section(&[(&[], &[0x7f])])),
        (3, function_section(&[0])),
        (10, code_section(&[body(&[0x42, 0x01, 0x0b])])),
    ]);
    assert_eq!(check(&bytes, Features::none()), vec![ErrorKind::TypeMismatch]);
}

#[test]
fn validation_attempts_every_function() {
    // Two broken functions produce two diagnostics, not one.
    let bytes = module(&[
        (1, type_section(&[(&[], &[0x7f])])),
        (3, function_section(&[0, 0])),
        (
            10,
            code_section(&[body(&[0x42, 0x01, 0x0b]), body(&[0x0b])]),
        ),
    ]);
    assert_eq!(
        check(&bytes, Features::none()),
        vec![ErrorKind::TypeMismatch, ErrorKind::StackUnderflow]
    );
}

#[test]
fn disabled_feature_parses_but_fails_validation() {
    // (func i32.const 0 i32.extend8_s drop) without sign-extension
    let expr = [0x41, 0x00, 0xc0, 0x1a, 0x0b];
    let bytes = module(&[
        (1, type_section(&[(&[], &[])])),
        (3, function_section(&[0])),
        (10, code_section(&[body(&expr)])),
    ]);

    let sink = ErrorSink::new();
    let parsed = Module::parse(&bytes, Features::none(), &sink);
    assert!(sink.is_empty(), "decoding must not gate features");
    validate(&parsed, Features::none(), &sink);
    let kinds: Vec<ErrorKind> = sink.into_vec().iter().map(|d| d.error.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::FeatureDisabled]);

    assert_eq!(check(&bytes, Features::SIGN_EXTENSION), vec![]);
}

#[test]
fn simd_function_validates_with_feature() {
    // (func (result v128) v128.const 0 ... 0)
    let mut expr = vec![0xfd, 0x0c];
    expr.extend_from_slice(&[0u8; 16]);
    expr.push(0x0b);
    let bytes = module(&[
        (1, type_section(&[(&[], &[0x7b])])),
        (3, function_section(&[0])),
        (10, code_section(&[body(&expr)])),
    ]);
    assert_eq!(check(&bytes, Features::SIMD), vec![]);
    assert!(check(&bytes, Features::none()).contains(&ErrorKind::FeatureDisabled));
}

#[test]
fn start_function_must_be_nullary() {
    let bytes = module(&[
        (1, type_section(&[(&[0x7f], &[])])),
        (3, function_section(&[0])),
        (8, vec![0x00]), // start func 0
        (10, code_section(&[body(&[0x1a, 0x0b])])),
    ]);
    let kinds = check(&bytes, Features::none());
    assert!(kinds.contains(&ErrorKind::TypeMismatch), "{kinds:?}");
}

#[test]
fn export_names_must_be_unique() {
    let mut exports = Vec::new();
    leb(&mut exports, 2);
    for _ in 0..2 {
        exports.push(1);
        exports.push(b'f');
        exports.push(0x00); // func kind
        exports.push(0x00); // index 0
    }
    let bytes = module(&[
        (1, type_section(&[(&[], &[])])),
        (3, function_section(&[0])),
        (7, exports),
        (10, code_section(&[body(&[0x0b])])),
    ]);
    assert_eq!(check(&bytes, Features::none()), vec![ErrorKind::DuplicateName]);
}

#[test]
fn active_data_offset_must_be_i32() {
    // data offset uses i64.const against a 32-bit memory
    let bytes = module(&[
        (5, vec![0x01, 0x00, 0x01]),
        (11, vec![0x01, 0x00, 0x42, 0x00, 0x0b, 0x00]),
    ]);
    assert_eq!(check(&bytes, Features::none()), vec![ErrorKind::TypeMismatch]);
}

#[test]
fn data_count_mismatch_is_reported() {
    let bytes = module(&[
        (11, vec![0x01, 0x00, 0x41, 0x00, 0x0b, 0x00]),
        (12, vec![0x03]),
    ]);
    let kinds = check(&bytes, Features::BULK_MEMORY);
    assert_eq!(kinds, vec![ErrorKind::LengthMismatch]);
}

#[test]
fn memory_init_requires_data_count() {
    // memory.init without a DataCount section
    let expr = [
        0x41, 0x00, 0x41, 0x00, 0x41, 0x00, // three zero operands
        0xfc, 0x08, 0x00, 0x00, // memory.init 0 0
        0x0b,
    ];
    let bytes = module(&[
        (1, type_section(&[(&[], &[])])),
        (3, function_section(&[0])),
        (5, vec![0x01, 0x00, 0x01]),
        (10, code_section(&[body(&expr)])),
    ]);
    let kinds = check(&bytes, Features::BULK_MEMORY);
    assert!(kinds.contains(&ErrorKind::LengthMismatch), "{kinds:?}");
}

#[test]
fn global_init_referencing_local_global_is_invalid() {
    // (global i32 (global.get 0)) -- global 0 is itself, not imported
    let mut payload = Vec::new();
    leb(&mut payload, 1);
    payload.extend_from_slice(&[0x7f, 0x00, 0x23, 0x00, 0x0b]);
    let bytes = module(&[(6, payload)]);
    assert_eq!(
        check(&bytes, Features::none()),
        vec![ErrorKind::InvalidConstExpr]
    );
}

#[test]
fn mutable_global_import_needs_feature() {
    // (import "env" "g" (global (mut i32)))
    let mut payload = Vec::new();
    leb(&mut payload, 1);
    payload.extend_from_slice(&[0x03]);
    payload.extend_from_slice(b"env");
    payload.extend_from_slice(&[0x01]);
    payload.extend_from_slice(b"g");
    payload.extend_from_slice(&[0x03, 0x7f, 0x01]); // global, i32, mutable
    let bytes = module(&[(2, payload)]);
    assert_eq!(
        check(&bytes, Features::none()),
        vec![ErrorKind::FeatureDisabled]
    );
    assert_eq!(check(&bytes, Features::MUTABLE_GLOBALS), vec![]);
}

#[test]
fn call_and_call_indirect() {
    // (table 1 funcref) (func $f) (func call 0; i32.const 0; call_indirect (type 0))
    let bytes = module(&[
        (1, type_section(&[(&[], &[])])),
        (3, function_section(&[0, 0])),
        (4, vec![0x01, 0x70, 0x00, 0x01]), // one funcref table, min 1
        (
            10,
            code_section(&[
                body(&[0x0b]),
                body(&[0x10, 0x00, 0x41, 0x00, 0x11, 0x00, 0x00, 0x0b]),
            ]),
        ),
    ]);
    assert_eq!(check(&bytes, Features::none()), vec![]);
}

#[test]
fn function_and_code_counts_must_agree() {
    let bytes = module(&[
        (1, type_section(&[(&[], &[])])),
        (3, function_section(&[0, 0])),
        (10, code_section(&[body(&[0x0b])])),
    ]);
    let kinds = check(&bytes, Features::none());
    assert!(kinds.contains(&ErrorKind::LengthMismatch), "{kinds:?}");
}
