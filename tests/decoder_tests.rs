//! End-to-end binary decoding scenarios.

mod common;

use common::{body, code_section, function_section, leb, module, type_section};
use wascope::error::{ErrorKind, ErrorSink};
use wascope::features::Features;
use wascope::location::Location;
use wascope::parser::cursor::Cursor;
use wascope::parser::encoding::SectionId;
use wascope::parser::module::Module;
use wascope::parser::read::read_header;
use wascope::parser::section::SectionIter;
use wascope::parser::ReadContext;

fn parse(bytes: &[u8]) -> (Module<'_>, Vec<wascope::error::Diagnostic>) {
    let sink = ErrorSink::new();
    let module = Module::parse(bytes, Features::all(), &sink);
    let diagnostics = sink.into_vec();
    (module, diagnostics)
}

#[test]
fn empty_module_no_sections_no_errors() {
    let (module, diagnostics) = parse(&[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
    assert!(diagnostics.is_empty());
    assert!(module.sections.is_empty());
}

#[test]
fn bad_version_one_error_at_offset_4() {
    let (module, diagnostics) = parse(&[0x00, 0x61, 0x73, 0x6d, 0x02, 0x00, 0x00, 0x00]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error.kind, ErrorKind::BadVersion);
    assert_eq!(diagnostics[0].error.location.start, 4);
    assert!(module.sections.is_empty());
}

#[test]
fn single_empty_signature_type_section() {
    let (module, diagnostics) = parse(&[
        0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01, 0x04, 0x01, 0x60, 0x00, 0x00,
    ]);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(module.types.len(), 1);
    assert!(module.types[0].params.is_empty());
    assert!(module.types[0].results.is_empty());
}

#[test]
fn truncated_input_reports_in_bounds_offsets() {
    for len in 0..8 {
        let bytes = &[0x00u8, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00][..len];
        let (_, diagnostics) = parse(bytes);
        for diagnostic in &diagnostics {
            assert!(diagnostic.error.location.start <= len);
            assert!(diagnostic.error.location.end <= len);
        }
    }
}

#[test]
fn section_length_exceeding_input_is_length_mismatch() {
    let mut bytes = module(&[]);
    bytes.extend_from_slice(&[0x01, 0x20, 0x00]); // claims 32 bytes, has 1
    let (_, diagnostics) = parse(&bytes);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error.kind, ErrorKind::LengthMismatch);
    assert_eq!(diagnostics[0].error.location, Location::at(8));
}

#[test]
fn lazy_section_iteration_does_not_touch_payloads() {
    // A type section whose payload is garbage: the lazy walk is clean.
    let bytes = module(&[(1, vec![0xff, 0x00, 0x61]), (11, vec![0x00])]);
    let sink = ErrorSink::new();
    let mut cursor = Cursor::new(&bytes);
    assert!(read_header(&mut cursor, &sink));
    let ctx = ReadContext::new(Features::all(), &sink);
    let ids: Vec<SectionId> = SectionIter::new(cursor, ctx).map(|s| s.id()).collect();
    assert_eq!(ids, vec![SectionId::Type, SectionId::Data]);
    assert!(sink.is_empty());
}

#[test]
fn entity_error_stops_its_section_but_not_the_module() {
    // Import section with a broken entry, then a fine data section.
    let import_payload = vec![0x01, 0x02, 0xff, 0xfe, 0x01, b'f', 0x00, 0x00];
    let bytes = module(&[(2, import_payload), (11, vec![0x00])]);
    let (module, diagnostics) = parse(&bytes);
    assert!(module.imports.is_empty());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error.kind, ErrorKind::InvalidUtf8);
    // The data section after the failure was still read.
    assert_eq!(module.sections.len(), 2);
    assert_eq!(module.sections[1].id, SectionId::Data);
}

#[test]
fn custom_sections_surface_name_and_payload() {
    let mut payload = Vec::new();
    leb(&mut payload, 4);
    payload.extend_from_slice(b"name");
    payload.extend_from_slice(&[0xde, 0xad]);
    let bytes = module(&[(0, payload)]);
    let (module, diagnostics) = parse(&bytes);
    assert!(diagnostics.is_empty());
    assert_eq!(module.customs.len(), 1);
    assert_eq!(module.customs[0].name, "name");
    assert_eq!(module.customs[0].payload, &[0xde, 0xad]);
}

#[test]
fn whole_module_with_functions_round_trips_structure() {
    let bytes = module(&[
        (1, type_section(&[(&[0x7f, 0x7f], &[0x7f])])),
        (3, function_section(&[0])),
        (
            10,
            code_section(&[body(&[0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b])]),
        ),
    ]);
    let (module, diagnostics) = parse(&bytes);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(module.types.len(), 1);
    assert_eq!(module.types[0].params.len(), 2);
    assert_eq!(module.functions.len(), 1);
    assert_eq!(module.code.len(), 1);
    assert_eq!(module.code[0].expr, &[0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b]);
    // Locations line up with the input.
    let code = &module.code[0];
    assert_eq!(
        &bytes[code.expr_offset..code.expr_offset + code.expr.len()],
        code.expr
    );
}

#[test]
fn section_sizes_partition_the_module() {
    // Preamble + headers + payload lengths == module length. All section
    // headers here use single-byte ids and lengths.
    let bytes = module(&[
        (1, type_section(&[(&[], &[])])),
        (3, function_section(&[0])),
        (10, code_section(&[body(&[0x0b])])),
    ]);
    let (module, diagnostics) = parse(&bytes);
    assert!(diagnostics.is_empty());
    let covered: usize = module.sections.iter().map(|s| 2 + s.location.len()).sum();
    assert_eq!(8 + covered, bytes.len());
}

#[test]
fn global_section_with_const_exprs() {
    // (global i32 (i32.const 7)) (global (mut f64) (f64.const 0))
    let mut payload = Vec::new();
    leb(&mut payload, 2);
    payload.extend_from_slice(&[0x7f, 0x00, 0x41, 0x07, 0x0b]);
    payload.extend_from_slice(&[0x7c, 0x01, 0x44, 0, 0, 0, 0, 0, 0, 0, 0, 0x0b]);
    let bytes = module(&[(6, payload)]);
    let (module, diagnostics) = parse(&bytes);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(module.globals.len(), 2);
    assert_eq!(
        module.globals[0].init.producer.opcode,
        wascope::parser::opcodes::Opcode::I32Const
    );
}

#[test]
fn const_expr_with_two_producers_is_invalid() {
    // (global i32 (i32.const 1) (i32.const 2)) -- producer, producer, end
    let mut payload = Vec::new();
    leb(&mut payload, 1);
    payload.extend_from_slice(&[0x7f, 0x00, 0x41, 0x01, 0x41, 0x02, 0x0b]);
    let bytes = module(&[(6, payload)]);
    let (_, diagnostics) = parse(&bytes);
    assert_eq!(diagnostics[0].error.kind, ErrorKind::InvalidConstExpr);
}

#[test]
fn memory_and_data_sections() {
    let bytes = module(&[
        (5, vec![0x01, 0x00, 0x01]), // one memory, min 1
        (
            11,
            vec![0x01, 0x00, 0x41, 0x08, 0x0b, 0x02, b'h', b'i'],
        ),
    ]);
    let (module, diagnostics) = parse(&bytes);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(module.memories.len(), 1);
    assert_eq!(module.memories[0].memory_type.limits.min, 1);
    assert_eq!(module.data.len(), 1);
    assert_eq!(module.data[0].init, b"hi");
}

#[test]
fn data_count_section() {
    let bytes = module(&[(12, vec![0x02])]);
    let (module, _) = parse(&bytes);
    assert_eq!(module.data_count.map(|dc| dc.count), Some(2));
}

#[test]
fn unknown_section_id_is_reported_and_skipped() {
    let bytes = module(&[(60, vec![0xaa]), (12, vec![0x00])]);
    let (module, diagnostics) = parse(&bytes);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error.kind, ErrorKind::UnknownSection);
    assert!(module.data_count.is_some());
}

#[test]
fn diagnostics_carry_context_labels() {
    // Broken import: the context names the section and the field.
    let import_payload = vec![0x01, 0x02, 0xff, 0xfe, 0x01, b'f', 0x00, 0x00];
    let bytes = module(&[(2, import_payload)]);
    let (_, diagnostics) = parse(&bytes);
    let context = &diagnostics[0].context;
    assert!(context.contains(&"import".to_string()), "{context:?}");
    assert!(context.contains(&"module name".to_string()), "{context:?}");
}

#[test]
fn decode_then_encode_reproduces_canonical_modules() {
    // Every encoding in this module is canonical: minimal LEBs, canonical
    // section order, shortest segment flags.
    let bytes = module(&[
        (1, type_section(&[(&[0x7f, 0x7f], &[0x7f]), (&[], &[])])),
        (3, function_section(&[0, 1])),
        (4, vec![0x01, 0x70, 0x00, 0x02]),
        (5, vec![0x01, 0x01, 0x01, 0x10]),
        (7, vec![0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00]),
        (9, vec![0x01, 0x00, 0x41, 0x00, 0x0b, 0x01, 0x01]),
        (
            10,
            code_section(&[
                body(&[0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b]),
                body(&[0x0b]),
            ]),
        ),
        (11, vec![0x01, 0x00, 0x41, 0x08, 0x0b, 0x02, b'h', b'i']),
    ]);
    let (parsed, diagnostics) = parse(&bytes);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(wascope::encoder::encode_module(&parsed), bytes);
}

#[test]
fn random_leb_values_round_trip() {
    use rand::Rng;
    let mut rng = rand::rng();
    for _ in 0..1000 {
        let value: u64 = rng.random();
        let mut bytes = Vec::new();
        leb(&mut bytes, value);
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_var_u64().unwrap(), value);
        assert_eq!(cursor.remaining(), 0);
    }
}

#[test]
fn repeated_parses_are_deterministic() {
    let bytes = module(&[
        (1, type_section(&[(&[0x7f], &[0x7f])])),
        (3, function_section(&[0])),
        (10, code_section(&[body(&[0x20, 0x00, 0x0b])])),
    ]);
    let (_, first) = parse(&bytes);
    let (_, second) = parse(&bytes);
    assert_eq!(first, second);
}
