//! End-to-end text format lexing scenarios.

use wascope::features::Features;
use wascope::parser::opcodes::Opcode;
use wascope::wat::lexer::Lexer;
use wascope::wat::literals;
use wascope::wat::token::{
    Base, HasUnderscores, Keyword, LiteralKind, Sign, Token, TokenKind, Word,
};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::tokenize(source.as_bytes())
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn module_func_token_stream() {
    // Lex of `(module (func))`.
    assert_eq!(
        kinds("(module (func))"),
        vec![
            TokenKind::Lpar,
            TokenKind::Keyword(Keyword::Word(Word::Module)),
            TokenKind::Whitespace,
            TokenKind::Lpar,
            TokenKind::Keyword(Keyword::Word(Word::Func)),
            TokenKind::Rpar,
            TokenKind::Rpar,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn signed_hex_float_token() {
    // Lex of `+0x1.8p+1`: one Float token, sign `+`, no underscores,
    // classified as a hex float.
    let tokens = Lexer::tokenize(b"+0x1.8p+1");
    assert_eq!(tokens.len(), 2);
    match tokens[0].kind {
        TokenKind::Float(info) => {
            assert_eq!(info.sign, Sign::Plus);
            assert_eq!(info.underscores, HasUnderscores::No);
            assert_eq!(info.base, Base::Hex);
            assert_eq!(info.kind, LiteralKind::Number);
        }
        other => panic!("expected Float, got {other:?}"),
    }
    // And it converts to the value it denotes.
    assert_eq!(literals::parse_f64("+0x1.8p+1"), Some(3.0));
}

#[test]
fn every_mnemonic_lexes_as_its_opcode() {
    // The lexer and the binary decoder recognize the same opcode set.
    for info in wascope::parser::opcodes::OPCODES {
        let tokens = Lexer::tokenize(info.mnemonic.as_bytes());
        assert_eq!(tokens.len(), 2, "{}", info.mnemonic);
        match tokens[0].kind {
            TokenKind::Keyword(Keyword::Instr { opcode, features }) => {
                // `select` maps to the untyped opcode; every other mnemonic
                // maps to itself.
                if info.opcode != Opcode::SelectT {
                    assert_eq!(opcode, info.opcode, "{}", info.mnemonic);
                    assert_eq!(features, info.features, "{}", info.mnemonic);
                }
            }
            other => panic!("{} lexed as {:?}", info.mnemonic, other),
        }
    }
}

#[test]
fn feature_masks_on_keywords() {
    let tokens = Lexer::tokenize(b"memory.atomic.notify");
    match tokens[0].kind {
        TokenKind::Keyword(Keyword::Instr { features, .. }) => {
            assert_eq!(features, Features::THREADS);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn token_spans_reproduce_the_source() {
    let source = r#"
        (module ;; a module
          (; with a (; nested ;) comment ;)
          (func $f (param i32) (result f64)
            local.get 0
            f64.convert_i32_s)
          (data (i32.const 0) "\00\01 text")
          (global $g (mut i32) (i32.const -0x1_0))
          +0x1.8p+1 inf -nan:0x7ff
          (@annot ation))
    "#;
    let tokens: Vec<Token> = Lexer::tokenize(source.as_bytes());
    let mut rebuilt = Vec::new();
    let mut pos = 0;
    for token in &tokens {
        assert_eq!(token.location.start, pos, "gap before {token}");
        pos = token.location.end;
        rebuilt.extend_from_slice(token.text(source.as_bytes()));
    }
    assert_eq!(pos, source.len());
    assert_eq!(rebuilt, source.as_bytes());
}

#[test]
fn block_comment_at_eof_locates_the_opening() {
    let tokens = Lexer::tokenize(b"ok (; gone");
    let last = tokens[tokens.len() - 2];
    assert_eq!(last.kind, TokenKind::InvalidBlockComment);
    assert_eq!(last.location.start, 3);
    assert_eq!(last.location.end, 10);
}

#[test]
fn literal_conversions_agree_with_classification() {
    for (text, expected) in [
        ("0", 0u64),
        ("4_2", 42),
        ("0xff", 255),
        ("0xFFFF_FFFF", 0xFFFF_FFFF),
    ] {
        match Lexer::tokenize(text.as_bytes())[0].kind {
            TokenKind::Nat(_) => {}
            other => panic!("{text} lexed as {other:?}"),
        }
        assert_eq!(literals::parse_nat(text), Some(expected), "{text}");
    }

    assert_eq!(literals::parse_int("-42"), Some(-42));
    assert_eq!(literals::parse_f32("1.5"), Some(1.5));
    assert!(literals::parse_f64("nan:0x1").unwrap().is_nan());
}

#[test]
fn reserved_runs_do_not_split() {
    // An almost-number swallows its whole run as one Reserved token.
    let tokens = Lexer::tokenize(b"0x1p+ (");
    assert_eq!(tokens[0].kind, TokenKind::Reserved);
    assert_eq!(tokens[0].location.end, 5);
    assert_eq!(tokens[2].kind, TokenKind::Lpar);
}

#[test]
fn strings_and_ids_between_parens() {
    let tokens: Vec<TokenKind> = kinds(r#"($x"bytes\20")"#);
    assert_eq!(
        tokens,
        vec![
            TokenKind::Lpar,
            TokenKind::Id,
            TokenKind::Text { byte_size: 6 },
            TokenKind::Rpar,
            TokenKind::Eof,
        ]
    );
}
