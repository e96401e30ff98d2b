//! Byte-level tokenizer for the text format.
//!
//! One token per [`Lexer::lex`] call; [`Lexer::lex_no_trivia`] skips
//! whitespace and comments. The lexer never fails: malformed input comes
//! back as `Reserved` or one of the `Invalid*` kinds, and end of input is a
//! zero-length `Eof` token. Token spans partition the input exactly.
//!
//! Recognition works on maximal runs of reserved characters: a candidate
//! number, keyword, or identifier is the whole run, so the no-trailing-
//! reserved boundary rule holds by construction and every rewind is bounded
//! by the run length.

use crate::location::Location;
use crate::wat::keywords;
use crate::wat::token::{
    Base, HasUnderscores, LiteralInfo, Sign, Token, TokenKind,
};

/// The reserved character class: printable ASCII minus `"(),;[]{}` and
/// whitespace. This is the boundary test for literals and keywords.
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7e)
        && !matches!(
            byte,
            b'"' | b'(' | b')' | b',' | b';' | b'[' | b']' | b'{' | b'}'
        )
}

fn is_hex_digit(byte: u8) -> bool {
    byte.is_ascii_hexdigit()
}

/// Tokenizer over a byte buffer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Tokenize everything, including the final `Eof` token.
    pub fn tokenize(input: &'a [u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.lex();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek(0)?;
        self.pos += 1;
        Some(byte)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, Location::new(start, self.pos))
    }

    /// Produce the next token. Never fails; returns `Eof` at end of input.
    pub fn lex(&mut self) -> Token {
        let start = self.pos;
        match self.peek(0) {
            None => self.token(TokenKind::Eof, start),
            Some(b'(') => match self.peek(1) {
                Some(b';') => self.lex_block_comment(start),
                Some(b'@') => self.lex_annotation(start),
                _ => {
                    self.pos += 1;
                    self.token(TokenKind::Lpar, start)
                }
            },
            Some(b')') => {
                self.pos += 1;
                self.token(TokenKind::Rpar, start)
            }
            Some(b';') => {
                if self.peek(1) == Some(b';') {
                    self.lex_line_comment(start)
                } else {
                    self.pos += 1;
                    self.token(TokenKind::InvalidChar, start)
                }
            }
            Some(b' ' | b'\t' | b'\r' | b'\n') => {
                while matches!(self.peek(0), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                    self.pos += 1;
                }
                self.token(TokenKind::Whitespace, start)
            }
            Some(b'"') => self.lex_text(start),
            Some(b'$') => {
                let run = self.read_reserved_run();
                let kind = if run.len() > 1 {
                    TokenKind::Id
                } else {
                    // A bare `$` is not an identifier.
                    TokenKind::Reserved
                };
                self.token(kind, start)
            }
            Some(byte) if is_reserved(byte) => {
                let run = self.read_reserved_run();
                self.token(classify_run(run), start)
            }
            Some(_) => {
                self.pos += 1;
                self.token(TokenKind::InvalidChar, start)
            }
        }
    }

    /// Produce the next non-trivia token, dropping whitespace and comments.
    pub fn lex_no_trivia(&mut self) -> Token {
        loop {
            let token = self.lex();
            if !token.kind.is_trivia() {
                return token;
            }
        }
    }

    fn read_reserved_run(&mut self) -> &'a [u8] {
        let start = self.pos;
        while matches!(self.peek(0), Some(byte) if is_reserved(byte)) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn lex_line_comment(&mut self, start: usize) -> Token {
        // Consume ";;".
        self.pos += 2;
        loop {
            match self.bump() {
                None => return self.token(TokenKind::InvalidLineComment, start),
                Some(b'\n') => return self.token(TokenKind::LineComment, start),
                Some(_) => {}
            }
        }
    }

    fn lex_block_comment(&mut self, start: usize) -> Token {
        let mut nesting = 0u32;
        loop {
            match self.bump() {
                None => return self.token(TokenKind::InvalidBlockComment, start),
                Some(b'(') => {
                    if self.peek(0) == Some(b';') {
                        self.pos += 1;
                        nesting += 1;
                    }
                }
                Some(b';') => {
                    if self.peek(0) == Some(b')') {
                        self.pos += 1;
                        nesting -= 1;
                        if nesting == 0 {
                            return self.token(TokenKind::BlockComment, start);
                        }
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn lex_annotation(&mut self, start: usize) -> Token {
        // Consume "(@", then the annotation id.
        self.pos += 2;
        self.read_reserved_run();
        self.token(TokenKind::LparAnnotation, start)
    }

    fn lex_text(&mut self, start: usize) -> Token {
        // Consume the opening quote.
        self.pos += 1;
        let mut has_error = false;
        let mut byte_size: u32 = 0;
        loop {
            match self.bump() {
                None => {
                    has_error = true;
                    break;
                }
                Some(b'"') => break,
                Some(b'\n') => has_error = true,
                Some(b'\\') => match self.bump() {
                    Some(b't' | b'n' | b'r' | b'"' | b'\'' | b'\\') => byte_size += 1,
                    Some(byte) if is_hex_digit(byte) => {
                        if matches!(self.peek(0), Some(b) if is_hex_digit(b)) {
                            self.pos += 1;
                            byte_size += 1;
                        } else {
                            has_error = true;
                        }
                    }
                    _ => has_error = true,
                },
                Some(_) => byte_size += 1,
            }
        }
        if has_error {
            self.token(TokenKind::InvalidText, start)
        } else {
            self.token(TokenKind::Text { byte_size }, start)
        }
    }
}

// ============================================================================
// Reserved-run classification
// ============================================================================

/// Decide what a maximal reserved run is: a numeric literal, a keyword, or
/// plain `Reserved`.
fn classify_run(run: &[u8]) -> TokenKind {
    if let Some(kind) = match_number(run) {
        return kind;
    }
    if run.first().is_some_and(|b| b.is_ascii_lowercase()) {
        // Reserved runs are printable ASCII, so this never fails.
        if let Ok(text) = std::str::from_utf8(run) {
            if let Some(keyword) = keywords::lookup(text) {
                return TokenKind::Keyword(keyword);
            }
        }
    }
    TokenKind::Reserved
}

/// Bounded matcher over a reserved run, rewinding on a failed match.
struct Scan<'s> {
    bytes: &'s [u8],
    pos: usize,
}

impl Scan<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn match_byte(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn match_str(&mut self, s: &str) -> bool {
        let snapshot = self.pos;
        for &byte in s.as_bytes() {
            if !self.match_byte(byte) {
                self.pos = snapshot;
                return false;
            }
        }
        true
    }

    fn match_sign(&mut self) -> Sign {
        if self.match_byte(b'+') {
            Sign::Plus
        } else if self.match_byte(b'-') {
            Sign::Minus
        } else {
            Sign::None
        }
    }

    /// Match one or more digits with `_` separators strictly between digits.
    /// Rewinds and returns false on a malformed group (trailing `_`, no
    /// digits at all).
    fn match_digits(&mut self, hex: bool, underscores: &mut HasUnderscores) -> bool {
        let snapshot = self.pos;
        let is_digit = |b: u8| {
            if hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            }
        };
        let mut ok = false;
        while matches!(self.peek(), Some(b) if is_digit(b)) {
            self.pos += 1;
            if self.match_byte(b'_') {
                *underscores = HasUnderscores::Yes;
                ok = false;
            } else {
                ok = true;
            }
        }
        if !ok {
            self.pos = snapshot;
        }
        ok
    }
}

/// Match an entire run as a numeric literal:
/// `sign? (nat | hex_nat | float | hex_float | "inf" | "nan" |
/// "nan:0x" hex_nat)`. The whole run must participate; otherwise the run is
/// not a number (and becomes a keyword or `Reserved`).
fn match_number(run: &[u8]) -> Option<TokenKind> {
    let mut scan = Scan {
        bytes: run,
        pos: 0,
    };
    let sign = scan.match_sign();

    if scan.match_str("inf") {
        return scan
            .at_end()
            .then(|| TokenKind::Float(LiteralInfo::infinity(sign)));
    }
    if scan.match_str("nan") {
        if scan.match_byte(b':') {
            if !scan.match_str("0x") {
                return None;
            }
            let mut underscores = HasUnderscores::No;
            if !scan.match_digits(true, &mut underscores) {
                return None;
            }
            return scan
                .at_end()
                .then(|| TokenKind::Float(LiteralInfo::nan_payload(sign, underscores)));
        }
        return scan.at_end().then(|| TokenKind::Float(LiteralInfo::nan(sign)));
    }

    let hex = scan.match_str("0x");
    let mut underscores = HasUnderscores::No;
    if !scan.match_digits(hex, &mut underscores) {
        return None;
    }

    let mut float = false;
    if scan.match_byte(b'.') {
        float = true;
        // The fractional digits are optional: `1.` is a float.
        scan.match_digits(hex, &mut underscores);
    }
    let has_exponent = if hex {
        scan.match_byte(b'p') || scan.match_byte(b'P')
    } else {
        scan.match_byte(b'e') || scan.match_byte(b'E')
    };
    if has_exponent {
        float = true;
        scan.match_sign();
        // Exponents are decimal even in hex floats.
        if !scan.match_digits(false, &mut underscores) {
            return None;
        }
    }

    if !scan.at_end() {
        return None;
    }

    let base = if hex { Base::Hex } else { Base::Decimal };
    Some(if float {
        TokenKind::Float(LiteralInfo::number(sign, base, underscores))
    } else if sign == Sign::None {
        TokenKind::Nat(LiteralInfo::nat(base, underscores))
    } else {
        TokenKind::Int(LiteralInfo::number(sign, base, underscores))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Features;
    use crate::parser::encoding::ValueType;
    use crate::parser::opcodes::Opcode;
    use crate::wat::token::{Keyword, LiteralKind, Word};

    /// Tokenize and keep only the non-trivia kinds (plus Eof).
    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source.as_bytes())
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn single(source: &str) -> TokenKind {
        let tokens = Lexer::tokenize(source.as_bytes());
        assert_eq!(tokens.len(), 2, "expected one token + Eof in {source:?}");
        tokens[0].kind
    }

    fn word(w: Word) -> TokenKind {
        TokenKind::Keyword(Keyword::Word(w))
    }

    fn instr(opcode: Opcode, features: Features) -> TokenKind {
        TokenKind::Keyword(Keyword::Instr { opcode, features })
    }

    // -- Structure ----------------------------------------------------------

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn module_func_scenario() {
        assert_eq!(
            kinds("(module (func))"),
            vec![
                TokenKind::Lpar,
                word(Word::Module),
                TokenKind::Whitespace,
                TokenKind::Lpar,
                word(Word::Func),
                TokenKind::Rpar,
                TokenKind::Rpar,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn annotation_open() {
        let tokens = Lexer::tokenize(b"(@custom \"x\")");
        assert_eq!(tokens[0].kind, TokenKind::LparAnnotation);
        assert_eq!(tokens[0].location, Location::new(0, 8));
    }

    #[test]
    fn lone_semicolon_is_invalid_char() {
        assert_eq!(single(";"), TokenKind::InvalidChar);
    }

    #[test]
    fn non_ascii_byte_is_invalid_char() {
        let tokens = Lexer::tokenize("é".as_bytes());
        assert_eq!(tokens[0].kind, TokenKind::InvalidChar);
        assert_eq!(tokens[1].kind, TokenKind::InvalidChar);
    }

    // -- Keywords -----------------------------------------------------------

    #[test]
    fn instruction_keywords_carry_opcode_and_features() {
        assert_eq!(single("i32.add"), instr(Opcode::I32Add, Features::MVP));
        assert_eq!(
            single("i32.trunc_sat_f32_s"),
            instr(Opcode::I32TruncSatF32S, Features::SATURATING_FLOAT_TO_INT)
        );
        assert_eq!(
            single("v128.load8_lane"),
            instr(Opcode::V128Load8Lane, Features::SIMD)
        );
        assert_eq!(
            single("return_call"),
            instr(Opcode::ReturnCall, Features::TAIL_CALL)
        );
        assert_eq!(single("br_on_exn"), instr(Opcode::BrOnExn, Features::EXCEPTIONS));
    }

    #[test]
    fn slash_and_underscore_spellings_agree() {
        assert_eq!(single("f32.convert_s/i32"), single("f32.convert_i32_s"));
        assert_eq!(single("i32.wrap/i64"), single("i32.wrap_i64"));
    }

    #[test]
    fn value_type_keywords() {
        assert_eq!(
            single("i32"),
            TokenKind::Keyword(Keyword::ValueType(ValueType::I32))
        );
        assert_eq!(
            single("v128"),
            TokenKind::Keyword(Keyword::ValueType(ValueType::V128))
        );
    }

    #[test]
    fn unknown_keyword_like_text_is_reserved() {
        assert_eq!(single("i32.bogus"), TokenKind::Reserved);
        assert_eq!(single("module!"), TokenKind::Reserved);
        assert_eq!(single("Module"), TokenKind::Reserved);
    }

    #[test]
    fn keyword_must_match_whole_run() {
        // "func" followed by more reserved characters is one Reserved run.
        assert_eq!(single("funcx"), TokenKind::Reserved);
        // But a paren is a boundary.
        assert_eq!(
            kinds("func("),
            vec![word(Word::Func), TokenKind::Lpar, TokenKind::Eof]
        );
    }

    // -- Identifiers --------------------------------------------------------

    #[test]
    fn identifiers() {
        assert_eq!(single("$foo"), TokenKind::Id);
        assert_eq!(single("$0"), TokenKind::Id);
        assert_eq!(single("$a.b/c!"), TokenKind::Id);
    }

    #[test]
    fn bare_dollar_is_reserved() {
        assert_eq!(single("$"), TokenKind::Reserved);
    }

    // -- Numbers ------------------------------------------------------------

    #[test]
    fn nat_literals() {
        assert_eq!(
            single("0"),
            TokenKind::Nat(LiteralInfo::nat(Base::Decimal, HasUnderscores::No))
        );
        assert_eq!(
            single("1_000_000"),
            TokenKind::Nat(LiteralInfo::nat(Base::Decimal, HasUnderscores::Yes))
        );
        assert_eq!(
            single("0xdeadBEEF"),
            TokenKind::Nat(LiteralInfo::nat(Base::Hex, HasUnderscores::No))
        );
    }

    #[test]
    fn int_literals() {
        assert_eq!(
            single("-1"),
            TokenKind::Int(LiteralInfo::number(
                Sign::Minus,
                Base::Decimal,
                HasUnderscores::No
            ))
        );
        assert_eq!(
            single("+0x1f"),
            TokenKind::Int(LiteralInfo::number(
                Sign::Plus,
                Base::Hex,
                HasUnderscores::No
            ))
        );
    }

    #[test]
    fn float_literals() {
        assert_eq!(
            single("3.14"),
            TokenKind::Float(LiteralInfo::number(
                Sign::None,
                Base::Decimal,
                HasUnderscores::No
            ))
        );
        assert_eq!(
            single("1e10"),
            TokenKind::Float(LiteralInfo::number(
                Sign::None,
                Base::Decimal,
                HasUnderscores::No
            ))
        );
        assert_eq!(
            single("1.5e-3"),
            TokenKind::Float(LiteralInfo::number(
                Sign::None,
                Base::Decimal,
                HasUnderscores::No
            ))
        );
        // A trailing dot is a float.
        assert_eq!(
            single("4."),
            TokenKind::Float(LiteralInfo::number(
                Sign::None,
                Base::Decimal,
                HasUnderscores::No
            ))
        );
    }

    #[test]
    fn signed_hex_float_scenario() {
        // `+0x1.8p+1`: one Float token, sign Plus, no underscores, hex.
        let kind = single("+0x1.8p+1");
        match kind {
            TokenKind::Float(info) => {
                assert_eq!(info.sign, Sign::Plus);
                assert_eq!(info.underscores, HasUnderscores::No);
                assert_eq!(info.base, Base::Hex);
                assert_eq!(info.kind, LiteralKind::Number);
            }
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn special_floats() {
        assert_eq!(single("inf"), TokenKind::Float(LiteralInfo::infinity(Sign::None)));
        assert_eq!(
            single("-inf"),
            TokenKind::Float(LiteralInfo::infinity(Sign::Minus))
        );
        assert_eq!(single("nan"), TokenKind::Float(LiteralInfo::nan(Sign::None)));
        assert_eq!(
            single("nan:0x7f_ffff"),
            TokenKind::Float(LiteralInfo::nan_payload(Sign::None, HasUnderscores::Yes))
        );
        assert_eq!(
            single("-nan:0x4"),
            TokenKind::Float(LiteralInfo::nan_payload(Sign::Minus, HasUnderscores::No))
        );
    }

    #[test]
    fn script_nan_classes_are_keywords_not_floats() {
        use crate::wat::token::ScriptNan;
        assert_eq!(
            single("nan:canonical"),
            TokenKind::Keyword(Keyword::Literal(ScriptNan::Canonical))
        );
        assert_eq!(
            single("nan:arithmetic"),
            TokenKind::Keyword(Keyword::Literal(ScriptNan::Arithmetic))
        );
    }

    #[test]
    fn malformed_numbers_are_reserved() {
        assert_eq!(single("1x"), TokenKind::Reserved);
        assert_eq!(single("1__2"), TokenKind::Reserved);
        assert_eq!(single("1_"), TokenKind::Reserved);
        assert_eq!(single("_1"), TokenKind::Reserved);
        assert_eq!(single("0x"), TokenKind::Reserved);
        assert_eq!(single("0x_10"), TokenKind::Reserved);
        assert_eq!(single("1e"), TokenKind::Reserved);
        assert_eq!(single("1.5e_2"), TokenKind::Reserved);
        assert_eq!(single("nan:0xzz"), TokenKind::Reserved);
        assert_eq!(single("nan:0x"), TokenKind::Reserved);
        assert_eq!(single("infx"), TokenKind::Reserved);
    }

    // -- Strings ------------------------------------------------------------

    #[test]
    fn text_literals_track_byte_size() {
        assert_eq!(single(r#""""#), TokenKind::Text { byte_size: 0 });
        assert_eq!(single(r#""hello""#), TokenKind::Text { byte_size: 5 });
        assert_eq!(single(r#""\t\n\r\"\'\\""#), TokenKind::Text { byte_size: 6 });
        assert_eq!(single(r#""\00\ff""#), TokenKind::Text { byte_size: 2 });
        // Multi-byte UTF-8 counts per byte.
        assert_eq!(single("\"é\""), TokenKind::Text { byte_size: 2 });
    }

    #[test]
    fn invalid_text() {
        // Unterminated.
        assert_eq!(single(r#""abc"#), TokenKind::InvalidText);
        // Embedded newline.
        assert_eq!(single("\"a\nb\""), TokenKind::InvalidText);
        // Bad escape.
        assert_eq!(single(r#""\z""#), TokenKind::InvalidText);
        // Half a hex escape.
        assert_eq!(single(r#""\fg""#), TokenKind::InvalidText);
    }

    // -- Comments -----------------------------------------------------------

    #[test]
    fn line_comments() {
        assert_eq!(
            kinds("a ;; comment\nb"),
            vec![
                TokenKind::Reserved,
                TokenKind::Whitespace,
                TokenKind::LineComment,
                TokenKind::Reserved,
                TokenKind::Eof
            ]
        );
        // EOF before the newline.
        assert_eq!(single(";; no newline"), TokenKind::InvalidLineComment);
    }

    #[test]
    fn block_comments_nest() {
        assert_eq!(single("(; plain ;)"), TokenKind::BlockComment);
        assert_eq!(single("(; outer (; inner ;) outer ;)"), TokenKind::BlockComment);
        assert_eq!(single("(;;)"), TokenKind::BlockComment);
    }

    #[test]
    fn unterminated_block_comment_spans_from_open() {
        let tokens = Lexer::tokenize(b"(; never closed");
        assert_eq!(tokens[0].kind, TokenKind::InvalidBlockComment);
        assert_eq!(tokens[0].location.start, 0);
        assert_eq!(tokens[0].location.end, 15);
    }

    // -- Partition & round-trip ---------------------------------------------

    fn assert_partitions(source: &str) {
        let tokens = Lexer::tokenize(source.as_bytes());
        let mut pos = 0;
        for token in &tokens {
            assert_eq!(token.location.start, pos, "gap or overlap in {source:?}");
            pos = token.location.end;
        }
        assert_eq!(pos, source.len(), "tokens do not cover {source:?}");

        // Re-emitting every token's span reproduces the source.
        let rebuilt: Vec<u8> = tokens
            .iter()
            .flat_map(|t| t.text(source.as_bytes()).iter().copied())
            .collect();
        assert_eq!(rebuilt, source.as_bytes());
    }

    #[test]
    fn spans_partition_the_input() {
        assert_partitions("");
        assert_partitions("(module (func))");
        assert_partitions("x ;; c\n(; b ;) \"s\" $id -0x1p-3 ,,, ]");
        assert_partitions("(module (memory 1) (data (i32.const 8) \"hi\\00\"))");
        assert_partitions("bad\u{fffd}bytes");
    }

    #[test]
    fn lex_no_trivia_skips_whitespace_and_comments() {
        let mut lexer = Lexer::new(b"(; c ;) ( ;; x\n module )");
        assert_eq!(lexer.lex_no_trivia().kind, TokenKind::Lpar);
        assert_eq!(lexer.lex_no_trivia().kind, word(Word::Module));
        assert_eq!(lexer.lex_no_trivia().kind, TokenKind::Rpar);
        assert_eq!(lexer.lex_no_trivia().kind, TokenKind::Eof);
    }

    #[test]
    fn full_function_lexes() {
        let source = r#"
            (module
              (func (export "add") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add))
        "#;
        let tokens: Vec<_> = Lexer::tokenize(source.as_bytes())
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect();
        assert!(tokens.contains(&word(Word::Module)));
        assert!(tokens.contains(&word(Word::Export)));
        assert!(tokens.contains(&instr(Opcode::LocalGet, Features::MVP)));
        assert!(tokens.contains(&instr(Opcode::I32Add, Features::MVP)));
        assert!(tokens.contains(&TokenKind::Text { byte_size: 3 }));
    }
}
