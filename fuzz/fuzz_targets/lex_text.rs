#![no_main]

use libfuzzer_sys::fuzz_target;

use wascope::wat::lexer::Lexer;
use wascope::wat::token::TokenKind;

fuzz_target!(|data: &[u8]| {
    let tokens = Lexer::tokenize(data);

    // Token spans must partition the input exactly.
    let mut pos = 0;
    for token in &tokens {
        assert_eq!(token.location.start, pos);
        assert!(token.location.end >= token.location.start);
        pos = token.location.end;
    }
    assert_eq!(pos, data.len());
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
});
