//! Text format support: the tokenizer and literal conversion.
//!
//! [`lexer::Lexer`] turns source bytes into a stream of [`token::Token`]s
//! covering the input exactly; whitespace and comments are tokens too, so
//! re-emitting every span reproduces the source byte-for-byte. A parser
//! above the lexer consumes this stream; the keyword table recognizes the
//! same opcode set, with the same feature gating, as the binary decoder.
//!
//! # Example
//!
//! ```
//! use wascope::wat::lexer::Lexer;
//! use wascope::wat::token::TokenKind;
//!
//! let mut lexer = Lexer::new(b"(module)");
//! assert_eq!(lexer.lex().kind, TokenKind::Lpar);
//! assert!(matches!(lexer.lex().kind, TokenKind::Keyword(_)));
//! assert_eq!(lexer.lex().kind, TokenKind::Rpar);
//! assert_eq!(lexer.lex().kind, TokenKind::Eof);
//! ```

pub mod keywords;
pub mod lexer;
pub mod literals;
pub mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};
