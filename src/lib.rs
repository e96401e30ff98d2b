//! A WebAssembly inspection toolkit written in Rust.
//!
//! wascope reads, checks, and reports on WebAssembly modules in both their
//! binary wire form and their textual S-expression form:
//!
//! - [`parser`] -- Binary format decoder. Lazy and zero-copy: sections and
//!   entities borrow from the input buffer, and nothing is parsed until
//!   asked for. [`parser::module::Module::parse`] materializes a whole
//!   module for callers that want one.
//! - [`wat`] -- Text format lexer. Tokenizes source with full literal and
//!   keyword coverage; token spans partition the input exactly.
//! - [`validate`] -- Structural validator. Index spaces, limits, section
//!   ordering, and a stack-polymorphic type check of every function body.
//! - [`encoder`] -- Binary encoder. Serializes a decoded module back to
//!   canonical `.wasm` bytes.
//!
//! All diagnostics go to an [`error::ErrorSink`] owned by the caller; the
//! library reports every problem it can find in one pass instead of
//! stopping at the first. Optional proposals are switched on through
//! [`features::Features`]; disabled-feature use is a validation error, never
//! a parse error.
//!
//! # Example
//!
//! Parse and validate a module, then inspect the diagnostics:
//!
//! ```
//! use wascope::error::ErrorSink;
//! use wascope::features::Features;
//! use wascope::parser::module::Module;
//!
//! let bytes = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
//! let features = Features::none();
//! let sink = ErrorSink::new();
//!
//! let module = Module::parse(&bytes, features, &sink);
//! wascope::validate::validate(&module, features, &sink);
//!
//! assert!(sink.is_empty());
//! assert!(module.sections.is_empty());
//! ```
//!
//! # Concurrency
//!
//! Everything here is single-threaded and synchronous: no call suspends,
//! blocks, or retains a reference to the input past its return. Repeat runs
//! over the same input and feature set produce identical entities, tokens,
//! and diagnostics in identical order.

pub mod encoder;
pub mod error;
pub mod features;
pub mod limits;
pub mod location;
pub mod parser;
pub mod validate;
pub mod wat;

pub use error::{Diagnostic, Error, ErrorKind, ErrorSink};
pub use features::Features;
pub use location::Location;
