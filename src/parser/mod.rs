//! Binary format decoder.
//!
//! Two ways in:
//!
//! - **Lazy**: [`section::SectionIter`] walks section headers without parsing
//!   any payload; [`section::LazyItems`] then yields one entity at a time
//!   from a section payload. Nothing is materialized until asked for.
//! - **Materialized**: [`module::Module::parse`] reads everything into a
//!   [`module::Module`] for callers (like the validator) that want the whole
//!   picture.
//!
//! Both paths share the same entity readers and report every problem to the
//! caller's [`ErrorSink`] instead of stopping at the first one.

pub mod cursor;
pub mod encoding;
pub mod instruction;
pub mod module;
pub mod opcodes;
pub mod read;
pub mod section;

use crate::error::ErrorSink;
use crate::features::Features;

/// Everything the entity readers need besides the bytes: the active feature
/// set and the diagnostics sink.
#[derive(Clone, Copy)]
pub struct ReadContext<'e> {
    pub features: Features,
    pub sink: &'e ErrorSink,
}

impl<'e> ReadContext<'e> {
    pub fn new(features: Features, sink: &'e ErrorSink) -> Self {
        Self { features, sink }
    }
}
