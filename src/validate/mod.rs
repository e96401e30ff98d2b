//! Structural validation.
//!
//! The validator walks a decoded [`Module`] and checks the WebAssembly
//! validation rules: cross-section consistency (index spaces, signatures,
//! limits, section order) and a stack-polymorphic type check of every
//! function body. It is agnostic to whether the module came from the binary
//! or the text path.
//!
//! Validation never aborts the module: every section and every function is
//! attempted, so callers see as many diagnostics as one pass can produce.
//! Instructions gated on a disabled feature parse fine and fail here with
//! `FeatureDisabled`, which lets tooling inspect feature use.

pub mod code;
pub mod module;

pub use module::ModuleContext;

use crate::error::ErrorSink;
use crate::features::Features;
use crate::parser::module::Module;

/// Validate a whole module, reporting every finding to `sink`.
pub fn validate(module: &Module, features: Features, sink: &ErrorSink) {
    let ctx = ModuleContext::build(module, features);
    module::validate_module(&ctx, module, sink);
    for (index, code) in module.code.iter().enumerate() {
        log::trace!("validating function body {index}");
        code::validate_function(&ctx, code, index, sink);
    }
}
