#![no_main]

use libfuzzer_sys::fuzz_target;

use wascope::error::ErrorSink;
use wascope::features::Features;
use wascope::parser::module::Module;

fuzz_target!(|data: &[u8]| {
    let sink = ErrorSink::new();
    // We don't care about the result - we're looking for panics/crashes,
    // out-of-bounds diagnostics, and non-termination.
    let module = Module::parse(data, Features::all(), &sink);
    wascope::validate::validate(&module, Features::all(), &sink);
    for diagnostic in sink.to_vec() {
        assert!(diagnostic.error.location.start <= data.len());
        assert!(diagnostic.error.location.end <= data.len());
    }
});
