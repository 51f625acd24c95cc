#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlette::Document;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must produce a document or an error, never a panic,
    // and a rejected input must still render its report.
    if let Err(err) = Document::parse_bytes(data) {
        let _ = err.report();
    }
});
