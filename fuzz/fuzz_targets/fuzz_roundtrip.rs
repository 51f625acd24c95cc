#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlette::parser::parse_str;
use xmlette::serial::serialize;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Anything that parses must serialize to text that parses to the
        // same rendering.
        if let Ok(doc) = parse_str(s) {
            let output = serialize(&doc);
            let Ok(again) = parse_str(&output) else {
                panic!("serialized output failed to parse: {output:?}");
            };
            assert_eq!(serialize(&again), output);
        }
    }
});
