#![no_main]

use emberwire_core::ResolvedType;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The type grammar is parsed from server-controlled header strings, so
    // arbitrary input must never panic or recurse unboundedly.
    if let Ok(declared) = std::str::from_utf8(data) {
        if let Ok(ty) = ResolvedType::parse(declared) {
            // A successful parse must display and re-parse to the same type.
            let name = ty.display_name();
            let reparsed = ResolvedType::parse(&name).expect("display name must re-parse");
            assert_eq!(ty, reparsed);
        }
    }
});
