#![no_main]

use emberwire_client::RowStreamDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes as a decompressed result stream.
    // The decoder should handle all malformed inputs gracefully:
    // - Varint overflows in the header or length prefixes
    // - Absurd column counts
    // - Non-UTF-8 names and strings
    // - Unknown or malformed declared types
    // - Cells cut off mid-value
    let mut decoder = RowStreamDecoder::new();

    let mid = data.len() / 2;
    decoder.feed(&data[..mid]);
    while let Ok(Some(_)) = decoder.try_next_row() {}
    decoder.feed(&data[mid..]);
    while let Ok(Some(_)) = decoder.try_next_row() {}
    let _ = decoder.finish();
});
