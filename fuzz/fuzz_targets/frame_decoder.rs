#![no_main]

use emberwire_codec::FrameDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to the frame decoder.
    // The decoder should handle all malformed inputs gracefully:
    // - Bad checksums
    // - Unknown method bytes
    // - Size fields smaller than the sub-header or past the frame limit
    // - Truncated frames
    // - Garbage LZ4 payloads
    // - Bytes after the terminator frame
    let mut decoder = FrameDecoder::new();

    // Split the input to exercise reassembly across feeds.
    let mid = data.len() / 2;
    decoder.feed(&data[..mid]);
    while let Ok(Some(_)) = decoder.try_next_block() {}
    decoder.feed(&data[mid..]);
    while let Ok(Some(_)) = decoder.try_next_block() {}
    let _ = decoder.finish();
    let _ = decoder.is_finished();
});
