#![no_main]

use libfuzzer_sys::fuzz_target;
use swtiles_core::{decode_header, encode_header, HEADER_SIZE};

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to the header decoder. It must reject anything
    // malformed (bad magic, wrong version, nonzero reserved bytes, unknown
    // enum codes) without panicking, and anything it accepts must
    // re-encode to the exact input buffer.
    let mut buf = [0u8; HEADER_SIZE];
    let n = data.len().min(HEADER_SIZE);
    buf[..n].copy_from_slice(&data[..n]);

    if let Ok(header) = decode_header(&buf) {
        assert_eq!(encode_header(&header), buf);
    }
});
