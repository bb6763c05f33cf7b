#![no_main]

use libfuzzer_sys::fuzz_target;
use swtiles_core::{decode_index_cell, encode_index_cell, INDEX_CELL_SIZE};

fuzz_target!(|data: &[u8]| {
    // Every 8-byte buffer is a valid index cell; decode then encode must
    // be the identity, and the decoded values must sit inside the 40-bit
    // and 24-bit limits so encoding cannot fail.
    if data.len() < INDEX_CELL_SIZE {
        return;
    }
    let mut buf = [0u8; INDEX_CELL_SIZE];
    buf.copy_from_slice(&data[..INDEX_CELL_SIZE]);

    let (offset, length) = decode_index_cell(&buf);
    let reencoded = encode_index_cell(offset, length).expect("decoded cell must re-encode");
    assert_eq!(reencoded, buf);
});
