#![no_main]

use libfuzzer_sys::fuzz_target;
use starreg_ledger::{decode_block, encode_block};

// Decoding arbitrary bytes must never panic; anything that decodes must
// survive a second encode/decode unchanged.
fuzz_target!(|data: &[u8]| {
    if let Ok(block) = decode_block(data) {
        let reencoded = encode_block(&block);
        let again = decode_block(&reencoded).expect("re-encoded block must decode");
        assert_eq!(again, block);
    }
});
