#![no_main]

use libfuzzer_sys::fuzz_target;
use starreg_ledger::{decode_chain, encode_chain};

fuzz_target!(|data: &[u8]| {
    if let Some(chain) = decode_chain(data) {
        let again =
            decode_chain(&encode_chain(&chain.hashes)).expect("re-encoded index must decode");
        assert_eq!(again.hashes, chain.hashes);
        assert!(!again.degraded);
    }
});
