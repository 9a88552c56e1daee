#![no_main]

use libfuzzer_sys::fuzz_target;
use starreg_verification::{decode_queue, encode_queue};

// The queue decoder is infallible: arbitrary bytes yield some queue, and
// whatever it yields must be stored back as a clean list.
fuzz_target!(|data: &[u8]| {
    let queue = decode_queue(data);
    let again = decode_queue(&encode_queue(&queue.records));
    assert_eq!(again.records, queue.records);
    assert!(!again.degraded);
});
