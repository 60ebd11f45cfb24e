//! Fuzz target for signal decoding.
//!
//! Feeds raw bytes to both CBOR codecs. Malformed input — truncated buffers,
//! type confusion between the client and server enums, oversized strings —
//! must return an error, never panic.

#![no_main]

use convene_proto::{ClientSignal, ServerSignal};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = ClientSignal::decode(data);
    let _ = ServerSignal::decode(data);

    // Anything that does decode must re-encode and decode to itself.
    if let Ok(signal) = ClientSignal::decode(data) {
        let bytes = signal.encode().expect("re-encode of decoded signal");
        assert_eq!(ClientSignal::decode(&bytes).expect("decode of re-encode"), signal);
    }
    if let Ok(signal) = ServerSignal::decode(data) {
        let bytes = signal.encode().expect("re-encode of decoded signal");
        assert_eq!(ServerSignal::decode(&bytes).expect("decode of re-encode"), signal);
    }
});
