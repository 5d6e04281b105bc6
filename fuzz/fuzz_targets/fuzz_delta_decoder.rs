//! Fuzz testing for the delta decoder.
//!
//! Arbitrary bytes are decoded as a delta and, when that succeeds, applied
//! to a small fixed record. Neither step may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use docbin::delta::delta_field_names;
use docbin::{apply_delta, deserialize_delta, serialize_delta, CodecContext, Record, Value};

fuzz_target!(|data: &[u8]| {
    let ctx = CodecContext::default();
    let _ = delta_field_names(data);

    let Ok(delta) = deserialize_delta(data, &ctx) else {
        return;
    };
    let original = Record::with_class("Fuzz")
        .with("name", "n")
        .with("list", Value::EmbeddedList(vec![Value::from(1i32)]))
        .with("nested", Record::new().with("x", true));
    let _ = apply_delta(&original, &delta, &ctx);

    // A decoded delta must serialize back to bytes that decode to itself.
    if let Ok(bytes) = serialize_delta(&delta, &ctx) {
        if let Ok(again) = deserialize_delta(&bytes, &ctx) {
            assert_eq!(again, delta);
        }
    }
});
