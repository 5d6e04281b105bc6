//! Fuzz testing for the record decoders.
//!
//! Feeds arbitrary bytes to both record formats, to partial fetch and to
//! single-field extraction. Malformed input must surface as an error, never
//! as a panic or an unbounded allocation.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use docbin::{
    BinaryComparator, CodecConfig, CodecContext, NetworkSerializer, RecordSerializer,
    StorageSerializer,
};

#[derive(Debug, Arbitrary)]
struct DecoderInput {
    data: Vec<u8>,
    probe: Vec<u8>,
    field: String,
    max_depth: u8,
}

fuzz_target!(|input: DecoderInput| {
    let config = CodecConfig::default().with_max_nesting_depth(usize::from(input.max_depth));
    let Ok(ctx) = CodecContext::builder().config(config).build() else {
        return;
    };

    let serializers: [&dyn RecordSerializer; 2] = [&StorageSerializer, &NetworkSerializer];
    for serializer in serializers {
        if let Ok(record) = serializer.deserialize(&input.data, &ctx) {
            // Anything that decodes must encode again.
            let _ = serializer.serialize(&record, &ctx);
        }
        let _ = serializer.deserialize_partial(&input.data, &[input.field.as_str()], &ctx);
        let _ = serializer.field_names(&input.data, &ctx);
    }

    let comparator = BinaryComparator::new(&ctx);
    if let (Ok(Some(a)), Ok(Some(b))) = (
        StorageSerializer.field(&input.data, &input.field, &ctx),
        StorageSerializer.field(&input.probe, &input.field, &ctx),
    ) {
        if let Ok(ord) = comparator.compare(&a, &b) {
            if let Ok(reverse) = comparator.compare(&b, &a) {
                assert_eq!(ord, reverse.reverse());
            }
        }
    }
});
