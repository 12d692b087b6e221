//! Fuzz target: `decode_frame`
//!
//! Feeds arbitrary datagrams to the telemetry frame parser and asserts
//! that it never panics, never yields more items than the datagram can
//! hold, and that anything it accepts re-encodes to the same prefix.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use resfet::telemetry::frame::{HEADER_LEN, ITEM_LEN, encode_frame};
use resfet::telemetry::decode_frame;

fuzz_target!(|data: &[u8]| {
    let Ok((header, items)) = decode_frame(data) else {
        return;
    };

    let used = HEADER_LEN + items.len() * ITEM_LEN;
    assert!(used <= data.len(), "decoded past the end of the datagram");
    assert_eq!(usize::from(header.length), items.len() * ITEM_LEN);

    // Padding bytes inside each item are not preserved, so compare the
    // decoded values rather than the raw bytes.
    let mut out = vec![0u8; used];
    let written = encode_frame(header, &items, &mut out).expect("sized to fit");
    assert_eq!(written, used);
    let (header2, items2) = decode_frame(&out).expect("re-decode");
    assert_eq!(header, header2);
    assert_eq!(items, items2);
});
