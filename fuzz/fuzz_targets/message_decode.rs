//! Fuzz target for vehicle message decoding
//!
//! Arbitrary bytes are decoded as both directions of the line protocol. The
//! decoders should never panic, and anything the server would send must
//! decode back to itself.

#![no_main]

use fleetline_proto::{InboundMessage, OutboundMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(message) = InboundMessage::decode(line) {
        let _ = message.kind();
    }

    if let Ok(outbound) = OutboundMessage::decode(line) {
        let encoded = outbound.encode_line().expect("decoded message must encode");
        let again = OutboundMessage::decode(encoded.trim_end()).expect("encoded line must decode");
        // NaN never reaches the wire, JSON has no spelling for it.
        assert_eq!(again, outbound);
    }
});
