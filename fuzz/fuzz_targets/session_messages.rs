//! Fuzz target for the per-session message handler
//!
//! Feeds a sequence of raw lines through `handle_message` on one session.
//!
//! # Invariants
//!
//! - Every line gets exactly one reply, malformed or not
//! - `GET_NEXT` never changes state
//! - Unknown input leaves state untouched

#![no_main]

use fleetline_proto::{InboundMessage, Reply};
use fleetline_server::{VehicleSession, handle_message};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|lines: Vec<String>| {
    let (session, _rx) = VehicleSession::new(1, 0);

    for line in lines {
        let before = session.state_snapshot();
        let reply = handle_message(&session, &line);
        let after = session.state_snapshot();

        match InboundMessage::decode(&line) {
            Ok(InboundMessage::GetNext) => {
                assert_eq!(reply, Reply::NextStop(before.peek_next_stop()));
                assert_eq!(before, after);
            },
            Ok(_) => assert_ne!(reply, Reply::UnknownMessageType),
            Err(_) => {
                assert_eq!(reply, Reply::UnknownMessageType);
                assert_eq!(before, after);
            },
        }
    }
});
