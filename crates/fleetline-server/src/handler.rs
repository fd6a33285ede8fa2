//! Vehicle message handling.
//!
//! Maps one inbound line to one state change and one reply. Every line gets
//! exactly one reply, including lines that fail to decode.

use fleetline_proto::{InboundMessage, Reply};

use crate::session::VehicleSession;

/// Decode `raw` and apply it to `session`.
///
/// Lines that are not valid JSON, carry an unknown `type` or miss required
/// fields are answered with [`Reply::UnknownMessageType`] and change nothing.
pub fn handle_message(session: &VehicleSession, raw: &str) -> Reply {
    match InboundMessage::decode(raw) {
        Ok(message) => apply(session, message),
        Err(e) => {
            tracing::warn!(session_id = session.id(), error = %e, "undecodable vehicle message");
            Reply::UnknownMessageType
        },
    }
}

/// Apply a decoded message to `session` and build the reply.
pub fn apply(session: &VehicleSession, message: InboundMessage) -> Reply {
    tracing::trace!(session_id = session.id(), kind = message.kind(), "vehicle message");

    match message {
        InboundMessage::LocPing { location, loc_time } => {
            session.update_location(location, loc_time);
            Reply::LocationPingReceived
        },
        InboundMessage::StopReceived { location } => {
            session.append_stop(location);
            tracing::debug!(session_id = session.id(), stop = %location, "stop added");
            Reply::StopReceived
        },
        InboundMessage::StopRemoved { location } => {
            if session.remove_stop(&location) {
                tracing::debug!(session_id = session.id(), stop = %location, "stop removed");
            } else {
                tracing::debug!(session_id = session.id(), stop = %location, "stop not on route");
            }
            Reply::StopRemoved
        },
        InboundMessage::GetNext => Reply::NextStop(session.peek_next_stop()),
    }
}
