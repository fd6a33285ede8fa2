//! Fleetline wire protocol.
//!
//! Vehicles hold one persistent, bidirectional stream to the dispatch server.
//! Every message on that stream is a single JSON object terminated by `\n`.
//!
//! # Message flow
//!
//! ```text
//! vehicle                                   server
//!    | --- {"type":"LOC_PING",...} -------->   |
//!    | <-- {"msg":"Location ping received"} -  |
//!    | --- {"type":"GET_NEXT"} ------------->  |
//!    | <-- {"msg":"Next stop","stop":[..]} --  |
//!    | <-- {"type":"PING"} ------------------  |   (unsolicited)
//!    | <-- {"type":"RIDE_REQUEST",...} ------  |   (unsolicited)
//! ```
//!
//! Inbound messages are tagged by `type`. Replies carry a human readable `msg`
//! and are written in the same order the requests arrived. Pushes are tagged
//! by `type` and may interleave with replies at any line boundary.
//!
//! Coordinates on the vehicle side of the protocol are `[latitude, longitude]`
//! pairs. Points in pushes and HTTP responses are objects with named fields.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod geo;
pub mod message;

pub use errors::{ProtocolError, Result};
pub use geo::{Point, Stop};
pub use message::{InboundMessage, MAX_MESSAGE_LEN, OutboundMessage, Reply, ServerPush};

/// ALPN identifier negotiated on vehicle connections.
pub const ALPN_PROTOCOL: &[u8] = b"fleetline";
