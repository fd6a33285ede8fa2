//! Vehicle session messages.
//!
//! [`InboundMessage`] is what a vehicle sends, [`Reply`] is the server's answer
//! to each inbound line and [`ServerPush`] covers unsolicited server traffic.
//! Everything the server writes to a session is an [`OutboundMessage`].
//!
//! # Framing
//!
//! One JSON object per line. Lines longer than [`MAX_MESSAGE_LEN`] bytes are a
//! protocol violation and end the session.

use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use crate::{
    ProtocolError, Result,
    geo::{Point, Stop, lat_lon},
};

/// Maximum length of a single message line in bytes, excluding the newline.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024;

/// Message sent by a vehicle.
///
/// The `type` field selects the variant. Fields not listed here are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Periodic position report
    #[serde(rename = "LOC_PING")]
    LocPing {
        /// Current position
        #[serde(with = "lat_lon")]
        location: Point,
        /// Vehicle-side timestamp, opaque to the server
        loc_time: f64,
    },

    /// Vehicle accepted a stop; append it to the route
    #[serde(rename = "STOP_RECVD")]
    StopReceived {
        /// Stop to append
        #[serde(with = "lat_lon")]
        location: Stop,
    },

    /// Vehicle finished or abandoned a stop; remove its first occurrence
    #[serde(rename = "STOP_REMOVED")]
    StopRemoved {
        /// Stop to remove
        #[serde(with = "lat_lon")]
        location: Stop,
    },

    /// Ask for the head of the route
    #[serde(rename = "GET_NEXT")]
    GetNext,
}

impl InboundMessage {
    /// Decode a single line (without its trailing newline).
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.len() > MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge { size: raw.len(), max: MAX_MESSAGE_LEN });
        }
        Ok(serde_json::from_str(raw)?)
    }

    /// The wire tag of this message, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LocPing { .. } => "LOC_PING",
            Self::StopReceived { .. } => "STOP_RECVD",
            Self::StopRemoved { .. } => "STOP_REMOVED",
            Self::GetNext => "GET_NEXT",
        }
    }
}

/// Server answer to one inbound line.
///
/// Serializes as `{"msg": <text>}`. [`Reply::NextStop`] additionally carries a
/// `stop` field that is `[lat, lon]` or `null` when the route is empty.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawReply")]
pub enum Reply {
    /// Answer to `LOC_PING`
    LocationPingReceived,
    /// Answer to `STOP_RECVD`
    StopReceived,
    /// Answer to `STOP_REMOVED`, sent whether or not the stop was present
    StopRemoved,
    /// Answer to `GET_NEXT`
    NextStop(Option<Stop>),
    /// Answer to anything that failed to decode
    UnknownMessageType,
}

impl Reply {
    /// The `msg` text of this reply.
    pub const fn text(&self) -> &'static str {
        match self {
            Self::LocationPingReceived => "Location ping received",
            Self::StopReceived => "Stop received",
            Self::StopRemoved => "Stop removed",
            Self::NextStop(_) => "Next stop",
            Self::UnknownMessageType => "Unknown message type",
        }
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::NextStop(stop) => {
                let mut reply = serializer.serialize_struct("Reply", 2)?;
                reply.serialize_field("msg", self.text())?;
                reply.serialize_field("stop", &stop.map(Point::to_pair))?;
                reply.end()
            },
            _ => {
                let mut reply = serializer.serialize_struct("Reply", 1)?;
                reply.serialize_field("msg", self.text())?;
                reply.end()
            },
        }
    }
}

#[derive(Deserialize)]
struct RawReply {
    msg: String,
    #[serde(default, with = "lat_lon::option")]
    stop: Option<Stop>,
}

impl TryFrom<RawReply> for Reply {
    type Error = ProtocolError;

    fn try_from(raw: RawReply) -> Result<Self> {
        let reply = match raw.msg.as_str() {
            "Location ping received" => Self::LocationPingReceived,
            "Stop received" => Self::StopReceived,
            "Stop removed" => Self::StopRemoved,
            "Next stop" => Self::NextStop(raw.stop),
            "Unknown message type" => Self::UnknownMessageType,
            _ => return Err(ProtocolError::UnknownReply(raw.msg)),
        };
        Ok(reply)
    }
}

/// Unsolicited message from the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerPush {
    /// Keepalive probe. Vehicles need not answer.
    #[serde(rename = "PING")]
    Ping,

    /// Ride assignment
    #[serde(rename = "RIDE_REQUEST")]
    RideRequest {
        /// Where the passenger waits
        pickup: Point,
        /// Where the passenger goes
        dropoff: Point,
    },
}

/// Anything the server writes to a vehicle session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Unsolicited push
    Push(ServerPush),
    /// Answer to an inbound line
    Reply(Reply),
}

impl OutboundMessage {
    /// Encode as one newline-terminated line.
    pub fn encode_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode a single line (without its trailing newline).
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.len() > MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge { size: raw.len(), max: MAX_MESSAGE_LEN });
        }
        Ok(serde_json::from_str(raw)?)
    }
}

impl From<Reply> for OutboundMessage {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

impl From<ServerPush> for OutboundMessage {
    fn from(push: ServerPush) -> Self {
        Self::Push(push)
    }
}
