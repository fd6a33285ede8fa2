//! Geographic points.
//!
//! A [`Point`] is a latitude/longitude pair in decimal degrees. Equality is
//! exact float equality: a stop is removed from a route only when the vehicle
//! reports the very same coordinates it was given. No range checks are
//! applied, the routing oracle is the authority on what is reachable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees.
///
/// Serializes as `{"latitude": .., "longitude": ..}`. Vehicle messages use the
/// `[latitude, longitude]` array form instead, see [`lat_lon`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Degrees north of the equator
    pub latitude: f64,
    /// Degrees east of the prime meridian
    pub longitude: f64,
}

/// A point a vehicle must visit.
pub type Stop = Point;

impl Point {
    /// Create a point from latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Create a point from a `[latitude, longitude]` pair.
    pub const fn from_pair(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    /// The `[latitude, longitude]` pair for this point.
    pub const fn to_pair(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    /// Render as `lon,lat`, the coordinate order routing engines expect.
    pub fn oracle_coordinate(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl From<[f64; 2]> for Point {
    fn from(pair: [f64; 2]) -> Self {
        Self::from_pair(pair)
    }
}

/// Serde adapter for the `[latitude, longitude]` array form.
///
/// Use with `#[serde(with = "fleetline_proto::geo::lat_lon")]`.
pub mod lat_lon {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Point;

    /// Serialize a point as `[latitude, longitude]`.
    pub fn serialize<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        point.to_pair().serialize(serializer)
    }

    /// Deserialize a point from `[latitude, longitude]`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        <[f64; 2]>::deserialize(deserializer).map(Point::from_pair)
    }

    /// Same as the parent module, for optional points (`null` when absent).
    pub mod option {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        use super::Point;

        /// Serialize as `[latitude, longitude]` or `null`.
        pub fn serialize<S: Serializer>(
            point: &Option<Point>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            point.map(Point::to_pair).serialize(serializer)
        }

        /// Deserialize from `[latitude, longitude]` or `null`.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Point>, D::Error> {
            Ok(Option::<[f64; 2]>::deserialize(deserializer)?.map(Point::from_pair))
        }
    }
}
