//! Routing oracle abstraction.
//!
//! The oracle answers one question: how long does it take to drive through a
//! sequence of waypoints, starting at the first one? The answer is a
//! [`TripCost`]; anything that prevents an answer (network failure, no route,
//! malformed response) is expressed as [`TripCost::INFEASIBLE`] rather than an
//! error, so a single bad candidate never fails a whole match.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use fleetline_proto::Point;

/// Fewest waypoints a trip query can have.
pub const MIN_WAYPOINTS: usize = 2;

/// Duration of a trip in seconds. Infinite when the trip cannot be costed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TripCost(f64);

impl TripCost {
    /// Cost of a trip that cannot be made or could not be queried.
    pub const INFEASIBLE: Self = Self(f64::INFINITY);

    /// Cost from a duration in seconds. `NaN` and `-inf` map to
    /// [`Self::INFEASIBLE`].
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds.is_nan() || seconds == f64::NEG_INFINITY {
            Self::INFEASIBLE
        } else {
            Self(seconds)
        }
    }

    /// Duration in seconds (`+inf` when infeasible).
    pub fn seconds(self) -> f64 {
        self.0
    }

    /// Whether the trip has a finite cost.
    pub fn is_feasible(self) -> bool {
        self.0.is_finite()
    }
}

impl fmt::Display for TripCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_feasible() { write!(f, "{:.1}s", self.0) } else { f.write_str("infeasible") }
    }
}

/// Source of trip durations.
///
/// # Contract
///
/// - Fewer than [`MIN_WAYPOINTS`] waypoints yields [`TripCost::INFEASIBLE`]
///   without querying anything.
/// - The trip starts at `waypoints[0]`; the visiting order of the rest is up
///   to the oracle.
/// - Failures are logged by the implementation and reported as
///   [`TripCost::INFEASIBLE`].
#[async_trait]
pub trait RoutingOracle: Send + Sync {
    /// Estimated duration of a trip through `waypoints`.
    async fn trip_cost(&self, waypoints: &[Point]) -> TripCost;
}

#[async_trait]
impl<O: RoutingOracle + ?Sized> RoutingOracle for Arc<O> {
    async fn trip_cost(&self, waypoints: &[Point]) -> TripCost {
        (**self).trip_cost(waypoints).await
    }
}
