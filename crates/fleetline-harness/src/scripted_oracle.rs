//! Routing oracle with canned answers.
//!
//! Answers are keyed by the first waypoint, which for matcher queries is the
//! vehicle's position. Give each test vehicle a distinct location and the
//! oracle can price every candidate independently.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use fleetline_core::{MIN_WAYPOINTS, RoutingOracle, TripCost};
use fleetline_proto::Point;

type QueryHook = Box<dyn Fn(&[Point]) + Send + Sync>;

struct Script {
    origin: Point,
    cost: TripCost,
    delay: Duration,
}

/// Oracle that returns scripted costs and records the queries it sees.
///
/// Origins without a script cost [`TripCost::INFEASIBLE`].
#[derive(Default)]
pub struct ScriptedOracle {
    scripts: Vec<Script>,
    queries: Mutex<Vec<Vec<Point>>>,
    hook: Option<QueryHook>,
}

impl ScriptedOracle {
    /// Oracle with no scripts: every query is infeasible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips starting at `origin` cost `seconds`.
    #[must_use]
    pub fn with_cost(self, origin: Point, seconds: f64) -> Self {
        self.with_cost_after(origin, seconds, Duration::ZERO)
    }

    /// Trips starting at `origin` cost `seconds`, answered after `delay`.
    #[must_use]
    pub fn with_cost_after(mut self, origin: Point, seconds: f64, delay: Duration) -> Self {
        self.scripts.push(Script { origin, cost: TripCost::from_seconds(seconds), delay });
        self
    }

    /// Run `hook` on every query, before the answer is returned.
    ///
    /// Lets tests change the world while a match is in flight.
    #[must_use]
    pub fn on_query(mut self, hook: impl Fn(&[Point]) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Every query received so far, in arrival order.
    pub fn queries(&self) -> Vec<Vec<Point>> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of queries received so far.
    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// First waypoint of every query received so far.
    pub fn queried_origins(&self) -> Vec<Point> {
        self.queries().iter().filter_map(|waypoints| waypoints.first().copied()).collect()
    }
}

#[async_trait]
impl RoutingOracle for ScriptedOracle {
    async fn trip_cost(&self, waypoints: &[Point]) -> TripCost {
        if waypoints.len() < MIN_WAYPOINTS {
            return TripCost::INFEASIBLE;
        }
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).push(waypoints.to_vec());

        if let Some(hook) = &self.hook {
            hook(waypoints);
        }

        let origin = waypoints.first().copied();
        let Some(script) = self.scripts.iter().find(|script| Some(script.origin) == origin) else {
            return TripCost::INFEASIBLE;
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        script.cost
    }
}
