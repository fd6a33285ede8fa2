//! Ordered stop sequence of a single vehicle.

use fleetline_proto::Stop;

/// Stops a vehicle still has to visit, in visiting order.
///
/// Duplicates are allowed. Removal takes out the first exactly-equal stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    stops: Vec<Stop>,
}

impl Route {
    /// Create an empty route.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stop at the end.
    pub fn push(&mut self, stop: Stop) {
        self.stops.push(stop);
    }

    /// Remove the first stop exactly equal to `stop`.
    ///
    /// Returns `false` and leaves the route untouched if no stop matches.
    pub fn remove_first(&mut self, stop: &Stop) -> bool {
        match self.stops.iter().position(|s| s == stop) {
            Some(index) => {
                self.stops.remove(index);
                true
            },
            None => false,
        }
    }

    /// The stop the vehicle heads to next.
    pub fn peek_next(&self) -> Option<Stop> {
        self.stops.first().copied()
    }

    /// Number of outstanding stops.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Whether there are no outstanding stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Stops in visiting order.
    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    /// Iterate over stops in visiting order.
    pub fn iter(&self) -> std::slice::Iter<'_, Stop> {
        self.stops.iter()
    }
}

impl FromIterator<Stop> for Route {
    fn from_iter<I: IntoIterator<Item = Stop>>(iter: I) -> Self {
        Self { stops: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a Stop;
    type IntoIter = std::slice::Iter<'a, Stop>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
