//! Fuzz target for vehicle state operations
//!
//! Applies arbitrary location updates and stop edits and checks them against
//! a plain list model.
//!
//! # Invariants
//!
//! - Route order is arrival order; removal takes the earliest equal stop
//! - Removing an absent stop reports `false` and changes nothing
//! - A vehicle is eligible for matching exactly when it has a location

#![no_main]

use arbitrary::Arbitrary;
use fleetline_core::VehicleState;
use fleetline_proto::Point;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Locate { lat: i16, lon: i16, time: u32 },
    Append(u8),
    Remove(u8),
    Peek,
    Snapshot,
}

/// Small palette so removals often hit.
fn stop(index: u8) -> Point {
    Point::new(f64::from(index % 8), -f64::from(index % 8))
}

fuzz_target!(|ops: Vec<Op>| {
    let mut state = VehicleState::new();
    let mut model: Vec<Point> = Vec::new();
    let mut located = false;

    for op in ops {
        match op {
            Op::Locate { lat, lon, time } => {
                state.update_location(Point::new(f64::from(lat), f64::from(lon)), f64::from(time));
                located = true;
            },
            Op::Append(index) => {
                state.append_stop(stop(index));
                model.push(stop(index));
            },
            Op::Remove(index) => {
                let target = stop(index);
                let expected = model.iter().position(|s| *s == target).map(|p| model.remove(p));
                assert_eq!(state.remove_stop(&target), expected.is_some());
            },
            Op::Peek => assert_eq!(state.peek_next_stop(), model.first().copied()),
            Op::Snapshot => {
                let snapshot = state.snapshot_for_costing();
                assert_eq!(snapshot.is_some(), located);
                if let Some(snapshot) = snapshot {
                    assert_eq!(snapshot.route, model);
                }
            },
        }

        assert_eq!(state.route().as_slice(), model.as_slice());
        assert_eq!(state.is_eligible(), located);
    }
});
