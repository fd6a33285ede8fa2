//! Property tests for fleet membership.
//!
//! The registry is checked against a plain ordered list: whatever sequence of
//! registrations and removals is applied, the snapshot must list exactly the
//! live sessions in the order they joined.

use std::sync::Arc;

use fleetline_server::{FleetRegistry, RegistryError, VehicleSession};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Register(u64),
    Unregister(u64),
}

fn op() -> impl Strategy<Value = Op> {
    // Small id space so duplicates and removals of live sessions are common.
    prop_oneof![(1u64..16).prop_map(Op::Register), (1u64..16).prop_map(Op::Unregister)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn snapshot_matches_ordered_model(ops in prop::collection::vec(op(), 0..64), cap in 1usize..12) {
        let fleet = FleetRegistry::with_max_sessions(cap);
        let mut model: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::Register(id) => {
                    let (session, _rx) = VehicleSession::new(id, 0);
                    let result = fleet.register(Arc::new(session));
                    if model.contains(&id) {
                        prop_assert_eq!(result, Err(RegistryError::DuplicateSession(id)));
                    } else if model.len() >= cap {
                        prop_assert_eq!(result, Err(RegistryError::CapacityExceeded { max: cap }));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.push(id);
                    }
                },
                Op::Unregister(id) => {
                    let removed = fleet.unregister(id);
                    let position = model.iter().position(|live| *live == id);
                    prop_assert_eq!(removed.map(|s| s.id()), position.map(|p| model.remove(p)));
                },
            }

            let ids: Vec<u64> = fleet.snapshot().iter().map(|s| s.id()).collect();
            prop_assert_eq!(&ids, &model);
            prop_assert_eq!(fleet.len(), model.len());
        }
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes(ids in prop::collection::hash_set(1u64..1000, 1..20)) {
        let fleet = FleetRegistry::new();
        for id in &ids {
            let (session, _rx) = VehicleSession::new(*id, 0);
            fleet.register(Arc::new(session)).unwrap();
        }

        let before = fleet.snapshot();
        for id in &ids {
            fleet.unregister(*id);
        }

        prop_assert!(fleet.is_empty());
        prop_assert_eq!(before.len(), ids.len());
    }
}
