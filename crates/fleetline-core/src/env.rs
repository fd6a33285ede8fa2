//! Time and randomness behind a trait.
//!
//! Core code never reads a clock or an RNG directly. The server plugs in OS
//! time and entropy, the harness a seeded RNG and Tokio's pausable clock, so
//! the same matcher and session code runs unchanged in both.

use std::{future::Future, ops::Sub, time::Duration};

use crate::SessionId;

/// Clock, sleep and entropy source.
///
/// Implementations must keep `now()` monotonic. Production implementations
/// must draw `random_bytes` from OS entropy, since session ids come from it.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant. Differences are durations.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Monotonic now.
    fn now(&self) -> Self::Instant;

    /// Resolve after `duration`. Only the liveness loop sleeps.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Seconds since the Unix epoch, for status reporting only.
    fn wall_clock_secs(&self) -> u64;

    /// Eight random bytes as a `u64`.
    fn random_u64(&self) -> u64 {
        let mut raw = [0u8; 8];
        self.random_bytes(&mut raw);
        u64::from_le_bytes(raw)
    }

    /// Fresh session id. Never zero.
    fn session_id(&self) -> SessionId {
        loop {
            let id = self.random_u64();
            if id != 0 {
                return id;
            }
        }
    }
}
