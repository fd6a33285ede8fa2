//! Real clocks and OS entropy for the running server.
//!
//! Tests that need repeatable session ids or virtual time use the harness
//! `SimEnv` instead.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use fleetline_core::Environment;

/// Environment backed by the OS.
///
/// # Panics
///
/// [`Environment::random_bytes`] panics if the OS cannot supply entropy.
/// Predictable session ids are worse than not running.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// The OS environment.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS entropy source available");
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> u64 {
        // A clock set before 1970 reports 0 rather than failing a connection.
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |since| since.as_secs())
    }
}
