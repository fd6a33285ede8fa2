//! Deterministic test doubles for fleetline.
//!
//! [`SimEnv`] implements [`fleetline_core::Environment`] with a seeded RNG and
//! Tokio's clock, so tests that run with a paused runtime get reproducible
//! session ids and virtual time. [`ScriptedOracle`] is a routing oracle whose
//! answers are fixed up front and which records every query it receives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scripted_oracle;
pub mod sim_env;

pub use scripted_oracle::ScriptedOracle;
pub use sim_env::SimEnv;
