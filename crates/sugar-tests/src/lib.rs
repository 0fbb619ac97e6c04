//! # sugar-tests
//!
//! Integration tests for the Sugarchain consensus rules.
//!
//! This crate provides:
//! - Chain generators for honest and adversarial header sequences
//! - Scenario tests replaying reference vectors for each retarget algorithm
//! - Attack simulations (timestamp manipulation, hash-rate bursts)
//! - Property-based tests for the codec, clamps and determinism
//! - Proof-of-Work verification and hash cache tests

pub mod generators;
pub mod harness;



#[cfg(test)]
mod fixed_window_tests;




pub use generators::*;
pub use harness::*;
