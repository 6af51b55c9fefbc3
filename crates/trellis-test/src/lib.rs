//! Trellis Test Harness - Fuzzing and end-to-end validation
//!
//! This crate provides:
//! - Generation fuzzing against the reference mirror
//! - End-to-end integration scenarios
//! - Tracing setup for tests and benches

pub mod fuzzer;
pub mod integration;
pub mod logging;

pub use fuzzer::*;
pub use integration::*;
pub use logging::*;
