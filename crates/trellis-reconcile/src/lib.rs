//! Trellis Reconcile - Generation diffing and patch application
//!
//! This crate implements the reconciliation side of Trellis:
//! - Greedy dual-cursor diff of two sibling sequences
//! - Recursive diff through matched nodes
//! - Context transplant from previous to next generation
//! - In-order patch application against the embedder's target
//! - Unordered set diff for flat values

pub mod apply;
pub mod engine;
pub mod set;

pub use apply::*;
pub use engine::*;
pub use set::*;

#[cfg(test)]
pub(crate) mod testing;
