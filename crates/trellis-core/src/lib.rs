//! Trellis Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Trellis crate:
//! - Identifiers (NodeId, NodePath)
//! - Identity generation from call sites and modifier seeds
//! - The node capability trait implemented by embedder node types
//! - Patches produced by reconciliation
//! - Error types

pub mod id;
pub mod identity;
pub mod node;
pub mod patch;
pub mod error;

pub use id::*;
pub use identity::*;
pub use node::*;
pub use patch::*;
pub use error::*;
