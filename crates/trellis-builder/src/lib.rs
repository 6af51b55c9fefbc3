//! Trellis Builder - Declarative tree construction
//!
//! This crate implements the builder side of Trellis:
//! - Named node declarations with call-site identities
//! - Groups, loops and conditionals that shape the tree without adding nodes
//! - Scope values (loop item, index, modifier) visible to the node factory
//! - A follower hook wrapping every child declaration

pub mod builder;
pub mod config;
pub mod scope;

pub use builder::*;
pub use config::*;
pub use scope::*;
