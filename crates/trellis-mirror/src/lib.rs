//! Trellis Mirror - Reference embedding of Trellis
//!
//! A generational element arena stands in for a real retained structure
//! (a widget tree, a document, a scene graph):
//! - [`Mirror`] holds elements and their ordered children
//! - [`ElementNode`] implements [`TreeNode`](trellis_core::TreeNode) against it
//! - [`Document`] runs the full build, reconcile and apply cycle

pub mod document;
pub mod element;
pub mod error;
pub mod mirror;

pub use document::*;
pub use element::*;
pub use error::*;
pub use mirror::*;
