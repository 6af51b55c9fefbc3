//! Error types for Trellis

use thiserror::Error;

use crate::{Generation, NodeId, NodePath};

/// Core Trellis errors
#[derive(Error, Debug)]
pub enum TrellisError {
    // Builder errors
    #[error("Node factory not configured")]
    MissingFactory,

    // Patch errors
    #[error("No {generation} node at path {path}")]
    NodeNotFound {
        generation: Generation,
        path: NodePath,
    },

    #[error("Node {0} is not attached to the target structure")]
    Detached(NodeId),

    // Embedder errors
    #[error("Target error: {0}")]
    Target(String),
}

/// Result type for Trellis operations
pub type TrellisResult<T> = Result<T, TrellisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TrellisError::NodeNotFound {
            generation: Generation::Next,
            path: NodePath::from(vec![1, 0]),
        };
        assert_eq!(err.to_string(), "No next node at path 1/0");

        let err = TrellisError::Detached(NodeId::new(16));
        assert_eq!(
            err.to_string(),
            "Node 0000000000000010 is not attached to the target structure"
        );
    }
}
