//! Mirror errors

use thiserror::Error;
use trellis_core::TrellisError;

use crate::ElementHandle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Unknown element {0}")]
    UnknownElement(ElementHandle),

    #[error("Element {child} is not a child of {parent}")]
    NotAChild {
        parent: ElementHandle,
        child: ElementHandle,
    },

    #[error("Element {0} already has a parent")]
    AlreadyAttached(ElementHandle),

    #[error("Element {child} cannot be placed under its own descendant {parent}")]
    Cycle {
        parent: ElementHandle,
        child: ElementHandle,
    },

    #[error("The root element cannot be moved or removed")]
    RootElement,
}

pub type MirrorResult<T> = Result<T, MirrorError>;

impl From<MirrorError> for TrellisError {
    fn from(err: MirrorError) -> Self {
        TrellisError::Target(err.to_string())
    }
}
