use thiserror::Error;

use crate::dom::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Node is not attached to the document: {0}")]
    Detached(NodeId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Offset {offset} exceeds length {length}")]
    IndexSize { offset: usize, length: usize },

    #[error("Document has no body")]
    NoBody,
}

pub type Result<T> = std::result::Result<T, DomError>;
