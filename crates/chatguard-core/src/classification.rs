//! Classification request/result domain model

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::dom::NodeId;

/// A text snapshot dispatched for one element. A later request for the same
/// element (higher `generation`) supersedes it.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRequest {
    pub node: NodeId,
    pub text: String,
    pub generation: u64,
    #[serde(with = "time::serde::timestamp")]
    pub issued_at: OffsetDateTime,
}

impl ClassificationRequest {
    pub fn new(node: NodeId, text: String, generation: u64) -> Self {
        Self {
            node,
            text,
            generation,
            issued_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_offensive: bool,
    /// May be empty even when offensive; the whole text is then treated as offending
    #[serde(rename = "offensive_words", default)]
    pub offending_tokens: Vec<String>,
}

impl ClassificationResult {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn offensive(tokens: Vec<String>) -> Self {
        Self {
            is_offensive: true,
            offending_tokens: tokens,
        }
    }

    /// Offensive with no identifiable tokens
    pub fn masks_whole_text(&self) -> bool {
        self.is_offensive && self.offending_tokens.is_empty()
    }
}
