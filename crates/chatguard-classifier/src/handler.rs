//! Classifier trait

use async_trait::async_trait;
use chatguard_core::ClassificationResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Classifier returned HTTP {0}")]
    Status(u16),

    #[error("Malformed classifier response: {0}")]
    Decode(String),

    #[error("Classifier did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Anything that can judge a piece of text
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError>;
}
