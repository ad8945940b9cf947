//! Classification with silent local fallback

use std::sync::Arc;
use std::time::Duration;

use chatguard_config::Config;
use chatguard_core::ClassificationResult;
use tracing::{info, warn};

use crate::fallback::FallbackMatcher;
use crate::handler::{ClassifyError, Classifier};
use crate::remote::RemoteClassifier;

/// Asks the primary classifier and, when it fails or does not answer in time,
/// answers from the local matcher instead. Never surfaces an error.
pub struct ClassifierClient {
    primary: Option<Arc<dyn Classifier>>,
    fallback: FallbackMatcher,
    deadline: Duration,
}

impl ClassifierClient {
    pub fn new(primary: Arc<dyn Classifier>, fallback: FallbackMatcher) -> Self {
        Self {
            primary: Some(primary),
            fallback,
            deadline: Duration::from_secs(10),
        }
    }

    /// Local matching only
    pub fn offline(fallback: FallbackMatcher) -> Self {
        Self {
            primary: None,
            fallback,
            deadline: Duration::from_secs(10),
        }
    }

    /// Remote endpoint from `config.api`, fallback vocabulary from `config.fallback`
    pub fn from_config(config: &Config) -> Result<Self, ClassifyError> {
        let remote = RemoteClassifier::new(&config.api)?;
        Ok(Self::new(Arc::new(remote), FallbackMatcher::new(&config.fallback.extra_words))
            .with_deadline(config.api.timeout()))
    }

    /// Upper bound on how long the primary classifier may take
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let result = match &self.primary {
            Some(primary) => match self.ask(primary.as_ref(), text).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "classifier unavailable, using local word list");
                    self.fallback.judge(text)
                }
            },
            None => self.fallback.judge(text),
        };

        info!(
            is_offensive = result.is_offensive,
            tokens = result.offending_tokens.len(),
            "classified"
        );
        result
    }

    async fn ask(&self, primary: &dyn Classifier, text: &str) -> Result<ClassificationResult, ClassifyError> {
        tokio::time::timeout(self.deadline, primary.classify(text))
            .await
            .map_err(|_| ClassifyError::Timeout(self.deadline))?
    }
}
