//! Local word-list matcher

use async_trait::async_trait;
use chatguard_core::ClassificationResult;
use chatguard_redact::Redactor;
use regex::Regex;

use crate::handler::{ClassifyError, Classifier};

/// Built-in vocabulary
const BUILTIN_WORDS: &[&str] = &[
    "asshole", "bastard", "bitch", "bullshit", "crap", "cunt", "dick", "dumbass", "fuck",
    "fucker", "fucking", "idiot", "moron", "motherfucker", "retard", "shit", "slut", "stupid",
    "whore",
];

/// Case-insensitive whole-word scan over a fixed vocabulary
pub struct FallbackMatcher {
    pattern: Option<Regex>,
}

impl FallbackMatcher {
    /// Built-in vocabulary plus `extra_words`
    pub fn new(extra_words: &[String]) -> Self {
        let words: Vec<String> = BUILTIN_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra_words.iter().cloned())
            .collect();
        Self {
            pattern: Redactor::pattern(&words),
        }
    }

    /// Offending words in order of first appearance, lower-cased and deduplicated
    pub fn scan(&self, text: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };

        let mut found: Vec<String> = Vec::new();
        for m in pattern.find_iter(text) {
            let word = m.as_str().to_lowercase();
            if !found.contains(&word) {
                found.push(word);
            }
        }
        found
    }

    pub fn judge(&self, text: &str) -> ClassificationResult {
        let tokens = self.scan(text);
        if tokens.is_empty() {
            ClassificationResult::clean()
        } else {
            ClassificationResult::offensive(tokens)
        }
    }
}

impl Default for FallbackMatcher {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[async_trait]
impl Classifier for FallbackMatcher {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        Ok(self.judge(text))
    }
}
