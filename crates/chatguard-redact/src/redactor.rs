use std::sync::LazyLock;

use chatguard_core::markup::{self, Segment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Class of the span wrapped around highlighted tokens in contenteditable markup
pub const HIGHLIGHT_CLASS: &str = "chatguard-highlight";

/// Class of the annotation inserted after a plain input
pub const OVERLAY_CLASS: &str = "chatguard-overlay";

const HIGHLIGHT_STYLE: &str = "background-color: rgba(255, 0, 0, 0.2); border-bottom: 2px solid red;";
const OVERLAY_TOKEN_STYLE: &str = "color: red; font-weight: bold;";

static HIGHLIGHT_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="chatguard-highlight"[^>]*>(.*?)</span>"#).unwrap()
});

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("Malformed token list: {0}")]
    TokenParse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionInfo {
    /// Token that matched, or `None` when the whole text was masked
    pub token: Option<String>,
    pub count: usize,
}

/// Masks and highlights offending tokens
pub struct Redactor {
    mask: char,
}

impl Redactor {
    pub fn new() -> Self {
        Self { mask: '*' }
    }

    /// Case-insensitive, word-bounded alternation over `tokens` (escaped).
    /// `None` when no usable token is given.
    pub fn pattern(tokens: &[String]) -> Option<Regex> {
        let escaped: Vec<String> = tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if escaped.is_empty() {
            return None;
        }

        let source = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
        match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "could not build token pattern");
                None
            }
        }
    }

    /// Mask every word-bounded occurrence of `tokens` with an equal-length run of
    /// the mask character. An empty token list masks the whole text.
    pub fn redact(&self, text: &str, tokens: &[String]) -> (String, Vec<RedactionInfo>) {
        if tokens.is_empty() {
            let count = usize::from(!text.is_empty());
            return (
                self.mask_all(text),
                vec![RedactionInfo { token: None, count }],
            );
        }

        let Some(pattern) = Self::pattern(tokens) else {
            return (text.to_string(), Vec::new());
        };

        let mut redactions: Vec<RedactionInfo> = Vec::new();
        for found in pattern.find_iter(text) {
            let matched = found.as_str().to_lowercase();
            let token = tokens
                .iter()
                .find(|t| t.trim().to_lowercase() == matched)
                .map(|t| t.trim().to_string())
                .unwrap_or(matched);

            match redactions.iter_mut().find(|r| r.token.as_deref() == Some(token.as_str())) {
                Some(info) => info.count += 1,
                None => redactions.push(RedactionInfo {
                    token: Some(token),
                    count: 1,
                }),
            }
        }

        let result = pattern
            .replace_all(text, |caps: &regex::Captures| self.run(markup::char_len(&caps[0])))
            .into_owned();

        (result, redactions)
    }

    /// Masked text only
    pub fn mask(&self, text: &str, tokens: &[String]) -> String {
        self.redact(text, tokens).0
    }

    /// Replace the entire text with mask characters, keeping its length
    pub fn mask_all(&self, text: &str) -> String {
        self.run(markup::char_len(text))
    }

    /// Mask using a persisted JSON token list. A malformed list is treated as
    /// empty, which masks the whole text.
    pub fn mask_persisted(&self, text: &str, tokens_json: &str) -> String {
        let tokens = parse_tokens(tokens_json).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring persisted token list");
            Vec::new()
        });
        self.mask(text, &tokens)
    }

    /// Wrap word-bounded tokens in highlight spans. Only text between tags is
    /// rewritten; tag names and attribute values are left alone.
    pub fn highlight_markup(&self, html: &str, tokens: &[String]) -> String {
        let Some(pattern) = Self::pattern(tokens) else {
            return html.to_string();
        };

        markup::segments(html)
            .into_iter()
            .map(|segment| match segment {
                Segment::Tag(tag) => tag.to_string(),
                Segment::Text(text) => pattern
                    .replace_all(text, |caps: &regex::Captures| {
                        format!(
                            r#"<span class="{}" style="{}">{}</span>"#,
                            HIGHLIGHT_CLASS, HIGHLIGHT_STYLE, &caps[0]
                        )
                    })
                    .into_owned(),
            })
            .collect()
    }

    /// Remove highlight spans, keeping their content
    pub fn unhighlight_markup(&self, html: &str) -> String {
        HIGHLIGHT_SPAN.replace_all(html, "$1").into_owned()
    }

    /// Annotation listing the detected tokens, for display next to a plain input
    pub fn overlay_markup(&self, tokens: &[String]) -> String {
        let listed: Vec<String> = tokens
            .iter()
            .map(|t| {
                format!(
                    r#"<span style="{}">{}</span>"#,
                    OVERLAY_TOKEN_STYLE,
                    markup::escape_text(t)
                )
            })
            .collect();
        format!("Detected: {}", listed.join(", "))
    }

    fn run(&self, len: usize) -> String {
        std::iter::repeat_n(self.mask, len).collect()
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a persisted token list. The empty string is an empty list.
pub fn parse_tokens(json: &str) -> Result<Vec<String>, RedactError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_word_bounded_masking() {
        let redactor = Redactor::new();
        let (redacted, info) = redactor.redact("you are an idiot today", &tokens(&["idiot"]));

        assert_eq!(redacted, "you are an ***** today");
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].token.as_deref(), Some("idiot"));
        assert_eq!(info[0].count, 1);
    }

    #[test]
    fn test_partial_words_untouched() {
        let redactor = Redactor::new();
        let redacted = redactor.mask("how idiotic, Idiot", &tokens(&["idiot"]));
        assert_eq!(redacted, "how idiotic, *****");
    }

    #[test]
    fn test_case_insensitive_counts() {
        let redactor = Redactor::new();
        let (redacted, info) = redactor.redact("DUMB and dumb and Dumb", &tokens(&["dumb"]));

        assert_eq!(redacted, "**** and **** and ****");
        assert_eq!(info[0].count, 3);
    }

    #[test]
    fn test_empty_tokens_mask_whole_text() {
        let redactor = Redactor::new();
        let (redacted, info) = redactor.redact("you are awful", &[]);

        assert_eq!(redacted, "*************");
        assert_eq!(info, vec![RedactionInfo { token: None, count: 1 }]);
    }

    #[test]
    fn test_special_characters_escaped() {
        let redactor = Redactor::new();
        // "a.b" must not match "axb"
        let redacted = redactor.mask("axb a.b", &tokens(&["a.b"]));
        assert_eq!(redacted, "axb ***");
    }

    #[test]
    fn test_blank_tokens_ignored() {
        assert!(Redactor::pattern(&tokens(&["", "  "])).is_none());
        let redactor = Redactor::new();
        assert_eq!(redactor.mask("leave me", &tokens(&[""])), "leave me");
    }

    #[test]
    fn test_mask_persisted_recovers_from_bad_json() {
        let redactor = Redactor::new();
        assert_eq!(redactor.mask_persisted("you idiot", r#"["idiot"]"#), "you *****");
        assert_eq!(redactor.mask_persisted("you idiot", "not json"), "*********");
        assert_eq!(redactor.mask_persisted("abc", ""), "***");
    }

    #[test]
    fn test_highlight_skips_tags() {
        let redactor = Redactor::new();
        let html = r#"a <b class="span">span</b>"#;
        let highlighted = redactor.highlight_markup(html, &tokens(&["span"]));

        assert!(highlighted.starts_with(r#"a <b class="span"><span class="chatguard-highlight""#));
        assert!(highlighted.ends_with(">span</span></b>"));
    }

    #[test]
    fn test_highlight_round_trip() {
        let redactor = Redactor::new();
        let html = "you idiot, IDIOT";
        let highlighted = redactor.highlight_markup(html, &tokens(&["idiot"]));

        assert_eq!(highlighted.matches(HIGHLIGHT_CLASS).count(), 2);
        assert_eq!(markup::text_content(&highlighted), html);
        assert_eq!(redactor.unhighlight_markup(&highlighted), html);
    }

    #[test]
    fn test_overlay_escapes_tokens() {
        let redactor = Redactor::new();
        let overlay = redactor.overlay_markup(&tokens(&["<b>", "dumb"]));

        assert!(overlay.starts_with("Detected: "));
        assert!(overlay.contains("&lt;b&gt;"));
        assert_eq!(markup::text_content(&overlay), "Detected: <b>, dumb");
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!(parse_tokens("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_tokens(r#"["a","b"]"#).unwrap(), tokens(&["a", "b"]));
        assert!(matches!(parse_tokens("{"), Err(RedactError::TokenParse(_))));
    }
}
