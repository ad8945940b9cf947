//! Minimal markup handling for contenteditable content

use std::sync::LazyLock;

use regex::Regex;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// A run of markup: either a complete tag or the text between tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Tag(&'a str),
    Text(&'a str),
}

/// Split markup into tags and text runs, in document order
pub fn segments(markup: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;

    for tag in TAG_REGEX.find_iter(markup) {
        if tag.start() > last {
            out.push(Segment::Text(&markup[last..tag.start()]));
        }
        out.push(Segment::Tag(tag.as_str()));
        last = tag.end();
    }

    if last < markup.len() {
        out.push(Segment::Text(&markup[last..]));
    }

    out
}

/// Convert markup to the text a user sees: line breaks kept, tags dropped, entities decoded
pub fn text_content(markup: &str) -> String {
    let text = BREAK_REGEX.replace_all(markup, "\n");
    let text = TAG_REGEX.replace_all(&text, "");

    // &amp; goes last so "&amp;lt;" decodes to "&lt;" and not "<"
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escape text for insertion as markup
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Length in characters, the unit used for caret and selection offsets
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
