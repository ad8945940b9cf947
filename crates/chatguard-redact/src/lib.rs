//! Offending-token redaction and highlighting

pub mod redactor;

pub use redactor::{
    HIGHLIGHT_CLASS, OVERLAY_CLASS, RedactError, RedactionInfo, Redactor, parse_tokens,
};
