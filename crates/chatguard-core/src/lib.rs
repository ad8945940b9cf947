//! Core domain models for chatguard
//!
//! This crate contains:
//! - The in-process document model the pipeline inspects and rewrites
//! - Selection snapshot/restore around content rewrites
//! - Domain types (MonitoredElement, ClassificationRequest, ClassificationResult)

pub mod classification;
pub mod dom;
pub mod element;
pub mod error;
pub mod markup;
pub mod page;
pub mod selection;

pub use classification::{ClassificationRequest, ClassificationResult};
pub use dom::{
    Document, Event, EventKind, FormSubmission, Listener, ListenerId, MutationCallback,
    MutationRecord, NodeId, TextSelection,
};
pub use element::{ElementKind, FlagState, MonitoredElement};
pub use error::{DomError, Result};
pub use page::Page;
pub use selection::RestoreOutcome;
