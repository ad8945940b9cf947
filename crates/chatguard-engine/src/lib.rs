//! In-page moderation pipeline
//!
//! Input Watcher -> Debouncer -> ClassifierClient -> RedactionEngine (+ Notifier),
//! with the SubmissionGuard enforcing a final pass when a form is submitted.

pub mod dispatcher;
pub mod guard;
pub mod notifier;
pub mod pipeline;
pub mod redaction;
pub mod registry;
pub mod watcher;

pub use dispatcher::{Debouncer, Ticket};
pub use guard::{SubmissionGuard, SubmitReport};
pub use notifier::{Alerter, LogAlerter, NOTIFICATION_CLASS, NotifyError, Notifier};
pub use pipeline::ChatGuard;
pub use redaction::{ApplyReport, RedactionEngine};
pub use registry::Registry;
pub use watcher::InputWatcher;
