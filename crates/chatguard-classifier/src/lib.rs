//! Offensiveness classification
//!
//! A remote model behind an HTTP endpoint, with a local word-list matcher used
//! whenever the endpoint cannot answer.

pub mod client;
pub mod fallback;
pub mod handler;
pub mod remote;

pub use client::ClassifierClient;
pub use fallback::FallbackMatcher;
pub use handler::{ClassifyError, Classifier};
pub use remote::{HealthStatus, RemoteClassifier};
