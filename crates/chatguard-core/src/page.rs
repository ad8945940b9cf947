//! Shared handle to a document

use std::sync::{Arc, Mutex, PoisonError};

use crate::dom::Document;

/// Cloneable handle used by timers and classification tasks that outlive a single
/// event dispatch. Event listeners already hold `&mut Document` and must not lock it.
#[derive(Clone, Debug)]
pub struct Page {
    inner: Arc<Mutex<Document>>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    /// Run `f` with exclusive access to the document
    pub fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut doc = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut doc)
    }
}
