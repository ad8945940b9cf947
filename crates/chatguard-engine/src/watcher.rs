//! Input watcher: finds editable surfaces and attaches the input listener

use std::sync::Arc;

use chatguard_config::Settings;
use chatguard_core::{Document, ElementKind, EventKind, Listener, NodeId};
use tracing::{debug, info};

use crate::registry::Registry;

pub struct InputWatcher {
    registry: Arc<Registry>,
    listener: Listener,
}

impl InputWatcher {
    /// `listener` is attached to every discovered element's `Input` event
    pub fn new(registry: Arc<Registry>, listener: Listener) -> Self {
        Self { registry, listener }
    }

    /// Walk `root` and its descendants, attaching the input listener to every
    /// text control and contenteditable element that does not have it yet.
    /// A no-op when monitoring is disabled for the page's site. Returns the
    /// newly attached nodes.
    pub fn scan(&self, doc: &mut Document, root: NodeId, settings: &Settings) -> Vec<NodeId> {
        if !settings.site_enabled(doc.hostname()) {
            debug!(host = doc.hostname(), "monitoring disabled for site, skipping scan");
            return Vec::new();
        }

        let mut attached = Vec::new();
        for node in doc.subtree(root) {
            let Some(kind) = ElementKind::of(doc, node) else {
                continue;
            };
            self.registry.track(node, kind);
            if self.registry.is_listening(node) {
                continue;
            }

            match doc.add_event_listener(node, EventKind::Input, self.listener.clone()) {
                Ok(listener) => {
                    self.registry.set_listener(node, Some(listener));
                    attached.push(node);
                }
                Err(e) => debug!(%node, error = %e, "could not attach input listener"),
            }
        }

        if !attached.is_empty() {
            info!(count = attached.len(), %root, "watching editable elements");
        }
        attached
    }

    /// Remove the input listener from every watched element. Returns the detached nodes.
    pub fn detach_all(&self, doc: &mut Document) -> Vec<NodeId> {
        let mut detached = Vec::new();
        for node in self.registry.listening() {
            if let Some(listener) = self.registry.get(node).and_then(|e| e.listener) {
                doc.remove_event_listener(node, EventKind::Input, listener);
            }
            self.registry.set_listener(node, None);
            detached.push(node);
        }

        if !detached.is_empty() {
            info!(count = detached.len(), "stopped watching editable elements");
        }
        detached
    }
}
