//! Wires the pipeline stages to a page

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chatguard_classifier::ClassifierClient;
use chatguard_config::{PipelineConfig, Settings, SettingsStore};
use chatguard_core::{
    ClassificationRequest, Document, Event, Listener, MutationCallback, MutationRecord, NodeId, Page,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatcher::{Debouncer, Ticket};
use crate::guard::SubmissionGuard;
use crate::notifier::{Alerter, LogAlerter, Notifier};
use crate::redaction::RedactionEngine;
use crate::registry::Registry;
use crate::watcher::InputWatcher;

struct Inner {
    page: Page,
    settings: watch::Receiver<Arc<Settings>>,
    classifier: ClassifierClient,
    registry: Arc<Registry>,
    watcher: InputWatcher,
    debouncer: Debouncer<NodeId>,
    engine: RedactionEngine,
    started: AtomicBool,
}

/// The moderation pipeline for one page
pub struct ChatGuard {
    inner: Arc<Inner>,
}

impl ChatGuard {
    pub fn new(
        page: Page,
        store: &dyn SettingsStore,
        classifier: ClassifierClient,
        config: &PipelineConfig,
    ) -> Self {
        Self::with_alerter(page, store, classifier, config, Arc::new(LogAlerter))
    }

    /// Like `new`, with a custom fallback for when the notification panel cannot be shown
    pub fn with_alerter(
        page: Page,
        store: &dyn SettingsStore,
        classifier: ClassifierClient,
        config: &PipelineConfig,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        let settings = store.subscribe();
        let registry = Arc::new(Registry::new());
        let notifier =
            Arc::new(Notifier::new(config.notification_duration(), alerter).with_page(page.clone()));
        let guard = Arc::new(SubmissionGuard::new(notifier.clone(), settings.clone()));
        let engine = RedactionEngine::new(registry.clone(), notifier, guard);
        let debouncer = Debouncer::new(config.debounce(), config.min_text_len);

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let listener: Listener = Arc::new(move |doc: &mut Document, event: &Event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_input(doc, event.target);
                }
            });

            Inner {
                page,
                settings,
                classifier,
                registry: registry.clone(),
                watcher: InputWatcher::new(registry, listener),
                debouncer,
                engine,
                started: AtomicBool::new(false),
            }
        });

        Self { inner }
    }

    /// Observe the page for new editable elements, attach to the existing ones,
    /// and follow settings changes. Must be called from within a tokio runtime.
    /// Returns `None` if the pipeline was already started.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("pipeline already started");
            return None;
        }

        let inner = self.inner.clone();
        self.inner.page.with(|doc| inner.bind(doc));

        let weak = Arc::downgrade(&self.inner);
        let mut changes = self.inner.settings.clone();
        Some(tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let settings = changes.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.rebind(&settings);
            }
        }))
    }

    pub fn page(&self) -> &Page {
        &self.inner.page
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.inner.settings.borrow().clone()
    }

    pub fn engine(&self) -> &RedactionEngine {
        &self.inner.engine
    }
}

impl Inner {
    fn snapshot(&self) -> Arc<Settings> {
        self.settings.borrow().clone()
    }

    fn bind(self: &Arc<Self>, doc: &mut Document) {
        let Some(body) = doc.body() else {
            warn!("page has no body, nothing to watch");
            return;
        };

        let weak = Arc::downgrade(self);
        let observer: MutationCallback = Arc::new(move |doc: &mut Document, record: &MutationRecord| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let settings = inner.snapshot();
            for added in &record.added {
                inner.watcher.scan(doc, *added, &settings);
            }
        });
        if let Err(e) = doc.observe(body, true, observer) {
            warn!(error = %e, "could not observe page");
        }

        let settings = self.snapshot();
        self.watcher.scan(doc, body, &settings);
        info!(host = doc.hostname(), "pipeline started");
    }

    /// Attach or detach to match a new settings snapshot
    fn rebind(&self, settings: &Settings) {
        self.page.with(|doc| {
            if settings.site_enabled(doc.hostname()) {
                if let Some(body) = doc.body() {
                    self.watcher.scan(doc, body, settings);
                }
            } else {
                for node in self.watcher.detach_all(doc) {
                    self.debouncer.cancel(&node);
                }
            }
        });
    }

    fn on_input(self: &Arc<Self>, doc: &mut Document, node: NodeId) {
        let Some(text) = doc.editable_text(node) else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            debug!(%node, "no runtime, input ignored");
            return;
        }

        let inner = self.clone();
        self.debouncer.schedule(node, text, move |text, ticket| async move {
            inner.analyze(node, text, ticket).await;
        });
    }

    async fn analyze(&self, node: NodeId, text: String, ticket: Ticket<NodeId>) {
        let request = ClassificationRequest::new(node, text, ticket.generation());
        let result = self.classifier.classify(&request.text).await;

        self.page.with(|doc| {
            // A newer edit was dispatched while this one was in flight
            if !ticket.is_current() {
                debug!(%node, generation = request.generation, "discarding stale verdict");
                return;
            }

            let settings = self.snapshot();
            match self.engine.apply(doc, node, &result, &settings) {
                Ok(report) => debug!(%node, generation = request.generation, ?report, "verdict applied"),
                Err(e) => warn!(%node, error = %e, "could not apply verdict"),
            }
        });
    }
}
