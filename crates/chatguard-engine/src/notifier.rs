//! Transient on-page notification

use std::sync::Arc;
use std::time::Duration;

use chatguard_core::{Document, DomError, Event, EventKind, Listener, NodeId, Page};
use thiserror::Error;
use tracing::{debug, warn};

/// Class of the notification panel; at most one exists in the document
pub const NOTIFICATION_CLASS: &str = "chatguard-notification-container";

const CLOSE_CLASS: &str = "close-btn";
const TITLE: &str = "Abusive words detected";
const BODY: &str = "Please edit your message for the next time.";
const PANEL_STYLE: [(&str, &str); 6] = [
    ("position", "fixed"),
    ("top", "20px"),
    ("right", "20px"),
    ("z-index", "10000"),
    ("background-color", "#ff4d4f"),
    ("color", "white"),
];

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to render notification: {0}")]
    Render(#[from] DomError),

    #[error("Fallback alert failed: {0}")]
    Alert(String),
}

/// Always-available fallback when the panel cannot be rendered
pub trait Alerter: Send + Sync {
    fn alert(&self, message: &str) -> Result<(), NotifyError>;
}

/// Alerter that writes the message to the log
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn alert(&self, message: &str) -> Result<(), NotifyError> {
        warn!(message, "alert");
        Ok(())
    }
}

pub struct Notifier {
    duration: Duration,
    alerter: Arc<dyn Alerter>,
    page: Option<Page>,
}

impl Notifier {
    pub fn new(duration: Duration, alerter: Arc<dyn Alerter>) -> Self {
        Self {
            duration,
            alerter,
            page: None,
        }
    }

    /// Enables auto-removal after the display duration; without a page the
    /// panel stays until dismissed or replaced
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Replace any visible notification with a new one. Falls back to the
    /// alerter when the panel cannot be rendered; returns whether the user was
    /// told by either means.
    pub fn show(&self, doc: &mut Document) -> bool {
        self.dismiss_all(doc);

        match self.render(doc) {
            Ok(panel) => {
                self.schedule_removal(panel);
                true
            }
            Err(e) => {
                debug!(error = %e, "notification panel unavailable, using alert");
                match self.alerter.alert(&format!("{}. {}", TITLE, BODY)) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "could not notify user");
                        false
                    }
                }
            }
        }
    }

    /// Remove every notification panel. Returns how many were removed.
    pub fn dismiss_all(&self, doc: &mut Document) -> usize {
        let panels: Vec<NodeId> = doc
            .subtree(doc.root())
            .into_iter()
            .filter(|id| doc.has_class(*id, NOTIFICATION_CLASS))
            .collect();
        panels
            .into_iter()
            .filter(|panel| doc.remove(*panel).is_ok())
            .count()
    }

    fn render(&self, doc: &mut Document) -> Result<NodeId, NotifyError> {
        let body = doc.body().ok_or(DomError::NoBody)?;

        let panel = doc.create_element("div");
        doc.set_attribute(panel, "class", NOTIFICATION_CLASS)?;
        for (property, value) in PANEL_STYLE {
            doc.set_style(panel, property, value)?;
        }

        let message = doc.create_element("div");
        doc.set_inner_html(message, &format!("<strong>{}</strong><p>{}</p>", TITLE, BODY))?;
        doc.append_child(panel, message)?;

        let close = doc.create_element("button");
        doc.set_attribute(close, "class", CLOSE_CLASS)?;
        doc.set_inner_html(close, "&times;")?;
        doc.append_child(panel, close)?;

        let dismiss: Listener = Arc::new(move |doc: &mut Document, _event: &Event| {
            if doc.remove(panel).is_ok() {
                debug!(%panel, "notification dismissed");
            }
        });
        doc.add_event_listener(close, EventKind::Click, dismiss)?;

        doc.append_child(body, panel)?;
        Ok(panel)
    }

    fn schedule_removal(&self, panel: NodeId) {
        let Some(page) = self.page.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime, notification will not auto-remove");
            return;
        };

        let duration = self.duration;
        handle.spawn(async move {
            tokio::time::sleep(duration).await;
            page.with(|doc| {
                // Already dismissed or replaced
                if doc.is_connected(panel) {
                    let _ = doc.remove(panel);
                }
            });
        });
    }
}
