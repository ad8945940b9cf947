//! Submission guard: last pass over flagged fields when a form is submitted

use std::sync::{Arc, Weak};

use chatguard_config::Settings;
use chatguard_core::element::{ATTR_CONTAINS_OFFENSIVE, ATTR_GUARD_ATTACHED, ATTR_OFFENSIVE_WORDS};
use chatguard_core::{Document, Event, EventKind, FlagState, Listener, NodeId};
use chatguard_redact::Redactor;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::notifier::Notifier;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReport {
    /// Fields whose content was masked
    pub redacted: Vec<NodeId>,
    pub notified: bool,
}

pub struct SubmissionGuard {
    redactor: Redactor,
    notifier: Arc<Notifier>,
    settings: watch::Receiver<Arc<Settings>>,
}

impl SubmissionGuard {
    pub fn new(notifier: Arc<Notifier>, settings: watch::Receiver<Arc<Settings>>) -> Self {
        Self {
            redactor: Redactor::new(),
            notifier,
            settings,
        }
    }

    /// Hook `form`'s submit event. At most once per form; returns false if the
    /// form was already guarded.
    pub fn attach(self: &Arc<Self>, doc: &mut Document, form: NodeId) -> bool {
        if doc.attribute(form, ATTR_GUARD_ATTACHED) == Some("true") {
            return false;
        }

        let guard: Weak<Self> = Arc::downgrade(self);
        let listener: Listener = Arc::new(move |doc: &mut Document, event: &Event| {
            if let Some(guard) = guard.upgrade() {
                guard.on_submit(doc, event.target);
            }
        });

        match doc.add_event_listener(form, EventKind::Submit, listener) {
            Ok(_) => {
                if let Err(e) = doc.set_attribute(form, ATTR_GUARD_ATTACHED, "true") {
                    debug!(%form, error = %e, "could not mark form as guarded");
                }
                info!(%form, "submit guard attached");
                true
            }
            Err(e) => {
                debug!(%form, error = %e, "could not attach submit guard");
                false
            }
        }
    }

    /// Mask every flagged field of `form` with its persisted tokens when
    /// auto-replacement is on, then notify once. Advisory only when it is off.
    /// Never cancels the submission.
    pub fn on_submit(&self, doc: &mut Document, form: NodeId) -> SubmitReport {
        let settings = self.settings.borrow().clone();
        let flagged: Vec<NodeId> = doc
            .subtree(form)
            .into_iter()
            .filter(|id| {
                FlagState::from_attr(doc.attribute(*id, ATTR_CONTAINS_OFFENSIVE)) == FlagState::Offensive
            })
            .collect();

        if flagged.is_empty() {
            return SubmitReport::default();
        }
        if !settings.enable_auto_replacement {
            debug!(%form, flagged = flagged.len(), "auto-replacement disabled, submitting as typed");
            return SubmitReport::default();
        }

        let mut redacted = Vec::new();
        for node in flagged {
            let tokens = doc.attribute(node, ATTR_OFFENSIVE_WORDS).unwrap_or_default().to_string();
            let written = if doc.is_text_control(node) {
                let text = doc.value(node).unwrap_or_default().to_string();
                doc.set_value(node, &self.redactor.mask_persisted(&text, &tokens))
            } else {
                let text = doc.text_content(node).unwrap_or_default();
                doc.set_text_content(node, &self.redactor.mask_persisted(&text, &tokens))
            };

            match written {
                Ok(()) => redacted.push(node),
                Err(e) => debug!(%node, error = %e, "could not redact field on submit"),
            }
        }

        info!(%form, fields = redacted.len(), "redacted flagged fields before submission");
        let notified = self.notifier.show(doc);
        SubmitReport { redacted, notified }
    }
}
