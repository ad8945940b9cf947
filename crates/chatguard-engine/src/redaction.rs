//! Redaction engine: applies a classification verdict to one element
//!
//! Order of operations is fixed: reset, flag update, highlight, replace,
//! notify, guard attach. Highlighting never touches a plain input's value;
//! contenteditable highlighting rewrites markup. When replacement also runs on
//! a contenteditable element it rewrites the text as plain text, so the
//! highlight markup from the same pass does not survive.

use std::sync::Arc;

use chatguard_config::Settings;
use chatguard_core::element::{ATTR_CONTAINS_OFFENSIVE, ATTR_OFFENSIVE_WORDS};
use chatguard_core::selection::preserve;
use chatguard_core::{
    ClassificationResult, Document, DomError, ElementKind, FlagState, NodeId, RestoreOutcome,
};
use chatguard_redact::{HIGHLIGHT_CLASS, OVERLAY_CLASS, Redactor};
use tracing::{debug, info};

use crate::guard::SubmissionGuard;
use crate::notifier::Notifier;
use crate::registry::Registry;

const TINT: &str = "rgba(255, 200, 200, 0.2)";
const OVERLAY_STYLE: [(&str, &str); 3] = [("font-size", "12px"), ("margin-top", "4px"), ("color", "#333")];
const RESET_STYLES: [&str; 3] = ["border", "background-color", "outline"];

/// What `apply` did to the element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub flag: FlagState,
    pub highlighted: bool,
    pub highlight_restore: Option<RestoreOutcome>,
    pub replaced: bool,
    pub replacement_restore: Option<RestoreOutcome>,
    pub notified: bool,
    pub guard_attached: bool,
}

pub struct RedactionEngine {
    redactor: Redactor,
    registry: Arc<Registry>,
    notifier: Arc<Notifier>,
    guard: Arc<SubmissionGuard>,
}

impl RedactionEngine {
    pub fn new(registry: Arc<Registry>, notifier: Arc<Notifier>, guard: Arc<SubmissionGuard>) -> Self {
        Self {
            redactor: Redactor::new(),
            registry,
            notifier,
            guard,
        }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn guard(&self) -> &Arc<SubmissionGuard> {
        &self.guard
    }

    /// Apply `result` to `node` under `settings`
    pub fn apply(
        &self,
        doc: &mut Document,
        node: NodeId,
        result: &ClassificationResult,
        settings: &Settings,
    ) -> Result<ApplyReport, DomError> {
        let kind = ElementKind::of(doc, node)
            .ok_or_else(|| DomError::InvalidState(format!("{} is not editable", node)))?;
        self.reset(doc, node)?;

        let mut report = ApplyReport::default();

        if !result.is_offensive {
            doc.set_attribute(node, ATTR_CONTAINS_OFFENSIVE, FlagState::Clean.as_attr())?;
            doc.set_attribute(node, ATTR_OFFENSIVE_WORDS, "")?;
            self.registry.record_verdict(node, FlagState::Clean, Vec::new());
            debug!(%node, "clean");
            return Ok(report);
        }

        let tokens = &result.offending_tokens;
        doc.set_attribute(node, ATTR_CONTAINS_OFFENSIVE, FlagState::Offensive.as_attr())?;
        doc.set_attribute(
            node,
            ATTR_OFFENSIVE_WORDS,
            &serde_json::to_string(tokens).unwrap_or_default(),
        )?;
        self.registry.record_verdict(node, FlagState::Offensive, tokens.clone());
        report.flag = FlagState::Offensive;

        // Nothing to point at when the whole text is the offence
        if settings.enable_highlighting && !tokens.is_empty() {
            match kind {
                ElementKind::Plain => {
                    report.highlighted = self.annotate(doc, node, tokens)?;
                }
                ElementKind::ContentEditable => {
                    let current = doc.inner_html(node).unwrap_or_default().to_string();
                    let highlighted = self.redactor.highlight_markup(&current, tokens);
                    if highlighted != current {
                        let (written, outcome) =
                            preserve(doc, node, |doc| doc.set_inner_html(node, &highlighted));
                        written?;
                        report.highlighted = true;
                        report.highlight_restore = Some(outcome);
                    }
                }
            }
        }

        if settings.enable_auto_replacement {
            let text = doc.editable_text(node).unwrap_or_default();
            let masked = self.redactor.mask(&text, tokens);
            if masked != text {
                let (written, outcome) = preserve(doc, node, |doc| match kind {
                    ElementKind::Plain => doc.set_value(node, &masked),
                    ElementKind::ContentEditable => doc.set_text_content(node, &masked),
                });
                written?;
                report.replaced = true;
                report.replacement_restore = Some(outcome);
            }
        }

        if settings.enable_notifications {
            report.notified = self.notifier.show(doc);
        }

        if let Some(form) = doc.form_owner(node) {
            report.guard_attached = self.guard.attach(doc, form);
        }

        info!(
            %node,
            tokens = ?tokens,
            highlighted = report.highlighted,
            replaced = report.replaced,
            "offensive content"
        );
        Ok(report)
    }

    /// Clear highlight state left by a previous `apply`: inline tint, the
    /// sibling overlay, and highlight spans. Idempotent.
    pub fn reset(&self, doc: &mut Document, node: NodeId) -> Result<(), DomError> {
        for property in RESET_STYLES {
            doc.set_style(node, property, "")?;
        }

        if let Some(next) = doc.next_element_sibling(node) {
            if doc.has_class(next, OVERLAY_CLASS) {
                doc.remove(next)?;
            }
        }

        if doc.is_content_editable(node) {
            let current = doc.inner_html(node).unwrap_or_default();
            if current.contains(HIGHLIGHT_CLASS) {
                let plain = self.redactor.unhighlight_markup(current);
                let (written, _) = preserve(doc, node, |doc| doc.set_inner_html(node, &plain));
                written?;
            }
        }
        Ok(())
    }

    /// Tint a plain input and list the tokens in an overlay after it.
    /// The input's value is left alone.
    fn annotate(&self, doc: &mut Document, node: NodeId, tokens: &[String]) -> Result<bool, DomError> {
        doc.set_style(node, "background-color", TINT)?;

        let overlay = doc.create_element("div");
        doc.set_attribute(overlay, "class", OVERLAY_CLASS)?;
        for (property, value) in OVERLAY_STYLE {
            doc.set_style(overlay, property, value)?;
        }
        doc.set_inner_html(overlay, &self.redactor.overlay_markup(tokens))?;

        match doc.insert_after(node, overlay) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!(%node, error = %e, "could not place overlay");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{LogAlerter, NOTIFICATION_CLASS};
    use chatguard_config::SettingKey;
    use chatguard_core::EventKind;
    use chatguard_core::element::ATTR_GUARD_ATTACHED;
    use std::time::Duration;
    use tokio::sync::watch;

    fn engine() -> (RedactionEngine, Arc<Registry>) {
        let registry = Arc::new(Registry::new());
        let notifier = Arc::new(Notifier::new(Duration::from_secs(5), Arc::new(LogAlerter)));
        let (_tx, rx) = watch::channel(Arc::new(Settings::default()));
        let guard = Arc::new(SubmissionGuard::new(notifier.clone(), rx));
        (RedactionEngine::new(registry.clone(), notifier, guard), registry)
    }

    fn idiot() -> ClassificationResult {
        ClassificationResult::offensive(vec!["idiot".into()])
    }

    fn input_in_form(doc: &mut Document, value: &str) -> (NodeId, NodeId) {
        let body = doc.body().unwrap();
        let form = doc.create_element("form");
        doc.append_child(body, form).unwrap();
        let input = doc.create_element("input");
        doc.append_child(form, input).unwrap();
        doc.set_value(input, value).unwrap();
        (form, input)
    }

    fn editor(doc: &mut Document, text: &str) -> NodeId {
        let body = doc.body().unwrap();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        doc.append_child(body, editor).unwrap();
        doc.set_text_content(editor, text).unwrap();
        editor
    }

    fn overlays(doc: &Document) -> usize {
        doc.subtree(doc.root())
            .into_iter()
            .filter(|id| doc.has_class(*id, OVERLAY_CLASS))
            .count()
    }

    fn notifications(doc: &Document) -> usize {
        doc.subtree(doc.root())
            .into_iter()
            .filter(|id| doc.has_class(*id, NOTIFICATION_CLASS))
            .count()
    }

    #[test]
    fn test_plain_input_full_pass() {
        let (engine, registry) = engine();
        let mut doc = Document::new("example.com");
        let (form, input) = input_in_form(&mut doc, "you are an idiot today");
        registry.track(input, ElementKind::Plain);
        doc.set_selection_range(input, 4, 4).unwrap();

        let report = engine.apply(&mut doc, input, &idiot(), &Settings::default()).unwrap();

        assert_eq!(doc.value(input), Some("you are an ***** today"));
        assert_eq!(doc.selection_range(input), Some((4, 4)));
        assert_eq!(report.replacement_restore, Some(RestoreOutcome::Restored));
        assert_eq!(doc.attribute(input, ATTR_CONTAINS_OFFENSIVE), Some("true"));
        assert_eq!(doc.attribute(input, ATTR_OFFENSIVE_WORDS), Some(r#"["idiot"]"#));
        assert_eq!(doc.style(input, "background-color"), Some(TINT));
        assert_eq!(overlays(&doc), 1);
        assert_eq!(notifications(&doc), 1);
        assert!(report.guard_attached);
        assert_eq!(doc.attribute(form, ATTR_GUARD_ATTACHED), Some("true"));
        let tracked = registry.get(input).unwrap();
        assert_eq!(tracked.flag, FlagState::Offensive);
        assert_eq!(tracked.tokens, vec!["idiot".to_string()]);
    }

    #[test]
    fn test_highlight_leaves_plain_value_alone() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let (_, input) = input_in_form(&mut doc, "you idiot");
        let settings = Settings::default().with(SettingKey::EnableAutoReplacement, false);

        let report = engine.apply(&mut doc, input, &idiot(), &settings).unwrap();

        assert!(report.highlighted);
        assert!(!report.replaced);
        assert_eq!(doc.value(input), Some("you idiot"));
        let overlay = doc.next_element_sibling(input).unwrap();
        assert!(doc.has_class(overlay, OVERLAY_CLASS));
        assert!(doc.inner_html(overlay).unwrap().contains("idiot"));
    }

    #[test]
    fn test_repeated_apply_keeps_one_overlay() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let (_, input) = input_in_form(&mut doc, "you idiot");
        let settings = Settings::default().with(SettingKey::EnableAutoReplacement, false);

        for _ in 0..3 {
            engine.apply(&mut doc, input, &idiot(), &settings).unwrap();
        }

        assert_eq!(overlays(&doc), 1);
        assert_eq!(notifications(&doc), 1);
    }

    #[test]
    fn test_clean_verdict_clears_state() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let (_, input) = input_in_form(&mut doc, "you idiot");
        let settings = Settings::default().with(SettingKey::EnableAutoReplacement, false);
        engine.apply(&mut doc, input, &idiot(), &settings).unwrap();

        doc.set_value(input, "you are nice").unwrap();
        let report = engine
            .apply(&mut doc, input, &ClassificationResult::clean(), &settings)
            .unwrap();

        assert_eq!(report.flag, FlagState::Clean);
        assert_eq!(overlays(&doc), 0);
        assert_eq!(doc.style(input, "background-color"), None);
        assert_eq!(doc.attribute(input, ATTR_CONTAINS_OFFENSIVE), Some("false"));
        assert_eq!(doc.attribute(input, ATTR_OFFENSIVE_WORDS), Some(""));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let (_, input) = input_in_form(&mut doc, "you idiot");
        let settings = Settings::default().with(SettingKey::EnableAutoReplacement, false);
        engine.apply(&mut doc, input, &idiot(), &settings).unwrap();

        engine.reset(&mut doc, input).unwrap();
        engine.reset(&mut doc, input).unwrap();

        assert_eq!(overlays(&doc), 0);
        assert_eq!(doc.style(input, "background-color"), None);
        assert_eq!(doc.value(input), Some("you idiot"));
    }

    #[test]
    fn test_empty_tokens_mask_whole_text() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let (_, input) = input_in_form(&mut doc, "so rude");

        let report = engine
            .apply(&mut doc, input, &ClassificationResult::offensive(Vec::new()), &Settings::default())
            .unwrap();

        assert_eq!(doc.value(input), Some("*******"));
        assert!(!report.highlighted);
        assert_eq!(overlays(&doc), 0);
        assert_eq!(doc.attribute(input, ATTR_OFFENSIVE_WORDS), Some("[]"));
    }

    #[test]
    fn test_contenteditable_highlight_keeps_selection() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let node = editor(&mut doc, "hey idiot, hi");
        doc.set_selection(node, 5, 5).unwrap();
        let settings = Settings::default().with(SettingKey::EnableAutoReplacement, false);

        let report = engine.apply(&mut doc, node, &idiot(), &settings).unwrap();

        assert!(report.highlighted);
        assert_eq!(report.highlight_restore, Some(RestoreOutcome::Restored));
        assert_eq!(doc.inner_html(node).unwrap().matches(HIGHLIGHT_CLASS).count(), 1);
        assert_eq!(doc.text_content(node).as_deref(), Some("hey idiot, hi"));
        let selection = doc.selection().unwrap();
        assert_eq!((selection.start, selection.end), (5, 5));

        // Re-applying unwraps first, so spans never nest
        engine.apply(&mut doc, node, &idiot(), &settings).unwrap();
        assert_eq!(doc.inner_html(node).unwrap().matches(HIGHLIGHT_CLASS).count(), 1);
    }

    #[test]
    fn test_contenteditable_unchanged_markup_not_rewritten() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let node = editor(&mut doc, "nothing to see");
        let settings = Settings::default().with(SettingKey::EnableAutoReplacement, false);

        let report = engine.apply(&mut doc, node, &idiot(), &settings).unwrap();

        assert!(!report.highlighted);
        assert_eq!(report.highlight_restore, None);
        assert_eq!(doc.inner_html(node), Some("nothing to see"));
    }

    #[test]
    fn test_contenteditable_replacement_wins_over_highlight() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let node = editor(&mut doc, "hey idiot");

        let report = engine.apply(&mut doc, node, &idiot(), &Settings::default()).unwrap();

        assert!(report.highlighted);
        assert!(report.replaced);
        assert_eq!(doc.inner_html(node), Some("hey *****"));
    }

    #[test]
    fn test_detached_selection_restore_is_swallowed() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let node = editor(&mut doc, "hey idiot");
        doc.set_selection(node, 9, 9).unwrap();
        let body = doc.body().unwrap();
        doc.remove(body).unwrap();
        let settings = Settings::default().with(SettingKey::EnableNotifications, false);

        let report = engine.apply(&mut doc, node, &idiot(), &settings).unwrap();

        assert!(matches!(report.highlight_restore, Some(RestoreOutcome::Failed(_))));
        assert_eq!(doc.inner_html(node), Some("hey *****"));
    }

    #[test]
    fn test_guard_attached_once_per_form() {
        let (engine, _) = engine();
        let mut doc = Document::new("example.com");
        let (form, first) = input_in_form(&mut doc, "you idiot");
        let second = doc.create_element("textarea");
        doc.append_child(form, second).unwrap();
        doc.set_value(second, "idiot again").unwrap();

        let a = engine.apply(&mut doc, first, &idiot(), &Settings::default()).unwrap();
        let b = engine.apply(&mut doc, second, &idiot(), &Settings::default()).unwrap();

        assert!(a.guard_attached);
        assert!(!b.guard_attached);
        assert_eq!(doc.listener_count(form, EventKind::Submit), 1);
    }
}
