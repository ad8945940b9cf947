//! Caret and selection preservation around content rewrites
//!
//! Snapshot the selection, run the mutation, then try to put the selection back.
//! Restoration is best-effort: failure is reported, never raised.

use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::error::DomError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Selection was put back at its pre-mutation offsets
    Restored,
    /// Nothing to restore: the selection was not inside the element
    NoSelection,
    /// Restoration was attempted and failed; the caret position is lost
    Failed(DomError),
}

impl RestoreOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RestoreOutcome::Failed(_))
    }
}

/// Run `mutate` on `node`, keeping its caret (text controls) or the document
/// selection (contenteditable) where it was
pub fn preserve<R>(
    doc: &mut Document,
    node: NodeId,
    mutate: impl FnOnce(&mut Document) -> R,
) -> (R, RestoreOutcome) {
    if doc.is_text_control(node) {
        let saved = doc.selection_range(node);
        let result = mutate(doc);
        let outcome = match saved {
            Some((start, end)) => outcome_of(doc.set_selection_range(node, start, end), node),
            None => RestoreOutcome::NoSelection,
        };
        return (result, outcome);
    }

    let saved = doc.selection().filter(|s| s.node == node);
    let result = mutate(doc);
    let outcome = match saved {
        Some(s) => outcome_of(doc.set_selection(node, s.start, s.end), node),
        None => RestoreOutcome::NoSelection,
    };
    (result, outcome)
}

fn outcome_of(restored: crate::Result<()>, node: NodeId) -> RestoreOutcome {
    match restored {
        Ok(()) => RestoreOutcome::Restored,
        Err(e) => {
            debug!(%node, error = %e, "selection could not be restored");
            RestoreOutcome::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(doc: &mut Document, markup: &str) -> NodeId {
        let body = doc.body().unwrap();
        let id = doc.create_element("div");
        doc.set_attribute(id, "contenteditable", "true").unwrap();
        doc.append_child(body, id).unwrap();
        doc.set_inner_html(id, markup).unwrap();
        id
    }

    #[test]
    fn test_text_control_caret_restored() {
        let mut doc = Document::new("example.com");
        let body = doc.body().unwrap();
        let field = doc.create_element("textarea");
        doc.append_child(body, field).unwrap();
        doc.set_value(field, "you idiot").unwrap();
        doc.set_selection_range(field, 3, 3).unwrap();

        let (_, outcome) = preserve(&mut doc, field, |doc| doc.set_value(field, "you *****"));

        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(doc.selection_range(field), Some((3, 3)));
    }

    #[test]
    fn test_contenteditable_selection_restored() {
        let mut doc = Document::new("example.com");
        let id = editor(&mut doc, "you idiot");
        doc.set_selection(id, 4, 9).unwrap();

        let (_, outcome) = preserve(&mut doc, id, |doc| {
            doc.set_inner_html(id, "you <span>idiot</span>")
        });

        assert_eq!(outcome, RestoreOutcome::Restored);
        let selection = doc.selection().unwrap();
        assert_eq!((selection.start, selection.end), (4, 9));
    }

    #[test]
    fn test_selection_elsewhere_is_left_alone() {
        let mut doc = Document::new("example.com");
        let first = editor(&mut doc, "one");
        let second = editor(&mut doc, "two");
        doc.set_selection(second, 1, 1).unwrap();

        let (_, outcome) = preserve(&mut doc, first, |doc| doc.set_text_content(first, "***"));

        assert_eq!(outcome, RestoreOutcome::NoSelection);
        assert_eq!(doc.selection().unwrap().node, second);
    }

    #[test]
    fn test_restore_failure_is_reported() {
        let mut doc = Document::new("example.com");
        let id = editor(&mut doc, "hello there");
        doc.set_selection(id, 6, 11).unwrap();

        let (_, outcome) = preserve(&mut doc, id, |doc| doc.set_text_content(id, "hi"));

        assert!(outcome.is_failed());
        assert_eq!(
            outcome,
            RestoreOutcome::Failed(DomError::IndexSize {
                offset: 6,
                length: 2
            })
        );
    }
}
