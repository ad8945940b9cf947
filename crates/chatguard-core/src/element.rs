//! Monitored element domain model

use serde::{Deserialize, Serialize};

use crate::dom::{Document, ListenerId, NodeId};

/// Element attribute holding the flagged-state marker ("true" / "false")
pub const ATTR_CONTAINS_OFFENSIVE: &str = "data-contains-offensive";

/// Element attribute holding the JSON-encoded offending-token array
pub const ATTR_OFFENSIVE_WORDS: &str = "data-offensive-words";

/// Form attribute marking that a submit guard is attached
pub const ATTR_GUARD_ATTACHED: &str = "data-chatguard-listener";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// `input` / `textarea`: content is a value with a caret
    Plain,
    /// Contenteditable region: content is markup
    ContentEditable,
}

impl ElementKind {
    /// Classify an element as an editable surface, if it is one
    pub fn of(doc: &Document, id: NodeId) -> Option<Self> {
        if doc.is_text_control(id) {
            Some(ElementKind::Plain)
        } else if doc.is_content_editable(id) {
            Some(ElementKind::ContentEditable)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagState {
    #[default]
    Clean,
    Offensive,
}

impl FlagState {
    pub fn as_attr(&self) -> &'static str {
        match self {
            FlagState::Clean => "false",
            FlagState::Offensive => "true",
        }
    }

    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("true") => FlagState::Offensive,
            _ => FlagState::Clean,
        }
    }
}

/// An editable surface the pipeline is watching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredElement {
    pub node: NodeId,
    pub kind: ElementKind,
    pub flag: FlagState,
    pub tokens: Vec<String>,
    /// Input listener, present while the element is being watched
    pub listener: Option<ListenerId>,
}

impl MonitoredElement {
    pub fn new(node: NodeId, kind: ElementKind) -> Self {
        Self {
            node,
            kind,
            flag: FlagState::Clean,
            tokens: Vec::new(),
            listener: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }
}
