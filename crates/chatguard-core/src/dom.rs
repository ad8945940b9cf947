//! In-process document model
//!
//! Covers the part of a page the moderation pipeline touches: editable surfaces and
//! their forms, inline styles, `data-*` attributes, the active text selection, event
//! listeners and structural mutation observers. Contenteditable regions are leaves
//! whose content is their inner markup.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DomError, Result};
use crate::markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
    Click,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub target: NodeId,
}

/// Event callback. Receives the document it was dispatched on; must not re-lock the page.
pub type Listener = Arc<dyn Fn(&mut Document, &Event) + Send + Sync>;

/// Structural observer callback, invoked once per insertion under the observed root
pub type MutationCallback = Arc<dyn Fn(&mut Document, &MutationRecord) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
}

/// The document's single text selection, in character offsets into `node`'s text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Named field values collected when a form is submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormSubmission {
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    value: String,
    caret: (usize, usize),
    markup: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            value: String::new(),
            caret: (0, 0),
            markup: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Observer {
    root: NodeId,
    subtree: bool,
    callback: MutationCallback,
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    hostname: String,
    selection: Option<TextSelection>,
    listeners: HashMap<(NodeId, EventKind), Vec<(ListenerId, Listener)>>,
    observers: Vec<Observer>,
    next_listener: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("hostname", &self.hostname)
            .field("nodes", &self.nodes.len())
            .field("selection", &self.selection)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Document {
    /// Create an empty document (`html` root with a `body`) for a page on `hostname`
    pub fn new(hostname: impl Into<String>) -> Self {
        let mut doc = Self {
            nodes: vec![Node::new("html")],
            root: NodeId(0),
            hostname: hostname.into(),
            selection: None,
            listeners: HashMap::new(),
            observers: Vec::new(),
            next_listener: 0,
        };
        let body = doc.create_element("body");
        doc.nodes[body.0].parent = Some(doc.root);
        doc.nodes[0].children.push(body);
        doc
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.nodes[self.root.0]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].tag == "body")
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(DomError::NotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Whether `id` is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, id)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// `root` followed by all of its descendants, in tree order
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        if !self.contains(root) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|s| *s == id)?;
        siblings.get(index + 1).copied()
    }

    /// Nearest `form` ancestor
    pub fn form_owner(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.tag(node) == Some("form") {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::InvalidState(format!(
                "cannot insert {} into its own subtree",
                child
            )));
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.notify_observers(parent, child);
        Ok(())
    }

    /// Insert `node` immediately after `reference` under the same parent
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insertable(parent, node)?;
        self.detach(node)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|s| *s == reference)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        self.notify_observers(parent, node);
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.parent.is_none() {
            return Err(DomError::Detached(id));
        }
        self.detach(id)
    }

    // ------------------------------------------------------------------
    // Attributes and styles
    // ------------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.node_mut(id)?
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.node_mut(id)?.attributes.remove(name);
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.style.get(property))
            .map(String::as_str)
    }

    /// Set an inline style property; an empty value clears it
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let style = &mut self.node_mut(id)?.style;
        if value.is_empty() {
            style.remove(property);
        } else {
            style.insert(property.to_string(), value.to_string());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editable content
    // ------------------------------------------------------------------

    /// `textarea`, or `input` whose type is text (or unspecified)
    pub fn is_text_control(&self, id: NodeId) -> bool {
        match self.tag(id) {
            Some("textarea") => true,
            Some("input") => self
                .attribute(id, "type")
                .is_none_or(|t| t.eq_ignore_ascii_case("text")),
            _ => false,
        }
    }

    pub fn is_content_editable(&self, id: NodeId) -> bool {
        self.attribute(id, "contenteditable")
            .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        if !self.is_text_control(id) {
            return None;
        }
        self.nodes.get(id.0).map(|n| n.value.as_str())
    }

    /// Programmatic value change; the caret moves to the end as in a browser
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        if !self.is_text_control(id) {
            return Err(DomError::InvalidState(format!("{} has no value", id)));
        }
        let end = markup::char_len(value);
        let node = self.node_mut(id)?;
        node.value = value.to_string();
        node.caret = (end, end);
        Ok(())
    }

    pub fn selection_range(&self, id: NodeId) -> Option<(usize, usize)> {
        if !self.is_text_control(id) {
            return None;
        }
        self.nodes.get(id.0).map(|n| n.caret)
    }

    /// Move the caret of a text control; offsets are clamped to the value length
    pub fn set_selection_range(&mut self, id: NodeId, start: usize, end: usize) -> Result<()> {
        if !self.is_text_control(id) {
            return Err(DomError::InvalidState(format!(
                "{} does not support selection ranges",
                id
            )));
        }
        if !self.is_connected(id) {
            return Err(DomError::Detached(id));
        }
        let node = self.node_mut(id)?;
        let len = markup::char_len(&node.value);
        let end = end.min(len);
        node.caret = (start.min(end), end);
        Ok(())
    }

    pub fn inner_html(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.markup.as_str())
    }

    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<()> {
        self.node_mut(id)?.markup = markup.to_string();
        Ok(())
    }

    pub fn text_content(&self, id: NodeId) -> Option<String> {
        self.inner_html(id).map(markup::text_content)
    }

    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.set_inner_html(id, &markup::escape_text(text))
    }

    /// What the user typed: a text control's value, otherwise the element's text
    pub fn editable_text(&self, id: NodeId) -> Option<String> {
        if self.is_text_control(id) {
            self.value(id).map(str::to_string)
        } else {
            self.text_content(id)
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selection(&self) -> Option<TextSelection> {
        self.selection
    }

    pub fn set_selection(&mut self, node: NodeId, start: usize, end: usize) -> Result<()> {
        if self.is_text_control(node) {
            return Err(DomError::InvalidState(format!(
                "{} is a text control, use set_selection_range",
                node
            )));
        }
        if !self.is_connected(node) {
            return Err(DomError::Detached(node));
        }
        let length = self.text_content(node).map_or(0, |t| markup::char_len(&t));
        for offset in [start, end] {
            if offset > length {
                return Err(DomError::IndexSize { offset, length });
            }
        }
        self.selection = Some(TextSelection {
            node,
            start: start.min(end),
            end,
        });
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(
        &mut self,
        id: NodeId,
        kind: EventKind,
        listener: Listener,
    ) -> Result<ListenerId> {
        self.node(id)?;
        self.next_listener += 1;
        let listener_id = ListenerId(self.next_listener);
        self.listeners
            .entry((id, kind))
            .or_default()
            .push((listener_id, listener));
        Ok(listener_id)
    }

    pub fn remove_event_listener(&mut self, id: NodeId, kind: EventKind, listener: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&(id, kind)) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != listener);
        before != list.len()
    }

    pub fn listener_count(&self, id: NodeId, kind: EventKind) -> usize {
        self.listeners.get(&(id, kind)).map_or(0, Vec::len)
    }

    /// Run every listener registered for the event's target and kind, in registration order
    pub fn dispatch(&mut self, event: Event) {
        let listeners: Vec<Listener> = self
            .listeners
            .get(&(event.target, event.kind))
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(self, &event);
        }
    }

    /// Simulate the user typing `text` into an editable element: content replaced,
    /// caret at the end, `Input` fired
    pub fn input_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        if self.is_text_control(id) {
            self.set_value(id, text)?;
        } else if self.is_content_editable(id) {
            self.set_text_content(id, text)?;
            let end = markup::char_len(text);
            self.set_selection(id, end, end)?;
        } else {
            return Err(DomError::InvalidState(format!("{} is not editable", id)));
        }
        self.dispatch(Event {
            kind: EventKind::Input,
            target: id,
        });
        Ok(())
    }

    pub fn click(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        self.dispatch(Event {
            kind: EventKind::Click,
            target: id,
        });
        Ok(())
    }

    /// Fire `Submit` on a form, then collect its named fields. Listeners run to
    /// completion first; submission is never cancelled.
    pub fn submit(&mut self, form: NodeId) -> Result<FormSubmission> {
        if self.tag(form) != Some("form") {
            return Err(DomError::InvalidState(format!("{} is not a form", form)));
        }
        self.dispatch(Event {
            kind: EventKind::Submit,
            target: form,
        });

        let fields = self
            .subtree(form)
            .into_iter()
            .filter_map(|id| {
                let name = self.attribute(id, "name")?.to_string();
                let value = self.editable_text(id)?;
                Some((name, value))
            })
            .collect();
        Ok(FormSubmission { fields })
    }

    // ------------------------------------------------------------------
    // Structural observation
    // ------------------------------------------------------------------

    /// Watch insertions under `root` (its direct children only unless `subtree`)
    pub fn observe(&mut self, root: NodeId, subtree: bool, callback: MutationCallback) -> Result<()> {
        self.node(root)?;
        self.observers.push(Observer {
            root,
            subtree,
            callback,
        });
        Ok(())
    }

    fn notify_observers(&mut self, target: NodeId, added: NodeId) {
        if !self.is_connected(target) {
            return;
        }
        let callbacks: Vec<MutationCallback> = self
            .observers
            .iter()
            .filter(|o| {
                o.root == target || (o.subtree && self.is_inclusive_ancestor(o.root, target))
            })
            .map(|o| o.callback.clone())
            .collect();
        if callbacks.is_empty() {
            return;
        }

        let record = MutationRecord {
            target,
            added: vec![added],
        };
        for callback in callbacks {
            callback(self, &record);
        }
    }
}
