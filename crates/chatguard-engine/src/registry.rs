//! Monitored element registry

use chatguard_core::{ElementKind, FlagState, ListenerId, MonitoredElement, NodeId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Every editable surface discovered on the page, keyed by node
pub struct Registry {
    elements: DashMap<NodeId, MonitoredElement>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            elements: DashMap::new(),
        }
    }

    /// Start tracking `node`. Returns false if it was already tracked.
    pub fn track(&self, node: NodeId, kind: ElementKind) -> bool {
        match self.elements.entry(node) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(MonitoredElement::new(node, kind));
                true
            }
        }
    }

    pub fn get(&self, node: NodeId) -> Option<MonitoredElement> {
        self.elements.get(&node).map(|e| e.clone())
    }

    pub fn is_listening(&self, node: NodeId) -> bool {
        self.elements.get(&node).is_some_and(|e| e.is_listening())
    }

    pub fn set_listener(&self, node: NodeId, listener: Option<ListenerId>) {
        if let Some(mut element) = self.elements.get_mut(&node) {
            element.listener = listener;
        }
    }

    /// Nodes that currently have an input listener attached
    pub fn listening(&self) -> Vec<NodeId> {
        self.elements
            .iter()
            .filter(|e| e.is_listening())
            .map(|e| e.node)
            .collect()
    }

    pub fn record_verdict(&self, node: NodeId, flag: FlagState, tokens: Vec<String>) {
        if let Some(mut element) = self.elements.get_mut(&node) {
            element.flag = flag;
            element.tokens = tokens;
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
