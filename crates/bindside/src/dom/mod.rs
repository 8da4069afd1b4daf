#![forbid(unsafe_code)]

//! The document collaborator.
//!
//! The binding engine never touches a concrete DOM. It asks a [`Document`]
//! to resolve a scope, to find tagged nodes, to classify and write nodes, and
//! to attach listeners. A browser host implements the trait over real DOM
//! APIs; [`memory::MemoryDocument`] implements it over an in-memory tree.
//!
//! All methods take `&self`: implementations use interior mutability, and a
//! listener may write back into the document that is dispatching to it.

pub mod memory;

use std::fmt;
use std::rc::Rc;

/// Opaque handle to a node of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An event delivered to a [`Listener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    /// Event name, e.g. `"change"` or `"click"`.
    pub name: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Current editable value of the target, if it is a text control.
    pub value: Option<String>,
}

impl DomEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Event callback attached with [`Document::listen`].
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// Document query, classification, write, and listen capabilities.
pub trait Document {
    /// The whole-document scope.
    fn root(&self) -> NodeId;

    /// First node, in document order, matched by `selector`.
    fn select(&self, selector: &str) -> Option<NodeId>;

    /// Descendants of `scope`, in document order, that carry `attribute`
    /// (with exactly `value`, when given). `scope` itself is not included.
    fn query_attribute(&self, scope: NodeId, attribute: &str, value: Option<&str>)
    -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, attribute: &str) -> Option<String>;

    /// Whether the node is an editable text control (input, textarea).
    fn is_text_control(&self, node: NodeId) -> bool;

    /// Current editable value of a text control.
    fn control_value(&self, node: NodeId) -> Option<String>;

    fn set_control_value(&self, node: NodeId, text: &str);

    /// Replace the displayed content of a non-control node.
    fn set_content(&self, node: NodeId, text: &str);

    fn listen(&self, node: NodeId, event: &str, listener: Listener);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_roundtrip_and_display() {
        let id = NodeId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.to_string(), "#7");
    }

    #[test]
    fn event_builder() {
        let ev = DomEvent::new("change", NodeId(3)).with_value("Ada");
        assert_eq!(ev.name, "change");
        assert_eq!(ev.target, NodeId(3));
        assert_eq!(ev.value.as_deref(), Some("Ada"));
    }
}
