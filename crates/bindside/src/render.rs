#![forbid(unsafe_code)]

//! Writing property values into tagged nodes.
//!
//! [`Renderer`] finds the nodes bound to a property inside a scope and writes
//! a value into them: the editable value of text controls, the displayed
//! content of everything else.
//!
//! [`RenderPlan`] collects the writes one property change causes so they can
//! be computed completely before any of them touches the document. A plan
//! either applies in full or, if building it failed, not at all.

use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::value::Value;

/// Locates and writes property-tagged nodes.
#[derive(Clone)]
pub struct Renderer {
    document: Rc<dyn Document>,
    attribute: String,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    #[must_use]
    pub fn new(document: Rc<dyn Document>, attribute: impl Into<String>) -> Self {
        Self {
            document,
            attribute: attribute.into(),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Rc<dyn Document> {
        &self.document
    }

    /// Nodes inside `scope` whose binding attribute equals `name`, in
    /// document order. May be empty.
    #[must_use]
    pub fn nodes_for(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.document
            .query_attribute(scope, &self.attribute, Some(name))
    }

    /// Write `value` into every node of `nodes`.
    pub fn render(&self, nodes: &[NodeId], value: &Value) {
        let text = value.to_string();
        for &node in nodes {
            if self.document.is_text_control(node) {
                self.document.set_control_value(node, &text);
            } else {
                self.document.set_content(node, &text);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    property: String,
    nodes: Vec<NodeId>,
    value: Value,
}

/// Writes pending for one property change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPlan {
    steps: Vec<Step>,
}

impl RenderPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: impl Into<String>, nodes: Vec<NodeId>, value: Value) {
        self.steps.push(Step {
            property: property.into(),
            nodes,
            value,
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Properties in the plan, in write order.
    #[must_use]
    pub fn properties(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.property.as_str()).collect()
    }

    /// Total node writes the plan performs.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.steps.iter().map(|s| s.nodes.len()).sum()
    }

    /// Apply every step in order. Returns the number of nodes written.
    pub fn apply(self, renderer: &Renderer) -> usize {
        let nodes = self.node_count();
        for step in &self.steps {
            renderer.render(&step.nodes, &step.value);
        }
        tracing::debug!(
            message = "render.apply",
            properties = self.steps.len(),
            nodes
        );
        nodes
    }
}
