#![forbid(unsafe_code)]

//! In-memory [`Document`] implementation.
//!
//! A flat arena of element nodes with parent/child links, attributes, an
//! editable value (for `input` and `textarea`), displayed content, and
//! per-event listener lists. Each node also counts how many times it has
//! been written, which lets callers observe render traffic.
//!
//! Supported selectors for [`Document::select`]: `tag`, `#id`, `.class`,
//! `[attr]`, `[attr=value]` and `[attr="value"]`.
//!
//! # Re-entrancy
//!
//! [`MemoryDocument::dispatch`] copies the listener list out before calling
//! any listener, so listeners are free to write back into the document.

use std::cell::RefCell;
use std::fmt::Write as _;

use super::{Document, DomEvent, Listener, NodeId};

struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    value: String,
    content: String,
    listeners: Vec<(String, Listener)>,
    writes: u32,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
            value: String::new(),
            content: String::new(),
            listeners: Vec::new(),
            writes: 0,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn is_text_control(&self) -> bool {
        self.tag == "input" || self.tag == "textarea"
    }
}

enum Selector {
    Tag(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

impl Selector {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('#') {
            return (!id.is_empty()).then(|| Self::Id(id.to_owned()));
        }
        if let Some(class) = raw.strip_prefix('.') {
            return (!class.is_empty()).then(|| Self::Class(class.to_owned()));
        }
        if let Some(body) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            return match body.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim();
                    let value = value
                        .strip_prefix('"')
                        .and_then(|v| v.strip_suffix('"'))
                        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                        .unwrap_or(value);
                    Some(Self::Attribute {
                        name: name.trim().to_owned(),
                        value: Some(value.to_owned()),
                    })
                }
                None => Some(Self::Attribute {
                    name: body.trim().to_owned(),
                    value: None,
                }),
            };
        }
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
        Some(Self::Tag(raw.to_ascii_lowercase()))
    }

    fn matches(&self, node: &NodeData) -> bool {
        match self {
            Self::Tag(tag) => node.tag == *tag,
            Self::Id(id) => node.attribute("id") == Some(id.as_str()),
            Self::Class(class) => node
                .attribute("class")
                .is_some_and(|c| c.split_whitespace().any(|part| part == class)),
            Self::Attribute { name, value } => match (node.attribute(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

/// An in-memory element tree.
pub struct MemoryDocument {
    nodes: RefCell<Vec<NodeData>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.nodes.borrow().len())
            .finish()
    }
}

impl MemoryDocument {
    /// Create a document holding only a `body` root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![NodeData::new("body")]),
        }
    }

    #[must_use]
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new element under `parent` and return its id.
    ///
    /// An unknown `parent` attaches the element to the root.
    pub fn element(&self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        let mut data = NodeData::new(tag);
        data.attributes = attributes
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        nodes.push(data);
        let parent = if (parent.0 as usize) < id.0 as usize {
            parent
        } else {
            NodeId(0)
        };
        nodes[parent.0 as usize].children.push(id);
        id
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(data) = nodes.get_mut(node.0 as usize) else {
            return;
        };
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => data.attributes.push((name.to_owned(), value.to_owned())),
        }
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(node.0 as usize).map(|n| n.tag.clone())
    }

    /// Editable value of a node (empty for non-controls).
    #[must_use]
    pub fn value(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    /// Displayed content of a node.
    #[must_use]
    pub fn content(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .map(|n| n.content.clone())
            .unwrap_or_default()
    }

    /// What the user sees: the value of a control, the content otherwise.
    #[must_use]
    pub fn text(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        match nodes.get(node.0 as usize) {
            Some(n) if n.is_text_control() => n.value.clone(),
            Some(n) => n.content.clone(),
            None => String::new(),
        }
    }

    /// How many times the binding layer has written into `node`.
    #[must_use]
    pub fn write_count(&self, node: NodeId) -> u32 {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .map_or(0, |n| n.writes)
    }

    #[must_use]
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.nodes.borrow().get(node.0 as usize).map_or(0, |n| {
            n.listeners.iter().filter(|(name, _)| name == event).count()
        })
    }

    /// Simulate user typing: replace the control value without notifying.
    pub fn type_text(&self, node: NodeId, text: &str) {
        if let Some(data) = self.nodes.borrow_mut().get_mut(node.0 as usize) {
            data.value = text.to_owned();
        }
    }

    /// Dispatch `event` on `node`. Returns the number of listeners invoked.
    pub fn dispatch(&self, node: NodeId, event: &str) -> usize {
        let (listeners, value) = {
            let nodes = self.nodes.borrow();
            let Some(data) = nodes.get(node.0 as usize) else {
                return 0;
            };
            let listeners: Vec<Listener> = data
                .listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, l)| Listener::clone(l))
                .collect();
            let value = data.is_text_control().then(|| data.value.clone());
            (listeners, value)
        };
        let ev = DomEvent {
            name: event.to_owned(),
            target: node,
            value,
        };
        for listener in &listeners {
            listener(&ev);
        }
        listeners.len()
    }

    /// Type `text` into a control and fire `change` on it.
    pub fn change(&self, node: NodeId, text: &str) -> usize {
        self.type_text(node, text);
        self.dispatch(node, "change")
    }

    /// Render the tree as indented markup.
    #[must_use]
    pub fn dump(&self) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        dump_node(&nodes, NodeId(0), 0, &mut out);
        out
    }

    fn descendants(nodes: &[NodeData], scope: NodeId, out: &mut Vec<NodeId>) {
        let Some(data) = nodes.get(scope.0 as usize) else {
            return;
        };
        for &child in &data.children {
            out.push(child);
            Self::descendants(nodes, child, out);
        }
    }
}

fn dump_node(nodes: &[NodeData], id: NodeId, depth: usize, out: &mut String) {
    let Some(node) = nodes.get(id.0 as usize) else {
        return;
    };
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}<{}", node.tag);
    for (k, v) in &node.attributes {
        let _ = write!(out, " {k}=\"{v}\"");
    }
    if node.is_text_control() {
        let _ = write!(out, " value=\"{}\"", node.value);
    }
    out.push('>');
    if node.children.is_empty() {
        if !node.is_text_control() {
            out.push_str(&node.content);
            let _ = write!(out, "</{}>", node.tag);
        }
        out.push('\n');
        return;
    }
    out.push('\n');
    if !node.content.is_empty() {
        let _ = writeln!(out, "{indent}  {}", node.content);
    }
    for &child in &node.children {
        dump_node(nodes, child, depth + 1, out);
    }
    let _ = writeln!(out, "{indent}</{}>", node.tag);
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root_id()
    }

    fn select(&self, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        let nodes = self.nodes.borrow();
        if selector.matches(&nodes[0]) {
            return Some(NodeId(0));
        }
        let mut order = Vec::new();
        Self::descendants(&nodes, NodeId(0), &mut order);
        order
            .into_iter()
            .find(|id| selector.matches(&nodes[id.0 as usize]))
    }

    fn query_attribute(
        &self,
        scope: NodeId,
        attribute: &str,
        value: Option<&str>,
    ) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut order = Vec::new();
        Self::descendants(&nodes, scope, &mut order);
        order.retain(|id| match (nodes[id.0 as usize].attribute(attribute), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        });
        order
    }

    fn attribute(&self, node: NodeId, attribute: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .and_then(|n| n.attribute(attribute).map(str::to_owned))
    }

    fn is_text_control(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .is_some_and(NodeData::is_text_control)
    }

    fn control_value(&self, node: NodeId) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .filter(|n| n.is_text_control())
            .map(|n| n.value.clone())
    }

    fn set_control_value(&self, node: NodeId, text: &str) {
        if let Some(data) = self.nodes.borrow_mut().get_mut(node.0 as usize) {
            data.value = text.to_owned();
            data.writes += 1;
        }
    }

    fn set_content(&self, node: NodeId, text: &str) {
        if let Some(data) = self.nodes.borrow_mut().get_mut(node.0 as usize) {
            data.content = text.to_owned();
            data.writes += 1;
        }
    }

    fn listen(&self, node: NodeId, event: &str, listener: Listener) {
        if let Some(data) = self.nodes.borrow_mut().get_mut(node.0 as usize) {
            data.listeners.push((event.to_owned(), listener));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn page() -> (MemoryDocument, NodeId, NodeId, NodeId) {
        let doc = MemoryDocument::new();
        let section = doc.element(doc.root_id(), "section", &[("id", "profile")]);
        let input = doc.element(section, "input", &[("data-prop", "firstName")]);
        let span = doc.element(section, "span", &[("data-prop", "firstName"), ("class", "a b")]);
        (doc, section, input, span)
    }

    #[test]
    fn selectors_resolve_in_document_order() {
        let (doc, section, input, span) = page();
        assert_eq!(doc.select("#profile"), Some(section));
        assert_eq!(doc.select("input"), Some(input));
        assert_eq!(doc.select(".b"), Some(span));
        assert_eq!(doc.select("[data-prop]"), Some(input));
        assert_eq!(doc.select("[data-prop=\"firstName\"]"), Some(input));
        assert_eq!(doc.select("body"), Some(doc.root_id()));
        assert_eq!(doc.select("#missing"), None);
        assert_eq!(doc.select("div > p"), None);
    }

    #[test]
    fn query_excludes_scope_and_keeps_order() {
        let (doc, section, input, span) = page();
        doc.set_attribute(section, "data-prop", "firstName");
        assert_eq!(
            doc.query_attribute(section, "data-prop", Some("firstName")),
            vec![input, span]
        );
        assert_eq!(
            doc.query_attribute(doc.root_id(), "data-prop", Some("firstName")),
            vec![section, input, span]
        );
        assert!(doc.query_attribute(section, "data-prop", Some("other")).is_empty());
    }

    #[test]
    fn writes_are_counted_per_node() {
        let (doc, _, input, span) = page();
        doc.set_control_value(input, "Ada");
        doc.set_content(span, "Ada");
        doc.set_content(span, "Ada");
        assert_eq!(doc.text(input), "Ada");
        assert_eq!(doc.text(span), "Ada");
        assert_eq!(doc.write_count(input), 1);
        assert_eq!(doc.write_count(span), 2);
    }

    #[test]
    fn dispatch_allows_reentrant_writes() {
        let (doc, _, input, span) = page();
        let doc = Rc::new(doc);
        let seen = Rc::new(Cell::new(0));
        let (doc2, seen2) = (Rc::clone(&doc), Rc::clone(&seen));
        doc.listen(
            input,
            "change",
            Rc::new(move |ev: &DomEvent| {
                seen2.set(seen2.get() + 1);
                doc2.set_content(span, ev.value.as_deref().unwrap_or_default());
            }),
        );
        assert_eq!(doc.listener_count(input, "change"), 1);
        assert_eq!(doc.change(input, "Grace"), 1);
        assert_eq!(seen.get(), 1);
        assert_eq!(doc.content(span), "Grace");
        assert_eq!(doc.dispatch(input, "click"), 0);
    }

    #[test]
    fn dump_shows_values_and_content() {
        let (doc, _, input, span) = page();
        doc.set_control_value(input, "Ada");
        doc.set_content(span, "Ada!");
        let dump = doc.dump();
        assert!(dump.contains("value=\"Ada\""));
        assert!(dump.contains(">Ada!</span>"));
        assert!(dump.starts_with("<body>"));
    }
}
