//! Arena DOM built from html5ever, used by the snapshot driver.

pub mod selector;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::HashMap;

pub use selector::{parse_selector_list, Selector as CssSelector};

pub type NodeId = usize;

/// A node in the document arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    Element,
    Text,
    Document,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

impl Node {
    fn new(node_type: NodeType, tag: &str, text: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: HashMap::new(),
            text: text.to_string(),
            children: Vec::new(),
            parent,
            node_type,
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .map(|c| c.split_whitespace().any(|cl| cl == class))
            .unwrap_or(false)
    }

    /// Hidden by its own markup: `hidden`, `aria-hidden`, or an inline style.
    pub fn is_hidden_self(&self) -> bool {
        if !self.is_element() {
            return false;
        }
        if self.attributes.contains_key("hidden") || self.get_attr("aria-hidden") == Some("true")
        {
            return true;
        }
        if let Some(style) = self.get_attr("style") {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            return compact.contains("display:none") || compact.contains("visibility:hidden");
        }
        false
    }
}

/// A parsed HTML document stored as a flat arena. Node 0 is the document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Element descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.node(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            if node.is_element() {
                out.push(current);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.nodes[parent].parent;
        }
        out
    }

    /// Element siblings before `id`, nearest first.
    pub fn previous_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return Vec::new();
        };
        let children = &self.nodes[parent].children;
        let position = children.iter().position(|&child| child == id).unwrap_or(0);
        children[..position]
            .iter()
            .rev()
            .filter(|&&child| self.nodes[child].is_element())
            .copied()
            .collect()
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return true;
        };
        node.is_hidden_self()
            || self
                .ancestors(id)
                .into_iter()
                .any(|a| self.nodes[a].is_hidden_self())
    }

    /// Text of the node and its children, whitespace collapsed.
    pub fn text_content(&self, id: NodeId) -> String {
        self.collect_text_where(id, &|_| true)
    }

    /// Like `text_content` but skipping hidden subtrees.
    pub fn visible_text(&self, id: NodeId) -> String {
        self.collect_text_where(id, &|node: &Node| !node.is_hidden_self())
    }

    fn collect_text_where(&self, id: NodeId, keep: &dyn Fn(&Node) -> bool) -> String {
        let mut result = String::new();
        self.collect_text(id, keep, &mut result);
        result.trim().to_string()
    }

    fn collect_text(&self, id: NodeId, keep: &dyn Fn(&Node) -> bool, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match node.node_type {
            NodeType::Text => {
                let collapsed = node.text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !collapsed.is_empty() {
                    if !out.is_empty() && !out.ends_with(' ') {
                        out.push(' ');
                    }
                    out.push_str(&collapsed);
                }
            }
            _ => {
                if !keep(node) {
                    return;
                }
                for &child in &node.children {
                    self.collect_text(child, keep, out);
                }
            }
        }
    }

    pub fn title(&self) -> String {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.nodes[id].tag == "title")
            .map(|id| self.text_content(id))
            .unwrap_or_default()
    }

    /// Serialize a node back to HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match node.node_type {
            NodeType::Text => out.push_str(&escape_text(&node.text)),
            NodeType::Document => {
                for &child in &node.children {
                    self.write_html(child, out);
                }
            }
            NodeType::Element => {
                out.push('<');
                out.push_str(&node.tag);
                let mut attrs: Vec<_> = node.attributes.iter().collect();
                attrs.sort();
                for (name, value) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, value.replace('"', "&quot;")));
                }
                out.push('>');
                if VOID_TAGS.contains(&node.tag.as_str()) {
                    return;
                }
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{}>", node.tag));
            }
        }
    }

    /// Elements under `scope` (or the whole document) matching any selector.
    pub fn select(&self, scope: Option<NodeId>, selectors: &[CssSelector]) -> Vec<NodeId> {
        let root = scope.unwrap_or_else(|| self.root());
        self.descendants(root)
            .into_iter()
            .filter(|&id| selectors.iter().any(|s| selector::matches(self, id, s)))
            .collect()
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Parse an HTML string into a `Document`.
pub fn parse_html(html: &str) -> Document {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut doc = Document {
        nodes: vec![Node::new(NodeType::Document, "", "", None)],
    };

    // Reading from an in-memory slice cannot fail; an empty document is the fallback.
    let Ok(dom) = parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
    else {
        return doc;
    };

    for child in dom.document.children.borrow().iter() {
        convert_node(child, 0, &mut doc);
    }
    doc
}

fn convert_node(handle: &Handle, parent: NodeId, doc: &mut Document) {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.to_string();
            let id = doc.nodes.len();
            let mut node = Node::new(NodeType::Element, &tag, "", Some(parent));
            for attr in attrs.borrow().iter() {
                node.attributes
                    .insert(attr.name.local.to_string(), attr.value.to_string());
            }
            doc.nodes.push(node);
            doc.nodes[parent].children.push(id);

            // Keep script/style/svg as empty shells
            if tag == "script" || tag == "style" || tag == "svg" {
                return;
            }
            for child in handle.children.borrow().iter() {
                convert_node(child, id, doc);
            }
        }
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if text.trim().is_empty() {
                return;
            }
            let id = doc.nodes.len();
            doc.nodes
                .push(Node::new(NodeType::Text, "", &text, Some(parent)));
            doc.nodes[parent].children.push(id);
        }
        _ => {} // Comments, PIs, doctypes → ignored
    }
}
