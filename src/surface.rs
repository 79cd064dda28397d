//! Drawing surface abstraction and the in-memory SVG document.
//!
//! The gauge never builds markup itself. It talks to a [`Surface`], which
//! hands out opaque [`ElementId`]s and accepts attribute patches. [`SvgDocument`]
//! is the stock implementation: it keeps the element tree in memory and
//! serializes it to an SVG string on demand.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::config::Container;
use crate::geometry::{Canvas, Point};

/// Handle to an element created on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

/// Inner shadow filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowStyle {
    pub opacity: f64,
    /// Blur standard deviation.
    pub size: f64,
    pub vertical_offset: f64,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            opacity: 0.2,
            size: 5.0,
            vertical_offset: 3.0,
        }
    }
}

/// Vector drawing capabilities a gauge needs.
///
/// Attribute names are SVG presentation attribute names (`fill`,
/// `stroke-width`, ...). The pseudo-attribute `text` replaces a text
/// element's content.
pub trait Surface {
    /// Start a fresh drawing of the given size.
    fn begin(&mut self, canvas: &Canvas);

    /// Create a path from SVG path data.
    fn create_path(&mut self, d: &str) -> ElementId;

    /// Create a text element anchored at `at`.
    fn create_text(&mut self, at: Point, content: &str) -> ElementId;

    /// Create a straight line segment.
    fn create_line(&mut self, from: Point, to: Point) -> ElementId;

    /// Set or overwrite attributes. Unknown ids are ignored.
    fn set_attributes(&mut self, id: ElementId, attrs: &[(&str, String)]);

    /// Set the element's `transform`.
    fn apply_transform(&mut self, id: ElementId, transform: &str);

    /// Delete an element. Unknown ids are ignored.
    fn remove(&mut self, id: ElementId);

    /// Move `id` in paint order so it is drawn directly above `anchor`.
    /// Unknown ids are ignored.
    fn place_after(&mut self, id: ElementId, anchor: ElementId);

    /// Define (or redefine) an inner shadow filter referenced as `url(#id)`.
    fn create_shadow_filter(&mut self, id: &str, style: &ShadowStyle);

    /// Drop the whole drawing from its container.
    fn detach(&mut self);

    /// Look up a host container by id.
    fn find_container(&self, _id: &str) -> Option<Container> {
        None
    }
}

// =============================================================================
// SvgDocument
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Path,
    Text,
    Line,
}

impl NodeKind {
    fn tag(self) -> &'static str {
        match self {
            NodeKind::Path => "path",
            NodeKind::Text => "text",
            NodeKind::Line => "line",
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    /// Attributes in first-set order.
    attrs: Vec<(String, String)>,
    content: String,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Vec::new(),
            content: String::new(),
        }
    }

    fn set(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory SVG tree. Elements are painted in creation order unless
/// restacked with [`Surface::place_after`].
#[derive(Debug, Default)]
pub struct SvgDocument {
    containers: HashMap<String, Container>,
    canvas: Option<Canvas>,
    nodes: HashMap<ElementId, Node>,
    /// Paint order, bottom first.
    order: Vec<ElementId>,
    filters: BTreeMap<String, ShadowStyle>,
    next_id: u64,
    detached: bool,
}

impl SvgDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container that gauges can be mounted into by id.
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.insert(container.id.clone(), container);
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    /// Attribute value of an element, if both exist.
    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.nodes.get(&id).and_then(|node| node.get(name))
    }

    /// Content of a text element.
    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.nodes
            .get(&id)
            .filter(|node| node.kind == NodeKind::Text)
            .map(|node| node.content.as_str())
    }

    pub fn filter(&self, id: &str) -> Option<&ShadowStyle> {
        self.filters.get(id)
    }

    /// Position of an element in paint order (0 is painted first).
    pub fn paint_index(&self, id: ElementId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    fn insert(&mut self, node: Node) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        self.nodes.insert(id, node);
        self.order.push(id);
        id
    }

    /// Serialize the drawing. A detached document serializes to nothing.
    pub fn to_svg(&self) -> String {
        if self.detached {
            return String::new();
        }

        let mut out = String::new();
        let (width, height, view_box, aspect) = match &self.canvas {
            Some(c) => (
                c.width.clone(),
                c.height.clone(),
                c.view_box,
                c.preserve_aspect_ratio,
            ),
            None => ("200".into(), "100".into(), (200.0, 100.0), None),
        };

        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}""#,
            escape_xml(&width),
            escape_xml(&height),
            view_box.0,
            view_box.1
        );
        if let Some(aspect) = aspect {
            let _ = write!(out, r#" preserveAspectRatio="{}""#, aspect);
        }
        out.push_str(">\n");

        if !self.filters.is_empty() {
            out.push_str("<defs>\n");
            for (id, style) in &self.filters {
                write_shadow_filter(&mut out, id, style);
            }
            out.push_str("</defs>\n");
        }

        for node in self.order.iter().filter_map(|id| self.nodes.get(id)) {
            let _ = write!(out, "<{}", node.kind.tag());
            for (name, value) in &node.attrs {
                let _ = write!(out, r#" {}="{}""#, name, escape_xml(value));
            }
            if node.kind == NodeKind::Text {
                let _ = writeln!(out, ">{}</text>", escape_xml(&node.content));
            } else {
                out.push_str("/>\n");
            }
        }

        out.push_str("</svg>\n");
        out
    }
}

impl Surface for SvgDocument {
    fn begin(&mut self, canvas: &Canvas) {
        self.nodes.clear();
        self.order.clear();
        self.filters.clear();
        self.canvas = Some(canvas.clone());
        self.detached = false;
    }

    fn create_path(&mut self, d: &str) -> ElementId {
        let mut node = Node::new(NodeKind::Path);
        node.set("d", d.to_string());
        self.insert(node)
    }

    fn create_text(&mut self, at: Point, content: &str) -> ElementId {
        let mut node = Node::new(NodeKind::Text);
        node.set("x", at.x.to_string());
        node.set("y", at.y.to_string());
        node.content = content.to_string();
        self.insert(node)
    }

    fn create_line(&mut self, from: Point, to: Point) -> ElementId {
        let mut node = Node::new(NodeKind::Line);
        node.set("x1", from.x.to_string());
        node.set("y1", from.y.to_string());
        node.set("x2", to.x.to_string());
        node.set("y2", to.y.to_string());
        self.insert(node)
    }

    fn set_attributes(&mut self, id: ElementId, attrs: &[(&str, String)]) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        for (name, value) in attrs {
            if *name == "text" {
                node.content = value.clone();
            } else {
                node.set(name, value.clone());
            }
        }
    }

    fn apply_transform(&mut self, id: ElementId, transform: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set("transform", transform.to_string());
        }
    }

    fn remove(&mut self, id: ElementId) {
        if self.nodes.remove(&id).is_some() {
            self.order.retain(|&other| other != id);
        }
    }

    fn place_after(&mut self, id: ElementId, anchor: ElementId) {
        if id == anchor || !self.nodes.contains_key(&id) || !self.nodes.contains_key(&anchor) {
            return;
        }
        self.order.retain(|&other| other != id);
        if let Some(at) = self.paint_index(anchor) {
            self.order.insert(at + 1, id);
        }
    }

    fn create_shadow_filter(&mut self, id: &str, style: &ShadowStyle) {
        self.filters.insert(id.to_string(), *style);
    }

    fn detach(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.filters.clear();
        self.detached = true;
    }

    fn find_container(&self, id: &str) -> Option<Container> {
        self.containers.get(id).cloned()
    }
}

/// Offset-blur-composite inner shadow.
fn write_shadow_filter(out: &mut String, id: &str, style: &ShadowStyle) {
    let _ = writeln!(out, r#"<filter id="{}">"#, escape_xml(id));
    let _ = writeln!(out, r#"<feOffset dx="0" dy="{}"/>"#, style.vertical_offset);
    let _ = writeln!(
        out,
        r#"<feGaussianBlur result="offset-blur" stdDeviation="{}"/>"#,
        style.size
    );
    out.push_str(
        "<feComposite operator=\"out\" in=\"SourceGraphic\" in2=\"offset-blur\" result=\"inverse\"/>\n",
    );
    let _ = writeln!(
        out,
        r#"<feFlood flood-color="black" flood-opacity="{}" result="color"/>"#,
        style.opacity
    );
    out.push_str(
        "<feComposite operator=\"in\" in=\"color\" in2=\"inverse\" result=\"shadow\"/>\n",
    );
    out.push_str("<feComposite operator=\"over\" in=\"shadow\" in2=\"SourceGraphic\"/>\n");
    out.push_str("</filter>\n");
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
