//! Owned, mutable XML element tree.
//!
//! `roxmltree` gives a strict, read-only view with precise error positions;
//! layers and their pass-through children need something they can own and
//! edit, so the parsed tree is copied into [`XmlElement`]. Names are stored as
//! local names; the default CAML namespace is re-declared on the root when the
//! tree is written.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;

/// 1-based line/column of a syntax error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Strict-parse failure with the parser's message and location.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct XmlSyntaxError {
    pub message: String,
    pub location: Option<TextLocation>,
}

impl From<roxmltree::Error> for XmlSyntaxError {
    fn from(err: roxmltree::Error) -> Self {
        let pos = err.pos();
        Self {
            message: err.to_string(),
            location: Some(TextLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Set `key` when `value` is present, remove it otherwise.
    pub fn set_optional_attr(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => self.set_attr(key, v),
            None => {
                self.attributes.shift_remove(key);
            }
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Immediate child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First immediate child element named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = XmlElement::new(node.tag_name().name());
        for attr in node.attributes() {
            element.set_attr(attr.name(), attr.value());
        }
        for child in node.children() {
            if child.is_element() {
                element.push(XmlElement::from_node(child));
            } else if child.is_text() {
                if let Some(text) = child.text().filter(|t| !t.trim().is_empty()) {
                    element.children.push(XmlNode::Text(text.to_string()));
                }
            }
        }
        element
    }
}

/// Strictly parse `text` and return its root element.
pub fn parse_document(text: &str) -> Result<XmlElement, XmlSyntaxError> {
    let doc = roxmltree::Document::parse(text)?;
    Ok(XmlElement::from_node(doc.root_element()))
}

/// Render `root` with an XML declaration and two-space indentation.
pub fn write_document(root: &XmlElement) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(root, 0, &mut out);
    out.push('\n');
    out
}

fn write_element(element: &XmlElement, depth: usize, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        let _ = write!(out, " {key}=\"{}\"", escape(value, true));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let has_text = element
        .children
        .iter()
        .any(|c| matches!(c, XmlNode::Text(_)));
    for child in &element.children {
        if !has_text {
            newline(depth + 1, out);
        }
        match child {
            XmlNode::Element(e) => write_element(e, if has_text { 0 } else { depth + 1 }, out),
            XmlNode::Text(t) => out.push_str(&escape(t, false)),
        }
    }
    if !has_text {
        newline(depth, out);
    }
    let _ = write!(out, "</{}>", element.name);
}

fn newline(depth: usize, out: &mut String) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn escape(raw: &str, attribute: bool) -> String {
    let mut s = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' if attribute => s.push_str("&quot;"),
            '\r' => s.push_str("&#13;"),
            '\n' if attribute => s.push_str("&#10;"),
            '\t' if attribute => s.push_str("&#9;"),
            c => s.push(c),
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_names_and_ordered_attributes() {
        let root = parse_document(
            r#"<caml xmlns="http://www.apple.com/CoreAnimation/1.0"><CALayer id="a" name="n" position="1 2"/></caml>"#,
        )
        .unwrap();
        assert_eq!(root.name, "caml");
        let layer = root.elements().next().unwrap();
        assert_eq!(layer.name, "CALayer");
        let keys: Vec<_> = layer.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "name", "position"]);
    }

    #[test]
    fn syntax_error_carries_location() {
        let err = parse_document("<caml>\n<CALayer id=abc/>\n</caml>").unwrap_err();
        let loc = err.location.expect("location");
        assert_eq!(loc.line, 2);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn writer_escapes_and_reparses() {
        let mut root = XmlElement::new("caml");
        let mut layer = XmlElement::new("CATextLayer").with_attr("string", "a \"b\" & <c>");
        layer.push(XmlElement::new("sublayers"));
        root.push(layer);

        let text = write_document(&root);
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        let back = parse_document(&text).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn carriage_returns_survive_reparse() {
        let root = parse_document("<a name=\"x&#13;y\">p&#13;q</a>").unwrap();
        assert_eq!(root.attr("name"), Some("x\ry"));
        let text = write_document(&root);
        assert!(text.contains("x&#13;y"));
        let again = parse_document(&text).unwrap();
        assert_eq!(again.attr("name"), Some("x\ry"));
        assert_eq!(again.text(), "p\rq");
    }

    #[test]
    fn text_content_survives() {
        let root = parse_document("<a><b>hello &amp; bye</b>\n  <c/></a>").unwrap();
        assert_eq!(root.child("b").unwrap().text(), "hello & bye");
        let again = parse_document(&write_document(&root)).unwrap();
        assert_eq!(again, root);
    }
}
