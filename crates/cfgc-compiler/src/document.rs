//! Owned document tree handed to the compiler passes.
//!
//! The compiler only needs element names, attributes, ordered children and
//! concatenated text content. [`Document::parse_str`] builds that tree from
//! XML with `quick-xml`; tests can also assemble trees directly.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{CompileError, CompileResult};

/// Kind of a document node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

/// A node of the definition tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocNode {
    pub kind: NodeKind,
    /// Element name; empty for text nodes.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<DocNode>,
    /// Text of a text node; empty for elements.
    pub text: String,
}

impl DocNode {
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn text_node(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text,
            name: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: text.into(),
        }
    }

    /// Builder: add an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: append a child node.
    pub fn with_child(mut self, child: DocNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append a text child.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(DocNode::text_node(text))
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Value of the first attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of this node and all its descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind {
            NodeKind::Text => out.push_str(&self.text),
            NodeKind::Element => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// A parsed definition document and the directory blob paths resolve against.
#[derive(Clone, Debug)]
pub struct Document {
    root: DocNode,
    base_dir: PathBuf,
}

impl Document {
    pub fn new(root: DocNode, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            root,
            base_dir: base_dir.into(),
        }
    }

    /// Read and parse an XML file. Blob paths resolve against its directory.
    pub fn load(path: &Path) -> CompileResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let base_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::parse_str(&text, base_dir)
    }

    /// Parse XML text.
    ///
    /// Whitespace around text content is trimmed and whitespace-only text
    /// is dropped. Comments, processing instructions and the XML
    /// declaration are ignored.
    pub fn parse_str(xml: &str, base_dir: impl Into<PathBuf>) -> CompileResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<DocNode> = Vec::new();
        let mut root: Option<DocNode> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                CompileError::Parse(format!("at byte {}: {e}", reader.buffer_position()))
            })?;
            match event {
                Event::Start(ref e) => stack.push(element_from(e)?),
                Event::Empty(ref e) => {
                    let node = element_from(e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| CompileError::Parse("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(ref t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| CompileError::Parse(e.to_string()))?
                        .into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(DocNode::text_node(text));
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(DocNode::text_node(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(CompileError::Parse(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or(CompileError::EmptyDocument)?;
        Ok(Self::new(root, base_dir))
    }

    pub fn root(&self) -> &DocNode {
        &self.root
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn element_from(start: &BytesStart<'_>) -> CompileResult<DocNode> {
    let mut node = DocNode::element(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CompileError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| CompileError::Parse(e.to_string()))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut [DocNode], root: &mut Option<DocNode>, node: DocNode) -> CompileResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(CompileError::Parse(format!(
            "second root element <{}>",
            node.name
        )));
    }
    *root = Some(node);
    Ok(())
}
