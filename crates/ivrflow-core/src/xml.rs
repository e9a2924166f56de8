//! XML ingestion into a generic nested tree.
//!
//! Every child element is stored under its tag name in a sequence, even when
//! it occurs only once, so callers never have to distinguish "one" from
//! "many". Tags keep the order in which they first appear.

use roxmltree::{Document, ParsingOptions};

use crate::{Error, Result};

/// One element of the ingested document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    text: String,
    children: Vec<(String, Vec<XmlElement>)>,
}

impl XmlElement {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed concatenation of the element's own text nodes.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Child groups in order of first appearance.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[XmlElement])> {
        self.children
            .iter()
            .map(|(name, elements)| (name.as_str(), elements.as_slice()))
    }

    /// All children named `name`; empty when there are none.
    pub fn field(&self, name: &str) -> &[XmlElement] {
        self.children
            .iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, elements)| elements.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&XmlElement> {
        self.field(name).first()
    }

    /// Follow a path of child names, taking the first element at each step.
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names
            .iter()
            .try_fold(self, |element, name| element.first(name))
    }

    /// Text of the first `name` child, `None` when missing or blank.
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.first(name)
            .map(XmlElement::text)
            .filter(|text| !text.is_empty())
    }

    /// Non-blank texts of every `name` child, in document order.
    pub fn texts_of(&self, name: &str) -> Vec<&str> {
        self.field(name)
            .iter()
            .map(XmlElement::text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    fn push_child(&mut self, child: XmlElement) {
        match self.children.iter_mut().find(|(tag, _)| *tag == child.name) {
            Some((_, elements)) => elements.push(child),
            None => self.children.push((child.name.clone(), vec![child])),
        }
    }
}

/// A parsed document: its root element and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    root: XmlElement,
}

impl XmlTree {
    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}

/// Parse raw XML text into an [`XmlTree`].
///
/// Fails with `MalformedInput` when the text is not well-formed XML. No other
/// validation happens here.
pub fn parse_document(text: &str) -> Result<XmlTree> {
    let text = text.trim_start_matches('\u{feff}');
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(text, options).map_err(|err| {
        let pos = err.pos();
        Error::malformed_input(err.to_string())
            .with_operation("xml::parse_document")
            .with_context("line", pos.row.to_string())
            .with_context("column", pos.col.to_string())
    })?;

    Ok(XmlTree {
        root: convert(document.root_element()),
    })
}

fn convert(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let mut element = XmlElement {
        name: node.tag_name().name().to_string(),
        ..XmlElement::default()
    };

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            element.push_child(convert(child));
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    element.text = text.trim().to_string();
    element
}
