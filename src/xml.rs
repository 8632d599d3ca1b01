// src/xml.rs
//! Minimal XML element tree
//!
//! Manifests and package inventories are small XML documents. This module
//! keeps them as a plain element tree and converts to and from bytes with
//! quick-xml, so callers never deal with event streams directly.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("Document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// An XML element with attributes, child elements and text content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style text setter
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing value of the same key
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Iterate over direct children with the given element name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parse a document and return its root element
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let content = std::str::from_utf8(bytes)?;
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Malformed("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    append_text(&mut stack, std::str::from_utf8(&data)?);
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctypes
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Malformed(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| XmlError::Malformed("document has no root element".to_string()))
    }

    /// Serialize as an indented UTF-8 document with an XML declaration
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, self)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XmlError::Malformed(format!(
                "multiple root elements (second is <{}>)",
                element.name
            )));
        }
    }
    Ok(())
}

fn append_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        current.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_parse() {
        let doc = Element::new("packages")
            .with_child(
                Element::new("package")
                    .with_attr("name", "build-1.zip")
                    .with_attr("size", "42"),
            )
            .with_child(Element::new("note").with_text("kept <as> text & all"));

        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("&lt;as&gt;"));

        let parsed = Element::parse(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_attribute_escaping() {
        let doc = Element::new("file").with_attr("name", "a \"quoted\" & <odd> name");
        let parsed = Element::parse(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.attr("name"), Some("a \"quoted\" & <odd> name"));
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut element = Element::new("x").with_attr("k", "1");
        element.set_attr("k", "2");
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.attr("k"), Some("2"));
        assert_eq!(element.attr("missing"), None);
    }

    #[test]
    fn test_children_named() {
        let doc = Element::new("root")
            .with_child(Element::new("a"))
            .with_child(Element::new("b"))
            .with_child(Element::new("a"));
        assert_eq!(doc.children_named("a").count(), 2);
        assert_eq!(doc.children_named("c").count(), 0);
    }

    #[test]
    fn test_parse_ignores_comments_and_declaration() {
        let doc = Element::parse(
            b"<?xml version=\"1.0\"?>\n<!-- history -->\n<packages>\n  <package name=\"a.zip\"/>\n</packages>\n",
        )
        .unwrap();
        assert_eq!(doc.name, "packages");
        assert_eq!(doc.children.len(), 1);
        assert!(doc.text.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Element::parse(b"").is_err());
        assert!(Element::parse(b"not xml at all").is_err());
        assert!(Element::parse(b"<a><b></a>").is_err());
        assert!(Element::parse(b"<a/><b/>").is_err());
        assert!(Element::parse(&[0xff, 0xfe, 0x00]).is_err());
    }
}
