// ─── XML Document Layer ───
// Pack manifests are small, hand-authored documents that the decoders walk
// by tag name, so the event stream from quick-xml is materialized into an
// owned element tree. Child lookups are direct-children lookups only.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::error::{PackError, PackResult};

/// One element of a parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    name: String,
    attributes: HashMap<String, String>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accumulated, entity-unescaped text content of this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute value, or `""` when the attribute is absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }

    /// First direct child with the given tag name.
    pub fn first_child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All direct children with the given tag name, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Every direct child element, in document order.
    pub fn all_children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }

    /// Text content of the first direct child with the given tag name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.first_child(name).map(XmlElement::text)
    }
}

/// A fully parsed manifest document. Owns the whole tree; element
/// references handed out by the accessors are scoped to it.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Parse a document from its textual form.
    ///
    /// Text and attribute values come out entity-unescaped. Surrounding
    /// whitespace in text nodes is trimmed, which collapses the
    /// indentation of pretty-printed manifests to nothing.
    pub fn parse(input: &str) -> PackResult<Self> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(PackError::EmptyDocument)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text.unescape().map_err(quick_xml::Error::from)?;
                        current.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(data.as_ref()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.map(|root| Self { root }).ok_or(PackError::EmptyDocument)
    }
}

fn element_from(start: &BytesStart<'_>) -> PackResult<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(quick_xml::Error::from)?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(XmlElement {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_document() {
        let doc = XmlDocument::parse(
            r#"<ServerPack version="3.0">
                 <Server id="main">
                   <Module name="A"/>
                   <Module name="B"/>
                 </Server>
               </ServerPack>"#,
        )
        .unwrap();

        let root = doc.root();
        assert_eq!(root.name(), "ServerPack");
        assert_eq!(root.attr("version"), "3.0");

        let server = root.first_child("Server").unwrap();
        assert_eq!(server.attr("id"), "main");
        let names: Vec<_> = server.children("Module").map(|m| m.attr("name")).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn missing_attribute_is_empty() {
        let doc = XmlDocument::parse("<Module/>").unwrap();
        assert_eq!(doc.root().attr("name"), "");
    }

    #[test]
    fn text_is_unescaped() {
        let doc = XmlDocument::parse("<URL>http://host/?a=1&amp;b=&quot;2&quot;</URL>").unwrap();
        assert_eq!(doc.root().text(), "http://host/?a=1&b=\"2\"");
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let doc = XmlDocument::parse(r#"<Module name="Fish &amp; Chips"/>"#).unwrap();
        assert_eq!(doc.root().attr("name"), "Fish & Chips");
    }

    #[test]
    fn child_lookups_do_not_descend() {
        let doc = XmlDocument::parse(
            "<Module><Submodule><ConfigFile/></Submodule><ConfigFile/></Module>",
        )
        .unwrap();
        assert_eq!(doc.root().children("ConfigFile").count(), 1);
    }

    #[test]
    fn first_child_takes_document_order() {
        let doc = XmlDocument::parse("<M><URL>one</URL><URL>two</URL></M>").unwrap();
        assert_eq!(doc.root().child_text("URL"), Some("one"));
    }

    #[test]
    fn unbalanced_document_is_an_error() {
        assert!(XmlDocument::parse("<A><B></A>").is_err());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            XmlDocument::parse(""),
            Err(PackError::EmptyDocument)
        ));
    }
}
