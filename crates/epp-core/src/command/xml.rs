//! Minimal element tree serialized through quick-xml

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// One XML element with attributes, optional text and child elements
///
/// Text and attribute values are escaped by the serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child element unconditionally
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child elements
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append `<name>value</name>` unless the value is blank
    pub fn text_child(self, name: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            return self;
        }
        self.child(Element::new(name).text(value))
    }

    /// Append a container child unless it ended up without children
    pub fn nonempty_child(self, child: Element) -> Self {
        if child.children.is_empty() {
            return self;
        }
        self.child(child)
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), crate::Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }

        writer.write_event(Event::Start(start)).map_err(write_error)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_error)?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(write_error)
    }

    /// Serialize as a standalone document with an XML declaration
    pub fn to_document(&self) -> Result<String, crate::Error> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))
            .map_err(write_error)?;
        self.write_to(&mut writer)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| crate::Error::data(format!("Serialized XML is not UTF-8: {}", e)))
    }
}

fn write_error(err: impl std::fmt::Display) -> crate::Error {
    crate::Error::data(format!("Failed to serialize XML: {}", err))
}
