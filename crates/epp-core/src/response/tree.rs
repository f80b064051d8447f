//! Namespace-resolved element tree built from an EPP document

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

/// One element, identified by namespace URI and local name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    namespace: Option<String>,
    local: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    /// Parse a whole document and return its root element
    pub fn parse(raw: &[u8]) -> Result<Node, crate::Error> {
        let xml = std::str::from_utf8(raw)
            .map_err(|e| crate::Error::data(format!("Response is not UTF-8: {}", e)))?;

        let mut reader = NsReader::from_str(xml);
        let mut stack: Vec<Node> = Vec::new();

        loop {
            let (ns, event) = reader.read_resolved_event().map_err(parse_error)?;
            let namespace = namespace_uri(&ns);

            match event {
                Event::Start(start) => stack.push(Node::from_start(namespace, &start)?),
                Event::Empty(start) => {
                    let node = Node::from_start(namespace, &start)?;
                    if let Some(root) = attach(&mut stack, node) {
                        return Ok(root);
                    }
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| crate::Error::data("Unbalanced end tag"))?;
                    if let Some(root) = attach(&mut stack, node) {
                        return Ok(root);
                    }
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text.unescape().map_err(parse_error)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => {
                    return Err(crate::Error::data("Document has no complete root element"));
                }
                _ => {}
            }
        }
    }

    fn from_start(namespace: Option<String>, start: &BytesStart<'_>) -> Result<Node, crate::Error> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(parse_error)?;
            let key = attr.key;
            if key.as_namespace_binding().is_some() {
                continue;
            }
            let name = String::from_utf8_lossy(key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(parse_error)?.into_owned();
            attrs.push((name, value));
        }

        Ok(Node {
            namespace,
            local: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attrs,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Namespace URI, if the element is bound to one
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local name (without prefix)
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Whether this element is `{ns}local`
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(ns)
    }

    /// Trimmed text content
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Attribute value by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child `{ns}local`
    pub fn child(&self, ns: &str, local: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.is(ns, local))
    }

    /// All children `{ns}local`, in document order
    pub fn children<'a>(&'a self, ns: &'a str, local: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.is(ns, local))
    }

    /// Trimmed text of child `{ns}local`, `None` when absent or blank
    pub fn child_text(&self, ns: &str, local: &str) -> Option<&str> {
        self.child(ns, local)
            .map(Node::text)
            .filter(|text| !text.is_empty())
    }

    /// Owned variant of [`Node::child_text`]
    pub fn child_string(&self, ns: &str, local: &str) -> Option<String> {
        self.child_text(ns, local).map(str::to_string)
    }
}

fn attach(stack: &mut [Node], node: Node) -> Option<Node> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            None
        }
        None => Some(node),
    }
}

fn namespace_uri(ns: &ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn parse_error(err: impl std::fmt::Display) -> crate::Error {
    crate::Error::data(format!("Failed to parse XML: {}", err))
}
