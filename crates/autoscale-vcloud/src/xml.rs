//! Minimal namespaced-XML element tree over the quick-xml event API.
//!
//! vCloud documents are read positionally by qualified name (an attribute
//! here, a nested leaf there) and the recompose builder copies and rewrites
//! a cached template subtree, so the driver works on a small owned tree
//! rather than streaming events. Element and attribute names keep their
//! source prefix (`ovf:Info`); lookups match on the local part only.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;
use std::str;

use crate::error::{VcloudError, VcloudResult};

/// One XML element: qualified name, attributes, child elements and any
/// directly-contained text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

fn local_part(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Local (prefix-stripped) element name.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute lookup by local name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_part(k) == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key, value));
        }
    }

    /// First descendant (depth-first) whose local name matches.
    pub fn find(&self, local: &str) -> Option<&Element> {
        for child in &self.children {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find(local) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, local: &str) -> Option<&mut Element> {
        for child in &mut self.children {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find_mut(local) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (depth-first) whose local name matches.
    pub fn find_all<'a>(&'a self, local: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect_into(local, &mut out);
        out
    }

    fn collect_into<'a>(&'a self, local: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.local_name() == local {
                out.push(child);
            }
            child.collect_into(local, out);
        }
    }

    /// Serialise this element (and its subtree) to an XML string with a
    /// leading declaration.
    pub fn to_xml(&self) -> VcloudResult<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| VcloudError::parse(format!("XML write error: {e}")))?;
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| VcloudError::parse(format!("XML output not UTF-8: {e}")))
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, el: &Element) -> VcloudResult<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() && el.text.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| VcloudError::parse(format!("XML write error: {e}")))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| VcloudError::parse(format!("XML write error: {e}")))?;
    if !el.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&el.text)))
            .map_err(|e| VcloudError::parse(format!("XML write error: {e}")))?;
    }
    for child in &el.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(|e| VcloudError::parse(format!("XML write error: {e}")))?;
    Ok(())
}

/// Parse a provider document into an element tree.
pub fn parse_document(xml: &str) -> VcloudResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let el = element_from_start(e)?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| VcloudError::parse("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::Text(ref t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| VcloudError::parse(format!("bad text content: {e}")))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(VcloudError::parse(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            Ok(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(VcloudError::parse("unclosed element at end of document"));
    }
    root.ok_or_else(|| VcloudError::parse("document has no root element"))
}

fn element_from_start(e: &BytesStart) -> VcloudResult<Element> {
    let name = str::from_utf8(e.name().as_ref())
        .map_err(|_| VcloudError::parse("invalid UTF-8 in tag name"))?
        .to_string();

    let mut el = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| VcloudError::parse(format!("bad attribute: {e}")))?;
        let key = str::from_utf8(attr.key.as_ref())
            .map_err(|_| VcloudError::parse("invalid UTF-8 in attribute name"))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| VcloudError::parse(format!("bad attribute value: {e}")))?
            .to_string();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> VcloudResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
        Ok(())
    } else if root.is_none() {
        *root = Some(el);
        Ok(())
    } else {
        Err(VcloudError::parse("multiple root elements"))
    }
}
