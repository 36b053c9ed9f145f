//! Owned XML element tree built with quick-xml

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::selector::Selector;
use crate::errors::{FetchError, FetchResult};

/// A child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An XML element with its attributes in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element name without namespace prefix
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value in place
    pub fn set_attr<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Read one property from the inline `style` attribute
    pub fn style_property(&self, property: &str) -> Option<String> {
        self.attr("style").and_then(|style| {
            parse_style(style)
                .into_iter()
                .find(|(key, _)| key == property)
                .map(|(_, value)| value)
        })
    }

    /// Set one property of the inline `style` attribute, keeping the others
    pub fn set_style_property(&mut self, property: &str, value: &str) {
        let mut declarations = self.attr("style").map(parse_style).unwrap_or_default();
        match declarations.iter_mut().find(|(key, _)| key == property) {
            Some(slot) => slot.1 = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }
        let style = declarations
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect::<Vec<_>>()
            .join(";");
        self.set_attr("style", style);
    }

    /// First element in document order (self included) matched by `selector`
    pub fn find(&self, selector: &Selector) -> Option<&Element> {
        if selector.matches(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            Node::Element(element) => element.find(selector),
            _ => None,
        })
    }

    pub fn find_mut(&mut self, selector: &Selector) -> Option<&mut Element> {
        if selector.matches(self) {
            return Some(self);
        }
        for child in self.children.iter_mut() {
            if let Node::Element(element) = child {
                if let Some(found) = element.find_mut(selector) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(out),
                Node::Text(text) => out.push_str(&escape(text.as_str())),
                Node::CData(text) => {
                    out.push_str("<![CDATA[");
                    out.push_str(text);
                    out.push_str("]]>");
                }
                Node::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// A parsed XML document with a single root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    declaration: bool,
    root: Element,
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: false,
            root,
        }
    }

    /// Parse a complete document; partial or malformed input is an error
    pub fn parse(text: &str) -> FetchResult<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut declaration = false;

        loop {
            let event = reader.read_event().map_err(|e| {
                FetchError::parse(format!("{e} at position {}", reader.buffer_position()))
            })?;

            match event {
                Event::Decl(_) => declaration = true,
                Event::Start(ref e) => stack.push(element_from_start(e)?),
                Event::Empty(ref e) => {
                    let element = element_from_start(e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| FetchError::parse("Unexpected closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| FetchError::parse(format!("Invalid text: {e}")))?
                        .into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text)),
                        None if text.trim().is_empty() => {}
                        None => return Err(FetchError::parse("Text outside root element")),
                    }
                }
                Event::CData(e) => {
                    let text = utf8(e.into_inner().into_owned())?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::CData(text));
                    }
                }
                Event::Comment(e) => {
                    let text = utf8(e.into_inner().into_owned())?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Comment(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(FetchError::parse(format!("Unclosed element <{}>", open.name)));
        }

        let root = root.ok_or_else(|| FetchError::parse("Document has no root element"))?;
        Ok(Self { declaration, root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Whether this is a vector-image document (root element `<svg>`)
    pub fn is_svg(&self) -> bool {
        self.root.local_name() == "svg"
    }

    /// Look up the first element matching a selector string
    pub fn select(&self, spec: &str) -> Option<&Element> {
        Selector::parse(spec).and_then(|selector| self.root.find(&selector))
    }

    /// Set the fill colour of the region addressed by `spec`
    ///
    /// Returns `false` when no such region exists; the document is then
    /// left untouched.
    pub fn set_fill(&mut self, spec: &str, colour: &str) -> bool {
        let Some(selector) = Selector::parse(spec) else {
            return false;
        };
        match self.root.find_mut(&selector) {
            Some(region) => {
                region.set_style_property("fill", colour);
                true
            }
            None => false,
        }
    }

    /// Size the root element for display
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.root.set_attr("width", width.to_string());
        self.root.set_attr("height", height.to_string());
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        self.root.write_to(&mut out);
        out
    }
}

fn element_from_start(start: &BytesStart) -> FetchResult<Element> {
    let mut element = Element::new(utf8(start.name().as_ref().to_vec())?);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| FetchError::parse(format!("Invalid attribute: {e}")))?;
        let key = utf8(attr.key.as_ref().to_vec())?;
        let value = attr
            .unescape_value()
            .map_err(|e| FetchError::parse(format!("Invalid attribute value: {e}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> FetchResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_some() => return Err(FetchError::parse("Multiple root elements")),
        None => *root = Some(element),
    }
    Ok(())
}

fn utf8(bytes: Vec<u8>) -> FetchResult<String> {
    String::from_utf8(bytes).map_err(|e| FetchError::parse(format!("Invalid UTF-8: {e}")))
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (key, value) = declaration.split_once(':')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}
