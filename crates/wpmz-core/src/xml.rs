//! Minimal XML element tree on top of quick-xml.
//!
//! Mission documents are small, so they are read fully into an element tree
//! and written with an explicit element order.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;
use std::str::FromStr;

/// A parsed element. Names are local names, namespace prefixes are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn required(&self, name: &str) -> Result<&Element, String> {
        self.child(name)
            .ok_or_else(|| format!("<{}> has no <{}> element", self.name, name))
    }

    pub fn text_of(&self, name: &str) -> Result<&str, String> {
        Ok(self.required(name)?.text.as_str())
    }

    pub fn optional_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Parse a required child's text.
    pub fn value<T>(&self, name: &str) -> Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        let text = self.text_of(name)?;
        text.parse()
            .map_err(|e| format!("<{name}> has invalid value '{text}': {e}"))
    }

    /// Parse an optional child's text.
    pub fn optional_value<T>(&self, name: &str) -> Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.child(name) {
            Some(_) => self.value(name).map(Some),
            None => Ok(None),
        }
    }

    /// Parse a required `0`/`1` flag.
    pub fn flag(&self, name: &str) -> Result<bool, String> {
        match self.text_of(name)? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(format!("<{name}> has invalid flag '{other}'")),
        }
    }

    pub fn optional_flag(&self, name: &str) -> Result<Option<bool>, String> {
        match self.child(name) {
            Some(_) => self.flag(name).map(Some),
            None => Ok(None),
        }
    }
}

/// Parse a document into its root element.
pub(crate) fn parse(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(start) => {
                stack.push(Element {
                    name: local_name(&start)?,
                    ..Element::default()
                });
            }
            Event::Empty(start) => {
                let element = Element {
                    name: local_name(&start)?,
                    ..Element::default()
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or("unexpected closing tag")?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(|e| e.to_string())?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unexpected end of document inside <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn local_name(start: &BytesStart<'_>) -> Result<String, String> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(format!("second root element <{}>", element.name)),
    }
    Ok(())
}

/// Indented document writer with a fixed element order.
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| e.to_string())?;
        Ok(Self { writer })
    }

    pub fn open(&mut self, name: &str) -> Result<(), String> {
        self.write(Event::Start(BytesStart::new(name)))
    }

    pub fn open_with_attributes(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), String> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write(Event::Start(start))
    }

    pub fn close(&mut self, name: &str) -> Result<(), String> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write `<name>value</name>`.
    pub fn leaf(&mut self, name: &str, value: impl Display) -> Result<(), String> {
        let text = value.to_string();
        self.open(name)?;
        self.write(Event::Text(BytesText::new(&text)))?;
        self.close(name)
    }

    pub fn optional_leaf<T: Display>(&mut self, name: &str, value: Option<T>) -> Result<(), String> {
        match value {
            Some(value) => self.leaf(name, value),
            None => Ok(()),
        }
    }

    /// Write a boolean as the `0`/`1` flag the flight controller expects.
    pub fn flag(&mut self, name: &str, value: bool) -> Result<(), String> {
        self.leaf(name, u8::from(value))
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), String> {
        self.writer.write_event(event).map_err(|e| e.to_string())
    }

    pub fn finish(self) -> Result<String, String> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| e.to_string())
    }
}
