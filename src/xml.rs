//! Shared XML plumbing for the GPX and KML codecs.
//!
//! Decoding builds a small owned element tree from `quick-xml` events, keyed by
//! local names so namespaced documents decode the same as bare ones. Field
//! parsing follows the usual XML binding rules: a missing or empty element is
//! the zero value, anything else must parse.

use std::{io::Write, str::FromStr};

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::error::{DecodeError, EncodeError};

pub const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The last child with this name, repeated singular fields overwrite.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().rev().find(|c| c.name == name)
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_text(&self, name: &str) -> String {
        self.child(name).map(|c| c.text.clone()).unwrap_or_default()
    }

    pub fn child_value<T: FromStr + Default>(&self, name: &str) -> Result<T, DecodeError> {
        match self.child(name) {
            Some(child) => parse_value(&self.field(name), &child.text),
            None => Ok(T::default()),
        }
    }

    pub fn attr_value<T: FromStr + Default>(&self, name: &str) -> Result<T, DecodeError> {
        match self.attr(name) {
            Some(value) => parse_value(&self.field(name), value),
            None => Ok(T::default()),
        }
    }

    pub fn child_flag(&self, name: &str) -> Result<bool, DecodeError> {
        let Some(child) = self.child(name) else {
            return Ok(false);
        };
        let text = child.text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        parse_bool(text).ok_or_else(|| DecodeError::InvalidValue {
            field: self.field(name),
            value: child.text.clone(),
        })
    }

    fn field(&self, name: &str) -> String {
        format!("{} in <{}>", name, self.name)
    }
}

fn parse_value<T: FromStr + Default>(field: &str, text: &str) -> Result<T, DecodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(T::default());
    }
    trimmed.parse().map_err(|_| DecodeError::InvalidValue {
        field: field.to_owned(),
        value: text.to_owned(),
    })
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn open(start: &BytesStart) -> Result<Element, DecodeError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Default::default()
    })
}

/// Parses the first root element of `bytes`. Anything after it is ignored.
pub fn parse(bytes: &[u8]) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_reader(bytes);
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let finished = match reader.read_event()? {
            Event::Start(e) => {
                stack.push(open(&e)?);
                None
            }
            Event::Empty(e) => {
                let element = open(&e)?;
                match stack.last_mut() {
                    Some(parent) => {
                        parent.children.push(element);
                        None
                    }
                    None => Some(element),
                }
            }
            Event::End(_) => match stack.pop() {
                Some(element) => match stack.last_mut() {
                    Some(parent) => {
                        parent.children.push(element);
                        None
                    }
                    None => Some(element),
                },
                None => None,
            },
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape()?);
                }
                None
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };
        if let Some(root) = finished {
            return Ok(root);
        }
    }

    match stack.into_iter().next() {
        Some(unclosed) => Err(DecodeError::Unclosed(unclosed.name)),
        None => Err(DecodeError::Empty),
    }
}

/// Parses `bytes` and checks that the root element is `expected`.
pub fn parse_root(bytes: &[u8], expected: &'static str) -> Result<Element, DecodeError> {
    let root = parse(bytes)?;
    if root.name != expected {
        return Err(DecodeError::UnexpectedRoot {
            expected,
            found: root.name,
        });
    }
    Ok(root)
}

/// Tab-indented writer that starts with the standard XML header.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(mut sink: W) -> Result<Self, EncodeError> {
        sink.write_all(HEADER.as_bytes())?;
        Ok(Self {
            writer: Writer::new_with_indent(sink, b'\t', 1),
        })
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), EncodeError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), EncodeError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> Result<(), EncodeError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// `<name>text</name>`, written even when `text` is empty.
    pub fn text(&mut self, name: &str, text: &str) -> Result<(), EncodeError> {
        self.start(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub fn text_if_not_empty(&mut self, name: &str, text: &str) -> Result<(), EncodeError> {
        if text.is_empty() {
            return Ok(());
        }
        self.text(name, text)
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
