// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Owned XML element tree used for both the configuration files and the
//! generated output document.
//!
//! The shape follows the classic text/tail model: `text` is the character
//! data between an element's start tag and its first child, `tail` is the
//! character data between the element's end tag and the next sibling.
//! Attribute order is preserved, cloning is a deep copy.

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;
use smol_str::SmolStr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: SmolStr,
    pub attributes: IndexMap<SmolStr, String>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    pub tail: Option<String>,
    /// 1-based source line of the start tag, 0 for synthesized elements.
    pub line: usize,
}

/// Error raised while turning bytes into an [`Element`] tree. The caller
/// attaches the file path, we only know about offsets.
#[derive(Debug)]
pub struct XmlParseError {
    pub line: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for XmlParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Element {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Element { tag: tag.into(), ..Default::default() }
    }

    pub fn with_text(tag: impl Into<SmolStr>, text: impl Into<String>) -> Self {
        Element { tag: tag.into(), text: Some(text.into()), ..Default::default() }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Parse a complete document and return its root element.
    pub fn parse_str(source: &str) -> Result<Element, XmlParseError> {
        let line_offsets: Vec<usize> = source
            .bytes()
            .enumerate()
            .filter_map(|(i, c)| if c == b'\n' { Some(i + 1) } else { None })
            .collect();
        let line_of = |offset: usize| match line_offsets.binary_search(&offset) {
            Ok(line) => line + 2,
            Err(line) => line + 1,
        };

        let mut reader = Reader::from_str(source);
        reader.config_mut().expand_empty_elements = true;

        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();
        loop {
            let event_offset = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let tag = SmolStr::new(String::from_utf8_lossy(start.name().as_ref()));
                    let mut element = Element::new(tag);
                    element.line = line_of(event_offset);
                    for attr in start.attributes() {
                        let attr = attr.map_err(|e| XmlParseError {
                            line: Some(line_of(event_offset)),
                            message: format!("invalid attribute: {e}"),
                        })?;
                        let key = SmolStr::new(String::from_utf8_lossy(attr.key.as_ref()));
                        let value = attr
                            .unescape_value()
                            .map_err(|e| XmlParseError {
                                line: Some(line_of(event_offset)),
                                message: format!("invalid attribute value: {e}"),
                            })?
                            .into_owned();
                        element.attributes.insert(key, value);
                    }
                    stack.push(element);
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().expect("end event without matching start");
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => {
                            if root.is_some() {
                                return Err(XmlParseError {
                                    line: Some(line_of(event_offset)),
                                    message: "multiple root elements".into(),
                                });
                            }
                            root = Some(element);
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let content = t
                        .decode()
                        .map_err(|e| XmlParseError {
                            line: Some(line_of(event_offset)),
                            message: format!("invalid character data: {e}"),
                        })?
                        .into_owned();
                    append_character_data(&mut stack, content);
                }
                Ok(Event::CData(c)) => {
                    let content = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    append_character_data(&mut stack, content);
                }
                Ok(Event::GeneralRef(reference)) => {
                    let name = String::from_utf8_lossy(&reference.into_inner()).into_owned();
                    append_character_data(&mut stack, resolve_entity(&name));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(XmlParseError {
                        line: Some(line_of(reader.error_position() as usize)),
                        message: e.to_string(),
                    });
                }
            }
        }
        root.ok_or_else(|| XmlParseError { line: None, message: "no root element".into() })
    }

    /// Serialize as a standalone document with the XML declaration.
    pub fn to_document_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_into(&mut out, 0);
        out.push('\n');
        out
    }

    /// Two spaces per level; elements with character data only stay inline.
    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        let text = self.text.as_deref().filter(|t| !t.trim().is_empty());
        if self.children.is_empty() {
            match text {
                None => out.push_str("/>"),
                Some(text) => {
                    out.push('>');
                    out.push_str(&escape_text(text));
                    out.push_str("</");
                    out.push_str(&self.tag);
                    out.push('>');
                }
            }
            return;
        }
        out.push('>');
        if let Some(text) = text {
            out.push_str(&escape_text(text));
        }
        for child in &self.children {
            out.push('\n');
            child.write_into(out, depth + 1);
            if let Some(tail) = child.tail.as_deref().filter(|t| !t.trim().is_empty()) {
                out.push_str(&escape_text(tail.trim()));
            }
        }
        out.push('\n');
        out.push_str(&indent);
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// Resolve the predefined XML entities and numeric character references;
/// anything unknown is kept verbatim in its `&name;` spelling.
fn resolve_entity(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()));
            match code.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => format!("&{name};"),
            }
        }
    }
}

fn append_character_data(stack: &mut [Element], content: String) {
    let Some(current) = stack.last_mut() else { return };
    match current.children.last_mut() {
        None => match &mut current.text {
            Some(text) => text.push_str(&content),
            None => current.text = Some(content),
        },
        Some(last) => match &mut last.tail {
            Some(tail) => tail.push_str(&content),
            None => last.tail = Some(content),
        },
    }
}

pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[test]
fn parse_basic_tree() {
    let root = Element::parse_str(
        r#"<menus>
  <menu name="main" container="9000">
    <item name="movies" label="Movies"/>
  </menu>
</menus>"#,
    )
    .unwrap();
    assert_eq!(root.tag, "menus");
    let menu = root.child("menu").unwrap();
    assert_eq!(menu.attr("name"), Some("main"));
    assert_eq!(menu.attr("container"), Some("9000"));
    assert_eq!(menu.line, 2);
    let item = menu.child("item").unwrap();
    assert_eq!(item.attr("label"), Some("Movies"));
    assert_eq!(item.line, 3);
}

#[test]
fn parse_text_and_tail() {
    let root = Element::parse_str("<a>before<b>inner</b>after</a>").unwrap();
    assert_eq!(root.text(), "before");
    let b = root.child("b").unwrap();
    assert_eq!(b.text(), "inner");
    assert_eq!(b.tail.as_deref(), Some("after"));
}

#[test]
fn parse_entities() {
    let root = Element::parse_str(r#"<a label="a &amp; b">x &lt; y</a>"#).unwrap();
    assert_eq!(root.attr("label"), Some("a & b"));
    assert_eq!(root.text(), "x < y");
    let root = Element::parse_str("<a>&#38;&#x26;&unknown;</a>").unwrap();
    assert_eq!(root.text(), "&&&unknown;");
}

#[test]
fn parse_errors_carry_lines() {
    let err = Element::parse_str("<a>\n  <b>\n</a>").unwrap_err();
    assert!(err.line.is_some());
    assert!(Element::parse_str("").is_err());
}

#[test]
fn attribute_order_is_preserved() {
    let root = Element::parse_str(r#"<a z="1" a="2" m="3"/>"#).unwrap();
    let keys: Vec<_> = root.attributes.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[test]
fn serialize_indents_and_inlines() {
    let mut root = Element::new("includes");
    let mut include = Element::new("include");
    include.set_attr("name", "skinshortcuts-main");
    let mut item = Element::new("item");
    item.set_attr("id", "1");
    item.push(Element::with_text("label", "Movies"));
    include.push(item);
    root.push(include);
    let out = root.to_document_string();
    assert_eq!(
        out,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <includes>\n\
         \x20\x20<include name=\"skinshortcuts-main\">\n\
         \x20\x20\x20\x20<item id=\"1\">\n\
         \x20\x20\x20\x20\x20\x20<label>Movies</label>\n\
         \x20\x20\x20\x20</item>\n\
         \x20\x20</include>\n\
         </includes>\n"
    );
}

#[test]
fn serialize_escapes() {
    let mut el = Element::with_text("onclick", "PlayMedia(a & b)");
    el.set_attr("condition", "x<y");
    let mut out = String::new();
    el.write_into(&mut out, 0);
    assert_eq!(out, r#"<onclick condition="x&lt;y">PlayMedia(a &amp; b)</onclick>"#);
}

#[test]
fn clone_is_deep() {
    let root = Element::parse_str("<a><b><c/></b></a>").unwrap();
    let mut copy = root.clone();
    copy.children[0].children[0].set_attr("x", "1");
    assert!(root.children[0].children[0].attributes.is_empty());
}
