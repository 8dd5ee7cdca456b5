// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The markup writer contract consumed by the render pipeline.
//!
//! Rendering only needs to open and close elements, add attributes to the
//! element currently open, emit text, and report which element is open so
//! that unbalanced components can be detected. [`StringMarkupWriter`] is a
//! small in-memory implementation that serializes to an HTML string.

use std::fmt::Write as _;

/// Opaque handle to an element produced by a [`MarkupWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u32);

/// Emits a stream of markup.
pub trait MarkupWriter {
    /// Opens a new element as a child of the current one and makes it current.
    fn element(&mut self, name: &str, attributes: &[(&str, &str)]) -> ElementHandle;

    /// Adds attributes to the current element. Attributes already present
    /// keep their first value.
    fn attributes(&mut self, attributes: &[(&str, &str)]);

    /// Closes the current element, returning the element that becomes current.
    fn end(&mut self) -> Option<ElementHandle>;

    /// Writes escaped text.
    fn write(&mut self, text: &str);

    /// Writes markup verbatim.
    fn write_raw(&mut self, markup: &str);

    /// Writes a comment.
    fn comment(&mut self, text: &str);

    /// The element currently open, or `None` at document level.
    fn current_element(&self) -> Option<ElementHandle>;
}

#[derive(Debug)]
enum Node {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<usize>,
    },
    Text(String),
    Raw(String),
    Comment(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// An in-memory [`MarkupWriter`] that keeps a lightweight node tree and
/// serializes it to HTML on demand.
#[derive(Debug, Default)]
pub struct StringMarkupWriter {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    open: Vec<usize>,
}

impl StringMarkupWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, node: Node) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        match self.open.last().copied() {
            Some(parent) => {
                if let Node::Element { children, .. } = &mut self.nodes[parent] {
                    children.push(index);
                }
            }
            None => self.roots.push(index),
        }
        index
    }

    /// Serializes the whole document.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            self.serialize(root, &mut out);
        }
        out
    }

    /// Serializes a single element and its content.
    pub fn element_markup(&self, handle: ElementHandle) -> Option<String> {
        let index = handle.0 as usize;
        if index >= self.nodes.len() {
            return None;
        }
        let mut out = String::new();
        self.serialize(index, &mut out);
        Some(out)
    }

    /// Number of elements still open.
    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    fn serialize(&self, index: usize, out: &mut String) {
        match &self.nodes[index] {
            Node::Element {
                name,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                for (attr, value) in attributes {
                    let _ = write!(out, " {attr}=\"{}\"", escape(value, true));
                }
                out.push('>');
                if children.is_empty() && VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                for &child in children {
                    self.serialize(child, out);
                }
                let _ = write!(out, "</{name}>");
            }
            Node::Text(text) => out.push_str(&escape(text, false)),
            Node::Raw(markup) => out.push_str(markup),
            Node::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl MarkupWriter for StringMarkupWriter {
    fn element(&mut self, name: &str, attributes: &[(&str, &str)]) -> ElementHandle {
        let index = self.append(Node::Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        });
        self.open.push(index);
        self.attributes(attributes);
        ElementHandle(index as u32)
    }

    fn attributes(&mut self, new_attributes: &[(&str, &str)]) {
        let Some(&current) = self.open.last() else {
            if !new_attributes.is_empty() {
                log::warn!("Attributes written with no open element were discarded");
            }
            return;
        };
        if let Node::Element { attributes, .. } = &mut self.nodes[current] {
            for (name, value) in new_attributes {
                if !attributes.iter().any(|(existing, _)| existing == name) {
                    attributes.push((name.to_string(), value.to_string()));
                }
            }
        }
    }

    fn end(&mut self) -> Option<ElementHandle> {
        self.open.pop();
        self.current_element()
    }

    fn write(&mut self, text: &str) {
        if !text.is_empty() {
            self.append(Node::Text(text.to_string()));
        }
    }

    fn write_raw(&mut self, markup: &str) {
        self.append(Node::Raw(markup.to_string()));
    }

    fn comment(&mut self, text: &str) {
        self.append(Node::Comment(text.to_string()));
    }

    fn current_element(&self) -> Option<ElementHandle> {
        self.open.last().map(|&index| ElementHandle(index as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_and_escaping() {
        let mut writer = StringMarkupWriter::new();
        writer.element("div", &[("class", "a\"b")]);
        writer.write("1 < 2");
        writer.element("br", &[]);
        writer.end();
        writer.end();

        assert_eq!(
            writer.to_markup(),
            "<div class=\"a&quot;b\">1 &lt; 2<br></div>"
        );
        assert_eq!(writer.open_depth(), 0);
    }

    #[test]
    fn test_current_element_tracks_stack() {
        let mut writer = StringMarkupWriter::new();
        assert_eq!(writer.current_element(), None);
        let outer = writer.element("ul", &[]);
        let inner = writer.element("li", &[]);
        assert_eq!(writer.current_element(), Some(inner));
        assert_eq!(writer.end(), Some(outer));
        assert_eq!(writer.end(), None);
    }

    #[test]
    fn test_first_attribute_value_wins() {
        let mut writer = StringMarkupWriter::new();
        let span = writer.element("span", &[("id", "first")]);
        writer.attributes(&[("id", "second"), ("title", "t")]);
        writer.end();
        assert_eq!(
            writer.element_markup(span).unwrap(),
            "<span id=\"first\" title=\"t\"></span>"
        );
    }
}
