//! Markup parsing and serialization for [`Document`].
//!
//! Markup is read with `quick-xml`, so it must be well formed: every element
//! is either closed or self-closing. Several top-level elements are allowed;
//! they all become children of the document root.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{Document, NodeId, NodeKind};
use crate::error::{DomError, DomResult};
use crate::logging::targets;

impl Document {
    /// Parse markup into a new document.
    ///
    /// Whitespace-only text is dropped and surrounding whitespace is trimmed.
    /// Comments and CDATA sections are kept; declarations, processing
    /// instructions and doctypes are skipped.
    pub fn parse(markup: &str) -> DomResult<Self> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(true);

        let mut doc = Document::new();
        let mut stack: Vec<NodeId> = vec![doc.root];

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event()
                .map_err(|e| DomError::parse(e.to_string(), position))?;

            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    let element = doc.element_from_start(&start, position)?;
                    doc.append_to_top(&stack, element)?;
                    stack.push(element);
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Empty(empty) => {
                    let element = doc.element_from_start(&empty, position)?;
                    doc.append_to_top(&stack, element)?;
                }
                Event::Text(text) => {
                    let content = text
                        .unescape()
                        .map_err(|e| DomError::parse(e.to_string(), position))?;
                    if !content.is_empty() {
                        let node = doc.create_text(content.into_owned());
                        doc.append_to_top(&stack, node)?;
                    }
                }
                Event::CData(cdata) => {
                    let content = String::from_utf8_lossy(&cdata).to_string();
                    let node = doc.create_text(content);
                    doc.append_to_top(&stack, node)?;
                }
                Event::Comment(comment) => {
                    let content = String::from_utf8_lossy(&comment).to_string();
                    let node = doc.create_comment(content);
                    doc.append_to_top(&stack, node)?;
                }
                // Declarations, processing instructions and doctypes carry no content.
                _ => {}
            }
        }

        if stack.len() > 1 {
            return Err(DomError::parse(
                "unexpected end of markup: unclosed element",
                reader.buffer_position() as u64,
            ));
        }

        tracing::debug!(target: targets::DOM, nodes = doc.node_count(), "parsed markup");
        Ok(doc)
    }

    fn element_from_start(&mut self, start: &BytesStart<'_>, position: u64) -> DomResult<NodeId> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let element = self.create_element(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DomError::parse(e.to_string(), position))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| DomError::parse(e.to_string(), position))?
                .into_owned();
            self.set_attribute(element, key, value)?;
        }
        Ok(element)
    }

    fn append_to_top(&mut self, stack: &[NodeId], node: NodeId) -> DomResult<()> {
        let parent = stack.last().copied().unwrap_or(self.root);
        self.append_child(parent, node)
    }

    /// Serialize every node attached below the root.
    pub fn to_markup(&self) -> String {
        let mut writer = Writer::new(Vec::new());
        for &child in self.children(self.root).unwrap_or_default() {
            self.write_node(child, &mut writer);
        }
        String::from_utf8(writer.into_inner()).unwrap_or_default()
    }

    /// Serialize a single subtree (attached or not).
    pub fn node_markup(&self, id: NodeId) -> DomResult<String> {
        self.kind(id)?;
        let mut writer = Writer::new(Vec::new());
        self.write_node(id, &mut writer);
        Ok(String::from_utf8(writer.into_inner()).unwrap_or_default())
    }

    fn write_node<W: Write>(&self, id: NodeId, writer: &mut Writer<W>) {
        enum Step<'d> {
            Open(NodeId),
            Close(&'d str),
        }

        let mut stack = vec![Step::Open(id)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Open(id) => id,
                Step::Close(name) => {
                    let _ = writer.write_event(Event::End(BytesEnd::new(name)));
                    continue;
                }
            };
            let Some(data) = self.nodes.get(id) else {
                continue;
            };
            match &data.kind {
                NodeKind::Document => {
                    stack.extend(data.children.iter().rev().map(|&child| Step::Open(child)));
                }
                NodeKind::Element { name, attributes } => {
                    let mut start = BytesStart::new(name.as_str());
                    for (key, value) in attributes {
                        start.push_attribute((key.as_str(), value.as_str()));
                    }

                    if data.children.is_empty() {
                        let _ = writer.write_event(Event::Empty(start));
                    } else {
                        let _ = writer.write_event(Event::Start(start));
                        stack.push(Step::Close(name.as_str()));
                        stack.extend(data.children.iter().rev().map(|&child| Step::Open(child)));
                    }
                }
                NodeKind::Text(text) => {
                    let _ = writer.write_event(Event::Text(BytesText::new(text)));
                }
                NodeKind::Comment(comment) => {
                    // Comments are written verbatim; `--` would end them early.
                    let _ = writer.write_event(Event::Comment(BytesText::from_escaped(
                        comment.replace("--", "- -"),
                    )));
                }
            }
        }
    }
}
