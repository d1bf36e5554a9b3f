//! Pull reader over the parser.
//!
//! [`Reader`] holds the current event and adds the cursor operations a
//! streaming XML reader exposes: moving between the element and its
//! attributes, and stepping into an attribute's value. Only [`Reader::read`]
//! consumes input; every other operation is a pure function of the
//! current event.

use std::io::Read;

use crate::decoder::Decoder;
use crate::event::{NodeEvent, NodeKind};
use crate::vocabulary::Vocabulary;
use crate::Result;

/// Reader lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// `read` has not been called yet.
    Initial,
    /// Events are being delivered.
    Interactive,
    /// The document terminator has been consumed.
    EndOfFile,
    /// A decode error occurred; it will be re-reported on every read.
    Error,
    /// `close` was called.
    Closed,
}

/// Cursor position within the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Node,
    Attribute(usize),
    AttributeValue(usize),
}

/// Streaming pull reader for Fast Infoset documents.
pub struct Reader<R: Read> {
    decoder: Decoder<R>,
    current: NodeEvent,
    cursor: Cursor,
    state: ReadState,
}

impl<R: Read> Reader<R> {
    pub fn new(source: R) -> Self {
        Self::from_decoder(Decoder::new(source))
    }

    pub fn with_vocabulary(source: R, vocabulary: Vocabulary) -> Self {
        Self::from_decoder(Decoder::with_vocabulary(source, vocabulary))
    }

    fn from_decoder(decoder: Decoder<R>) -> Self {
        Self {
            decoder,
            current: NodeEvent::new(NodeKind::None, 0),
            cursor: Cursor::Node,
            state: ReadState::Initial,
        }
    }

    /// The decoder, for document-level information (declaration, version,
    /// standalone, notations, unparsed entities).
    pub fn decoder(&self) -> &Decoder<R> {
        &self.decoder
    }

    /// The full current event.
    pub fn event(&self) -> &NodeEvent {
        &self.current
    }

    pub fn read_state(&self) -> ReadState {
        self.state
    }

    /// Advances to the next event. `false` once the document is finished.
    pub fn read(&mut self) -> Result<bool> {
        if matches!(self.state, ReadState::Closed | ReadState::EndOfFile) {
            return Ok(false);
        }
        self.cursor = Cursor::Node;
        match self.decoder.read() {
            Ok(Some(event)) => {
                self.current = event;
                self.state = ReadState::Interactive;
                Ok(true)
            }
            Ok(None) => {
                self.current = NodeEvent::new(NodeKind::None, 0);
                self.state = ReadState::EndOfFile;
                Ok(false)
            }
            Err(err) => {
                self.state = ReadState::Error;
                Err(err)
            }
        }
    }

    /// Releases the reader; further reads report `false`.
    pub fn close(&mut self) {
        self.state = ReadState::Closed;
    }

    // --- cursor-dependent views ---

    /// Node kind at the cursor: the attribute cursor reports `Attribute`,
    /// the value cursor `Text`.
    pub fn node_type(&self) -> NodeKind {
        match self.cursor {
            Cursor::Node => self.current.kind,
            Cursor::Attribute(_) => NodeKind::Attribute,
            Cursor::AttributeValue(_) => NodeKind::Text,
        }
    }

    /// Depth at the cursor: attributes sit one level below their element,
    /// attribute values one below the attribute.
    pub fn depth(&self) -> u32 {
        match self.cursor {
            Cursor::Node => self.current.depth,
            Cursor::Attribute(_) => self.current.depth + 1,
            Cursor::AttributeValue(_) => self.current.depth + 2,
        }
    }

    pub fn local_name(&self) -> &str {
        match self.cursor {
            Cursor::Node => &self.current.qname.local_name,
            Cursor::Attribute(i) | Cursor::AttributeValue(i) => {
                &self.current.attributes[i].qname.local_name
            }
        }
    }

    pub fn namespace_uri(&self) -> &str {
        match self.cursor {
            Cursor::Node => &self.current.qname.namespace_uri,
            Cursor::Attribute(i) | Cursor::AttributeValue(i) => {
                &self.current.attributes[i].qname.namespace_uri
            }
        }
    }

    pub fn prefix(&self) -> &str {
        match self.cursor {
            Cursor::Node => &self.current.qname.prefix,
            Cursor::Attribute(i) | Cursor::AttributeValue(i) => {
                &self.current.attributes[i].qname.prefix
            }
        }
    }

    pub fn value(&self) -> &str {
        match self.cursor {
            Cursor::Node => &self.current.value,
            Cursor::Attribute(i) | Cursor::AttributeValue(i) => &self.current.attributes[i].value,
        }
    }

    // --- attribute access ---

    pub fn attribute_count(&self) -> usize {
        self.current.attributes.len()
    }

    /// Attribute value by position.
    pub fn attribute(&self, index: usize) -> Option<&str> {
        self.current.attributes.get(index).map(|a| &*a.value)
    }

    /// Attribute value by local name.
    pub fn attribute_by_name(&self, local_name: &str) -> Option<&str> {
        self.current.attribute(local_name).map(|a| &*a.value)
    }

    /// Attribute value by local name and namespace name.
    pub fn attribute_by_name_ns(&self, local_name: &str, namespace_uri: &str) -> Option<&str> {
        self.current
            .attribute_ns(local_name, namespace_uri)
            .map(|a| &*a.value)
    }

    pub fn move_to_attribute(&mut self, index: usize) -> bool {
        if index < self.current.attributes.len() {
            self.cursor = Cursor::Attribute(index);
            true
        } else {
            false
        }
    }

    pub fn move_to_attribute_by_name(&mut self, local_name: &str) -> bool {
        match self
            .current
            .attributes
            .iter()
            .position(|a| &*a.qname.local_name == local_name)
        {
            Some(index) => {
                self.cursor = Cursor::Attribute(index);
                true
            }
            None => false,
        }
    }

    pub fn move_to_attribute_by_name_ns(&mut self, local_name: &str, namespace_uri: &str) -> bool {
        match self.current.attributes.iter().position(|a| {
            &*a.qname.local_name == local_name && &*a.qname.namespace_uri == namespace_uri
        }) {
            Some(index) => {
                self.cursor = Cursor::Attribute(index);
                true
            }
            None => false,
        }
    }

    /// Moves to the next attribute, or the first when the cursor is on
    /// the element.
    pub fn move_to_next_attribute(&mut self) -> bool {
        let next = match self.cursor {
            Cursor::Node => 0,
            Cursor::Attribute(i) | Cursor::AttributeValue(i) => i + 1,
        };
        self.move_to_attribute(next)
    }

    /// Returns the cursor from an attribute back to the element.
    pub fn move_to_element(&mut self) -> bool {
        if self.cursor == Cursor::Node {
            false
        } else {
            self.cursor = Cursor::Node;
            true
        }
    }

    /// Steps the cursor into the current attribute's value text. A second
    /// call reports `false` (attribute values are a single chunk here).
    pub fn read_attribute_value(&mut self) -> bool {
        match self.cursor {
            Cursor::Attribute(i) => {
                self.cursor = Cursor::AttributeValue(i);
                true
            }
            _ => false,
        }
    }
}
