//! Parser event model.
//!
//! The parser yields flat [`NodeEvent`] records in document order. The
//! record shape mirrors a streaming XML reader: one event per element
//! start (carrying its attribute list), element end, character chunk,
//! comment, processing instruction, document type declaration or
//! unexpanded entity reference.

use std::rc::Rc;

use crate::qname::QName;

/// Kind of a [`NodeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// No event read yet (initial reader position).
    None,
    /// Element start. Attributes and namespace declarations ride along.
    Element,
    /// Element end.
    EndElement,
    /// Character chunk (X.891 C.15). Consecutive chunks are separate events.
    Text,
    /// Character chunk carried by the CDATA encoding algorithm (X.891 10.11).
    Cdata,
    /// Comment (X.891 C.8).
    Comment,
    /// Processing instruction (X.891 C.5).
    ProcessingInstruction,
    /// Document type declaration (X.891 C.9). Carries no name.
    DocumentType,
    /// Unexpanded entity reference (X.891 C.6).
    EntityReference,
    /// Attribute position of the reader cursor. Never produced by the
    /// parser itself.
    Attribute,
}

/// One attribute of an element event. Namespace declarations appear as
/// attributes with prefix `xmlns` (or local name `xmlns` for the default
/// namespace), in the order they were decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub qname: QName,
    pub value: Rc<str>,
}

impl Attribute {
    pub fn new(qname: QName, value: &str) -> Self {
        Self { qname, value: Rc::from(value) }
    }
}

/// Raw payload of a character chunk that used an encoding algorithm.
///
/// `value` auf dem Event trägt bereits die String-Form; wer die
/// Binärform braucht, findet sie hier samt Algorithmus-Index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOctets {
    /// Wire algorithm index (1..10 built-in, 32..255 vocabulary).
    pub algorithm: u32,
    pub octets: Rc<[u8]>,
}

/// One parser event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub kind: NodeKind,
    /// Element nesting depth after this event took effect. The document
    /// root element sits at depth 1.
    pub depth: u32,
    /// Element name, PI target (local name), or entity name. Empty for
    /// text, comments and document type declarations.
    pub qname: QName,
    /// Character data, comment text, PI data, or the string form of
    /// algorithm-encoded content.
    pub value: Rc<str>,
    pub attributes: Vec<Attribute>,
    /// Present when this chunk was carried by an encoding algorithm.
    pub encoded: Option<EncodedOctets>,
}

impl NodeEvent {
    pub(crate) fn new(kind: NodeKind, depth: u32) -> Self {
        Self {
            kind,
            depth,
            qname: QName::local(""),
            value: Rc::from(""),
            attributes: Vec::new(),
            encoded: None,
        }
    }

    pub(crate) fn with_value(kind: NodeKind, depth: u32, value: Rc<str>) -> Self {
        Self {
            kind,
            depth,
            qname: QName::local(""),
            value,
            attributes: Vec::new(),
            encoded: None,
        }
    }

    /// Attribute lookup by local name (first match).
    pub fn attribute(&self, local_name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| &*a.qname.local_name == local_name)
    }

    /// Attribute lookup by local name and namespace name.
    pub fn attribute_ns(&self, local_name: &str, namespace_uri: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| {
            &*a.qname.local_name == local_name && &*a.qname.namespace_uri == namespace_uri
        })
    }
}
