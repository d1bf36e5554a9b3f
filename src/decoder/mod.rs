//! Fast Infoset stream parser (X.891 C.2, C.3).
//!
//! The parser is strictly sequential: it reads one identifier octet,
//! dispatches on its leading bits, and yields one [`NodeEvent`] per call
//! to [`Decoder::read`]. It never looks ahead past the identifier it is
//! currently decoding.
//!
//! # Beispiel
//!
//! ```
//! use finset::decoder::decode;
//! use finset::NodeKind;
//!
//! // <a/> mit literal codiertem Namen, danach Dokument-Ende.
//! let bytes = [0xE0, 0x00, 0x00, 0x01, 0x00, 0x3C, 0x00, 0x61, 0xFF];
//! let events = decode(&bytes).unwrap();
//! assert_eq!(events[0].kind, NodeKind::Element);
//! assert_eq!(&*events[0].qname.local_name, "a");
//! assert_eq!(events[1].kind, NodeKind::EndElement);
//! ```

mod qname;
mod strings;
mod vocab_init;

#[cfg(test)]
mod tests;

use std::io::Read;
use std::rc::Rc;

use log::debug;

use crate::alphabet::RestrictedAlphabet;
use crate::buffer::InputBuffer;
use crate::event::{Attribute, NodeEvent, NodeKind};
use crate::header::{self, Declaration, DOUBLE_TERMINATOR, MAGIC, TERMINATOR};
use crate::qname::QName;
use crate::vocabulary::{Vocabulary, XMLNS_NAMESPACE};
use crate::{Error, Result};

use strings::StrTable;

/// Longest permitted plaintext declaration, with headroom (X.891 12.3).
const MAX_DECLARATION_OCTETS: usize = 80;

/// A notation declared in the document header (X.891 C.2.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notation {
    pub name: Rc<str>,
    pub system_id: Option<Rc<str>>,
    pub public_id: Option<Rc<str>>,
}

/// An unparsed entity declared in the document header (X.891 C.2.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedEntity {
    pub name: Rc<str>,
    pub system_id: Rc<str>,
    pub public_id: Option<Rc<str>>,
    pub notation_name: Rc<str>,
}

/// Streaming Fast Infoset parser over an [`std::io::Read`] source.
pub struct Decoder<R: Read> {
    pub(super) input: InputBuffer<R>,
    pub(super) vocabulary: Vocabulary,
    /// Wiederverwendeter Octet-Puffer für Literal-Strings.
    pub(super) scratch: Vec<u8>,
    builtin_numeric: RestrictedAlphabet,
    builtin_date_time: RestrictedAlphabet,

    header_read: bool,
    finished: bool,
    /// Latch für den zweiten Terminator eines `FF`-Octets: der nächste
    /// `read()` schließt ein weiteres Element ohne Input zu konsumieren.
    pending_end: bool,
    depth: u32,
    element_stack: Vec<Rc<QName>>,
    error: Option<Error>,

    declaration: Option<Declaration>,
    version: Option<Rc<str>>,
    standalone: Option<bool>,
    character_encoding_scheme: Option<Rc<str>>,
    notations: Vec<Notation>,
    unparsed_entities: Vec<UnparsedEntity>,
    additional_data: Vec<(Rc<str>, Vec<u8>)>,
}

/// Decodes a complete in-memory document into its event sequence.
pub fn decode(bytes: &[u8]) -> Result<Vec<NodeEvent>> {
    let mut decoder = Decoder::new(bytes);
    let mut events = Vec::new();
    while let Some(event) = decoder.read()? {
        events.push(event);
    }
    Ok(events)
}

impl<R: Read> Decoder<R> {
    /// Parser with a fresh, pre-seeded vocabulary.
    pub fn new(source: R) -> Self {
        Self::with_vocabulary(source, Vocabulary::new())
    }

    /// Parser over a caller-supplied vocabulary (out-of-band agreement).
    pub fn with_vocabulary(source: R, vocabulary: Vocabulary) -> Self {
        Self {
            input: InputBuffer::new(source),
            vocabulary,
            scratch: Vec::with_capacity(1024),
            builtin_numeric: RestrictedAlphabet::numeric(),
            builtin_date_time: RestrictedAlphabet::date_time(),
            header_read: false,
            finished: false,
            pending_end: false,
            depth: 0,
            element_stack: Vec::new(),
            error: None,
            declaration: None,
            version: None,
            standalone: None,
            character_encoding_scheme: None,
            notations: Vec::new(),
            unparsed_entities: Vec::new(),
            additional_data: Vec::new(),
        }
    }

    // --- document information decoded from the header ---

    /// Plaintext declaration, when the stream carried one.
    pub fn declaration(&self) -> Option<Declaration> {
        self.declaration
    }

    /// The `version` optional component.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The `standalone` optional component.
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// The `character-encoding-scheme` optional component.
    pub fn character_encoding_scheme(&self) -> Option<&str> {
        self.character_encoding_scheme.as_deref()
    }

    pub fn notations(&self) -> &[Notation] {
        &self.notations
    }

    pub fn unparsed_entities(&self) -> &[UnparsedEntity] {
        &self.unparsed_entities
    }

    /// `additional-data` items as (id URI, octets) pairs.
    pub fn additional_data(&self) -> &[(Rc<str>, Vec<u8>)] {
        &self.additional_data
    }

    /// Current element nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Reads the next event, `None` at the end of the document.
    ///
    /// Nach einem Fehler liefert jeder weitere Aufruf denselben Fehler.
    pub fn read(&mut self) -> Result<Option<NodeEvent>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match self.read_inner() {
            Ok(event) => Ok(event),
            Err(err) => {
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn read_inner(&mut self) -> Result<Option<NodeEvent>> {
        if !self.header_read {
            self.read_header()?;
            self.header_read = true;
        }
        if self.finished {
            return Ok(None);
        }
        if self.pending_end {
            self.pending_end = false;
            return Ok(Some(self.close_element()));
        }

        let b = self.input.read_byte()?;
        match b {
            0x00..=0x7F => self.decode_element(b).map(Some),
            0x80..=0xBF => {
                if self.depth == 0 {
                    // Character chunks sind nur Element-Kinder (C.2.11).
                    return Err(Error::InvalidIdentifier { identifier: b });
                }
                self.decode_character_chunk(b).map(Some)
            }
            0xE1 => self.decode_processing_instruction().map(Some),
            0xE2 => self.decode_comment().map(Some),
            _ if b & 0xFC == 0xC4 => {
                if self.depth != 0 {
                    return Err(Error::InvalidIdentifier { identifier: b });
                }
                self.decode_document_type(b).map(Some)
            }
            _ if b & 0xFC == 0xC8 => {
                if self.depth == 0 {
                    return Err(Error::InvalidIdentifier { identifier: b });
                }
                self.decode_entity_reference(b).map(Some)
            }
            TERMINATOR => {
                if self.depth == 0 {
                    self.finished = true;
                    Ok(None)
                } else {
                    Ok(Some(self.close_element()))
                }
            }
            DOUBLE_TERMINATOR => {
                if self.depth == 0 {
                    self.finished = true;
                    return Ok(None);
                }
                let event = self.close_element();
                if self.depth == 0 {
                    // Zweiter Terminator beendet das Dokument.
                    self.finished = true;
                } else {
                    self.pending_end = true;
                }
                Ok(Some(event))
            }
            _ => Err(Error::InvalidIdentifier { identifier: b }),
        }
    }

    fn close_element(&mut self) -> NodeEvent {
        debug_assert!(self.depth > 0, "close without open element");
        self.depth -= 1;
        let qname = self
            .element_stack
            .pop()
            .unwrap_or_else(|| Rc::new(QName::local("")));
        let mut event = NodeEvent::new(NodeKind::EndElement, self.depth);
        event.qname = (*qname).clone();
        event
    }

    // --- document framing ---

    fn read_header(&mut self) -> Result<()> {
        let first = self.input.read_byte()?;
        if first == b'<' {
            self.read_declaration()?;
        } else {
            self.input.rewind(1)?;
        }

        let mut magic = [0u8; 4];
        self.input.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let flags = self.input.read_byte()?;
        if flags & 0x80 != 0 {
            return Err(Error::MalformedHeader);
        }
        if flags & header::document_flags::ADDITIONAL_DATA != 0 {
            self.decode_additional_data()?;
        }
        if flags & header::document_flags::INITIAL_VOCABULARY != 0 {
            self.decode_initial_vocabulary()?;
        }
        if flags & header::document_flags::NOTATIONS != 0 {
            self.decode_notations()?;
        }
        if flags & header::document_flags::UNPARSED_ENTITIES != 0 {
            self.decode_unparsed_entities()?;
        }
        if flags & header::document_flags::CHARACTER_ENCODING_SCHEME != 0 {
            let scheme = self.decode_utf8_octet_string()?;
            self.character_encoding_scheme = Some(scheme);
        }
        if flags & header::document_flags::STANDALONE != 0 {
            self.standalone = Some(match self.input.read_byte()? {
                0 => false,
                1 => true,
                _ => return Err(Error::MalformedHeader),
            });
        }
        if flags & header::document_flags::VERSION != 0 {
            let version = self.decode_non_identifying_first_bit(StrTable::OtherString)?;
            self.version = Some(version.text);
        }
        Ok(())
    }

    /// Consumes a plaintext declaration; the leading `<` is already read.
    fn read_declaration(&mut self) -> Result<()> {
        let mut text = vec![b'<'];
        loop {
            let b = self.input.read_byte()?;
            text.push(b);
            if b == b'>' {
                break;
            }
            if text.len() > MAX_DECLARATION_OCTETS {
                return Err(Error::InvalidDeclaration);
            }
        }
        let text = std::str::from_utf8(&text).map_err(|_| Error::InvalidDeclaration)?;
        self.declaration = Some(Declaration::from_text(text).ok_or(Error::InvalidDeclaration)?);
        Ok(())
    }

    // --- items ---

    fn decode_element(&mut self, b: u8) -> Result<NodeEvent> {
        let has_attributes = b & 0x40 != 0;
        let mut attributes: Vec<Attribute> = Vec::new();

        let qname = if b & 0x3C == 0x38 {
            // Namespace-Attribute vor dem Namen (C.3.4).
            let mut nb = self.input.read_byte()?;
            while nb & 0xFC == 0xCC {
                attributes.push(self.decode_namespace_attribute(nb)?);
                nb = self.input.read_byte()?;
            }
            if nb != TERMINATOR {
                return Err(Error::InvalidIdentifier { identifier: nb });
            }
            let qb = self.input.read_byte()?;
            if qb & 0xC0 != 0 {
                // Die beiden führenden Bits sind hier Padding (C.3.5).
                return Err(Error::InvalidIdentifier { identifier: qb });
            }
            self.decode_element_name(qb)?
        } else {
            self.decode_element_name(b)?
        };

        self.depth += 1;
        self.element_stack.push(Rc::clone(&qname));

        let mut closes_immediately = false;
        if has_attributes {
            loop {
                let ab = self.input.read_byte()?;
                match ab {
                    0x00..=0x7F => attributes.push(self.decode_attribute(ab)?),
                    TERMINATOR => break,
                    DOUBLE_TERMINATOR => {
                        closes_immediately = true;
                        break;
                    }
                    _ => return Err(Error::InvalidIdentifier { identifier: ab }),
                }
            }
        }

        let mut event = NodeEvent::new(NodeKind::Element, self.depth);
        event.qname = (*qname).clone();
        event.attributes = attributes;
        if closes_immediately {
            self.pending_end = true;
        }
        Ok(event)
    }

    fn decode_namespace_attribute(&mut self, nb: u8) -> Result<Attribute> {
        let prefix = if nb & 0x02 != 0 {
            self.decode_identifying(StrTable::Prefix)?
        } else {
            Rc::from("")
        };
        let uri = if nb & 0x01 != 0 {
            self.decode_identifying(StrTable::Namespace)?
        } else {
            Rc::from("")
        };
        let qname = if prefix.is_empty() {
            // Default-Namespace-Deklaration: xmlns="uri"
            QName::from_parts(Rc::from(""), Rc::from(XMLNS_NAMESPACE), Rc::from("xmlns"))
        } else {
            QName::from_parts(Rc::from("xmlns"), Rc::from(XMLNS_NAMESPACE), prefix)
        };
        Ok(Attribute { qname, value: uri })
    }

    fn decode_attribute(&mut self, ab: u8) -> Result<Attribute> {
        let qname = self.decode_attribute_name(ab)?;
        let value = self.decode_non_identifying_first_bit(StrTable::AttributeValue)?;
        Ok(Attribute { qname: (*qname).clone(), value: value.text })
    }

    fn decode_character_chunk(&mut self, b: u8) -> Result<NodeEvent> {
        let chunk = self.decode_non_identifying_third_bit(b)?;
        let cdata = matches!(&chunk.encoded, Some(encoded)
            if encoded.algorithm == crate::typed_value::BuiltinAlgorithm::Cdata.index());
        if cdata {
            // Die CDATA-Octets SIND der Text; keine Binärform am Event.
            return Ok(NodeEvent::with_value(NodeKind::Cdata, self.depth, chunk.text));
        }
        let mut event = NodeEvent::with_value(NodeKind::Text, self.depth, chunk.text);
        event.encoded = chunk.encoded;
        Ok(event)
    }

    fn decode_processing_instruction(&mut self) -> Result<NodeEvent> {
        let target = self.decode_identifying(StrTable::OtherNcName)?;
        let data = self.decode_non_identifying_first_bit(StrTable::OtherString)?;
        let mut event = NodeEvent::with_value(NodeKind::ProcessingInstruction, self.depth, data.text);
        event.qname = QName::from_parts(Rc::from(""), Rc::from(""), target);
        Ok(event)
    }

    fn decode_comment(&mut self) -> Result<NodeEvent> {
        let text = self.decode_non_identifying_first_bit(StrTable::OtherString)?;
        Ok(NodeEvent::with_value(NodeKind::Comment, self.depth, text.text))
    }

    /// Document type declaration (C.9). The identifier's low bits flag the
    /// public and system identifiers; child processing instructions are
    /// consumed and dropped.
    fn decode_document_type(&mut self, b: u8) -> Result<NodeEvent> {
        let mut event = NodeEvent::new(NodeKind::DocumentType, self.depth);
        if b & 0x02 != 0 {
            let public = self.decode_identifying(StrTable::OtherUri)?;
            event.attributes.push(Attribute { qname: QName::local("public"), value: public });
        }
        if b & 0x01 != 0 {
            let system = self.decode_identifying(StrTable::OtherUri)?;
            event.attributes.push(Attribute { qname: QName::local("system"), value: system });
        }
        loop {
            let cb = self.input.read_byte()?;
            match cb {
                0xE1 => {
                    let pi = self.decode_processing_instruction()?;
                    debug!("dropping processing instruction '{}' inside document type declaration", pi.qname);
                }
                TERMINATOR => break,
                _ => return Err(Error::InvalidIdentifier { identifier: cb }),
            }
        }
        Ok(event)
    }

    fn decode_entity_reference(&mut self, b: u8) -> Result<NodeEvent> {
        let name = self.decode_identifying(StrTable::OtherNcName)?;
        let mut event = NodeEvent::new(NodeKind::EntityReference, self.depth);
        event.qname = QName::from_parts(Rc::from(""), Rc::from(""), name);
        if b & 0x02 != 0 {
            let system = self.decode_identifying(StrTable::OtherUri)?;
            event.attributes.push(Attribute { qname: QName::local("system"), value: system });
        }
        if b & 0x01 != 0 {
            let public = self.decode_identifying(StrTable::OtherUri)?;
            event.attributes.push(Attribute { qname: QName::local("public"), value: public });
        }
        Ok(event)
    }

    // --- header components ---

    fn decode_additional_data(&mut self) -> Result<()> {
        let count = crate::octet_string::decode_sequence_length(&mut self.input)?;
        for _ in 0..count {
            let id = self.decode_utf8_octet_string()?;
            let first = self.input.read_byte()?;
            if first & 0x80 != 0 {
                return Err(Error::MalformedHeader);
            }
            let len = crate::octet_string::decode_length_on_second_bit(&mut self.input, first)?;
            let data = self.input.read_bytes(len)?;
            debug!("retaining {} octets of additional data for '{id}'", data.len());
            self.additional_data.push((id, data));
        }
        Ok(())
    }

    fn decode_notations(&mut self) -> Result<()> {
        loop {
            let b = self.input.read_byte()?;
            if b & 0xFC == 0xC0 {
                let name = self.decode_identifying(StrTable::OtherNcName)?;
                let system_id = if b & 0x02 != 0 {
                    Some(self.decode_identifying(StrTable::OtherUri)?)
                } else {
                    None
                };
                let public_id = if b & 0x01 != 0 {
                    Some(self.decode_identifying(StrTable::OtherUri)?)
                } else {
                    None
                };
                self.notations.push(Notation { name, system_id, public_id });
            } else if b == TERMINATOR {
                return Ok(());
            } else {
                return Err(Error::InvalidIdentifier { identifier: b });
            }
        }
    }

    fn decode_unparsed_entities(&mut self) -> Result<()> {
        loop {
            let b = self.input.read_byte()?;
            if b & 0xFE == 0xD0 {
                let name = self.decode_identifying(StrTable::OtherNcName)?;
                let system_id = self.decode_identifying(StrTable::OtherUri)?;
                let public_id = if b & 0x01 != 0 {
                    Some(self.decode_identifying(StrTable::OtherUri)?)
                } else {
                    None
                };
                let notation_name = self.decode_identifying(StrTable::OtherNcName)?;
                self.unparsed_entities.push(UnparsedEntity {
                    name,
                    system_id,
                    public_id,
                    notation_name,
                });
            } else if b == TERMINATOR {
                return Ok(());
            } else {
                return Err(Error::InvalidIdentifier { identifier: b });
            }
        }
    }
}
