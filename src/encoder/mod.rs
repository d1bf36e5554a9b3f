//! Fast Infoset stream encoder (X.891 C.2, C.3).
//!
//! The encoder accepts writer-style operations, buffers each element
//! until its attribute list is complete, and keeps element terminators
//! pending so that adjacent closures coalesce into the double-terminator
//! octet (X.891 C.2.11).
//!
//! # Beispiel
//!
//! ```
//! use finset::encoder::Encoder;
//!
//! let mut out = Vec::new();
//! let mut encoder = Encoder::new(&mut out).unwrap();
//! encoder.write_start_document(None).unwrap();
//! encoder.write_start_element(None, "a", None).unwrap();
//! encoder.write_end_element().unwrap();
//! encoder.write_end_document().unwrap();
//! encoder.close().unwrap();
//! assert_eq!(out, [0xE0, 0x00, 0x00, 0x01, 0x00, 0x3C, 0x00, 0x61, 0xFF]);
//! ```

mod config;
mod namespaces;
mod pending;
mod qname;
mod state;
mod strings;


pub use config::EncoderConfig;
pub use state::State;

use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::alphabet::RestrictedAlphabet;
use crate::buffer::OutputBuffer;
use crate::event::{NodeEvent, NodeKind};
use crate::header::{
    document_flags, vocabulary_flags, Declaration, DOUBLE_TERMINATOR, MAGIC, TERMINATOR,
};
use crate::qname::QName;
use crate::typed_value::{BuiltinAlgorithm, TypedValue};
use crate::vocabulary::{external_vocabulary, Vocabulary, XMLNS_NAMESPACE};
use crate::{algorithm, alphabet, octet_string, Error, Result};

use namespaces::NamespaceManager;
use pending::{PendingAttribute, PendingElement};
use state::Item;
use strings::{IdTable, ValueTable};

/// Deferred terminators, committed by the next non-terminal emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminators {
    None,
    Single,
    Double,
}

/// Streaming Fast Infoset encoder over an [`std::io::Write`] sink.
pub struct Encoder<W: Write> {
    out: OutputBuffer<W>,
    vocabulary: Vocabulary,
    config: EncoderConfig,
    /// Wiederverwendeter Transcoding-Puffer für UTF-16BE-Literale.
    scratch: Vec<u8>,

    state: State,
    error: Option<Error>,
    depth: u32,
    pending_element: Option<PendingElement>,
    current_attribute: Option<PendingAttribute>,
    terminators: Terminators,
    namespaces: NamespaceManager,
    header_written: bool,

    external_uri: Option<Rc<str>>,
    /// Im Initial Vocabulary anzukündigende Alphabete/Algorithmen
    /// (Schnappschuss der Prozess-Registries bei Konstruktion).
    header_alphabets: Vec<RestrictedAlphabet>,
    header_algorithm_uris: Vec<Rc<str>>,
    builtin_numeric: RestrictedAlphabet,
    builtin_date_time: RestrictedAlphabet,
}

/// Encodes an event sequence (as produced by the parser) into a complete
/// document.
pub fn encode(events: &[NodeEvent], config: &EncoderConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = Encoder::with_config(&mut out, config.clone())?;
    encoder.write_start_document(None)?;
    for event in events {
        encoder.write_event(event)?;
    }
    encoder.write_end_document()?;
    encoder.close()?;
    Ok(out)
}

impl<W: Write> Encoder<W> {
    /// Encoder with default configuration.
    pub fn new(sink: W) -> Result<Self> {
        Self::with_config(sink, EncoderConfig::default())
    }

    pub fn with_config(sink: W, config: EncoderConfig) -> Result<Self> {
        let (mut vocabulary, external_uri) = match &config.external_vocabulary_uri {
            Some(uri) => {
                let external = external_vocabulary(uri)
                    .ok_or_else(|| Error::UnknownExternalVocabulary(uri.clone()))?;
                let vocabulary = external.instantiate();
                (vocabulary, Some(Rc::clone(&external.uri)))
            }
            None => (Vocabulary::new(), None),
        };
        let header_alphabets = alphabet::registered_alphabets();
        let header_algorithm_uris = algorithm::registered_algorithm_uris();
        vocabulary.alphabets.extend(header_alphabets.iter().cloned());
        vocabulary
            .algorithm_uris
            .extend(header_algorithm_uris.iter().cloned());

        Ok(Self {
            out: OutputBuffer::new(sink),
            vocabulary,
            config,
            scratch: Vec::new(),
            state: State::Start,
            error: None,
            depth: 0,
            pending_element: None,
            current_attribute: None,
            terminators: Terminators::None,
            namespaces: NamespaceManager::new(),
            header_written: false,
            external_uri,
            header_alphabets,
            header_algorithm_uris,
            builtin_numeric: RestrictedAlphabet::numeric(),
            builtin_date_time: RestrictedAlphabet::date_time(),
        })
    }

    /// Current writer state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Current element nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    // --- operations ---

    /// Starts the document, optionally overriding the configured
    /// plaintext declaration.
    pub fn write_start_document(&mut self, declaration: Option<Declaration>) -> Result<()> {
        let next = self.begin(Item::StartDocument, "write_start_document")?;
        let result = self.write_header(declaration);
        self.complete(next, result)
    }

    pub fn write_start_element(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        let next = self.begin(Item::StartElement, "write_start_element")?;
        let result = self.start_element_body(prefix, local_name, namespace_uri);
        self.complete(next, result)
    }

    pub fn write_start_attribute(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        let next = self.begin(Item::StartAttribute, "write_start_attribute")?;
        let result = self.start_attribute_body(prefix, local_name, namespace_uri);
        self.complete(next, result)
    }

    pub fn write_end_attribute(&mut self) -> Result<()> {
        let next = self.begin(Item::EndAttribute, "write_end_attribute")?;
        let result = self.finish_attribute();
        self.complete(next, result)
    }

    /// Character data: attribute value text inside an attribute,
    /// otherwise a content character chunk. Empty text is a no-op.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        let next = self.begin(Item::Content, "write_string")?;
        if matches!(self.state, State::Attribute | State::AttributeContent) {
            if let Some(attribute) = &mut self.current_attribute {
                attribute.value.push_str(text);
            }
            self.state = next;
            return Ok(());
        }
        if text.is_empty() {
            // Kein Chunk auf dem Draht, aber der Zustand schreitet fort:
            // Attribute sind nach Content nicht mehr erlaubt.
            self.state = next;
            return Ok(());
        }
        let result = self.chunk_body(text);
        self.complete(next, result)
    }

    /// Explicit content character chunk; one call, one chunk.
    pub fn write_character_chunk(&mut self, text: &str) -> Result<()> {
        self.write_string(text)
    }

    /// Whitespace passthrough; the caller guarantees the content.
    pub fn write_whitespace(&mut self, text: &str) -> Result<()> {
        let next = self.begin(Item::Whitespace, "write_whitespace")?;
        if matches!(self.state, State::Attribute | State::AttributeContent) {
            if let Some(attribute) = &mut self.current_attribute {
                attribute.value.push_str(text);
            }
            self.state = next;
            return Ok(());
        }
        if text.is_empty() || matches!(self.state, State::Start | State::Prolog | State::Epilog) {
            // Whitespace außerhalb des Wurzelelements trägt Fast Infoset
            // nicht; nur der Zustandsübergang zählt.
            self.state = next;
            return Ok(());
        }
        let result = self.chunk_body(text);
        self.complete(next, result)
    }

    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        let next = self.begin(Item::Comment, "write_comment")?;
        let result = self.comment_body(text);
        self.complete(next, result)
    }

    pub fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        let next = self.begin(Item::ProcessingInstruction, "write_processing_instruction")?;
        let result = self.processing_instruction_body(target, data);
        self.complete(next, result)
    }

    /// Content carried by a built-in encoding algorithm (X.891 10).
    pub fn write_typed(&mut self, value: &TypedValue) -> Result<()> {
        let next = self.begin(Item::EncodedContent, "write_typed")?;
        let octets = value.to_octets();
        if octets.is_empty() {
            self.state = next;
            return Ok(());
        }
        let result = self.algorithm_chunk_body(value.algorithm().index(), &octets);
        self.complete(next, result)
    }

    /// Content as a CDATA section (built-in algorithm 10).
    pub fn write_cdata(&mut self, text: &str) -> Result<()> {
        let next = self.begin(Item::EncodedContent, "write_cdata")?;
        if text.is_empty() {
            self.state = next;
            return Ok(());
        }
        let result = self.algorithm_chunk_body(BuiltinAlgorithm::Cdata.index(), text.as_bytes());
        self.complete(next, result)
    }

    /// Binary content via the base64 algorithm.
    pub fn write_base64(&mut self, data: &[u8]) -> Result<()> {
        let next = self.begin(Item::EncodedContent, "write_base64")?;
        if data.is_empty() {
            self.state = next;
            return Ok(());
        }
        let result = self.algorithm_chunk_body(BuiltinAlgorithm::Base64.index(), data);
        self.complete(next, result)
    }

    /// Content for a URI-registered extended algorithm. The URI must have
    /// been registered before this encoder was constructed.
    pub fn write_encoded(&mut self, uri: &str, octets: &[u8]) -> Result<()> {
        let next = self.begin(Item::EncodedContent, "write_encoded")?;
        let index = match self.vocabulary.algorithm_index(uri) {
            Some(index) if index <= algorithm::LAST_EXTENDED_INDEX => index,
            _ => {
                let err = Error::UnknownEncodingAlgorithm(uri.to_owned().into());
                return Err(self.fail(err));
            }
        };
        if octets.is_empty() {
            self.state = next;
            return Ok(());
        }
        let result = self.algorithm_chunk_body(index, octets);
        self.complete(next, result)
    }

    /// Content by raw algorithm wire index; the replay path for events
    /// that carry [`crate::event::EncodedOctets`].
    pub fn write_encoded_data(&mut self, index: u32, octets: &[u8]) -> Result<()> {
        let next = self.begin(Item::EncodedContent, "write_encoded_data")?;
        let known = BuiltinAlgorithm::from_index(index).is_some()
            || self.vocabulary.algorithm_uri(index).is_some();
        if !known {
            let err = Error::UnknownEncodingAlgorithm(index.to_string().into());
            return Err(self.fail(err));
        }
        if octets.is_empty() {
            self.state = next;
            return Ok(());
        }
        let result = self.algorithm_chunk_body(index, octets);
        self.complete(next, result)
    }

    /// Content over a restricted alphabet (1, 2, or an index established
    /// by registration).
    pub fn write_string_with_alphabet(&mut self, index: u32, text: &str) -> Result<()> {
        let next = self.begin(Item::EncodedContent, "write_string_with_alphabet")?;
        if text.is_empty() {
            self.state = next;
            return Ok(());
        }
        let octets = {
            let alphabet = match index {
                alphabet::NUMERIC_INDEX => &self.builtin_numeric,
                alphabet::DATE_TIME_INDEX => &self.builtin_date_time,
                _ if index <= 256 => match self.vocabulary.alphabet(index) {
                    Some(alphabet) => alphabet,
                    None => {
                        let err = Error::UnknownRestrictedAlphabet(index);
                        return Err(self.fail(err));
                    }
                },
                _ => {
                    let err = Error::UnknownRestrictedAlphabet(index);
                    return Err(self.fail(err));
                }
            };
            match alphabet.encode(text) {
                Ok(octets) => octets,
                Err(err) => return Err(self.fail(err)),
            }
        };
        let result = self.alphabet_chunk_body(index, &octets, text);
        self.complete(next, result)
    }

    /// DTD subsets are outside the supported subset.
    pub fn write_document_type(&mut self, _public_id: &str, _system_id: &str) -> Result<()> {
        self.begin(Item::DocType, "write_document_type")?;
        Err(self.fail(Error::UnsupportedFeature("document type declaration writing")))
    }

    /// Unexpanded entity references are decoded but never encoded.
    pub fn write_entity_reference(&mut self, _name: &str) -> Result<()> {
        self.begin(Item::EntityRef, "write_entity_reference")?;
        Err(self.fail(Error::UnsupportedFeature("entity reference writing")))
    }

    pub fn write_surrogate_char_entity(&mut self, _low: u16, _high: u16) -> Result<()> {
        self.begin(Item::SurrogateCharEntity, "write_surrogate_char_entity")?;
        Err(self.fail(Error::UnsupportedFeature("surrogate char entities")))
    }

    /// Raw octet passthrough has no meaning in a binary format.
    pub fn write_raw(&mut self, _text: &str) -> Result<()> {
        self.begin(Item::Raw, "write_raw")?;
        Err(self.fail(Error::UnsupportedFeature("raw writes")))
    }

    pub fn write_end_element(&mut self) -> Result<()> {
        let next = self.begin(Item::EndElement, "write_end_element")?;
        let result = self.end_element_body();
        self.complete(next, result)?;
        if self.depth == 0 {
            self.state = State::Epilog;
        }
        Ok(())
    }

    /// Ends the document, closing any open elements, and flushes.
    pub fn write_end_document(&mut self) -> Result<()> {
        let next = self.begin(Item::EndDocument, "write_end_document")?;
        let result = self.end_document_body();
        self.complete(next, result)
    }

    /// Convenience: a complete attribute in one call.
    pub fn write_attribute(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
        value: &str,
    ) -> Result<()> {
        self.write_start_attribute(prefix, local_name, namespace_uri)?;
        self.write_string(value)?;
        self.write_end_attribute()
    }

    /// Convenience: a complete element with text content in one call.
    pub fn write_element_string(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
        text: &str,
    ) -> Result<()> {
        self.write_start_element(prefix, local_name, namespace_uri)?;
        self.write_string(text)?;
        self.write_end_element()
    }

    /// Replays one parser event.
    pub fn write_event(&mut self, event: &NodeEvent) -> Result<()> {
        match event.kind {
            NodeKind::Element => {
                let prefix = (!event.qname.prefix.is_empty()).then_some(&*event.qname.prefix);
                self.write_start_element(
                    prefix,
                    &event.qname.local_name,
                    Some(&event.qname.namespace_uri),
                )?;
                for attribute in &event.attributes {
                    let prefix =
                        (!attribute.qname.prefix.is_empty()).then_some(&*attribute.qname.prefix);
                    self.write_start_attribute(
                        prefix,
                        &attribute.qname.local_name,
                        Some(&attribute.qname.namespace_uri),
                    )?;
                    self.write_string(&attribute.value)?;
                    self.write_end_attribute()?;
                }
                Ok(())
            }
            NodeKind::EndElement => self.write_end_element(),
            NodeKind::Text => match &event.encoded {
                Some(encoded) => self.write_encoded_data(encoded.algorithm, &encoded.octets),
                None => self.write_string(&event.value),
            },
            NodeKind::Cdata => self.write_cdata(&event.value),
            NodeKind::Comment => self.write_comment(&event.value),
            NodeKind::ProcessingInstruction => {
                self.write_processing_instruction(&event.qname.local_name, &event.value)
            }
            NodeKind::DocumentType | NodeKind::EntityReference => {
                // Nicht schreibbar; beim Replay überspringen.
                debug!("skipping non-writable {:?} event", event.kind);
                Ok(())
            }
            NodeKind::None | NodeKind::Attribute => Ok(()),
        }
    }

    /// Flushes buffered octets to the sink. Deferred terminators are
    /// encoding state, not buffering, and stay pending.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.out.flush()
    }

    /// Releases the sink. Legal in every state, including `Error`.
    pub fn close(mut self) -> Result<W> {
        self.state = State::Closed;
        self.out.into_inner()
    }

    // --- state plumbing ---

    fn begin(&mut self, item: Item, operation: &'static str) -> Result<State> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match state::advance(self.state, item) {
            Some(next) => Ok(next),
            None => {
                let err = Error::InvalidState {
                    state: self.state.name(),
                    operation,
                };
                Err(self.fail(err))
            }
        }
    }

    fn complete(&mut self, next: State, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = State::Error;
        self.error = Some(err.clone());
        err
    }

    // --- bodies ---

    fn write_header(&mut self, declaration: Option<Declaration>) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        if let Some(declaration) = declaration.or(self.config.declaration) {
            self.out.write_bytes(declaration.text().as_bytes())?;
        }
        self.out.write_bytes(&MAGIC)?;

        let has_initial_vocabulary = self.external_uri.is_some()
            || !self.header_alphabets.is_empty()
            || !self.header_algorithm_uris.is_empty();
        if !has_initial_vocabulary {
            return self.out.write_byte(0x00);
        }

        self.out.write_byte(document_flags::INITIAL_VOCABULARY)?;
        let mut b1 = 0u8;
        if self.external_uri.is_some() {
            b1 |= vocabulary_flags::EXTERNAL_VOCABULARY;
        }
        if !self.header_alphabets.is_empty() {
            b1 |= vocabulary_flags::RESTRICTED_ALPHABETS;
        }
        if !self.header_algorithm_uris.is_empty() {
            b1 |= vocabulary_flags::ENCODING_ALGORITHMS;
        }
        self.out.write_byte(b1)?;
        self.out.write_byte(0x00)?;

        if let Some(uri) = self.external_uri.clone() {
            self.write_utf8_octet_string(&uri)?;
        }
        if !self.header_alphabets.is_empty() {
            octet_string::encode_sequence_length(&mut self.out, self.header_alphabets.len())?;
            let characters: Vec<String> =
                self.header_alphabets.iter().map(|a| a.characters()).collect();
            for chars in characters {
                self.write_utf8_octet_string(&chars)?;
            }
        }
        if !self.header_algorithm_uris.is_empty() {
            octet_string::encode_sequence_length(&mut self.out, self.header_algorithm_uris.len())?;
            let uris = self.header_algorithm_uris.clone();
            for uri in uris {
                self.write_utf8_octet_string(&uri)?;
            }
        }
        Ok(())
    }

    fn write_utf8_octet_string(&mut self, text: &str) -> Result<()> {
        octet_string::encode_length_on_second_bit(&mut self.out, 0x00, text.len())?;
        self.out.write_bytes(text.as_bytes())
    }

    fn start_element_body(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        self.write_header(None)?;
        self.flush_pending_element()?;
        // Ein Kind-Item löst ausstehende Terminatoren ein (C.3.8): das
        // F0 nach der Attributliste des Elternelements bzw. nach
        // geschlossenen Geschwistern steht vor diesem Element.
        self.commit_terminators()?;
        self.namespaces.push_scope();
        let (qname, decls) = self.resolve_element_name(prefix, local_name, namespace_uri)?;
        let mut element = PendingElement::new(qname);
        element.namespace_decls = decls;
        self.pending_element = Some(element);
        self.depth += 1;
        Ok(())
    }

    fn start_attribute_body(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        if self.current_attribute.is_some() {
            // Neues Attribut beendet das vorige.
            self.finish_attribute()?;
        }
        let is_declaration = matches!(prefix, Some("xmlns"))
            || (matches!(prefix, None | Some("")) && local_name == "xmlns")
            || namespace_uri == Some(XMLNS_NAMESPACE);
        self.current_attribute = Some(if is_declaration {
            let declared: Rc<str> = if local_name == "xmlns" && !matches!(prefix, Some("xmlns")) {
                Rc::from("")
            } else {
                Rc::from(local_name)
            };
            PendingAttribute::namespace_declaration(declared)
        } else {
            let qname = self.resolve_attribute_name(prefix, local_name, namespace_uri)?;
            PendingAttribute::regular(qname)
        });
        Ok(())
    }

    fn finish_attribute(&mut self) -> Result<()> {
        let Some(attribute) = self.current_attribute.take() else {
            return Ok(());
        };
        if let Some(declared) = attribute.declares_prefix {
            // Identische Bindung bereits in Scope: Deklaration nicht doppeln.
            if !self.namespaces.is_bound(&declared, &attribute.value) {
                self.namespaces.declare(&declared, &attribute.value)?;
                let pending = self
                    .pending_element
                    .as_mut()
                    .expect("attributes only exist on a buffered element");
                pending
                    .namespace_decls
                    .push((declared, Rc::from(attribute.value.as_str())));
            }
        } else {
            let pending = self
                .pending_element
                .as_mut()
                .expect("attributes only exist on a buffered element");
            pending
                .attributes
                .push((attribute.qname.expect("regular attribute"), attribute.value));
        }
        Ok(())
    }

    fn chunk_body(&mut self, text: &str) -> Result<()> {
        self.write_header(None)?;
        self.flush_pending_element()?;
        self.commit_terminators()?;
        self.encode_chunk_text(text)
    }

    fn algorithm_chunk_body(&mut self, index: u32, octets: &[u8]) -> Result<()> {
        self.write_header(None)?;
        self.flush_pending_element()?;
        self.commit_terminators()?;
        self.encode_chunk_algorithm(index, octets)
    }

    fn alphabet_chunk_body(&mut self, index: u32, octets: &[u8], text: &str) -> Result<()> {
        self.write_header(None)?;
        self.flush_pending_element()?;
        self.commit_terminators()?;
        self.encode_chunk_alphabet(index, octets, text)
    }

    fn comment_body(&mut self, text: &str) -> Result<()> {
        self.write_header(None)?;
        self.flush_pending_element()?;
        self.commit_terminators()?;
        self.out.write_byte(0xE2)?;
        self.encode_non_identifying_first_bit(ValueTable::OtherString, text)
    }

    fn processing_instruction_body(&mut self, target: &str, data: &str) -> Result<()> {
        self.write_header(None)?;
        self.flush_pending_element()?;
        self.commit_terminators()?;
        self.out.write_byte(0xE1)?;
        self.encode_identifying(IdTable::OtherNcName, target)?;
        self.encode_non_identifying_first_bit(ValueTable::OtherString, data)
    }

    fn end_element_body(&mut self) -> Result<()> {
        if self.current_attribute.is_some() {
            self.finish_attribute()?;
        }
        self.flush_pending_element()?;
        self.defer_terminator()?;
        self.depth -= 1;
        self.namespaces.pop_scope();
        Ok(())
    }

    fn end_document_body(&mut self) -> Result<()> {
        if self.current_attribute.is_some() {
            self.finish_attribute()?;
        }
        // Offene Elemente schließen (Konvenienz-Übergang).
        while self.depth > 0 {
            self.end_element_body()?;
        }
        self.defer_terminator()?;
        self.commit_terminators()?;
        self.out.flush()
    }

    // --- element flushing and terminators ---

    /// Serializes the buffered element as an open element: namespace
    /// block, qualified name, attribute list (X.891 C.3).
    fn flush_pending_element(&mut self) -> Result<()> {
        let Some(pending) = self.pending_element.take() else {
            return Ok(());
        };
        let attrs_flag = if pending.attributes.is_empty() { 0x00 } else { 0x40 };
        if pending.namespace_decls.is_empty() {
            self.encode_element_qname(attrs_flag, &pending.qname)?;
        } else {
            self.out.write_byte(attrs_flag | 0x38)?;
            for (prefix, uri) in &pending.namespace_decls {
                let mut nb = 0xCC;
                if !prefix.is_empty() {
                    nb |= 0x02;
                }
                if !uri.is_empty() {
                    nb |= 0x01;
                }
                self.out.write_byte(nb)?;
                if !prefix.is_empty() {
                    self.encode_identifying(IdTable::Prefix, prefix)?;
                }
                if !uri.is_empty() {
                    self.encode_identifying(IdTable::Namespace, uri)?;
                }
            }
            self.out.write_byte(TERMINATOR)?;
            self.encode_element_qname(0x00, &pending.qname)?;
        }

        for (qname, value) in &pending.attributes {
            self.encode_attribute_qname(qname)?;
            self.encode_non_identifying_first_bit(ValueTable::AttributeValue, value)?;
        }
        if attrs_flag != 0 {
            // Ende der Attributliste, verschmelzbar mit dem Elementende.
            self.defer_terminator()?;
        }
        Ok(())
    }

    fn defer_terminator(&mut self) -> Result<()> {
        self.terminators = match self.terminators {
            Terminators::None => Terminators::Single,
            Terminators::Single => Terminators::Double,
            Terminators::Double => {
                self.out.write_byte(DOUBLE_TERMINATOR)?;
                Terminators::Single
            }
        };
        Ok(())
    }

    fn commit_terminators(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.terminators, Terminators::None) {
            Terminators::None => Ok(()),
            Terminators::Single => self.out.write_byte(TERMINATOR),
            Terminators::Double => self.out.write_byte(DOUBLE_TERMINATOR),
        }
    }

    // --- namespace resolution (encoder side of 7.1) ---

    fn resolve_element_name(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<(QName, Vec<(Rc<str>, Rc<str>)>)> {
        let mut decls: Vec<(Rc<str>, Rc<str>)> = Vec::new();
        let (prefix, uri): (Rc<str>, Rc<str>) = match (prefix, namespace_uri) {
            (Some(p), Some(u)) if !u.is_empty() => {
                if !self.namespaces.is_bound(p, u) {
                    self.namespaces.declare(p, u)?;
                    decls.push((Rc::from(p), Rc::from(u)));
                }
                (Rc::from(p), Rc::from(u))
            }
            (None, Some(u)) if !u.is_empty() => {
                if let Some(p) = self.namespaces.lookup_prefix(u) {
                    (p, Rc::from(u))
                } else {
                    self.namespaces.declare("", u)?;
                    decls.push((Rc::from(""), Rc::from(u)));
                    (Rc::from(""), Rc::from(u))
                }
            }
            // Leerer Namespace-Name: unqualifiziert, keine Deklaration.
            (_, Some(_)) => (Rc::from(""), Rc::from("")),
            (Some(p), None) if !p.is_empty() => {
                let uri = self
                    .namespaces
                    .resolve_prefix(p)
                    .ok_or_else(|| Error::UndefinedNamespaceForPrefix(p.to_owned()))?;
                (Rc::from(p), uri)
            }
            (_, None) => {
                // Kein Prefix: der Default-Namespace des Scopes gilt.
                let uri = self
                    .namespaces
                    .resolve_prefix("")
                    .unwrap_or_else(|| Rc::from(""));
                (Rc::from(""), uri)
            }
        };
        Ok((
            QName::from_parts(prefix, uri, Rc::from(local_name)),
            decls,
        ))
    }

    fn resolve_attribute_name(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<QName> {
        match (prefix, namespace_uri) {
            (Some(p), Some(u)) if !p.is_empty() && !u.is_empty() => {
                if !self.namespaces.is_bound(p, u) {
                    self.declare_on_pending(p, u)?;
                }
                Ok(QName::new(p, u, local_name))
            }
            (_, Some(u)) if !u.is_empty() => {
                // Attribute brauchen einen benannten Prefix: vorhandenen
                // wiederverwenden oder einen generieren.
                if let Some(p) = self.namespaces.lookup_named_prefix(u) {
                    Ok(QName::from_parts(p, Rc::from(u), Rc::from(local_name)))
                } else {
                    let p = self.namespaces.generate_prefix(self.depth);
                    self.declare_on_pending(&p, u)?;
                    Ok(QName::from_parts(p, Rc::from(u), Rc::from(local_name)))
                }
            }
            (Some(p), None) if !p.is_empty() => {
                let uri = self
                    .namespaces
                    .resolve_prefix(p)
                    .ok_or_else(|| Error::UndefinedNamespaceForPrefix(p.to_owned()))?;
                Ok(QName::from_parts(Rc::from(p), uri, Rc::from(local_name)))
            }
            _ => Ok(QName::local(local_name)),
        }
    }

    fn declare_on_pending(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.namespaces.declare(prefix, uri)?;
        if let Some(pending) = &mut self.pending_element {
            pending.namespace_decls.push((Rc::from(prefix), Rc::from(uri)));
        }
        Ok(())
    }
}
