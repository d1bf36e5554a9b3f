use super::*;
use crate::event::NodeKind;

const HEADER: [u8; 5] = [0xE0, 0x00, 0x00, 0x01, 0x00];

fn with_header(body: &[u8]) -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(body);
    bytes
}

// ========================================================================
// Framing
// ========================================================================

/// Minimal document: `<a/>` with a literal name, element close and
/// document close coalesced into a double terminator.
#[test]
fn minimal_document() {
    let bytes = with_header(&[0x3C, 0x00, 0x61, 0xFF]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, NodeKind::Element);
    assert_eq!(&*events[0].qname.local_name, "a");
    assert_eq!(events[0].depth, 1);
    assert!(events[0].attributes.is_empty());
    assert_eq!(events[1].kind, NodeKind::EndElement);
    assert_eq!(events[1].depth, 0);
}

/// Separate terminators for element and document are equivalent to the
/// coalesced form.
#[test]
fn separate_terminators() {
    let bytes = with_header(&[0x3C, 0x00, 0x61, 0xF0, 0xF0]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind, NodeKind::EndElement);
}

#[test]
fn declaration_before_magic() {
    let mut bytes = b"<?xml encoding='finf'?>".to_vec();
    bytes.extend_from_slice(&with_header(&[0x3C, 0x00, 0x61, 0xFF]));
    let mut decoder = Decoder::new(&bytes[..]);
    assert!(decoder.read().unwrap().is_some());
    assert_eq!(decoder.declaration(), Some(Declaration::default()));
}

#[test]
fn unknown_declaration_rejected() {
    let mut bytes = b"<?xml version='1.0'?>".to_vec();
    bytes.extend_from_slice(&with_header(&[0x3C, 0x00, 0x61, 0xFF]));
    assert_eq!(decode(&bytes), Err(Error::InvalidDeclaration));
}

#[test]
fn missing_magic_rejected() {
    assert_eq!(
        decode(&[0xE0, 0x00, 0x00, 0x02, 0x00, 0xF0]),
        Err(Error::InvalidMagic)
    );
}

#[test]
fn truncated_stream() {
    assert_eq!(decode(&[0xE0, 0x00]), Err(Error::UnexpectedEof));
    // Element-Identifier ohne Namen.
    assert_eq!(decode(&with_header(&[0x3C])), Err(Error::UnexpectedEof));
}

/// X.891 C.2.3: the padding bit of the presence octet must be zero.
#[test]
fn options_padding_bit_rejected() {
    assert_eq!(
        decode(&[0xE0, 0x00, 0x00, 0x01, 0x80, 0xF0]),
        Err(Error::MalformedHeader)
    );
}

/// After an error, every further read reports the same error.
#[test]
fn error_is_latched() {
    let bytes = with_header(&[0xE3]);
    let mut decoder = Decoder::new(&bytes[..]);
    assert_eq!(
        decoder.read(),
        Err(Error::InvalidIdentifier { identifier: 0xE3 })
    );
    assert_eq!(
        decoder.read(),
        Err(Error::InvalidIdentifier { identifier: 0xE3 })
    );
}

// ========================================================================
// Elements, attributes, name tables
// ========================================================================

/// `<x a="v"/><x a="v"/>`: the second element is coded entirely through
/// index references (element name 1, attribute name 1, value 1).
#[test]
fn name_and_value_tables_reused() {
    let bytes = with_header(&[
        0x7C, 0x00, 0x78, // element, literal qname "x", attributes follow
        0x78, 0x00, 0x61, // literal attribute qname "a"
        0x40, 0x76, // value "v", add-to-table
        0xFF, // end attributes + end element
        0x40, // element index 1, attributes follow
        0x00, // attribute name index 1
        0x80, // value index 1
        0xFF, // end attributes + end element
        0xF0, // end document
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 4);
    for pair in events.chunks(2) {
        assert_eq!(pair[0].kind, NodeKind::Element);
        assert_eq!(&*pair[0].qname.local_name, "x");
        assert_eq!(pair[0].attributes.len(), 1);
        assert_eq!(&*pair[0].attributes[0].qname.local_name, "a");
        assert_eq!(&*pair[0].attributes[0].value, "v");
        assert_eq!(pair[1].kind, NodeKind::EndElement);
    }
}

/// `<p:r xmlns:p="u"><p:c/></p:r>`: the namespace-attribute block precedes
/// the element name; prefix and namespace enter their tables.
#[test]
fn namespace_attributes() {
    let bytes = with_header(&[
        0x38, // element with namespace attributes
        0xCF, 0x00, 0x70, 0x00, 0x75, // xmlns:p="u", both literal
        0xF0, // end of namespace attributes
        0x3F, 0x81, 0x81, 0x00, 0x72, // literal qname p:r via prefix/ns index 2
        0x3F, 0x81, 0x81, 0x00, 0x63, // child p:c
        0xFF, // close c + close r
        0xF0, // end document
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 4);

    let root = &events[0];
    assert_eq!(&*root.qname.prefix, "p");
    assert_eq!(&*root.qname.namespace_uri, "u");
    assert_eq!(&*root.qname.local_name, "r");
    assert_eq!(root.attributes.len(), 1);
    let decl = &root.attributes[0];
    assert_eq!(&*decl.qname.prefix, "xmlns");
    assert_eq!(&*decl.qname.local_name, "p");
    assert_eq!(&*decl.value, "u");

    assert_eq!(&*events[1].qname.local_name, "c");
    assert_eq!(events[1].depth, 2);
    assert_eq!(events[2].kind, NodeKind::EndElement);
    assert_eq!(events[3].kind, NodeKind::EndElement);
}

/// A prefix flag without a namespace flag is not a well-formed name.
#[test]
fn literal_qname_prefix_without_namespace() {
    // Literal element qname with flags '10': prefix only.
    let bytes = with_header(&[0x3E, 0x00, 0x70, 0x00, 0x72, 0xFF]);
    assert_eq!(decode(&bytes), Err(Error::InvalidQName));
}

#[test]
fn element_name_index_out_of_bounds() {
    let bytes = with_header(&[0x00, 0xFF]);
    assert_eq!(
        decode(&bytes),
        Err(Error::VocabularyIndexOutOfBounds { index: 1, len: 0 })
    );
}

/// Empty attribute value: the single octet 0xFF (zero index).
#[test]
fn empty_attribute_value() {
    let bytes = with_header(&[
        0x7C, 0x00, 0x78, // element "x" with attributes
        0x78, 0x00, 0x61, // attribute "a"
        0xFF, // empty string
        0xFF, // end attributes + end element
        0xF0,
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(&*events[0].attributes[0].value, "");
}

// ========================================================================
// Content
// ========================================================================

/// Literal UTF-8 chunk with add-to-table, then an index reference.
#[test]
fn character_chunk_table() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0x91, 0x68, 0x69, // chunk "hi", add-to-table
        0xA0, // chunk index 1
        0xFF, // close a + end document
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[1].kind, NodeKind::Text);
    assert_eq!(&*events[1].value, "hi");
    assert_eq!(events[1].depth, 1);
    assert_eq!(&*events[2].value, "hi");
}

/// UTF-16BE chunk.
#[test]
fn utf16_chunk() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0x85, 0x00, 0x41, // chunk "A" in UTF-16BE
        0xFF,
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(&*events[1].value, "A");
}

/// Restricted-alphabet chunk: numeric alphabet, "3.14e0" in three octets.
#[test]
fn restricted_alphabet_chunk() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0x98, 0x02, 0x00, 0x3C, 0x14, 0xD0, // alphabet 1, add, 3 octets
        0xFF,
    ]);
    let mut decoder = Decoder::new(&bytes[..]);
    decoder.read().unwrap();
    let chunk = decoder.read().unwrap().unwrap();
    assert_eq!(chunk.kind, NodeKind::Text);
    assert_eq!(&*chunk.value, "3.14e0");
    // add-to-table wirkt auf die decodierte String-Form.
    assert_eq!(decoder.vocabulary.character_chunks.index_of("3.14e0"), Some(1));
}

#[test]
fn reserved_alphabet_index_rejected() {
    // Alphabet index 5 (reserved).
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, //
        0x88, 0x10, 0x00, 0xAA, // alphabet index 5, 1 octet
        0xFF,
    ]);
    assert_eq!(decode(&bytes), Err(Error::UnknownRestrictedAlphabet(5)));
}

/// Encoding-algorithm chunk: built-in "int", payload `1 -1`.
#[test]
fn algorithm_chunk() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0x8C, 0x0E, 0x05, // algorithm 4, 8 octets
        0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF,
    ]);
    let events = decode(&bytes).unwrap();
    let chunk = &events[1];
    assert_eq!(chunk.kind, NodeKind::Text);
    assert_eq!(&*chunk.value, "1 -1");
    let encoded = chunk.encoded.as_ref().unwrap();
    assert_eq!(encoded.algorithm, 4);
    assert_eq!(&*encoded.octets, &[0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF][..]);
}

/// The CDATA algorithm flips the node kind.
#[test]
fn cdata_chunk() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, //
        0x8C, 0x25, 0x68, 0x69, // algorithm 10, 2 octets "hi"
        0xFF,
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events[1].kind, NodeKind::Cdata);
    assert_eq!(&*events[1].value, "hi");
}

/// Comments and processing instructions inside and outside elements.
#[test]
fn comment_and_pi() {
    let bytes = with_header(&[
        0xE2, 0x02, 0x63, 0x6D, 0x74, // comment "cmt" at depth 0
        0x3C, 0x00, 0x61, // <a>
        0xE1, 0x01, 0x70, 0x69, 0x03, 0x64, 0x61, 0x74, 0x61, // <?pi data?>
        0xFF, // close a + end document
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].kind, NodeKind::Comment);
    assert_eq!(&*events[0].value, "cmt");
    assert_eq!(events[0].depth, 0);
    assert_eq!(events[2].kind, NodeKind::ProcessingInstruction);
    assert_eq!(&*events[2].qname.local_name, "pi");
    assert_eq!(&*events[2].value, "data");
}

/// Unexpanded entity reference in content.
#[test]
fn entity_reference() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0xC8, 0x00, 0x65, // &e;
        0xFF,
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events[1].kind, NodeKind::EntityReference);
    assert_eq!(&*events[1].qname.local_name, "e");
}

/// Document type declaration with public and system identifiers; child
/// processing instructions are consumed.
#[test]
fn document_type_declaration() {
    let bytes = with_header(&[
        0xC7, 0x00, 0x50, 0x00, 0x53, // DTD, public "P", system "S"
        0xE1, 0x01, 0x70, 0x69, 0xFF, // PI child (empty data), dropped
        0xF0, // end of DTD
        0x3C, 0x00, 0x61, // <a/>
        0xFF,
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events[0].kind, NodeKind::DocumentType);
    assert_eq!(&*events[0].attribute("public").unwrap().value, "P");
    assert_eq!(&*events[0].attribute("system").unwrap().value, "S");
    assert_eq!(events[1].kind, NodeKind::Element);
}

/// Character chunks are not permitted at document level.
#[test]
fn chunk_at_document_level_rejected() {
    let bytes = with_header(&[0x91, 0x68, 0x69, 0xF0]);
    assert_eq!(
        decode(&bytes),
        Err(Error::InvalidIdentifier { identifier: 0x91 })
    );
}

// ========================================================================
// Double terminator / pending close
// ========================================================================

/// `<a><b/></a>`: FF closes b and latches the close of a; the latched
/// close consumes no input.
#[test]
fn double_terminator_latch() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0x3C, 0x00, 0x62, // <b>
        0xFF, // close b + close a
        0xF0, // end document
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(&*events[1].qname.local_name, "b");
    assert_eq!(events[2].kind, NodeKind::EndElement);
    assert_eq!(&*events[2].qname.local_name, "b");
    assert_eq!(events[3].kind, NodeKind::EndElement);
    assert_eq!(&*events[3].qname.local_name, "a");
}

/// Deep nesting closed entirely with coalesced terminators.
#[test]
fn nested_double_terminators() {
    let bytes = with_header(&[
        0x3C, 0x00, 0x61, // <a>
        0x3C, 0x00, 0x62, // <b>
        0x3C, 0x00, 0x63, // <c>
        0xFF, // close c + close b
        0xFF, // close a + end document
    ]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 6);
    let kinds: Vec<NodeKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            NodeKind::Element,
            NodeKind::Element,
            NodeKind::Element,
            NodeKind::EndElement,
            NodeKind::EndElement,
            NodeKind::EndElement,
        ]
    );
}

// ========================================================================
// Optional document components
// ========================================================================

/// standalone and version components.
#[test]
fn standalone_and_version() {
    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01, 0x03];
    bytes.extend_from_slice(&[0x01]); // standalone = yes
    bytes.extend_from_slice(&[0x02, 0x31, 0x2E, 0x30]); // version "1.0"
    bytes.extend_from_slice(&[0x3C, 0x00, 0x61, 0xFF]);
    let mut decoder = Decoder::new(&bytes[..]);
    assert!(decoder.read().unwrap().is_some());
    assert_eq!(decoder.standalone(), Some(true));
    assert_eq!(decoder.version(), Some("1.0"));
}

/// Initial vocabulary pre-populates tables that the body then references
/// by index only.
#[test]
fn initial_vocabulary_tables() {
    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01, 0x20];
    bytes.extend_from_slice(&[0x03, 0x80]); // prefixes, namespaces, local names
    bytes.extend_from_slice(&[0x00, 0x00, 0x70]); // 1 prefix: "p"
    bytes.extend_from_slice(&[0x00, 0x04, 0x75, 0x72, 0x6E, 0x3A, 0x75]); // 1 namespace: "urn:u"
    bytes.extend_from_slice(&[0x00, 0x00, 0x72]); // 1 local name: "r"
    bytes.extend_from_slice(&[0x3F, 0x81, 0x81, 0x80, 0xFF]); // <p:r/> by indices
    let events = decode(&bytes).unwrap();
    assert_eq!(&*events[0].qname.prefix, "p");
    assert_eq!(&*events[0].qname.namespace_uri, "urn:u");
    assert_eq!(&*events[0].qname.local_name, "r");
}

/// Name surrogates resolve against the string tables loaded before them.
#[test]
fn initial_vocabulary_name_surrogates() {
    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01, 0x20];
    bytes.extend_from_slice(&[0x00, 0x80 | 0x02]); // local names + element surrogates
    bytes.extend_from_slice(&[0x00, 0x00, 0x72]); // 1 local name: "r"
    bytes.extend_from_slice(&[0x00, 0x00, 0x00]); // 1 surrogate: local index 1
    bytes.extend_from_slice(&[0x00, 0xFF]); // element by index 1, then close+end
    let events = decode(&bytes).unwrap();
    assert_eq!(&*events[0].qname.local_name, "r");
}

/// An unregistered external vocabulary URI is a hard error.
#[test]
fn unknown_external_vocabulary() {
    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01, 0x20];
    bytes.extend_from_slice(&[0x10, 0x00]); // external vocabulary only
    bytes.extend_from_slice(&[0x04, 0x75, 0x72, 0x6E, 0x3A, 0x78]); // "urn:x"
    bytes.extend_from_slice(&[0xF0]);
    assert_eq!(
        decode(&bytes),
        Err(Error::UnknownExternalVocabulary("urn:x".into()))
    );
}

/// A registered external vocabulary seeds the per-stream tables.
#[test]
fn external_vocabulary_applied() {
    let mut template = crate::vocabulary::Vocabulary::new();
    template.local_names.add("ext");
    crate::vocabulary::register_external_vocabulary(
        crate::vocabulary::ExternalVocabulary::new("urn:test:dec", template),
    );

    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01, 0x20];
    bytes.extend_from_slice(&[0x10, 0x00]);
    bytes.extend_from_slice(&[0x0B]); // URI length 12
    bytes.extend_from_slice(b"urn:test:dec");
    // Literal element qname whose local name references index 1 ("ext").
    bytes.extend_from_slice(&[0x3C, 0x80, 0xFF]);
    let events = decode(&bytes).unwrap();
    assert_eq!(&*events[0].qname.local_name, "ext");
}

/// Notations and unparsed entities are parsed and exposed, not evented.
#[test]
fn notations_and_unparsed_entities() {
    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01, 0x18];
    // notations: one entry, system id only
    bytes.extend_from_slice(&[0xC2, 0x00, 0x6E, 0x00, 0x73, 0xF0]);
    // unparsed entities: one entry, no public id
    bytes.extend_from_slice(&[0xD0, 0x00, 0x75, 0x00, 0x76, 0x80, 0xF0]);
    bytes.extend_from_slice(&[0x3C, 0x00, 0x61, 0xFF]);
    let mut decoder = Decoder::new(&bytes[..]);
    assert!(decoder.read().unwrap().is_some());
    assert_eq!(decoder.notations().len(), 1);
    assert_eq!(&*decoder.notations()[0].name, "n");
    assert_eq!(decoder.notations()[0].system_id.as_deref(), Some("s"));
    assert_eq!(decoder.unparsed_entities().len(), 1);
    assert_eq!(&*decoder.unparsed_entities()[0].name, "u");
    assert_eq!(&*decoder.unparsed_entities()[0].system_id, "v");
    assert_eq!(&*decoder.unparsed_entities()[0].notation_name, "n");
}
