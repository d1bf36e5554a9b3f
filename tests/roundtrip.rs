//! Event round-trip properties: every event sequence the encoder
//! accepts decodes back to the same sequence, with element and attribute
//! order, namespace declarations, and content preserved.

use finset::decoder::decode;
use finset::encoder::{encode, Encoder, EncoderConfig};
use finset::{NodeEvent, NodeKind, TypedValue};

fn encode_with(f: impl FnOnce(&mut Encoder<&mut Vec<u8>>) -> finset::Result<()>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out).unwrap();
    f(&mut encoder).unwrap();
    encoder.close().unwrap();
    out
}

/// decode(encode(events)) == events for a representative document.
#[test]
fn full_document_round_trip() {
    let bytes = encode_with(|e| {
        e.write_start_document(None)?;
        e.write_comment(" head ")?;
        e.write_start_element(Some("p"), "root", Some("urn:root"))?;
        e.write_attribute(None, "id", None, "r1")?;
        e.write_attribute(Some("p"), "kind", Some("urn:root"), "demo")?;
        e.write_start_element(None, "item", Some(""))?;
        e.write_string("first")?;
        e.write_end_element()?;
        e.write_start_element(None, "item", Some(""))?;
        e.write_string("second")?;
        e.write_end_element()?;
        e.write_processing_instruction("proc", "data")?;
        e.write_end_element()?;
        e.write_comment(" tail ")?;
        e.write_end_document()
    });

    let events = decode(&bytes).unwrap();
    let reencoded = encode(&events, &EncoderConfig::default()).unwrap();
    let second = decode(&reencoded).unwrap();
    assert_eq!(events, second);

    // Struktur im Detail.
    assert_eq!(events[0].kind, NodeKind::Comment);
    let root = &events[1];
    assert_eq!(&*root.qname.prefix, "p");
    assert_eq!(&*root.qname.namespace_uri, "urn:root");
    // Deklaration + zwei reguläre Attribute.
    assert_eq!(root.attributes.len(), 3);
    assert_eq!(&*root.attributes[0].qname.prefix, "xmlns");
    assert_eq!(&*root.attributes[0].value, "urn:root");
}

/// Terminator sanity: every open element produces exactly one close, no
/// matter how the closes were spelled on the wire.
#[test]
fn open_close_balance() {
    let bytes = encode_with(|e| {
        e.write_start_element(None, "a", None)?;
        e.write_start_element(None, "b", None)?;
        e.write_start_element(None, "c", None)?;
        e.write_end_element()?;
        e.write_start_element(None, "d", None)?;
        e.write_end_document()
    });
    let events = decode(&bytes).unwrap();
    let opens = events.iter().filter(|e| e.kind == NodeKind::Element).count();
    let closes = events
        .iter()
        .filter(|e| e.kind == NodeKind::EndElement)
        .count();
    assert_eq!(opens, 4);
    assert_eq!(closes, 4);
    // End-Events tragen den Namen des geschlossenen Elements.
    let close_names: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == NodeKind::EndElement)
        .map(|e| &*e.qname.local_name)
        .collect();
    assert_eq!(close_names, ["c", "d", "b", "a"]);
}

/// Index monotonicity: re-encoding the same names yields a strictly
/// shrinking byte stream (indices replace literals), and the event
/// sequences stay identical.
#[test]
fn repeated_structure_compresses() {
    let one = encode_with(|e| {
        e.write_start_element(None, "row", None)?;
        e.write_attribute(None, "k", None, "v")?;
        e.write_end_document()
    });
    let many = encode_with(|e| {
        for _ in 0..10 {
            e.write_start_element(None, "row", None)?;
            e.write_attribute(None, "k", None, "v")?;
            e.write_end_element()?;
        }
        e.write_end_document()
    });
    let body_one = one.len() - 5;
    let body_many = many.len() - 5;
    // Neun Wiederholungen kosten je 4 Octets (Indizes + Terminator),
    // nicht je `body_one`.
    assert!(body_many < body_one + 9 * 5, "{body_many} vs {body_one}");
    let events = decode(&many).unwrap();
    assert_eq!(events.len(), 20);
    for pair in events.chunks(2) {
        assert_eq!(&*pair[0].attributes[0].value, "v");
    }
}

/// Typed payloads survive the round trip with raw octets attached.
#[test]
fn typed_values_round_trip() {
    let bytes = encode_with(|e| {
        e.write_start_element(None, "data", None)?;
        e.write_typed(&TypedValue::Shorts(vec![1, -1, 515]))?;
        e.write_typed(&TypedValue::Floats(vec![1.5]))?;
        e.write_typed(&TypedValue::Booleans(vec![true, false, true]))?;
        e.write_typed(&TypedValue::Uuids(vec![[0xAB; 16]]))?;
        e.write_base64(b"roundtrip")?;
        e.write_cdata("literal <text>")?;
        e.write_end_document()
    });
    let events = decode(&bytes).unwrap();
    let values: Vec<&str> = events[1..events.len() - 1]
        .iter()
        .map(|e| &*e.value)
        .collect();
    assert_eq!(
        values,
        [
            "1 -1 515",
            "1.5",
            "true false true",
            "abababab-abab-abab-abab-abababababab",
            "cm91bmR0cmlw",
            "literal <text>",
        ]
    );
    assert_eq!(events[6].kind, NodeKind::Cdata);
    // Rohe Octets bleiben am Event.
    assert_eq!(
        &*events[1].encoded.as_ref().unwrap().octets,
        &[0x00, 0x01, 0xFF, 0xFF, 0x02, 0x03][..]
    );

    // Replay über write_event erhält die Binärform.
    let replayed = encode(&events, &EncoderConfig::default()).unwrap();
    assert_eq!(decode(&replayed).unwrap(), events);
}

/// Restricted-alphabet content round-trips through both built-ins.
#[test]
fn alphabet_round_trip() {
    let bytes = encode_with(|e| {
        e.write_start_element(None, "n", None)?;
        e.write_string_with_alphabet(1, "3.14e0")?;
        e.write_string_with_alphabet(2, "2024-01-02T03:04:05Z")?;
        e.write_string_with_alphabet(1, "1.5")?; // ungerade Länge
        e.write_end_document()
    });
    let events = decode(&bytes).unwrap();
    assert_eq!(&*events[1].value, "3.14e0");
    assert_eq!(&*events[2].value, "2024-01-02T03:04:05Z");
    assert_eq!(&*events[3].value, "1.5");
}

/// A registered extended algorithm travels via the initial vocabulary.
#[test]
fn extended_algorithm_round_trip() {
    fn to_text(octets: &[u8]) -> finset::Result<String> {
        Ok(octets.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(","))
    }
    fn from_text(text: &str) -> finset::Result<Vec<u8>> {
        Ok(text.split(',').filter_map(|p| p.parse().ok()).collect())
    }
    finset::register_algorithm("urn:test:csv", to_text, from_text);

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out).unwrap();
    encoder.write_start_element(None, "x", None).unwrap();
    encoder.write_encoded("urn:test:csv", &[1, 2, 3]).unwrap();
    encoder.write_end_document().unwrap();
    encoder.close().unwrap();

    let events = decode(&out).unwrap();
    assert_eq!(&*events[1].value, "1,2,3");
    assert_eq!(events[1].encoded.as_ref().unwrap().algorithm, 32);
}

/// A registered extended alphabet travels via the initial vocabulary.
#[test]
fn extended_alphabet_round_trip() {
    let index = finset::register_restricted_alphabet(
        finset::RestrictedAlphabet::new("GATC").unwrap(),
    );
    assert_eq!(index, 16);

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out).unwrap();
    encoder.write_start_element(None, "dna", None).unwrap();
    encoder.write_string_with_alphabet(index, "GATTACA").unwrap();
    encoder.write_end_document().unwrap();
    encoder.close().unwrap();

    let events = decode(&out).unwrap();
    assert_eq!(&*events[1].value, "GATTACA");
}

/// A shared external vocabulary shrinks the stream and round-trips.
#[test]
fn external_vocabulary_round_trip() {
    let mut template = finset::Vocabulary::new();
    template.local_names.add("record");
    template.local_names.add("field");
    finset::register_external_vocabulary(finset::ExternalVocabulary::new(
        "urn:test:shared",
        template,
    ));

    let mut out = Vec::new();
    let config = EncoderConfig::with_external_vocabulary("urn:test:shared");
    let mut encoder = Encoder::with_config(&mut out, config).unwrap();
    encoder.write_start_element(None, "record", None).unwrap();
    encoder.write_start_element(None, "field", None).unwrap();
    encoder.write_end_document().unwrap();
    encoder.close().unwrap();

    let events = decode(&out).unwrap();
    assert_eq!(&*events[0].qname.local_name, "record");
    assert_eq!(&*events[1].qname.local_name, "field");
}

/// UTF-16 literals decode to the same events as UTF-8 literals.
#[test]
fn utf16_and_utf8_agree() {
    let drive = |config: EncoderConfig| -> Vec<NodeEvent> {
        let mut out = Vec::new();
        let mut encoder = Encoder::with_config(&mut out, config).unwrap();
        encoder.write_start_element(None, "x", None).unwrap();
        encoder.write_attribute(None, "a", None, "äöü").unwrap();
        encoder.write_string("grüße 漢字").unwrap();
        encoder.write_end_document().unwrap();
        encoder.close().unwrap();
        decode(&out).unwrap()
    };
    let utf8 = drive(EncoderConfig::default());
    let utf16 = drive(EncoderConfig {
        utf16_literals: true,
        ..EncoderConfig::default()
    });
    assert_eq!(utf8, utf16);
}
