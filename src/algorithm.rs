//! Encoding-algorithm registry (X.891 10.1, 9.3).
//!
//! Wire indices 1..10 are the built-in algorithms, 11..31 are reserved,
//! and 32..255 are assigned to URI-identified extended algorithms in the
//! order their URIs appear in the stream's vocabulary.
//!
//! Erweiterte Algorithmen werden prozessweit per URI registriert; der
//! Encoder nimmt beim Konstruieren einen Schnappschuss und trägt die URIs
//! im Initial Vocabulary, der Parser löst sie beim ersten Gebrauch auf.

use std::cell::RefCell;
use std::rc::Rc;

use crate::typed_value::BuiltinAlgorithm;
use crate::vocabulary::Vocabulary;
use crate::{Error, FastIndexMap, Result};

/// First wire index available to extended algorithms.
pub const FIRST_EXTENDED_INDEX: u32 = 32;

/// Last assignable extended wire index.
pub const LAST_EXTENDED_INDEX: u32 = 255;

/// Conversion from an extended algorithm's wire payload to its string form.
pub type AlgorithmToText = fn(&[u8]) -> Result<String>;

/// Conversion from character data to an extended algorithm's wire payload.
pub type AlgorithmFromText = fn(&str) -> Result<Vec<u8>>;

/// A URI-identified extended encoding algorithm.
#[derive(Clone)]
pub struct ExtendedAlgorithm {
    pub uri: Rc<str>,
    pub to_text: AlgorithmToText,
    pub from_text: AlgorithmFromText,
}

thread_local! {
    static EXTENDED_ALGORITHMS: RefCell<FastIndexMap<Rc<str>, ExtendedAlgorithm>> =
        RefCell::new(FastIndexMap::default());
}

/// Registers an extended algorithm under its URI. Must happen before the
/// codec is constructed; the registry is read-only during coding.
///
/// Rückgabe: ggf. vorherige Registrierung derselben URI.
pub fn register_algorithm(
    uri: &str,
    to_text: AlgorithmToText,
    from_text: AlgorithmFromText,
) -> Option<ExtendedAlgorithm> {
    let uri: Rc<str> = Rc::from(uri);
    let entry = ExtendedAlgorithm { uri: Rc::clone(&uri), to_text, from_text };
    EXTENDED_ALGORITHMS.with(|registry| registry.borrow_mut().insert(uri, entry))
}

/// Looks up a registered extended algorithm by URI.
pub fn algorithm_by_uri(uri: &str) -> Option<ExtendedAlgorithm> {
    EXTENDED_ALGORITHMS.with(|registry| registry.borrow().get(uri).cloned())
}

/// Registered extended-algorithm URIs, in registration order.
pub fn registered_algorithm_uris() -> Vec<Rc<str>> {
    EXTENDED_ALGORITHMS.with(|registry| registry.borrow().keys().cloned().collect())
}

/// Converts the payload of an algorithm-encoded character string to its
/// string form, resolving the wire index against `vocabulary`.
///
/// # Errors
///
/// [`Error::UnknownEncodingAlgorithm`] for reserved indices (11..31),
/// indices past the vocabulary's algorithm table, and URIs without a
/// registered implementation.
pub fn octets_to_text(vocabulary: &Vocabulary, index: u32, octets: &[u8]) -> Result<String> {
    if let Some(builtin) = BuiltinAlgorithm::from_index(index) {
        return builtin.octets_to_text(octets);
    }
    if index < FIRST_EXTENDED_INDEX {
        return Err(Error::UnknownEncodingAlgorithm(index.to_string().into()));
    }
    let uri = vocabulary
        .algorithm_uri(index)
        .ok_or_else(|| Error::UnknownEncodingAlgorithm(index.to_string().into()))?;
    let algorithm = algorithm_by_uri(uri)
        .ok_or_else(|| Error::UnknownEncodingAlgorithm(uri.to_string().into()))?;
    (algorithm.to_text)(octets)
}
