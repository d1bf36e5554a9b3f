//! finset – Fast Infoset (ITU-T X.891 / ISO/IEC 24824-1) streaming codec.
//!
//! Fast Infoset is a binary serialization of a subset of the XML infoset.
//! Compression comes from bit-packed framing and dynamic vocabulary
//! tables that both coder directions build in lockstep while processing
//! the document.
//!
//! # Beispiel
//!
//! ```
//! use finset::encoder::Encoder;
//! use finset::decoder::decode;
//! use finset::NodeKind;
//!
//! // Encode
//! let mut bytes = Vec::new();
//! let mut encoder = Encoder::new(&mut bytes).unwrap();
//! encoder.write_start_document(None).unwrap();
//! encoder.write_start_element(None, "greeting", None).unwrap();
//! encoder.write_string("Hello").unwrap();
//! encoder.write_end_document().unwrap();
//! encoder.close().unwrap();
//!
//! // Decode
//! let events = decode(&bytes).unwrap();
//! assert_eq!(events.len(), 3);
//! assert_eq!(events[1].kind, NodeKind::Text);
//! assert_eq!(&*events[1].value, "Hello");
//! ```

pub mod algorithm;
pub mod alphabet;
pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod header;
pub mod integer;
pub mod octet_string;
pub mod qname;
pub mod reader;
pub mod typed_value;
pub mod vocabulary;
pub mod xml;
pub mod xml_serializer;

pub use error::{Error, Result};

/// HashMap mit ahash (schnell, nicht DoS-resistent — für interne
/// Datenstrukturen). Nutzt hashbrown direkt.
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: events
pub use event::{Attribute, EncodedOctets, NodeEvent, NodeKind};

// Public API: names and vocabularies
pub use qname::QName;
pub use vocabulary::{
    external_vocabulary, register_external_vocabulary, ExternalVocabulary, Vocabulary,
};

// Public API: codec surfaces
pub use decoder::{decode, Decoder};
pub use encoder::{encode, Encoder, EncoderConfig};
pub use header::{Declaration, XmlVersion};
pub use reader::{ReadState, Reader};

// Public API: extension registries
pub use algorithm::register_algorithm;
pub use alphabet::{register_restricted_alphabet, RestrictedAlphabet};
pub use typed_value::{BuiltinAlgorithm, TypedValue};
