//! Central error types for the Fast Infoset implementation.
//!
//! Each variant references the relevant ITU-T X.891 (ISO/IEC 24824-1) clause.

use core::fmt;
use std::borrow::Cow;

/// All error conditions raised by the Fast Infoset codec.
///
/// Jeder Fehler ist fatal für den aktuellen Stream: Parser und Encoder
/// wechseln in einen Error-Zustand, aus dem nur noch `close` erlaubt ist.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The fixed 4-octet identification `E0 00 00 01` is missing (X.891 12.6, 12.7).
    InvalidMagic,
    /// A plaintext XML declaration is present but matches none of the nine
    /// permitted `encoding='finf'` templates (X.891 12.3).
    InvalidDeclaration,
    /// The document header or one of its optional components is malformed (X.891 12.8, C.2).
    MalformedHeader,
    /// An octet carries identifier bits that match no item kind at the
    /// current position (X.891 C.2.11, C.3.7).
    InvalidIdentifier {
        /// Das Octet dessen Identifier-Bits nicht passten.
        identifier: u8,
    },
    /// An octet-string length field carries an unassigned discriminator
    /// (X.891 C.22, C.23, C.24).
    InvalidLengthEncoding,
    /// An integer field carries an unassigned discriminator or decodes
    /// outside 1..2^20 (X.891 C.25, C.27, C.28, C.29).
    InvalidIntegerEncoding,
    /// The input ended inside a structure.
    UnexpectedEof,
    /// A literal qualified name carries a prefix without a namespace name
    /// (X.891 C.18; W3C Namespaces constraint).
    InvalidQName,
    /// A literal character string is not valid UTF-8 / UTF-16BE (X.891 C.19, C.20).
    InvalidCharacterString,
    /// A restricted-alphabet payload decodes to a character index outside
    /// the alphabet, or the alphabet definition itself is unusable (X.891 C.20.3, 8).
    InvalidRestrictedAlphabet,
    /// A character was passed to a restricted-alphabet encoder that is not
    /// part of the alphabet (X.891 8.2).
    CharacterNotInAlphabet(char),
    /// A restricted-alphabet index references no known alphabet: 3..15 are
    /// reserved, 16.. must be established by the vocabulary (X.891 8.1, 9.2).
    UnknownRestrictedAlphabet(u32),
    /// An encoding-algorithm index or URI references no known algorithm:
    /// 11..31 are reserved, 32.. must be established by the vocabulary (X.891 10.1, 9.3).
    UnknownEncodingAlgorithm(Cow<'static, str>),
    /// An encoding-algorithm payload has an invalid length or content for
    /// its algorithm (X.891 10.2..10.11).
    InvalidAlgorithmData(Cow<'static, str>),
    /// A string or name index exceeds the current size of its vocabulary
    /// table (X.891 7.2.21).
    VocabularyIndexOutOfBounds {
        /// Wire-Index (1-basiert).
        index: u32,
        /// Aktuelle Tabellengröße.
        len: u32,
    },
    /// Loading an initial or external vocabulary would exceed the 2^20
    /// entry limit of a dynamic table (X.891 7.2.18).
    VocabularyTableFull,
    /// An external vocabulary URI was referenced that has not been
    /// registered with the codec (X.891 7.2.13).
    UnknownExternalVocabulary(String),
    /// A namespace prefix was used that is not in scope (encoder; W3C Namespaces).
    UndefinedNamespaceForPrefix(String),
    /// An attempt was made to rebind a reserved prefix or namespace name
    /// (`xml`, `xmlns`; W3C Namespaces 3).
    ReservedNamespace,
    /// An encoder operation is not permitted in the current writer state.
    InvalidState {
        /// Zustand in dem der Aufruf ankam.
        state: &'static str,
        /// Die nicht erlaubte Operation.
        operation: &'static str,
    },
    /// The operation is outside the supported Fast Infoset subset
    /// (DTD subset writing, entity-reference writing, surrogate char entities).
    UnsupportedFeature(&'static str),
    /// An underlying stream failure.
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "missing Fast Infoset identification E0 00 00 01 (X.891 12.6)"),
            Self::InvalidDeclaration => write!(f, "XML declaration is not a permitted encoding='finf' form (X.891 12.3)"),
            Self::MalformedHeader => write!(f, "malformed document header (X.891 12.8)"),
            Self::InvalidIdentifier { identifier } => {
                write!(f, "unrecognized identifier octet {identifier:#04X} (X.891 C.2, C.3)")
            }
            Self::InvalidLengthEncoding => write!(f, "invalid octet-string length discriminator (X.891 C.22..C.24)"),
            Self::InvalidIntegerEncoding => write!(f, "invalid integer discriminator or value out of range (X.891 C.25..C.29)"),
            Self::UnexpectedEof => write!(f, "unexpected end of stream"),
            Self::InvalidQName => write!(f, "literal qualified name has a prefix but no namespace name (X.891 C.18)"),
            Self::InvalidCharacterString => write!(f, "literal character string is not valid UTF-8/UTF-16BE (X.891 C.19, C.20)"),
            Self::InvalidRestrictedAlphabet => write!(f, "restricted-alphabet payload is not decodable (X.891 C.20.3)"),
            Self::CharacterNotInAlphabet(ch) => {
                write!(f, "character {ch:?} is not part of the restricted alphabet (X.891 8.2)")
            }
            Self::UnknownRestrictedAlphabet(index) => {
                write!(f, "restricted-alphabet index {index} is reserved or unknown (X.891 8.1)")
            }
            Self::UnknownEncodingAlgorithm(id) => {
                write!(f, "encoding algorithm '{id}' is reserved or unknown (X.891 10.1)")
            }
            Self::InvalidAlgorithmData(msg) => write!(f, "invalid encoding-algorithm payload: {msg} (X.891 10)"),
            Self::VocabularyIndexOutOfBounds { index, len } => {
                write!(f, "vocabulary index {index} exceeds table size {len} (X.891 7.2.21)")
            }
            Self::VocabularyTableFull => write!(f, "vocabulary table exceeds 2^20 entries (X.891 7.2.18)"),
            Self::UnknownExternalVocabulary(uri) => {
                write!(f, "external vocabulary '{uri}' is not registered (X.891 7.2.13)")
            }
            Self::UndefinedNamespaceForPrefix(prefix) => {
                write!(f, "namespace prefix '{prefix}' is not in scope")
            }
            Self::ReservedNamespace => write!(f, "reserved prefix or namespace name cannot be rebound"),
            Self::InvalidState { state, operation } => {
                write!(f, "operation {operation} is not permitted in writer state {state}")
            }
            Self::UnsupportedFeature(what) => write!(f, "unsupported feature: {what}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::IoError(err.to_string())
        }
    }
}

/// Crate-wide Result alias.
pub type Result<T> = std::result::Result<T, Error>;
