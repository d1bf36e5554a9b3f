//! Character-string forms of the parser (X.891 C.13, C.14, C.15, C.19,
//! C.20, C.22).
//!
//! Identifying strings (names, targets, identifiers) are always UTF-8 and
//! always enter their table. Non-identifying strings (attribute values,
//! chunks, comments, PI data) carry an encoding discriminant (UTF-8,
//! UTF-16BE, restricted alphabet, encoding algorithm) and an add-to-table
//! bit controlled by the encoder.

use std::io::Read;
use std::rc::Rc;

use crate::alphabet::RestrictedAlphabet;
use crate::event::EncodedOctets;
use crate::vocabulary::StringTable;
use crate::{algorithm, integer, octet_string, Error, Result};

use super::Decoder;

/// Selector for the string tables of the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StrTable {
    Prefix,
    Namespace,
    LocalName,
    OtherNcName,
    OtherUri,
    OtherString,
    AttributeValue,
    CharacterChunk,
}

/// Result of a non-identifying string form.
pub(super) struct NonIdentifying {
    pub text: Rc<str>,
    /// Present when the string was carried by an encoding algorithm.
    pub encoded: Option<EncodedOctets>,
}

/// Encoding discriminant of an EncodedCharacterString (C.19.3, C.20.3).
const ENCODING_UTF8: u8 = 0;
const ENCODING_UTF16: u8 = 1;
const ENCODING_ALPHABET: u8 = 2;
const ENCODING_ALGORITHM: u8 = 3;

impl<R: Read> Decoder<R> {
    pub(super) fn table(&self, which: StrTable) -> &StringTable {
        match which {
            StrTable::Prefix => &self.vocabulary.prefixes,
            StrTable::Namespace => &self.vocabulary.namespaces,
            StrTable::LocalName => &self.vocabulary.local_names,
            StrTable::OtherNcName => &self.vocabulary.other_ncnames,
            StrTable::OtherUri => &self.vocabulary.other_uris,
            StrTable::OtherString => &self.vocabulary.other_strings,
            StrTable::AttributeValue => &self.vocabulary.attribute_values,
            StrTable::CharacterChunk => &self.vocabulary.character_chunks,
        }
    }

    fn table_mut(&mut self, which: StrTable) -> &mut StringTable {
        match which {
            StrTable::Prefix => &mut self.vocabulary.prefixes,
            StrTable::Namespace => &mut self.vocabulary.namespaces,
            StrTable::LocalName => &mut self.vocabulary.local_names,
            StrTable::OtherNcName => &mut self.vocabulary.other_ncnames,
            StrTable::OtherUri => &mut self.vocabulary.other_uris,
            StrTable::OtherString => &mut self.vocabulary.other_strings,
            StrTable::AttributeValue => &mut self.vocabulary.attribute_values,
            StrTable::CharacterChunk => &mut self.vocabulary.character_chunks,
        }
    }

    /// Reads `len` octets into the scratch buffer and decodes UTF-8.
    pub(super) fn read_utf8(&mut self, len: usize) -> Result<Rc<str>> {
        self.scratch.resize(len, 0);
        // Split-Borrow über Feldzugriff, scratch gehört nicht zum Input.
        let Self { input, scratch, .. } = self;
        input.read_exact(scratch)?;
        std::str::from_utf8(scratch)
            .map(Rc::from)
            .map_err(|_| Error::InvalidCharacterString)
    }

    /// Reads `len` octets and decodes UTF-16BE (C.19.3.2).
    fn read_utf16(&mut self, len: usize) -> Result<Rc<str>> {
        if len % 2 != 0 {
            return Err(Error::InvalidCharacterString);
        }
        self.scratch.resize(len, 0);
        let Self { input, scratch, .. } = self;
        input.read_exact(scratch)?;
        let units: Vec<u16> = scratch
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map(Rc::from)
            .map_err(|_| Error::InvalidCharacterString)
    }

    /// NonEmptyOctetString on the second bit of a fresh octet, decoded as
    /// UTF-8 (C.22; used by header components and vocabulary items).
    pub(super) fn decode_utf8_octet_string(&mut self) -> Result<Rc<str>> {
        let first = self.input.read_byte()?;
        if first & 0x80 != 0 {
            return Err(Error::MalformedHeader);
        }
        let len = octet_string::decode_length_on_second_bit(&mut self.input, first)?;
        self.read_utf8(len)
    }

    /// IdentifyingStringOrIndex starting on the first bit (C.13).
    pub(super) fn decode_identifying(&mut self, which: StrTable) -> Result<Rc<str>> {
        let b = self.input.read_byte()?;
        if b & 0x80 == 0 {
            let len = octet_string::decode_length_on_second_bit(&mut self.input, b)?;
            let text = self.read_utf8(len)?;
            // Identifying strings gehen immer in die Tabelle (C.13.4).
            let table = self.table_mut(which);
            match table.add(&text) {
                Some(index) => Ok(table.get(index).unwrap_or(text)),
                None => Ok(text),
            }
        } else {
            let index = integer::decode_on_second_bit(&mut self.input, b)?;
            let table = self.table(which);
            table.get(index).ok_or(Error::VocabularyIndexOutOfBounds {
                index,
                len: table.len(),
            })
        }
    }

    /// NonIdentifyingStringOrIndex starting on the first bit (C.14):
    /// attribute values, comment text, PI data, the version component.
    pub(super) fn decode_non_identifying_first_bit(
        &mut self,
        which: StrTable,
    ) -> Result<NonIdentifying> {
        let b = self.input.read_byte()?;
        if b & 0x80 == 0 {
            let add_to_table = b & 0x40 != 0;
            let encoding = (b >> 4) & 0x03;
            let result = match encoding {
                ENCODING_UTF8 => {
                    let len = octet_string::decode_length_on_fifth_bit(&mut self.input, b)?;
                    let text = self.read_utf8(len)?;
                    NonIdentifying { text, encoded: None }
                }
                ENCODING_UTF16 => {
                    let len = octet_string::decode_length_on_fifth_bit(&mut self.input, b)?;
                    let text = self.read_utf16(len)?;
                    NonIdentifying { text, encoded: None }
                }
                _ => {
                    // Der 8-Bit-Index überspannt die Octet-Grenze (C.29).
                    let nb = self.input.read_byte()?;
                    let index = integer::octet_index_from_wire((b & 0x0F) << 4 | nb >> 4);
                    let len = octet_string::decode_length_on_fifth_bit(&mut self.input, nb)?;
                    self.decode_encoded_payload(encoding, index, len)?
                }
            };
            if add_to_table && !result.text.is_empty() {
                self.table_mut(which).add(&result.text);
            }
            Ok(result)
        } else if b == 0xFF {
            // Null-Index: der leere String (C.14.2, C.26).
            Ok(NonIdentifying { text: Rc::from(""), encoded: None })
        } else {
            let index = integer::decode_on_second_bit(&mut self.input, b)?;
            let table = self.table(which);
            let text = table.get(index).ok_or(Error::VocabularyIndexOutOfBounds {
                index,
                len: table.len(),
            })?;
            Ok(NonIdentifying { text, encoded: None })
        }
    }

    /// NonIdentifyingStringOrIndex starting on the third bit (C.15):
    /// character chunks. `b` is the already-read chunk identifier octet.
    pub(super) fn decode_non_identifying_third_bit(&mut self, b: u8) -> Result<NonIdentifying> {
        if b & 0x20 == 0 {
            let add_to_table = b & 0x10 != 0;
            let encoding = (b >> 2) & 0x03;
            let result = match encoding {
                ENCODING_UTF8 => {
                    let len = octet_string::decode_length_on_seventh_bit(&mut self.input, b)?;
                    let text = self.read_utf8(len)?;
                    NonIdentifying { text, encoded: None }
                }
                ENCODING_UTF16 => {
                    let len = octet_string::decode_length_on_seventh_bit(&mut self.input, b)?;
                    let text = self.read_utf16(len)?;
                    NonIdentifying { text, encoded: None }
                }
                _ => {
                    let nb = self.input.read_byte()?;
                    let index = integer::octet_index_from_wire((b & 0x03) << 6 | nb >> 2);
                    let len = octet_string::decode_length_on_seventh_bit(&mut self.input, nb)?;
                    self.decode_encoded_payload(encoding, index, len)?
                }
            };
            if add_to_table && !result.text.is_empty() {
                self.table_mut(StrTable::CharacterChunk).add(&result.text);
            }
            Ok(result)
        } else {
            let index = integer::decode_on_fourth_bit(&mut self.input, b)?;
            let table = self.table(StrTable::CharacterChunk);
            let text = table.get(index).ok_or(Error::VocabularyIndexOutOfBounds {
                index,
                len: table.len(),
            })?;
            Ok(NonIdentifying { text, encoded: None })
        }
    }

    /// Restricted-alphabet or encoding-algorithm payload of an
    /// EncodedCharacterString (C.19.4, C.20.4).
    fn decode_encoded_payload(
        &mut self,
        encoding: u8,
        index: u32,
        len: usize,
    ) -> Result<NonIdentifying> {
        let octets = self.input.read_bytes(len)?;
        if encoding == ENCODING_ALPHABET {
            let text = self.resolve_alphabet(index)?.decode(&octets)?;
            Ok(NonIdentifying { text: Rc::from(text.as_str()), encoded: None })
        } else {
            debug_assert_eq!(encoding, ENCODING_ALGORITHM);
            let text = algorithm::octets_to_text(&self.vocabulary, index, &octets)?;
            Ok(NonIdentifying {
                text: Rc::from(text.as_str()),
                encoded: Some(EncodedOctets { algorithm: index, octets: Rc::from(octets) }),
            })
        }
    }

    /// Resolves a restricted-alphabet wire index (C.19.3.3).
    fn resolve_alphabet(&self, index: u32) -> Result<&RestrictedAlphabet> {
        match index {
            crate::alphabet::NUMERIC_INDEX => Ok(&self.builtin_numeric),
            crate::alphabet::DATE_TIME_INDEX => Ok(&self.builtin_date_time),
            _ => self
                .vocabulary
                .alphabet(index)
                .ok_or(Error::UnknownRestrictedAlphabet(index)),
        }
    }
}
