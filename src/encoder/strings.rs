//! String emission policy of the encoder (X.891 C.13, C.14, C.15).
//!
//! Identifying strings try their table first: a hit becomes an index, a
//! miss a literal that both sides then insert. Non-identifying strings
//! additionally honour the table-size policy: the empty string is the
//! zero index, long strings are coded literally without entering the
//! table, everything else is looked up and inserted on miss.

use std::io::Write;

use crate::vocabulary::StringTable;
use crate::{integer, octet_string, Result};

use super::Encoder;

/// Strings at or above this character count bypass the vocabulary
/// tables: one more literal is cheaper than a table slot that will
/// likely never be referenced again.
pub(super) const TABLE_LIMIT: usize = 60;

/// Identifying-string tables (C.13).
#[derive(Debug, Clone, Copy)]
pub(super) enum IdTable {
    Prefix,
    Namespace,
    LocalName,
    OtherNcName,
    OtherUri,
}

/// Non-identifying-string tables for the first-bit form (C.14).
#[derive(Debug, Clone, Copy)]
pub(super) enum ValueTable {
    AttributeValue,
    OtherString,
}

impl<W: Write> Encoder<W> {
    fn id_table_mut(&mut self, which: IdTable) -> &mut StringTable {
        match which {
            IdTable::Prefix => &mut self.vocabulary.prefixes,
            IdTable::Namespace => &mut self.vocabulary.namespaces,
            IdTable::LocalName => &mut self.vocabulary.local_names,
            IdTable::OtherNcName => &mut self.vocabulary.other_ncnames,
            IdTable::OtherUri => &mut self.vocabulary.other_uris,
        }
    }

    fn value_table_mut(&mut self, which: ValueTable) -> &mut StringTable {
        match which {
            ValueTable::AttributeValue => &mut self.vocabulary.attribute_values,
            ValueTable::OtherString => &mut self.vocabulary.other_strings,
        }
    }

    /// IdentifyingStringOrIndex starting on the first bit (C.13).
    /// Identifying strings are always UTF-8 and always enter the table.
    pub(super) fn encode_identifying(&mut self, which: IdTable, text: &str) -> Result<()> {
        debug_assert!(!text.is_empty(), "identifying strings are non-empty");
        if let Some(index) = self.id_table_mut(which).index_of(text) {
            return integer::encode_on_second_bit(&mut self.out, 0x80, index);
        }
        octet_string::encode_length_on_second_bit(&mut self.out, 0x00, text.len())?;
        self.out.write_bytes(text.as_bytes())?;
        self.id_table_mut(which).add(text);
        Ok(())
    }

    /// NonIdentifyingStringOrIndex starting on the first bit (C.14):
    /// attribute values, comment text, PI data.
    pub(super) fn encode_non_identifying_first_bit(
        &mut self,
        which: ValueTable,
        text: &str,
    ) -> Result<()> {
        if text.is_empty() {
            // Null-Index: der leere String (C.26).
            return integer::encode_zero_on_second_bit(&mut self.out, 0x80);
        }
        let add_to_table = text.chars().count() < TABLE_LIMIT;
        if add_to_table {
            if let Some(index) = self.value_table_mut(which).index_of(text) {
                return integer::encode_on_second_bit(&mut self.out, 0x80, index);
            }
            self.value_table_mut(which).add(text);
        }
        let lead = if add_to_table { 0x40 } else { 0x00 };
        self.write_encoded_chars_fifth_bit(lead, text)
    }

    /// Character chunk as plain text (C.15), with the same table policy
    /// against the content-character-chunk table.
    pub(super) fn encode_chunk_text(&mut self, text: &str) -> Result<()> {
        debug_assert!(!text.is_empty(), "empty chunks are never serialized");
        let add_to_table = text.chars().count() < TABLE_LIMIT;
        if add_to_table {
            if let Some(index) = self.vocabulary.character_chunks.index_of(text) {
                return integer::encode_on_fourth_bit(&mut self.out, 0xA0, index);
            }
            self.vocabulary.character_chunks.add(text);
        }
        let lead = 0x80 | if add_to_table { 0x10 } else { 0x00 };
        self.write_encoded_chars_seventh_bit(lead, text)
    }

    /// Character chunk over a restricted alphabet (C.15 with C.20.4).
    /// `octets` is the bit-packed payload, `text` the original characters
    /// for the table policy.
    pub(super) fn encode_chunk_alphabet(
        &mut self,
        index: u32,
        octets: &[u8],
        text: &str,
    ) -> Result<()> {
        debug_assert!((1..=256).contains(&index));
        let add_to_table = text.chars().count() < TABLE_LIMIT;
        if add_to_table {
            if let Some(existing) = self.vocabulary.character_chunks.index_of(text) {
                return integer::encode_on_fourth_bit(&mut self.out, 0xA0, existing);
            }
            self.vocabulary.character_chunks.add(text);
        }
        let wire = integer::octet_index_to_wire(index);
        let lead = 0x80 | if add_to_table { 0x10 } else { 0x00 } | 0x08 | (wire >> 6);
        self.out.write_byte(lead)?;
        let second = (wire & 0x3F) << 2;
        octet_string::encode_length_on_seventh_bit(&mut self.out, second, octets.len())?;
        self.out.write_bytes(octets)
    }

    /// Character chunk carried by an encoding algorithm (C.15 with
    /// C.20.4). Algorithm payloads never enter the chunk table.
    pub(super) fn encode_chunk_algorithm(&mut self, index: u32, octets: &[u8]) -> Result<()> {
        debug_assert!((1..=256).contains(&index));
        debug_assert!(!octets.is_empty(), "empty payloads are never serialized");
        let wire = integer::octet_index_to_wire(index);
        let lead = 0x80 | 0x0C | (wire >> 6);
        self.out.write_byte(lead)?;
        let second = (wire & 0x3F) << 2;
        octet_string::encode_length_on_seventh_bit(&mut self.out, second, octets.len())?;
        self.out.write_bytes(octets)
    }

    /// EncodedCharacterString starting on the fifth bit: UTF-8 or, per
    /// configuration, UTF-16BE (C.19).
    fn write_encoded_chars_fifth_bit(&mut self, lead: u8, text: &str) -> Result<()> {
        if self.config.utf16_literals {
            self.fill_scratch_utf16(text);
            octet_string::encode_length_on_fifth_bit(
                &mut self.out,
                lead | 0x10,
                self.scratch.len(),
            )?;
            let Self { out, scratch, .. } = self;
            out.write_bytes(scratch)
        } else {
            octet_string::encode_length_on_fifth_bit(&mut self.out, lead, text.len())?;
            self.out.write_bytes(text.as_bytes())
        }
    }

    /// EncodedCharacterString starting on the seventh bit (C.20).
    fn write_encoded_chars_seventh_bit(&mut self, lead: u8, text: &str) -> Result<()> {
        if self.config.utf16_literals {
            self.fill_scratch_utf16(text);
            octet_string::encode_length_on_seventh_bit(
                &mut self.out,
                lead | 0x04,
                self.scratch.len(),
            )?;
            let Self { out, scratch, .. } = self;
            out.write_bytes(scratch)
        } else {
            octet_string::encode_length_on_seventh_bit(&mut self.out, lead, text.len())?;
            self.out.write_bytes(text.as_bytes())
        }
    }

    /// UTF-16BE transcode into the reusable scratch buffer.
    fn fill_scratch_utf16(&mut self, text: &str) {
        self.scratch.clear();
        self.scratch.reserve(text.len() * 2);
        for unit in text.encode_utf16() {
            self.scratch.extend_from_slice(&unit.to_be_bytes());
        }
    }
}
