//! Initial-vocabulary document component (X.891 C.2.5).
//!
//! The component opens with two presence octets (three padding bits, then
//! thirteen sub-table flags in fixed order). An external vocabulary is
//! applied first, so the in-stream sub-tables extend the copied template
//! at the indices both sides agree on.

use std::io::Read;
use std::rc::Rc;

use crate::alphabet::RestrictedAlphabet;
use crate::header::vocabulary_flags as flags;
use crate::qname::QName;
use crate::vocabulary::{external_vocabulary, QNameTable, StringTable};
use crate::{integer, octet_string, Error, Result};

use super::Decoder;

impl<R: Read> Decoder<R> {
    pub(super) fn decode_initial_vocabulary(&mut self) -> Result<()> {
        let b1 = self.input.read_byte()?;
        let b2 = self.input.read_byte()?;
        if b1 & 0xE0 != 0 {
            return Err(Error::MalformedHeader);
        }

        if b1 & flags::EXTERNAL_VOCABULARY != 0 {
            let uri = self.decode_utf8_octet_string()?;
            let external = external_vocabulary(&uri)
                .ok_or_else(|| Error::UnknownExternalVocabulary(uri.to_string()))?;
            self.vocabulary = external.instantiate();
        }
        if b1 & flags::RESTRICTED_ALPHABETS != 0 {
            let count = octet_string::decode_sequence_length(&mut self.input)?;
            for _ in 0..count {
                let characters = self.decode_utf8_octet_string()?;
                self.vocabulary
                    .alphabets
                    .push(RestrictedAlphabet::new(&characters)?);
            }
        }
        if b1 & flags::ENCODING_ALGORITHMS != 0 {
            let count = octet_string::decode_sequence_length(&mut self.input)?;
            for _ in 0..count {
                let uri = self.decode_utf8_octet_string()?;
                self.vocabulary.algorithm_uris.push(uri);
            }
        }
        if b1 & flags::PREFIXES != 0 {
            self.decode_string_items(|v| &mut v.prefixes)?;
        }
        if b1 & flags::NAMESPACE_NAMES != 0 {
            self.decode_string_items(|v| &mut v.namespaces)?;
        }
        if b2 & flags::LOCAL_NAMES != 0 {
            self.decode_string_items(|v| &mut v.local_names)?;
        }
        if b2 & flags::OTHER_NCNAMES != 0 {
            self.decode_string_items(|v| &mut v.other_ncnames)?;
        }
        if b2 & flags::OTHER_URIS != 0 {
            self.decode_string_items(|v| &mut v.other_uris)?;
        }
        if b2 & flags::ATTRIBUTE_VALUES != 0 {
            self.decode_string_items(|v| &mut v.attribute_values)?;
        }
        if b2 & flags::CONTENT_CHARACTER_CHUNKS != 0 {
            self.decode_string_items(|v| &mut v.character_chunks)?;
        }
        if b2 & flags::OTHER_STRINGS != 0 {
            self.decode_string_items(|v| &mut v.other_strings)?;
        }
        if b2 & flags::ELEMENT_NAME_SURROGATES != 0 {
            self.decode_name_surrogates(|v| &mut v.element_names)?;
        }
        if b2 & flags::ATTRIBUTE_NAME_SURROGATES != 0 {
            self.decode_name_surrogates(|v| &mut v.attribute_names)?;
        }
        Ok(())
    }

    fn decode_string_items(
        &mut self,
        select: impl Fn(&mut crate::vocabulary::Vocabulary) -> &mut StringTable,
    ) -> Result<()> {
        let count = octet_string::decode_sequence_length(&mut self.input)?;
        for _ in 0..count {
            let value = self.decode_utf8_octet_string()?;
            if select(&mut self.vocabulary).add(&value).is_none() {
                // Überlauf im Header ist ein harter Fehler, kein stiller
                // Drop wie bei dynamischen Einfügungen.
                return Err(Error::VocabularyTableFull);
            }
        }
        Ok(())
    }

    /// Name-surrogate sub-table (C.16): per entry a flags octet for the
    /// optional prefix and namespace indices, then the indices themselves,
    /// resolved against the string tables populated before this point.
    fn decode_name_surrogates(
        &mut self,
        select: impl Fn(&mut crate::vocabulary::Vocabulary) -> &mut QNameTable,
    ) -> Result<()> {
        let count = octet_string::decode_sequence_length(&mut self.input)?;
        for _ in 0..count {
            let b = self.input.read_byte()?;
            if b & 0xFC != 0 {
                return Err(Error::MalformedHeader);
            }
            let prefix = if b & 0x02 != 0 {
                Some(self.decode_surrogate_index(|v| &v.prefixes)?)
            } else {
                None
            };
            let namespace = if b & 0x01 != 0 {
                Some(self.decode_surrogate_index(|v| &v.namespaces)?)
            } else {
                None
            };
            if prefix.is_some() && namespace.is_none() {
                return Err(Error::InvalidQName);
            }
            let local = self.decode_surrogate_index(|v| &v.local_names)?;
            let qname = QName::from_parts(
                prefix.unwrap_or_else(|| Rc::from("")),
                namespace.unwrap_or_else(|| Rc::from("")),
                local,
            );
            if select(&mut self.vocabulary).add(&qname).is_none() {
                return Err(Error::VocabularyTableFull);
            }
        }
        Ok(())
    }

    /// One surrogate component index: a fresh octet whose first bit is
    /// padding, the integer starting on the second bit.
    fn decode_surrogate_index(
        &mut self,
        select: impl Fn(&crate::vocabulary::Vocabulary) -> &StringTable,
    ) -> Result<Rc<str>> {
        let b = self.input.read_byte()?;
        if b & 0x80 != 0 {
            return Err(Error::MalformedHeader);
        }
        let index = integer::decode_on_second_bit(&mut self.input, b)?;
        let table = select(&self.vocabulary);
        table.get(index).ok_or(Error::VocabularyIndexOutOfBounds {
            index,
            len: table.len(),
        })
    }
}
