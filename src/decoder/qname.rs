//! Qualified-name-or-index forms of the parser (X.891 C.17, C.18).
//!
//! Element names start on the third bit of their identifier octet,
//! attribute names on the second. A literal qualified name flags its
//! optional prefix and namespace components in the two lowest bits; an
//! index references the element-name or attribute-name table. Every
//! literal name enters the table, mirroring the encoder's insertions.

use std::io::Read;
use std::rc::Rc;

use crate::qname::QName;
use crate::{integer, Error, Result};

use super::strings::StrTable;
use super::Decoder;

impl<R: Read> Decoder<R> {
    /// Qualified-name-or-index starting on the third bit (C.18, element
    /// names). `b` is the element's identifier octet.
    pub(super) fn decode_element_name(&mut self, b: u8) -> Result<Rc<QName>> {
        if b & 0x3C == 0x3C {
            let qname = self.decode_literal_qname(b)?;
            self.vocabulary.element_names.add(&qname);
            // Rc aus der Tabelle teilen, falls die Einfügung durchging.
            Ok(self
                .vocabulary
                .element_names
                .index_of(&qname)
                .and_then(|i| self.vocabulary.element_names.get(i))
                .unwrap_or_else(|| Rc::new(qname)))
        } else {
            let index = integer::decode_on_third_bit(&mut self.input, b)?;
            self.vocabulary.element_names.get(index).ok_or(
                Error::VocabularyIndexOutOfBounds {
                    index,
                    len: self.vocabulary.element_names.len(),
                },
            )
        }
    }

    /// Qualified-name-or-index starting on the second bit (C.17,
    /// attribute names). `b` is the attribute's identifier octet.
    pub(super) fn decode_attribute_name(&mut self, b: u8) -> Result<Rc<QName>> {
        if b & 0x7C == 0x78 {
            let qname = self.decode_literal_qname(b)?;
            self.vocabulary.attribute_names.add(&qname);
            Ok(self
                .vocabulary
                .attribute_names
                .index_of(&qname)
                .and_then(|i| self.vocabulary.attribute_names.get(i))
                .unwrap_or_else(|| Rc::new(qname)))
        } else if b & 0x7F >= 0x7C {
            // '11111xx' ist in Namensposition nicht vergeben.
            Err(Error::InvalidIdentifier { identifier: b })
        } else {
            let index = integer::decode_on_second_bit(&mut self.input, b)?;
            self.vocabulary.attribute_names.get(index).ok_or(
                Error::VocabularyIndexOutOfBounds {
                    index,
                    len: self.vocabulary.attribute_names.len(),
                },
            )
        }
    }

    /// Literal qualified name: optional prefix, optional namespace name,
    /// mandatory local name, each an identifying string (C.18.3).
    ///
    /// Ein Prefix ohne Namespace-Name ist nicht wohlgeformt (C.18.3).
    fn decode_literal_qname(&mut self, b: u8) -> Result<QName> {
        let has_prefix = b & 0x02 != 0;
        let has_namespace = b & 0x01 != 0;
        if has_prefix && !has_namespace {
            return Err(Error::InvalidQName);
        }
        let prefix = if has_prefix {
            self.decode_identifying(StrTable::Prefix)?
        } else {
            Rc::from("")
        };
        let namespace_uri = if has_namespace {
            self.decode_identifying(StrTable::Namespace)?
        } else {
            Rc::from("")
        };
        let local_name = self.decode_identifying(StrTable::LocalName)?;
        Ok(QName::from_parts(prefix, namespace_uri, local_name))
    }
}
