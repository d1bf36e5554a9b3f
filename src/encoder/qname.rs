//! Qualified-name emission (X.891 C.17, C.18).
//!
//! A name that is already in its table becomes an index; otherwise the
//! literal form flags the optional prefix and namespace components, emits
//! each as an identifying string, and the name enters the table so the
//! next occurrence is one to three octets.

use std::io::Write;

use crate::qname::QName;
use crate::{integer, Error, Result};

use super::strings::IdTable;
use super::Encoder;

impl<W: Write> Encoder<W> {
    /// Qualified-name-or-index starting on the third bit (C.18, element
    /// names). `lead` carries the element's attribute flag.
    pub(super) fn encode_element_qname(&mut self, lead: u8, qname: &QName) -> Result<()> {
        if let Some(index) = self.vocabulary.element_names.index_of(qname) {
            return integer::encode_on_third_bit(&mut self.out, lead, index);
        }
        self.encode_literal_qname(lead | 0x3C, qname)?;
        self.vocabulary.element_names.add(qname);
        Ok(())
    }

    /// Qualified-name-or-index starting on the second bit (C.17,
    /// attribute names).
    pub(super) fn encode_attribute_qname(&mut self, qname: &QName) -> Result<()> {
        if let Some(index) = self.vocabulary.attribute_names.index_of(qname) {
            return integer::encode_on_second_bit(&mut self.out, 0x00, index);
        }
        self.encode_literal_qname(0x78, qname)?;
        self.vocabulary.attribute_names.add(qname);
        Ok(())
    }

    fn encode_literal_qname(&mut self, flag: u8, qname: &QName) -> Result<()> {
        if qname.has_prefix() && !qname.has_namespace() {
            return Err(Error::InvalidQName);
        }
        let mut first = flag;
        if qname.has_prefix() {
            first |= 0x02;
        }
        if qname.has_namespace() {
            first |= 0x01;
        }
        self.out.write_byte(first)?;
        if qname.has_prefix() {
            self.encode_identifying(IdTable::Prefix, &qname.prefix)?;
        }
        if qname.has_namespace() {
            self.encode_identifying(IdTable::Namespace, &qname.namespace_uri)?;
        }
        self.encode_identifying(IdTable::LocalName, &qname.local_name)
    }
}
