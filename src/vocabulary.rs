//! Vocabulary tables (X.891 7.2, C.2.5).
//!
//! A vocabulary is a set of insertion-order dictionaries that assign
//! 1-based indices to strings and qualified names as they first occur.
//! Parser and encoder each own one vocabulary per stream and must insert
//! identical entries in identical order so that index references line up.
//!
//! Jede Tabelle ist auf 2^20 Einträge begrenzt (X.891 7.2.18). Weitere
//! Einfügungen werden stillschweigend verworfen; der betroffene Wert wird
//! dann literal codiert. Einmal vergebene Indizes ändern sich nie.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::alphabet::RestrictedAlphabet;
use crate::qname::QName;
use crate::{FastHashMap, FastIndexMap};

/// Hard cap of every dynamic table (X.891 7.2.18).
pub const MAX_TABLE_ENTRIES: usize = 1 << 20;

/// The XML 1998 namespace, pre-seeded at index 1 of the namespace-name
/// table and permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace-declaration namespace. Never entered into tables; binding
/// it to any prefix other than `xmlns` is rejected.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Schwelle ab der eine Tabelle von linearer Suche auf eine HashMap
/// wechselt. Kleine Dokumente bleiben damit komplett allokationsarm.
const LINEAR_THRESHOLD: usize = 32;

/// Insertion-order string table with 1-based wire indices.
#[derive(Clone, Default)]
pub struct StringTable {
    entries: Vec<Rc<str>>,
    lookup: Option<FastHashMap<Rc<str>, u32>>,
    warned_full: bool,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn seeded(values: &[&str]) -> Self {
        let mut table = Self::default();
        for v in values {
            table.add(v);
        }
        table
    }

    /// Number of entries (== highest assigned index).
    #[inline]
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a 1-based wire index.
    #[inline]
    pub fn get(&self, index: u32) -> Option<Rc<str>> {
        self.entries.get(index.checked_sub(1)? as usize).cloned()
    }

    /// 1-based index of `value`, if present.
    pub fn index_of(&self, value: &str) -> Option<u32> {
        if let Some(map) = &self.lookup {
            map.get(value).copied()
        } else {
            self.entries
                .iter()
                .position(|e| &**e == value)
                .map(|i| i as u32 + 1)
        }
    }

    /// Inserts `value` unless present, returning its index. `None` when
    /// the table is at capacity and the value was dropped.
    pub fn add(&mut self, value: &str) -> Option<u32> {
        if let Some(existing) = self.index_of(value) {
            return Some(existing);
        }
        if self.entries.len() >= MAX_TABLE_ENTRIES {
            if !self.warned_full {
                warn!("vocabulary table reached 2^20 entries; further values are coded literally");
                self.warned_full = true;
            }
            return None;
        }
        let rc: Rc<str> = value.into();
        let index = self.entries.len() as u32 + 1;
        if self.lookup.is_none() && self.entries.len() + 1 >= LINEAR_THRESHOLD {
            let mut map = FastHashMap::with_capacity_and_hasher(
                self.entries.len() + 1,
                Default::default(),
            );
            for (i, e) in self.entries.iter().enumerate() {
                map.insert(Rc::clone(e), i as u32 + 1);
            }
            map.insert(Rc::clone(&rc), index);
            self.lookup = Some(map);
        } else if let Some(map) = &mut self.lookup {
            map.insert(Rc::clone(&rc), index);
        }
        self.entries.push(rc);
        Some(index)
    }
}

/// Insertion-order qualified-name table with 1-based wire indices.
///
/// Keyed on the full triple: names that differ only in prefix or
/// namespace are distinct entries (X.891 7.3.2).
#[derive(Clone, Default)]
pub struct QNameTable {
    entries: Vec<Rc<QName>>,
    lookup: Option<FastHashMap<Rc<QName>, u32>>,
    warned_full: bool,
}

impl QNameTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<Rc<QName>> {
        self.entries.get(index.checked_sub(1)? as usize).cloned()
    }

    pub fn index_of(&self, qname: &QName) -> Option<u32> {
        if let Some(map) = &self.lookup {
            map.get(qname).copied()
        } else {
            self.entries
                .iter()
                .position(|e| &**e == qname)
                .map(|i| i as u32 + 1)
        }
    }

    /// Inserts `qname` unless present; `None` on a full table.
    pub fn add(&mut self, qname: &QName) -> Option<u32> {
        if let Some(existing) = self.index_of(qname) {
            return Some(existing);
        }
        if self.entries.len() >= MAX_TABLE_ENTRIES {
            if !self.warned_full {
                warn!("name table reached 2^20 entries; further names are coded literally");
                self.warned_full = true;
            }
            return None;
        }
        let rc = Rc::new(qname.clone());
        let index = self.entries.len() as u32 + 1;
        if self.lookup.is_none() && self.entries.len() + 1 >= LINEAR_THRESHOLD {
            let mut map = FastHashMap::with_capacity_and_hasher(
                self.entries.len() + 1,
                Default::default(),
            );
            for (i, e) in self.entries.iter().enumerate() {
                map.insert(Rc::clone(e), i as u32 + 1);
            }
            map.insert(Rc::clone(&rc), index);
            self.lookup = Some(map);
        } else if let Some(map) = &mut self.lookup {
            map.insert(Rc::clone(&rc), index);
        }
        self.entries.push(rc);
        Some(index)
    }
}

/// One direction's complete vocabulary.
///
/// Cloning is cheap (shared `Rc<str>` entries); an external vocabulary is
/// published once and cloned into each stream so per-stream growth never
/// touches the template.
#[derive(Clone)]
pub struct Vocabulary {
    pub prefixes: StringTable,
    pub namespaces: StringTable,
    pub local_names: StringTable,
    pub element_names: QNameTable,
    pub attribute_names: QNameTable,
    pub attribute_values: StringTable,
    pub character_chunks: StringTable,
    pub other_ncnames: StringTable,
    pub other_uris: StringTable,
    pub other_strings: StringTable,
    /// Restricted alphabets established for this stream; wire index 16 + i.
    pub alphabets: Vec<RestrictedAlphabet>,
    /// Encoding-algorithm URIs established for this stream; wire index 32 + i.
    pub algorithm_uris: Vec<Rc<str>>,
}

impl Vocabulary {
    /// Empty vocabulary with the mandated seeds: `xml` at prefix index 1,
    /// the XML 1998 namespace at namespace index 1 (X.891 7.2.19, 7.2.20).
    pub fn new() -> Self {
        Self {
            prefixes: StringTable::seeded(&["xml"]),
            namespaces: StringTable::seeded(&[XML_NAMESPACE]),
            local_names: StringTable::new(),
            element_names: QNameTable::new(),
            attribute_names: QNameTable::new(),
            attribute_values: StringTable::new(),
            character_chunks: StringTable::new(),
            other_ncnames: StringTable::new(),
            other_uris: StringTable::new(),
            other_strings: StringTable::new(),
            alphabets: Vec::new(),
            algorithm_uris: Vec::new(),
        }
    }

    /// Resolves a restricted-alphabet wire index (16..) established by
    /// this stream's vocabulary.
    pub fn alphabet(&self, index: u32) -> Option<&RestrictedAlphabet> {
        self.alphabets.get(index.checked_sub(16)? as usize)
    }

    /// Resolves an encoding-algorithm wire index (32..) to its URI.
    pub fn algorithm_uri(&self, index: u32) -> Option<&Rc<str>> {
        self.algorithm_uris.get(index.checked_sub(32)? as usize)
    }

    /// 32-based wire index for a registered algorithm URI.
    pub fn algorithm_index(&self, uri: &str) -> Option<u32> {
        self.algorithm_uris
            .iter()
            .position(|u| &**u == uri)
            .map(|i| i as u32 + 32)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// External vocabularies (X.891 7.2.13)
// ---------------------------------------------------------------------------

/// A pre-shared vocabulary addressed by URI. Streams referencing it copy
/// its tables at construction; the template itself is never mutated.
pub struct ExternalVocabulary {
    pub uri: Rc<str>,
    vocabulary: Vocabulary,
}

impl ExternalVocabulary {
    pub fn new(uri: &str, vocabulary: Vocabulary) -> Self {
        Self { uri: Rc::from(uri), vocabulary }
    }

    /// Per-stream copy of the template tables.
    pub fn instantiate(&self) -> Vocabulary {
        self.vocabulary.clone()
    }
}

thread_local! {
    static EXTERNAL_VOCABULARIES: RefCell<FastIndexMap<Rc<str>, Rc<ExternalVocabulary>>> =
        RefCell::new(FastIndexMap::default());
}

/// Registers an external vocabulary for resolution by URI. Registration
/// must happen before a codec referencing the URI is constructed; the
/// registry is read-only during coding.
///
/// Rückgabe: ggf. zuvor registrierte Vokabular gleicher URI.
pub fn register_external_vocabulary(
    vocabulary: ExternalVocabulary,
) -> Option<Rc<ExternalVocabulary>> {
    EXTERNAL_VOCABULARIES.with(|registry| {
        let rc = Rc::new(vocabulary);
        registry.borrow_mut().insert(Rc::clone(&rc.uri), rc)
    })
}

/// Looks up a registered external vocabulary.
pub fn external_vocabulary(uri: &str) -> Option<Rc<ExternalVocabulary>> {
    EXTERNAL_VOCABULARIES.with(|registry| registry.borrow().get(uri).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    // X.891 7.2.21: indices are 1-based and issued in insertion order.
    #[test]
    fn indices_are_one_based_and_stable() {
        let mut table = StringTable::new();
        assert_eq!(table.add("a"), Some(1));
        assert_eq!(table.add("b"), Some(2));
        assert_eq!(table.add("a"), Some(1));
        assert_eq!(table.index_of("b"), Some(2));
        assert_eq!(table.get(1).as_deref(), Some("a"));
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn lookup_switches_to_hashmap() {
        let mut table = StringTable::new();
        for i in 0..200 {
            let v = format!("value-{i}");
            assert_eq!(table.add(&v), Some(i + 1));
        }
        for i in 0..200 {
            let v = format!("value-{i}");
            assert_eq!(table.index_of(&v), Some(i + 1));
        }
    }

    // X.891 7.3.2: full-triple identity in name tables.
    #[test]
    fn qname_table_distinguishes_namespace() {
        let mut table = QNameTable::new();
        let plain = QName::local("item");
        let qualified = QName::new("p", "urn:u", "item");
        assert_eq!(table.add(&plain), Some(1));
        assert_eq!(table.add(&qualified), Some(2));
        assert_eq!(table.index_of(&plain), Some(1));
        assert_eq!(table.index_of(&QName::new("q", "urn:u", "item")), None);
    }

    // X.891 7.2.19, 7.2.20: mandated seeds.
    #[test]
    fn seeds() {
        let v = Vocabulary::new();
        assert_eq!(v.prefixes.get(1).as_deref(), Some("xml"));
        assert_eq!(v.namespaces.get(1).as_deref(), Some(XML_NAMESPACE));
        assert!(v.local_names.is_empty());
    }

    #[test]
    fn external_vocabulary_is_copied() {
        let mut template = Vocabulary::new();
        template.local_names.add("shared");
        register_external_vocabulary(ExternalVocabulary::new("urn:test:vocab", template));

        let ext = external_vocabulary("urn:test:vocab").unwrap();
        let mut per_stream = ext.instantiate();
        per_stream.local_names.add("private");

        // Template bleibt unberührt.
        assert_eq!(ext.instantiate().local_names.len(), 1);
        assert_eq!(per_stream.local_names.len(), 2);
    }
}
