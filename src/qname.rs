//! Qualified names (X.891 7.3, C.18).
//!
//! A Fast Infoset qualified name is the triple prefix / namespace name /
//! local name. The prefix participates in identity (X.891 7.3.2): the
//! element-name and attribute-name tables key on the full triple, so two
//! names with equal local name but different prefix or namespace occupy
//! distinct table entries.

use std::fmt;
use std::rc::Rc;

/// Qualified name: prefix, namespace name, local name. All components may
/// be empty; the empty string stands for "absent".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Rc<str>,
    pub namespace_uri: Rc<str>,
    pub local_name: Rc<str>,
}

impl QName {
    /// Unqualified name (no prefix, no namespace).
    pub fn local(local_name: &str) -> Self {
        Self {
            prefix: Rc::from(""),
            namespace_uri: Rc::from(""),
            local_name: Rc::from(local_name),
        }
    }

    /// Fully qualified name.
    pub fn new(prefix: &str, namespace_uri: &str, local_name: &str) -> Self {
        Self {
            prefix: Rc::from(prefix),
            namespace_uri: Rc::from(namespace_uri),
            local_name: Rc::from(local_name),
        }
    }

    pub(crate) fn from_parts(prefix: Rc<str>, namespace_uri: Rc<str>, local_name: Rc<str>) -> Self {
        Self { prefix, namespace_uri, local_name }
    }

    /// `true` when a prefix component is present.
    #[inline]
    pub fn has_prefix(&self) -> bool {
        !self.prefix.is_empty()
    }

    /// `true` when a namespace name component is present.
    #[inline]
    pub fn has_namespace(&self) -> bool {
        !self.namespace_uri.is_empty()
    }
}

impl fmt::Display for QName {
    /// Renders as `prefix:local` or bare `local`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{}:{}", self.prefix, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // X.891 7.3.2: identity covers all three components.
    #[test]
    fn equality_includes_prefix_and_namespace() {
        let a = QName::new("p", "urn:u", "x");
        let b = QName::new("q", "urn:u", "x");
        let c = QName::new("p", "urn:v", "x");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, QName::new("p", "urn:u", "x"));
    }

    #[test]
    fn display_forms() {
        assert_eq!(QName::local("a").to_string(), "a");
        assert_eq!(QName::new("p", "urn:u", "a").to_string(), "p:a");
    }
}
