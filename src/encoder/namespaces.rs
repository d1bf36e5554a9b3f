//! Scoped namespace manager (encoder side).
//!
//! Two stacks: a flat binding stack of (prefix, URI) pairs and an element
//! stack of scope frames. A frame records the binding-stack height at
//! element open plus a counter for generated prefixes; closing the
//! element truncates the binding stack back to the recorded height.

use std::rc::Rc;

use crate::vocabulary::{XMLNS_NAMESPACE, XML_NAMESPACE};
use crate::{Error, Result};

struct Binding {
    prefix: Rc<str>,
    uri: Rc<str>,
}

struct Scope {
    bindings_top: usize,
    prefix_counter: u32,
}

pub(super) struct NamespaceManager {
    bindings: Vec<Binding>,
    scopes: Vec<Scope>,
}

impl NamespaceManager {
    pub fn new() -> Self {
        Self {
            // `xml` ist permanent gebunden und liegt unterhalb jeder Scope.
            bindings: vec![Binding {
                prefix: Rc::from("xml"),
                uri: Rc::from(XML_NAMESPACE),
            }],
            scopes: Vec::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope {
            bindings_top: self.bindings.len(),
            prefix_counter: 0,
        });
    }

    pub fn pop_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.bindings.truncate(scope.bindings_top);
        }
    }

    /// Current URI bound to `prefix`, scanning innermost first.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<Rc<str>> {
        self.bindings
            .iter()
            .rev()
            .find(|b| &*b.prefix == prefix)
            .map(|b| Rc::clone(&b.uri))
    }

    /// Shallowest prefix still bound to `uri` (skipping shadowed
    /// bindings). The empty string names the default namespace.
    pub fn lookup_prefix(&self, uri: &str) -> Option<Rc<str>> {
        for binding in self.bindings.iter().rev() {
            if &*binding.uri == uri
                && self
                    .resolve_prefix(&binding.prefix)
                    .is_some_and(|current| &*current == uri)
            {
                return Some(Rc::clone(&binding.prefix));
            }
        }
        None
    }

    /// Like [`lookup_prefix`], but never returns the default namespace
    /// (attributes require a named prefix).
    pub fn lookup_named_prefix(&self, uri: &str) -> Option<Rc<str>> {
        for binding in self.bindings.iter().rev() {
            if !binding.prefix.is_empty()
                && &*binding.uri == uri
                && self
                    .resolve_prefix(&binding.prefix)
                    .is_some_and(|current| &*current == uri)
            {
                return Some(Rc::clone(&binding.prefix));
            }
        }
        None
    }

    /// `true` when `prefix` currently resolves to exactly `uri`.
    pub fn is_bound(&self, prefix: &str, uri: &str) -> bool {
        self.resolve_prefix(prefix).is_some_and(|u| &*u == uri)
    }

    /// Pushes a binding after the reserved-name checks (W3C Namespaces 3).
    pub fn declare(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if prefix == "xmlns"
            || uri == XMLNS_NAMESPACE
            || (prefix == "xml") != (uri == XML_NAMESPACE)
        {
            return Err(Error::ReservedNamespace);
        }
        self.bindings.push(Binding {
            prefix: Rc::from(prefix),
            uri: Rc::from(uri),
        });
        Ok(())
    }

    /// Generates a prefix of the form `d{depth}p{counter}` that is not in
    /// use, counting per element scope.
    pub fn generate_prefix(&mut self, depth: u32) -> Rc<str> {
        loop {
            let counter = {
                let scope = self.scopes.last_mut().expect("generate_prefix inside scope");
                scope.prefix_counter += 1;
                scope.prefix_counter
            };
            let candidate = format!("d{depth}p{counter}");
            if self.resolve_prefix(&candidate).is_none() {
                return Rc::from(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoping_and_shadowing() {
        let mut ns = NamespaceManager::new();
        ns.push_scope();
        ns.declare("p", "urn:a").unwrap();
        ns.push_scope();
        ns.declare("p", "urn:b").unwrap();
        assert_eq!(ns.resolve_prefix("p").as_deref(), Some("urn:b"));
        // urn:a ist verschattet, darf also nicht über "p" gefunden werden.
        assert_eq!(ns.lookup_prefix("urn:a"), None);
        ns.pop_scope();
        assert_eq!(ns.resolve_prefix("p").as_deref(), Some("urn:a"));
        assert_eq!(ns.lookup_prefix("urn:a").as_deref(), Some("p"));
        ns.pop_scope();
        assert_eq!(ns.resolve_prefix("p"), None);
    }

    #[test]
    fn default_namespace_lookup() {
        let mut ns = NamespaceManager::new();
        ns.push_scope();
        ns.declare("", "urn:d").unwrap();
        assert_eq!(ns.lookup_prefix("urn:d").as_deref(), Some(""));
        // Attribute brauchen einen benannten Prefix.
        assert_eq!(ns.lookup_named_prefix("urn:d"), None);
    }

    #[test]
    fn xml_prefix_is_permanent() {
        let ns = NamespaceManager::new();
        assert_eq!(
            ns.resolve_prefix("xml").as_deref(),
            Some(XML_NAMESPACE)
        );
    }

    #[test]
    fn reserved_bindings_rejected() {
        let mut ns = NamespaceManager::new();
        ns.push_scope();
        assert_eq!(ns.declare("xmlns", "urn:x"), Err(Error::ReservedNamespace));
        assert_eq!(ns.declare("p", XMLNS_NAMESPACE), Err(Error::ReservedNamespace));
        assert_eq!(ns.declare("xml", "urn:x"), Err(Error::ReservedNamespace));
        assert_eq!(ns.declare("p", XML_NAMESPACE), Err(Error::ReservedNamespace));
        // Die kanonische xml-Bindung ist erlaubt (und wirkungslos).
        assert!(ns.declare("xml", XML_NAMESPACE).is_ok());
    }

    #[test]
    fn generated_prefixes_skip_taken_names() {
        let mut ns = NamespaceManager::new();
        ns.push_scope();
        ns.declare("d1p1", "urn:taken").unwrap();
        let generated = ns.generate_prefix(1);
        assert_eq!(&*generated, "d1p2");
    }
}
