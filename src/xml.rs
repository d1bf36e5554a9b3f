//! XML text to parser events.
//!
//! Uses quick-xml to build the event sequence the encoder consumes. The
//! namespace bindings are tracked here so that every element and
//! attribute event carries a fully resolved qualified name, and xmlns
//! attributes come through in the same shape the Fast Infoset parser
//! produces them.

use std::rc::Rc;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::event::{Attribute, NodeEvent, NodeKind};
use crate::qname::QName;
use crate::vocabulary::{XMLNS_NAMESPACE, XML_NAMESPACE};
use crate::{Error, Result};

struct NsBinding {
    prefix: String,
    uri: String,
}

struct NsScopes {
    bindings: Vec<NsBinding>,
    scope_tops: Vec<usize>,
}

impl NsScopes {
    fn new() -> Self {
        Self {
            bindings: vec![NsBinding {
                prefix: "xml".into(),
                uri: XML_NAMESPACE.into(),
            }],
            scope_tops: Vec::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scope_tops.push(self.bindings.len());
    }

    fn pop_scope(&mut self) {
        if let Some(top) = self.scope_tops.pop() {
            self.bindings.truncate(top);
        }
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
    }
}

/// Parses an XML document into the event sequence the encoder accepts.
pub fn parse_xml_events(xml: &str) -> Result<Vec<NodeEvent>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut events = Vec::new();
    let mut scopes = NsScopes::new();
    let mut stack: Vec<QName> = Vec::new();
    let mut depth: u32 = 0;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                let event = element_event(&start, &mut scopes, depth + 1)?;
                stack.push(event.qname.clone());
                events.push(event);
                depth += 1;
            }
            Ok(Event::Empty(start)) => {
                let event = element_event(&start, &mut scopes, depth + 1)?;
                let mut end = NodeEvent::new(NodeKind::EndElement, depth);
                end.qname = event.qname.clone();
                events.push(event);
                events.push(end);
                scopes.pop_scope();
            }
            Ok(Event::End(_)) => {
                depth -= 1;
                let mut end = NodeEvent::new(NodeKind::EndElement, depth);
                end.qname = stack.pop().unwrap_or_else(|| QName::local(""));
                events.push(end);
                scopes.pop_scope();
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .decode()
                    .map_err(|e| Error::IoError(format!("XML text: {e}")))?;
                // Formatierungs-Whitespace außerhalb des Wurzelelements
                // kennt Fast Infoset nicht.
                if depth == 0 && text.trim().is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    events.push(NodeEvent::with_value(
                        NodeKind::Text,
                        depth,
                        Rc::from(&*text),
                    ));
                }
            }
            Ok(Event::CData(cdata)) => {
                let text = std::str::from_utf8(cdata.as_ref())
                    .map_err(|_| Error::InvalidCharacterString)?;
                events.push(NodeEvent::with_value(
                    NodeKind::Cdata,
                    depth,
                    Rc::from(text),
                ));
            }
            Ok(Event::Comment(comment)) => {
                let text = std::str::from_utf8(comment.as_ref())
                    .map_err(|_| Error::InvalidCharacterString)?;
                events.push(NodeEvent::with_value(
                    NodeKind::Comment,
                    depth,
                    Rc::from(text),
                ));
            }
            Ok(Event::PI(pi)) => {
                let target = std::str::from_utf8(pi.target())
                    .map_err(|_| Error::InvalidCharacterString)?;
                let content = std::str::from_utf8(pi.content())
                    .map_err(|_| Error::InvalidCharacterString)?;
                let mut event =
                    NodeEvent::with_value(NodeKind::ProcessingInstruction, depth, Rc::from(content));
                event.qname = QName::local(target);
                events.push(event);
            }
            Ok(Event::Decl(_) | Event::DocType(_)) => {
                // Deklaration regelt die Encoder-Konfiguration; DTD-Subsets
                // liegen außerhalb des unterstützten Profils.
            }
            Ok(Event::GeneralRef(reference)) => {
                let name = std::str::from_utf8(reference.as_ref())
                    .map_err(|_| Error::InvalidCharacterString)?;
                let resolved = if let Some(rest) = name.strip_prefix('#') {
                    resolve_char_reference(rest)
                } else {
                    resolve_predefined_entity(name).map(str::to_owned)
                };
                match resolved {
                    Some(text) if depth > 0 => {
                        events.push(NodeEvent::with_value(
                            NodeKind::Text,
                            depth,
                            Rc::from(text.as_str()),
                        ));
                    }
                    Some(_) => {}
                    // Nicht vordefinierte Entities bräuchten DTD-Auflösung.
                    None => return Err(Error::UnsupportedFeature("entity reference writing")),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::IoError(format!("XML parse: {e}"))),
        }
        buf.clear();
    }
    Ok(events)
}

/// `&#10;` / `&#x0A;` character references.
fn resolve_char_reference(rest: &str) -> Option<String> {
    let code_point = if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        rest.parse().ok()?
    };
    char::from_u32(code_point).map(|ch| ch.to_string())
}

fn element_event(start: &BytesStart<'_>, scopes: &mut NsScopes, depth: u32) -> Result<NodeEvent> {
    scopes.push_scope();

    // Erster Durchlauf: xmlns-Attribute binden.
    let mut attributes: Vec<Attribute> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::IoError(format!("XML attribute: {e}")))?;
        let key = attr.key;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::IoError(format!("XML attribute value: {e}")))?;
        let local = std::str::from_utf8(key.local_name().as_ref())
            .map_err(|_| Error::InvalidCharacterString)?
            .to_owned();
        let prefix = match key.prefix() {
            Some(p) => std::str::from_utf8(p.as_ref())
                .map_err(|_| Error::InvalidCharacterString)?
                .to_owned(),
            None => String::new(),
        };
        if prefix == "xmlns" {
            scopes.bindings.push(NsBinding {
                prefix: local.clone(),
                uri: value.to_string(),
            });
            attributes.push(Attribute {
                qname: QName::new("xmlns", XMLNS_NAMESPACE, &local),
                value: Rc::from(&*value),
            });
        } else if prefix.is_empty() && local == "xmlns" {
            scopes.bindings.push(NsBinding {
                prefix: String::new(),
                uri: value.to_string(),
            });
            attributes.push(Attribute {
                qname: QName::new("", XMLNS_NAMESPACE, "xmlns"),
                value: Rc::from(&*value),
            });
        } else {
            attributes.push(Attribute {
                qname: QName::new(&prefix, "", &local),
                value: Rc::from(&*value),
            });
        }
    }

    // Zweiter Durchlauf: Namespace-Namen auflösen (Bindungen dieses
    // Elements gelten bereits).
    for attribute in &mut attributes {
        let prefix = attribute.qname.prefix.to_string();
        if prefix.is_empty() || prefix == "xmlns" || &*attribute.qname.namespace_uri == XMLNS_NAMESPACE {
            continue;
        }
        let uri = scopes
            .resolve(&prefix)
            .ok_or_else(|| Error::UndefinedNamespaceForPrefix(prefix.clone()))?;
        attribute.qname = QName::new(&prefix, uri, &attribute.qname.local_name);
    }

    let name = start.name();
    let local_name = name.local_name();
    let local = std::str::from_utf8(local_name.as_ref())
        .map_err(|_| Error::InvalidCharacterString)?;
    let name_prefix = name.prefix();
    let prefix = match &name_prefix {
        Some(p) => std::str::from_utf8(p.as_ref()).map_err(|_| Error::InvalidCharacterString)?,
        None => "",
    };
    let uri = if prefix.is_empty() {
        scopes.resolve("").unwrap_or("").to_owned()
    } else {
        scopes
            .resolve(prefix)
            .ok_or_else(|| Error::UndefinedNamespaceForPrefix(prefix.to_owned()))?
            .to_owned()
    };

    let mut event = NodeEvent::new(NodeKind::Element, depth);
    event.qname = QName::new(prefix, &uri, local);
    event.attributes = attributes;
    Ok(event)
}
