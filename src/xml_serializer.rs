//! Parser events to XML text.
//!
//! The inverse of [`crate::xml`]: renders an event sequence as an XML
//! document. Start tags are held back one event so that childless
//! elements collapse to the empty-element form.

use std::io::Write;

use memchr::{memchr, memchr3};

use crate::event::{NodeEvent, NodeKind};
use crate::qname::QName;
use crate::vocabulary::XMLNS_NAMESPACE;
use crate::{Error, Result};

/// Renders events as an XML string.
pub fn events_to_xml(events: &[NodeEvent]) -> Result<String> {
    let mut buf = Vec::new();
    events_to_xml_writer(events, &mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::InvalidCharacterString)
}

/// Streams events as XML into a writer.
pub fn events_to_xml_writer(events: &[NodeEvent], writer: impl Write) -> Result<()> {
    let mut serializer = XmlSerializer::new(writer);
    for event in events {
        serializer.process(event)?;
    }
    serializer.finish()
}

struct XmlSerializer<W: Write> {
    writer: W,
    /// Name des zurückgehaltenen Start-Tags.
    open_tag: Option<String>,
}

impl<W: Write> XmlSerializer<W> {
    fn new(writer: W) -> Self {
        Self { writer, open_tag: None }
    }

    fn process(&mut self, event: &NodeEvent) -> Result<()> {
        match event.kind {
            NodeKind::Element => {
                self.close_open_tag()?;
                let name = tag_name(&event.qname);
                self.writer.write_all(b"<")?;
                self.writer.write_all(name.as_bytes())?;
                for attribute in &event.attributes {
                    let attr_name = if &*attribute.qname.namespace_uri == XMLNS_NAMESPACE {
                        if attribute.qname.prefix.is_empty() {
                            "xmlns".to_owned()
                        } else {
                            format!("xmlns:{}", attribute.qname.local_name)
                        }
                    } else {
                        tag_name(&attribute.qname)
                    };
                    self.writer.write_all(b" ")?;
                    self.writer.write_all(attr_name.as_bytes())?;
                    self.writer.write_all(b"=\"")?;
                    write_escaped(&mut self.writer, &attribute.value, true)?;
                    self.writer.write_all(b"\"")?;
                }
                self.open_tag = Some(name);
                Ok(())
            }
            NodeKind::EndElement => {
                if self.open_tag.take().is_some() {
                    self.writer.write_all(b"/>")?;
                } else {
                    self.writer.write_all(b"</")?;
                    self.writer.write_all(tag_name(&event.qname).as_bytes())?;
                    self.writer.write_all(b">")?;
                }
                Ok(())
            }
            NodeKind::Text => {
                self.close_open_tag()?;
                write_escaped(&mut self.writer, &event.value, false)?;
                Ok(())
            }
            NodeKind::Cdata => {
                self.close_open_tag()?;
                self.writer.write_all(b"<![CDATA[")?;
                self.writer.write_all(event.value.as_bytes())?;
                self.writer.write_all(b"]]>")?;
                Ok(())
            }
            NodeKind::Comment => {
                self.close_open_tag()?;
                self.writer.write_all(b"<!--")?;
                self.writer.write_all(event.value.as_bytes())?;
                self.writer.write_all(b"-->")?;
                Ok(())
            }
            NodeKind::ProcessingInstruction => {
                self.close_open_tag()?;
                self.writer.write_all(b"<?")?;
                self.writer.write_all(event.qname.local_name.as_bytes())?;
                if !event.value.is_empty() {
                    self.writer.write_all(b" ")?;
                    self.writer.write_all(event.value.as_bytes())?;
                }
                self.writer.write_all(b"?>")?;
                Ok(())
            }
            NodeKind::EntityReference => {
                self.close_open_tag()?;
                self.writer.write_all(b"&")?;
                self.writer.write_all(event.qname.local_name.as_bytes())?;
                self.writer.write_all(b";")?;
                Ok(())
            }
            // Die X.891-DTD trägt keinen Namen; ohne Namen lässt sich
            // kein wohlgeformtes <!DOCTYPE ...> rendern.
            NodeKind::DocumentType | NodeKind::None | NodeKind::Attribute => Ok(()),
        }
    }

    fn close_open_tag(&mut self) -> Result<()> {
        if self.open_tag.take().is_some() {
            self.writer.write_all(b">")?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.close_open_tag()?;
        self.writer.flush()?;
        Ok(())
    }
}

fn tag_name(qname: &QName) -> String {
    if qname.prefix.is_empty() {
        qname.local_name.to_string()
    } else {
        format!("{}:{}", qname.prefix, qname.local_name)
    }
}

/// Escapes `&`, `<`, `>` (and `"` inside attribute values); memchr finds
/// the next candidate so clean spans are copied in one piece.
fn write_escaped(writer: &mut impl Write, text: &str, in_attribute: bool) -> Result<()> {
    let mut rest = text.as_bytes();
    loop {
        let base = memchr3(b'&', b'<', b'>', rest);
        let pos = if in_attribute {
            match (base, memchr(b'"', rest)) {
                (Some(a), Some(q)) => Some(a.min(q)),
                (a, q) => a.or(q),
            }
        } else {
            base
        };
        let Some(pos) = pos else {
            writer.write_all(rest)?;
            return Ok(());
        };
        writer.write_all(&rest[..pos])?;
        let replacement: &[u8] = match rest[pos] {
            b'&' => b"&amp;",
            b'<' => b"&lt;",
            b'>' => b"&gt;",
            _ => b"&quot;",
        };
        writer.write_all(replacement)?;
        rest = &rest[pos + 1..];
    }
}
