//! Writer state table.
//!
//! Every public encoder operation maps to an item kind; the pair of
//! current state and item either yields the follow-up state or is
//! impermissible. An impermissible call moves the encoder to `Error`,
//! from which only `close` remains legal.
//!
//! Die Tabelle bildet die Konventionen generischer XML-Writer ab:
//! `write_string`/`write_comment` vor `write_start_document` starten das
//! Dokument implizit, ein `write_start_attribute` beendet das vorige
//! Attribut, `write_end_document` schließt offene Elemente.

/// Writer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Prolog,
    Element,
    Attribute,
    Content,
    AttributeContent,
    Epilog,
    Closed,
    Error,
}

impl State {
    pub(super) fn name(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Prolog => "Prolog",
            Self::Element => "Element",
            Self::Attribute => "Attribute",
            Self::Content => "Content",
            Self::AttributeContent => "AttributeContent",
            Self::Epilog => "Epilog",
            Self::Closed => "Closed",
            Self::Error => "Error",
        }
    }
}

/// Item kinds the operations map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Item {
    Content,
    Comment,
    DocType,
    EndAttribute,
    EndDocument,
    EndElement,
    EntityRef,
    ProcessingInstruction,
    Raw,
    StartAttribute,
    StartDocument,
    StartElement,
    SurrogateCharEntity,
    Whitespace,
    EncodedContent,
}

impl Item {
    pub(super) fn name(self) -> &'static str {
        match self {
            Self::Content => "Content",
            Self::Comment => "Comment",
            Self::DocType => "DocType",
            Self::EndAttribute => "EndAttribute",
            Self::EndDocument => "EndDocument",
            Self::EndElement => "EndElement",
            Self::EntityRef => "EntityRef",
            Self::ProcessingInstruction => "ProcessingInstruction",
            Self::Raw => "Raw",
            Self::StartAttribute => "StartAttribute",
            Self::StartDocument => "StartDocument",
            Self::StartElement => "StartElement",
            Self::SurrogateCharEntity => "SurrogateCharEntity",
            Self::Whitespace => "Whitespace",
            Self::EncodedContent => "EncodedContent",
        }
    }
}

/// Permitted transition for `(item, state)`, or `None`.
///
/// `EndElement` always reports `Content`; the caller replaces that with
/// `Epilog` when the depth returns to zero.
pub(super) fn advance(state: State, item: Item) -> Option<State> {
    use Item as I;
    use State as S;
    Some(match (item, state) {
        (I::StartDocument, S::Start) => S::Prolog,

        (I::DocType, S::Prolog) => S::Prolog,

        // Ein Dokument darf mehrere Elemente auf oberster Ebene tragen
        // (X.891 C.2.11 children ist eine Folge), daher auch aus Epilog.
        (I::StartElement, S::Start | S::Prolog | S::Element | S::Content | S::Epilog) => {
            S::Element
        }

        (I::StartAttribute, S::Element | S::Attribute | S::AttributeContent) => S::Attribute,
        (I::EndAttribute, S::Attribute | S::AttributeContent) => S::Element,

        (I::Content, S::Start | S::Element | S::Content) => S::Content,
        (I::Content, S::Attribute | S::AttributeContent) => S::AttributeContent,

        (I::EncodedContent, S::Start | S::Element | S::Content) => S::Content,

        (I::Comment | I::ProcessingInstruction, S::Start | S::Prolog) => S::Prolog,
        (I::Comment | I::ProcessingInstruction, S::Element | S::Content) => S::Content,
        (I::Comment | I::ProcessingInstruction, S::Epilog) => S::Epilog,

        (I::Whitespace, S::Start | S::Prolog) => S::Prolog,
        (I::Whitespace, S::Element | S::Content) => S::Content,
        (I::Whitespace, S::Attribute | S::AttributeContent) => S::AttributeContent,
        (I::Whitespace, S::Epilog) => S::Epilog,

        (I::EntityRef | I::SurrogateCharEntity, S::Element | S::Content) => S::Content,
        (I::EntityRef | I::SurrogateCharEntity, S::Attribute | S::AttributeContent) => {
            S::AttributeContent
        }

        (I::Raw, S::Element | S::Content) => S::Content,
        (I::Raw, S::Attribute | S::AttributeContent) => S::AttributeContent,

        (I::EndElement, S::Element | S::Content | S::Attribute | S::AttributeContent) => S::Content,

        (
            I::EndDocument,
            S::Element | S::Content | S::Attribute | S::AttributeContent | S::Epilog,
        ) => S::Closed,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shape() {
        assert_eq!(advance(State::Start, Item::StartDocument), Some(State::Prolog));
        assert_eq!(advance(State::Prolog, Item::StartElement), Some(State::Element));
        assert_eq!(advance(State::Epilog, Item::EndDocument), Some(State::Closed));
        // Kein zweites StartDocument.
        assert_eq!(advance(State::Prolog, Item::StartDocument), None);
        // Element-Folgen auf oberster Ebene sind erlaubt.
        assert_eq!(advance(State::Epilog, Item::StartElement), Some(State::Element));
        // Aber kein Text zwischen ihnen.
        assert_eq!(advance(State::Epilog, Item::Content), None);
    }

    #[test]
    fn implicit_document_start() {
        assert_eq!(advance(State::Start, Item::Content), Some(State::Content));
        assert_eq!(advance(State::Start, Item::Comment), Some(State::Prolog));
    }

    #[test]
    fn attribute_nesting() {
        assert_eq!(advance(State::Element, Item::StartAttribute), Some(State::Attribute));
        assert_eq!(advance(State::Attribute, Item::Content), Some(State::AttributeContent));
        assert_eq!(advance(State::AttributeContent, Item::EndAttribute), Some(State::Element));
        // Auto-End beim nächsten Attribut.
        assert_eq!(advance(State::Attribute, Item::StartAttribute), Some(State::Attribute));
        // Kein Kommentar im Attribut.
        assert_eq!(advance(State::Attribute, Item::Comment), None);
        assert_eq!(advance(State::Attribute, Item::EncodedContent), None);
    }

    #[test]
    fn content_without_document_state() {
        assert_eq!(advance(State::Epilog, Item::Content), None);
        assert_eq!(advance(State::Closed, Item::Content), None);
        assert_eq!(advance(State::Error, Item::Content), None);
        assert_eq!(advance(State::Prolog, Item::EndDocument), None);
    }
}
