//! States of the parser automaton.

use std::fmt;

/// A state of the parser automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParserState {
    /// Before the root element.
    #[default]
    None,
    /// Reading an element name after `<`.
    StartTag,
    /// Reading an element name after `</`.
    EndTag,
    /// Inside a start tag, waiting for an attribute name, `>` or `/>`.
    ExpectAttrName,
    /// Reading an attribute name.
    AttrName,
    /// Waiting for the opening quote of an attribute value.
    ExpectAttrValue,
    /// Waiting for `=` after an attribute name.
    ExpectEquals,
    /// Reading a quoted attribute value.
    AttrValue,
    /// Reading element text.
    Value,
    /// The root element has been closed.
    Done,
    /// Skipping a comment or processing instruction.
    Ignore,
}

impl ParserState {
    /// The state's name as used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StartTag => "start-tag",
            Self::EndTag => "end-tag",
            Self::ExpectAttrName => "expect-attr-name",
            Self::AttrName => "attr-name",
            Self::ExpectAttrValue => "expect-attr-value",
            Self::ExpectEquals => "expect-equals",
            Self::AttrValue => "attr-value",
            Self::Value => "value",
            Self::Done => "done",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
