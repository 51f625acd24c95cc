//! Error types and diagnostics.
//!
//! Parsing failures are reported as a single [`ParseError`] carrying a
//! snapshot of the state machine at the point of failure: the offending
//! character, the surrounding state, the token being built, and a rendering
//! of the partially built tree. Errors raised by the document model itself
//! (naming, navigation, typed coercion) have their own types and are
//! returned directly to the caller.

use std::fmt;
use std::fmt::Write as _;
use std::num::{ParseFloatError, ParseIntError};
use std::str::ParseBoolError;

use thiserror::Error;

use crate::parser::ParserState;

/// Source location within a parsed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl SourceLocation {
    /// Computes the line and column of `byte_offset` within `input`.
    #[must_use]
    pub fn locate(input: &str, byte_offset: usize) -> Self {
        let mut line = 1u32;
        let mut column = 1u32;
        for (index, c) in input.char_indices() {
            if index >= byte_offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors raised by the document model: invalid names and failed navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// An element or attribute name is empty or contains a disallowed character.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name, as given.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// Upward navigation went past the root element.
    #[error("element <{name}> has no parent {levels} level(s) up")]
    NoParent {
        /// Name of the element navigation started from.
        name: String,
        /// Number of levels requested.
        levels: usize,
    },

    /// No ancestor with the requested name exists.
    #[error("element <{name}> has no ancestor named <{wanted}>")]
    AncestorNotFound {
        /// Name of the element navigation started from.
        name: String,
        /// The ancestor name that was looked for.
        wanted: String,
    },
}

/// Failure converting an element or attribute value to a typed value.
///
/// Wraps the standard library's own parse errors unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// The value is not a valid integer.
    #[error(transparent)]
    Int(#[from] ParseIntError),
    /// The value is not a valid floating point number.
    #[error(transparent)]
    Float(#[from] ParseFloatError),
    /// The value is not `true` or `false`.
    #[error(transparent)]
    Bool(#[from] ParseBoolError),
}

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("encoding error: {message}")]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What went wrong when the state machine rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A character that the current state does not permit.
    #[error("unexpected character {found:?} in state {state}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// The state that rejected it.
        state: ParserState,
    },

    /// The input ended while a tag, value or comment was still open.
    #[error("unexpected end of input in state {state}")]
    UnexpectedEnd {
        /// The state the machine was in when input ran out.
        state: ParserState,
    },

    /// A closing tag does not match the element that is open.
    #[error("closing tag </{found}> does not match open element <{expected}>")]
    MismatchedEndTag {
        /// Name of the open element.
        expected: String,
        /// Name found in the closing tag.
        found: String,
    },

    /// The input contains no root element.
    #[error("no root element")]
    EmptyDocument,

    /// Elements are nested deeper than the configured limit.
    #[error("maximum nesting depth of {max} exceeded")]
    DepthExceeded {
        /// The configured maximum depth.
        max: u32,
    },

    /// A name is longer than the configured limit.
    #[error("name exceeds maximum length of {max} bytes")]
    NameTooLong {
        /// The configured maximum name length.
        max: usize,
    },

    /// A name met while parsing is invalid.
    #[error(transparent)]
    Name(#[from] TreeError),

    /// The raw bytes could not be decoded to text.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// The error returned when parsing fails.
///
/// Carries a full snapshot of the state machine so that malformed input can
/// be diagnosed without re-running the parser. [`ParseError::report`] renders
/// all of it; `Display` gives the one-line summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {location}: {kind}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Where in the input the failure was detected.
    pub location: SourceLocation,
    /// The character being processed, if any.
    pub current: Option<char>,
    /// The lookahead character, if any.
    pub next: Option<char>,
    /// State of the machine when the failure was detected.
    pub state: ParserState,
    /// State before the current one.
    pub previous_state: ParserState,
    /// The token buffer being accumulated.
    pub token: String,
    /// Rendering of the element that was open, if any.
    pub open_element: Option<String>,
    /// Rendering of the tree built so far, if any.
    pub partial_tree: Option<String>,
    /// The original input.
    pub input: String,
}

impl ParseError {
    /// Creates an error that has no state machine context, e.g. an encoding
    /// failure detected before parsing started.
    pub(crate) fn without_context(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            location: SourceLocation::default(),
            current: None,
            next: None,
            state: ParserState::None,
            previous_state: ParserState::None,
            token: String::new(),
            open_element: None,
            partial_tree: None,
            input: String::new(),
        }
    }

    /// Renders the complete diagnostic snapshot as multi-line text.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{self}");
        let _ = writeln!(out, "  offset:   {}", self.location.byte_offset);
        let _ = writeln!(out, "  current:  {}", describe_char(self.current));
        let _ = writeln!(out, "  next:     {}", describe_char(self.next));
        let _ = writeln!(
            out,
            "  state:    {} (previous: {})",
            self.state, self.previous_state
        );
        let _ = writeln!(out, "  token:    {:?}", self.token);
        if let Some(open) = &self.open_element {
            let _ = writeln!(out, "  open element:");
            push_indented(&mut out, open);
        }
        if let Some(tree) = &self.partial_tree {
            let _ = writeln!(out, "  tree so far:");
            push_indented(&mut out, tree);
        }
        let _ = writeln!(out, "  input:");
        push_indented(&mut out, &self.input);
        out
    }
}

fn describe_char(c: Option<char>) -> String {
    c.map_or_else(|| "<end of input>".to_string(), |c| format!("{c:?}"))
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
}
