//! Markup parser.
//!
//! A hand-rolled, single-pass, character-level state machine that builds a
//! [`Document`] from text. The machine reads one character at a time with
//! exactly one character of lookahead and never backtracks; any character
//! the current state does not permit stops the parse with a [`ParseError`]
//! describing the full machine state.
//!
//! The accepted grammar is deliberately small: nested tags, quoted
//! attributes, text content, self-closing tags, comments (`<!-- ... -->`)
//! and processing instructions or an XML declaration (`<?...?>`), which are
//! skipped. Only the five predefined entities are decoded.

mod machine;
mod state;

pub use state::ParserState;

use crate::error::ParseError;
use crate::tree::Document;

/// Default maximum element nesting depth.
pub const DEFAULT_MAX_DEPTH: u32 = 256;

/// Default maximum length in bytes of an element or attribute name.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Parse options controlling parser limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use xmlette::parser::ParseOptions;
///
/// let opts = ParseOptions::default().max_depth(32).max_name_length(64);
/// assert_eq!(opts.max_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl ParseOptions {
    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }
}

/// Parses a string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is malformed. A partially built tree
/// is never returned.
///
/// # Examples
///
/// ```
/// use xmlette::parser::parse_str;
///
/// let doc = parse_str("<a x=\"1\">hi</a>").unwrap();
/// assert_eq!(doc.attribute(doc.root(), "x"), Some("1"));
/// assert!(parse_str("<a>").is_err());
/// ```
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses a string with the given options.
///
/// A leading UTF-8 byte order mark is skipped.
///
/// # Errors
///
/// Returns `ParseError` if the input is malformed or exceeds a limit in
/// `options`.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    tracing::debug!(bytes = input.len(), "parsing document");

    let result = machine::StateMachine::new(input, options).run();
    match &result {
        Ok(doc) => tracing::debug!(
            root = doc.name(doc.root()),
            elements = doc.node_count(),
            "parsed document"
        ),
        Err(err) => tracing::debug!(error = %err, state = %err.state, "parse failed"),
    }
    result
}
