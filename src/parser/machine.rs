//! The parser automaton.
//!
//! One forward pass over the input, one character of lookahead. Each state
//! has a handler that either accepts the character (possibly moving to
//! another state) or rejects it with a [`ParseError`] built from a snapshot
//! of the whole machine.

use crate::entities;
use crate::error::{ParseError, ParseErrorKind, SourceLocation};
use crate::serial::{serialize, serialize_element};
use crate::tree::{Document, NodeId};
use crate::util::name::name_eq;

use super::{ParseOptions, ParserState};

const COMMENT_OPEN: &str = "<!--";

/// What the driver loop should do after a character has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Move on to the next character.
    Advance,
    /// The lookahead character was consumed as well; skip it.
    SkipNext,
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Characters with a structural meaning inside a tag.
fn is_tag_delimiter(c: char) -> bool {
    matches!(c, '<' | '>' | '/' | '=' | '"' | '\'') || is_space(c)
}

pub(crate) struct StateMachine<'a> {
    input: &'a str,
    options: &'a ParseOptions,
    state: ParserState,
    /// State to resume once an ignored region ends.
    previous: ParserState,
    /// Name, attribute value or text being accumulated.
    token: String,
    /// Comment or processing instruction being skipped.
    skipped: String,
    /// Delimiter of the attribute value being read.
    quote: char,
    doc: Option<Document>,
    /// The element that is currently open.
    current: Option<NodeId>,
    depth: u32,
    offset: usize,
    current_char: Option<char>,
    next_char: Option<char>,
}

impl<'a> StateMachine<'a> {
    pub(crate) fn new(input: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            input,
            options,
            state: ParserState::None,
            previous: ParserState::None,
            token: String::new(),
            skipped: String::new(),
            quote: '"',
            doc: None,
            current: None,
            depth: 0,
            offset: 0,
            current_char: None,
            next_char: None,
        }
    }

    /// Runs the machine over the whole input.
    pub(crate) fn run(mut self) -> Result<Document, ParseError> {
        let mut chars = self.input.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            let next = chars.peek().map(|&(_, n)| n);
            self.offset = offset;
            self.current_char = Some(c);
            self.next_char = next;
            if self.step(c, next)? == Step::SkipNext {
                chars.next();
            }
        }
        self.finish()
    }

    fn step(&mut self, c: char, next: Option<char>) -> Result<Step, ParseError> {
        match self.state {
            ParserState::None | ParserState::Done => self.between_elements(c, next),
            ParserState::StartTag => self.start_tag(c, next),
            ParserState::ExpectAttrName => self.expect_attr_name(c, next),
            ParserState::AttrName => self.attr_name(c),
            ParserState::ExpectEquals => self.expect_equals(c),
            ParserState::ExpectAttrValue => self.expect_attr_value(c),
            ParserState::AttrValue => self.attr_value(c),
            ParserState::Value => self.value(c, next),
            ParserState::EndTag => self.end_tag(c),
            ParserState::Ignore => self.ignore(c),
        }
    }

    fn enter(&mut self, state: ParserState) {
        self.previous = self.state;
        self.state = state;
    }

    // --- State handlers ---

    /// Before the root element, or after it has been closed.
    fn between_elements(&mut self, c: char, next: Option<char>) -> Result<Step, ParseError> {
        match (c, next) {
            (c, _) if is_space(c) => Ok(Step::Advance),
            ('<', Some(marker @ ('?' | '!'))) => Ok(self.begin_ignore(marker)),
            ('<', next) if self.state == ParserState::None && next != Some('/') => {
                self.token.clear();
                self.enter(ParserState::StartTag);
                Ok(Step::Advance)
            }
            _ => Err(self.unexpected(c)),
        }
    }

    fn start_tag(&mut self, c: char, next: Option<char>) -> Result<Step, ParseError> {
        match c {
            '>' => {
                self.open_element()?;
                self.enter(ParserState::Value);
                Ok(Step::Advance)
            }
            '/' => self.self_close(c, next, true),
            c if is_space(c) => {
                self.open_element()?;
                self.enter(ParserState::ExpectAttrName);
                Ok(Step::Advance)
            }
            c if is_tag_delimiter(c) => Err(self.unexpected(c)),
            c => self.push_name_char(c),
        }
    }

    fn expect_attr_name(&mut self, c: char, next: Option<char>) -> Result<Step, ParseError> {
        match c {
            c if is_space(c) => Ok(Step::Advance),
            '>' => {
                self.enter(ParserState::Value);
                Ok(Step::Advance)
            }
            '/' => self.self_close(c, next, false),
            c if is_tag_delimiter(c) => Err(self.unexpected(c)),
            c => {
                self.token.clear();
                self.enter(ParserState::AttrName);
                self.push_name_char(c)
            }
        }
    }

    fn attr_name(&mut self, c: char) -> Result<Step, ParseError> {
        match c {
            c if is_space(c) => {
                self.commit_attribute_name()?;
                self.enter(ParserState::ExpectEquals);
                Ok(Step::Advance)
            }
            '=' => {
                self.commit_attribute_name()?;
                self.enter(ParserState::ExpectAttrValue);
                Ok(Step::Advance)
            }
            c if is_tag_delimiter(c) => Err(self.unexpected(c)),
            c => self.push_name_char(c),
        }
    }

    fn expect_equals(&mut self, c: char) -> Result<Step, ParseError> {
        match c {
            c if is_space(c) => Ok(Step::Advance),
            '=' => {
                self.enter(ParserState::ExpectAttrValue);
                Ok(Step::Advance)
            }
            _ => Err(self.unexpected(c)),
        }
    }

    fn expect_attr_value(&mut self, c: char) -> Result<Step, ParseError> {
        match c {
            c if is_space(c) => Ok(Step::Advance),
            '"' | '\'' => {
                self.quote = c;
                self.token.clear();
                self.enter(ParserState::AttrValue);
                Ok(Step::Advance)
            }
            _ => Err(self.unexpected(c)),
        }
    }

    fn attr_value(&mut self, c: char) -> Result<Step, ParseError> {
        if c != self.quote {
            self.token.push(c);
            return Ok(Step::Advance);
        }
        let value = entities::decode(&self.token).into_owned();
        if let (Some(doc), Some(id)) = (self.doc.as_mut(), self.current) {
            doc.set_last_attribute_value(id, value);
        }
        self.token.clear();
        self.enter(ParserState::ExpectAttrName);
        Ok(Step::Advance)
    }

    fn value(&mut self, c: char, next: Option<char>) -> Result<Step, ParseError> {
        match (c, next) {
            ('<', Some('/')) => {
                self.commit_text();
                self.enter(ParserState::EndTag);
                Ok(Step::SkipNext)
            }
            ('<', Some(marker @ ('?' | '!'))) => Ok(self.begin_ignore(marker)),
            ('<', _) => {
                self.commit_text();
                self.enter(ParserState::StartTag);
                Ok(Step::Advance)
            }
            ('>', _) => Err(self.unexpected(c)),
            ('\t' | '\n' | '\r', _) if self.token.is_empty() => Ok(Step::Advance),
            _ => {
                self.token.push(c);
                Ok(Step::Advance)
            }
        }
    }

    fn end_tag(&mut self, c: char) -> Result<Step, ParseError> {
        match c {
            '>' => {
                self.close_tag()?;
                Ok(Step::Advance)
            }
            '<' | '/' | '=' | '"' | '\'' => Err(self.unexpected(c)),
            c => self.push_name_char(c),
        }
    }

    fn ignore(&mut self, c: char) -> Result<Step, ParseError> {
        self.skipped.push(c);
        if self.skipped.starts_with("<!")
            && !self.skipped.starts_with(COMMENT_OPEN)
            && !COMMENT_OPEN.starts_with(self.skipped.as_str())
        {
            return Err(self.unexpected(c));
        }

        let (terminator, min_len) = if self.skipped.starts_with("<?") {
            ("?>", 4)
        } else {
            ("-->", 7)
        };
        if self.skipped.len() >= min_len && self.skipped.ends_with(terminator) {
            tracing::trace!(skipped = %self.skipped, "skipped markup");
            self.skipped.clear();
            let resume = self.previous;
            self.enter(resume);
        }
        Ok(Step::Advance)
    }

    // --- Actions ---

    fn begin_ignore(&mut self, marker: char) -> Step {
        self.skipped.clear();
        self.skipped.push('<');
        self.skipped.push(marker);
        self.enter(ParserState::Ignore);
        Step::SkipNext
    }

    fn push_name_char(&mut self, c: char) -> Result<Step, ParseError> {
        if self.token.len() + c.len_utf8() > self.options.max_name_length {
            return Err(self.fail(ParseErrorKind::NameTooLong {
                max: self.options.max_name_length,
            }));
        }
        self.token.push(c);
        Ok(Step::Advance)
    }

    /// Creates the element named by the token, as the root or as a child of
    /// the open element, and makes it the open element.
    fn open_element(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.options.max_depth {
            return Err(self.fail(ParseErrorKind::DepthExceeded {
                max: self.options.max_depth,
            }));
        }
        let opened = match (&mut self.doc, self.current) {
            (Some(doc), Some(parent)) => doc.add_child(parent, &self.token),
            (slot, _) => Document::new(&self.token).map(|doc| slot.insert(doc).root()),
        };
        let id = opened.map_err(|e| self.fail(e.into()))?;
        self.current = Some(id);
        self.depth += 1;
        self.token.clear();
        tracing::trace!(depth = self.depth, "opened element");
        Ok(())
    }

    /// Handles `/` inside a start tag, which must be followed by `>`.
    fn self_close(&mut self, c: char, next: Option<char>, open: bool) -> Result<Step, ParseError> {
        if next != Some('>') {
            return Err(self.unexpected(c));
        }
        if open {
            self.open_element()?;
        }
        self.close_element();
        Ok(Step::SkipNext)
    }

    /// Checks the end tag name against the open element, then closes it.
    fn close_tag(&mut self) -> Result<(), ParseError> {
        let found = self.token.trim_end();
        let expected = match (&self.doc, self.current) {
            (Some(doc), Some(id)) => doc.name(id),
            _ => return Err(self.unexpected('>')),
        };
        if !name_eq(expected, found) {
            return Err(self.fail(ParseErrorKind::MismatchedEndTag {
                expected: expected.to_string(),
                found: found.to_string(),
            }));
        }
        self.close_element();
        Ok(())
    }

    /// Pops the open element; closing the root finishes the document.
    fn close_element(&mut self) {
        let parent = match (&self.doc, self.current) {
            (Some(doc), Some(id)) => doc.parent(id),
            _ => None,
        };
        self.current = parent;
        self.depth = self.depth.saturating_sub(1);
        self.token.clear();
        tracing::trace!(depth = self.depth, "closed element");
        if parent.is_some() {
            self.enter(ParserState::Value);
        } else {
            self.enter(ParserState::Done);
        }
    }

    fn commit_attribute_name(&mut self) -> Result<(), ParseError> {
        let added = match (self.doc.as_mut(), self.current) {
            (Some(doc), Some(id)) => doc.add_attribute(id, &self.token, String::new()),
            _ => Ok(()),
        };
        added.map_err(|e| self.fail(e.into()))?;
        self.token.clear();
        Ok(())
    }

    /// Appends the accumulated text to the open element's value. Trailing
    /// whitespace is dropped, and so are whitespace-only segments.
    fn commit_text(&mut self) {
        let text = self.token.trim_end();
        if !text.is_empty() {
            if let (Some(doc), Some(id)) = (self.doc.as_mut(), self.current) {
                doc.append_value(id, &entities::decode(text));
            }
        }
        self.token.clear();
    }

    fn finish(mut self) -> Result<Document, ParseError> {
        self.offset = self.input.len();
        self.current_char = None;
        self.next_char = None;
        match (self.state, self.doc.take()) {
            (ParserState::Done, Some(doc)) => Ok(doc),
            (ParserState::None, None) => Err(self.fail(ParseErrorKind::EmptyDocument)),
            (state, doc) => {
                self.doc = doc;
                Err(self.fail(ParseErrorKind::UnexpectedEnd { state }))
            }
        }
    }

    // --- Diagnostics ---

    fn unexpected(&self, c: char) -> ParseError {
        self.fail(ParseErrorKind::UnexpectedChar {
            found: c,
            state: self.state,
        })
    }

    fn fail(&self, kind: ParseErrorKind) -> ParseError {
        let open_element = match (&self.doc, self.current) {
            (Some(doc), Some(id)) => Some(serialize_element(doc, id)),
            _ => None,
        };
        let token = if self.state == ParserState::Ignore {
            &self.skipped
        } else {
            &self.token
        };
        ParseError {
            kind,
            location: SourceLocation::locate(self.input, self.offset),
            current: self.current_char,
            next: self.next_char,
            state: self.state,
            previous_state: self.previous,
            token: token.clone(),
            open_element,
            partial_tree: self.doc.as_ref().map(serialize),
            input: self.input.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Document, ParseError> {
        StateMachine::new(input, &ParseOptions::default()).run()
    }

    fn parse_err(input: &str) -> ParseError {
        match parse(input) {
            Ok(doc) => panic!("expected {input:?} to fail, got {doc}"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_self_closing_root() {
        let doc = parse("<a/>").unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), "a");
        assert_eq!(doc.value(root), "");
        assert!(doc.attributes(root).is_empty());
        assert_eq!(doc.children(root).count(), 0);
    }

    #[test]
    fn test_attribute_and_value() {
        let doc = parse("<a x=\"1\">hi</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.attribute(root, "x"), Some("1"));
        assert_eq!(doc.value(root), "hi");
    }

    #[test]
    fn test_children_in_order() {
        let doc = parse("<a><b/><c/></a>").unwrap();
        let names: Vec<&str> = doc.children(doc.root()).map(|c| doc.name(c)).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_names_are_case_folded() {
        let doc = parse("<A X=\"1\"/>").unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), "a");
        assert_eq!(doc.attributes(root)[0].name(), "x");
    }

    #[test]
    fn test_end_tag_case_insensitive() {
        let doc = parse("<Item>v</ITEM>").unwrap();
        assert_eq!(doc.name(doc.root()), "item");
    }

    #[test]
    fn test_attribute_forms() {
        let doc = parse("<a one = 'x' two=\"y\"\tthree='z'  >t</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.attribute(root, "one"), Some("x"));
        assert_eq!(doc.attribute(root, "two"), Some("y"));
        assert_eq!(doc.attribute(root, "three"), Some("z"));
    }

    #[test]
    fn test_other_quote_is_literal() {
        let doc = parse("<a s=\"it's\" d='say \"hi\"'/>").unwrap();
        let root = doc.root();
        assert_eq!(doc.attribute(root, "s"), Some("it's"));
        assert_eq!(doc.attribute(root, "d"), Some("say \"hi\""));
    }

    #[test]
    fn test_markup_inside_attribute_value_is_literal() {
        let doc = parse("<a expr=\"a<b && c>d\"/>").unwrap();
        assert_eq!(doc.attribute(doc.root(), "expr"), Some("a<b && c>d"));
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc = parse("<a t=\"&quot;q&quot;\">x &lt; y &amp; &unknown;</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.attribute(root, "t"), Some("\"q\""));
        assert_eq!(doc.value(root), "x < y & &unknown;");
    }

    #[test]
    fn test_duplicate_attributes_are_kept() {
        let doc = parse("<a k=\"1\" K=\"2\"/>").unwrap();
        let root = doc.root();
        assert_eq!(doc.attributes(root).len(), 2);
        assert_eq!(doc.attribute(root, "k"), Some("1"));
    }

    #[test]
    fn test_self_closing_after_attributes() {
        let doc = parse("<a><b x=\"1\"/><c y='2' /></a>").unwrap();
        let root = doc.root();
        let b = doc.child(root, "b").unwrap();
        let c = doc.child(root, "c").unwrap();
        assert_eq!(doc.attribute(b, "x"), Some("1"));
        assert_eq!(doc.attribute(c, "y"), Some("2"));
        assert_eq!(doc.children(b).count(), 0);
    }

    #[test]
    fn test_leading_control_whitespace_trimmed() {
        let doc = parse("<a>\n\t\r  indented</a>").unwrap();
        assert_eq!(doc.value(doc.root()), "  indented");
    }

    #[test]
    fn test_trailing_whitespace_dropped() {
        let doc = parse("<a>value \n</a>").unwrap();
        assert_eq!(doc.value(doc.root()), "value");
    }

    #[test]
    fn test_inner_whitespace_kept() {
        let doc = parse("<a>one\n  two</a>").unwrap();
        assert_eq!(doc.value(doc.root()), "one\n  two");
    }

    #[test]
    fn test_pretty_printed_input_has_no_whitespace_values() {
        let doc = parse("<a>\n  <b>x</b>\n  <c/>\n</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.value(root), "");
        assert_eq!(doc.value(doc.child(root, "b").unwrap()), "x");
    }

    #[test]
    fn test_mixed_content_appends_segments() {
        let doc = parse("<a>head<b/>tail</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.value(root), "headtail");
        assert_eq!(doc.children(root).count(), 1);
    }

    #[test]
    fn test_prologue_and_comments_skipped() {
        let expected = parse("<a/>").unwrap();
        for input in [
            "<?xml version=\"1.0\"?><a/>",
            "<a><!-- comment --></a>",
            "<!-- before --><a/><!-- after -->",
            "<?xml version=\"1.0\"?>\n<!-- c -->\n<a></a>\n",
            "<a><?pi data?></a>",
        ] {
            let doc = parse(input).unwrap();
            assert_eq!(doc.name(doc.root()), expected.name(expected.root()));
            assert_eq!(doc.children(doc.root()).count(), 0, "{input}");
            assert_eq!(doc.value(doc.root()), "", "{input}");
        }
    }

    #[test]
    fn test_comment_inside_text_resumes_value() {
        let doc = parse("<a>ab<!-- <b>not a tag</b> -->cd</a>").unwrap();
        assert_eq!(doc.value(doc.root()), "abcd");
    }

    #[test]
    fn test_comment_with_dashes() {
        let doc = parse("<a><!-- a - b -- c ---></a>").unwrap();
        assert_eq!(doc.name(doc.root()), "a");
    }

    #[test]
    fn test_shortest_comment_and_pi() {
        assert!(parse("<!----><?x?><a/>").is_ok());
        assert!(parse("<a><!---></a>").is_err());
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = parse_err("<a><b></a>");
        assert_eq!(
            err.kind,
            ParseErrorKind::MismatchedEndTag {
                expected: "b".to_string(),
                found: "a".to_string(),
            }
        );
        assert_eq!(err.state, ParserState::EndTag);
        assert_eq!(err.open_element.as_deref(), Some("<b/>"));
        assert!(err.partial_tree.is_some());
    }

    #[test]
    fn test_unterminated_root() {
        let err = parse_err("<a>");
        assert_eq!(
            err.kind,
            ParseErrorKind::UnexpectedEnd {
                state: ParserState::Value
            }
        );
        assert_eq!(err.current, None);
        assert_eq!(err.location.byte_offset, 3);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_err("").kind, ParseErrorKind::EmptyDocument);
        assert_eq!(parse_err("  \n").kind, ParseErrorKind::EmptyDocument);
        assert_eq!(parse_err("<?xml?>").kind, ParseErrorKind::EmptyDocument);
    }

    #[test]
    fn test_unexpected_characters() {
        let cases = [
            ("text<a/>", 't', ParserState::None),
            ("<a/>tail", 't', ParserState::Done),
            ("<a/><b/>", '<', ParserState::Done),
            ("</a>", '<', ParserState::None),
            ("<a=1/>", '=', ParserState::StartTag),
            ("<a x/>", '/', ParserState::AttrName),
            ("<a x y=\"1\"/>", 'y', ParserState::ExpectEquals),
            ("<a x=1/>", '1', ParserState::ExpectAttrValue),
            ("<a \"x\"/>", '"', ParserState::ExpectAttrName),
            ("<a>1 > 0</a>", '>', ParserState::Value),
            ("<a/ >", '/', ParserState::StartTag),
            ("<a><!DOCTYPE a></a>", 'D', ParserState::Ignore),
        ];
        for (input, found, state) in cases {
            let err = parse_err(input);
            assert_eq!(
                err.kind,
                ParseErrorKind::UnexpectedChar { found, state },
                "{input}"
            );
        }
    }

    #[test]
    fn test_error_snapshot() {
        let err = parse_err("<root a=\"1\">\n  <item>x</item>\n  <bad=");
        assert_eq!(err.location.line, 3);
        assert_eq!(err.location.column, 7);
        assert_eq!(err.current, Some('='));
        assert_eq!(err.next, None);
        assert_eq!(err.state, ParserState::StartTag);
        assert_eq!(err.previous_state, ParserState::Value);
        assert_eq!(err.token, "bad");
        assert_eq!(err.input, "<root a=\"1\">\n  <item>x</item>\n  <bad=");
        let Some(tree) = err.partial_tree else {
            panic!("partial tree missing");
        };
        assert!(tree.contains("<item>x</item>"));
    }

    #[test]
    fn test_invalid_name_in_tag() {
        let err = parse_err("<a$b/>");
        assert!(matches!(err.kind, ParseErrorKind::Name(_)));
        let err = parse_err("< a/>");
        assert!(matches!(err.kind, ParseErrorKind::Name(_)));
        let err = parse_err("<a b$c=\"1\"/>");
        assert!(matches!(err.kind, ParseErrorKind::Name(_)));
    }

    #[test]
    fn test_unterminated_forms() {
        for (input, state) in [
            ("<a", ParserState::StartTag),
            ("<a x", ParserState::AttrName),
            ("<a x=\"1", ParserState::AttrValue),
            ("<a><b/></a", ParserState::EndTag),
            ("<a><!-- open", ParserState::Ignore),
        ] {
            assert_eq!(
                parse_err(input).kind,
                ParseErrorKind::UnexpectedEnd { state },
                "{input}"
            );
        }
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions::default().max_depth(2);
        assert!(StateMachine::new("<a><b/></a>", &options).run().is_ok());
        let Err(err) = StateMachine::new("<a><b><c/></b></a>", &options).run() else {
            panic!("depth limit not enforced");
        };
        assert_eq!(err.kind, ParseErrorKind::DepthExceeded { max: 2 });
    }

    #[test]
    fn test_name_length_limit() {
        let options = ParseOptions::default().max_name_length(3);
        assert!(StateMachine::new("<abc/>", &options).run().is_ok());
        let Err(err) = StateMachine::new("<abcd/>", &options).run() else {
            panic!("name length limit not enforced");
        };
        assert_eq!(err.kind, ParseErrorKind::NameTooLong { max: 3 });
    }

    #[test]
    fn test_unicode_text_and_names() {
        let doc = parse("<données clé=\"é\">naïve ✓</données>").unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), "données");
        assert_eq!(doc.attribute(root, "CLÉ"), Some("é"));
        assert_eq!(doc.value(root), "naïve ✓");
    }

    #[test]
    fn test_final_sigma_end_tag_matches() {
        let doc = parse("<ΟΔΟΣ ΤΥΠΟΣ=\"1\"><ΧΑΡΤΗΣ>x</ΧΑΡΤΗΣ></ΟΔΟΣ>").unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), "οδος");
        assert_eq!(doc.attribute(root, "ΤΥΠΟΣ"), Some("1"));
        assert!(doc.child(root, "ΧΑΡΤΗΣ").is_some());
    }
}
