//! Malformed input must be rejected with a diagnostic, never returned as a
//! partial tree.

#![allow(clippy::unwrap_used)]

use rstest::rstest;

use xmlette::parser::{parse_str_with_options, ParseOptions, ParserState};
use xmlette::{Document, ParseError, ParseErrorKind, TreeError};

fn parse_err(input: &str) -> ParseError {
    match Document::parse_str(input) {
        Ok(doc) => panic!("expected {input:?} to be rejected, got {doc}"),
        Err(err) => err,
    }
}

// ---------------------------------------------------------------------------
// Structural errors
// ---------------------------------------------------------------------------

#[rstest]
#[case::unclosed_root("<a>", ParserState::Value)]
#[case::unclosed_child("<a><b>text", ParserState::Value)]
#[case::open_start_tag("<a", ParserState::StartTag)]
#[case::open_attribute_value("<a x=\"1>", ParserState::AttrValue)]
#[case::open_end_tag("<a></a", ParserState::EndTag)]
#[case::open_comment("<a><!-- never closed</a>", ParserState::Ignore)]
#[case::open_declaration("<?xml version=\"1.0\"", ParserState::Ignore)]
fn test_unexpected_end(#[case] input: &str, #[case] state: ParserState) {
    let err = parse_err(input);
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd { state });
    assert_eq!(err.current, None);
    assert_eq!(err.location.byte_offset, input.len());
}

#[rstest]
#[case::text_before_root("hello<a/>", 'h', ParserState::None)]
#[case::second_root("<a/><b/>", '<', ParserState::Done)]
#[case::text_after_root("<a/>x", 'x', ParserState::Done)]
#[case::leading_end_tag("</a>", '<', ParserState::None)]
#[case::doctype("<!DOCTYPE a><a/>", 'D', ParserState::Ignore)]
#[case::cdata("<a><![CDATA[x]]></a>", '[', ParserState::Ignore)]
#[case::bare_gt_in_text("<a>x > y</a>", '>', ParserState::Value)]
#[case::unquoted_value("<a x=1/>", '1', ParserState::ExpectAttrValue)]
#[case::missing_equals("<a x \"1\"/>", '"', ParserState::ExpectEquals)]
#[case::quote_in_name("<a\"/>", '"', ParserState::StartTag)]
#[case::slash_in_attr_name("<a x/>", '/', ParserState::AttrName)]
#[case::slash_not_closing("<a/b>", '/', ParserState::StartTag)]
#[case::lt_in_tag("<a <b/>", '<', ParserState::ExpectAttrName)]
#[case::quote_in_end_tag("<a></a\">", '"', ParserState::EndTag)]
fn test_unexpected_char(
    #[case] input: &str,
    #[case] found: char,
    #[case] state: ParserState,
) {
    let err = parse_err(input);
    assert_eq!(err.kind, ParseErrorKind::UnexpectedChar { found, state });
    assert_eq!(err.current, Some(found));
    assert_eq!(err.state, state);
}

#[rstest]
#[case("<a><b></a>", "b", "a")]
#[case("<a></b>", "a", "b")]
#[case("<a><b></b></c>", "a", "c")]
#[case("<a></>", "a", "")]
fn test_mismatched_end_tag(#[case] input: &str, #[case] expected: &str, #[case] found: &str) {
    let err = parse_err(input);
    assert_eq!(
        err.kind,
        ParseErrorKind::MismatchedEndTag {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    );
}

#[rstest]
#[case::empty("")]
#[case::whitespace(" \n\t ")]
#[case::only_prologue("<?xml version=\"1.0\"?>")]
#[case::only_comment("<!-- nothing here -->")]
fn test_empty_document(#[case] input: &str) {
    assert_eq!(parse_err(input).kind, ParseErrorKind::EmptyDocument);
}

#[rstest]
#[case::empty_element_name("< a/>")]
#[case::bad_element_char("<a$/>")]
#[case::bad_attribute_char("<a b%=\"1\"/>")]
#[case::bad_child_name("<a><b&c/></a>")]
fn test_invalid_names(#[case] input: &str) {
    let err = parse_err(input);
    assert!(
        matches!(err.kind, ParseErrorKind::Name(TreeError::InvalidName { .. })),
        "{input}: {:?}",
        err.kind
    );
}

// ---------------------------------------------------------------------------
// Diagnostic snapshot
// ---------------------------------------------------------------------------

#[test]
fn test_snapshot_carries_context() {
    let input = "<config>\n  <server port=\"80\">\n    <host>example</host>\n  </sever>\n</config>";
    let err = parse_err(input);

    assert_eq!(err.location.line, 4);
    assert_eq!(err.current, Some('>'));
    assert_eq!(err.next, Some('\n'));
    assert_eq!(err.state, ParserState::EndTag);
    assert_eq!(err.previous_state, ParserState::Value);
    assert_eq!(err.token, "sever");
    assert_eq!(err.input, input);
    assert_eq!(
        err.open_element.as_deref(),
        Some("<server port=\"80\">\n  <host>example</host>\n</server>")
    );
    assert_eq!(
        err.partial_tree.as_deref(),
        Some("<config>\n  <server port=\"80\">\n    <host>example</host>\n  </server>\n</config>")
    );
}

#[test]
fn test_report_renders_every_field() {
    let err = parse_err("<a>\n  <b x='1'>v</c>\n</a>");
    let report = err.report();

    assert!(report.starts_with("parse error at 2:16: closing tag </c> does not match open element <b>\n"));
    assert!(report.contains("  current:  '>'\n"));
    assert!(report.contains("  next:     '\\n'\n"));
    assert!(report.contains("  state:    end-tag (previous: value)\n"));
    assert!(report.contains("  token:    \"c\"\n"));
    assert!(report.contains("  open element:\n    <b x=\"1\">v</b>\n"));
    assert!(report.contains("  tree so far:\n    <a>\n      <b x=\"1\">v</b>\n    </a>\n"));
    assert!(report.ends_with("  input:\n    <a>\n      <b x='1'>v</c>\n    </a>\n"));
}

#[test]
fn test_report_at_end_of_input() {
    let report = parse_err("<a>").report();
    assert!(report.contains("  current:  <end of input>\n"));
    assert!(report.contains("unexpected end of input in state value"));
}

#[test]
fn test_encoding_failure_is_a_parse_error() {
    let Err(err) = Document::parse_bytes(&[b'<', b'a', b'>', 0xC3, 0x28, b'<', b'/', b'a', b'>']) else {
        panic!("invalid UTF-8 accepted");
    };
    assert!(matches!(err.kind, ParseErrorKind::Encoding(_)));
    assert_eq!(err.partial_tree, None);
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[test]
fn test_default_depth_limit() {
    let open: String = (0..300).map(|_| "<a>").collect();
    let close: String = (0..300).map(|_| "</a>").collect();
    let err = parse_err(&format!("{open}{close}"));
    assert_eq!(err.kind, ParseErrorKind::DepthExceeded { max: 256 });
    assert!(err.to_string().contains("depth"));
}

#[rstest]
#[case(3, true)]
#[case(2, false)]
fn test_depth_limit_boundary(#[case] max_depth: u32, #[case] accepted: bool) {
    let options = ParseOptions::default().max_depth(max_depth);
    let result = parse_str_with_options("<a><b><c/></b></a>", &options);
    assert_eq!(result.is_ok(), accepted);
}

#[test]
fn test_huge_name_rejected() {
    let name = "a".repeat(100_000);
    let err = parse_err(&format!("<{name}/>"));
    assert_eq!(err.kind, ParseErrorKind::NameTooLong { max: 50_000 });
    assert_eq!(err.token.len(), 50_000);
}

#[test]
fn test_attribute_name_limit() {
    let options = ParseOptions::default().max_name_length(4);
    assert!(parse_str_with_options("<a abcd=\"1\"/>", &options).is_ok());
    let Err(err) = parse_str_with_options("<a abcde=\"1\"/>", &options) else {
        panic!("long attribute name accepted");
    };
    assert_eq!(err.kind, ParseErrorKind::NameTooLong { max: 4 });
    assert_eq!(err.state, ParserState::AttrName);
}
