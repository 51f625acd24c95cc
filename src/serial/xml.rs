//! Tree serializer.
//!
//! Renders elements in pre-order. An element with neither value nor children
//! is written self-closing and one with only a value fits on one line. Any
//! other element puts its value right after the opening tag, each child on
//! its own line one level deeper, and the closing tag on a line of its own.

use crate::entities::{escape_attribute, escape_text};
use crate::tree::{Document, NodeId};

/// The declaration written when [`SerializeOptions::declaration`] is set.
const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Options controlling serialization output.
///
/// # Examples
///
/// ```
/// use xmlette::Document;
/// use xmlette::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let text = serialize_with_options(&doc, &SerializeOptions::default().indent_str("\t"));
/// assert_eq!(text, "<root>\n\t<child>Hello</child>\n</root>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// The indentation string written once per nesting level.
    /// Defaults to two spaces.
    pub indent_str: String,
    /// Whether to start the output with an `<?xml ...?>` declaration.
    /// Defaults to `false`.
    pub declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            declaration: false,
        }
    }
}

impl SerializeOptions {
    /// Sets the indentation string used for each nesting level.
    ///
    /// The default is two spaces (`"  "`). Common alternatives include a tab
    /// (`"\t"`) or four spaces (`"    "`). An empty string still puts every
    /// child on its own line.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }

    /// Enables or disables the leading `<?xml ...?>` declaration.
    #[must_use]
    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

/// Serializes a document with default options.
///
/// # Examples
///
/// ```
/// use xmlette::Document;
/// use xmlette::serial::serialize;
///
/// let doc = Document::parse_str("<a x=\"1\"><b>hi</b><c/></a>").unwrap();
/// assert_eq!(serialize(&doc), "<a x=\"1\">\n  <b>hi</b>\n  <c/>\n</a>");
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document with the given options.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut output = String::new();
    if options.declaration {
        output.push_str(DECLARATION);
        output.push('\n');
    }
    write_element(doc, doc.root(), &mut output, options, 0);
    output
}

/// Serializes a single element and its subtree with default options.
///
/// The element is rendered as if it were a root, at depth zero.
#[must_use]
pub fn serialize_element(doc: &Document, id: NodeId) -> String {
    let mut output = String::new();
    write_element(doc, id, &mut output, &SerializeOptions::default(), 0);
    output
}

fn write_indent(out: &mut String, options: &SerializeOptions, depth: usize) {
    for _ in 0..depth {
        out.push_str(&options.indent_str);
    }
}

fn write_element(
    doc: &Document,
    id: NodeId,
    out: &mut String,
    options: &SerializeOptions,
    depth: usize,
) {
    let name = doc.name(id);
    let value = doc.value(id);

    out.push('<');
    out.push_str(name);
    for attr in doc.attributes(id) {
        out.push(' ');
        out.push_str(attr.name());
        out.push('=');
        write_attribute_value(out, attr.value());
    }

    if value.is_empty() && doc.first_child(id).is_none() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    out.push_str(&escape_text(value));
    if doc.first_child(id).is_some() {
        out.push('\n');
        for child in doc.children(id) {
            write_indent(out, options, depth + 1);
            write_element(doc, child, out, options, depth + 1);
            out.push('\n');
        }
        write_indent(out, options, depth);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Picks the quote for an attribute value and writes the quoted value.
///
/// Double quotes unless the value contains `"` and no `'`, in which case
/// single quotes avoid escaping. A value holding both gets `&quot;`.
fn write_attribute_value(out: &mut String, value: &str) {
    let quote = if value.contains('"') && !value.contains('\'') {
        '\''
    } else {
        '"'
    };
    out.push(quote);
    out.push_str(&escape_attribute(value, Some(quote)));
    out.push(quote);
}
