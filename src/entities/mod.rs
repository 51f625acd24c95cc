//! Named character entities.
//!
//! Only the five predefined entities are recognized: `&amp;`, `&lt;`,
//! `&gt;`, `&apos;` and `&quot;`. The table is built once on first use and
//! never mutated afterwards, so it can be shared freely between threads.
//! Any other `&name;` token is passed through untouched.

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::util::name::is_name_char;

/// Bidirectional mapping between entity names and their literal characters.
#[derive(Debug)]
pub struct EntityTable {
    by_name: HashMap<&'static str, char>,
    by_char: HashMap<char, &'static str>,
}

const STANDARD_ENTITIES: [(&str, char); 5] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("apos", '\''),
    ("quot", '"'),
];

impl EntityTable {
    /// Builds the table of the five predefined entities.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            by_name: STANDARD_ENTITIES.iter().copied().collect(),
            by_char: STANDARD_ENTITIES.iter().map(|&(n, c)| (c, n)).collect(),
        }
    }

    /// Looks up the literal for an entity name, ignoring case.
    #[must_use]
    pub fn literal(&self, name: &str) -> Option<char> {
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(name.to_ascii_lowercase().as_str()))
            .copied()
    }

    /// Looks up the entity name for a literal character.
    #[must_use]
    pub fn name(&self, literal: char) -> Option<&'static str> {
        self.by_char.get(&literal).copied()
    }
}

static ENTITIES: Lazy<EntityTable> = Lazy::new(EntityTable::standard);

/// Returns the process-wide entity table.
#[must_use]
pub fn table() -> &'static EntityTable {
    &ENTITIES
}

/// Decodes entity references in `text` using the standard table.
///
/// # Examples
///
/// ```
/// use xmlette::entities::decode;
///
/// assert_eq!(decode("&amp;&lt;"), "&<");
/// assert_eq!(decode("&foo;"), "&foo;");
/// ```
#[must_use]
pub fn decode(text: &str) -> Cow<'_, str> {
    decode_with(table(), text)
}

/// Decodes entity references in `text` using `table`.
///
/// The input is scanned once from left to right, so the output of one
/// replacement is never decoded again (`&amp;lt;` becomes `&lt;`).
#[must_use]
pub fn decode_with<'a>(table: &EntityTable, text: &'a str) -> Cow<'a, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let name_len = after
            .find(|c: char| !is_name_char(c))
            .unwrap_or(after.len());
        let literal = if after[name_len..].starts_with(';') {
            table.literal(&after[..name_len])
        } else {
            None
        };
        if let Some(c) = literal {
            out.push(c);
            rest = &after[name_len + 1..];
        } else {
            out.push('&');
            rest = after;
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escapes `&`, `<` and `>` in element text.
#[must_use]
pub fn escape_text(text: &str) -> Cow<'_, str> {
    escape(text, |c| matches!(c, '&' | '<' | '>'))
}

/// Escapes `&`, `<` and, if `quote` is given, that quote character in an
/// attribute value.
#[must_use]
pub fn escape_attribute(value: &str, quote: Option<char>) -> Cow<'_, str> {
    escape(value, |c| c == '&' || c == '<' || Some(c) == quote)
}

fn escape(text: &str, needs_escape: impl Fn(char) -> bool) -> Cow<'_, str> {
    if !text.chars().any(&needs_escape) {
        return Cow::Borrowed(text);
    }
    let table = table();
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match table.name(c).filter(|_| needs_escape(c)) {
            Some(name) => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}
