//! Element and attribute name handling.
//!
//! Names are case-insensitive: they are stored lowercased and compared in
//! lowercase. A valid name is non-empty and made only of letters, digits and
//! the punctuation characters `-`, `_`, `.` and `#`.

use crate::error::TreeError;

/// Returns `true` if `c` may appear in an element or attribute name.
#[must_use]
pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '#')
}

/// Validates `name` and returns its normalized (lowercase) form.
///
/// # Errors
///
/// Returns [`TreeError::InvalidName`] if the name is empty or contains a
/// character outside the name grammar.
///
/// # Examples
///
/// ```
/// use xmlette::util::name::normalize_name;
///
/// assert_eq!(normalize_name("Item-1").unwrap(), "item-1");
/// assert!(normalize_name("a b").is_err());
/// ```
pub fn normalize_name(name: &str) -> Result<String, TreeError> {
    if name.is_empty() {
        return Err(TreeError::InvalidName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if !name.chars().all(is_name_char) {
        return Err(TreeError::InvalidName {
            name: name.to_string(),
            reason: "name contains a disallowed character",
        });
    }
    Ok(name.to_lowercase())
}

/// Compares a stored (already normalized) name against a query, ignoring case.
///
/// The query is folded with the same whole-string lowercasing that
/// [`normalize_name`] applies, so context-dependent mappings such as a
/// word-final `Σ` agree on both sides.
#[must_use]
pub fn name_eq(stored: &str, query: &str) -> bool {
    stored == query || query.to_lowercase() == stored
}
