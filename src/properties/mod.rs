//! Key/value properties persisted as markup.
//!
//! A [`Properties`] store keeps string values under element-name keys, in
//! insertion order, and round-trips through the parser and serializer as
//!
//! ```text
//! <properties>
//!   <key1>value1</key1>
//!   <key2>value2</key2>
//! </properties>
//! ```
//!
//! Keys follow the element name rules: they are validated on insertion and
//! compared case-insensitively. Values survive a save/load cycle except for
//! trailing whitespace and leading tabs, newlines and carriage returns, which
//! the parser drops.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

use crate::encoding::decode_to_utf8;
use crate::error::{EncodingError, ParseError, TreeError};
use crate::serial::{serialize, serialize_with_options, SerializeOptions};
use crate::tree::Document;
use crate::util::name::normalize_name;

/// Name of the root element of a properties document.
pub const ROOT_NAME: &str = "properties";

/// Errors raised while converting or persisting [`Properties`].
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// Reading or writing the backing file failed.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The text is not well-formed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The file bytes could not be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The document root is not `<properties>`.
    #[error("expected root element <properties>, found <{found}>")]
    UnexpectedRoot {
        /// The name of the root that was found.
        found: String,
    },
    /// A key is not a valid element name.
    #[error("invalid property key: {0}")]
    Key(#[from] TreeError),
}

/// An insertion-ordered map of normalized keys to string values.
///
/// # Examples
///
/// ```
/// use xmlette::Properties;
///
/// let mut props = Properties::new();
/// props.set("Port", "8080").unwrap();
/// assert_eq!(props.get("port"), Some("8080"));
/// assert_eq!(props.get_as::<u16>("PORT"), Some(Ok(8080)));
///
/// let text = props.to_xml_string().unwrap();
/// assert_eq!(text, "<properties>\n  <port>8080</port>\n</properties>");
/// assert_eq!(Properties::from_xml_str(&text).unwrap(), props);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: IndexMap<String, String>,
}

impl Properties {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = normalize_name(key).ok()?;
        self.entries.get(&key).map(String::as_str)
    }

    /// Returns the value stored under `key`, or `default` if there is none.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parses the value stored under `key` as a `T`.
    ///
    /// Returns `None` if the key is absent, otherwise the result of `T`'s
    /// `FromStr` implementation.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<Result<T, T::Err>> {
        self.get(key).map(str::parse)
    }

    /// Stores `value` under `key` and returns the value it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if `key` is not a valid element
    /// name.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<Option<String>, TreeError> {
        let key = normalize_name(key)?;
        Ok(self.entries.insert(key, value.into()))
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = normalize_name(key).ok()?;
        self.entries.shift_remove(&key)
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Builds a `<properties>` document with one child per entry.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Key`] if a key cannot be used as an
    /// element name. Keys inserted through [`set`](Self::set) always can.
    pub fn to_document(&self) -> Result<Document, PropertiesError> {
        let mut doc = Document::new(ROOT_NAME)?;
        let root = doc.root();
        for (key, value) in &self.entries {
            let child = doc.add_child(root, key)?;
            doc.set_value(child, value.as_str());
        }
        Ok(doc)
    }

    /// Reads entries from a `<properties>` document.
    ///
    /// Each child of the root contributes its name and value; a key that
    /// appears more than once keeps its last value. Grandchildren and
    /// attributes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::UnexpectedRoot`] if the root element is not
    /// `<properties>`.
    pub fn from_document(doc: &Document) -> Result<Self, PropertiesError> {
        let root = doc.root();
        if doc.name(root) != ROOT_NAME {
            return Err(PropertiesError::UnexpectedRoot {
                found: doc.name(root).to_string(),
            });
        }
        let entries = doc
            .children(root)
            .map(|child| (doc.name(child).to_string(), doc.value(child).to_string()))
            .collect();
        Ok(Self { entries })
    }

    /// Renders the store as markup text.
    ///
    /// # Errors
    ///
    /// See [`to_document`](Self::to_document).
    pub fn to_xml_string(&self) -> Result<String, PropertiesError> {
        Ok(serialize(&self.to_document()?))
    }

    /// Parses a store from markup text.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Parse`] for malformed text and
    /// [`PropertiesError::UnexpectedRoot`] for a document of another kind.
    pub fn from_xml_str(text: &str) -> Result<Self, PropertiesError> {
        Self::from_document(&Document::parse_str(text)?)
    }

    /// Loads a store from a file, detecting its encoding.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Io`] if the file cannot be read, plus any
    /// error of [`from_xml_str`](Self::from_xml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PropertiesError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = decode_to_utf8(&bytes)?;
        let properties = Self::from_xml_str(&text)?;
        tracing::debug!(path = %path.display(), entries = properties.len(), "loaded properties");
        Ok(properties)
    }

    /// Writes the store to a file as UTF-8, with a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PropertiesError> {
        let path = path.as_ref();
        let mut text = serialize_with_options(
            &self.to_document()?,
            &SerializeOptions::default().declaration(true),
        );
        text.push('\n');
        fs::write(path, text).map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), entries = self.len(), "saved properties");
        Ok(())
    }
}
