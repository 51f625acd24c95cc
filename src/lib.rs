//! # xmlette
//!
//! A small markup parser and document model. A hand-rolled, single-pass
//! character state machine turns text into an arena-backed tree of named
//! elements with attributes and text values, and a serializer renders the
//! tree back to indented text. Malformed input produces a [`ParseError`]
//! carrying a full snapshot of the machine state.
//!
//! ## Quick Start
//!
//! ```
//! use xmlette::{Document, TypedValue};
//!
//! let doc = Document::parse_str("<server port=\"8080\"><name>web</name></server>").unwrap();
//! let root = doc.root();
//! assert_eq!(doc.name(root), "server");
//! assert_eq!(doc.attribute(root, "PORT"), Some("8080"));
//!
//! let name = doc.child(root, "name").unwrap();
//! assert_eq!(doc.value(name), "web");
//! assert_eq!(doc.element(root).attribute("port").unwrap().as_i32(), Ok(8080));
//! ```
//!
//! The [`Properties`] store builds on the same model to persist key/value
//! pairs as a `<properties>` document.

pub mod encoding;
pub mod entities;
pub mod error;
pub mod parser;
pub mod properties;
pub mod serial;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use error::{ParseError, ParseErrorKind, TreeError};
pub use properties::{Properties, PropertiesError};
pub use tree::{Attribute, Document, Element, NodeId, TypedValue};
