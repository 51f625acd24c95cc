//! Serialization.
//!
//! This module renders a `Document` tree, or any element in it, back to
//! indented text that the parser accepts again.

pub mod xml;

pub use xml::{serialize, serialize_element, serialize_with_options, SerializeOptions};
