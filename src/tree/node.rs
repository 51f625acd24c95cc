//! Element and attribute node types.
//!
//! An [`Element`] carries its payload (name, text value, attributes) along
//! with the arena links used for navigation. The links are indices into the
//! owning [`Document`](super::Document); they never own anything.

use std::str::FromStr;

use super::NodeId;
use crate::error::{CoercionError, TreeError};
use crate::util::name::{name_eq, normalize_name};

/// Typed access to a text value.
///
/// Implemented by [`Element`] and [`Attribute`]. Conversions use the standard
/// library's `FromStr` implementations and hand back their errors unchanged.
pub trait TypedValue {
    /// The raw (entity-decoded) text.
    fn text(&self) -> &str;

    /// Parses the text with `T`'s `FromStr` implementation.
    ///
    /// # Errors
    ///
    /// Returns `T::Err` if the text is not a valid `T`.
    fn parse_value<T: FromStr>(&self) -> Result<T, T::Err> {
        self.text().parse()
    }

    /// Parses the text as an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Int`] if the text is not an integer in range.
    fn as_i32(&self) -> Result<i32, CoercionError> {
        Ok(self.parse_value()?)
    }

    /// Parses the text as an `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Int`] if the text is not an integer in range.
    fn as_i64(&self) -> Result<i64, CoercionError> {
        Ok(self.parse_value()?)
    }

    /// Parses the text as a `bool` (`true` or `false`).
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Bool`] for anything else.
    fn as_bool(&self) -> Result<bool, CoercionError> {
        Ok(self.parse_value()?)
    }

    /// Parses the text as an `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Float`] if the text is not a number.
    fn as_f32(&self) -> Result<f32, CoercionError> {
        Ok(self.parse_value()?)
    }

    /// Parses the text as an `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Float`] if the text is not a number.
    fn as_f64(&self) -> Result<f64, CoercionError> {
        Ok(self.parse_value()?)
    }
}

/// A name/value pair attached to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    /// Creates an attribute, normalizing its name to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if the name is not valid.
    pub fn new(name: &str, value: impl Into<String>) -> Result<Self, TreeError> {
        Ok(Self {
            name: normalize_name(name)?,
            value: value.into(),
        })
    }

    /// The normalized attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replaces the attribute value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl TypedValue for Attribute {
    fn text(&self) -> &str {
        &self.value
    }
}

/// Storage for a single element in the document arena.
///
/// Access elements via [`Document::element`](super::Document::element).
#[derive(Debug, Clone, Default)]
pub struct Element {
    name: String,
    value: String,
    attributes: Vec<Attribute>,
    pub(super) parent: Option<NodeId>,
    pub(super) first_child: Option<NodeId>,
    pub(super) last_child: Option<NodeId>,
    pub(super) next_sibling: Option<NodeId>,
    pub(super) prev_sibling: Option<NodeId>,
}

impl Element {
    /// Creates a detached element from an already normalized name.
    pub(super) fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// The normalized element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element's text value (empty if it has none).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The element's attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the first attribute whose name matches, ignoring case.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| name_eq(&a.name, name))
    }

    /// Returns the parent element, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns `true` if the element has at least one child.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    pub(super) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(super) fn value_mut(&mut self) -> &mut String {
        &mut self.value
    }

    pub(super) fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }
}

impl TypedValue for Element {
    fn text(&self) -> &str {
        &self.value
    }
}
