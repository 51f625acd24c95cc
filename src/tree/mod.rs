//! Arena-based document tree.
//!
//! All elements live in a contiguous `Vec<Element>` owned by the
//! [`Document`], and are referenced by [`NodeId`], a newtype over
//! `NonZeroU32`. Parent, child and sibling links are ids, so the parent
//! back-reference is a plain index and never an owning pointer: dropping the
//! `Document` frees the whole tree at once.
//!
//! A document always has exactly one root element. Element names and
//! attribute names are normalized to lowercase, and every lookup by name is
//! case-insensitive.

mod node;

pub use node::{Attribute, Element, TypedValue};

use std::fmt;
use std::mem;
use std::num::NonZeroU32;

use crate::error::{ParseError, TreeError};
use crate::util::name::{name_eq, normalize_name};

/// A typed index into the document's element arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// A parsed or programmatically built document: one root element and
/// everything below it.
///
/// All tree operations go through `&Document` (navigation) or
/// `&mut Document` (mutation), addressing elements by [`NodeId`].
///
/// # Examples
///
/// ```
/// use xmlette::Document;
///
/// let doc = Document::parse_str("<config><name>demo</name></config>").unwrap();
/// let name = doc.child(doc.root(), "NAME").unwrap();
/// assert_eq!(doc.value(name), "demo");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The element arena. Index 0 is unused (placeholder for `NonZeroU32`).
    elements: Vec<Element>,
    /// The root element.
    root: NodeId,
}

impl Document {
    /// Creates a document holding a single, empty root element.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if `root_name` is not a valid name.
    pub fn new(root_name: &str) -> Result<Self, TreeError> {
        Ok(Self::with_root(normalize_name(root_name)?))
    }

    fn with_root(name: String) -> Self {
        let mut elements = Vec::with_capacity(16);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        elements.push(Element::default());
        elements.push(Element::named(name));
        Self {
            elements,
            root: NodeId::from_index(1),
        }
    }

    /// Parses a string into a `Document`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is malformed.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_str(input)
    }

    /// Parses raw bytes, detecting the encoding first.
    ///
    /// See [`crate::encoding::decode_to_utf8`] for the detection rules.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the decoded
    /// text is malformed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        let text = crate::encoding::decode_to_utf8(input)
            .map_err(|e| ParseError::without_context(e.into()))?;
        crate::parser::parse_str(&text)
    }

    /// Returns the root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the element stored under `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id.as_index()]
    }

    fn element_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.elements[id.as_index()]
    }

    /// Returns the normalized name of an element.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        self.element(id).name()
    }

    /// Renames an element.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if `name` is not a valid name.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<(), TreeError> {
        let name = normalize_name(name)?;
        self.element_mut(id).set_name(name);
        Ok(())
    }

    /// Returns the text value of an element.
    #[must_use]
    pub fn value(&self, id: NodeId) -> &str {
        self.element(id).value()
    }

    /// Replaces the text value of an element.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        *self.element_mut(id).value_mut() = value.into();
    }

    /// Appends text to the value of an element.
    pub fn append_value(&mut self, id: NodeId, text: &str) {
        self.element_mut(id).value_mut().push_str(text);
    }

    // --- Attributes ---

    /// Returns the attributes of an element in insertion order.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).attributes()
    }

    /// Returns the value of the first attribute named `name`, ignoring case.
    ///
    /// This never modifies the element; see
    /// [`attribute_or_insert`](Self::attribute_or_insert) for the
    /// get-or-create form.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).attribute(name).map(Attribute::value)
    }

    /// Appends an attribute without checking for an existing one of the
    /// same name.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if `name` is not a valid name.
    pub fn add_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        let attribute = Attribute::new(name, value)?;
        self.element_mut(id).attributes_mut().push(attribute);
        Ok(())
    }

    /// Sets the first attribute named `name`, or appends it if absent.
    ///
    /// Returns the previous value, if there was one.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if the attribute has to be created
    /// and `name` is not a valid name.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<Option<String>, TreeError> {
        let value = value.into();
        let attributes = self.element_mut(id).attributes_mut();
        if let Some(existing) = attributes.iter_mut().find(|a| name_eq(a.name(), name)) {
            let previous = existing.value().to_string();
            existing.set_value(value);
            return Ok(Some(previous));
        }
        attributes.push(Attribute::new(name, value)?);
        Ok(None)
    }

    /// Returns the first attribute named `name`, creating it if absent.
    ///
    /// `default` is only applied when the attribute is created; an existing
    /// attribute keeps its value. Reading through this method therefore
    /// inserts the attribute as a side effect. Use
    /// [`attribute`](Self::attribute) for a pure lookup.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if the attribute has to be created
    /// and `name` is not a valid name.
    pub fn attribute_or_insert(
        &mut self,
        id: NodeId,
        name: &str,
        default: Option<&str>,
    ) -> Result<&mut Attribute, TreeError> {
        let attributes = self.element_mut(id).attributes_mut();
        let index = match attributes.iter().position(|a| name_eq(a.name(), name)) {
            Some(index) => index,
            None => {
                attributes.push(Attribute::new(name, default.unwrap_or_default())?);
                attributes.len() - 1
            }
        };
        Ok(&mut attributes[index])
    }

    /// Removes the first attribute named `name` and returns it.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<Attribute> {
        let attributes = self.element_mut(id).attributes_mut();
        let index = attributes.iter().position(|a| name_eq(a.name(), name))?;
        Some(attributes.remove(index))
    }

    /// Sets the value of the most recently added attribute.
    pub(crate) fn set_last_attribute_value(&mut self, id: NodeId, value: String) {
        if let Some(last) = self.element_mut(id).attributes_mut().last_mut() {
            last.set_value(value);
        }
    }

    // --- Navigation ---

    /// Returns the parent of an element, or `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).parent
    }

    /// Returns the first child of an element.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).first_child
    }

    /// Returns the last child of an element.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).last_child
    }

    /// Returns the next sibling of an element.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).next_sibling
    }

    /// Returns the previous sibling of an element.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).prev_sibling
    }

    /// Returns an iterator over the children of an element.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.element(id).first_child,
        }
    }

    /// Returns an iterator over the children named `name`, ignoring case.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .filter(move |&child| name_eq(self.name(child), name))
    }

    /// Returns the first child named `name`, ignoring case.
    #[must_use]
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// Returns an iterator over an element and its ancestors (walking up to
    /// the root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of an element (depth-first).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Walks `levels` parents up from `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NoParent`] if the walk would go above the root.
    pub fn up(&self, id: NodeId, levels: usize) -> Result<NodeId, TreeError> {
        let mut current = id;
        for _ in 0..levels {
            current = self.parent(current).ok_or_else(|| TreeError::NoParent {
                name: self.name(id).to_string(),
                levels,
            })?;
        }
        Ok(current)
    }

    /// Returns the nearest ancestor of `id` (excluding `id` itself) named
    /// `name`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NoParent`] if `id` is a root, and
    /// [`TreeError::AncestorNotFound`] if no ancestor matches.
    pub fn ancestor_named(&self, id: NodeId, name: &str) -> Result<NodeId, TreeError> {
        if self.parent(id).is_none() {
            return Err(TreeError::NoParent {
                name: self.name(id).to_string(),
                levels: 1,
            });
        }
        self.ancestors(id)
            .skip(1)
            .find(|&ancestor| name_eq(self.name(ancestor), name))
            .ok_or_else(|| TreeError::AncestorNotFound {
                name: self.name(id).to_string(),
                wanted: name.to_string(),
            })
    }

    /// Returns the top of the parent chain starting at `id`.
    ///
    /// For an element attached to the tree this is [`root`](Self::root); for
    /// a detached element it is the top of its own subtree.
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    // --- Mutation ---

    fn alloc(&mut self, element: Element) -> NodeId {
        let index = self.elements.len();
        self.elements.push(element);
        NodeId::from_index(index)
    }

    /// Allocates a new, detached element in the arena.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if `name` is not a valid name.
    pub fn create_element(&mut self, name: &str) -> Result<NodeId, TreeError> {
        let name = normalize_name(name)?;
        Ok(self.alloc(Element::named(name)))
    }

    /// Appends a detached element to the end of a parent's child list.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `child` already has a parent. Detach it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.element(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.element_mut(child).parent = Some(parent);

        if let Some(last) = self.element(parent).last_child {
            self.element_mut(last).next_sibling = Some(child);
            self.element_mut(child).prev_sibling = Some(last);
            self.element_mut(parent).last_child = Some(child);
        } else {
            self.element_mut(parent).first_child = Some(child);
            self.element_mut(parent).last_child = Some(child);
        }
    }

    /// Creates an element named `name` and appends it to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if `name` is not a valid name.
    pub fn add_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        let child = self.create_element(name)?;
        self.append_child(parent, child);
        Ok(child)
    }

    /// Returns the first child named `name`, creating and appending it if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidName`] if the child has to be created and
    /// `name` is not a valid name.
    pub fn child_or_insert(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        match self.child(parent, name) {
            Some(child) => Ok(child),
            None => self.add_child(parent, name),
        }
    }

    /// Detaches an element from its parent.
    ///
    /// The element and its subtree stay allocated in the arena but are no
    /// longer reachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.element(id).parent else {
            return;
        };

        let prev = self.element(id).prev_sibling;
        let next = self.element(id).next_sibling;

        match prev {
            Some(p) => self.element_mut(p).next_sibling = next,
            None => self.element_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.element_mut(n).prev_sibling = prev,
            None => self.element_mut(parent).last_child = prev,
        }

        let element = self.element_mut(id);
        element.parent = None;
        element.prev_sibling = None;
        element.next_sibling = None;
    }

    /// Builds a new document from the element `id` of `source`, moving its
    /// value, attributes and children out.
    ///
    /// This is a destructive move: afterwards the source element keeps only
    /// its name and has no value, attributes or children. The moved
    /// descendants are detached from `source` but their arena slots are not
    /// reclaimed, so they still count towards [`node_count`](Self::node_count).
    /// Use [`append_document`](Self::append_document) or drop the source to
    /// release them.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlette::Document;
    ///
    /// let mut source = Document::parse_str("<a><b x=\"1\"><c/></b></a>").unwrap();
    /// let b = source.child(source.root(), "b").unwrap();
    /// let moved = Document::move_from(&mut source, b);
    ///
    /// assert_eq!(moved.name(moved.root()), "b");
    /// assert_eq!(moved.attribute(moved.root(), "x"), Some("1"));
    /// assert!(source.attributes(b).is_empty());
    /// assert_eq!(source.children(b).count(), 0);
    /// ```
    #[must_use]
    pub fn move_from(source: &mut Document, id: NodeId) -> Document {
        let mut doc = Self::with_root(source.name(id).to_string());
        let root = doc.root;
        doc.take_contents(root, source, id);
        doc
    }

    /// Consumes `other` and appends its root element (with its whole
    /// subtree) as the last child of `parent`.
    pub fn append_document(&mut self, parent: NodeId, mut other: Document) -> NodeId {
        let other_root = other.root;
        let child = self.alloc(Element::named(other.name(other_root).to_string()));
        self.append_child(parent, child);
        self.take_contents(child, &mut other, other_root);
        child
    }

    /// Moves value, attributes and children of `from` in `source` onto
    /// `target`, recursively, leaving `from` empty.
    fn take_contents(&mut self, target: NodeId, source: &mut Document, from: NodeId) {
        let value = mem::take(source.element_mut(from).value_mut());
        let attributes = mem::take(source.element_mut(from).attributes_mut());
        *self.element_mut(target).value_mut() = value;
        *self.element_mut(target).attributes_mut() = attributes;

        let children: Vec<NodeId> = source.children(from).collect();
        for child in children {
            source.detach(child);
            let copy = self.alloc(Element::named(source.name(child).to_string()));
            self.append_child(target, copy);
            self.take_contents(copy, source, child);
        }
    }

    /// Returns the total number of elements in the arena, including
    /// detached ones.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.elements.len() - 1 // subtract placeholder at index 0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::serial::serialize(self))
    }
}

// --- Iterators ---

/// Iterator over the children of an element.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.element(current).next_sibling;
        Some(current)
    }
}

/// Iterator over an element and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.element(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of an element.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Try to go deeper first
        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Try next sibling
        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        // Walk up to find an ancestor with a next sibling
        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}
