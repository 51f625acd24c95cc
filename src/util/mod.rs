//! Utility modules for xmlette.
//!
//! Contains the element/attribute name grammar.

pub mod name;
