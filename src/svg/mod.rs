//! Vector-image document model
//!
//! Base images are parsed once into an owned element tree. The tree is plain
//! data: `Clone` is a deep copy, which is what lets the image cache hand out
//! independent documents that callers may recolour freely.

pub mod document;
pub mod selector;

pub use document::{Element, Node, XmlDocument};
pub use selector::Selector;
