//! Minimal selector support for locating colourable regions

use super::document::Element;

/// A simple selector in the subset used to address regions of vehicle images
///
/// Supported forms: `#id`, `.class`, `tag`, `tag#id`, `tag.class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Tag(String),
    TagId(String, String),
    TagClass(String, String),
}

impl Selector {
    /// Parse a selector, returning `None` for anything outside the subset
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() || spec.contains(char::is_whitespace) {
            return None;
        }

        if let Some(id) = spec.strip_prefix('#') {
            return valid_ident(id).then(|| Self::Id(id.to_string()));
        }
        if let Some(class) = spec.strip_prefix('.') {
            return valid_ident(class).then(|| Self::Class(class.to_string()));
        }
        if let Some((tag, id)) = spec.split_once('#') {
            return (valid_ident(tag) && valid_ident(id))
                .then(|| Self::TagId(tag.to_string(), id.to_string()));
        }
        if let Some((tag, class)) = spec.split_once('.') {
            return (valid_ident(tag) && valid_ident(class))
                .then(|| Self::TagClass(tag.to_string(), class.to_string()));
        }
        valid_ident(spec).then(|| Self::Tag(spec.to_string()))
    }

    /// Check whether an element is matched by this selector
    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Id(id) => element.attr("id") == Some(id.as_str()),
            Self::Class(class) => element.has_class(class),
            Self::Tag(tag) => element.local_name() == tag,
            Self::TagId(tag, id) => {
                element.local_name() == tag && element.attr("id") == Some(id.as_str())
            }
            Self::TagClass(tag, class) => element.local_name() == tag && element.has_class(class),
        }
    }
}

fn valid_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
