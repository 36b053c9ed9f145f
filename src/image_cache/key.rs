//! Cache identity for base images and their colour variants

use std::fmt;

/// Opaque cache key
///
/// The untinted base image lives under the bare image id; each colour
/// variant lives under the image id immediately followed by the colour name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `image` in `colour`; a blank colour means the base image
    pub fn new(image: &str, colour: Option<&str>) -> Self {
        match tint_colour(colour) {
            Some(colour) => Self::variant(image, colour),
            None => Self::base(image),
        }
    }

    /// Key of the untinted base image
    pub fn base(image: &str) -> Self {
        Self(image.to_string())
    }

    /// Key of a recoloured variant
    pub fn variant(image: &str, colour: &str) -> Self {
        Self(format!("{image}{colour}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The colour to tint with, treating a blank name as no colour
///
/// A blank name would otherwise produce a variant key equal to the base key.
pub fn tint_colour(colour: Option<&str>) -> Option<&str> {
    colour.filter(|name| !name.trim().is_empty())
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
