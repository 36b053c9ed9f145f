//! Error type definitions for the SVG fleet
//!
//! This module defines all error types used throughout the crate, providing
//! a hierarchical error system in which lower layers convert into
//! [`AppError`] at the binary edge.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Image cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Image retrieval errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Sprite image resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse errors
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Config file write errors
    #[error("Config serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Image cache specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Input to `save` is not a vector-image document
    #[error("Invalid document for key {key}: root element is <{root}>, expected <svg>")]
    InvalidDocument { key: String, root: String },

    /// `load` on a key that was never saved
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },
}

/// Image retrieval specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport level failure (connect, timeout, body read)
    #[error("HTTP request failed: {url} - {message}")]
    Http { url: String, message: String },

    /// Non-success HTTP status
    #[error("HTTP error: {status} - {url}")]
    Status { status: u16, url: String },

    /// Image id unknown to the source
    #[error("Image not found: {image}")]
    NotFound { image: String },

    /// Image id cannot be turned into a URL
    #[error("Invalid image URL: {image} - {message}")]
    InvalidUrl { image: String, message: String },

    /// Payload is not well-formed XML
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Local read failure
    #[error("IO error: {path} - {message}")]
    Io { path: String, message: String },
}

/// Errors raised while resolving a sprite's displayable image
///
/// `Clone` so that one coalesced resolution can hand the same outcome to
/// every sprite waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The base image could not be retrieved
    #[error("Fetch failed for {image}: {source}")]
    FetchFailed {
        image: String,
        #[source]
        source: FetchError,
    },

    /// None of the colourable regions exist in the base image
    #[error("Image malformed: {image} has no region matching {selectors:?}")]
    ImageMalformed {
        image: String,
        selectors: Vec<String>,
    },

    /// The cache refused or could not return a document
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl CacheError {
    /// Create an invalid document error
    pub fn invalid_document<K: Into<String>, R: Into<String>>(key: K, root: R) -> Self {
        Self::InvalidDocument {
            key: key.into(),
            root: root.into(),
        }
    }

    /// Create a key not found error
    pub fn key_not_found<K: Into<String>>(key: K) -> Self {
        Self::KeyNotFound { key: key.into() }
    }
}

impl FetchError {
    /// Create a transport error
    pub fn http<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<I: Into<String>>(image: I) -> Self {
        Self::NotFound {
            image: image.into(),
        }
    }
}

impl ResolveError {
    /// Wrap a fetch failure for a base image
    pub fn fetch_failed<I: Into<String>>(image: I, source: FetchError) -> Self {
        Self::FetchFailed {
            image: image.into(),
            source,
        }
    }

    /// Create an image malformed error
    pub fn image_malformed<I: Into<String>>(image: I, selectors: &[String]) -> Self {
        Self::ImageMalformed {
            image: image.into(),
            selectors: selectors.to_vec(),
        }
    }
}
