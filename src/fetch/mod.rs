//! Retrieval of base vehicle images
//!
//! The resolver only depends on [`ImageFetcher`]; where the bytes come from
//! is decided by the composition root.

use async_trait::async_trait;

use crate::errors::FetchResult;
use crate::svg::XmlDocument;

pub mod embedded;
pub mod http;

pub use embedded::EmbeddedImageFetcher;
pub use http::HttpImageFetcher;

/// Source of base vehicle images
///
/// Implementations deliver a fully parsed document or an error, never a
/// partial document.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch and parse the image identified by `image`
    async fn fetch(&self, image: &str) -> FetchResult<XmlDocument>;
}
