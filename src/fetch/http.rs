use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::ImageFetcher;
use crate::errors::{FetchError, FetchResult};
use crate::svg::XmlDocument;

/// Fetches vehicle images relative to a base URL
pub struct HttpImageFetcher {
    client: Client,
    base_url: Url,
}

impl HttpImageFetcher {
    /// Create a fetcher for images below `base_url`
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> FetchResult<Self> {
        // Without a trailing slash `join` would replace the last path segment
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| FetchError::InvalidUrl {
            image: base_url.to_string(),
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::http(base_url.as_str(), e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Absolute URL of an image id
    ///
    /// The id must name a path below the base URL; absolute URLs and ids
    /// that climb out of the base path are rejected.
    pub fn image_url(&self, image: &str) -> FetchResult<Url> {
        let invalid = |message: &str| FetchError::InvalidUrl {
            image: image.to_string(),
            message: message.to_string(),
        };

        if Url::parse(image).is_ok() {
            return Err(invalid("image id must be relative"));
        }
        let url = self
            .base_url
            .join(image)
            .map_err(|e| invalid(&e.to_string()))?;
        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(invalid("image id leaves the base path"));
        }
        Ok(url)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image: &str) -> FetchResult<XmlDocument> {
        let url = self.image_url(image)?;
        debug!("Fetching vehicle image from: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::http(url.as_str(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::http(url.as_str(), format!("Failed to read response: {e}")))?;

        debug!("Fetched {} bytes for {}", body.len(), image);
        XmlDocument::parse(&body)
    }
}
