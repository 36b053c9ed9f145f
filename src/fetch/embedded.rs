use async_trait::async_trait;
use tracing::debug;

use super::ImageFetcher;
use crate::assets::VehicleImages;
use crate::errors::{FetchError, FetchResult};
use crate::svg::XmlDocument;

/// Serves the vehicle images bundled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedImageFetcher;

#[async_trait]
impl ImageFetcher for EmbeddedImageFetcher {
    async fn fetch(&self, image: &str) -> FetchResult<XmlDocument> {
        let file = VehicleImages::get_image(image).ok_or_else(|| FetchError::not_found(image))?;
        debug!("Loaded embedded vehicle image {} ({} bytes)", image, file.data.len());

        let text = std::str::from_utf8(&file.data)
            .map_err(|e| FetchError::parse(format!("Invalid UTF-8 in {image}: {e}")))?;
        XmlDocument::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_bundled_image_has_a_body_region() {
        for image in VehicleImages::list_images() {
            let doc = EmbeddedImageFetcher.fetch(&image).await.unwrap();
            assert!(doc.is_svg(), "{image} is not an svg");
            assert!(doc.select("#car-body").is_some(), "{image} has no #car-body");
        }
    }

    #[tokio::test]
    async fn test_unknown_image() {
        let result = EmbeddedImageFetcher.fetch("hovercraft.svg").await;
        assert_eq!(result, Err(FetchError::not_found("hovercraft.svg")));
    }

    #[test]
    fn test_default_image_is_bundled() {
        let doc = tokio_test::assert_ok!(tokio_test::block_on(
            EmbeddedImageFetcher.fetch("simple-truck.svg")
        ));
        assert_eq!(doc.root().attr("viewBox"), Some("0 0 640 480"));
    }
}
