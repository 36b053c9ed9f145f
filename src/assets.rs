use rust_embed::RustEmbed;

/// Embedded vehicle images (SVG)
#[derive(RustEmbed)]
#[folder = "assets/vehicles/"]
pub struct VehicleImages;

impl VehicleImages {
    /// Get a vehicle image by id
    pub fn get_image(image: &str) -> Option<rust_embed::EmbeddedFile> {
        Self::get(image)
    }

    /// List all bundled vehicle image ids, sorted
    pub fn list_images() -> Vec<String> {
        let mut images: Vec<String> = Self::iter().map(|name| name.into_owned()).collect();
        images.sort();
        images
    }
}
