pub mod assets;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod fleet;
pub mod image_cache;
pub mod map;
pub mod sprite;
pub mod svg;
