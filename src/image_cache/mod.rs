//! Shared cache of base and recoloured vehicle images
//!
//! This module deduplicates image work across every sprite in the fleet:
//!
//! - [`CacheKey`] derives the identity of a base image or a colour variant
//! - [`ImageCache`] stores documents and only ever hands out independent copies
//! - [`ImageResolver`] runs the fetch, tint and store sequence on a miss,
//!   joining concurrent requests for the same key onto a single job

pub mod key;
pub mod resolver;
pub mod service;

pub use key::{tint_colour, CacheKey};
pub use resolver::{ImageResolver, Resolution, ResolutionPlan, ResolverStats};
pub use service::ImageCache;
