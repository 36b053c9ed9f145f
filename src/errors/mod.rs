//! Centralized error handling for the SVG fleet
//!
//! Every layer has its own error type so that callers can tell a cache miss
//! from a broken image from a network failure:
//!
//! - **Cache Errors**: rejected documents and absent keys
//! - **Fetch Errors**: retrieval and parsing of base images
//! - **Resolve Errors**: the fetch, tint and store sequence of a sprite
//!
//! None of these are fatal to the process. A sprite whose resolution fails
//! stays unresolved and the rest of the fleet keeps moving.
//!
//! # Usage
//!
//! ```rust
//! use svg_fleet::errors::{CacheError, CacheResult};
//!
//! fn lookup(found: bool) -> CacheResult<()> {
//!     if found {
//!         Ok(())
//!     } else {
//!         Err(CacheError::key_not_found("truck.svgred"))
//!     }
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for image cache Results
pub type CacheResult<T> = Result<T, CacheError>;

/// Convenience type alias for fetch Results
pub type FetchResult<T> = Result<T, FetchError>;

/// Convenience type alias for resolution Results
pub type ResolveResult<T> = Result<T, ResolveError>;
