//! Fleet composition
//!
//! [`Fleet`] owns the vehicle sprites, the click registrations and the
//! random source, and borrows the shared [`ImageResolver`](crate::image_cache::ImageResolver)
//! it was given. It is what the periodic animation loop and the options
//! form talk to.

pub mod options;
pub mod simulation;

pub use options::{OptionField, OptionValue};
pub use simulation::{Fleet, FleetStats, ResolveReport, TickReport};
