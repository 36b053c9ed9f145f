//! Vehicle sprites
//!
//! A [`VehicleSprite`] owns one render handle and drives it through the
//! image resolution protocol: it asks the shared resolver for a tinted copy
//! of its image, embeds the result and only then takes part in animation.

pub mod listeners;
pub mod overlay;
pub mod vehicle;

pub use listeners::{ClickListeners, ListenerId};
pub use overlay::{LabelOverlay, RenderHandle, RenderableOverlay, TextAlign};
pub use vehicle::{ResolutionState, ResolutionTicket, SpriteId, SpriteOptions, VehicleSprite};
