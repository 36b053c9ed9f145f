use std::fmt;
use tracing::{debug, warn};

use super::listeners::{ClickListeners, ListenerId};
use super::overlay::{body_rotation, LabelOverlay, RenderHandle, RenderableOverlay};
use crate::errors::ResolveResult;
use crate::image_cache::{tint_colour, ImageResolver, Resolution, ResolutionPlan};
use crate::map::{LatLng, MapService, ScreenPoint, Size};
use crate::svg::XmlDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u64);

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle-{}", self.0)
    }
}

/// Progress of a sprite towards a displayable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Fetching,
    Tinting,
    Ready,
    /// Resolution failed; stays here until the image or colour changes
    Failed,
}

/// Proof of a started resolution, handed back on completion
///
/// A ticket is only honoured if the sprite is still live and neither its
/// image nor its colour changed since the ticket was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTicket {
    sprite: SpriteId,
    generation: u64,
    pub image: String,
    pub colour: Option<String>,
}

impl ResolutionTicket {
    pub fn sprite(&self) -> SpriteId {
        self.sprite
    }
}

#[derive(Debug, Clone)]
pub struct SpriteOptions {
    pub image: String,
    pub colour: Option<String>,
    pub label: Option<String>,
    pub heading: f64,
    pub position: LatLng,
    pub size: Size,
    pub show_labels: bool,
}

#[derive(Debug)]
pub struct VehicleSprite {
    id: SpriteId,
    image: String,
    colour: Option<String>,
    label: Option<String>,
    heading: f64,
    position: LatLng,
    size: Size,
    show_labels: bool,
    state: ResolutionState,
    generation: u64,
    pending: Option<u64>,
    document: Option<XmlDocument>,
    handle: Option<RenderHandle>,
    listener: Option<ListenerId>,
    ready: bool,
    removed: bool,
}

impl VehicleSprite {
    pub fn new(id: SpriteId, options: SpriteOptions) -> Self {
        Self {
            id,
            image: options.image,
            colour: options.colour,
            label: options.label,
            heading: options.heading,
            position: options.position,
            size: options.size,
            show_labels: options.show_labels,
            state: ResolutionState::Unresolved,
            generation: 0,
            pending: None,
            document: None,
            handle: None,
            listener: None,
            ready: false,
            removed: false,
        }
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn colour(&self) -> Option<&str> {
        self.colour.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// True once a resolved image has been attached to the render handle
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn handle(&self) -> Option<&RenderHandle> {
        self.handle.as_ref()
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    /// Anchor is always the display centre
    pub fn anchor(&self) -> ScreenPoint {
        self.size.centre()
    }

    pub fn set_position(&mut self, position: LatLng, map: &dyn MapService) {
        self.position = position;
        if self.handle.is_some() {
            self.redraw(map.project(position));
        }
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = heading;
        if let Some(handle) = self.handle.as_mut() {
            handle.rotation = body_rotation(heading);
        }
        self.refresh_label();
    }

    /// Resize the body and label together
    ///
    /// The stored screen placement is shifted so the display centre stays put.
    pub fn set_size(&mut self, size: Size) {
        if size == self.size {
            return;
        }
        let old_anchor = self.anchor();
        self.size = size;
        let new_anchor = self.anchor();

        if let Some(handle) = self.handle.as_mut() {
            handle.size = size;
            handle.left += old_anchor.x - new_anchor.x;
            handle.top += old_anchor.y - new_anchor.y;
        }
        self.refresh_label();
        self.embed();
    }

    pub fn set_label(&mut self, label: Option<&str>) {
        self.label = label.map(str::to_string);
        self.refresh_label();
    }

    pub fn set_show_labels(&mut self, show: bool) {
        self.show_labels = show;
        self.refresh_label();
    }

    /// Change the body colour
    ///
    /// Returns `false` without touching anything when the colour is
    /// unchanged or blank; otherwise the sprite goes back to `Unresolved`.
    pub fn set_colour(&mut self, colour: &str) -> bool {
        if self.colour.as_deref() == Some(colour) {
            return false;
        }
        if tint_colour(Some(colour)).is_none() {
            debug!("{} ignoring blank colour", self.id);
            return false;
        }
        debug!("{} colour {:?} -> {}", self.id, self.colour, colour);
        self.colour = Some(colour.to_string());
        self.invalidate();
        self.refresh_label();
        true
    }

    /// Change the base image; same contract as [`Self::set_colour`]
    pub fn set_image(&mut self, image: &str) -> bool {
        if self.image == image {
            return false;
        }
        debug!("{} image {} -> {}", self.id, self.image, image);
        self.image = image.to_string();
        self.invalidate();
        true
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.state = ResolutionState::Unresolved;
    }

    /// Whether a resolution should be started for this sprite
    pub fn needs_resolution(&self) -> bool {
        !self.removed && self.state == ResolutionState::Unresolved && self.pending.is_none()
    }

    /// Start a resolution following `plan`
    ///
    /// Returns `None` if the sprite is removed, already resolving, or has
    /// nothing to resolve.
    pub fn begin_resolution(&mut self, plan: ResolutionPlan) -> Option<ResolutionTicket> {
        if !self.needs_resolution() {
            return None;
        }
        // A fetch is followed by a tint; see `base_fetched`
        self.state = match plan {
            ResolutionPlan::CacheHit => ResolutionState::Unresolved,
            ResolutionPlan::TintFromBase => ResolutionState::Tinting,
            ResolutionPlan::FetchAndTint => ResolutionState::Fetching,
        };
        self.pending = Some(self.generation);
        debug!("{} resolving {} ({:?})", self.id, self.image, plan);

        Some(ResolutionTicket {
            sprite: self.id,
            generation: self.generation,
            image: self.image.clone(),
            colour: tint_colour(self.colour.as_deref()).map(str::to_string),
        })
    }

    /// Whether `ticket` still needs a tint after its base image is fetched
    pub fn needs_base_fetch(&self, ticket: &ResolutionTicket) -> bool {
        self.is_current(ticket)
            && self.state == ResolutionState::Fetching
            && ticket.colour.is_some()
    }

    /// Record that the base image of a fetching resolution has arrived
    ///
    /// Moves `Fetching` on to `Tinting`. Returns `false` for a stale ticket
    /// or a resolution that is not fetching.
    pub fn base_fetched(&mut self, ticket: &ResolutionTicket) -> bool {
        if !self.needs_base_fetch(ticket) {
            return false;
        }
        self.state = ResolutionState::Tinting;
        debug!("{} tinting {}", self.id, self.image);
        true
    }

    fn is_current(&self, ticket: &ResolutionTicket) -> bool {
        !self.removed && ticket.sprite == self.id && ticket.generation == self.generation
    }

    /// Apply the outcome of a resolution
    ///
    /// Returns `false` when the result was discarded because the sprite was
    /// removed or changed since `ticket` was issued.
    pub fn complete_resolution(
        &mut self,
        ticket: ResolutionTicket,
        result: ResolveResult<Resolution>,
    ) -> bool {
        if !self.is_current(&ticket) {
            debug!("{} dropping stale resolution of {}", self.id, ticket.image);
            return false;
        }
        self.pending = None;

        match result {
            Ok(resolution) => {
                self.document = Some(resolution.document);
                self.state = ResolutionState::Ready;
                self.embed();
            }
            Err(e) => {
                warn!("{} failed to resolve image: {}", self.id, e);
                self.state = ResolutionState::Failed;
            }
        }
        true
    }

    /// Resolve the current image and colour
    ///
    /// A sprite whose base image is not cached yet moves through `Fetching`
    /// and `Tinting` before it is `Ready`.
    pub async fn resolve(&mut self, resolver: &ImageResolver) -> ResolutionState {
        let plan = resolver.plan(&self.image, self.colour.as_deref()).await;
        if let Some(ticket) = self.begin_resolution(plan) {
            if self.needs_base_fetch(&ticket) {
                if let Err(e) = resolver.resolve(&ticket.image, None).await {
                    self.complete_resolution(ticket, Err(e));
                    return self.state;
                }
                self.base_fetched(&ticket);
            }
            let result = resolver
                .resolve(&ticket.image, ticket.colour.as_deref())
                .await;
            self.complete_resolution(ticket, result);
        }
        self.state
    }

    /// Register for clicks; a sprite holds at most one registration
    pub fn attach_click_listener(&mut self, listeners: &mut ClickListeners) -> Option<ListenerId> {
        if self.removed {
            return None;
        }
        if self.listener.is_none() {
            self.listener = Some(listeners.register(self.id));
        }
        self.listener
    }

    /// Take the sprite off the map for good
    ///
    /// Detaches the render handle, releases the click listener and drops
    /// readiness. Calling it again does nothing.
    pub fn remove(&mut self, listeners: &mut ClickListeners) {
        if self.removed {
            return;
        }
        self.on_detach();
        if let Some(listener) = self.listener.take() {
            listeners.release(listener);
        }
        self.ready = false;
        self.pending = None;
        self.removed = true;
        debug!("{} removed", self.id);
    }

    /// Write the resolved document into the render handle at display size
    fn embed(&mut self) {
        let (Some(document), Some(handle)) = (self.document.as_mut(), self.handle.as_mut()) else {
            return;
        };
        document.set_dimensions(self.size.width, self.size.height);
        handle.markup = Some(document.to_xml_string());
        self.ready = true;
    }

    fn refresh_label(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        handle.label = self.label.as_deref().map(|text| {
            LabelOverlay::for_vehicle(
                text,
                self.colour.as_deref().unwrap_or_default(),
                self.heading,
                self.size,
                self.show_labels,
            )
        });
    }
}

impl RenderableOverlay for VehicleSprite {
    fn on_attach(&mut self) {
        if self.removed || self.handle.is_some() {
            return;
        }
        self.handle = Some(RenderHandle::new(self.size, self.heading));
        self.refresh_label();
        self.embed();
    }

    fn on_detach(&mut self) {
        self.handle = None;
    }

    fn redraw(&mut self, screen_point: Option<ScreenPoint>) {
        let anchor = self.anchor();
        if let (Some(handle), Some(point)) = (self.handle.as_mut(), screen_point) {
            handle.left = point.x - anchor.x;
            handle.top = point.y - anchor.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FetchError, FetchResult};
    use crate::fetch::ImageFetcher;
    use crate::image_cache::{CacheKey, ImageCache};
    use crate::map::SphericalMap;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TRUCK: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 640 480"><path id="car-body" style="fill:#000000" d="M0 0h640v480H0z"/></svg>"#;

    #[derive(Default)]
    struct TruckFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageFetcher for TruckFetcher {
        async fn fetch(&self, image: &str) -> FetchResult<XmlDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match image {
                "truck.svg" => XmlDocument::parse(TRUCK),
                _ => Err(FetchError::not_found(image)),
            }
        }
    }

    fn resolver() -> (ImageResolver, Arc<TruckFetcher>) {
        let fetcher = Arc::new(TruckFetcher::default());
        (ImageResolver::new(ImageCache::new(), fetcher.clone()), fetcher)
    }

    fn sprite(image: &str) -> VehicleSprite {
        let mut sprite = VehicleSprite::new(
            SpriteId(1),
            SpriteOptions {
                image: image.to_string(),
                colour: Some("red".to_string()),
                label: Some("GT".to_string()),
                heading: 90.0,
                position: LatLng::new(51.502, -0.117),
                size: Size::new(48, 36),
                show_labels: true,
            },
        );
        sprite.on_attach();
        sprite
    }

    #[tokio::test]
    async fn test_resolve_fetches_tints_and_embeds() {
        let (resolver, fetcher) = resolver();
        let mut sprite = sprite("truck.svg");
        assert!(!sprite.is_ready());

        assert_eq!(sprite.resolve(&resolver).await, ResolutionState::Ready);
        assert!(sprite.is_ready());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(resolver.cache().has(&CacheKey::base("truck.svg")).await);
        assert!(resolver.cache().has(&CacheKey::variant("truck.svg", "red")).await);

        let markup = sprite.handle().unwrap().markup.clone().unwrap();
        assert!(markup.contains("fill:red"));
        assert!(markup.contains(r#"width="48""#));
        assert!(markup.contains(r#"height="36""#));
    }

    #[tokio::test]
    async fn test_failed_fetch_never_becomes_ready() {
        let (resolver, _) = resolver();
        let mut sprite = sprite("missing.svg");

        assert_eq!(sprite.resolve(&resolver).await, ResolutionState::Failed);
        assert!(!sprite.is_ready());
        assert!(!sprite.needs_resolution());

        // No automatic retry
        assert_eq!(sprite.resolve(&resolver).await, ResolutionState::Failed);
    }

    #[tokio::test]
    async fn test_same_colour_is_noop() {
        let (resolver, fetcher) = resolver();
        let mut sprite = sprite("truck.svg");
        sprite.resolve(&resolver).await;
        let before = sprite.handle().cloned();

        assert!(!sprite.set_colour("red"));
        assert_eq!(sprite.state(), ResolutionState::Ready);
        assert_eq!(sprite.handle().cloned(), before);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.stats().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_colour_change_re_resolves_from_base() {
        let (resolver, fetcher) = resolver();
        let mut sprite = sprite("truck.svg");
        sprite.resolve(&resolver).await;

        assert!(sprite.set_colour("yellow"));
        assert_eq!(sprite.state(), ResolutionState::Unresolved);
        // Still displayed with the previous image meanwhile
        assert!(sprite.is_ready());
        assert_eq!(sprite.handle().unwrap().label.as_ref().unwrap().colour, "black");

        assert_eq!(sprite.resolve(&resolver).await, ResolutionState::Ready);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(sprite.handle().unwrap().markup.as_ref().unwrap().contains("fill:yellow"));
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let (resolver, _) = resolver();
        let mut sprite = sprite("truck.svg");

        let ticket = sprite.begin_resolution(ResolutionPlan::FetchAndTint).unwrap();
        assert_eq!(sprite.state(), ResolutionState::Fetching);
        assert!(sprite.begin_resolution(ResolutionPlan::FetchAndTint).is_none());

        let result = resolver.resolve(&ticket.image, ticket.colour.as_deref()).await;
        sprite.set_colour("blue");
        assert!(!sprite.complete_resolution(ticket, result));
        assert!(!sprite.is_ready());
        assert_eq!(sprite.state(), ResolutionState::Unresolved);
    }

    #[tokio::test]
    async fn test_removed_sprite_ignores_completion() {
        let (resolver, _) = resolver();
        let mut listeners = ClickListeners::new();
        let mut sprite = sprite("truck.svg");
        sprite.attach_click_listener(&mut listeners);

        let ticket = sprite.begin_resolution(ResolutionPlan::FetchAndTint).unwrap();
        sprite.remove(&mut listeners);
        let result = resolver.resolve(&ticket.image, ticket.colour.as_deref()).await;

        assert!(!sprite.complete_resolution(ticket, result));
        assert!(sprite.handle().is_none());
        assert!(!sprite.is_ready());
    }

    #[tokio::test]
    async fn test_fetch_path_passes_through_tinting() {
        let (resolver, fetcher) = resolver();
        let mut sprite = sprite("truck.svg");

        let plan = resolver.plan("truck.svg", Some("red")).await;
        let ticket = sprite.begin_resolution(plan).unwrap();
        assert_eq!(sprite.state(), ResolutionState::Fetching);
        assert!(sprite.needs_base_fetch(&ticket));

        resolver.resolve(&ticket.image, None).await.unwrap();
        assert!(sprite.base_fetched(&ticket));
        assert_eq!(sprite.state(), ResolutionState::Tinting);
        assert!(!sprite.base_fetched(&ticket));

        let result = resolver.resolve(&ticket.image, ticket.colour.as_deref()).await;
        assert!(sprite.complete_resolution(ticket, result));
        assert_eq!(sprite.state(), ResolutionState::Ready);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.stats().tints, 1);
    }

    #[tokio::test]
    async fn test_stale_ticket_does_not_advance_to_tinting() {
        let mut sprite = sprite("truck.svg");
        let ticket = sprite.begin_resolution(ResolutionPlan::FetchAndTint).unwrap();
        sprite.set_colour("green");

        assert!(!sprite.base_fetched(&ticket));
        assert_eq!(sprite.state(), ResolutionState::Unresolved);
    }

    #[tokio::test]
    async fn test_blank_colour_is_rejected() {
        let (resolver, _) = resolver();
        let mut sprite = sprite("truck.svg");
        sprite.resolve(&resolver).await;

        assert!(!sprite.set_colour(""));
        assert!(!sprite.set_colour("   "));
        assert_eq!(sprite.colour(), Some("red"));
        assert_eq!(sprite.state(), ResolutionState::Ready);

        let state = tokio::time::timeout(std::time::Duration::from_secs(3), sprite.resolve(&resolver))
            .await
            .unwrap();
        assert_eq!(state, ResolutionState::Ready);
    }

    #[tokio::test]
    async fn test_blank_initial_colour_resolves_untinted() {
        let (resolver, _) = resolver();
        let mut sprite = VehicleSprite::new(
            SpriteId(2),
            SpriteOptions {
                image: "truck.svg".to_string(),
                colour: Some(String::new()),
                label: None,
                heading: 0.0,
                position: LatLng::new(51.502, -0.117),
                size: Size::new(48, 36),
                show_labels: true,
            },
        );
        sprite.on_attach();

        let state = tokio::time::timeout(std::time::Duration::from_secs(3), sprite.resolve(&resolver))
            .await
            .unwrap();

        assert_eq!(state, ResolutionState::Ready);
        let markup = sprite.handle().unwrap().markup.clone().unwrap();
        assert!(markup.contains("fill:#000000"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut listeners = ClickListeners::new();
        let mut sprite = sprite("truck.svg");
        let listener = sprite.attach_click_listener(&mut listeners).unwrap();
        assert_eq!(listeners.target(listener), Some(SpriteId(1)));

        sprite.remove(&mut listeners);
        sprite.remove(&mut listeners);

        assert!(sprite.is_removed());
        assert!(sprite.handle().is_none());
        assert!(sprite.listener().is_none());
        assert!(listeners.is_empty());
        assert!(sprite.attach_click_listener(&mut listeners).is_none());
    }

    #[test]
    fn test_position_is_projected_around_centre() {
        let map = SphericalMap::new(10);
        let mut sprite = sprite("truck.svg");
        let target = LatLng::new(51.6, -0.2);

        sprite.set_position(target, &map);

        let point = map.project(target).unwrap();
        let handle = sprite.handle().unwrap();
        assert!((handle.left - (point.x - 24.0)).abs() < 1e-9);
        assert!((handle.top - (point.y - 18.0)).abs() < 1e-9);
    }

    #[test]
    fn test_unprojectable_position_keeps_placement() {
        let map = SphericalMap::new(10);
        let mut sprite = sprite("truck.svg");
        sprite.set_position(LatLng::new(51.6, -0.2), &map);
        let before = sprite.handle().cloned();

        sprite.set_position(LatLng::new(89.5, 0.0), &map);

        assert_eq!(sprite.position(), LatLng::new(89.5, 0.0));
        assert_eq!(sprite.handle().cloned(), before);
    }

    #[test]
    fn test_position_before_attach_is_stored_only() {
        let map = SphericalMap::new(10);
        let mut sprite = sprite("truck.svg");
        sprite.on_detach();
        sprite.set_position(LatLng::new(51.0, 0.0), &map);
        assert_eq!(sprite.position(), LatLng::new(51.0, 0.0));
        assert!(sprite.handle().is_none());
    }

    #[tokio::test]
    async fn test_set_size_resizes_body_and_label() {
        let (resolver, _) = resolver();
        let map = SphericalMap::new(10);
        let mut sprite = sprite("truck.svg");
        sprite.set_position(LatLng::new(51.6, -0.2), &map);
        sprite.resolve(&resolver).await;
        let centre_before = {
            let h = sprite.handle().unwrap();
            (h.left + 24.0, h.top + 18.0)
        };

        sprite.set_size(Size::new(96, 72));

        let handle = sprite.handle().unwrap();
        assert_eq!(handle.size, Size::new(96, 72));
        assert_eq!(handle.label.as_ref().unwrap().line_height, 72.0);
        assert!(handle.markup.as_ref().unwrap().contains(r#"width="96""#));
        assert!((handle.left + 48.0 - centre_before.0).abs() < 1e-9);
        assert!((handle.top + 36.0 - centre_before.1).abs() < 1e-9);
    }

    #[test]
    fn test_label_follows_heading_and_visibility() {
        let mut sprite = sprite("truck.svg");
        sprite.set_heading(270.0);
        let label = sprite.handle().unwrap().label.clone().unwrap();
        assert!(label.mirrored);
        assert_eq!(label.align, crate::sprite::TextAlign::Right);
        assert_eq!(sprite.handle().unwrap().rotation, 180.0);

        sprite.set_show_labels(false);
        let label = sprite.handle().unwrap().label.clone().unwrap();
        assert!(!label.visible);
        assert_eq!(label.text, "GT");

        sprite.set_label(None);
        assert!(sprite.handle().unwrap().label.is_none());
    }

    #[tokio::test]
    async fn test_resolution_before_attach_embeds_on_attach() {
        let (resolver, _) = resolver();
        let mut sprite = sprite("truck.svg");
        sprite.on_detach();

        assert_eq!(sprite.resolve(&resolver).await, ResolutionState::Ready);
        assert!(!sprite.is_ready());

        sprite.on_attach();
        assert!(sprite.is_ready());
        assert!(sprite.handle().unwrap().markup.is_some());
    }
}
