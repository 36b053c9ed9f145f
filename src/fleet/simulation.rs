use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use super::options::{OptionField, OptionValue};
use crate::config::defaults::*;
use crate::config::{AreaConfig, FleetConfig};
use crate::errors::ResolveResult;
use crate::image_cache::{ImageResolver, Resolution, ResolverStats};
use crate::map::{Geofence, LatLng, MapService, Size};
use crate::sprite::{
    ClickListeners, ListenerId, RenderableOverlay, ResolutionState, ResolutionTicket, SpriteId,
    SpriteOptions, VehicleSprite,
};

/// Outcome of one animation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub moved: usize,
    pub skipped: usize,
    pub replaced: usize,
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub started: usize,
    pub ready: usize,
    pub failed: usize,
    pub discarded: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetStats {
    pub vehicles: usize,
    pub ready: usize,
    pub failed: usize,
    pub cache_entries: usize,
    pub resolver: ResolverStats,
}

/// A fleet of vehicles driving around inside a circular area
pub struct Fleet {
    settings: FleetConfig,
    area: Geofence,
    zoom: u8,
    map: Arc<dyn MapService>,
    resolver: ImageResolver,
    sprites: Vec<VehicleSprite>,
    listeners: ClickListeners,
    rng: fastrand::Rng,
    next_id: u64,
}

impl Fleet {
    /// Build a fleet and spawn its initial vehicles
    ///
    /// Vehicles start unresolved; nothing moves before the first
    /// [`Self::resolve_pending`].
    pub fn new(
        settings: FleetConfig,
        area: &AreaConfig,
        resolver: ImageResolver,
        map: Arc<dyn MapService>,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut fleet = Self {
            area: Geofence::new(LatLng::new(area.centre_lat, area.centre_lng), area.radius_m),
            zoom: area.zoom,
            settings,
            map,
            resolver,
            sprites: Vec::new(),
            listeners: ClickListeners::new(),
            rng,
            next_id: 0,
        };
        fleet.set_vehicle_count(fleet.settings.num_vehicles);
        info!(
            "Fleet of {} vehicles around {} (radius {} m)",
            fleet.sprites.len(),
            fleet.area.centre,
            fleet.area.radius_m
        );
        fleet
    }

    pub fn settings(&self) -> &FleetConfig {
        &self.settings
    }

    pub fn area(&self) -> &Geofence {
        &self.area
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    pub fn sprites(&self) -> &[VehicleSprite] {
        &self.sprites
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&VehicleSprite> {
        self.sprites.iter().find(|sprite| sprite.id() == id)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.settings.refresh_interval)
    }

    /// Metres every vehicle covers per tick
    pub fn step_distance(&self) -> f64 {
        self.settings.vehicle_speed * self.settings.refresh_interval as f64
    }

    /// Display size for vehicles under the current settings
    ///
    /// Automatic sizing picks a size from the zoom level, 48 px at zoom 10.
    pub fn display_size(&self) -> Size {
        if self.settings.automatic_size {
            let index = (i32::from(self.zoom) - 8).clamp(0, VEHICLE_IMAGE_SIZES.len() as i32 - 1);
            Size::from_width(VEHICLE_IMAGE_SIZES[index as usize])
        } else {
            Size::from_width(self.settings.vehicle_image_size)
        }
    }

    /// Add a vehicle at a random place inside the area
    pub fn spawn_vehicle(&mut self) -> SpriteId {
        let sprite = self.build_vehicle();
        let id = sprite.id();
        self.sprites.push(sprite);
        id
    }

    fn build_vehicle(&mut self) -> VehicleSprite {
        self.next_id += 1;
        let id = SpriteId(self.next_id);
        let position = self.area.random_point(self.map.as_ref(), &mut self.rng);
        let heading = self.rng.f64() * 360.0;
        let colour = VEHICLE_STATUSES[self.rng.usize(..VEHICLE_STATUSES.len())];
        let label = VEHICLE_TYPES[self.rng.usize(..VEHICLE_TYPES.len())];

        let mut sprite = VehicleSprite::new(
            id,
            SpriteOptions {
                image: self.settings.vehicle_image.clone(),
                colour: Some(colour.to_string()),
                label: Some(label.to_string()),
                heading,
                position,
                size: self.display_size(),
                show_labels: self.settings.show_labels,
            },
        );
        sprite.on_attach();
        sprite.attach_click_listener(&mut self.listeners);
        sprite.set_position(position, self.map.as_ref());
        trace!("Spawned {} ({} {}) at {}", id, colour, label, position);
        sprite
    }

    /// Grow or shrink the fleet; surplus vehicles are removed from the end
    fn set_vehicle_count(&mut self, count: usize) {
        while self.sprites.len() < count {
            self.spawn_vehicle();
        }
        if self.sprites.len() > count {
            for mut sprite in self.sprites.drain(count..) {
                sprite.remove(&mut self.listeners);
            }
        }
    }

    /// Advance every ready vehicle one step along its heading
    ///
    /// Vehicles still resolving are skipped. A vehicle that leaves the area
    /// is removed and a new one spawned in its slot.
    pub fn tick(&mut self) -> TickReport {
        let distance = self.step_distance();
        let map = Arc::clone(&self.map);
        let mut report = TickReport::default();
        let mut departed = Vec::new();

        for (index, sprite) in self.sprites.iter_mut().enumerate() {
            if !sprite.is_ready() {
                report.skipped += 1;
                continue;
            }
            let next = map.offset_position(sprite.position(), distance, sprite.heading());
            sprite.set_position(next, map.as_ref());
            report.moved += 1;

            if map.distance_between(next, self.area.centre) > self.area.radius_m {
                departed.push(index);
            }
        }

        for index in departed {
            let replacement = self.build_vehicle();
            let mut old = std::mem::replace(&mut self.sprites[index], replacement);
            debug!("{} left the area, replaced", old.id());
            old.remove(&mut self.listeners);
            report.replaced += 1;
        }

        trace!(
            "Tick: {} moved, {} skipped, {} replaced",
            report.moved,
            report.skipped,
            report.replaced
        );
        report
    }

    /// Resolve the images of every vehicle that needs one, concurrently
    ///
    /// Results for vehicles that were removed or changed in the meantime
    /// are dropped.
    pub async fn resolve_pending(&mut self) -> ResolveReport {
        let mut tickets = Vec::new();
        for sprite in self.sprites.iter_mut().filter(|s| s.needs_resolution()) {
            let plan = self
                .resolver
                .plan(sprite.image(), sprite.colour())
                .await;
            if let Some(ticket) = sprite.begin_resolution(plan) {
                tickets.push(ticket);
            }
        }

        let mut report = ResolveReport {
            started: tickets.len(),
            ..ResolveReport::default()
        };
        if tickets.is_empty() {
            return report;
        }

        let resolver = &self.resolver;

        // Fetch the base images first so fetching sprites can move on to tinting
        let (fetching, mut tinting): (Vec<_>, Vec<_>) = tickets.into_iter().partition(|ticket| {
            self.sprites
                .iter()
                .any(|s| s.id() == ticket.sprite() && s.needs_base_fetch(ticket))
        });
        let fetched = join_all(fetching.into_iter().map(|ticket| async move {
            let result = resolver.resolve(&ticket.image, None).await;
            (ticket, result)
        }))
        .await;
        for (ticket, result) in fetched {
            match result {
                Ok(_) => {
                    if let Some(sprite) = self.sprites.iter_mut().find(|s| s.id() == ticket.sprite()) {
                        sprite.base_fetched(&ticket);
                    }
                    tinting.push(ticket);
                }
                Err(e) => apply_outcome(&mut self.sprites, ticket, Err(e), &mut report),
            }
        }

        let outcomes = join_all(tinting.into_iter().map(|ticket| async move {
            let result = resolver
                .resolve(&ticket.image, ticket.colour.as_deref())
                .await;
            (ticket, result)
        }))
        .await;
        for (ticket, result) in outcomes {
            apply_outcome(&mut self.sprites, ticket, result, &mut report);
        }

        debug!(
            "Resolved {} vehicles: {} ready, {} failed, {} discarded",
            report.started, report.ready, report.failed, report.discarded
        );
        report
    }

    /// Apply one value from the options form
    ///
    /// Returns whether the value was recognised and applied. Unknown fields,
    /// mistyped or out-of-range values are ignored.
    pub fn apply_option(&mut self, field_id: &str, value: OptionValue) -> bool {
        let Some(field) = OptionField::from_id(field_id) else {
            debug!("Ignoring unknown option '{}'", field_id);
            return false;
        };

        let applied = match field {
            OptionField::NumVehicles => match value.as_count() {
                Some(n) if (1..=MAX_NUM_VEHICLES as u64).contains(&n) => {
                    self.settings.num_vehicles = n as usize;
                    self.set_vehicle_count(n as usize);
                    true
                }
                _ => false,
            },
            OptionField::VehicleImage => match value.as_text() {
                Some(image) if !image.trim().is_empty() => {
                    self.settings.vehicle_image = image.to_string();
                    for sprite in &mut self.sprites {
                        sprite.set_image(image);
                    }
                    true
                }
                _ => false,
            },
            OptionField::VehicleImageSize => match value.as_count() {
                // The size selector is disabled while sizing is automatic
                Some(_) if self.settings.automatic_size => false,
                Some(size) if VEHICLE_IMAGE_SIZES.iter().any(|s| u64::from(*s) == size) => {
                    self.settings.vehicle_image_size = size as u32;
                    self.resize_vehicles();
                    true
                }
                _ => false,
            },
            OptionField::AutomaticSize => match value.as_bool() {
                Some(automatic) => {
                    self.settings.automatic_size = automatic;
                    self.resize_vehicles();
                    true
                }
                None => false,
            },
            OptionField::ShowLabels => match value.as_bool() {
                Some(show) => {
                    self.settings.show_labels = show;
                    for sprite in &mut self.sprites {
                        sprite.set_show_labels(show);
                    }
                    true
                }
                None => false,
            },
            OptionField::VehicleSpeed => match value.as_number() {
                Some(speed) if (MIN_VEHICLE_SPEED..=MAX_VEHICLE_SPEED).contains(&speed) => {
                    self.settings.vehicle_speed = speed;
                    true
                }
                _ => false,
            },
            OptionField::RefreshInterval => match value.as_count() {
                Some(ms) if (MIN_REFRESH_INTERVAL_MS..=MAX_REFRESH_INTERVAL_MS).contains(&ms) => {
                    self.settings.refresh_interval = ms;
                    true
                }
                _ => false,
            },
        };

        if applied {
            info!("Option {} = {}", field, value);
        } else {
            debug!("Ignoring option {} = {}", field, value);
        }
        applied
    }

    /// Re-apply every field's default, in form order
    ///
    /// Automatic sizing is reset after the size selector, so a reset while
    /// automatic sizing is on leaves the previous fixed size in place.
    pub fn reset_defaults(&mut self) {
        for field in OptionField::ALL {
            self.apply_option(field.id(), field.default_value());
        }
    }

    fn resize_vehicles(&mut self) {
        let size = self.display_size();
        for sprite in &mut self.sprites {
            sprite.set_size(size);
        }
    }

    /// Move the area, as when the centre marker is dragged or the map clicked
    pub fn set_area_centre(&mut self, centre: LatLng) {
        debug!("Area centre {} -> {}", self.area.centre, centre);
        self.area.centre = centre;
    }

    /// Deliver a click on a listener registration
    pub fn click(&mut self, listener: ListenerId) -> bool {
        match self.listeners.target(listener) {
            Some(id) => self.handle_sprite_click(id),
            None => false,
        }
    }

    /// Cycle a vehicle to the next status colour
    pub fn handle_sprite_click(&mut self, id: SpriteId) -> bool {
        let Some(sprite) = self.sprites.iter_mut().find(|s| s.id() == id) else {
            return false;
        };
        let next = match sprite
            .colour()
            .and_then(|current| VEHICLE_STATUSES.iter().position(|c| *c == current))
        {
            Some(index) => VEHICLE_STATUSES[(index + 1) % VEHICLE_STATUSES.len()],
            None => VEHICLE_STATUSES[0],
        };
        sprite.set_colour(next)
    }

    pub async fn stats(&self) -> FleetStats {
        FleetStats {
            vehicles: self.sprites.len(),
            ready: self.sprites.iter().filter(|s| s.is_ready()).count(),
            failed: self
                .sprites
                .iter()
                .filter(|s| s.state() == ResolutionState::Failed)
                .count(),
            cache_entries: self.resolver.cache().len().await,
            resolver: self.resolver.stats(),
        }
    }

    /// Animate until `ticks` ticks ran (if given) or `shutdown` completes
    ///
    /// Each tick resolves pending images, then moves the vehicles. A change
    /// of refresh interval applies from the next tick. Returns the number
    /// of ticks run.
    pub async fn run<F>(&mut self, ticks: Option<u64>, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut period = self.refresh_interval();
        let mut timer = tick_timer(period);
        let mut completed = 0;

        info!("Starting animation loop every {:?}", period);
        loop {
            if ticks.is_some_and(|limit| completed >= limit) {
                break;
            }
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping animation loop");
                    break;
                }
                _ = timer.tick() => {
                    self.resolve_pending().await;
                    self.tick();
                    completed += 1;
                }
            }

            let current = self.refresh_interval();
            if current != period {
                debug!("Refresh interval {:?} -> {:?}", period, current);
                period = current;
                timer = tick_timer(period);
                // The first tick of a new interval fires immediately
                timer.tick().await;
            }
        }
        completed
    }
}

fn apply_outcome(
    sprites: &mut [VehicleSprite],
    ticket: ResolutionTicket,
    result: ResolveResult<Resolution>,
    report: &mut ResolveReport,
) {
    let Some(sprite) = sprites.iter_mut().find(|s| s.id() == ticket.sprite()) else {
        report.discarded += 1;
        return;
    };
    if !sprite.complete_resolution(ticket, result) {
        report.discarded += 1;
    } else if sprite.state() == ResolutionState::Ready {
        report.ready += 1;
    } else {
        report.failed += 1;
    }
}

fn tick_timer(period: Duration) -> Interval {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}
