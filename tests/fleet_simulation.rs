use std::sync::Arc;
use std::time::Duration;

use svg_fleet::{
    config::Config,
    fetch::EmbeddedImageFetcher,
    fleet::{Fleet, OptionValue},
    image_cache::{ImageCache, ImageResolver},
    map::{LatLng, MapService, SphericalMap},
    sprite::ResolutionState,
};

fn seeded_fleet(num_vehicles: usize) -> Fleet {
    let mut config = Config::default();
    config.fleet.num_vehicles = num_vehicles;
    config.fleet.seed = Some(2024);
    let resolver = ImageResolver::new(ImageCache::new(), Arc::new(EmbeddedImageFetcher));
    Fleet::new(
        config.fleet,
        &config.area,
        resolver,
        Arc::new(SphericalMap::new(config.area.zoom)),
    )
}

#[tokio::test]
async fn test_seeded_fleets_are_reproducible() {
    let a = seeded_fleet(20);
    let b = seeded_fleet(20);
    let positions = |fleet: &Fleet| -> Vec<LatLng> {
        fleet.sprites().iter().map(|s| s.position()).collect()
    };
    assert_eq!(positions(&a), positions(&b));
}

#[tokio::test]
async fn test_vehicles_stay_inside_area_over_many_ticks() {
    let mut fleet = seeded_fleet(60);
    fleet.apply_option("vehicle-speed", OptionValue::Number(5.0));
    fleet.apply_option("refresh-interval", OptionValue::Number(60_000.0));
    let map = SphericalMap::new(10);

    let mut replaced = 0;
    for _ in 0..10 {
        fleet.resolve_pending().await;
        replaced += fleet.tick().replaced;
        for sprite in fleet.sprites() {
            assert!(map.distance_between(sprite.position(), fleet.area().centre) <= fleet.area().radius_m);
        }
    }

    // 300 km per tick inside a 100 km radius: everything leaves
    assert!(replaced >= 60);
    assert_eq!(fleet.len(), 60);
}

#[tokio::test]
async fn test_shared_cache_serves_the_whole_fleet() {
    let mut fleet = seeded_fleet(200);
    let report = fleet.resolve_pending().await;
    assert_eq!(report.ready, 200);

    let stats = fleet.stats().await;
    assert_eq!(stats.resolver.fetches, 1);
    // Base image plus at most one variant per status colour
    assert!(stats.cache_entries <= 8);
    assert!(stats.resolver.tints <= 7);
}

#[tokio::test]
async fn test_clicked_vehicle_changes_colour_and_keeps_moving() {
    let mut fleet = seeded_fleet(3);
    fleet.resolve_pending().await;
    let id = fleet.sprites()[0].id();
    let before = fleet.sprite(id).unwrap().colour().map(str::to_string);

    assert!(fleet.handle_sprite_click(id));
    let sprite = fleet.sprite(id).unwrap();
    assert_ne!(sprite.colour().map(str::to_string), before);
    assert_eq!(sprite.state(), ResolutionState::Unresolved);
    assert!(sprite.is_ready());

    fleet.resolve_pending().await;
    let markup = fleet
        .sprite(id)
        .unwrap()
        .handle()
        .and_then(|h| h.markup.clone())
        .unwrap();
    let colour = fleet.sprite(id).unwrap().colour().unwrap().to_string();
    assert!(markup.contains(&format!("fill:{colour}")));
}

#[tokio::test]
async fn test_hidden_labels_keep_their_text() {
    let mut fleet = seeded_fleet(5);
    assert!(fleet.apply_option("show-labels", OptionValue::parse("checkbox", "false")));

    for sprite in fleet.sprites() {
        let label = sprite.handle().and_then(|h| h.label.clone()).unwrap();
        assert!(!label.visible);
        assert_eq!(Some(label.text.as_str()), sprite.label());
    }
}

#[tokio::test]
async fn test_moving_the_area_respawns_inside_new_area() {
    let mut fleet = seeded_fleet(10);
    fleet.resolve_pending().await;
    let paris = LatLng::new(48.8566, 2.3522);

    fleet.set_area_centre(paris);
    let report = fleet.tick();

    assert_eq!(report.replaced, 10);
    let map = SphericalMap::new(10);
    for sprite in fleet.sprites() {
        assert!(map.distance_between(sprite.position(), paris) < 100_000.0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_picks_up_new_refresh_interval() {
    let mut fleet = seeded_fleet(4);
    fleet.apply_option("refresh-interval", OptionValue::Number(100.0));

    let ran = fleet
        .run(None, tokio::time::sleep(Duration::from_millis(1050)))
        .await;

    assert_eq!(ran, 11);
    assert!(fleet.sprites().iter().all(|s| s.is_ready()));
}
