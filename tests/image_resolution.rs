use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use svg_fleet::{
    errors::{CacheError, FetchError, FetchResult, ResolveError},
    fetch::{EmbeddedImageFetcher, ImageFetcher},
    image_cache::{CacheKey, ImageCache, ImageResolver, ResolutionPlan},
    svg::XmlDocument,
};

const TRUCK: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 640 480">
  <g id="chassis">
    <path id="car-body" style="fill:#ffffff;stroke:#000000" d="M10 10h620v460H10z"/>
  </g>
</svg>"##;

// Canned documents with a request counter and an optional delay
struct MockFetcher {
    images: HashMap<&'static str, &'static str>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockFetcher {
    fn new(delay: Option<Duration>) -> Self {
        let mut images = HashMap::new();
        images.insert("truck.svg", TRUCK);
        images.insert("broken.svg", "<svg><path id=\"car-body\">");
        Self {
            images,
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, image: &str) -> FetchResult<XmlDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.images.get(image) {
            Some(text) => XmlDocument::parse(text),
            None => Err(FetchError::not_found(image)),
        }
    }
}

fn resolver_with(fetcher: Arc<MockFetcher>) -> ImageResolver {
    ImageResolver::new(ImageCache::new(), fetcher)
}

#[tokio::test]
async fn test_cold_cache_fetches_stores_and_tints() {
    let fetcher = Arc::new(MockFetcher::new(None));
    let resolver = resolver_with(fetcher.clone());

    let resolution = resolver.resolve("truck.svg", Some("red")).await.unwrap();

    assert_eq!(resolution.plan, ResolutionPlan::FetchAndTint);
    assert_eq!(resolution.key.as_str(), "truck.svgred");
    assert_eq!(fetcher.calls(), 1);

    let cache = resolver.cache();
    assert!(cache.has(&CacheKey::base("truck.svg")).await);
    assert!(cache.has(&CacheKey::variant("truck.svg", "red")).await);

    let base = cache.load(&CacheKey::base("truck.svg")).await.unwrap();
    assert_eq!(
        base.select("#car-body").unwrap().style_property("fill").as_deref(),
        Some("#ffffff")
    );
    let body = resolution.document.select("#car-body").unwrap();
    assert_eq!(body.style_property("fill").as_deref(), Some("red"));
    assert_eq!(body.style_property("stroke").as_deref(), Some("#000000"));
}

#[tokio::test]
async fn test_warm_variant_needs_no_fetch() {
    let fetcher = Arc::new(MockFetcher::new(None));
    let resolver = resolver_with(fetcher.clone());
    let tinted = XmlDocument::parse(TRUCK).unwrap();
    resolver
        .cache()
        .save(&CacheKey::variant("truck.svg", "red"), &tinted)
        .await
        .unwrap();

    let resolution = resolver.resolve("truck.svg", Some("red")).await.unwrap();

    assert_eq!(resolution.plan, ResolutionPlan::CacheHit);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(resolver.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_second_colour_tints_from_cached_base() {
    let fetcher = Arc::new(MockFetcher::new(None));
    let resolver = resolver_with(fetcher.clone());
    resolver.resolve("truck.svg", Some("red")).await.unwrap();

    let blue = resolver.resolve("truck.svg", Some("blue")).await.unwrap();

    assert_eq!(blue.plan, ResolutionPlan::TintFromBase);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(resolver.cache().len().await, 3);
}

#[tokio::test]
async fn test_two_resolutions_are_independent_copies() {
    let fetcher = Arc::new(MockFetcher::new(None));
    let resolver = resolver_with(fetcher);

    let mut first = resolver.resolve("truck.svg", Some("green")).await.unwrap();
    let second = resolver.resolve("truck.svg", Some("green")).await.unwrap();
    assert_eq!(first.document, second.document);

    first.document.set_fill("#car-body", "purple");
    assert_ne!(first.document, second.document);

    let third = resolver.resolve("truck.svg", Some("green")).await.unwrap();
    assert_eq!(third.document, second.document);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() {
    let fetcher = Arc::new(MockFetcher::new(Some(Duration::from_millis(20))));
    let resolver = resolver_with(fetcher.clone());

    let jobs: Vec<_> = (0..16)
        .map(|i| {
            let resolver = resolver.clone();
            let colour = if i % 2 == 0 { "red" } else { "black" };
            tokio::spawn(async move { resolver.resolve("truck.svg", Some(colour)).await })
        })
        .collect();

    for job in jobs {
        assert!(job.await.unwrap().is_ok());
    }

    let stats = resolver.stats();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.tints, 2);
}

#[tokio::test]
async fn test_fetch_failure_is_reported_and_not_cached() {
    let fetcher = Arc::new(MockFetcher::new(None));
    let resolver = resolver_with(fetcher.clone());

    let err = resolver.resolve("ghost.svg", Some("red")).await.unwrap_err();
    assert!(matches!(err, ResolveError::FetchFailed { .. }));
    assert!(resolver.cache().is_empty().await);

    let err = resolver.resolve("broken.svg", Some("red")).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::FetchFailed {
            source: FetchError::Parse { .. },
            ..
        }
    ));
    assert_eq!(resolver.stats().failures, 2);
}

#[tokio::test]
async fn test_missing_region_is_malformed() {
    let resolver = ImageResolver::new(ImageCache::new(), Arc::new(MockFetcher::new(None)))
        .with_regions(vec!["#roof".to_string()]);

    let err = resolver.resolve("truck.svg", Some("red")).await.unwrap_err();

    assert!(matches!(err, ResolveError::ImageMalformed { .. }));
    assert!(resolver.cache().has(&CacheKey::base("truck.svg")).await);
    assert!(!resolver.cache().has(&CacheKey::variant("truck.svg", "red")).await);
}

#[tokio::test]
async fn test_cache_rejects_non_svg_documents() {
    let cache = ImageCache::new();
    let html = XmlDocument::parse("<html><body/></html>").unwrap();
    let key = CacheKey::base("page.html");

    let err = cache.save(&key, &html).await.unwrap_err();

    assert!(matches!(err, CacheError::InvalidDocument { .. }));
    assert!(!cache.has(&key).await);
    assert_eq!(
        cache.load(&key).await.unwrap_err(),
        CacheError::key_not_found("page.html")
    );
}

#[tokio::test]
async fn test_embedded_images_resolve_in_every_status_colour() {
    let resolver = ImageResolver::new(ImageCache::new(), Arc::new(EmbeddedImageFetcher));
    for colour in svg_fleet::config::defaults::VEHICLE_STATUSES {
        let resolution = resolver
            .resolve("simple-truck.svg", Some(colour))
            .await
            .unwrap();
        assert_eq!(
            resolution
                .document
                .select("#car-body")
                .and_then(|body| body.style_property("fill"))
                .as_deref(),
            Some(colour)
        );
    }
    assert_eq!(resolver.stats().fetches, 1);
}
