//! Resolution of displayable vehicle images
//!
//! Resolving `(image, colour)` ends in one of three ways:
//!
//! 1. the variant is cached: a copy is returned, nothing else happens
//! 2. only the base image is cached: a copy is tinted, stored and returned
//! 3. nothing is cached: the base image is fetched and stored, then step 2
//!
//! Concurrent requests for the same key are joined onto one in-flight job,
//! so a fleet of a thousand red trucks fetches and tints exactly once. Every
//! waiter receives its own copy of the result.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::key::{tint_colour, CacheKey};
use super::service::ImageCache;
use crate::config::defaults::DEFAULT_COLOURABLE_REGION;
use crate::errors::{ResolveError, ResolveResult};
use crate::fetch::ImageFetcher;
use crate::svg::XmlDocument;

type InFlight = Shared<BoxFuture<'static, ResolveResult<XmlDocument>>>;

/// What a resolution will have to do, judged from the cache alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPlan {
    /// The exact variant is cached
    CacheHit,
    /// The base image is cached and needs tinting
    TintFromBase,
    /// Nothing is cached; the base image must be fetched first
    FetchAndTint,
}

/// A resolved, ready-to-display document
#[derive(Debug, Clone)]
pub struct Resolution {
    pub key: CacheKey,
    pub document: XmlDocument,
    pub plan: ResolutionPlan,
}

/// Point-in-time resolver counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: u64,
    pub fetches: u64,
    pub tints: u64,
    pub coalesced: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    fetches: AtomicU64,
    tints: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

/// Image resolver bound to one shared cache and one fetch collaborator
#[derive(Clone)]
pub struct ImageResolver {
    cache: ImageCache,
    fetcher: Arc<dyn ImageFetcher>,
    regions: Arc<[String]>,
    in_flight: Arc<Mutex<HashMap<CacheKey, InFlight>>>,
    counters: Arc<Counters>,
}

impl ImageResolver {
    pub fn new(cache: ImageCache, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            cache,
            fetcher,
            regions: Arc::from(vec![DEFAULT_COLOURABLE_REGION.to_string()]),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Replace the selectors of the colourable region
    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = Arc::from(regions);
        self
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            tints: self.counters.tints.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Decide which resolution path `(image, colour)` would take right now
    pub async fn plan(&self, image: &str, colour: Option<&str>) -> ResolutionPlan {
        if self.cache.has(&CacheKey::new(image, colour)).await {
            ResolutionPlan::CacheHit
        } else if self.cache.has(&CacheKey::base(image)).await {
            ResolutionPlan::TintFromBase
        } else {
            ResolutionPlan::FetchAndTint
        }
    }

    /// Obtain a displayable copy of `image` tinted with `colour`
    ///
    /// With no colour the untinted base image is returned.
    /// A blank colour counts as no colour.
    pub async fn resolve(&self, image: &str, colour: Option<&str>) -> ResolveResult<Resolution> {
        let colour = tint_colour(colour);
        let key = CacheKey::new(image, colour);
        let plan = self.plan(image, colour).await;

        if plan == ResolutionPlan::CacheHit {
            let document = self.cache.load(&key).await?;
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!("Image cache hit: {}", key);
            return Ok(Resolution {
                key,
                document,
                plan,
            });
        }

        debug!("Image cache miss: {} ({:?})", key, plan);

        // The base image is already joined on its own key by `base_document`
        let Some(colour) = colour else {
            let document = self.base_document(image).await.map_err(|e| {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Image resolution failed for {}: {}", key, e);
                e
            })?;
            return Ok(Resolution {
                key,
                document,
                plan,
            });
        };

        let job = {
            let this = self.clone();
            let image = image.to_string();
            let colour = colour.to_string();
            async move { this.build(&image, &colour).await }.boxed()
        };

        let document = self.join(key.clone(), job).await.map_err(|e| {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!("Image resolution failed for {}: {}", key, e);
            e
        })?;

        Ok(Resolution {
            key,
            document,
            plan,
        })
    }

    async fn build(&self, image: &str, colour: &str) -> ResolveResult<XmlDocument> {
        let mut document = self.base_document(image).await?;
        if !self.tint(&mut document, colour) {
            return Err(ResolveError::image_malformed(image, &self.regions));
        }
        self.counters.tints.fetch_add(1, Ordering::Relaxed);
        debug!("Tinted {} with {}", image, colour);

        Ok(self.cache.save(&CacheKey::variant(image, colour), &document).await?)
    }

    async fn base_document(&self, image: &str) -> ResolveResult<XmlDocument> {
        let key = CacheKey::base(image);
        if self.cache.has(&key).await {
            return Ok(self.cache.load(&key).await?);
        }

        let job = {
            let this = self.clone();
            let image = image.to_string();
            async move { this.fetch_base(&image).await }.boxed()
        };
        self.join(key, job).await
    }

    async fn fetch_base(&self, image: &str) -> ResolveResult<XmlDocument> {
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        info!("Fetching base image: {}", image);

        let document = self
            .fetcher
            .fetch(image)
            .await
            .map_err(|e| ResolveError::fetch_failed(image, e))?;

        Ok(self.cache.save(&CacheKey::base(image), &document).await?)
    }

    /// Fill every colourable region present; false if none exists
    fn tint(&self, document: &mut XmlDocument, colour: &str) -> bool {
        let mut tinted = false;
        for region in self.regions.iter() {
            tinted |= document.set_fill(region, colour);
        }
        tinted
    }

    /// Run `job` for `key`, or wait on the job already running for it
    ///
    /// A finished job removes itself from the in-flight table after its
    /// result reached the cache, so a later caller either finds the job or
    /// finds the cached document.
    async fn join(
        &self,
        key: CacheKey,
        job: BoxFuture<'static, ResolveResult<XmlDocument>>,
    ) -> ResolveResult<XmlDocument> {
        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&key) {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!("Joining in-flight resolution: {}", key);
                existing.clone()
            } else if self.cache.has(&key).await {
                return Ok(self.cache.load(&key).await?);
            } else {
                let table = Arc::clone(&self.in_flight);
                let owned_key = key.clone();
                let flight = async move {
                    let result = job.await;
                    table.lock().await.remove(&owned_key);
                    result
                }
                .boxed()
                .shared();
                in_flight.insert(key, flight.clone());
                flight
            }
        };
        flight.await
    }
}
