//! Viewport-driven tile synchronization.
//!
//! The synchronizer owns the resident tile cache. Each call to
//! [`TileSynchronizer::desired_tiles_changed`] starts a new [`Generation`]:
//! undesired tiles are evicted at once, missing tiles are requested in one
//! batched fetch, and any result tagged with an older generation is thrown
//! away on arrival. Results are applied on the caller's thread through
//! [`TileSynchronizer::poll`] or [`TileSynchronizer::settle`], so the cache is
//! only ever mutated in one place.

use crate::data::annotation::{Mutation, TileDataMap};
use crate::prelude::{Arc, Duration, HashSet};
use crate::service::{AnnotationService, TileRequest};
use crate::tiles::{address::TileAddress, address::TileKey, cache::TileDataCache};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Fetch retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Extra attempts after a failed fetch
    pub max_retries: u32,
    /// Delay between attempts
    pub retry_delay_ms: u64,
    /// Per-attempt limit; `None` lets a stalled fetch wait forever
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 25,
            fetch_timeout_ms: Some(30_000),
        }
    }
}

impl SyncConfig {
    pub fn for_testing() -> Self {
        Self {
            max_retries: 0,
            retry_delay_ms: 0,
            fetch_timeout_ms: None,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

/// Monotonic id of a desired-set request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Generation {
        Generation(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a ready callback is told once a generation completes
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub generation: Generation,
    /// Tiles resident after the generation completed
    pub resident: usize,
    /// Desired tiles that could not be fetched
    pub failed: Vec<TileKey>,
}

impl SyncReport {
    /// Some desired tiles are missing from the data set
    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Invoked at most once, when the generation it was registered with completes
pub type ReadyCallback = Box<dyn FnOnce(&SyncReport) + Send>;

#[derive(Debug)]
struct FetchOutcome {
    generation: Generation,
    result: Result<TileDataMap>,
}

/// Keeps the resident tile data in line with the latest desired tile set
pub struct TileSynchronizer<S: AnnotationService> {
    service: Arc<S>,
    config: SyncConfig,
    runtime: Handle,
    cache: TileDataCache,
    desired: HashSet<TileKey>,
    pending: HashSet<TileKey>,
    generation: Generation,
    on_ready: Option<ReadyCallback>,
    result_tx: UnboundedSender<FetchOutcome>,
    result_rx: UnboundedReceiver<FetchOutcome>,
    mutations: Vec<JoinHandle<()>>,
    discarded: usize,
    last_report: Option<SyncReport>,
}

impl<S: AnnotationService> TileSynchronizer<S> {
    /// Creates a synchronizer that spawns onto the current tokio runtime
    pub fn new(service: Arc<S>, config: SyncConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| MapError::Config(format!("tile synchronizer needs a tokio runtime: {}", e)))?;
        Ok(Self::with_handle(service, config, runtime))
    }

    pub fn with_handle(service: Arc<S>, config: SyncConfig, runtime: Handle) -> Self {
        let (result_tx, result_rx) = unbounded_channel();
        Self {
            service,
            config,
            runtime,
            cache: TileDataCache::new(),
            desired: HashSet::default(),
            pending: HashSet::default(),
            generation: Generation::default(),
            on_ready: None,
            result_tx,
            result_rx,
            mutations: Vec::new(),
            discarded: 0,
            last_report: None,
        }
    }

    /// Declares the tiles the current viewport needs.
    ///
    /// Evicts everything else right away, drops the previous generation's
    /// callback uncalled and requests the tiles that are not resident.
    /// `on_ready` runs once they all arrived (or failed); when nothing is
    /// missing it runs before this returns.
    pub fn desired_tiles_changed<I, F>(&mut self, tiles: I, on_ready: F) -> Generation
    where
        I: IntoIterator<Item = TileAddress>,
        F: FnOnce(&SyncReport) + Send + 'static,
    {
        self.generation = self.generation.next();
        let generation = self.generation;

        self.desired = tiles.into_iter().map(|t| t.key()).collect();
        let evicted = self.cache.retain_only(&self.desired);
        if !evicted.is_empty() {
            log::debug!("generation {}: evicted {} tiles", generation, evicted.len());
        }
        if self.on_ready.take().is_some() {
            log::debug!("generation {}: superseded ready callback dropped", generation);
        }

        let mut missing = self.cache.missing(&self.desired);
        missing.sort();
        self.pending = missing.iter().copied().collect();
        self.on_ready = Some(Box::new(on_ready));

        if missing.is_empty() {
            self.complete(Vec::new());
        } else {
            log::info!(
                "generation {}: {} desired, {} resident, fetching {}",
                generation,
                self.desired.len(),
                self.cache.len(),
                missing.len()
            );
            self.spawn_fetch(generation, missing.iter().map(TileKey::address).collect());
        }
        generation
    }

    fn spawn_fetch(&self, generation: Generation, tiles: Vec<TileAddress>) {
        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let result_tx = self.result_tx.clone();
        self.runtime.spawn(async move {
            let result = fetch_with_retry(service.as_ref(), TileRequest::new(tiles), &config).await;
            // The receiver only disappears with the synchronizer itself
            let _ = result_tx.send(FetchOutcome { generation, result });
        });
    }

    /// Applies every fetch result that has already arrived, without blocking.
    /// Returns the report of the generation this completed, if any.
    pub fn poll(&mut self) -> Option<SyncReport> {
        let mut report = None;
        while let Ok(outcome) = self.result_rx.try_recv() {
            if let Some(completed) = self.apply(outcome) {
                report = Some(completed);
            }
        }
        report
    }

    /// Waits until the current generation completes and returns its report
    pub async fn settle(&mut self) -> Option<SyncReport> {
        if let Some(report) = self.poll() {
            return Some(report);
        }
        if self.pending.is_empty() {
            return self.last_report.clone();
        }
        while let Some(outcome) = self.result_rx.recv().await {
            if let Some(report) = self.apply(outcome) {
                return Some(report);
            }
        }
        None
    }

    fn apply(&mut self, outcome: FetchOutcome) -> Option<SyncReport> {
        if outcome.generation != self.generation {
            self.discarded += 1;
            log::debug!(
                "discarding result of superseded generation {} (current {})",
                outcome.generation,
                self.generation
            );
            return None;
        }

        match outcome.result {
            Ok(data) => {
                for (key, bins) in data {
                    if self.pending.remove(&key) {
                        self.cache.insert(key, bins);
                    } else if !self.desired.contains(&key) {
                        log::debug!("ignoring undesired tile {} in fetch result", key);
                    }
                }
                if !self.pending.is_empty() {
                    log::warn!(
                        "generation {}: {} tiles missing from fetch result",
                        self.generation,
                        self.pending.len()
                    );
                }
            }
            Err(e) => {
                log::warn!(
                    "generation {}: fetch of {} tiles failed: {}",
                    self.generation,
                    self.pending.len(),
                    e
                );
            }
        }

        let mut failed: Vec<TileKey> = self.pending.drain().collect();
        failed.sort();
        Some(self.complete(failed))
    }

    fn complete(&mut self, failed: Vec<TileKey>) -> SyncReport {
        let report = SyncReport {
            generation: self.generation,
            resident: self.cache.len(),
            failed,
        };
        log::info!(
            "generation {} ready: {} tiles resident, {} failed",
            report.generation,
            report.resident,
            report.failed.len()
        );
        if let Some(on_ready) = self.on_ready.take() {
            on_ready(&report);
        }
        self.last_report = Some(report.clone());
        report
    }

    /// Snapshot of every resident tile, keyed by tile then bin
    pub fn current_data(&self) -> &TileDataMap {
        self.cache.data()
    }

    /// Sends a create or modify to the service without waiting for it.
    /// Failures are logged; the next fetch of the affected tile is the only
    /// confirmation.
    pub fn submit_mutation(&mut self, mutation: Mutation) {
        let service = Arc::clone(&self.service);
        self.mutations.retain(|handle| !handle.is_finished());
        log::debug!("submitting {} mutation", mutation.kind());
        self.mutations.push(self.runtime.spawn(async move {
            let kind = mutation.kind();
            if let Err(e) = service.submit(mutation).await {
                log::warn!("{} mutation failed: {}", kind, e);
            }
        }));
    }

    /// Waits for every submitted mutation to finish
    pub async fn flush_mutations(&mut self) {
        let handles = std::mem::take(&mut self.mutations);
        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                log::warn!("mutation task did not complete: {}", e);
            }
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn desired(&self) -> &HashSet<TileKey> {
        &self.desired
    }

    /// Tiles the current generation is still waiting for
    pub fn pending(&self) -> &HashSet<TileKey> {
        &self.pending
    }

    /// Fetch results dropped because a newer generation had started
    pub fn discarded_results(&self) -> usize {
        self.discarded
    }

    pub fn last_report(&self) -> Option<&SyncReport> {
        self.last_report.as_ref()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }
}

async fn fetch_with_retry<S: AnnotationService>(
    service: &S,
    request: TileRequest,
    config: &SyncConfig,
) -> Result<TileDataMap> {
    let mut attempt = 0;
    loop {
        let fetch = service.fetch_tiles(request.clone());
        let result = match config.fetch_timeout() {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(result) => result,
                Err(_) => Err(MapError::Service(format!("fetch timed out after {:?}", limit))),
            },
            None => fetch.await,
        };
        match result {
            Ok(data) => return Ok(data),
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                log::warn!(
                    "fetch of {} tiles failed ({}), retry {}/{}",
                    request.len(),
                    e,
                    attempt,
                    config.max_retries
                );
                tokio::time::sleep(config.retry_delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}
