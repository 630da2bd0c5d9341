//! Request interception, expiry sweeping and warm-up over injected stores
//!
//! The manager is host independent: the embedding runtime calls
//! [`CacheManager::on_activate`] once at startup and
//! [`CacheManager::on_request`] for every outgoing request.

use super::policy::FreshnessPolicy;
use super::store::{ContentStore, MetadataRecord, MetadataStore, Payload};
use crate::config::CacheConfig;
use crate::origin::{FetchError, Origin};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a served payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Cached and within TTL; no network call was made
    Fresh,
    /// Fetched from origin and written to the cache
    Network,
    /// Expired cache entry served because the origin fetch failed
    Stale,
    /// Fetched from origin but rejected by the success predicate, so not cached
    Uncached,
}

/// A payload handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub payload: Payload,
    pub source: CacheSource,
}

/// Outcome of offering a request to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// The identifier is not whitelisted; the caller should handle it untouched
    PassThrough,
    /// The cache answered the request
    Served(Served),
}

impl Interception {
    /// Returns the served payload, if the request was intercepted
    pub fn served(self) -> Option<Served> {
        match self {
            Interception::PassThrough => None,
            Interception::Served(served) => Some(served),
        }
    }
}

/// Summary of one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Content entries examined
    pub scanned: usize,
    /// Expired entries whose content was deleted
    pub removed: usize,
    /// Leftovers of interrupted writes that the store cleaned up
    pub purged: usize,
    /// Individual deletions that failed
    pub failed: usize,
}

/// Freshness of one whitelisted identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    pub identifier: String,
    /// Body size of the cached entry, if one is present
    pub size: Option<usize>,
    /// When the entry was last fetched, if a record exists
    pub cached_at: Option<DateTime<Utc>>,
    /// Whether the entry would be refetched on the next request
    pub expired: bool,
}

impl EntryStatus {
    pub fn is_cached(&self) -> bool {
        self.size.is_some()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.cached_at.map(|cached_at| now - cached_at)
    }
}

/// Cache manager for whitelisted static assets
///
/// Fresh entries are served without touching the network. Stale or missing
/// entries are refetched; if the fetch fails with a transport error, a stale
/// entry is served instead of failing the request.
#[derive(Clone)]
pub struct CacheManager {
    config: CacheConfig,
    policy: FreshnessPolicy,
    content: Arc<dyn ContentStore>,
    metadata: Arc<dyn MetadataStore>,
    origin: Arc<dyn Origin>,
}

impl CacheManager {
    pub fn new(
        config: CacheConfig,
        content: Arc<dyn ContentStore>,
        metadata: Arc<dyn MetadataStore>,
        origin: Arc<dyn Origin>,
    ) -> Self {
        Self {
            policy: config.freshness_policy(),
            config,
            content,
            metadata,
            origin,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_whitelisted(&self, identifier: &str) -> bool {
        self.config.whitelist.iter().any(|url| url == identifier)
    }

    /// Whether `identifier` has no fetch record or one older than the TTL.
    /// Metadata that cannot be read counts as missing.
    pub async fn is_expired(&self, identifier: &str, now: DateTime<Utc>) -> bool {
        let record = self.read_metadata(identifier).await;
        self.policy.is_expired(record.as_ref(), now)
    }

    /// Activation hook: sweeps expired entries before requests are served
    pub async fn on_activate(&self, now: DateTime<Utc>) -> SweepReport {
        self.sweep(now).await
    }

    /// Deletes every cached entry whose metadata is missing or expired
    ///
    /// Works on a snapshot of the keys taken at the start. Failures are logged
    /// and never stop the sweep.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let keys = match self.content.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list cached entries, skipping sweep");
                return report;
            }
        };

        for identifier in keys {
            report.scanned += 1;
            if !self.is_expired(&identifier, now).await {
                continue;
            }

            match self.content.delete(&identifier).await {
                Ok(true) => report.removed += 1,
                Ok(false) => debug!(identifier = %identifier, "Expired entry already gone"),
                Err(e) => {
                    report.failed += 1;
                    warn!(identifier = %identifier, error = %e, "Failed to delete expired entry");
                }
            }
            if let Err(e) = self.metadata.delete(&identifier).await {
                report.failed += 1;
                warn!(identifier = %identifier, error = %e, "Failed to delete expired metadata");
            }
        }

        match self.content.purge_incomplete().await {
            Ok(purged) => report.purged = purged,
            Err(e) => {
                report.failed += 1;
                warn!(error = %e, "Failed to purge incomplete entries");
            }
        }

        info!(
            scanned = report.scanned,
            removed = report.removed,
            purged = report.purged,
            failed = report.failed,
            "Expiry sweep finished"
        );
        report
    }

    /// Request hook using the current wall-clock time
    pub async fn on_request(&self, identifier: &str) -> Result<Interception, FetchError> {
        self.on_request_at(identifier, Utc::now()).await
    }

    /// Serves `identifier` from cache or origin as of `now`
    ///
    /// # Behavior
    /// - Not whitelisted: `PassThrough`, no store or network access
    /// - Cached and fresh: returns the cached payload
    /// - Missing or expired: fetches from origin and caches the response
    /// - On fetch failure: returns the expired entry if there is one,
    ///   otherwise the fetch error
    pub async fn on_request_at(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Interception, FetchError> {
        if !self.is_whitelisted(identifier) {
            debug!(identifier, "Not whitelisted, passing through");
            return Ok(Interception::PassThrough);
        }

        let cached = match self.content.get(identifier).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(identifier, error = %e, "Failed to read cached entry, treating as absent");
                None
            }
        };

        if let Some(payload) = cached.as_ref() {
            if !self.is_expired(identifier, now).await {
                debug!(identifier, "Cache hit");
                return Ok(served(payload.clone(), CacheSource::Fresh));
            }
        }

        match self.fetch_from_origin(identifier).await {
            Ok(payload) => {
                if !(self.config.is_successful)(&payload) {
                    warn!(identifier, status = payload.status, "Origin response rejected, not caching");
                    return Ok(served(payload, CacheSource::Uncached));
                }
                self.store(identifier, &payload, now).await;
                Ok(served(payload, CacheSource::Network))
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(identifier, error = %e, "Origin fetch failed, serving stale entry");
                    Ok(served(stale, CacheSource::Stale))
                }
                None => Err(e),
            },
        }
    }

    /// Requests every whitelisted identifier concurrently
    pub async fn warm(&self, now: DateTime<Utc>) -> Vec<(String, Result<CacheSource, FetchError>)> {
        let requests = self.config.whitelist.iter().map(|identifier| async move {
            let result = self
                .on_request_at(identifier, now)
                .await
                .map(|interception| match interception {
                    Interception::Served(served) => served.source,
                    // Every identifier here comes from the whitelist.
                    Interception::PassThrough => CacheSource::Uncached,
                });
            (identifier.clone(), result)
        });
        futures::future::join_all(requests).await
    }

    /// Reports the cache state of every whitelisted identifier
    pub async fn status(&self, now: DateTime<Utc>) -> Vec<EntryStatus> {
        let mut statuses = Vec::with_capacity(self.config.whitelist.len());
        for identifier in &self.config.whitelist {
            let size = match self.content.get(identifier).await {
                Ok(cached) => cached.map(|payload| payload.body.len()),
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Failed to read cached entry");
                    None
                }
            };
            let record = self.read_metadata(identifier).await;
            statuses.push(EntryStatus {
                identifier: identifier.clone(),
                size,
                cached_at: record.map(|record| record.cached_at),
                expired: size.is_none() || self.policy.is_expired(record.as_ref(), now),
            });
        }
        statuses
    }

    async fn fetch_from_origin(&self, identifier: &str) -> Result<Payload, FetchError> {
        let timeout = self.config.fetch_timeout;
        tokio::time::timeout(timeout, self.origin.fetch(identifier))
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
    }

    /// Writes the entry, then its metadata. A failed entry write leaves the
    /// old metadata alone so a stale body is never marked fresh.
    async fn store(&self, identifier: &str, payload: &Payload, now: DateTime<Utc>) {
        if let Err(e) = self.content.put(identifier, payload.clone()).await {
            warn!(identifier, error = %e, "Failed to cache fetched entry");
            return;
        }
        if let Err(e) = self
            .metadata
            .put(identifier, MetadataRecord::new(now))
            .await
        {
            warn!(identifier, error = %e, "Cached entry has no metadata; it will be swept");
        }
    }

    async fn read_metadata(&self, identifier: &str) -> Option<MetadataRecord> {
        match self.metadata.get(identifier).await {
            Ok(record) => record,
            Err(e) => {
                warn!(identifier, error = %e, "Failed to read metadata, treating as expired");
                None
            }
        }
    }
}

fn served(payload: Payload, source: CacheSource) -> Interception {
    Interception::Served(Served { payload, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryContentStore, MemoryMetadataStore, StoreError};
    use crate::config::accept_success_status;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const WASM: &str = "https://cdn.example.com/build/game.wasm";
    const DATA: &str = "https://cdn.example.com/build/game.data";

    enum Reply {
        Body(Payload),
        Fail,
        Hang,
    }

    /// Origin returning a fixed reply and counting calls
    struct StubOrigin {
        reply: Mutex<Reply>,
        calls: AtomicUsize,
    }

    impl StubOrigin {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(reply),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Origin for StubOrigin {
        async fn fetch(&self, _identifier: &str) -> Result<Payload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = {
                let reply = self.reply.lock().unwrap();
                match &*reply {
                    Reply::Body(payload) => Some(Ok(payload.clone())),
                    Reply::Fail => Some(Err(FetchError::Unavailable("offline".to_string()))),
                    Reply::Hang => None,
                }
            };
            match outcome {
                Some(result) => result,
                None => {
                    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                    Err(FetchError::Unavailable("hung".to_string()))
                }
            }
        }
    }

    /// Content store whose writes and deletes always fail
    #[derive(Default)]
    struct BrokenContentStore {
        inner: MemoryContentStore,
    }

    #[async_trait]
    impl ContentStore for BrokenContentStore {
        async fn get(&self, identifier: &str) -> Result<Option<Payload>, StoreError> {
            self.inner.get(identifier).await
        }

        async fn put(&self, _identifier: &str, _payload: Payload) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }

        async fn delete(&self, _identifier: &str) -> Result<bool, StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.inner.keys().await
        }
    }

    /// Content store whose reads and listing always fail
    #[derive(Default)]
    struct UnreadableContentStore {
        inner: MemoryContentStore,
    }

    #[async_trait]
    impl ContentStore for UnreadableContentStore {
        async fn get(&self, _identifier: &str) -> Result<Option<Payload>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("bad sector")))
        }

        async fn put(&self, identifier: &str, payload: Payload) -> Result<(), StoreError> {
            self.inner.put(identifier, payload).await
        }

        async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
            self.inner.delete(identifier).await
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("permission denied")))
        }
    }

    /// Content store listing one identifier it does not hold
    #[derive(Default)]
    struct GhostKeyContentStore {
        inner: MemoryContentStore,
    }

    #[async_trait]
    impl ContentStore for GhostKeyContentStore {
        async fn get(&self, identifier: &str) -> Result<Option<Payload>, StoreError> {
            self.inner.get(identifier).await
        }

        async fn put(&self, identifier: &str, payload: Payload) -> Result<(), StoreError> {
            self.inner.put(identifier, payload).await
        }

        async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
            self.inner.delete(identifier).await
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            let mut keys = self.inner.keys().await?;
            keys.push(DATA.to_string());
            Ok(keys)
        }
    }

    /// Metadata store that can be told to fail reads or writes
    #[derive(Default)]
    struct FlakyMetadataStore {
        inner: MemoryMetadataStore,
        fail_reads: bool,
        fail_writes: bool,
    }

    #[async_trait]
    impl MetadataStore for FlakyMetadataStore {
        async fn get(&self, identifier: &str) -> Result<Option<MetadataRecord>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Io(std::io::Error::other("bad sector")));
            }
            self.inner.get(identifier).await
        }

        async fn put(&self, identifier: &str, record: MetadataRecord) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.put(identifier, record).await
        }

        async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
            self.inner.delete(identifier).await
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.inner.keys().await
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    fn test_config() -> CacheConfig {
        CacheConfig {
            whitelist: vec![WASM.to_string(), DATA.to_string()],
            fetch_timeout: std::time::Duration::from_millis(100),
            ..CacheConfig::default()
        }
    }

    fn create_manager(
        content: Arc<dyn ContentStore>,
        metadata: Arc<dyn MetadataStore>,
        origin: Arc<StubOrigin>,
    ) -> CacheManager {
        CacheManager::new(test_config(), content, metadata, origin)
    }

    #[tokio::test]
    async fn test_origin_timeout_falls_back_to_stale() {
        let content = Arc::new(MemoryContentStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        content.put(WASM, Payload::ok("old")).await.unwrap();
        metadata
            .put(WASM, MetadataRecord::new(now() - Duration::days(30)))
            .await
            .unwrap();
        let origin = StubOrigin::new(Reply::Hang);
        let manager = create_manager(content, metadata, origin.clone());

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Stale);
        assert_eq!(served.payload, Payload::ok("old"));
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_origin_timeout_without_cache_is_timeout_error() {
        let origin = StubOrigin::new(Reply::Hang);
        let manager = create_manager(
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryMetadataStore::new()),
            origin,
        );

        let result = manager.on_request_at(WASM, now()).await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_store_write_failure_still_returns_payload() {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let origin = StubOrigin::new(Reply::Body(Payload::ok("new")));
        let manager = create_manager(
            Arc::new(BrokenContentStore::default()),
            metadata.clone(),
            origin,
        );

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Network);
        assert_eq!(served.payload, Payload::ok("new"));
        // The entry write failed, so no metadata may claim it is fresh.
        assert!(metadata.get(WASM).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_continues_past_deletion_failures() {
        let content = Arc::new(BrokenContentStore::default());
        content.inner.put(WASM, Payload::ok("a")).await.unwrap();
        content.inner.put(DATA, Payload::ok("b")).await.unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        let manager = create_manager(content, metadata, StubOrigin::new(Reply::Fail));

        let report = manager.on_activate(now()).await;
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 0);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn test_metadata_read_error_counts_as_expired() {
        let content = Arc::new(MemoryContentStore::new());
        content.put(WASM, Payload::ok("old")).await.unwrap();
        let metadata = FlakyMetadataStore {
            fail_reads: true,
            ..FlakyMetadataStore::default()
        };
        metadata.inner.put(WASM, MetadataRecord::new(now())).await.unwrap();
        let origin = StubOrigin::new(Reply::Body(Payload::ok("new")));
        let manager = create_manager(content, Arc::new(metadata), origin.clone());

        assert!(manager.is_expired(WASM, now()).await);
        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Network);
        assert_eq!(served.payload, Payload::ok("new"));
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_content_read_error_counts_as_absent() {
        let content = Arc::new(UnreadableContentStore::default());
        content.inner.put(WASM, Payload::ok("old")).await.unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        metadata.put(WASM, MetadataRecord::new(now())).await.unwrap();
        let origin = StubOrigin::new(Reply::Body(Payload::ok("new")));
        let manager = create_manager(content, metadata, origin.clone());

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Network);
        assert_eq!(served.payload, Payload::ok("new"));
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_content_read_error_offline_has_no_stale_copy() {
        let content = Arc::new(UnreadableContentStore::default());
        content.inner.put(WASM, Payload::ok("old")).await.unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        metadata
            .put(WASM, MetadataRecord::new(now() - Duration::days(30)))
            .await
            .unwrap();
        let manager = create_manager(content, metadata, StubOrigin::new(Reply::Fail));

        let result = manager.on_request_at(WASM, now()).await;
        assert!(matches!(result, Err(FetchError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_sweep_without_key_listing_removes_nothing() {
        let content = Arc::new(UnreadableContentStore::default());
        content.inner.put(WASM, Payload::ok("a")).await.unwrap();
        let manager = create_manager(
            content.clone(),
            Arc::new(MemoryMetadataStore::new()),
            StubOrigin::new(Reply::Fail),
        );

        let report = manager.on_activate(now()).await;
        assert_eq!(report, SweepReport::default());
        assert_eq!(content.inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_metadata_write_failure_leaves_orphan_for_next_sweep() {
        let content = Arc::new(MemoryContentStore::new());
        let metadata = Arc::new(FlakyMetadataStore {
            fail_writes: true,
            ..FlakyMetadataStore::default()
        });
        let origin = StubOrigin::new(Reply::Body(Payload::ok("new")));
        let manager = create_manager(content.clone(), metadata.clone(), origin);

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Network);
        assert_eq!(served.payload, Payload::ok("new"));
        assert_eq!(content.get(WASM).await.unwrap(), Some(Payload::ok("new")));
        assert!(metadata.inner.get(WASM).await.unwrap().is_none());

        let report = manager.on_activate(now()).await;
        assert_eq!(report.scanned, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed, 0);
        assert!(content.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_counts_only_entries_it_removed() {
        let content = Arc::new(GhostKeyContentStore::default());
        content.inner.put(WASM, Payload::ok("a")).await.unwrap();
        let manager = create_manager(
            content.clone(),
            Arc::new(MemoryMetadataStore::new()),
            StubOrigin::new(Reply::Fail),
        );

        let report = manager.on_activate(now()).await;
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed, 0);
        assert!(content.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejected_response_is_returned_but_not_cached() {
        let content = Arc::new(MemoryContentStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let not_found = Payload {
            status: 404,
            ..Payload::ok("not found")
        };
        let origin = StubOrigin::new(Reply::Body(not_found.clone()));
        let config = CacheConfig {
            is_successful: accept_success_status(),
            ..test_config()
        };
        let manager = CacheManager::new(config, content.clone(), metadata.clone(), origin);

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Uncached);
        assert_eq!(served.payload, not_found);
        assert!(content.is_empty().await);
        assert!(metadata.get(WASM).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_default_predicate_caches_error_status() {
        let content = Arc::new(MemoryContentStore::new());
        let not_found = Payload {
            status: 404,
            ..Payload::ok("not found")
        };
        let manager = create_manager(
            content.clone(),
            Arc::new(MemoryMetadataStore::new()),
            StubOrigin::new(Reply::Body(not_found.clone())),
        );

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Network);
        assert_eq!(content.get(WASM).await.unwrap(), Some(not_found));
    }

    #[tokio::test]
    async fn test_entry_without_metadata_is_refetched() {
        let content = Arc::new(MemoryContentStore::new());
        content.put(WASM, Payload::ok("orphan")).await.unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        let origin = StubOrigin::new(Reply::Body(Payload::ok("new")));
        let manager = create_manager(content.clone(), metadata.clone(), origin.clone());

        let served = manager.on_request_at(WASM, now()).await.unwrap().served().unwrap();
        assert_eq!(served.source, CacheSource::Network);
        assert_eq!(origin.calls(), 1);
        assert_eq!(
            metadata.get(WASM).await.unwrap(),
            Some(MetadataRecord::new(now()))
        );
    }

    #[tokio::test]
    async fn test_warm_fetches_every_whitelisted_identifier() {
        let content = Arc::new(MemoryContentStore::new());
        let origin = StubOrigin::new(Reply::Body(Payload::ok("asset")));
        let manager = create_manager(
            content.clone(),
            Arc::new(MemoryMetadataStore::new()),
            origin.clone(),
        );

        let results = manager.warm(now()).await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|(_, result)| matches!(result, Ok(CacheSource::Network))));
        assert_eq!(origin.calls(), 2);
        assert_eq!(content.len().await, 2);

        // A second warm-up is served entirely from cache.
        let results = manager.warm(now()).await;
        assert!(results
            .iter()
            .all(|(_, result)| matches!(result, Ok(CacheSource::Fresh))));
        assert_eq!(origin.calls(), 2);
    }

    #[tokio::test]
    async fn test_warm_reports_failures_per_identifier() {
        let manager = create_manager(
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryMetadataStore::new()),
            StubOrigin::new(Reply::Fail),
        );

        let results = manager.warm(now()).await;
        assert_eq!(results[0].0, WASM);
        assert_eq!(results[1].0, DATA);
        assert!(results.iter().all(|(_, result)| result.is_err()));
    }

    #[tokio::test]
    async fn test_status_reports_freshness() {
        let content = Arc::new(MemoryContentStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        content.put(WASM, Payload::ok("12345")).await.unwrap();
        metadata
            .put(WASM, MetadataRecord::new(now() - Duration::days(1)))
            .await
            .unwrap();
        let manager = create_manager(content, metadata, StubOrigin::new(Reply::Fail));

        let statuses = manager.status(now()).await;
        assert_eq!(statuses.len(), 2);

        let wasm = &statuses[0];
        assert!(wasm.is_cached());
        assert_eq!(wasm.size, Some(5));
        assert!(!wasm.expired);
        assert_eq!(wasm.age(now()), Some(Duration::days(1)));

        let data = &statuses[1];
        assert!(!data.is_cached());
        assert!(data.expired);
        assert_eq!(data.age(now()), None);
    }

    #[tokio::test]
    async fn test_is_expired_uses_metadata_store() {
        let metadata = Arc::new(MemoryMetadataStore::new());
        metadata
            .put(WASM, MetadataRecord::new(now()))
            .await
            .unwrap();
        let manager = create_manager(
            Arc::new(MemoryContentStore::new()),
            metadata,
            StubOrigin::new(Reply::Fail),
        );

        assert!(!manager.is_expired(WASM, now()).await);
        assert!(manager.is_expired(WASM, now() + Duration::days(15)).await);
        assert!(manager.is_expired(DATA, now()).await);
    }
}
