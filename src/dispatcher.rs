// Rate-limited fan-out of itinerary requests to the pricing provider
// One task per request, launched from a single controller at a fixed minimum
// spacing, with results drained from a channel sized to the request count.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use thiserror::Error;
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::models::ItineraryResult;
use crate::provider::{self, ProviderError, ProviderRequest, Transport};
use crate::response_cache::{cache_key, ResponseCache};
use crate::trip_spec::ItineraryRequest;

pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 5.0;

/// Slowest accepted pacing: one launch per day.
pub const MAX_LAUNCH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Invalid request rate: {0} per second")]
    InvalidRate(f64),

    #[error("Fatal provider error: {0}")]
    Fatal(#[from] ProviderError),
}

/// Run flags threaded through every dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub dry_run: bool,
    pub cache_enabled: bool,
    pub requests_per_second: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            cache_enabled: true,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl DispatchConfig {
    /// Minimum spacing between two task launches. The spacing must be non-zero
    /// and at most `MAX_LAUNCH_INTERVAL`.
    pub fn launch_interval(&self) -> Result<Duration, DispatchError> {
        let rate = self.requests_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DispatchError::InvalidRate(rate));
        }
        Duration::try_from_secs_f64(1.0 / rate)
            .ok()
            .filter(|spacing| !spacing.is_zero() && *spacing <= MAX_LAUNCH_INTERVAL)
            .ok_or(DispatchError::InvalidRate(rate))
    }
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    pub requests_launched: AtomicUsize,
    pub requests_succeeded: AtomicUsize,
    pub requests_failed: AtomicUsize,
    pub network_calls: AtomicUsize,
    pub cache_hits: AtomicUsize,
    pub cache_writes: AtomicUsize,
}

type TaskOutcome = Result<ItineraryResult, ProviderError>;

// Everything one task needs, cloned per launch
#[derive(Clone)]
struct RequestTask {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    stats: Arc<DispatchStats>,
    dry_run: bool,
    cache_enabled: bool,
}

impl RequestTask {
    // Per-request failures end here as a failed result. Only fatal errors escape.
    async fn run(&self, request: ItineraryRequest) -> TaskOutcome {
        let wire = provider::encode(&request);

        if self.dry_run {
            let body = serde_json::to_string(&wire).unwrap_or_default();
            info!(%body, "Dry run, would have sent request");
            return Ok(ItineraryResult::failed());
        }

        match self.fetch(&wire).await {
            Ok(result) => {
                self.stats.requests_succeeded.fetch_add(1, Ordering::SeqCst);
                Ok(result)
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(
                    origin = %request.outbound.origin,
                    destination = %request.outbound.destination,
                    date = %request.outbound.date,
                    "Request failed: {err}"
                );
                self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
                Ok(ItineraryResult::failed())
            }
        }
    }

    async fn fetch(&self, wire: &ProviderRequest) -> TaskOutcome {
        let key = cache_key(wire);

        if self.cache_enabled {
            if let Some(cached) = self.cache.get(key).await {
                debug!(key, "Cache hit");
                self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
                let response = provider::parse_response(&cached)?;
                return provider::decode(&response);
            }
            debug!(key, "Cache miss");
        }

        self.stats.network_calls.fetch_add(1, Ordering::SeqCst);
        let raw = self.transport.send(wire).await?;
        let response = provider::parse_response(&raw)?;

        // Only clean responses are worth keeping
        if self.cache_enabled {
            match self.cache.put(key, raw).await {
                Ok(()) => {
                    debug!(key, "Cached response");
                    self.stats.cache_writes.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => warn!(key, "Could not cache response: {e}"),
            }
        }

        provider::decode(&response)
    }
}

pub struct RateLimitedDispatcher {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    stats: Arc<DispatchStats>,
}

impl RateLimitedDispatcher {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            transport,
            cache,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Prices every request and returns exactly one result per request, in
    /// completion order.
    ///
    /// Launches follow input order and are spaced by the configured rate. The
    /// controller never waits on a task before launching the next one. A fatal
    /// provider error is reported only after every task has finished, and no
    /// results are returned with it.
    pub async fn dispatch(
        &self,
        requests: Vec<ItineraryRequest>,
        config: &DispatchConfig,
    ) -> Result<Vec<ItineraryResult>, DispatchError> {
        let total = requests.len();
        if total == 0 {
            return Ok(vec![]);
        }

        let spacing = config.launch_interval()?;
        let task = RequestTask {
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            stats: self.stats.clone(),
            dry_run: config.dry_run,
            cache_enabled: config.cache_enabled && !config.dry_run,
        };

        let (tx, mut rx) = mpsc::channel::<TaskOutcome>(total);
        let mut limiter = time::interval(spacing);
        limiter.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for request in requests {
            limiter.tick().await;

            let task = task.clone();
            let tx = tx.clone();
            self.stats.requests_launched.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let outcome = task.run(request).await;
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        let mut fatal: Option<ProviderError> = None;

        for received in 1..=total {
            match rx.recv().await {
                Some(Ok(result)) => results.push(result),
                Some(Err(err)) => {
                    error!("Fatal provider error: {err}");
                    fatal.get_or_insert(err);
                }
                None => {
                    // Every sender is gone, so the remaining tasks died without reporting
                    error!(received, total, "Request tasks ended without a result");
                    results.resize(total, ItineraryResult::failed());
                    break;
                }
            }
            info!(received, total, "Received {received} out of {total} responses");
        }

        match fatal {
            Some(err) => Err(DispatchError::Fatal(err)),
            None => Ok(results),
        }
    }
}

// Stand-in for the pricing provider
#[cfg(test)]
pub(crate) mod mock_transport {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicU8;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone, Copy)]
    pub enum ServerMode {
        Normal,
        CompleteOutage,
    }

    pub struct MockTransport {
        mode: AtomicU8,
        request_count: AtomicUsize,
        fail_next_requests: AtomicUsize,
        delay_ms: AtomicUsize,
        response: Mutex<Bytes>,
        sent_at: Mutex<Vec<Instant>>,
    }

    impl MockTransport {
        pub fn new(response: &str) -> Self {
            Self {
                mode: AtomicU8::new(0),
                request_count: AtomicUsize::new(0),
                fail_next_requests: AtomicUsize::new(0),
                delay_ms: AtomicUsize::new(0),
                response: Mutex::new(Bytes::from(response.to_string())),
                sent_at: Mutex::new(Vec::new()),
            }
        }

        pub fn set_mode(&self, mode: ServerMode) {
            let mode_value = match mode {
                ServerMode::Normal => 0,
                ServerMode::CompleteOutage => 1,
            };
            self.mode.store(mode_value, Ordering::SeqCst);
        }

        pub fn set_delay(&self, delay_ms: usize) {
            self.delay_ms.store(delay_ms, Ordering::SeqCst);
        }

        pub fn fail_next_requests(&self, count: usize) {
            self.fail_next_requests.store(count, Ordering::SeqCst);
        }

        pub fn request_count(&self) -> usize {
            self.request_count.load(Ordering::SeqCst)
        }

        pub async fn sent_at(&self) -> Vec<Instant> {
            self.sent_at.lock().await.clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, _request: &ProviderRequest) -> Result<Bytes, ProviderError> {
            self.request_count.fetch_add(1, Ordering::SeqCst);
            self.sent_at.lock().await.push(Instant::now());

            if self.mode.load(Ordering::SeqCst) == 1 {
                return Err(ProviderError::Transport("Service unavailable".to_string()));
            }

            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                time::sleep(Duration::from_millis(delay as u64)).await;
            }

            let failing = self
                .fail_next_requests
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if failing.is_ok() {
                return Err(ProviderError::Transport("Connection reset".to_string()));
            }

            Ok(self.response.lock().await.clone())
        }
    }
}
