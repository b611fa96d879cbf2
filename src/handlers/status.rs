//! Status and health check handlers for the drs-notify service.
//!
//! - `/health` - Simple health check for load balancers
//! - `/status` - Dispatch counters and latency percentiles
//!
//! # Architecture
//!
//! ```text
//! HTTP Request ──> Axum Router ──> status_handler ──> AppState
//!                                        │                │
//!                                        ▼                ▼
//!                              StatusResponse    LatencyHistogram
//!                                                   + Counters
//! ```
//!
//! # Example Response
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "name": "drs-notify",
//!   "uptime_seconds": 3600,
//!   "dispatch": {
//!     "delivered": 1020,
//!     "non_drs": 3,
//!     "confirmed": 1,
//!     "failed": 4,
//!     "failures_by_code": { "missing_handler": 4 }
//!   },
//!   "latency": { "p50_ms": 0.2, "p95_ms": 0.9, "p99_ms": 1.4, "total_requests": 1028, "mean_ms": 0.3, "max_ms": 210.0 },
//!   "status": "running",
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::sns::DispatchOutcome;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for simple liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Detailed server status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server version (from Cargo.toml)
    pub version: String,

    /// Server name
    pub name: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Dispatch outcome counters
    pub dispatch: DispatchMetrics,

    /// Dispatch latency statistics (percentiles)
    pub latency: LatencyMetrics,

    /// Server status (always "running" if responding)
    pub status: String,

    /// RFC 3339 timestamp of when status was generated
    pub timestamp: String,
}

/// Counts of dispatch outcomes since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMetrics {
    /// Notifications delivered to a typed handler
    pub delivered: u64,
    /// Messages delivered to the non-DRS fallback
    pub non_drs: u64,
    /// Subscriptions confirmed
    pub confirmed: u64,
    /// Errors reported
    pub failed: u64,
    /// Errors broken down by code
    pub failures_by_code: BTreeMap<String, u64>,
}

/// Dispatch latency percentile metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    /// 50th percentile (median) latency in milliseconds
    pub p50_ms: f64,

    /// 95th percentile latency in milliseconds
    pub p95_ms: f64,

    /// 99th percentile latency in milliseconds
    pub p99_ms: f64,

    /// Total number of dispatches recorded
    pub total_requests: u64,

    /// Mean latency in milliseconds
    pub mean_ms: f64,

    /// Maximum latency recorded in milliseconds
    pub max_ms: f64,
}

// ============================================================================
// Latency Histogram
// ============================================================================

/// Thread-safe latency histogram.
///
/// Tracks latencies from 1 microsecond to 60 seconds with 3 significant figures.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    /// Create a new latency histogram.
    pub fn new() -> Self {
        // Track 1us to 60 seconds with 3 significant figures; constant bounds are valid
        let histogram =
            Histogram::new_with_bounds(1, 60_000_000, 3).expect("valid histogram bounds");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record a latency value in microseconds.
    ///
    /// Values outside the histogram bounds are silently ignored.
    pub fn record(&self, latency_us: u64) {
        let mut hist = self.inner.write();
        let _ = hist.record(latency_us.max(1));
    }

    /// Record a latency duration.
    pub fn record_duration(&self, duration: Duration) {
        self.record(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX));
    }

    /// Get the total count of recorded values.
    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Get complete latency metrics, in milliseconds.
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0) as f64 / 1000.0,
            p95_ms: hist.value_at_percentile(95.0) as f64 / 1000.0,
            p99_ms: hist.value_at_percentile(99.0) as f64 / 1000.0,
            total_requests: hist.len(),
            mean_ms: hist.mean() / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Shared counters for the status endpoint.
///
/// All fields are thread-safe and can be updated concurrently.
#[derive(Debug)]
pub struct AppState {
    start_time: Instant,
    delivered: AtomicU64,
    non_drs: AtomicU64,
    confirmed: AtomicU64,
    failed: AtomicU64,
    failures_by_code: RwLock<BTreeMap<&'static str, u64>>,
    latency_histogram: LatencyHistogram,
}

impl AppState {
    /// Create a new AppState; uptime starts now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            delivered: AtomicU64::new(0),
            non_drs: AtomicU64::new(0),
            confirmed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            failures_by_code: RwLock::new(BTreeMap::new()),
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// Get the server uptime in seconds.
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Record the outcome and duration of one dispatch call.
    pub fn record_dispatch(&self, outcome: DispatchOutcome, elapsed: Duration) {
        match outcome {
            DispatchOutcome::Delivered(_) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::NonDrs => {
                self.non_drs.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::Confirmed => {
                self.confirmed.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::Failed(kind) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                *self.failures_by_code.write().entry(kind.code()).or_insert(0) += 1;
            }
        }
        self.latency_histogram.record_duration(elapsed);
    }

    /// Snapshot of the dispatch counters.
    pub fn dispatch_metrics(&self) -> DispatchMetrics {
        DispatchMetrics {
            delivered: self.delivered.load(Ordering::Relaxed),
            non_drs: self.non_drs.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            failures_by_code: self
                .failures_by_code
                .read()
                .iter()
                .map(|(code, count)| (code.to_string(), *count))
                .collect(),
        }
    }

    /// Get the latency metrics.
    #[inline]
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }

    /// Total number of dispatches recorded.
    #[inline]
    pub fn total_dispatches(&self) -> u64 {
        self.latency_histogram.count()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// # Route
/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// Detailed status endpoint handler.
///
/// # Route
/// `GET /status`
#[instrument(skip_all)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Status check requested");

    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: state.uptime_seconds(),
        dispatch: state.dispatch_metrics(),
        latency: state.latency_metrics(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

// ============================================================================
// Router Setup
// ============================================================================

/// Create the status router.
///
/// # Routes
/// - `GET /health` - Simple health check
/// - `GET /status` - Dispatch counters and latency
pub fn status_router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sns::{ErrorKind, NotificationType};

    #[test]
    fn test_health_response_default() {
        let health = HealthResponse::default();
        assert_eq!(health.status, "healthy");
        assert_eq!(SERVER_NAME, "drs-notify");
    }

    #[test]
    fn test_record_dispatch_outcomes() {
        let state = AppState::new();
        let ms = Duration::from_millis(1);

        state.record_dispatch(DispatchOutcome::Delivered(NotificationType::OrderPlaced), ms);
        state.record_dispatch(DispatchOutcome::Delivered(NotificationType::ItemShipped), ms);
        state.record_dispatch(DispatchOutcome::NonDrs, ms);
        state.record_dispatch(DispatchOutcome::Confirmed, ms);
        state.record_dispatch(DispatchOutcome::Failed(ErrorKind::MissingHandler), ms);
        state.record_dispatch(DispatchOutcome::Failed(ErrorKind::MissingHandler), ms);
        state.record_dispatch(DispatchOutcome::Failed(ErrorKind::NotDrs), ms);

        let metrics = state.dispatch_metrics();
        assert_eq!(metrics.delivered, 2);
        assert_eq!(metrics.non_drs, 1);
        assert_eq!(metrics.confirmed, 1);
        assert_eq!(metrics.failed, 3);
        assert_eq!(metrics.failures_by_code.get("missing_handler"), Some(&2));
        assert_eq!(metrics.failures_by_code.get("not_drs"), Some(&1));
        assert_eq!(state.total_dispatches(), 7);
    }

    #[test]
    fn test_latency_histogram() {
        let hist = LatencyHistogram::new();
        for us in [1000, 2000, 3000, 4000, 5000] {
            hist.record(us);
        }
        let metrics = hist.metrics();
        assert_eq!(metrics.total_requests, 5);
        assert!(metrics.p50_ms >= 2.9 && metrics.p50_ms <= 3.1);
        assert!(metrics.max_ms >= 4.9);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let hist = LatencyHistogram::new();
        // Beyond the histogram bounds, so dropped rather than wrapped
        hist.record_duration(Duration::MAX);
        hist.record_duration(Duration::from_millis(2));
        let metrics = hist.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert!(metrics.max_ms >= 1.9 && metrics.max_ms <= 2.1);
    }

    #[test]
    fn test_latency_metrics_default() {
        let metrics = LatencyMetrics::default();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.p99_ms, 0.0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_handler() {
        let state = Arc::new(AppState::new());
        state.record_dispatch(DispatchOutcome::Confirmed, Duration::from_micros(250));

        let response = status_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_app_state_thread_safety() {
        use std::thread;

        let state = Arc::new(AppState::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let state_clone = Arc::clone(&state);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    state_clone.record_dispatch(
                        DispatchOutcome::Failed(ErrorKind::InvalidJson),
                        Duration::from_micros(100),
                    );
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        let metrics = state.dispatch_metrics();
        assert_eq!(metrics.failed, 1_000);
        assert_eq!(metrics.failures_by_code.get("invalid_json"), Some(&1_000));
    }
}
