//! Liveness Tracker
//!
//! Tracks availability and latency of every configured management endpoint
//! via a background heartbeat. The probe loop has an explicit lifecycle:
//! `start()` spawns it, `stop()` cancels it through a token. Each tick, every
//! endpoint whose state is older than the interval and that is not mid-command
//! gets its own short-lived probe task, so one stalled endpoint cannot delay
//! the others. An interval of zero disables scheduling entirely.
//!
//! A credential rejection from any endpoint clears the tracker-wide
//! credential flag: probing halts and every subsequent selection fails until
//! credentials are reset.

use crate::dispatch::endpoint::{
    EndpointRole, EndpointSnapshot, EndpointState, DEFAULT_LATENCY_WINDOW,
};
use crate::domain::ports::Probe;
use crate::error::{Error, Result};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the liveness tracker
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Probe scheduling interval; zero disables the background loop
    pub interval: Duration,
    /// Per-probe timeout
    pub probe_timeout: Duration,
    /// Latency window size
    pub latency_window: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            latency_window: DEFAULT_LATENCY_WINDOW,
        }
    }
}

// =============================================================================
// Liveness Tracker
// =============================================================================

/// Per-endpoint liveness and latency registry with a background prober
pub struct LivenessTracker {
    endpoints: DashMap<String, Arc<Mutex<EndpointState>>>,
    credentials_valid: AtomicBool,
    config: HeartbeatConfig,
    probe: Arc<dyn Probe>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl LivenessTracker {
    pub fn new(config: HeartbeatConfig, probe: Arc<dyn Probe>) -> Arc<Self> {
        Arc::new(Self {
            endpoints: DashMap::new(),
            credentials_valid: AtomicBool::new(true),
            config,
            probe,
            cancel: Mutex::new(None),
        })
    }

    /// Register an endpoint, optimistically available
    pub fn register(&self, address: impl Into<String>, role: EndpointRole) {
        self.register_with_availability(address, role, true);
    }

    /// Register an endpoint with explicit initial availability
    pub fn register_with_availability(
        &self,
        address: impl Into<String>,
        role: EndpointRole,
        available: bool,
    ) {
        let address = address.into();
        let mut state = EndpointState::new(&address, role, self.config.latency_window);
        state.available = available;
        self.endpoints
            .insert(address, Arc::new(Mutex::new(state)));
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn the background probe loop
    ///
    /// No-op when the interval is zero or the loop is already running.
    pub fn start(self: &Arc<Self>) {
        if self.config.interval.is_zero() {
            info!("heartbeat interval is zero, probing disabled");
            return;
        }
        let mut cancel = self.cancel.lock();
        if cancel.is_some() {
            return;
        }
        let token = CancellationToken::new();
        *cancel = Some(token.clone());

        let tracker = Arc::downgrade(self);
        tokio::spawn(async move {
            LivenessTracker::run(tracker, token).await;
        });
        info!(interval = ?self.config.interval, "heartbeat started");
    }

    /// Cancel the probe loop; idempotent
    pub fn stop(&self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
            info!("heartbeat stopped");
        }
    }

    async fn run(tracker: Weak<LivenessTracker>, token: CancellationToken) {
        loop {
            let interval = match tracker.upgrade() {
                Some(t) => t.config.interval,
                None => return,
            };
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            let tracker = match tracker.upgrade() {
                Some(t) => t,
                None => return,
            };
            if !tracker.credentials_ok() {
                continue;
            }
            tracker.schedule_probes();
        }
    }

    /// Spawn one probe task per endpoint due for a check
    fn schedule_probes(self: &Arc<Self>) {
        let stale_after = match chrono::Duration::from_std(self.config.interval) {
            Ok(d) => d,
            Err(_) => return,
        };
        let now = Utc::now();
        for entry in self.endpoints.iter() {
            let (address, state) = (entry.key().clone(), entry.value().clone());
            let due = {
                let state = state.lock();
                !state.working && now - state.last_update >= stale_after
            };
            if !due {
                continue;
            }
            let tracker = self.clone();
            tokio::spawn(async move {
                tracker.probe_endpoint(&address).await;
            });
        }
    }

    async fn probe_endpoint(&self, address: &str) {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.probe_timeout,
            self.probe.ping(address),
        )
        .await;
        match outcome {
            Ok(Ok(())) => {
                let elapsed = started.elapsed();
                debug!(address, latency_ms = elapsed.as_millis() as u64, "probe ok");
                self.mark_success(address, elapsed);
            }
            Ok(Err(Error::CredentialInvalid)) => {
                self.invalidate_credentials();
            }
            Ok(Err(Error::EndpointUnreachable { .. })) | Err(_) => {
                warn!(address, "probe failed, endpoint unavailable");
                self.mark_unavailable(address);
            }
            Ok(Err(err)) => {
                // says nothing about reachability; back off until next interval
                warn!(address, error = %err, "probe errored");
                if let Some(state) = self.endpoints.get(address) {
                    state.lock().touch();
                }
            }
        }
    }

    // =========================================================================
    // State Updates
    // =========================================================================

    /// Record a successful probe or real call
    pub fn mark_success(&self, address: &str, latency: Duration) {
        if let Some(state) = self.endpoints.get(address) {
            let mut state = state.lock();
            if !state.available {
                info!(address, "endpoint back up");
            }
            state.mark_success(latency);
        }
    }

    /// Record an unreachable probe or real call
    pub fn mark_unavailable(&self, address: &str) {
        if let Some(state) = self.endpoints.get(address) {
            let mut state = state.lock();
            if state.available {
                warn!(address, "endpoint down");
            }
            state.mark_unavailable();
        }
    }

    /// Flag a real command in flight; advisory, probes skip working endpoints
    pub fn set_working(&self, address: &str, working: bool) {
        if let Some(state) = self.endpoints.get(address) {
            state.lock().working = working;
        }
    }

    /// Clear the tracker-wide credential flag
    pub fn invalidate_credentials(&self) {
        if self.credentials_valid.swap(false, Ordering::SeqCst) {
            warn!("credentials rejected, probing halted until reset");
        }
    }

    /// Restore the credential flag after reconfiguration
    pub fn reset_credentials(&self) {
        self.credentials_valid.store(true, Ordering::SeqCst);
        info!("credentials reset");
    }

    pub fn credentials_ok(&self) -> bool {
        self.credentials_valid.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Selection & Introspection
    // =========================================================================

    /// Pick the storage processor to dispatch on
    ///
    /// Lexicographically-lowest available address; recomputed on every call
    /// so failover is automatic on the next call after any state flip. Fails
    /// fast rather than blocking when nothing is live.
    pub fn select_storage_processor(&self) -> Result<String> {
        if !self.credentials_ok() {
            return Err(Error::CredentialInvalid);
        }
        self.endpoints
            .iter()
            .filter_map(|entry| {
                let state = entry.value().lock();
                (state.role == EndpointRole::StorageProcessor && state.available)
                    .then(|| state.address.clone())
            })
            .min()
            .ok_or(Error::NoLiveEndpoint)
    }

    /// All storage-processor addresses, sorted, regardless of availability
    pub fn storage_processors(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .endpoints
            .iter()
            .filter_map(|entry| {
                let state = entry.value().lock();
                (state.role == EndpointRole::StorageProcessor).then(|| state.address.clone())
            })
            .collect();
        addresses.sort();
        addresses
    }

    pub fn is_available(&self, address: &str) -> bool {
        self.endpoints
            .get(address)
            .map_or(false, |state| state.lock().available)
    }

    /// Weighted latency average for one endpoint, seconds
    pub fn latency_average(&self, address: &str) -> Option<f64> {
        self.endpoints
            .get(address)
            .map(|state| state.lock().latency.weighted_average())
    }

    /// Point-in-time view of the whole tracker
    pub fn snapshot(&self) -> TrackerSnapshot {
        let mut endpoints: Vec<EndpointSnapshot> = self
            .endpoints
            .iter()
            .map(|entry| entry.value().lock().snapshot())
            .collect();
        endpoints.sort_by(|a, b| a.address.cmp(&b.address));
        TrackerSnapshot {
            endpoints,
            credentials_valid: self.credentials_ok(),
        }
    }
}

/// Point-in-time view of every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub endpoints: Vec<EndpointSnapshot>,
    pub credentials_valid: bool,
}
