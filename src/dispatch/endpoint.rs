//! Endpoint State
//!
//! Per-endpoint availability and latency bookkeeping. One entry exists per
//! configured management endpoint (typically two storage processors plus an
//! optional control station); the liveness tracker owns every entry and all
//! mutation goes through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Samples kept by the latency window unless configured otherwise
pub const DEFAULT_LATENCY_WINDOW: usize = 5;

// =============================================================================
// Endpoint Role
// =============================================================================

/// What a management endpoint is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// One of the redundant storage processors; eligible for dispatch
    StorageProcessor,
    /// Control station; probed but never selected for commands
    Control,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointRole::StorageProcessor => write!(f, "storage_processor"),
            EndpointRole::Control => write!(f, "control"),
        }
    }
}

// =============================================================================
// Latency Window
// =============================================================================

/// Finite-window moving average weighting recent samples more heavily
///
/// Weights are `[N..1]` from newest to oldest over the last N samples;
/// the average is `Σ(sample·weight)/Σ(weight)`, `0.0` with no samples.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Fold in a new sample in seconds, evicting the oldest at capacity
    pub fn push(&mut self, sample_secs: f64) {
        self.samples.push_front(sample_secs);
        self.samples.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The linearly-weighted moving average in seconds
    pub fn weighted_average(&self) -> f64 {
        let n = self.samples.len();
        if n == 0 {
            return 0.0;
        }
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            let weight = (n - i) as f64;
            weighted_sum += sample * weight;
            weight_sum += weight;
        }
        weighted_sum / weight_sum
    }
}

// =============================================================================
// Endpoint State
// =============================================================================

/// Mutable state of one endpoint, serialized behind the tracker's lock
#[derive(Debug)]
pub struct EndpointState {
    pub address: String,
    pub role: EndpointRole,
    pub available: bool,
    /// Advisory flag: a real command is in flight on this endpoint
    pub working: bool,
    pub last_update: DateTime<Utc>,
    pub latency: LatencyWindow,
}

impl EndpointState {
    /// New endpoint, optimistically available
    pub fn new(address: impl Into<String>, role: EndpointRole, latency_window: usize) -> Self {
        Self {
            address: address.into(),
            role,
            available: true,
            working: false,
            last_update: Utc::now(),
            latency: LatencyWindow::new(latency_window),
        }
    }

    /// Probe or real-call success: refresh the timestamp and fold the sample
    pub fn mark_success(&mut self, latency: Duration) {
        self.available = true;
        self.last_update = Utc::now();
        self.latency.push(latency.as_secs_f64());
    }

    /// Probe or real-call failure classified unreachable; the latency sample
    /// is discarded, not folded
    pub fn mark_unavailable(&mut self) {
        self.available = false;
        self.last_update = Utc::now();
    }

    /// Refresh the timestamp without touching availability
    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            address: self.address.clone(),
            role: self.role,
            available: self.available,
            working: self.working,
            last_update: self.last_update,
            latency_weighted_average: self.latency.weighted_average(),
        }
    }
}

/// Point-in-time view of one endpoint for observability
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub address: String,
    pub role: EndpointRole,
    pub available: bool,
    pub working: bool,
    pub last_update: DateTime<Utc>,
    pub latency_weighted_average: f64,
}
