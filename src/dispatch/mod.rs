//! Endpoint Liveness & Command Dispatch
//!
//! Resilient execution across the array's redundant storage processors:
//!
//! - [`EndpointState`]/[`LatencyWindow`]: per-endpoint availability and a
//!   linearly-weighted latency average
//! - [`LivenessTracker`]: background heartbeat with explicit start/stop,
//!   per-endpoint probe tasks, and a tracker-wide credential flag
//! - [`CommandDispatcher`]: live-endpoint selection per call, bounded
//!   retries, per-call timeouts, and all-processor broadcast

pub mod dispatcher;
pub mod endpoint;
pub mod heartbeat;

pub use dispatcher::{CommandDispatcher, DispatchConfig};
pub use endpoint::{
    EndpointRole, EndpointSnapshot, EndpointState, LatencyWindow, DEFAULT_LATENCY_WINDOW,
};
pub use heartbeat::{HeartbeatConfig, LivenessTracker, TrackerSnapshot};
