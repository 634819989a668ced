//! Command Dispatcher
//!
//! Executes commands against whichever storage processor is live. Selection
//! goes through the tracker on every attempt, so failover needs no
//! stickiness; transient failures retry under two independent bounded
//! budgets (unreachable reselects, a dropped connection retries the same
//! endpoint), and every call runs under a wall-clock timeout whose expiry
//! drops the in-flight future. The transport contract requires drop to kill
//! the underlying process or connection.

use crate::dispatch::heartbeat::LivenessTracker;
use crate::domain::ports::{Command, CommandTransport};
use crate::error::{Error, Result, RetryClass};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Retries allowed per failure class before the error surfaces
    pub retry_budget: usize,
    /// Wall-clock timeout per underlying call
    pub call_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retry_budget: 2,
            call_timeout: Duration::from_secs(60),
        }
    }
}

// =============================================================================
// Command Dispatcher
// =============================================================================

/// Resilient multi-endpoint command executor
pub struct CommandDispatcher {
    tracker: Arc<LivenessTracker>,
    transport: Arc<dyn CommandTransport>,
    config: DispatchConfig,
}

impl CommandDispatcher {
    pub fn new(
        tracker: Arc<LivenessTracker>,
        transport: Arc<dyn CommandTransport>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            tracker,
            transport,
            config,
        }
    }

    pub fn tracker(&self) -> &Arc<LivenessTracker> {
        &self.tracker
    }

    /// Execute one command on a live storage processor
    ///
    /// Selection is recomputed per attempt. Unreachable failures mark the
    /// endpoint down and reselect; a connection dropped mid-call retries the
    /// same endpoint; both budgets are finite. Credential rejection poisons
    /// the tracker and surfaces immediately.
    pub async fn execute(&self, command: &Command) -> Result<String> {
        let mut unreachable_left = self.config.retry_budget;
        let mut dropped_left = self.config.retry_budget;
        let mut pinned: Option<String> = None;

        loop {
            let address = match pinned.take() {
                Some(address) => address,
                None => self.tracker.select_storage_processor()?,
            };
            debug!(address, command = %command, "dispatching");

            match self.run_once(&address, command).await {
                Ok(output) => return Ok(output),
                Err(err) => match err.retry_class() {
                    RetryClass::ReselectEndpoint => {
                        self.tracker.mark_unavailable(&address);
                        if unreachable_left == 0 {
                            return Err(err);
                        }
                        unreachable_left -= 1;
                        warn!(address, "endpoint unreachable, reselecting");
                    }
                    RetryClass::SameEndpoint => {
                        if dropped_left == 0 {
                            return Err(err);
                        }
                        dropped_left -= 1;
                        warn!(address, "connection dropped, retrying same endpoint");
                        pinned = Some(address);
                    }
                    RetryClass::CredentialFailure => {
                        self.tracker.invalidate_credentials();
                        return Err(err);
                    }
                    RetryClass::NoRetry => return Err(err),
                },
            }
        }
    }

    /// Execute one command on every storage processor simultaneously
    ///
    /// Requires all of them up: fails immediately, with no network attempt
    /// and no retry, if any one is Unavailable. Outputs come back in address
    /// order.
    pub async fn execute_on_all(&self, command: &Command) -> Result<Vec<String>> {
        if !self.tracker.credentials_ok() {
            return Err(Error::CredentialInvalid);
        }
        let processors = self.tracker.storage_processors();
        if processors.is_empty() {
            return Err(Error::NoLiveEndpoint);
        }
        for address in &processors {
            if !self.tracker.is_available(address) {
                return Err(Error::EndpointUnreachable {
                    address: address.clone(),
                });
            }
        }
        futures::future::try_join_all(
            processors
                .iter()
                .map(|address| self.run_once(address, command)),
        )
        .await
    }

    async fn run_once(&self, address: &str, command: &Command) -> Result<String> {
        self.tracker.set_working(address, true);
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.call_timeout,
            self.transport.run(address, command),
        )
        .await;
        self.tracker.set_working(address, false);

        match outcome {
            Ok(Ok(output)) => {
                self.tracker.mark_success(address, started.elapsed());
                Ok(output)
            }
            Ok(Err(err)) => Err(err),
            // the dropped future aborts the underlying call
            Err(_) => Err(Error::CommandTimeout {
                timeout_secs: self.config.call_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::endpoint::EndpointRole;
    use crate::dispatch::heartbeat::HeartbeatConfig;
    use crate::domain::ports::Probe;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct NoProbe;

    #[async_trait]
    impl Probe for NoProbe {
        async fn ping(&self, _endpoint: &str) -> Result<()> {
            Ok(())
        }
    }

    fn tracker() -> Arc<LivenessTracker> {
        let tracker = LivenessTracker::new(
            HeartbeatConfig {
                interval: Duration::ZERO,
                ..Default::default()
            },
            Arc::new(NoProbe),
        );
        tracker.register("10.0.0.1", EndpointRole::StorageProcessor);
        tracker.register("10.0.0.2", EndpointRole::StorageProcessor);
        tracker
    }

    fn dispatcher(
        tracker: Arc<LivenessTracker>,
        transport: Arc<dyn CommandTransport>,
    ) -> CommandDispatcher {
        CommandDispatcher::new(
            tracker,
            transport,
            DispatchConfig {
                retry_budget: 2,
                call_timeout: Duration::from_millis(200),
            },
        )
    }

    /// Records every call; fails addresses listed as dead with Unreachable
    struct SelectiveTransport {
        dead: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl SelectiveTransport {
        fn new(dead: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                dead: dead.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandTransport for SelectiveTransport {
        async fn run(&self, endpoint: &str, _command: &Command) -> Result<String> {
            self.calls.lock().push(endpoint.to_string());
            if self.dead.iter().any(|d| d == endpoint) {
                Err(Error::EndpointUnreachable {
                    address: endpoint.to_string(),
                })
            } else {
                Ok(format!("ok from {}", endpoint))
            }
        }
    }

    #[tokio::test]
    async fn test_success_on_lowest_endpoint() {
        let tracker = tracker();
        let transport = SelectiveTransport::new(&[]);
        let dispatcher = dispatcher(tracker.clone(), transport.clone());

        let output = dispatcher.execute(&Command::new(["getagent"])).await.unwrap();
        assert_eq!(output, "ok from 10.0.0.1");
        assert!(tracker.latency_average("10.0.0.1").unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_unreachable_fails_over() {
        let tracker = tracker();
        let transport = SelectiveTransport::new(&["10.0.0.1"]);
        let dispatcher = dispatcher(tracker.clone(), transport.clone());

        let output = dispatcher.execute(&Command::new(["getagent"])).await.unwrap();
        assert_eq!(output, "ok from 10.0.0.2");
        assert_eq!(
            *transport.calls.lock(),
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
        assert!(!tracker.is_available("10.0.0.1"));

        // next call goes straight to the survivor
        dispatcher.execute(&Command::new(["getagent"])).await.unwrap();
        assert_eq!(transport.calls.lock().last().unwrap(), "10.0.0.2");
    }

    #[tokio::test]
    async fn test_all_unreachable_exhausts_and_fails() {
        let tracker = tracker();
        let transport = SelectiveTransport::new(&["10.0.0.1", "10.0.0.2"]);
        let dispatcher = dispatcher(tracker.clone(), transport);

        let result = dispatcher.execute(&Command::new(["getagent"])).await;
        assert_matches!(result, Err(Error::NoLiveEndpoint));
    }

    /// Drops the connection on the first call, then succeeds
    struct DropOnceTransport {
        calls: Mutex<Vec<String>>,
        dropped: AtomicBool,
    }

    #[async_trait]
    impl CommandTransport for DropOnceTransport {
        async fn run(&self, endpoint: &str, _command: &Command) -> Result<String> {
            self.calls.lock().push(endpoint.to_string());
            if !self.dropped.swap(true, Ordering::SeqCst) {
                Err(Error::ConnectionDropped {
                    address: endpoint.to_string(),
                })
            } else {
                Ok("ok".into())
            }
        }
    }

    #[tokio::test]
    async fn test_dropped_connection_retries_same_endpoint() {
        let transport = Arc::new(DropOnceTransport {
            calls: Mutex::new(Vec::new()),
            dropped: AtomicBool::new(false),
        });
        let dispatcher = dispatcher(tracker(), transport.clone());

        let output = dispatcher.execute(&Command::new(["getagent"])).await.unwrap();
        assert_eq!(output, "ok");
        assert_eq!(
            *transport.calls.lock(),
            vec!["10.0.0.1".to_string(), "10.0.0.1".to_string()]
        );
    }

    struct CredentialTransport;

    #[async_trait]
    impl CommandTransport for CredentialTransport {
        async fn run(&self, _endpoint: &str, _command: &Command) -> Result<String> {
            Err(Error::CredentialInvalid)
        }
    }

    #[tokio::test]
    async fn test_credential_failure_poisons_every_caller() {
        let tracker = tracker();
        let dispatcher = dispatcher(tracker.clone(), Arc::new(CredentialTransport));

        let result = dispatcher.execute(&Command::new(["getagent"])).await;
        assert_matches!(result, Err(Error::CredentialInvalid));

        // even selection now fails, without touching the transport
        let result = dispatcher.execute(&Command::new(["getagent"])).await;
        assert_matches!(result, Err(Error::CredentialInvalid));

        tracker.reset_credentials();
        assert!(tracker.select_storage_processor().is_ok());
    }

    /// Sleeps past any timeout; records whether it ever completed
    struct HungTransport {
        completed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CommandTransport for HungTransport {
        async fn run(&self, _endpoint: &str, _command: &Command) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.completed.store(true, Ordering::SeqCst);
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn test_timeout_cancels_in_flight_call() {
        let completed = Arc::new(AtomicBool::new(false));
        let dispatcher = dispatcher(
            tracker(),
            Arc::new(HungTransport {
                completed: completed.clone(),
            }),
        );

        let started = Instant::now();
        let result = dispatcher.execute(&Command::new(["getagent"])).await;
        assert_matches!(result, Err(Error::CommandTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            !completed.load(Ordering::SeqCst),
            "dropped call must not keep running"
        );
    }

    #[tokio::test]
    async fn test_broadcast_requires_all_processors() {
        let tracker = tracker();
        let transport = SelectiveTransport::new(&[]);
        let dispatcher = dispatcher(tracker.clone(), transport.clone());

        tracker.mark_unavailable("10.0.0.2");
        let result = dispatcher.execute_on_all(&Command::new(["ndu", "-list"])).await;
        assert_matches!(result, Err(Error::EndpointUnreachable { .. }));
        assert!(
            transport.calls.lock().is_empty(),
            "no network attempt when one processor is down"
        );
    }

    #[tokio::test]
    async fn test_broadcast_hits_every_processor() {
        let tracker = tracker();
        let transport = SelectiveTransport::new(&[]);
        let dispatcher = dispatcher(tracker, transport.clone());

        let outputs = dispatcher
            .execute_on_all(&Command::new(["ndu", "-list"]))
            .await
            .unwrap();
        assert_eq!(outputs.len(), 2);
        let mut calls = transport.calls.lock().clone();
        calls.sort();
        assert_eq!(calls, vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
    }
}
