//! # Polling Daemon
//!
//! Background consumers run as independent polling loops that submit
//! transactions through the same router as every other client.
//!
//! ## Loop contract
//!
//! - One [`Job::run_once`] per iteration, then sleep `poll_interval`.
//! - A lost race (`Conflict`: entity already exists, request already
//!   resolved) is a benign skip: logged, and the loop continues.
//! - [`StopHandle::stop`] is cooperative: the flag is polled between
//!   iterations and never cancels an in-flight submission.

use crate::container::config::DaemonConfig;
use crate::router::{ResourcePointer, Response, Router, RouterError, RouterResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{parse_public_key, ErrorKind};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Work done by one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// A unit of periodic work.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn run_once(&self) -> Result<JobReport, RouterError>;
}

/// Totals over the whole life of a daemon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub iterations: u64,
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Cooperative stop flag shared with a running daemon.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Polling loop driving one [`Job`].
pub struct Daemon {
    poll_interval: Duration,
    stop: StopHandle,
}

impl Daemon {
    pub fn new(config: &DaemonConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            stop: StopHandle(Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run `job` until stopped.
    pub async fn run<J: Job + ?Sized>(&self, job: &J) -> DaemonStats {
        let mut stats = DaemonStats::default();
        info!(job = job.name(), interval_ms = self.poll_interval.as_millis() as u64, "Daemon started");

        while !self.stop.is_stopped() {
            stats.iterations += 1;
            match job.run_once().await {
                Ok(report) => {
                    stats.submitted += report.submitted;
                    stats.skipped += report.skipped;
                    stats.failed += report.failed;
                    if report != JobReport::default() {
                        debug!(job = job.name(), ?report, "Iteration done");
                    }
                }
                Err(e) if e.kind() == ErrorKind::Conflict => {
                    stats.skipped += 1;
                    warn!(job = job.name(), error = %e, "Skipping lost race");
                }
                Err(e) => {
                    stats.failed += 1;
                    error!(job = job.name(), error = %e, "Iteration failed");
                }
            }

            if self.stop.is_stopped() {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!(job = job.name(), iterations = stats.iterations, "Daemon stopped");
        stats
    }
}

/// A transaction waiting to be submitted.
#[derive(Debug, Clone)]
pub struct QueuedTransaction {
    pub pointer: ResourcePointer,
    pub payload: Vec<u8>,
}

impl QueuedTransaction {
    /// Parse a `<from-hex> <path> [payload]` line. The payload is the rest
    /// of the line; without one the transaction is a delete.
    pub fn parse_line(line: &str) -> RouterResult<Self> {
        let line = line.trim();
        let mut parts = line.splitn(3, char::is_whitespace);
        let from = parts.next().filter(|s| !s.is_empty());
        let path = parts.next().filter(|s| !s.is_empty());
        let (Some(from), Some(path)) = (from, path) else {
            return Err(RouterError::invalid_path(line, "expected <from-hex> <path> [payload]"));
        };
        let from = parse_public_key(from).map_err(|e| RouterError::invalid_path(path, e.to_string()))?;
        let payload = parts.next().map(str::trim).unwrap_or_default();
        Ok(Self {
            pointer: ResourcePointer::new(from, path),
            payload: payload.as_bytes().to_vec(),
        })
    }
}

/// Job draining a queue of transactions into the router, at most
/// `batch_size` per iteration.
pub struct TransactionFeed {
    router: Arc<Router>,
    queue: Mutex<VecDeque<QueuedTransaction>>,
    batch_size: usize,
}

impl TransactionFeed {
    pub fn new(router: Arc<Router>, batch_size: usize) -> Self {
        Self {
            router,
            queue: Mutex::new(VecDeque::new()),
            batch_size,
        }
    }

    pub fn push(&self, pointer: ResourcePointer, payload: Vec<u8>) {
        self.queue
            .lock()
            .push_back(QueuedTransaction { pointer, payload });
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn next_batch(&self) -> Vec<QueuedTransaction> {
        let mut queue = self.queue.lock();
        let take = self.batch_size.min(queue.len());
        queue.drain(..take).collect()
    }

    fn classify(response: &Response, path: &str, report: &mut JobReport) {
        if response.is_ok() {
            report.submitted += 1;
        } else if response.code == ErrorKind::Conflict.code() {
            report.skipped += 1;
            warn!(path, log = %response.log, "Transaction skipped");
        } else {
            report.failed += 1;
            error!(path, code = response.code, log = %response.log, "Transaction rejected");
        }
    }
}

#[async_trait]
impl Job for TransactionFeed {
    fn name(&self) -> &str {
        "transaction-feed"
    }

    async fn run_once(&self) -> Result<JobReport, RouterError> {
        let mut report = JobReport::default();
        for tx in self.next_batch() {
            let response = self.router.transact(&tx.pointer, &tx.payload);
            Self::classify(&response, &tx.pointer.path, &mut report);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{NodeConfig, NodeContainer};
    use ql_01_entity_store::{EntityError, InMemoryEntityStore, MetaData};
    use ql_02_governance::{Wallet, WalletSchema};
    use std::sync::atomic::AtomicU64;

    const CREATOR: [u8; 32] = [0x42; 32];

    fn make_feed(batch_size: usize) -> TransactionFeed {
        let node = NodeContainer::with_store(
            NodeConfig::default(),
            Arc::new(InMemoryEntityStore::new()),
        )
        .unwrap();
        TransactionFeed::new(node.router(), batch_size)
    }

    fn wallet_payload() -> Vec<u8> {
        let wallet = Wallet {
            id: uuid::Uuid::new_v4(),
            creator: CREATOR,
            consensus_needed: 3,
        };
        WalletSchema.encode(&wallet).unwrap()
    }

    fn wallet_pointer() -> ResourcePointer {
        ResourcePointer::new(CREATOR, "/wallet/")
    }

    /// Stops its daemon after `limit` iterations.
    struct CountingJob {
        runs: AtomicU64,
        limit: u64,
        stop: StopHandle,
        conflict: bool,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run_once(&self) -> Result<JobReport, RouterError> {
            let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if runs >= self.limit {
                self.stop.stop();
            }
            if self.conflict {
                return Err(RouterError::Entity(EntityError::AlreadyExists {
                    entity: "Wallet".into(),
                    id: uuid::Uuid::nil(),
                }));
            }
            Ok(JobReport {
                submitted: 1,
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_feed_drains_in_batches() {
        let feed = make_feed(2);
        for _ in 0..3 {
            feed.push(wallet_pointer(), wallet_payload());
        }

        let report = feed.run_once().await.unwrap();
        assert_eq!(report.submitted, 2);
        assert_eq!(feed.pending(), 1);

        let report = feed.run_once().await.unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(feed.pending(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_skipped() {
        let feed = make_feed(10);
        let payload = wallet_payload();
        feed.push(wallet_pointer(), payload.clone());
        feed.push(wallet_pointer(), payload);

        let report = feed.run_once().await.unwrap();
        assert_eq!(
            report,
            JobReport {
                submitted: 1,
                skipped: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_submission_is_counted_as_failed() {
        let feed = make_feed(10);
        feed.push(ResourcePointer::new([0x01; 32], "/wallet/"), wallet_payload());
        feed.push(wallet_pointer(), b"not json".to_vec());

        let report = feed.run_once().await.unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.submitted, 0);
    }

    #[test]
    fn test_parse_line_splits_key_path_and_payload() {
        let line = format!("{} /wallet/ {{\"id\": 1}}", hex::encode(CREATOR));
        let tx = QueuedTransaction::parse_line(&line).unwrap();
        assert_eq!(tx.pointer.from, CREATOR);
        assert_eq!(tx.pointer.path, "/wallet/");
        assert_eq!(tx.payload, b"{\"id\": 1}".to_vec());
    }

    #[test]
    fn test_parse_line_without_payload_is_a_delete() {
        let line = format!("{} /wallet/id:{}", hex::encode(CREATOR), uuid::Uuid::nil());
        let tx = QueuedTransaction::parse_line(&line).unwrap();
        assert!(tx.payload.is_empty());
    }

    #[test]
    fn test_parse_line_rejects_bad_input() {
        for line in ["", "/wallet/", "zz /wallet/ {}"] {
            let err = QueuedTransaction::parse_line(line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Routing, "{line}");
        }
    }

    #[tokio::test]
    async fn test_parsed_lines_feed_the_router() {
        let feed = make_feed(10);
        let payload = String::from_utf8(wallet_payload()).unwrap();
        let line = format!("{} /wallet/ {}", hex::encode(CREATOR), payload);
        let tx = QueuedTransaction::parse_line(&line).unwrap();
        feed.push(tx.pointer, tx.payload);

        let report = feed.run_once().await.unwrap();
        assert_eq!(report.submitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_runs_until_stopped() {
        let daemon = Daemon::new(&DaemonConfig::default());
        let job = CountingJob {
            runs: AtomicU64::new(0),
            limit: 3,
            stop: daemon.stop_handle(),
            conflict: false,
        };

        let stats = daemon.run(&job).await;
        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.submitted, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_errors_do_not_stop_the_loop() {
        let daemon = Daemon::new(&DaemonConfig::default());
        let job = CountingJob {
            runs: AtomicU64::new(0),
            limit: 2,
            stop: daemon.stop_handle(),
            conflict: true,
        };

        let stats = daemon.run(&job).await;
        assert_eq!(stats.iterations, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_stop_handle_is_shared() {
        let daemon = Daemon::new(&DaemonConfig::default());
        let handle = daemon.stop_handle();
        assert!(!daemon.stop.is_stopped());
        handle.stop();
        assert!(daemon.stop.is_stopped());
    }
}
