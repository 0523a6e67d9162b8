//! Batch execution engine.
//!
//! Runs independent remote calls concurrently and collects every outcome.
//! Items never cancel each other: a failing or slow item only affects its own
//! slot, and results come back in input order whatever the completion order.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::remote::{describe, RemoteCall, RemoteOutcome, RemoteRequest};

/// One item of a batch: a correlation key and the request to send.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub key: String,
    pub request: RemoteRequest,
}

/// Outcome for one batch item, at its input position.
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub index: usize,
    pub key: String,
    pub outcome: RemoteOutcome,
}

impl BatchItemResult {
    /// Caller-visible form: `{index, key, success, data}` or
    /// `{index, key, success, error}`.
    pub fn to_json(&self) -> Value {
        match &self.outcome {
            RemoteOutcome::Success(data) => json!({
                "index": self.index,
                "key": self.key,
                "success": true,
                "data": data,
            }),
            RemoteOutcome::Failure(failure) => {
                let diagnosis = describe(failure);
                json!({
                    "index": self.index,
                    "key": self.key,
                    "success": false,
                    "error": {
                        "kind": diagnosis.kind,
                        "message": diagnosis.message,
                        "status": failure.status,
                        "suggestion": diagnosis.suggestion,
                    },
                })
            }
        }
    }
}

/// Success/failure partition of a finished batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<Value>,
}

impl BatchSummary {
    pub fn from_results(results: &[BatchItemResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results: results.iter().map(BatchItemResult::to_json).collect(),
        }
    }
}

/// Concurrent, failure-isolating executor.
#[derive(Clone)]
pub struct BatchEngine {
    remote: Arc<dyn RemoteCall>,
    budget: Duration,
    max_concurrency: Option<usize>,
    limiter: Option<Arc<Semaphore>>,
}

impl std::fmt::Debug for BatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEngine")
            .field("budget", &self.budget)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl BatchEngine {
    /// `max_concurrency: None` launches every item at once.
    pub fn new(remote: Arc<dyn RemoteCall>, budget: Duration, max_concurrency: Option<usize>) -> Self {
        let max_concurrency = max_concurrency.map(|n| n.max(1));
        Self {
            remote,
            budget,
            max_concurrency,
            limiter: max_concurrency.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Run every item and return one result per item, in input order.
    pub async fn run_batch(&self, items: Vec<BatchItem>) -> Vec<BatchItemResult> {
        let total = items.len();
        tracing::debug!(total, capped = self.limiter.is_some(), "batch started");

        let futures = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.run_item(index, item));
        let results = join_all(futures).await;

        let failed = results.iter().filter(|r| !r.outcome.is_success()).count();
        tracing::info!(total, failed, "batch finished");
        results
    }

    async fn run_item(&self, index: usize, item: BatchItem) -> BatchItemResult {
        // A closed semaphore is impossible here; fall through uncapped if it were.
        let _permit = match &self.limiter {
            Some(limiter) => limiter.clone().acquire_owned().await.ok(),
            None => None,
        };
        let outcome = self.remote.call(&item.request, self.budget).await;
        BatchItemResult {
            index,
            key: item.key,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ErrorKind, Failure, Method};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails items whose key is in `failing`; later items finish first.
    struct KeyedRemote {
        failing: HashSet<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl KeyedRemote {
        fn new(failing: impl IntoIterator<Item = String>) -> Arc<Self> {
            Arc::new(Self {
                failing: failing.into_iter().collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteCall for KeyedRemote {
        async fn call(&self, request: &RemoteRequest, _budget: Duration) -> RemoteOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let key = request.segments().last().cloned().unwrap_or_default();
            let position: u64 = key.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(position * 5))).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.failing.contains(&key) {
                RemoteOutcome::Failure(Failure::from_response(400, "Bad Request", "bad item"))
            } else {
                RemoteOutcome::Success(json!({ "id": key }))
            }
        }
    }

    fn items(n: usize) -> Vec<BatchItem> {
        (0..n)
            .map(|i| BatchItem {
                key: i.to_string(),
                request: RemoteRequest::new(Method::Post, &format!("/rest/api/2/version/{}", i)),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_middle_failure_is_isolated() {
        let remote = KeyedRemote::new(["1".to_string()]);
        let engine = BatchEngine::new(remote, Duration::from_secs(1), None);

        let results = engine.run_batch(items(3)).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].outcome, RemoteOutcome::Success(json!({"id": "0"})));
        match &results[1].outcome {
            RemoteOutcome::Failure(f) => assert_eq!(f.kind, ErrorKind::UpstreamError),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(results[2].outcome, RemoteOutcome::Success(json!({"id": "2"})));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine = BatchEngine::new(KeyedRemote::new([]), Duration::from_secs(1), None);
        assert!(engine.run_batch(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_uncapped_batch_runs_all_items_concurrently() {
        let remote = KeyedRemote::new([]);
        let engine = BatchEngine::new(remote.clone(), Duration::from_secs(1), None);
        engine.run_batch(items(6)).await;
        assert_eq!(remote.peak.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let remote = KeyedRemote::new([]);
        let engine = BatchEngine::new(remote.clone(), Duration::from_secs(1), Some(2));
        let results = engine.run_batch(items(6)).await;
        assert_eq!(results.len(), 6);
        assert!(remote.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_debug_shows_configured_cap() {
        let engine = BatchEngine::new(KeyedRemote::new([]), Duration::from_secs(1), Some(3));
        let before = format!("{:?}", engine);
        engine.run_batch(items(4)).await;
        assert!(before.contains("max_concurrency: Some(3)"), "{}", before);
        assert_eq!(format!("{:?}", engine), before);
    }

    #[test]
    fn test_summary_partition() {
        let results = vec![
            BatchItemResult {
                index: 0,
                key: "a".to_string(),
                outcome: RemoteOutcome::Success(json!({"id": "10"})),
            },
            BatchItemResult {
                index: 1,
                key: "b".to_string(),
                outcome: RemoteOutcome::Failure(Failure::from_response(403, "Forbidden", "")),
            },
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!((summary.total, summary.succeeded, summary.failed), (2, 1, 1));
        assert_eq!(summary.results[0]["data"]["id"], "10");
        assert_eq!(summary.results[1]["success"], false);
        assert_eq!(summary.results[1]["error"]["kind"], "Forbidden");
        assert_eq!(summary.results[1]["error"]["status"], 403);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_results_keep_input_order(failing in prop::collection::vec(any::<bool>(), 0..12)) {
            let n = failing.len();
            let failing_keys: Vec<String> = failing
                .iter()
                .enumerate()
                .filter(|(_, f)| **f)
                .map(|(i, _)| i.to_string())
                .collect();
            let engine = BatchEngine::new(KeyedRemote::new(failing_keys), Duration::from_secs(1), None);

            let results = tokio_test::block_on(engine.run_batch(items(n)));

            prop_assert_eq!(results.len(), n);
            for (i, result) in results.iter().enumerate() {
                prop_assert_eq!(result.index, i);
                prop_assert_eq!(&result.key, &i.to_string());
                if failing[i] {
                    prop_assert!(!result.outcome.is_success());
                } else {
                    prop_assert_eq!(&result.outcome, &RemoteOutcome::Success(json!({ "id": i.to_string() })));
                }
            }
        }
    }
}
