use crate::core::counter::IdCounter;
use crate::core::stats::PipelineStats;
use crate::domain::model::{Query, QueryId};
use crate::utils::error::{RelayError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Entry point of the pipeline: numbers each query and puts it on the dispatch queue.
pub struct SubmissionGate {
    counter: IdCounter,
    queue: mpsc::Sender<Query>,
    stats: Arc<PipelineStats>,
}

impl SubmissionGate {
    pub fn new(queue: mpsc::Sender<Query>, stats: Arc<PipelineStats>) -> Self {
        Self {
            counter: IdCounter::new(),
            queue,
            stats,
        }
    }

    /// Waits while the dispatch queue is full. Text is forwarded untouched, empty included.
    pub async fn submit(&self, text: impl Into<String>) -> Result<QueryId> {
        let id = self.counter.next_id();
        let query = Query::new(id, text);

        tracing::debug!(query_id = %id, text = %query.text, "Queueing query");
        self.queue
            .send(query)
            .await
            .map_err(|_| RelayError::PipelineClosed)?;
        self.stats.record_submitted();

        Ok(id)
    }

    pub fn issued(&self) -> u64 {
        self.counter.issued()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_enqueues_query_with_fresh_id() {
        let (tx, mut rx) = mpsc::channel(4);
        let stats = Arc::new(PipelineStats::default());
        let gate = SubmissionGate::new(tx, Arc::clone(&stats));

        let first = gate.submit("acme").await.unwrap();
        let second = gate.submit("").await.unwrap();

        assert_eq!(first, QueryId(1));
        assert_eq!(second, QueryId(2));

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.id, QueryId(1));
        assert_eq!(queued.text, "acme");
        assert!(queued.response.is_none());

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.text, "");
        assert_eq!(stats.snapshot().submitted, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_get_distinct_ids() {
        let (tx, mut rx) = mpsc::channel(256);
        let gate = Arc::new(SubmissionGate::new(tx, Arc::new(PipelineStats::default())));

        let mut handles = Vec::new();
        for i in 0..100 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.submit(format!("query-{}", i)).await.unwrap()
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 100);
        assert!((1..=100).all(|n| ids.contains(&QueryId(n))));
        assert_eq!(gate.issued(), 100);

        drop(gate);
        let mut drained = 0;
        while rx.recv().await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, 100);
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let (tx, mut rx) = mpsc::channel(1);
        let gate = SubmissionGate::new(tx, Arc::new(PipelineStats::default()));

        gate.submit("first").await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.submit("second")).await;
        assert!(blocked.is_err(), "submit should wait while the queue is full");

        rx.recv().await.unwrap();
        let id = gate.submit("third").await.unwrap();
        assert_eq!(id, QueryId(3));
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let (tx, rx) = mpsc::channel(1);
        let gate = SubmissionGate::new(tx, Arc::new(PipelineStats::default()));
        drop(rx);

        let err = gate.submit("late").await.unwrap_err();
        assert!(matches!(err, RelayError::PipelineClosed));
    }
}
