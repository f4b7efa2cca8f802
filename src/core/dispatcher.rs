use crate::core::stats::PipelineStats;
use crate::domain::model::Query;
use crate::domain::ports::LookupClient;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Drains the dispatch queue and runs one worker per query.
///
/// With a limit, at most `max_in_flight` workers call the lookup service at
/// once; when all permits are taken the dispatcher stops draining, so further
/// queries wait in the dispatch queue and eventually hold up `submit`. Without
/// a limit every query gets a worker as soon as it is dequeued.
pub struct Dispatcher<C: LookupClient> {
    client: Arc<C>,
    results: mpsc::Sender<Query>,
    limiter: Option<Arc<Semaphore>>,
    stats: Arc<PipelineStats>,
    shutdown: CancellationToken,
}

impl<C: LookupClient> Dispatcher<C> {
    pub fn new(
        client: Arc<C>,
        results: mpsc::Sender<Query>,
        max_in_flight: Option<usize>,
        stats: Arc<PipelineStats>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            results,
            limiter: max_in_flight.map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
            stats,
            shutdown,
        }
    }

    /// Returns once the queue is closed and empty, or as soon as `shutdown` is
    /// cancelled. After cancellation no new worker starts: queries still queued
    /// are discarded. Workers already running are not awaited.
    pub async fn run(self, mut queue: mpsc::Receiver<Query>) {
        loop {
            let query = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = queue.recv() => match next {
                    Some(query) => query,
                    None => {
                        tracing::debug!("Dispatch queue closed, dispatcher stopping");
                        return;
                    }
                },
            };

            let permit = match &self.limiter {
                Some(limiter) => tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => {
                        self.discard(query);
                        break;
                    }
                    permit = Arc::clone(limiter).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            self.stats.record_dispatched();
            tracing::debug!(query_id = %query.id, "Dispatching query");

            tokio::spawn(run_worker(
                Arc::clone(&self.client),
                query,
                self.results.clone(),
                Arc::clone(&self.stats),
                permit,
            ));
        }

        queue.close();
        let mut discarded = 0u64;
        while let Ok(query) = queue.try_recv() {
            self.discard(query);
            discarded += 1;
        }
        tracing::info!(discarded, "Dispatcher cancelled, queued queries discarded");
    }

    fn discard(&self, query: Query) {
        tracing::debug!(query_id = %query.id, "Discarding undispatched query");
        self.stats.record_dropped();
    }
}

/// Failed lookups are dropped here and never reach the aggregator.
async fn run_worker<C: LookupClient>(
    client: Arc<C>,
    mut query: Query,
    results: mpsc::Sender<Query>,
    stats: Arc<PipelineStats>,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let response = match client.lookup(&query.text).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(query_id = %query.id, error = %e, "Lookup failed, dropping query");
            stats.record_dropped();
            return;
        }
    };

    let id = query.id;
    query.response = Some(response);
    if results.send(query).await.is_err() {
        tracing::warn!(query_id = %id, "Results queue closed, dropping query");
        stats.record_dropped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockLookupClient;
    use crate::domain::model::QueryId;
    use std::time::Duration;

    fn dispatcher(
        client: MockLookupClient,
        max_in_flight: Option<usize>,
    ) -> (
        Dispatcher<MockLookupClient>,
        mpsc::Receiver<Query>,
        Arc<PipelineStats>,
    ) {
        let (results_tx, results_rx) = mpsc::channel(16);
        let stats = Arc::new(PipelineStats::default());
        let dispatcher = Dispatcher::new(
            Arc::new(client),
            results_tx,
            max_in_flight,
            Arc::clone(&stats),
            CancellationToken::new(),
        );
        (dispatcher, results_rx, stats)
    }

    #[tokio::test]
    async fn test_successful_lookup_is_published_with_response() {
        let client = MockLookupClient::new().with_lines("acme", &["1 Acme Rd", "2 Acme Rd"]);
        let (dispatcher, mut results, stats) = dispatcher(client, Some(4));
        let (queue_tx, queue_rx) = mpsc::channel(4);

        queue_tx.send(Query::new(QueryId(1), "acme")).await.unwrap();
        drop(queue_tx);
        dispatcher.run(queue_rx).await;

        let done = results.recv().await.unwrap();
        assert_eq!(done.id, QueryId(1));
        assert_eq!(
            done.address_lines(),
            Some(vec!["1 Acme Rd".to_string(), "2 Acme Rd".to_string()])
        );
        assert!(results.recv().await.is_none());
        assert_eq!(stats.snapshot().dispatched, 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_dropped() {
        let client = MockLookupClient::new()
            .with_failure("broken")
            .with_lines("fine", &["9 Fine St"]);
        let (dispatcher, mut results, stats) = dispatcher(client.clone(), Some(4));
        let (queue_tx, queue_rx) = mpsc::channel(4);

        queue_tx.send(Query::new(QueryId(1), "broken")).await.unwrap();
        queue_tx.send(Query::new(QueryId(2), "fine")).await.unwrap();
        drop(queue_tx);
        dispatcher.run(queue_rx).await;

        let mut landed = Vec::new();
        while let Some(query) = results.recv().await {
            landed.push(query.id);
        }

        assert_eq!(landed, vec![QueryId(2)]);
        assert_eq!(client.calls(), 2);
        assert_eq!(stats.snapshot().dropped, 1);
    }

    #[tokio::test]
    async fn test_in_flight_limit_is_respected() {
        let mut client = MockLookupClient::new();
        for i in 0..12 {
            client = client.with_delayed_lines(
                &format!("slow-{}", i),
                &["somewhere"],
                Duration::from_millis(20),
            );
        }
        let (dispatcher, mut results, _stats) = dispatcher(client.clone(), Some(3));
        let (queue_tx, queue_rx) = mpsc::channel(16);

        for i in 0..12 {
            queue_tx
                .send(Query::new(QueryId(i + 1), format!("slow-{}", i)))
                .await
                .unwrap();
        }
        drop(queue_tx);
        dispatcher.run(queue_rx).await;

        let mut landed = 0;
        while results.recv().await.is_some() {
            landed += 1;
        }

        assert_eq!(landed, 12);
        assert!(client.peak_concurrency() <= 3);
        assert!(client.peak_concurrency() >= 2);
    }

    #[tokio::test]
    async fn test_unbounded_dispatch_runs_every_query_at_once() {
        let mut client = MockLookupClient::new();
        for i in 0..12 {
            client = client.with_delayed_lines(
                &format!("slow-{}", i),
                &["somewhere"],
                Duration::from_millis(50),
            );
        }
        let (dispatcher, mut results, stats) = dispatcher(client.clone(), None);
        let (queue_tx, queue_rx) = mpsc::channel(16);

        for i in 0..12 {
            queue_tx
                .send(Query::new(QueryId(i + 1), format!("slow-{}", i)))
                .await
                .unwrap();
        }
        drop(queue_tx);
        dispatcher.run(queue_rx).await;

        let mut landed = 0;
        while results.recv().await.is_some() {
            landed += 1;
        }

        assert_eq!(landed, 12);
        assert_eq!(client.peak_concurrency(), 12);
        assert_eq!(stats.snapshot().dispatched, 12);
    }

    #[tokio::test]
    async fn test_cancelled_dispatcher_never_calls_client_for_queued_queries() {
        let mut client = MockLookupClient::new();
        for i in 0..5 {
            client = client.with_delayed_lines(
                &format!("queued-{}", i),
                &["somewhere"],
                Duration::from_millis(300),
            );
        }
        let (results_tx, _results_rx) = mpsc::channel(16);
        let stats = Arc::new(PipelineStats::default());
        let shutdown = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            Arc::new(client.clone()),
            results_tx,
            Some(1),
            Arc::clone(&stats),
            shutdown.clone(),
        );
        let (queue_tx, queue_rx) = mpsc::channel(8);
        for i in 0..5 {
            queue_tx
                .send(Query::new(QueryId(i + 1), format!("queued-{}", i)))
                .await
                .unwrap();
        }

        let handle = tokio::spawn(dispatcher.run(queue_rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("dispatcher should stop promptly once cancelled")
            .unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        let stats = stats.snapshot();
        assert_eq!(client.calls(), 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.dropped, 4);
        assert!(queue_tx.send(Query::new(QueryId(9), "late")).await.is_err());
    }
}
