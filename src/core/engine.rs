use crate::core::aggregator::Aggregator;
use crate::core::dispatcher::Dispatcher;
use crate::core::gate::SubmissionGate;
use crate::core::stats::PipelineStats;
use crate::core::store::ResultStore;
use crate::domain::model::{EngineStats, QueryId};
use crate::domain::ports::{ConfigProvider, LookupClient};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Submission gate, dispatcher and aggregator wired together over bounded queues.
///
/// Must be started inside a tokio runtime; both stages run as spawned tasks.
pub struct LookupEngine {
    gate: SubmissionGate,
    store: Arc<ResultStore>,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
    aggregator: JoinHandle<()>,
}

impl LookupEngine {
    pub fn start<P, C>(config: &P, client: C) -> Self
    where
        P: ConfigProvider + ?Sized,
        C: LookupClient,
    {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity().max(1));
        let (results_tx, results_rx) = mpsc::channel(config.results_capacity().max(1));
        let stats = Arc::new(PipelineStats::default());
        let store = Arc::new(ResultStore::new());
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher::new(
            Arc::new(client),
            results_tx,
            config.max_in_flight(),
            Arc::clone(&stats),
            cancel.clone(),
        );
        let aggregator = Aggregator::new(Arc::clone(&store), Arc::clone(&stats));

        tracing::info!(
            queue_capacity = config.queue_capacity(),
            results_capacity = config.results_capacity(),
            max_in_flight = ?config.max_in_flight(),
            "Starting lookup engine"
        );

        Self {
            gate: SubmissionGate::new(queue_tx, Arc::clone(&stats)),
            store,
            stats,
            cancel,
            dispatcher: tokio::spawn(dispatcher.run(queue_rx)),
            aggregator: tokio::spawn(aggregator.run(results_rx)),
        }
    }

    pub async fn submit(&self, text: impl Into<String>) -> Result<QueryId> {
        self.gate.submit(text).await
    }

    /// Address lines for `id`, or `None` while pending, after a dropped lookup,
    /// or for an id that was never issued.
    pub fn lookup(&self, id: QueryId) -> Option<Vec<String>> {
        self.store.get(id)
    }

    /// Shared handle for pollers that outlive a borrow of the engine.
    pub fn store(&self) -> Arc<ResultStore> {
        Arc::clone(&self.store)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }

    /// Polls the store every `interval` until `id` is found or `timeout` elapses.
    pub async fn wait_for(
        &self,
        id: QueryId,
        interval: Duration,
        timeout: Duration,
    ) -> Option<Vec<String>> {
        poll_store(&self.store, id, interval, timeout).await
    }

    /// Polls every id at once against a single deadline and returns the
    /// outcome per id, in the order of `ids`.
    pub async fn wait_for_all(
        &self,
        ids: &[QueryId],
        interval: Duration,
        timeout: Duration,
    ) -> Vec<(QueryId, Option<Vec<String>>)> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut polls = JoinSet::new();
        for &id in ids {
            let store = Arc::clone(&self.store);
            polls.spawn(async move {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                (id, poll_store(&store, id, interval, remaining).await)
            });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = polls.join_next().await {
            match joined {
                Ok((id, lines)) => {
                    outcomes.insert(id, lines);
                }
                Err(e) => tracing::error!(error = %e, "Poll task failed"),
            }
        }

        ids.iter()
            .map(|id| (*id, outcomes.remove(id).flatten()))
            .collect()
    }

    /// Stops dispatching: queries still in the dispatch queue are discarded
    /// and never reach the lookup service. Workers already running get `grace`
    /// to land their results before the aggregator is left to finish on its own.
    pub async fn shutdown(self, grace: Duration) -> EngineStats {
        let LookupEngine {
            gate,
            stats,
            cancel,
            dispatcher,
            aggregator,
            ..
        } = self;
        cancel.cancel();
        drop(gate);

        if let Err(e) = dispatcher.await {
            tracing::error!(error = %e, "Dispatcher task failed");
        }

        match tokio::time::timeout(grace, aggregator).await {
            Ok(Ok(())) => tracing::info!("Lookup engine stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Aggregator task failed"),
            Err(_) => tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "Workers still in flight after grace period, detaching aggregator"
            ),
        }

        stats.snapshot()
    }
}

pub async fn poll_store(
    store: &ResultStore,
    id: QueryId,
    interval: Duration,
    timeout: Duration,
) -> Option<Vec<String>> {
    let poll = async {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            if let Some(lines) = store.get(id) {
                return lines;
            }
        }
    };

    tokio::time::timeout(timeout, poll).await.ok()
}
