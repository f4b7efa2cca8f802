use crate::core::stats::PipelineStats;
use crate::core::store::ResultStore;
use crate::domain::model::Query;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sole writer of the result store.
pub struct Aggregator {
    store: Arc<ResultStore>,
    stats: Arc<PipelineStats>,
}

impl Aggregator {
    pub fn new(store: Arc<ResultStore>, stats: Arc<PipelineStats>) -> Self {
        Self { store, stats }
    }

    /// Runs until every sender of the results queue is gone and the queue is empty.
    pub async fn run(self, mut results: mpsc::Receiver<Query>) {
        while let Some(query) = results.recv().await {
            self.merge(query);
        }

        tracing::debug!("Results queue closed, aggregator stopping");
    }

    fn merge(&self, query: Query) {
        let Some(lines) = query.address_lines() else {
            tracing::warn!(query_id = %query.id, "Query arrived without a response, ignoring");
            return;
        };

        tracing::debug!(query_id = %query.id, lines = lines.len(), "Storing lookup result");
        self.store.insert(query.id, lines);
        self.stats.record_completed();
    }
}
