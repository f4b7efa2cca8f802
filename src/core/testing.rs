use crate::domain::model::LookupResult;
use crate::domain::ports::LookupClient;
use crate::utils::error::{RelayError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Scripted {
    Lines(Vec<String>, Duration),
    Fail(Duration),
}

/// In-process lookup service answering from a script keyed by query text.
/// Unscripted texts answer immediately with zero items.
#[derive(Debug, Clone, Default)]
pub struct MockLookupClient {
    script: Arc<HashMap<String, Scripted>>,
    calls: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockLookupClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(self, text: &str, lines: &[&str]) -> Self {
        self.with_delayed_lines(text, lines, Duration::ZERO)
    }

    pub fn with_delayed_lines(mut self, text: &str, lines: &[&str], delay: Duration) -> Self {
        let lines = lines.iter().map(|line| line.to_string()).collect();
        Arc::make_mut(&mut self.script).insert(text.to_string(), Scripted::Lines(lines, delay));
        self
    }

    pub fn with_failure(self, text: &str) -> Self {
        self.with_delayed_failure(text, Duration::ZERO)
    }

    pub fn with_delayed_failure(mut self, text: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.script).insert(text.to_string(), Scripted::Fail(delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of lookups observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LookupClient for MockLookupClient {
    async fn lookup(&self, text: &str) -> Result<LookupResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);

        let outcome = match self.script.get(text).cloned() {
            Some(Scripted::Lines(lines, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(LookupResult::from_lines(lines))
            }
            Some(Scripted::Fail(delay)) => {
                tokio::time::sleep(delay).await;
                Err(RelayError::UnexpectedStatus { status: 500 })
            }
            None => Ok(LookupResult::default()),
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
