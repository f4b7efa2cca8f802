use crate::domain::model::LookupResult;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// The external search service a worker calls for each query.
#[async_trait]
pub trait LookupClient: Send + Sync + 'static {
    async fn lookup(&self, text: &str) -> Result<LookupResult>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn request_timeout(&self) -> Duration;
    fn queue_capacity(&self) -> usize;
    fn results_capacity(&self) -> usize;
    /// `None` lets every query run its lookup as soon as it is dequeued.
    fn max_in_flight(&self) -> Option<usize>;
    fn poll_interval(&self) -> Duration;
    fn poll_timeout(&self) -> Duration;
}
