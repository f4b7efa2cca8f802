pub mod aggregator;
pub mod counter;
pub mod dispatcher;
pub mod engine;
pub mod gate;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{EngineStats, Item, LookupResult, Query, QueryId};
pub use crate::domain::ports::{ConfigProvider, LookupClient};
pub use crate::utils::error::Result;
