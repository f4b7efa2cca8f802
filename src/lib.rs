pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::HttpLookupClient;
pub use crate::config::TomlConfig;
pub use crate::core::{
    engine::LookupEngine, store::ResultStore, ConfigProvider, EngineStats, LookupClient,
    LookupResult, QueryId,
};
pub use crate::utils::error::{RelayError, Result};
