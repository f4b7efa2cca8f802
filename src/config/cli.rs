use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "lookup-relay")]
#[command(about = "Fan search queries out to a lookup service and collect the address lines")]
pub struct CliConfig {
    /// Queries to submit; read one per line from stdin when omitted
    pub queries: Vec<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub api_endpoint: Option<String>,

    #[arg(long, env = "LOOKUP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Concurrent lookups allowed; 0 removes the limit
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    #[arg(long)]
    pub poll_timeout_seconds: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Loads the config file (or defaults) and applies command line overrides.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(endpoint) = &self.api_endpoint {
            config.service.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.api_key {
            config.service.api_key = Some(key.clone());
        }
        if let Some(max_in_flight) = self.max_in_flight {
            config.dispatch.max_in_flight = max_in_flight;
        }
        if let Some(timeout) = self.poll_timeout_seconds {
            config.poll.timeout_seconds = timeout;
        }

        Ok(config)
    }
}
