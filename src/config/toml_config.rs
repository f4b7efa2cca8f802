use crate::core::ConfigProvider;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{validate_positive_number, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.companieshouse.gov.uk/search/companies";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub queue_capacity: usize,
    pub results_capacity: usize,
    /// Concurrent lookups allowed; 0 removes the limit.
    pub max_in_flight: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 50,
            results_capacity: 20,
            max_in_flight: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            timeout_seconds: 30,
        }
    }
}

impl TomlConfig {
    /// Loads a config file; see [`TomlConfig::from_toml_str`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RelayError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("service.endpoint", &self.service.endpoint)?;
        validate_range("service.timeout_seconds", self.service.timeout_seconds, 1, 600)?;
        validate_positive_number("dispatch.queue_capacity", self.dispatch.queue_capacity, 1)?;
        validate_positive_number("dispatch.results_capacity", self.dispatch.results_capacity, 1)?;
        validate_range("poll.interval_ms", self.poll.interval_ms, 1, 60_000)?;
        validate_range("poll.timeout_seconds", self.poll.timeout_seconds, 1, 3_600)?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.service.endpoint
    }

    fn api_key(&self) -> Option<&str> {
        self.service
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_seconds)
    }

    fn queue_capacity(&self) -> usize {
        self.dispatch.queue_capacity
    }

    fn results_capacity(&self) -> usize {
        self.dispatch.results_capacity
    }

    fn max_in_flight(&self) -> Option<usize> {
        match self.dispatch.max_in_flight {
            0 => None,
            limit => Some(limit),
        }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll.timeout_seconds)
    }
}
