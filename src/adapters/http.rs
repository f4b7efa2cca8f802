use crate::core::{ConfigProvider, LookupClient, LookupResult};
use crate::utils::error::{RelayError, Result};
use reqwest::Client;

/// Lookup client for a search endpoint taking the query as `?q=`.
///
/// The API key, when set, is sent as the basic-auth user name with an empty password.
pub struct HttpLookupClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpLookupClient {
    pub fn new<P: ConfigProvider + ?Sized>(config: &P) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint().to_string(),
            api_key: config.api_key().map(str::to_string),
        })
    }
}

#[async_trait::async_trait]
impl LookupClient for HttpLookupClient {
    async fn lookup(&self, text: &str) -> Result<LookupResult> {
        tracing::debug!("Making API request to: {} (q={})", self.endpoint, text);

        let mut request = self.client.get(&self.endpoint).query(&[("q", text)]);
        if let Some(key) = &self.api_key {
            request = request.basic_auth(key, Some(""));
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        // Any non-2xx answer fails the query, whatever its body holds.
        if !status.is_success() {
            return Err(RelayError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let result = serde_json::from_slice(&body)?;
        Ok(result)
    }
}
