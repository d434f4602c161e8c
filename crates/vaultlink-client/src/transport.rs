//! Shared HTTP plumbing

use crate::{ClientError, Config, Result};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use tracing::debug;

/// Configured HTTP client bound to one gateway
pub(crate) struct Transport {
    config: Config,
    http: Client,
}

impl Transport {
    pub(crate) fn new(config: Config) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(ClientError::Config("endpoint must not be empty".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ClientError::Config("invalid user agent".to_string()))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { config, http })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Start a request to `path`, authenticated when a token is configured
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url(), path);
        debug!("Sending {} request to {}", method, path);
        let req = self.http.request(method, url);
        match &self.config.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send and turn non-success statuses into [`ClientError::Api`]
    pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), &text));
        }
        Ok(response)
    }
}
