use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Thin JSON client for the remote scheduling service.
pub struct RestClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl RestClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.scheduling_api_url.trim_end_matches('/').to_string(),
            api_token: config.scheduling_api_token.clone(),
        })
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| anyhow!("Invalid API token header: {}", e))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    fn build(&self, method: Method, path: &str, body: Option<Value>) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers()?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        Ok(req)
    }

    async fn send_checked(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        let req = self.build(method, path, body)?;
        let response = self.send_checked(req).await?;

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn request_with_query<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T>
    where T: DeserializeOwned {
        let req = self.build(method, path, None)?.query(query);
        let response = self.send_checked(req).await?;

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Sends a request whose response body is irrelevant (PATCH/DELETE acks may be empty).
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        let req = self.build(method, path, body)?;
        self.send_checked(req).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
