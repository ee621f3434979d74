//! reqwest-backed control plane client

use super::{ResourceClient, ResourceSnapshot};
use crate::config::Config;
use crate::errors::{ErrorContext, LoadError, Result};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// HTTP client shared by every virtual user; reqwest pools connections internally
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    http_client: reqwest::Client,
    base_url: Url,
    headers: Vec<(String, String)>,
}

impl HttpResourceClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.target.timeout)
            .danger_accept_invalid_certs(config.target.insecure)
            .build()
            .with_transport_context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.target.url)?;

        Ok(Self {
            http_client,
            base_url,
            headers: config.custom_headers()?,
        })
    }

    fn build_request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.base_url.join(path)?;
        let mut request = self.http_client.request(method, url);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        Ok(request)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .with_transport_context("Control plane request failed")?;

        let status = response.status();
        debug!("Control plane replied {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoadError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn parse_snapshot(response: reqwest::Response) -> Result<ResourceSnapshot> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get(&self, path: &str) -> Result<ResourceSnapshot> {
        let request = self.build_request(Method::GET, path)?;
        let response = self.send(request).await?;
        Self::parse_snapshot(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ResourceSnapshot> {
        let request = self
            .build_request(Method::POST, path)?
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(body)?);
        let response = self.send(request).await?;
        Self::parse_snapshot(response).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = self.build_request(Method::DELETE, path)?;
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(LoadError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!("{} was already deleted", path);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
