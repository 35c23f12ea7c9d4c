//! HTTP fetcher: one round trip per page request
//!
//! Thin by design. Every failure mode (non-success status, timeout,
//! transport error) maps to a typed error carrying the target description,
//! and the orchestrator treats them all the same way at the task boundary.

use crate::requests::{Method, PageRequest};
use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;

/// Builds the shared HTTP client used by every worker
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("dges-harvester/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one page request and returns the raw body
pub async fn fetch_page(client: &Client, request: &PageRequest) -> Result<String, HarvestError> {
    let builder = match request.method {
        Method::Get => client.get(request.url.clone()),
        Method::Post => client.post(request.url.clone()).form(&request.form),
    };

    let response = builder.send().await.map_err(|source| {
        if source.is_timeout() {
            HarvestError::Timeout {
                target: request.target.clone(),
            }
        } else {
            HarvestError::Http {
                target: request.target.clone(),
                source,
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Status {
            target: request.target.clone(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| HarvestError::Http {
        target: request.target.clone(),
        source,
    })
}
