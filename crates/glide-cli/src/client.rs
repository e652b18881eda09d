//! HTTP client for the route planning server.

use anyhow::{Context, Result};
use glide_core::{PlanResponse, RoutePlanRequest};

/// Client for a glide server.
pub struct GlideClient {
    base_url: String,
    client: reqwest::Client,
}

impl GlideClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Submit a route request.
    ///
    /// Failure envelopes come back as `Ok`; only transport problems and
    /// bodies that are not an envelope at all are errors.
    pub async fn plan(&self, request: &RoutePlanRequest) -> Result<PlanResponse> {
        let url = format!("{}/v1/routes/plan", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        let status = response.status();
        let body = response.text().await.context("failed to read response body")?;
        serde_json::from_str(&body).with_context(|| {
            format!("unexpected response from server ({}): {}", status, body)
        })
    }
}
