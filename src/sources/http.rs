use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::Source;
use crate::consts::USER_AGENT;

/// Fetches a URL with GET and returns the body as text. Non-2xx statuses
/// are errors.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// `request_timeout` bounds each request on its own, independent of the
    /// runner's overall timeout.
    pub fn new(request_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Source for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, target: &str) -> Result<String> {
        let response = self
            .client
            .get(target)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
