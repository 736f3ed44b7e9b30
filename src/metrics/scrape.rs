use super::parse::{parse, Sample};
use crate::client::Options;
use crate::error::CliError;
use std::time::Duration;
use tracing::debug;

/// Fetches the metrics document from a server.
#[derive(Debug, Clone)]
pub struct MetricsScraper {
    client: reqwest::Client,
    url: String,
}

impl MetricsScraper {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CliError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CliError::Metrics(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Scraper for `options.metrics_url()`.
    pub fn from_options(options: &Options) -> Result<Self, CliError> {
        Self::new(options.metrics_url(), options.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw response body.
    pub async fn fetch(&self) -> Result<String, CliError> {
        debug!(url = %self.url, "Scraping metrics");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CliError::Metrics(format!("Failed to reach {}: {}", self.url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CliError::Metrics(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }
        response
            .text()
            .await
            .map_err(|e| CliError::Metrics(format!("Failed to read response body: {}", e)))
    }

    pub async fn samples(&self) -> Result<Vec<Sample>, CliError> {
        Ok(parse(&self.fetch().await?))
    }
}
