// GraphQL reading source implementation
use crate::application::reading_source::{RangePage, RawReading, ReadingSource};
use crate::domain::error::DashboardError;
use crate::domain::reading::Reading;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const LATEST_QUERY: &str = r#"
  query LatestDadosParque($device: String!) {
    latestDadosParque(device: $device) {
      device
      timestamp
      registers { TEMP VOLTAGE CURRENT FREQUENCY POWER }
    }
  }
"#;

const BY_PERIOD_QUERY: &str = r#"
  query DadosParqueByPeriod($device: String!, $from: Int!, $to: Int!, $limit: Int, $nextToken: String) {
    dadosParqueByPeriod(device: $device, from: $from, to: $to, limit: $limit, nextToken: $nextToken) {
      items {
        timestamp
        registers { TEMP VOLTAGE CURRENT FREQUENCY POWER }
      }
      nextToken
    }
  }
"#;

#[derive(Debug, Clone)]
pub struct GraphqlReadingSource {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LatestData {
    #[serde(rename = "latestDadosParque")]
    latest: Option<RawReading>,
}

#[derive(Debug, Deserialize)]
struct ByPeriodData {
    #[serde(rename = "dadosParqueByPeriod")]
    page: Option<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    items: Vec<RawReading>,
    #[serde(rename = "nextToken", default)]
    next_token: Option<String>,
}

impl GraphqlReadingSource {
    /// Every request is bounded by `timeout`; an expired request counts as unavailable.
    pub fn new(endpoint: String, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, DashboardError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.token {
            request = request.header("Authorization", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DashboardError::SourceUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body = response
            .json::<GraphqlResponse<T>>()
            .await
            .map_err(|e| DashboardError::SourceUnavailable(format!("bad response: {}", e)))?;

        unwrap_response(body)
    }
}

fn classify_status(status: StatusCode, body: &str) -> DashboardError {
    let message = format!("status {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DashboardError::Unauthorized(message),
        _ => DashboardError::SourceUnavailable(message),
    }
}

fn unwrap_response<T>(response: GraphqlResponse<T>) -> Result<T, DashboardError> {
    if let Some(error) = response.errors.first() {
        let lowered = error.message.to_lowercase();
        if lowered.contains("unauthorized") || lowered.contains("not authorized") {
            return Err(DashboardError::Unauthorized(error.message.clone()));
        }
        return Err(DashboardError::SourceUnavailable(error.message.clone()));
    }

    response
        .data
        .ok_or_else(|| DashboardError::SourceUnavailable("response without data".to_string()))
}

#[async_trait]
impl ReadingSource for GraphqlReadingSource {
    async fn get_latest(&self, device: &str) -> Result<Option<Reading>, DashboardError> {
        let data: LatestData = self
            .execute(LATEST_QUERY, json!({ "device": device }))
            .await?;

        let reading = data.latest.and_then(|raw| raw.normalize(device));
        tracing::debug!(
            "Latest reading for {}: {:?}",
            device,
            reading.as_ref().map(|r| r.timestamp)
        );
        Ok(reading)
    }

    async fn get_range(
        &self,
        device: &str,
        from: i64,
        to: i64,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RangePage, DashboardError> {
        let variables = json!({
            "device": device,
            "from": from,
            "to": to,
            "limit": limit,
            "nextToken": cursor,
        });
        let data: ByPeriodData = self.execute(BY_PERIOD_QUERY, variables).await?;

        Ok(data
            .page
            .map(|page| RangePage {
                items: page.items,
                next_cursor: page.next_token,
            })
            .unwrap_or_default())
    }
}
