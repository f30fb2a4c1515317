//! Read-only connectivity check against the REST endpoint.

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::MigrateResult;
use crate::models::CheckOutcome;

/// Issues one GET against `/rest/v1/`, or one row of a table.
pub struct ConnectivityCheck {
    endpoint: Url,
    credential: SecretString,
    http_client: reqwest::Client,
}

impl ConnectivityCheck {
    pub fn new(config: &Config, table: Option<&str>) -> MigrateResult<Self> {
        let path = match table.map(str::trim).filter(|t| !t.is_empty()) {
            Some(table) => format!("{}?select=*&limit=1", urlencoding::encode(table)),
            None => String::new(),
        };
        let endpoint = config.rest_url(&path)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            endpoint,
            credential: config.credential.clone(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn run(&self) -> MigrateResult<CheckOutcome> {
        let key = self.credential.expose_secret();

        info!("Checking {}", self.endpoint);

        let response = self
            .http_client
            .get(self.endpoint.clone())
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!("connectivity check responded with HTTP {}", status);

        Ok(classify_check(status.as_u16(), &body))
    }
}

/// Classify the check response.
pub fn classify_check(status: u16, body: &str) -> CheckOutcome {
    if (200..300).contains(&status) {
        let rows = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.as_array().map(Vec::len));
        return CheckOutcome::Reachable { status, rows };
    }

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            let text = body.trim();
            if text.is_empty() {
                format!("HTTP {}", status)
            } else {
                text.to_string()
            }
        });

    CheckOutcome::Rejected { status, message }
}
