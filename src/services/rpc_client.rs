//! Client for the `exec_sql` remote procedure.
//!
//! The procedure is reached through the PostgREST RPC route
//! (`POST /rest/v1/rpc/exec_sql`) with the SQL text as its only argument.
//! Responses are classified into [`ExecResponse`] so callers never look at
//! HTTP details.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::MigrateResult;
use crate::models::ExecResponse;

/// HTTP connect timeout, capped by the configured request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgREST: function not found in the schema cache.
const PGRST_FUNCTION_NOT_FOUND: &str = "PGRST202";

/// Postgres: undefined_function.
const PG_UNDEFINED_FUNCTION: &str = "42883";

/// Something that can execute SQL text on the target database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Submit `sql` verbatim and classify the result.
    ///
    /// Transport failures are errors; anything the service answered with is an
    /// [`ExecResponse`].
    async fn exec_sql(&self, sql: &str) -> MigrateResult<ExecResponse>;
}

#[async_trait]
impl<'a, T> SqlExecutor for &'a T
where
    T: SqlExecutor + ?Sized,
{
    async fn exec_sql(&self, sql: &str) -> MigrateResult<ExecResponse> {
        (**self).exec_sql(sql).await
    }
}

/// Request body for `exec_sql`.
#[derive(serde::Serialize)]
struct ExecSqlRequest<'a> {
    sql: &'a str,
}

/// Error body returned by PostgREST.
#[derive(Debug, Default, serde::Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// `exec_sql` over HTTP.
#[derive(Clone)]
pub struct RestRpcClient {
    rpc_url: Url,
    credential: SecretString,
    http_client: reqwest::Client,
}

impl RestRpcClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> MigrateResult<Self> {
        let rpc_url = config.rpc_url()?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .build()?;

        info!(
            "exec_sql client initialized (url={}, access={}, timeout={:?})",
            rpc_url, config.access, config.timeout
        );

        Ok(Self {
            rpc_url,
            credential: config.credential.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl SqlExecutor for RestRpcClient {
    async fn exec_sql(&self, sql: &str) -> MigrateResult<ExecResponse> {
        let key = self.credential.expose_secret();

        debug!("POST {} ({} bytes of SQL)", self.rpc_url, sql.len());

        let response = self
            .http_client
            .post(self.rpc_url.clone())
            .header("apikey", key)
            .bearer_auth(key)
            .json(&ExecSqlRequest { sql })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!("exec_sql responded with HTTP {}", status);

        Ok(classify_response(status, &body))
    }
}

/// Classify an `exec_sql` HTTP response.
///
/// Many `exec_sql` definitions trap exceptions and return `{"error": ...}`
/// with a 200, so a success status alone is not enough.
pub fn classify_response(status: u16, body: &str) -> ExecResponse {
    if (200..300).contains(&status) {
        let value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(body)
                .unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
        };

        return match value.get("error") {
            Some(error) if !error.is_null() => ExecResponse::Failed(error_text(error)),
            _ => ExecResponse::Ok(value),
        };
    }

    let parsed = serde_json::from_str::<PostgrestError>(body).ok();

    let code = parsed.as_ref().and_then(|e| e.code.as_deref());
    if matches!(code, Some(PGRST_FUNCTION_NOT_FOUND | PG_UNDEFINED_FUNCTION)) || status == 404 {
        let message = parsed
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| format!("HTTP {}: exec_sql not found", status));
        return ExecResponse::ProcedureMissing(message);
    }

    match parsed {
        Some(error) if error.message.is_some() => ExecResponse::Failed(render_error(&error)),
        _ => {
            let text = body.trim();
            if text.is_empty() {
                ExecResponse::Failed(format!("HTTP {}", status))
            } else {
                ExecResponse::Failed(format!("HTTP {}: {}", status, text))
            }
        }
    }
}

/// Render a PostgREST error as one line.
fn render_error(error: &PostgrestError) -> String {
    let mut text = error.message.clone().unwrap_or_default();
    if let Some(code) = &error.code {
        text.push_str(&format!(" [{}]", code));
    }
    if let Some(details) = error.details.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("; details: {}", details));
    }
    if let Some(hint) = error.hint.as_deref().filter(|h| !h.is_empty()) {
        text.push_str(&format!("; hint: {}", hint));
    }
    text
}

/// Text of an `error` field returned inside a success body.
fn error_text(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
