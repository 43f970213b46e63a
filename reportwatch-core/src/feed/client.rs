//! HTTP client for the report log endpoints
//!
//! Both endpoints are cursor-paginated: the client sends `from_line` and the
//! backend answers with every line at or after that offset.
//!
//! ```text
//! GET {base_url}/api/report/{report_id}/agent-log?from_line=N
//! GET {base_url}/api/report/{report_id}/console-log?from_line=N
//!
//! {"success": true, "data": {"logs": [...], "from_line": N}}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::types::{LogEntry, StreamKind};

use super::source::{LogPage, LogSource};

/// Response envelope shared by both log endpoints
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<LogsData>,
    #[serde(default)]
    error: Option<String>,
}

/// Payload of a successful log response
#[derive(Debug, Deserialize)]
struct LogsData {
    #[serde(default)]
    logs: Vec<serde_json::Value>,
    #[serde(default)]
    from_line: u64,
}

/// HTTP client for the report backend
pub struct ReportClient {
    http_client: reqwest::Client,
    base_url: String,
    agent_log_path: String,
    console_log_path: String,
}

impl ReportClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            agent_log_path: config.agent_log_path.clone(),
            console_log_path: config.console_log_path.clone(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request URL for one stream
    pub fn stream_url(&self, stream: StreamKind, report_id: &str, from_line: u64) -> String {
        let template = match stream {
            StreamKind::Agent => &self.agent_log_path,
            StreamKind::Console => &self.console_log_path,
        };
        let path = template.replace("{report_id}", &urlencoding::encode(report_id));
        format!("{}{}?from_line={}", self.base_url, path, from_line)
    }

    /// Fetch agent log entries starting at `from_line`
    pub async fn fetch_agent_log(
        &self,
        report_id: &str,
        from_line: u64,
    ) -> Result<LogPage<LogEntry>> {
        let data = self
            .get_logs(StreamKind::Agent, report_id, from_line)
            .await?;
        Ok(decode_agent_logs(data))
    }

    /// Fetch console log lines starting at `from_line`
    pub async fn fetch_console_log(
        &self,
        report_id: &str,
        from_line: u64,
    ) -> Result<LogPage<String>> {
        let data = self
            .get_logs(StreamKind::Console, report_id, from_line)
            .await?;
        Ok(decode_console_logs(data))
    }

    async fn get_logs(&self, stream: StreamKind, report_id: &str, from_line: u64) -> Result<LogsData> {
        let url = self.stream_url(stream, report_id, from_line);

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Endpoint {
                stream: stream.to_string(),
                message: format!("HTTP {}: {}", status, error_text),
            });
        }

        let body = response.text().await?;
        parse_envelope(stream, &body)
    }
}

#[async_trait]
impl LogSource for ReportClient {
    async fn agent_log(&self, report_id: &str, from_line: u64) -> Result<LogPage<LogEntry>> {
        self.fetch_agent_log(report_id, from_line).await
    }

    async fn console_log(&self, report_id: &str, from_line: u64) -> Result<LogPage<String>> {
        self.fetch_console_log(report_id, from_line).await
    }
}

/// Parse a response body, turning `success: false` into an error
fn parse_envelope(stream: StreamKind, body: &str) -> Result<LogsData> {
    let envelope: Envelope = serde_json::from_str(body)?;

    if !envelope.success {
        return Err(Error::Endpoint {
            stream: stream.to_string(),
            message: envelope
                .error
                .unwrap_or_else(|| "success=false".to_string()),
        });
    }

    envelope.data.ok_or_else(|| Error::Endpoint {
        stream: stream.to_string(),
        message: "response has no data".to_string(),
    })
}

/// Decode agent log lines, dropping (but counting) lines that are not entries
fn decode_agent_logs(data: LogsData) -> LogPage<LogEntry> {
    let line_count = data.logs.len() as u64;
    let mut items = Vec::with_capacity(data.logs.len());

    for (offset, raw) in data.logs.into_iter().enumerate() {
        match serde_json::from_value::<LogEntry>(raw) {
            Ok(entry) => items.push(entry),
            Err(e) => {
                tracing::warn!(
                    line = data.from_line + offset as u64,
                    error = %e,
                    "Skipping malformed agent log line"
                );
            }
        }
    }

    LogPage {
        from_line: data.from_line,
        items,
        line_count,
    }
}

/// Decode console log lines; non-string lines are kept in their JSON form
fn decode_console_logs(data: LogsData) -> LogPage<String> {
    let items: Vec<String> = data
        .logs
        .into_iter()
        .map(|raw| match raw {
            serde_json::Value::String(line) => line,
            other => other.to_string(),
        })
        .collect();

    LogPage::new(data.from_line, items)
}
