use super::oracle::SearchOracle;
use crate::config::Config;
use crate::error::{LeadError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: u64 = 10;
const READ_TIMEOUT: u64 = 30;
const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;
const API_KEY_HEADER: &str = "x-goog-api-key";
const FALLBACK_ERROR: &str = "An unexpected error occurred while searching.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Gemini `generateContent` client used as the search oracle.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: u64,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|_| LeadError::ConfigInvalid("API key contains invalid header characters".into()))?;
        let agent = HeaderValue::from_str(&format!("maps-lead-finder/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|e| LeadError::ConfigInvalid(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.trim().trim_start_matches("models/").to_string(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one instruction and collects the streamed reply text.
    pub async fn generate(&self, instruction: &str, map_grounding: bool) -> Result<String> {
        let url = format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, self.model);
        let mut payload = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": instruction }] },
            ],
        });
        if map_grounding {
            payload["tools"] = serde_json::json!([{ "googleMaps": {} }]);
        }

        debug!("Calling {} (map grounding: {})", self.model, map_grounding);
        self.stream_request(&url, &payload).await
    }

    pub async fn test_connection(&self) -> ConnectionTestResult {
        let url = format!("{}/models", self.base_url);
        let start = Instant::now();

        match self.client.get(&url).send().await {
            Ok(resp) => {
                let elapsed = start.elapsed().as_millis() as u64;
                let status = resp.status();

                if status.is_success() {
                    match resp.json::<Value>().await {
                        Ok(v) => ConnectionTestResult {
                            status: "success".into(),
                            response_time_ms: Some(elapsed),
                            model_count: v.get("models").and_then(|d| d.as_array()).map(|a| a.len()),
                            error_code: None,
                            message: Some(format!("OK (HTTP {})", status.as_u16())),
                        },
                        Err(e) => ConnectionTestResult {
                            status: "error".into(),
                            response_time_ms: Some(elapsed),
                            model_count: None,
                            error_code: Some("PARSE_ERROR".into()),
                            message: Some(e.to_string()),
                        },
                    }
                } else {
                    let code = status.as_u16();
                    ConnectionTestResult {
                        status: "error".into(),
                        response_time_ms: Some(elapsed),
                        model_count: None,
                        error_code: Some(classify_status(code)),
                        message: Some(format!("HTTP {}", code)),
                    }
                }
            }
            Err(e) => ConnectionTestResult {
                status: "error".into(),
                response_time_ms: None,
                model_count: None,
                error_code: Some(if e.is_timeout() { "TIMEOUT" } else if e.is_connect() { "CONNECTION_FAILURE" } else { "NETWORK_ERROR" }.into()),
                message: Some(e.to_string()),
            },
        }
    }

    async fn stream_request(&self, url: &str, payload: &Value) -> Result<String> {
        let mut resp = self.client.post(url).json(payload).send().await.map_err(|e| self.map_err(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LeadError::Api { status, message: api_message(&body) });
        }

        let mut content = String::new();
        let mut buffer = Vec::new();
        let mut finished = false;

        loop {
            let chunk = tokio::time::timeout(Duration::from_secs(READ_TIMEOUT), resp.chunk())
                .await
                .map_err(|_| LeadError::Timeout(READ_TIMEOUT))?
                .map_err(|e| self.map_err(e))?;

            let Some(data) = chunk else { break };
            buffer.extend_from_slice(&data);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                apply_event_line(line.trim(), &mut content, &mut finished)?;
            }
        }

        // Final event without a trailing newline.
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).to_string();
            apply_event_line(line.trim(), &mut content, &mut finished)?;
        }

        if !finished { warn!("Stream ended without a finish reason"); }
        Ok(content)
    }

    fn map_err(&self, e: reqwest::Error) -> LeadError {
        if e.is_timeout() { LeadError::Timeout(self.request_timeout) } else { LeadError::Http(e) }
    }
}

impl SearchOracle for GeminiClient {
    async fn ask(&self, instruction: &str, map_grounding: bool) -> Result<String> {
        self.generate(instruction, map_grounding).await
    }
}

/// Folds one SSE line into `content`. Fails once the reply outgrows the size cap.
fn apply_event_line(line: &str, content: &mut String, finished: &mut bool) -> Result<()> {
    if line.is_empty() || line.starts_with(':') { return Ok(()); }
    let Some(data) = line.strip_prefix("data:") else { return Ok(()) };
    let data = data.trim();
    if data.is_empty() { return Ok(()); }

    let Ok(v) = serde_json::from_str::<Value>(data) else {
        debug!("Skipping non-JSON stream event");
        return Ok(());
    };

    if let Some(err) = v.get("error") {
        let status = err.get("code")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(500);
        return Err(LeadError::Api { status, message: error_message(err) });
    }

    if let Some(candidates) = v.get("candidates").and_then(|c| c.as_array()) {
        for candidate in candidates {
            if candidate.get("finishReason").is_some() {
                *finished = true;
            }
            let parts = candidate.get("content").and_then(|c| c.get("parts")).and_then(|p| p.as_array());
            for part in parts.into_iter().flatten() {
                if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                    if content.len() + text.len() > MAX_CONTENT_BYTES {
                        warn!("Reply exceeded {} bytes, aborting", MAX_CONTENT_BYTES);
                        return Err(LeadError::ResponseTooLarge(MAX_CONTENT_BYTES));
                    }
                    content.push_str(text);
                }
            }
        }
    }
    Ok(())
}

/// Provider message from an error body, else the raw body, else a fallback.
fn api_message(body: &str) -> String {
    let body = body.trim();
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        // Streaming endpoints wrap errors in a one-element array.
        let err = v.get("error").or_else(|| v.get(0).and_then(|first| first.get("error")));
        if let Some(err) = err {
            return error_message(err);
        }
    }
    if body.is_empty() { FALLBACK_ERROR.into() } else { body.to_string() }
}

fn error_message(err: &Value) -> String {
    err.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_ERROR)
        .to_string()
}

fn classify_status(code: u16) -> String {
    match code {
        401 | 403 => "AUTH_ERROR",
        404 => "NOT_FOUND",
        429 => "RATE_LIMIT",
        500..=599 => "SERVER_ERROR",
        _ => "HTTP_ERROR",
    }.into()
}
