use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{FindexError, Result};
use crate::models::FileRecord;

use super::prompt::{build_prompt, extract_content};

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix of every failure message shown to the user.
pub const FAILURE_PREFIX: &str = "analysis failed: ";

/// Settings for the remote chat-completions endpoint.
#[derive(Clone)]
pub struct AnalysisClientConfig {
    pub endpoint: String,
    pub model: String,
    /// Static bearer credential.
    pub api_key: String,
    pub connect_timeout: Duration,
    /// Bound on the whole request, response body included.
    pub request_timeout: Duration,
}

impl Default for AnalysisClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for AnalysisClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisClientConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Result of one analysis, ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Answer(String),
    Failure(String),
}

impl AnalysisOutcome {
    fn failed(detail: impl fmt::Display) -> Self {
        Self::Failure(format!("{FAILURE_PREFIX}{detail}"))
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::Failure(text) => text,
        }
    }
}

impl fmt::Display for AnalysisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Client for the remote text-generation endpoint. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct AnalysisClient {
    http: reqwest::Client,
    config: AnalysisClientConfig,
}

impl AnalysisClient {
    pub fn new(config: AnalysisClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisClientConfig {
        &self.config
    }

    /// Ask the endpoint about `record`. Never fails: every error comes back
    /// as [`AnalysisOutcome::Failure`].
    pub async fn analyze(&self, record: &FileRecord) -> AnalysisOutcome {
        match self.request(record).await {
            Ok(answer) => AnalysisOutcome::Answer(answer),
            Err(e) => {
                tracing::warn!(path = %record.full_path, error = %e, "analysis request failed");
                AnalysisOutcome::failed(describe(&e))
            }
        }
    }

    async fn request(&self, record: &FileRecord) -> Result<String> {
        let prompt = build_prompt(record);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            stream: false,
        };

        tracing::debug!(path = %record.full_path, endpoint = %self.config.endpoint, "sending analysis request");
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FindexError::Other(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet(&text)
            )));
        }
        extract_content(&text).ok_or_else(|| {
            FindexError::Other(format!("no content in response: {}", snippet(&text)))
        })
    }
}

fn describe(e: &FindexError) -> String {
    match e {
        FindexError::Http(err) if err.is_timeout() => "request timed out".to_string(),
        FindexError::Http(err) if err.is_connect() => format!("could not connect: {err}"),
        other => other.to_string(),
    }
}

fn snippet(text: &str) -> &str {
    const MAX: usize = 200;
    if text.len() <= MAX {
        return text;
    }
    let mut end = MAX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
