//! OpenAI-compatible chat-completion client (DashScope compatible mode by
//! default).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

const SERVICE: &str = "chat";

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

const SYSTEM_PROMPT: &str = "你是一个中文地理信息分析助手";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f64,
    top_p: f64,
    seed: u64,
    response_format: ResponseFormat,
    /// DashScope extension; reasoning output would break JSON parsing.
    enable_thinking: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Deterministic, JSON-mode chat completions.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    /// Creates a client for the default compatible-mode endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: Option<&str>, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client for any OpenAI-compatible base URL.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.map(str::to_owned),
            model: model.to_owned(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` as the user turn and returns the trimmed reply text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] on transport failure, [`LlmError::Status`]
    /// on a non-2xx reply, [`LlmError::Malformed`] when the body is not a
    /// chat completion and [`LlmError::EmptyResponse`] when it has no text.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            top_p: 1.0,
            seed: 42,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            enable_thinking: false,
        };

        let started = std::time::Instant::now();
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| LlmError::Malformed {
            service: SERVICE,
            reason: format!("chat completion parse error: {e}"),
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse { service: SERVICE })?;

        tracing::debug!(
            model = self.model.as_str(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "chat completion finished"
        );
        Ok(content)
    }
}

/// Strips a Markdown code fence (```` ```json … ``` ````) wrapped around a
/// model reply, if any.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fence_handles_plain_and_fenced_text() {
        assert_eq!(strip_code_fence(" {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn chat_url_appends_completions_path() {
        let client = ChatClient::with_base_url(None, "qwen-plus", 5, "http://llm.local/v1/").unwrap();
        assert_eq!(client.url, "http://llm.local/v1/chat/completions");
        assert_eq!(client.model(), "qwen-plus");
    }
}
