//! Structuring through a fine-tuned model behind text-generation-inference.
//!
//! The model answers with a run of XML-like tags, e.g.
//! `<prov>上海市</prov><district>徐汇区</district><road>宛平南路</road>`.

use std::sync::LazyLock;
use std::time::Duration;

use addrgeo_core::{CollaboratorError, RawTags, StructuredExtractor};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

const SERVICE: &str = "tgi";

const MAX_NEW_TOKENS: u32 = 256;

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z0-9_]+)>").expect("valid regex"));

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    do_sample: bool,
    temperature: f64,
    top_p: f64,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generated_text: String,
}

/// [`StructuredExtractor`] backed by a TGI `/generate` endpoint.
pub struct TagExtractor {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl TagExtractor {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str, token: Option<&str>, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/generate", base_url.trim_end_matches('/')),
            token: token.filter(|t| !t.is_empty()).map(str::to_owned),
        })
    }

    /// Runs greedy generation on `prompt` and returns the new text only.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport failure, a non-2xx status or an
    /// unparseable body.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens: MAX_NEW_TOKENS,
                do_sample: false,
                temperature: 0.0,
                top_p: 1.0,
                return_full_text: false,
            },
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(LlmError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| LlmError::Malformed {
            service: SERVICE,
            reason: format!("generate response parse error: {e}"),
        })?;
        Ok(body.generated_text.trim().to_string())
    }
}

#[async_trait]
impl StructuredExtractor for TagExtractor {
    async fn extract(&self, raw_address: &str) -> Result<RawTags, CollaboratorError> {
        let text = self.generate(&build_prompt(raw_address)).await?;
        let tags = parse_tag_text(&text);
        tracing::debug!(address = raw_address, output = text.as_str(), tags = tags.len(), "tagged address");
        Ok(tags)
    }
}

/// The instruction format the tagging model was fine-tuned on.
#[must_use]
pub fn build_prompt(raw_address: &str) -> String {
    format!("从以下地址文本中抽取要素，并按XML标签输出（只输出标签串）：\n\n### 输入：{raw_address}\n### 输出： ")
}

/// Collects `<tag>value</tag>` runs in order.
///
/// A repeated tag gains extra values; an identical repeat is dropped. Text
/// outside tags and unclosed tags are ignored.
#[must_use]
pub fn parse_tag_text(text: &str) -> RawTags {
    let mut tags = RawTags::new();
    let mut pos = 0;

    while let Some(open) = OPEN_TAG_RE.captures_at(text, pos) {
        let (whole, name) = match (open.get(0), open.get(1)) {
            (Some(whole), Some(name)) => (whole, name.as_str()),
            _ => break,
        };
        let close = format!("</{name}>");
        match text[whole.end()..].find(&close) {
            Some(offset) => {
                let value = text[whole.end()..whole.end() + offset].trim();
                tags.push(name, value);
                pos = whole.end() + offset + close.len();
            }
            None => pos = whole.end(),
        }
    }
    tags
}
