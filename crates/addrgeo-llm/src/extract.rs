//! Structuring through a chat model that answers with a JSON object of tags.

use std::path::Path;

use addrgeo_core::{CollaboratorError, RawTags, StructuredExtractor};
use async_trait::async_trait;
use serde_json::Value;

use crate::chat::{strip_code_fence, ChatClient};
use crate::error::LlmError;

/// Instruction prepended to the raw address when no template file is
/// configured.
pub const DEFAULT_STRUCT_PROMPT: &str = "\
请将下面的中文地址拆解为结构化要素，只输出一个 JSON 对象，不要输出任何解释。
可用的键（没有的要素不要输出）：
- prov：省份；city：城市
- district：区县；devzone：开发区；town：乡镇或街道；community：社区或村
- road：道路；roadno：门牌号；poi：兴趣点名称；subpoi：子兴趣点；intersection：路口
- houseno：楼栋号；cellno：单元号；floorno：楼层；roomno：房间号
- assist：方位或辅助描述（如“西北角”“对面”）；distance：距离；direction：方向
- poitype：兴趣点类型
同一键有多个值时输出字符串数组。
地址：";

/// [`StructuredExtractor`] backed by a JSON-mode chat completion.
pub struct ChatExtractor {
    client: ChatClient,
    prompt: String,
}

impl ChatExtractor {
    #[must_use]
    pub fn new(client: ChatClient, prompt: impl Into<String>) -> Self {
        Self {
            client,
            prompt: prompt.into(),
        }
    }

    #[must_use]
    pub fn with_default_prompt(client: ChatClient) -> Self {
        Self::new(client, DEFAULT_STRUCT_PROMPT)
    }

    /// Reads a prompt template from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Prompt`] if the file cannot be read.
    pub fn load_prompt(path: &Path) -> Result<String, LlmError> {
        std::fs::read_to_string(path).map_err(|source| LlmError::Prompt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Structures `raw_address` into ordered tags.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the chat call fails or its reply is not a
    /// JSON object.
    pub async fn extract_tags(&self, raw_address: &str) -> Result<RawTags, LlmError> {
        let reply = self
            .client
            .complete(&format!("{}{raw_address}", self.prompt))
            .await?;
        let tags = parse_json_tags(&reply)?;
        tracing::debug!(address = raw_address, tags = tags.len(), "structured address");
        Ok(tags)
    }
}

#[async_trait]
impl StructuredExtractor for ChatExtractor {
    async fn extract(&self, raw_address: &str) -> Result<RawTags, CollaboratorError> {
        Ok(self.extract_tags(raw_address).await?)
    }
}

/// Parses a JSON-object reply into tags, keeping key order.
///
/// String values become one tag value each; lists contribute every scalar
/// element. Nulls, objects and empty strings are skipped.
///
/// # Errors
///
/// Returns [`LlmError::Malformed`] if the reply is not a JSON object.
pub fn parse_json_tags(reply: &str) -> Result<RawTags, LlmError> {
    let body = strip_code_fence(reply);
    let value: Value = serde_json::from_str(body).map_err(|e| LlmError::Malformed {
        service: "chat",
        reason: format!("reply is not JSON: {e}"),
    })?;
    let Value::Object(map) = value else {
        return Err(LlmError::Malformed {
            service: "chat",
            reason: "reply is not a JSON object".to_string(),
        });
    };

    let mut tags = RawTags::new();
    for (tag, value) in &map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        tags.push(tag.as_str(), text);
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    tags.push(tag.as_str(), text);
                }
            }
        }
    }
    Ok(tags)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
