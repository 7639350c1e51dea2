//! Spatial judge: asks a chat model which candidate a positional hint
//! ("西北角", "对面", "往东走100米") most likely refers to.

use std::collections::HashMap;

use addrgeo_core::{AuxiliaryJudge, Candidate, CollaboratorError, Location};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::chat::{strip_code_fence, ChatClient};
use crate::error::LlmError;

/// [`AuxiliaryJudge`] backed by a JSON-mode chat completion.
pub struct ChatJudge {
    client: ChatClient,
}

impl ChatJudge {
    #[must_use]
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Scores every candidate against `hint` relative to `anchor`.
    ///
    /// A reply that is not a JSON object is logged and yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the chat call itself fails.
    pub async fn score(
        &self,
        anchor: &Location,
        candidates: &[Candidate],
        hint: &str,
    ) -> Result<HashMap<String, f64>, LlmError> {
        let reply = self.client.complete(&build_prompt(anchor, candidates, hint)).await?;
        let scores = parse_score_map(&reply);
        tracing::info!(hint, candidates = candidates.len(), scored = scores.len(), "auxiliary scores");
        Ok(scores)
    }
}

#[async_trait]
impl AuxiliaryJudge for ChatJudge {
    async fn judge(
        &self,
        anchor: &Location,
        candidates: &[Candidate],
        hint: &str,
    ) -> Result<HashMap<String, f64>, CollaboratorError> {
        Ok(self.score(anchor, candidates, hint).await?)
    }
}

#[must_use]
pub fn build_prompt(anchor: &Location, candidates: &[Candidate], hint: &str) -> String {
    let poi_list: Vec<Value> = candidates
        .iter()
        .map(|c| {
            let mut entry = Map::new();
            entry.insert(c.name.clone(), Value::String(c.location.clone()));
            Value::Object(entry)
        })
        .collect();
    let poi_list = serde_json::to_string_pretty(&poi_list).unwrap_or_else(|_| "[]".to_string());

    format!(
        "已知参考点坐标为 {anchor}，用户描述为“{hint}”，\n\
         下列是候选 POI 的名称和经纬度，请你判断哪个最可能是用户所指的目标，并为每个候选项打一个匹配分数（0-100）。\n\
         输出格式如下（JSON）：\n\
         {{\n  \"名称1\": 85,\n  \"名称2\": 20,\n  ...\n}}\n\
         候选列表：\n{poi_list}\n\
         请严格按照 JSON 格式返回：\n"
    )
}

/// Reads a `{name: score}` object. Scores may be numbers or numeric strings;
/// anything else is skipped.
#[must_use]
pub fn parse_score_map(reply: &str) -> HashMap<String, f64> {
    let parsed = serde_json::from_str::<Value>(strip_code_fence(reply));
    let Ok(Value::Object(map)) = parsed else {
        tracing::warn!(reply, "judge reply is not a JSON object, scoring all candidates 0");
        return HashMap::new();
    };

    map.into_iter()
        .filter_map(|(name, value)| {
            let score = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }?;
            score.is_finite().then_some((name, score))
        })
        .collect()
}
