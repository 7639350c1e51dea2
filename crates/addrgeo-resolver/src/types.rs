use addrgeo_core::{AdminMetadata, Candidate, StructuredFields};
use serde::Serialize;

/// Where the winning record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// The private gazetteer.
    Custom,
    /// The external place-search provider.
    Poi,
}

/// A candidate with its per-call scores. Values are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Text similarity after penalties, 0–100.
    pub similarity: f64,
    /// Spatial judge score, 0–100.
    pub auxiliary: f64,
    /// Fused ranking score.
    pub score: f64,
}

/// The enriched winner of one resolution call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    #[serde(flatten)]
    pub winner: ScoredCandidate,
    pub lng: f64,
    pub lat: f64,
    /// Administrative metadata around the winner. Empty for gazetteer hits.
    pub regeo: AdminMetadata,
    /// Elapsed seconds, two decimals.
    pub duration: f64,
    pub source: ResultSource,
    /// Structured fields, present when structuring ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<StructuredFields>,
    /// The `AP` anchor-point text, present when structuring ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ap: Option<String>,
}

/// Why a resolution produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    /// Every stage came back empty.
    NoCandidates,
    /// The selected candidate's location is not a `"lng,lat"` pair.
    InvalidLocation,
    /// The selected candidate scored zero.
    ZeroScore,
}

impl std::fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoMatchReason::NoCandidates => write!(f, "no candidates"),
            NoMatchReason::InvalidLocation => write!(f, "invalid location"),
            NoMatchReason::ZeroScore => write!(f, "zero score"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(Box<ResolutionResult>),
    NoMatch(NoMatchReason),
}

impl Resolution {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }

    #[must_use]
    pub fn result(&self) -> Option<&ResolutionResult> {
        match self {
            Resolution::Matched(result) => Some(result),
            Resolution::NoMatch(_) => None,
        }
    }

    /// The result as a JSON object; `{}` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the result cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Resolution::Matched(result) => serde_json::to_value(result),
            Resolution::NoMatch(_) => Ok(serde_json::Value::Object(serde_json::Map::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolutionResult {
        ResolutionResult {
            winner: ScoredCandidate {
                candidate: Candidate::new("B0FFG", "北苑家园", "朝阳区北苑小街8号", "116.43,40.03"),
                similarity: 88.5,
                auxiliary: 0.0,
                score: 61.95,
            },
            lng: 116.43,
            lat: 40.03,
            regeo: AdminMetadata::default(),
            duration: 0.42,
            source: ResultSource::Poi,
            fields: None,
            ap: Some("北苑小街8号院".into()),
        }
    }

    #[test]
    fn matched_serializes_flat() {
        let json = Resolution::Matched(Box::new(sample())).to_json().unwrap();
        assert_eq!(json["id"], "B0FFG");
        assert_eq!(json["name"], "北苑家园");
        assert_eq!(json["location"], "116.43,40.03");
        assert_eq!(json["score"], 61.95);
        assert_eq!(json["source"], "poi");
        assert_eq!(json["ap"], "北苑小街8号院");
        assert!(json.get("fields").is_none());
        assert!(json.get("auxiliary_score").is_none());
    }

    #[test]
    fn no_match_serializes_empty() {
        let resolution = Resolution::NoMatch(NoMatchReason::ZeroScore);
        assert!(!resolution.is_match());
        assert!(resolution.result().is_none());
        assert_eq!(resolution.to_json().unwrap(), serde_json::json!({}));
    }
}
