use std::path::PathBuf;
use std::time::Duration;

/// Which structuring backend turns raw text into tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// OpenAI-compatible chat completion returning a JSON object.
    Chat,
    /// Text-generation-inference `/generate` returning `<tag>value</tag>` runs.
    Tgi,
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractorKind::Chat => write!(f, "chat"),
            ExtractorKind::Tgi => write!(f, "tgi"),
        }
    }
}

/// Linear weights of the two similarity sub-scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub token: f64,
    pub structural: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            token: 1.0,
            structural: 0.0,
        }
    }
}

/// Knobs of the resolution cascade. Passed to the resolver at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Per-collaborator-call time budget.
    pub call_timeout: Duration,
    /// Minimum similarity for the nationwide fast match to short-circuit.
    pub fast_match_threshold: f64,
    /// Relaxed query variants only run while fewer candidates than this exist.
    pub min_candidates: usize,
    pub nearby_radius_m: u32,
    pub regeo_radius_m: u32,
    pub similarity: SimilarityWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(3_000),
            fast_match_threshold: 70.0,
            min_candidates: 3,
            nearby_radius_m: 5_000,
            regeo_radius_m: 100,
            similarity: SimilarityWeights::default(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub amap_key: String,
    pub amap_base_url: String,
    pub amap_max_retries: u32,
    pub amap_backoff_ms: u64,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub extractor: ExtractorKind,
    pub struct_llm_url: String,
    pub struct_llm_token: Option<String>,
    pub struct_prompt_path: Option<PathBuf>,
    pub gazetteer_path: Option<PathBuf>,
    pub log_level: String,
    pub pipeline: PipelineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("amap_key", &"[redacted]")
            .field("amap_base_url", &self.amap_base_url)
            .field("amap_max_retries", &self.amap_max_retries)
            .field("amap_backoff_ms", &self.amap_backoff_ms)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("extractor", &self.extractor)
            .field("struct_llm_url", &self.struct_llm_url)
            .field(
                "struct_llm_token",
                &self.struct_llm_token.as_ref().map(|_| "[redacted]"),
            )
            .field("struct_prompt_path", &self.struct_prompt_path)
            .field("gazetteer_path", &self.gazetteer_path)
            .field("log_level", &self.log_level)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
