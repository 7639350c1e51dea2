use std::path::PathBuf;
use std::time::Duration;

use crate::app_config::{AppConfig, ExtractorKind, PipelineConfig, SimilarityWeights};
use crate::ConfigError;

const DEFAULT_AMAP_BASE_URL: &str = "https://restapi.amap.com/";
const DEFAULT_LLM_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.trim().is_empty()) };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_unit_f64 = |var: &str, default: &str, max: f64| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        let value = raw.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
        if !(0.0..=max).contains(&value) {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("must be between 0 and {max}, got {value}"),
            });
        }
        Ok(value)
    };

    let amap_key = require("AMAP_KEY")?;
    let amap_base_url = or_default("AMAP_BASE_URL", DEFAULT_AMAP_BASE_URL);
    let amap_max_retries = parse_u32("ADDRGEO_AMAP_MAX_RETRIES", "1")?;
    let amap_backoff_ms = parse_u64("ADDRGEO_AMAP_BACKOFF_MS", "200")?;

    let llm_api_key = optional("LLM_API_KEY");
    let llm_base_url = or_default("LLM_BASE_URL", DEFAULT_LLM_BASE_URL);
    let llm_model = or_default("QWEN_MODEL", "qwen-plus");
    let llm_timeout_secs = parse_u64("ADDRGEO_LLM_TIMEOUT_SECS", "30")?;
    let extractor = parse_extractor(&or_default("ADDRGEO_EXTRACTOR", "chat"))?;
    let struct_llm_url = or_default("STRUCT_LLM_URL", "http://127.0.0.1:8080");
    let struct_llm_token = optional("STRUCT_LLM_TOKEN");
    let struct_prompt_path = optional("ADDRGEO_STRUCT_PROMPT_PATH").map(PathBuf::from);
    let gazetteer_path = optional("ADDRGEO_GAZETTEER_PATH").map(PathBuf::from);
    let log_level = or_default("ADDRGEO_LOG_LEVEL", "info");

    let call_timeout_ms = parse_u64("ADDRGEO_CALL_TIMEOUT_MS", "3000")?;
    let fast_match_threshold = parse_unit_f64("ADDRGEO_FAST_MATCH_THRESHOLD", "70", 100.0)?;
    let min_candidates = parse_usize("ADDRGEO_MIN_CANDIDATES", "3")?;
    let nearby_radius_m = parse_u32("ADDRGEO_NEARBY_RADIUS_M", "5000")?;
    let regeo_radius_m = parse_u32("ADDRGEO_REGEO_RADIUS_M", "100")?;
    let token_weight = parse_unit_f64("ADDRGEO_TOKEN_WEIGHT", "1.0", 1.0)?;
    let structural_weight = parse_unit_f64("ADDRGEO_STRUCTURAL_WEIGHT", "0.0", 1.0)?;

    if (token_weight + structural_weight - 1.0).abs() > 1e-6 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ADDRGEO_STRUCTURAL_WEIGHT".to_string(),
            reason: format!(
                "token and structural weights must sum to 1 (got {token_weight} + {structural_weight})"
            ),
        });
    }

    if extractor == ExtractorKind::Chat && llm_api_key.is_none() {
        return Err(ConfigError::MissingEnvVar("LLM_API_KEY".to_string()));
    }

    Ok(AppConfig {
        amap_key,
        amap_base_url,
        amap_max_retries,
        amap_backoff_ms,
        llm_api_key,
        llm_base_url,
        llm_model,
        llm_timeout_secs,
        extractor,
        struct_llm_url,
        struct_llm_token,
        struct_prompt_path,
        gazetteer_path,
        log_level,
        pipeline: PipelineConfig {
            call_timeout: Duration::from_millis(call_timeout_ms),
            fast_match_threshold,
            min_candidates,
            nearby_radius_m,
            regeo_radius_m,
            similarity: SimilarityWeights {
                token: token_weight,
                structural: structural_weight,
            },
        },
    })
}

/// Parse the structuring backend selector.
fn parse_extractor(s: &str) -> Result<ExtractorKind, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "chat" => Ok(ExtractorKind::Chat),
        "tgi" => Ok(ExtractorKind::Tgi),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ADDRGEO_EXTRACTOR".to_string(),
            reason: format!("expected 'chat' or 'tgi', got '{other}'"),
        }),
    }
}
