//! Builds a [`Resolver`] from [`AppConfig`].

use std::sync::Arc;

use addrgeo_amap::AmapClient;
use addrgeo_core::{
    AppConfig, AuxiliaryJudge, ExtractorKind, GazetteerLookup, PlaceSearchProvider,
    StructuredExtractor,
};
use addrgeo_llm::{ChatClient, ChatExtractor, ChatJudge, TagExtractor, DEFAULT_STRUCT_PROMPT};
use addrgeo_resolver::{Collaborators, InMemoryGazetteer, Resolver};

/// Wires the AMap client, the configured structuring backend, the chat judge
/// and the gazetteer snapshot into a resolver.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built or the prompt template
/// or gazetteer file cannot be read.
pub(crate) fn build_resolver(config: &AppConfig) -> anyhow::Result<Resolver> {
    let http_timeout_secs = config.pipeline.call_timeout.as_secs().max(1);
    let places: Arc<dyn PlaceSearchProvider> = Arc::new(
        AmapClient::with_base_url(&config.amap_key, http_timeout_secs, &config.amap_base_url)?
            .with_retry(config.amap_max_retries, config.amap_backoff_ms),
    );

    let chat = ChatClient::with_base_url(
        config.llm_api_key.as_deref(),
        &config.llm_model,
        config.llm_timeout_secs,
        &config.llm_base_url,
    )?;

    let extractor: Arc<dyn StructuredExtractor> = match config.extractor {
        ExtractorKind::Chat => {
            let prompt = match &config.struct_prompt_path {
                Some(path) => ChatExtractor::load_prompt(path)?,
                None => DEFAULT_STRUCT_PROMPT.to_string(),
            };
            Arc::new(ChatExtractor::new(chat.clone(), prompt))
        }
        ExtractorKind::Tgi => Arc::new(TagExtractor::new(
            &config.struct_llm_url,
            config.struct_llm_token.as_deref(),
            config.llm_timeout_secs,
        )?),
    };

    let judge: Arc<dyn AuxiliaryJudge> = Arc::new(ChatJudge::new(chat));

    let gazetteer: Arc<dyn GazetteerLookup> = match &config.gazetteer_path {
        Some(path) => Arc::new(InMemoryGazetteer::load(path)?),
        None => {
            tracing::info!("no gazetteer snapshot configured, curated lookups disabled");
            Arc::new(InMemoryGazetteer::default())
        }
    };

    tracing::info!(
        provider = places.provider_name(),
        extractor = %config.extractor,
        model = config.llm_model.as_str(),
        "resolver collaborators ready"
    );

    Ok(Resolver::new(
        config.pipeline.clone(),
        Collaborators {
            gazetteer,
            places,
            extractor,
            judge,
        },
    ))
}
