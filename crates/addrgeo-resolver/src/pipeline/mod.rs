//! Resolution cascade.
//!
//! Resolution is an explicit state machine. Each [`Stage`] handler takes the
//! owned `ResolveContext` and returns either the next stage with the updated
//! context or a final [`Resolution`]:
//!
//! ```text
//! GazetteerMatch ─hit──────────────────────────────────────────────► Done
//!   │ miss
//! FastMatch ─────good enough───────────────────────────► Enrichment ─► Done
//!   │ otherwise
//! Structuring ─► CandidateCascade ─non-empty─► Scoring ─► Enrichment
//!                  │ empty
//!                SpatialFallback ─candidates─► Scoring
//!                  │ none
//!                Done (no candidates)
//! ```
//!
//! Collaborator failures never escape: an error, timeout or empty response
//! only empties the current stage.

mod cascade;
mod guard;
mod rank;

pub use rank::{apply_penalties, fuse_scores};

use std::sync::Arc;
use std::time::Duration;

use addrgeo_core::{
    AuxiliaryJudge, Candidate, GazetteerLookup, PipelineConfig, PlaceSearchProvider,
    StructuredExtractor, StructuredFields,
};
use tokio::time::Instant;

use crate::similarity::SimilarityScorer;
use crate::types::{Resolution, ScoredCandidate};

/// The external services a [`Resolver`] talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub gazetteer: Arc<dyn GazetteerLookup>,
    pub places: Arc<dyn PlaceSearchProvider>,
    pub extractor: Arc<dyn StructuredExtractor>,
    pub judge: Arc<dyn AuxiliaryJudge>,
}

/// Named cascade stages, in the order they normally run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GazetteerMatch,
    FastMatch,
    Structuring,
    CandidateCascade,
    SpatialFallback,
    Scoring,
    Enrichment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::GazetteerMatch => "gazetteer_match",
            Stage::FastMatch => "fast_match",
            Stage::Structuring => "structuring",
            Stage::CandidateCascade => "candidate_cascade",
            Stage::SpatialFallback => "spatial_fallback",
            Stage::Scoring => "scoring",
            Stage::Enrichment => "enrichment",
        };
        f.write_str(name)
    }
}

/// Per-call state threaded through the stages.
#[derive(Debug)]
pub(crate) struct ResolveContext {
    raw: String,
    started: std::time::Instant,
    deadline: Option<Instant>,
    /// Set by `Structuring`.
    fields: Option<StructuredFields>,
    /// Administrative anchor derived from the fields.
    anchor: String,
    candidates: Vec<Candidate>,
    /// Set by `FastMatch` or `Scoring`.
    winner: Option<ScoredCandidate>,
}

impl ResolveContext {
    fn new(raw: &str, deadline: Option<Instant>) -> Self {
        Self {
            raw: raw.trim().to_string(),
            started: std::time::Instant::now(),
            deadline,
            fields: None,
            anchor: String::new(),
            candidates: Vec::new(),
            winner: None,
        }
    }

    fn fields(&self) -> &StructuredFields {
        static EMPTY: StructuredFields = StructuredFields {
            city: String::new(),
            district: String::new(),
            anchor_point: String::new(),
            unit: String::new(),
            hint: String::new(),
            poi_type: String::new(),
        };
        self.fields.as_ref().unwrap_or(&EMPTY)
    }

    fn elapsed_secs(&self) -> f64 {
        crate::similarity::round_to(self.started.elapsed().as_secs_f64(), 2)
    }
}

/// Outcome of one stage handler.
pub(crate) enum Step {
    Next(Stage, ResolveContext),
    Done(Resolution),
}

/// Resolves free-form address text to a single enriched POI.
///
/// Holds only shared collaborators and immutable configuration, so one
/// resolver serves any number of concurrent calls.
pub struct Resolver {
    config: PipelineConfig,
    scorer: SimilarityScorer,
    collaborators: Collaborators,
}

impl Resolver {
    #[must_use]
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let scorer = SimilarityScorer::new(config.similarity);
        Self {
            config,
            scorer,
            collaborators,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve `raw_address`. Never fails; no match is [`Resolution::NoMatch`].
    pub async fn resolve(&self, raw_address: &str) -> Resolution {
        self.run(ResolveContext::new(raw_address, None)).await
    }

    /// Like [`Resolver::resolve`], with every collaborator call capped to the
    /// time left before `deadline`.
    ///
    /// Once the deadline has passed, remaining calls are skipped and whatever
    /// candidates already arrived are scored.
    pub async fn resolve_with_deadline(&self, raw_address: &str, deadline: Instant) -> Resolution {
        self.run(ResolveContext::new(raw_address, Some(deadline))).await
    }

    async fn run(&self, mut ctx: ResolveContext) -> Resolution {
        tracing::info!(
            address = ctx.raw.as_str(),
            provider = self.collaborators.places.provider_name(),
            "resolving address"
        );
        let mut stage = Stage::GazetteerMatch;

        loop {
            tracing::debug!(%stage, "entering stage");
            let step = match stage {
                Stage::GazetteerMatch => self.gazetteer_match(ctx).await,
                Stage::FastMatch => self.fast_match(ctx).await,
                Stage::Structuring => self.structuring(ctx).await,
                Stage::CandidateCascade => self.candidate_cascade(ctx).await,
                Stage::SpatialFallback => self.spatial_fallback(ctx).await,
                Stage::Scoring => self.scoring(ctx),
                Stage::Enrichment => self.enrichment(ctx).await,
            };

            match step {
                Step::Next(next, next_ctx) => {
                    stage = next;
                    ctx = next_ctx;
                }
                Step::Done(resolution) => {
                    match &resolution {
                        Resolution::Matched(result) => tracing::info!(
                            %stage,
                            name = result.winner.candidate.name.as_str(),
                            address = result.winner.candidate.address.as_str(),
                            score = result.winner.score,
                            similarity = result.winner.similarity,
                            auxiliary = result.winner.auxiliary,
                            duration = result.duration,
                            "address resolved"
                        ),
                        Resolution::NoMatch(reason) => {
                            tracing::warn!(%stage, %reason, "address not resolved");
                        }
                    }
                    return resolution;
                }
            }
        }
    }

    fn budget(&self, ctx: &ResolveContext) -> Option<Duration> {
        guard::call_budget(self.config.call_timeout, ctx.deadline)
    }
}
