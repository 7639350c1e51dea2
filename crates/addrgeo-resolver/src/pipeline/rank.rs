//! Scoring, selection and enrichment.

use addrgeo_core::Candidate;

use super::guard::guarded;
use super::{ResolveContext, Resolver, Stage, Step};
use crate::similarity::{round_to, SimilarityScorer};
use crate::types::{NoMatchReason, Resolution, ResolutionResult, ResultSource, ScoredCandidate};

const TEXT_WEIGHT: f64 = 0.7;
const AUXILIARY_WEIGHT: f64 = 0.3;
const MISS_PENALTY: f64 = 0.8;

/// Scale `text_score` down when the candidate address lacks the city or the
/// administrative anchor. Missing both rejects the candidate outright.
///
/// Empty `city`/`anchor` never penalize.
#[must_use]
pub fn apply_penalties(text_score: f64, city: &str, anchor: &str, address: &str) -> f64 {
    let city_miss = !city.is_empty() && !address.contains(city);
    let anchor_miss = !anchor.is_empty() && !address.contains(anchor);
    match (city_miss, anchor_miss) {
        (true, true) => 0.0,
        (true, false) | (false, true) => text_score * MISS_PENALTY,
        (false, false) => text_score,
    }
}

/// Weighted fusion of text similarity and the judge's spatial score.
#[must_use]
pub fn fuse_scores(text_score: f64, auxiliary_score: f64) -> f64 {
    TEXT_WEIGHT * text_score + AUXILIARY_WEIGHT * auxiliary_score
}

/// Unrounded scores of one candidate.
struct Ranked {
    similarity: f64,
    auxiliary: f64,
    score: f64,
}

fn rank(
    scorer: &SimilarityScorer,
    target: &str,
    city: &str,
    anchor: &str,
    candidate: &Candidate,
) -> Ranked {
    let text = scorer
        .score(target, &candidate.name)
        .max(scorer.score(target, &candidate.address));
    let similarity = apply_penalties(text, city, anchor, &candidate.address);
    let auxiliary = candidate.auxiliary_score.unwrap_or(0.0);
    let score = fuse_scores(similarity, auxiliary);

    tracing::debug!(
        name = candidate.name.as_str(),
        address = candidate.address.as_str(),
        text,
        similarity,
        auxiliary,
        score,
        "ranked candidate"
    );
    Ranked {
        similarity,
        auxiliary,
        score,
    }
}

impl Resolver {
    /// 6. Rank candidates against `D + AP + I` and keep the first best.
    pub(super) fn scoring(&self, mut ctx: ResolveContext) -> Step {
        let candidates = std::mem::take(&mut ctx.candidates);
        let fields = ctx.fields();
        let target = match fields.scoring_target() {
            t if t.is_empty() => ctx.raw.clone(),
            t => t,
        };

        let mut best: Option<(Candidate, Ranked)> = None;
        for candidate in candidates.into_iter().filter(Candidate::has_location) {
            let ranked = rank(&self.scorer, &target, &fields.city, &ctx.anchor, &candidate);
            if best.as_ref().is_none_or(|(_, top)| ranked.score > top.score) {
                best = Some((candidate, ranked));
            }
        }

        let Some((candidate, ranked)) = best else {
            tracing::warn!("no candidate with a location to score");
            return Step::Done(Resolution::NoMatch(NoMatchReason::NoCandidates));
        };

        ctx.winner = Some(ScoredCandidate {
            candidate,
            similarity: round_to(ranked.similarity, 2),
            auxiliary: round_to(ranked.auxiliary, 2),
            score: round_to(ranked.score, 2),
        });
        Step::Next(Stage::Enrichment, ctx)
    }

    /// 7. Validate the winner and attach administrative metadata.
    pub(super) async fn enrichment(&self, mut ctx: ResolveContext) -> Step {
        let Some(winner) = ctx.winner.take() else {
            return Step::Done(Resolution::NoMatch(NoMatchReason::NoCandidates));
        };

        let Some(location) = winner.candidate.coordinates() else {
            tracing::error!(
                location = winner.candidate.location.as_str(),
                "winning candidate has an invalid location"
            );
            return Step::Done(Resolution::NoMatch(NoMatchReason::InvalidLocation));
        };
        if winner.score <= 0.0 {
            tracing::error!(
                name = winner.candidate.name.as_str(),
                score = winner.score,
                "winning candidate does not match"
            );
            return Step::Done(Resolution::NoMatch(NoMatchReason::ZeroScore));
        }

        let regeo = guarded(
            "place_search.reverse_geocode",
            self.budget(&ctx),
            self.collaborators
                .places
                .reverse_geocode(&location, self.config.regeo_radius_m),
        )
        .await
        .unwrap_or_default();

        let ap = ctx.fields.as_ref().map(|f| f.anchor_point.clone());
        Step::Done(Resolution::Matched(Box::new(ResolutionResult {
            winner,
            lng: location.lng,
            lat: location.lat,
            regeo,
            duration: ctx.elapsed_secs(),
            source: ResultSource::Poi,
            fields: ctx.fields.take(),
            ap,
        })))
    }
}
