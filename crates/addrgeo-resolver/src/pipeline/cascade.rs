//! Candidate-producing stages.

use std::collections::HashMap;

use addrgeo_core::{AdminMetadata, Candidate, StructuredFields};
use futures::future::join_all;

use super::guard::guarded;
use super::{ResolveContext, Resolver, Stage, Step};
use crate::aggregate::CandidatePool;
use crate::expand::{QueryExpander, SearchQuery};
use crate::similarity::round_to;
use crate::types::{NoMatchReason, Resolution, ResolutionResult, ResultSource, ScoredCandidate};

const GAZETTEER_PAGE_SIZE: usize = 3;

/// Building-type words in `AP` that make good nearby-search keywords.
const ANCHOR_BUILDING_TOKENS: &[&str] = &[
    "教学楼", "写字楼", "广场", "大厦", "中心", "门诊", "公寓", "养殖塘", "机电厂",
];

/// A `U` value containing one of these is itself a nearby-search keyword.
const UNIT_TOKENS: &[&str] = &["号楼", "栋", "单元", "宿舍", "楼", "门", "楼层", "部"];

const DEFAULT_NEARBY_KEYWORD: &str = "楼";

impl Resolver {
    /// 1. Exact-ish hit in the private gazetteer.
    pub(super) async fn gazetteer_match(&self, ctx: ResolveContext) -> Step {
        let hits = guarded(
            "gazetteer",
            self.budget(&ctx),
            self.collaborators
                .gazetteer
                .lookup(&ctx.raw, 1, GAZETTEER_PAGE_SIZE),
        )
        .await
        .unwrap_or_default();

        let Some(best) = hits.into_iter().next() else {
            return Step::Next(Stage::FastMatch, ctx);
        };
        let Some(location) = best.coordinates() else {
            tracing::warn!(
                id = best.id.as_str(),
                location = best.location.as_str(),
                "gazetteer hit has unusable location"
            );
            return Step::Next(Stage::FastMatch, ctx);
        };

        tracing::info!(
            name = best.name.as_str(),
            address = best.address.as_str(),
            "gazetteer hit"
        );
        Step::Done(Resolution::Matched(Box::new(ResolutionResult {
            winner: ScoredCandidate {
                candidate: best,
                similarity: 100.0,
                auxiliary: 0.0,
                score: 100.0,
            },
            lng: location.lng,
            lat: location.lat,
            regeo: AdminMetadata::default(),
            duration: ctx.elapsed_secs(),
            source: ResultSource::Custom,
            fields: None,
            ap: None,
        })))
    }

    /// 2. Nationwide POI search on the raw text; short-circuits on a close match.
    pub(super) async fn fast_match(&self, mut ctx: ResolveContext) -> Step {
        let pois = guarded(
            "place_search.poi_search",
            self.budget(&ctx),
            self.collaborators.places.poi_search("", &ctx.raw),
        )
        .await
        .unwrap_or_default();

        let mut best: Option<(Candidate, f64)> = None;
        for poi in pois.into_iter().filter(Candidate::has_location) {
            let score = self
                .scorer
                .score(&ctx.raw, &poi.name)
                .max(self.scorer.score(&ctx.raw, &poi.address));
            if best.as_ref().is_none_or(|(_, top)| score > *top) {
                best = Some((poi, score));
            }
        }

        match best {
            Some((poi, score)) if score >= self.config.fast_match_threshold => {
                tracing::info!(
                    name = poi.name.as_str(),
                    address = poi.address.as_str(),
                    similarity = score,
                    "fast match"
                );
                let score = round_to(score, 2);
                ctx.winner = Some(ScoredCandidate {
                    candidate: poi,
                    similarity: score,
                    auxiliary: 0.0,
                    score,
                });
                Step::Next(Stage::Enrichment, ctx)
            }
            best => {
                tracing::info!(
                    best = best.map_or(0.0, |(_, s)| s),
                    threshold = self.config.fast_match_threshold,
                    "no fast match"
                );
                Step::Next(Stage::Structuring, ctx)
            }
        }
    }

    /// 3. Decompose the raw text into canonical fields.
    pub(super) async fn structuring(&self, mut ctx: ResolveContext) -> Step {
        let tags = guarded(
            "structuring",
            self.budget(&ctx),
            self.collaborators.extractor.extract(&ctx.raw),
        )
        .await
        .unwrap_or_default();

        let fields = StructuredFields::from_tags(&tags);
        tracing::info!(
            city = fields.city.as_str(),
            district = fields.district.as_str(),
            anchor_point = fields.anchor_point.as_str(),
            unit = fields.unit.as_str(),
            hint = fields.hint.as_str(),
            poi_type = fields.poi_type.as_str(),
            "structured address"
        );
        ctx.anchor = QueryExpander::new(&fields).anchor().to_string();
        ctx.fields = Some(fields);
        Step::Next(Stage::CandidateCascade, ctx)
    }

    /// 4. Progressively relaxed suggestion searches.
    pub(super) async fn candidate_cascade(&self, mut ctx: ResolveContext) -> Step {
        let min = self.config.min_candidates;
        let mut pool = CandidatePool::new();
        {
            let expander = QueryExpander::new(ctx.fields());

            pool.extend(self.input_tips(&ctx, &expander.primary()).await);

            if pool.len() < min {
                pool.extend(self.input_tips(&ctx, &expander.unscoped()).await);
            }

            if pool.len() < min {
                let relaxed = expander.relaxed();
                let lists = join_all(relaxed.iter().map(|q| self.input_tips(&ctx, q))).await;
                for list in lists {
                    pool.extend(list);
                }
            }

            if let Some(query) = expander.catch_all() {
                pool.extend(self.input_tips(&ctx, &query).await);
            }
        }

        tracing::info!(count = pool.len(), "candidate cascade finished");
        if pool.is_empty() {
            return Step::Next(Stage::SpatialFallback, ctx);
        }
        ctx.candidates = pool.into_vec();
        Step::Next(Stage::Scoring, ctx)
    }

    /// 5. Nearby search around the geocoded district, judged against the hint.
    pub(super) async fn spatial_fallback(&self, mut ctx: ResolveContext) -> Step {
        let fields = ctx.fields();
        if fields.district.is_empty() {
            tracing::warn!("spatial fallback needs a district, none extracted");
            return Step::Done(Resolution::NoMatch(NoMatchReason::NoCandidates));
        }

        let origin = guarded(
            "place_search.geocode",
            self.budget(&ctx),
            self.collaborators
                .places
                .geocode(&fields.city, &fields.district),
        )
        .await
        .flatten();
        let Some(origin) = origin else {
            tracing::warn!(
                city = fields.city.as_str(),
                district = fields.district.as_str(),
                "district could not be geocoded"
            );
            return Step::Done(Resolution::NoMatch(NoMatchReason::NoCandidates));
        };

        let keywords = nearby_keywords(fields);
        tracing::info!(origin = %origin, ?keywords, "spatial fallback");

        let radius = self.config.nearby_radius_m;
        let lists = join_all(keywords.iter().map(|kw| {
            guarded(
                "place_search.nearby_search",
                self.budget(&ctx),
                self.collaborators.places.nearby_search(&origin, kw, radius),
            )
        }))
        .await;

        let mut pool = CandidatePool::new();
        for list in lists {
            pool.extend(list.unwrap_or_default());
        }
        if pool.is_empty() {
            return Step::Done(Resolution::NoMatch(NoMatchReason::NoCandidates));
        }

        let mut candidates = pool.into_vec();
        if !fields.hint.is_empty() {
            let scores = guarded(
                "auxiliary_judge",
                self.budget(&ctx),
                self.collaborators
                    .judge
                    .judge(&origin, &candidates, &fields.hint),
            )
            .await
            .unwrap_or_default();
            apply_judge_scores(&mut candidates, &scores);
        }

        ctx.candidates = candidates;
        Step::Next(Stage::Scoring, ctx)
    }

    async fn input_tips(&self, ctx: &ResolveContext, query: &SearchQuery) -> Vec<Candidate> {
        if !query.is_sendable() {
            return Vec::new();
        }
        let mut tips = guarded(
            "place_search.input_tips",
            self.budget(ctx),
            self.collaborators
                .places
                .input_tips(&query.city, &query.keyword, &query.type_filter),
        )
        .await
        .unwrap_or_default();

        if let Some(limit) = query.limit {
            tips.truncate(limit);
        }
        tracing::debug!(
            provider = self.collaborators.places.provider_name(),
            query = query.label,
            city = query.city.as_str(),
            keyword = query.keyword.as_str(),
            count = tips.len(),
            "input tips"
        );
        tips
    }
}

/// Nearby-search keywords, deduplicated in order:
/// the first building-type word of `AP`, `U` when it names a unit, `楼` when a
/// hint is present, and `楼` when nothing else applies.
pub(crate) fn nearby_keywords(fields: &StructuredFields) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    if let Some(token) = ANCHOR_BUILDING_TOKENS
        .iter()
        .find(|t| fields.anchor_point.contains(**t))
    {
        push_unique(&mut keywords, token);
    }
    if UNIT_TOKENS.iter().any(|t| fields.unit.contains(t)) {
        push_unique(&mut keywords, &fields.unit);
    }
    if !fields.hint.is_empty() {
        push_unique(&mut keywords, DEFAULT_NEARBY_KEYWORD);
    }
    if keywords.is_empty() {
        keywords.push(DEFAULT_NEARBY_KEYWORD.to_string());
    }
    keywords
}

fn push_unique(keywords: &mut Vec<String>, keyword: &str) {
    if !keywords.iter().any(|k| k == keyword) {
        keywords.push(keyword.to_string());
    }
}

/// Attach judge scores by candidate name (missing → 0, clamped to 0–100) and
/// stable-sort by score, highest first.
fn apply_judge_scores(candidates: &mut [Candidate], scores: &HashMap<String, f64>) {
    for candidate in candidates.iter_mut() {
        let score = scores
            .get(&candidate.name)
            .copied()
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        candidate.auxiliary_score = Some(round_to(score, 2));
    }
    candidates.sort_by(|a, b| {
        b.auxiliary_score
            .unwrap_or(0.0)
            .total_cmp(&a.auxiliary_score.unwrap_or(0.0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(ap: &str, unit: &str, hint: &str) -> StructuredFields {
        StructuredFields {
            district: "海淀区".into(),
            anchor_point: ap.into(),
            unit: unit.into(),
            hint: hint.into(),
            ..StructuredFields::default()
        }
    }

    #[test]
    fn nearby_keywords_default_to_building() {
        assert_eq!(nearby_keywords(&fields("", "", "")), ["楼"]);
        assert_eq!(nearby_keywords(&fields("六道口", "101室", "")), ["楼"]);
    }

    #[test]
    fn nearby_keywords_take_first_building_type_and_unit() {
        assert_eq!(
            nearby_keywords(&fields("科技广场写字楼", "6号楼", "")),
            ["写字楼", "6号楼"]
        );
    }

    #[test]
    fn nearby_keywords_dedup_hint_keyword() {
        assert_eq!(nearby_keywords(&fields("", "楼", "西北角")), ["楼"]);
        assert_eq!(
            nearby_keywords(&fields("第一教学楼", "", "对面")),
            ["教学楼", "楼"]
        );
    }

    #[test]
    fn judge_scores_map_by_name_and_sort_stably() {
        let mut candidates = vec![
            Candidate::new("1", "甲", "", "1,1"),
            Candidate::new("2", "乙", "", "1,1"),
            Candidate::new("3", "丙", "", "1,1"),
            Candidate::new("4", "丁", "", "1,1"),
        ];
        let scores = HashMap::from([
            ("乙".to_string(), 80.0),
            ("丙".to_string(), 150.0),
            ("丁".to_string(), -3.0),
        ]);
        apply_judge_scores(&mut candidates, &scores);

        let order: Vec<(&str, Option<f64>)> = candidates
            .iter()
            .map(|c| (c.id.as_str(), c.auxiliary_score))
            .collect();
        assert_eq!(
            order,
            [("3", Some(100.0)), ("2", Some(80.0)), ("1", Some(0.0)), ("4", Some(0.0))]
        );
    }
}
