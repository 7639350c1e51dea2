//! Address → POI resolution.
//!
//! Scores address similarity, derives relaxed search queries from structured
//! fields, and runs the resolution cascade over the collaborators declared in
//! [`addrgeo_core::capability`].

pub mod aggregate;
pub mod error;
pub mod expand;
pub mod gazetteer;
pub mod pipeline;
pub mod similarity;
pub mod types;

pub use aggregate::{merge_candidates, CandidatePool};
pub use error::GazetteerError;
pub use expand::{extract_first_region, QueryExpander, SearchQuery};
pub use gazetteer::{GazetteerEntry, InMemoryGazetteer, NearbyEntry};
pub use pipeline::{apply_penalties, fuse_scores, Collaborators, Resolver, Stage};
pub use similarity::{core_keyword_overlap_ratio, token_overlap, SimilarityScorer};
pub use types::{NoMatchReason, Resolution, ResolutionResult, ResultSource, ScoredCandidate};
