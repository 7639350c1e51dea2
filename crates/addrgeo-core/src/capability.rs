//! Capability traits for the resolver's external collaborators.
//!
//! The resolver only ever sees these traits; concrete HTTP clients live in
//! their own crates and tests substitute in-process fakes.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::fields::RawTags;
use crate::types::{AdminMetadata, Candidate, Location};

/// Fuzzy full-text lookup over the private, curated address table.
#[async_trait]
pub trait GazetteerLookup: Send + Sync {
    /// Search curated entries by free text. Ordering by recency is fine.
    async fn lookup(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Candidate>, CollaboratorError>;
}

/// External POI search and geocoding provider.
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    /// Suggestion-style fuzzy search. An empty `city` searches nationwide.
    async fn input_tips(
        &self,
        city: &str,
        keyword: &str,
        type_filter: &str,
    ) -> Result<Vec<Candidate>, CollaboratorError>;

    /// Richer POI text search.
    async fn poi_search(&self, city: &str, keyword: &str)
        -> Result<Vec<Candidate>, CollaboratorError>;

    /// POIs matching `keyword` within `radius_m` metres of `location`.
    async fn nearby_search(
        &self,
        location: &Location,
        keyword: &str,
        radius_m: u32,
    ) -> Result<Vec<Candidate>, CollaboratorError>;

    /// Forward geocode; `Ok(None)` when the provider has no match.
    async fn geocode(&self, city: &str, address: &str)
        -> Result<Option<Location>, CollaboratorError>;

    /// Township/administrative metadata around `location`.
    async fn reverse_geocode(
        &self,
        location: &Location,
        radius_m: u32,
    ) -> Result<AdminMetadata, CollaboratorError>;

    /// Provider name for logs.
    fn provider_name(&self) -> &str {
        "place-search"
    }
}

/// Decomposes raw address text into tagged fields.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, raw_address: &str) -> Result<RawTags, CollaboratorError>;
}

/// Scores candidates against a free-text positional hint relative to an
/// anchor coordinate.
#[async_trait]
pub trait AuxiliaryJudge: Send + Sync {
    /// Returns candidate name → score (0–100). Missing names score 0.
    async fn judge(
        &self,
        anchor: &Location,
        candidates: &[Candidate],
        hint: &str,
    ) -> Result<HashMap<String, f64>, CollaboratorError>;
}
