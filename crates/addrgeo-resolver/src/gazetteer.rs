//! Read-only in-memory gazetteer loaded from a JSON snapshot.
//!
//! Entries are curated `{id, name, address, lat, lng, …}` records. Text
//! lookup matches whole tokens of the name or address, newest first.

use std::path::Path;
use std::sync::LazyLock;

use addrgeo_core::{normalize_poi_id, Candidate, CollaboratorError, GazetteerLookup, Location};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::GazetteerError;
use crate::similarity::round_to;

/// Everything except CJK ideographs, word characters and whitespace.
static QUERY_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x{4e00}-\x{9fa5}\w\s]").expect("valid regex"));

/// One curated address record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GazetteerEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub township: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Unix seconds of the last edit.
    #[serde(default)]
    pub updated_at: i64,
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    normalize_poi_id(&raw).ok_or_else(|| serde::de::Error::custom(format!("unusable id: {raw}")))
}

impl GazetteerEntry {
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.lng, self.lat)
    }

    #[must_use]
    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(
            self.id.clone(),
            self.name.clone(),
            self.address.clone(),
            self.location().to_string(),
        )
    }

    fn matches_term(&self, term: &str) -> bool {
        tokens(&self.name).any(|t| t == term) || tokens(&self.address).any(|t| t == term)
    }
}

/// A gazetteer entry within some radius of a point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyEntry<'a> {
    pub entry: &'a GazetteerEntry,
    /// Metres, two decimals.
    pub distance_m: f64,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryGazetteer {
    /// Sorted by `updated_at`, newest first.
    entries: Vec<GazetteerEntry>,
}

impl InMemoryGazetteer {
    #[must_use]
    pub fn new(mut entries: Vec<GazetteerEntry>) -> Self {
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Self { entries }
    }

    /// Parse a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns [`GazetteerError::Parse`] if the text is not a valid entry list.
    pub fn from_json_str(json: &str) -> Result<Self, GazetteerError> {
        let entries: Vec<GazetteerEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a JSON snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GazetteerError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GazetteerError> {
        let json = std::fs::read_to_string(path).map_err(|source| GazetteerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let gazetteer = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            entries = gazetteer.len(),
            "loaded gazetteer snapshot"
        );
        Ok(gazetteer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching every term of `query`, newest first.
    ///
    /// `page` is 1-based; page 0 is treated as page 1. A query with no
    /// searchable terms matches nothing.
    #[must_use]
    pub fn search(&self, query: &str, page: usize, page_size: usize) -> Vec<&GazetteerEntry> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| terms.iter().all(|term| entry.matches_term(term)))
            .skip(page_offset(page, page_size))
            .take(page_size)
            .collect()
    }

    /// Entries within `radius_m` metres of `location`, nearest first.
    #[must_use]
    pub fn find_nearby(
        &self,
        location: &Location,
        radius_m: f64,
        page: usize,
        page_size: usize,
    ) -> Vec<NearbyEntry<'_>> {
        let mut nearby: Vec<NearbyEntry<'_>> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let distance = location.distance_m(&entry.location());
                (distance <= radius_m).then(|| NearbyEntry {
                    entry,
                    distance_m: round_to(distance, 2),
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        nearby
            .into_iter()
            .skip(page_offset(page, page_size))
            .take(page_size)
            .collect()
    }
}

#[async_trait]
impl GazetteerLookup for InMemoryGazetteer {
    async fn lookup(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Candidate>, CollaboratorError> {
        Ok(self
            .search(query, page, page_size)
            .into_iter()
            .map(GazetteerEntry::to_candidate)
            .collect())
    }
}

fn page_offset(page: usize, page_size: usize) -> usize {
    page.max(1).saturating_sub(1).saturating_mul(page_size)
}

fn query_terms(query: &str) -> Vec<String> {
    QUERY_NOISE_RE
        .replace_all(query.trim(), " ")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Maximal runs of CJK ideographs and word characters, lower-cased.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"[
        {"id": "g-1", "name": "集士港杰迈广场", "address": "海曙区 集士港镇 杰迈路1号",
         "lat": 29.8601, "lng": 121.4512, "updated_at": 100},
        {"id": 42, "name": "北苑家园 东区", "address": "朝阳区 北苑小街8号院",
         "lat": 40.0321, "lng": 116.4301, "district": "朝阳区", "updated_at": 300},
        {"id": ["g-3", "alt"], "name": "北苑家园 西区", "address": "朝阳区 北苑路",
         "lat": 40.0300, "lng": 116.4200, "updated_at": 200}
    ]"#;

    fn gazetteer() -> InMemoryGazetteer {
        InMemoryGazetteer::from_json_str(SNAPSHOT).unwrap()
    }

    #[test]
    fn parses_loose_ids() {
        let g = gazetteer();
        let ids: Vec<&str> = g.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["42", "g-3", "g-1"]);
    }

    #[test]
    fn rejects_unusable_id() {
        let err = InMemoryGazetteer::from_json_str(
            r#"[{"id": [], "name": "x", "address": "y", "lat": 1.0, "lng": 2.0}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, GazetteerError::Parse(_)));
    }

    #[test]
    fn search_matches_whole_tokens_newest_first() {
        let g = gazetteer();
        let hits: Vec<&str> = g.search("北苑家园", 1, 10).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(hits, ["42", "g-3"]);

        let hits = g.search("北苑家园 东区", 1, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "42");

        // Address tokens count too.
        let hits = g.search("集士港镇", 1, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "g-1");
    }

    #[test]
    fn search_sanitizes_punctuation() {
        let g = gazetteer();
        let hits = g.search("北苑家园，东区！", 1, 10);
        assert_eq!(hits.len(), 1);
        assert!(g.search("！！", 1, 10).is_empty());
        assert!(g.search("", 1, 10).is_empty());
    }

    #[test]
    fn search_does_not_match_partial_tokens() {
        let g = gazetteer();
        assert!(g.search("北苑", 1, 10).is_empty());
        assert!(g.search("北京市朝阳区北苑家园", 1, 10).is_empty());
    }

    #[test]
    fn search_paginates() {
        let g = gazetteer();
        assert_eq!(g.search("北苑家园", 1, 1)[0].id, "42");
        assert_eq!(g.search("北苑家园", 2, 1)[0].id, "g-3");
        assert!(g.search("北苑家园", 3, 1).is_empty());
        assert_eq!(g.search("北苑家园", 0, 1)[0].id, "42");
    }

    #[test]
    fn find_nearby_sorts_by_distance() {
        let g = gazetteer();
        let origin = Location::new(116.4301, 40.0321);
        let nearby = g.find_nearby(&origin, 2_000.0, 1, 10);
        let ids: Vec<&str> = nearby.iter().map(|n| n.entry.id.as_str()).collect();
        assert_eq!(ids, ["42", "g-3"]);
        assert!(nearby[0].distance_m.abs() < 1e-9);
        assert!(nearby[1].distance_m > 500.0 && nearby[1].distance_m < 2_000.0);

        assert!(g.find_nearby(&origin, 10.0, 2, 10).is_empty());
    }

    #[tokio::test]
    async fn lookup_returns_candidates_with_location_text() {
        let g = gazetteer();
        let hits = g.lookup("集士港杰迈广场", 1, 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].location, "121.4512,29.8601");
        assert_eq!(hits[0].coordinates(), Some(Location::new(121.4512, 29.8601)));
    }
}
