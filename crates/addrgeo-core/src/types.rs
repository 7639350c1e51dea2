//! Candidate POI records and the coordinate/metadata types around them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A coordinate pair in provider order: longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lng: f64,
    pub lat: f64,
}

impl Location {
    #[must_use]
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Parse provider location text of the form `"lng,lat"`.
    ///
    /// Returns `None` unless the text splits into exactly two finite numbers.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(',');
        let lng = parts.next()?.trim().parse::<f64>().ok()?;
        let lat = parts.next()?.trim().parse::<f64>().ok()?;
        if parts.next().is_some() || !lng.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self { lng, lat })
    }

    /// Great-circle distance in metres (haversine).
    #[must_use]
    pub fn distance_m(&self, other: &Location) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let dphi = (other.lat - self.lat).to_radians();
        let dlambda = (other.lng - self.lng).to_radians();
        let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

/// A POI record as returned by a search provider, before validation.
///
/// Providers are loose about types: `id` may be a string, a number or a
/// list, and empty text fields are often sent as `[]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPoi {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub address: Value,
    #[serde(default)]
    pub district: Value,
    #[serde(default)]
    pub location: Value,
}

/// A validated candidate POI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Normalized provider identifier; identity for deduplication.
    pub id: String,
    pub name: String,
    pub address: String,
    /// Provider location text, `"lng,lat"`. Empty when the provider had none.
    pub location: String,
    /// Spatial match score (0–100) assigned by the auxiliary judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_score: Option<f64>,
}

impl Candidate {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            location: location.into(),
            auxiliary_score: None,
        }
    }

    /// Build a candidate from a raw provider record.
    ///
    /// This is the only place provider ids are normalized. Records whose id
    /// cannot be normalized are dropped with a warning. The address is the
    /// record's district prefix (when present) followed by its street address.
    #[must_use]
    pub fn from_raw(raw: RawPoi) -> Option<Self> {
        let name = first_text(&raw.name);
        let Some(id) = normalize_poi_id(&raw.id) else {
            tracing::warn!(name = name.as_str(), raw_id = %raw.id, "dropping POI with unusable id");
            return None;
        };

        Some(Self {
            id,
            name,
            address: format!("{}{}", first_text(&raw.district), first_text(&raw.address)),
            location: first_text(&raw.location),
            auxiliary_score: None,
        })
    }

    #[must_use]
    pub fn has_location(&self) -> bool {
        !self.location.trim().is_empty()
    }

    /// Parsed coordinates, if the location text is a valid `"lng,lat"` pair.
    #[must_use]
    pub fn coordinates(&self) -> Option<Location> {
        Location::parse(&self.location)
    }
}

/// Normalize a loosely-typed provider id into a single string.
///
/// - a list yields its first element (empty list → `None`)
/// - strings and numbers are taken as-is
/// - anything else, and empty strings, yield `None`
#[must_use]
pub fn normalize_poi_id(id: &Value) -> Option<String> {
    let normalized = match id {
        Value::Array(items) => match items.first()? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let normalized = normalized.trim().to_string();
    (!normalized.is_empty()).then_some(normalized)
}

/// Text value of a field that may arrive as a string, a list, or a number.
fn first_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.first().map(first_text).unwrap_or_default(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Administrative subdivision metadata from reverse geocoding
/// (province, city, district, township, adcode, `streetNumber`, …).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminMetadata(Map<String, Value>);

impl AdminMetadata {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a first-level field; `None` when absent or not a string.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn township(&self) -> Option<&str> {
        self.text("township")
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn location_parses_two_components() {
        let loc = Location::parse("116.481197,39.989751").unwrap();
        assert!((loc.lng - 116.481_197).abs() < 1e-9);
        assert!((loc.lat - 39.989_751).abs() < 1e-9);
    }

    #[test]
    fn location_rejects_wrong_arity_and_garbage() {
        assert!(Location::parse("").is_none());
        assert!(Location::parse("116.4").is_none());
        assert!(Location::parse("116.4,39.9,12").is_none());
        assert!(Location::parse("east,north").is_none());
        assert!(Location::parse("NaN,39.9").is_none());
    }

    #[test]
    fn location_display_round_trips_through_parse() {
        let loc = Location::new(121.594_637, 29.725_989);
        assert_eq!(Location::parse(&loc.to_string()), Some(loc));
    }

    #[test]
    fn haversine_distance_is_plausible() {
        // Tiananmen to the Bird's Nest is roughly 8.6 km.
        let a = Location::new(116.397_128, 39.916_527);
        let b = Location::new(116.396_574, 39.992_973);
        let d = a.distance_m(&b);
        assert!((8_000.0..9_000.0).contains(&d), "got {d}");
        assert!(a.distance_m(&a).abs() < 1e-6);
    }

    #[test]
    fn normalize_id_handles_every_shape() {
        assert_eq!(normalize_poi_id(&json!("B000A7BD6C")), Some("B000A7BD6C".into()));
        assert_eq!(normalize_poi_id(&json!(12345)), Some("12345".into()));
        assert_eq!(normalize_poi_id(&json!(["B0FFG", "B0FFH"])), Some("B0FFG".into()));
        assert_eq!(normalize_poi_id(&json!([7])), Some("7".into()));
        assert_eq!(normalize_poi_id(&json!([])), None);
        assert_eq!(normalize_poi_id(&json!("")), None);
        assert_eq!(normalize_poi_id(&json!(null)), None);
        assert_eq!(normalize_poi_id(&json!({"id": 1})), None);
    }

    #[test]
    fn from_raw_flattens_list_fields_and_prefixes_district() {
        let raw: RawPoi = serde_json::from_value(json!({
            "id": ["B0FFKEPXS2"],
            "name": "北苑家园",
            "district": "北京市朝阳区",
            "address": "北苑小街8号",
            "location": "116.431,40.031"
        }))
        .unwrap();
        let candidate = Candidate::from_raw(raw).unwrap();
        assert_eq!(candidate.id, "B0FFKEPXS2");
        assert_eq!(candidate.address, "北京市朝阳区北苑小街8号");
        assert_eq!(candidate.location, "116.431,40.031");
        assert!(candidate.has_location());
        assert!(candidate.auxiliary_score.is_none());
    }

    #[test]
    fn from_raw_turns_empty_arrays_into_empty_text() {
        let raw: RawPoi = serde_json::from_value(json!({
            "id": "X1",
            "name": "朝阳区",
            "address": [],
            "location": []
        }))
        .unwrap();
        let candidate = Candidate::from_raw(raw).unwrap();
        assert_eq!(candidate.address, "");
        assert!(!candidate.has_location());
        assert!(candidate.coordinates().is_none());
    }

    #[test]
    fn from_raw_drops_unusable_ids() {
        let raw: RawPoi = serde_json::from_value(json!({"id": [], "name": "x"})).unwrap();
        assert!(Candidate::from_raw(raw).is_none());
        let raw: RawPoi = serde_json::from_value(json!({"name": "no id"})).unwrap();
        assert!(Candidate::from_raw(raw).is_none());
    }

    #[test]
    fn admin_metadata_exposes_text_fields() {
        let mut map = Map::new();
        map.insert("township".into(), json!("学院路街道"));
        map.insert("adcode".into(), json!("110108"));
        map.insert("streetNumber".into(), json!({"street": "成府路"}));
        let meta = AdminMetadata::new(map);
        assert_eq!(meta.township(), Some("学院路街道"));
        assert!(meta.text("streetNumber").is_none());
        assert!(meta.get("streetNumber").is_some());
        assert!(!meta.is_empty());
    }
}
