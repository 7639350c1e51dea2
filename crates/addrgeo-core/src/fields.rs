//! Canonical structured address fields and the tag alias table.
//!
//! Structuring models emit arbitrary tag names (`prov`, `district`, `roadno`,
//! `assist`, or the canonical `C`/`D`/`AP`/… codes). Each recognized alias maps
//! onto exactly one [`Field`]; unknown tags are ignored.

use serde::{Deserialize, Serialize};

/// The six canonical address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `C`: province or city.
    City,
    /// `D`: district, town, or community.
    District,
    /// `AP`: anchor point (POI, road, building name).
    AnchorPoint,
    /// `U`: building/unit/floor/room.
    Unit,
    /// `I`: auxiliary positional hint ("西北角", "对面").
    Hint,
    /// `T`: POI type filter.
    PoiType,
}

/// Alias → field. Matched case-insensitively.
const FIELD_ALIASES: &[(&str, Field)] = &[
    ("c", Field::City),
    ("prov", Field::City),
    ("province", Field::City),
    ("city", Field::City),
    ("d", Field::District),
    ("district", Field::District),
    ("devzone", Field::District),
    ("town", Field::District),
    ("community", Field::District),
    ("village_group", Field::District),
    ("ap", Field::AnchorPoint),
    ("road", Field::AnchorPoint),
    ("roadno", Field::AnchorPoint),
    ("poi", Field::AnchorPoint),
    ("subpoi", Field::AnchorPoint),
    ("intersection", Field::AnchorPoint),
    ("u", Field::Unit),
    ("houseno", Field::Unit),
    ("cellno", Field::Unit),
    ("floorno", Field::Unit),
    ("roomno", Field::Unit),
    ("detail", Field::Unit),
    ("i", Field::Hint),
    ("assist", Field::Hint),
    ("distance", Field::Hint),
    ("direction", Field::Hint),
    ("t", Field::PoiType),
    ("type", Field::PoiType),
    ("poitype", Field::PoiType),
];

impl Field {
    pub const ALL: [Field; 6] = [
        Field::City,
        Field::District,
        Field::AnchorPoint,
        Field::Unit,
        Field::Hint,
        Field::PoiType,
    ];

    /// Canonical short code (`C`, `D`, `AP`, `U`, `I`, `T`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Field::City => "C",
            Field::District => "D",
            Field::AnchorPoint => "AP",
            Field::Unit => "U",
            Field::Hint => "I",
            Field::PoiType => "T",
        }
    }

    /// Resolve a raw tag name to its canonical field.
    #[must_use]
    pub fn from_alias(tag: &str) -> Option<Field> {
        let tag = tag.trim();
        FIELD_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(tag))
            .map(|&(_, field)| field)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Ordered `(tag, values)` pairs as emitted by a structuring model.
///
/// Order is the model's encounter order and drives concatenation in
/// [`StructuredFields::from_tags`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags(Vec<(String, Vec<String>)>);

impl RawTags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value for `tag`.
    ///
    /// A repeated tag gains the value as an extra list entry; a value that tag
    /// already carries is ignored.
    pub fn push(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        let value = value.into();
        if let Some((_, values)) = self.0.iter_mut().find(|(t, _)| *t == tag) {
            if !values.contains(&value) {
                values.push(value);
            }
        } else {
            self.0.push((tag, vec![value]));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(t, v)| (t.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = RawTags::new();
        for (k, v) in iter {
            tags.push(k, v);
        }
        tags
    }
}

/// Canonical structured view of one raw address.
///
/// Absent fields are empty strings, never `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFields {
    #[serde(rename = "C", default)]
    pub city: String,
    #[serde(rename = "D", default)]
    pub district: String,
    #[serde(rename = "AP", default)]
    pub anchor_point: String,
    #[serde(rename = "U", default)]
    pub unit: String,
    #[serde(rename = "I", default)]
    pub hint: String,
    #[serde(rename = "T", default)]
    pub poi_type: String,
}

impl StructuredFields {
    /// Map raw model tags onto the canonical fields.
    ///
    /// Values for the same field are concatenated in encounter order, except
    /// `C`, which keeps only the first non-empty value. Unknown tags are
    /// ignored.
    #[must_use]
    pub fn from_tags(tags: &RawTags) -> Self {
        let mut fields = Self::default();
        for (tag, values) in tags.iter() {
            let Some(field) = Field::from_alias(tag) else {
                tracing::debug!(tag, "ignoring unrecognized structuring tag");
                continue;
            };
            for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
                if field == Field::City {
                    if fields.city.is_empty() {
                        fields.city = value.to_string();
                    }
                } else {
                    fields.slot_mut(field).push_str(value);
                }
            }
        }
        fields
    }

    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::City => &self.city,
            Field::District => &self.district,
            Field::AnchorPoint => &self.anchor_point,
            Field::Unit => &self.unit,
            Field::Hint => &self.hint,
            Field::PoiType => &self.poi_type,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::City => &mut self.city,
            Field::District => &mut self.district,
            Field::AnchorPoint => &mut self.anchor_point,
            Field::Unit => &mut self.unit,
            Field::Hint => &mut self.hint,
            Field::PoiType => &mut self.poi_type,
        }
    }

    /// `true` when structuring produced nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|&f| self.get(f).is_empty())
    }

    /// Primary search keyword: `D + AP`.
    #[must_use]
    pub fn search_keyword(&self) -> String {
        format!("{}{}", self.district, self.anchor_point)
    }

    /// Normalized scoring target: `D + AP + I`.
    #[must_use]
    pub fn scoring_target(&self) -> String {
        format!("{}{}{}", self.district, self.anchor_point, self.hint)
    }
}
