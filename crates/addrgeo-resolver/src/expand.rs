//! Search-query derivation from structured address fields.
//!
//! The expander only proposes queries. Fetching, merging and the
//! "fewer than N candidates" checks belong to the cascade stage that drives it.

use std::sync::LazyLock;

use addrgeo_core::StructuredFields;
use regex::Regex;

/// First prefecture-level city, county or district name in a text.
static REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{4e00}-\x{9fa5}]{2,20}?(?:市|地区|自治州|盟|县|自治县|旗|自治旗|林区|特区|区)")
        .expect("valid regex")
});

static MODIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"宿舍|\d+号?(?:楼|栋|座)|(?:东|西)城").expect("valid regex"));

/// A town name directly after a district name (`海曙区集士港镇` → `海曙区`).
static DISTRICT_TOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"区.+?镇").expect("valid regex"));

static BUILDING_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"宿舍|\d+号?(?:楼|栋|座)").expect("valid regex"));

const PUBLIC_HOUSING: &str = "公租房";

/// One suggestion-search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Short name for logs (`primary`, `unscoped`, `stripped`, …).
    pub label: &'static str,
    /// City scope; empty searches nationwide.
    pub city: String,
    pub keyword: String,
    pub type_filter: String,
    /// Keep at most this many results.
    pub limit: Option<usize>,
}

impl SearchQuery {
    fn new(label: &'static str, city: &str, keyword: &str, type_filter: &str) -> Self {
        Self {
            label,
            city: city.to_string(),
            keyword: keyword.to_string(),
            type_filter: type_filter.to_string(),
            limit: None,
        }
    }

    /// Queries with a blank keyword are never sent.
    #[must_use]
    pub fn is_sendable(&self) -> bool {
        !self.keyword.trim().is_empty()
    }
}

/// Derives the primary query and its progressively relaxed variants.
#[derive(Debug, Clone)]
pub struct QueryExpander<'a> {
    fields: &'a StructuredFields,
    keyword: String,
    anchor: String,
}

impl<'a> QueryExpander<'a> {
    #[must_use]
    pub fn new(fields: &'a StructuredFields) -> Self {
        let anchor = match extract_first_region(&fields.district) {
            "" => fields.city.clone(),
            region => region.to_string(),
        };
        Self {
            fields,
            keyword: fields.search_keyword(),
            anchor,
        }
    }

    /// Administrative anchor: the first region name in `D`, else `C`.
    #[must_use]
    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    /// `D + AP`, scoped to `C`, filtered by `T`.
    #[must_use]
    pub fn primary(&self) -> SearchQuery {
        SearchQuery::new(
            "primary",
            &self.fields.city,
            &self.keyword,
            &self.fields.poi_type,
        )
    }

    /// `D + AP` with city and type dropped.
    #[must_use]
    pub fn unscoped(&self) -> SearchQuery {
        SearchQuery::new("unscoped", "", &self.keyword, "")
    }

    /// Independent variants for a sparse candidate set, in merge order:
    ///
    /// 1. the primary keyword with modifiers stripped, unscoped;
    /// 2. `AP` scoped to the anchor city, when the anchor differs from `C`
    ///    (a county administered directly by a prefecture-level city);
    /// 3. `AP` without building suffixes, scoped to `C`.
    #[must_use]
    pub fn relaxed(&self) -> Vec<SearchQuery> {
        let mut queries = vec![SearchQuery::new(
            "stripped",
            "",
            &strip_modifiers(&self.keyword),
            "",
        )];

        if !self.anchor.is_empty() && self.anchor != self.fields.city {
            queries.push(SearchQuery::new(
                "anchor_city",
                &self.anchor,
                &self.fields.anchor_point,
                "",
            ));
        }

        queries.push(SearchQuery::new(
            "anchor_point",
            &self.fields.city,
            &strip_building_suffix(&self.fields.anchor_point),
            "",
        ));
        queries
    }

    /// The anchor region alone, unscoped, first result only.
    #[must_use]
    pub fn catch_all(&self) -> Option<SearchQuery> {
        if self.anchor.is_empty() {
            return None;
        }
        let mut query = SearchQuery::new("catch_all", "", &self.anchor, "");
        query.limit = Some(1);
        Some(query)
    }
}

/// First city/county/district name in `text`, or `""`.
#[must_use]
pub fn extract_first_region(text: &str) -> &str {
    REGION_RE.find(text).map_or("", |m| m.as_str())
}

/// Drop dormitory/building suffixes, east/west-city markers, a town name
/// following a district, and public-housing markers.
#[must_use]
pub fn strip_modifiers(keyword: &str) -> String {
    let stripped = MODIFIER_RE.replace_all(keyword, "");
    let stripped = DISTRICT_TOWN_RE.replace_all(&stripped, "区");
    stripped.replace(PUBLIC_HOUSING, "")
}

/// Drop dormitory and numbered building suffixes only.
#[must_use]
pub fn strip_building_suffix(anchor_point: &str) -> String {
    BUILDING_SUFFIX_RE.replace_all(anchor_point, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(city: &str, district: &str, ap: &str) -> StructuredFields {
        StructuredFields {
            city: city.into(),
            district: district.into(),
            anchor_point: ap.into(),
            ..StructuredFields::default()
        }
    }

    #[test]
    fn extract_first_region_takes_shortest_leading_match() {
        assert_eq!(extract_first_region("北京市朝阳区"), "北京市");
        assert_eq!(extract_first_region("朝阳区"), "朝阳区");
        assert_eq!(extract_first_region("海曙区集士港镇"), "海曙区");
        assert_eq!(extract_first_region("慈溪市周巷镇"), "慈溪市");
        assert_eq!(extract_first_region("集士港镇"), "");
        assert_eq!(extract_first_region(""), "");
    }

    #[test]
    fn strip_modifiers_removes_building_and_town_noise() {
        assert_eq!(
            strip_modifiers("海曙区集士港镇三江购物5号楼宿舍"),
            "海曙区三江购物"
        );
        assert_eq!(strip_modifiers("北苑家园公租房12栋"), "北苑家园");
        assert_eq!(strip_modifiers("东城花园A座"), "花园A座");
    }

    #[test]
    fn strip_building_suffix_keeps_town_names() {
        assert_eq!(strip_building_suffix("集士港镇宿舍3号楼"), "集士港镇");
        assert_eq!(strip_building_suffix("六道口"), "六道口");
    }

    #[test]
    fn anchor_falls_back_to_city() {
        let f = fields("北京市", "", "六道口");
        assert_eq!(QueryExpander::new(&f).anchor(), "北京市");

        let f = fields("浙江省", "海曙区集士港镇", "三江购物");
        assert_eq!(QueryExpander::new(&f).anchor(), "海曙区");
    }

    #[test]
    fn primary_and_unscoped_queries() {
        let mut f = fields("北京市", "朝阳区", "北苑小街8号院");
        f.poi_type = "住宅区".into();
        let expander = QueryExpander::new(&f);

        let primary = expander.primary();
        assert_eq!(primary.city, "北京市");
        assert_eq!(primary.keyword, "朝阳区北苑小街8号院");
        assert_eq!(primary.type_filter, "住宅区");

        let unscoped = expander.unscoped();
        assert_eq!(unscoped.city, "");
        assert_eq!(unscoped.keyword, "朝阳区北苑小街8号院");
        assert_eq!(unscoped.type_filter, "");
    }

    #[test]
    fn relaxed_includes_anchor_city_variant_only_when_it_differs() {
        let f = fields("浙江省", "慈溪市周巷镇", "天元小区3号楼");
        let labels: Vec<_> = QueryExpander::new(&f)
            .relaxed()
            .into_iter()
            .map(|q| (q.label, q.city, q.keyword))
            .collect();
        assert_eq!(
            labels,
            [
                ("stripped", String::new(), "慈溪市周巷镇天元小区".to_string()),
                ("anchor_city", "慈溪市".to_string(), "天元小区3号楼".to_string()),
                ("anchor_point", "浙江省".to_string(), "天元小区".to_string()),
            ]
        );

        let f = fields("北京市", "", "六道口");
        let relaxed = QueryExpander::new(&f).relaxed();
        assert_eq!(relaxed.len(), 2);
        assert!(relaxed.iter().all(|q| q.label != "anchor_city"));
    }

    #[test]
    fn catch_all_is_capped_and_skipped_without_anchor() {
        let f = fields("", "朝阳区", "北苑小街");
        let q = QueryExpander::new(&f).catch_all().unwrap();
        assert_eq!(q.keyword, "朝阳区");
        assert_eq!(q.city, "");
        assert_eq!(q.limit, Some(1));

        let f = fields("", "", "北苑小街");
        assert!(QueryExpander::new(&f).catch_all().is_none());
    }

    #[test]
    fn blank_keywords_are_not_sendable() {
        let f = StructuredFields::default();
        let expander = QueryExpander::new(&f);
        assert!(!expander.primary().is_sendable());
        assert!(expander.relaxed().iter().all(|q| !q.is_sendable()));
    }
}
