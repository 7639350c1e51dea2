//! AMap v3 response envelopes.
//!
//! Every response carries `status` (`"1"` ok, `"0"` error), `info` and
//! `infocode`; payload fields sit next to them. AMap sends empty values as
//! `[]`, so payload records stay loosely typed until
//! [`addrgeo_core::Candidate::from_raw`].

use addrgeo_core::RawPoi;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub infocode: String,
    #[serde(flatten)]
    pub data: T,
}

/// `v3/assistant/inputtips`
#[derive(Debug, Deserialize)]
pub struct TipsResponse {
    #[serde(default)]
    pub tips: Vec<RawPoi>,
}

/// `v3/place/text` and `v3/place/around`
#[derive(Debug, Deserialize)]
pub struct PoisResponse {
    #[serde(default)]
    pub pois: Vec<RawPoi>,
}

/// `v3/geocode/geo`
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub geocodes: Vec<Geocode>,
}

#[derive(Debug, Deserialize)]
pub struct Geocode {
    #[serde(default)]
    pub location: Value,
}

/// `v3/geocode/regeo`
#[derive(Debug, Deserialize)]
pub struct RegeoResponse {
    #[serde(default)]
    pub regeocode: Option<Regeocode>,
}

#[derive(Debug, Deserialize)]
pub struct Regeocode {
    #[serde(default, rename = "addressComponent")]
    pub address_component: Map<String, Value>,
}

impl Regeocode {
    /// First-level scalar fields of `addressComponent`, plus the nested
    /// `streetNumber` object as-is.
    #[must_use]
    pub fn admin_fields(self) -> Map<String, Value> {
        self.address_component
            .into_iter()
            .filter(|(key, value)| {
                key == "streetNumber"
                    || matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_fields_keep_scalars_and_street_number() {
        let regeo: Regeocode = serde_json::from_value(serde_json::json!({
            "addressComponent": {
                "province": "浙江省",
                "city": "宁波市",
                "district": "海曙区",
                "township": "集士港镇",
                "adcode": "330203",
                "neighborhood": {"name": [], "type": []},
                "building": {"name": [], "type": []},
                "businessAreas": [[]],
                "streetNumber": {"street": "杰迈路", "number": "1号"}
            }
        }))
        .unwrap();

        let fields = regeo.admin_fields();
        assert_eq!(fields["township"], "集士港镇");
        assert_eq!(fields["adcode"], "330203");
        assert_eq!(fields["streetNumber"]["street"], "杰迈路");
        assert!(!fields.contains_key("neighborhood"));
        assert!(!fields.contains_key("businessAreas"));
    }

    #[test]
    fn envelope_tolerates_missing_payload() {
        let env: Envelope<PoisResponse> =
            serde_json::from_value(serde_json::json!({"status": "1", "count": "0"})).unwrap();
        assert_eq!(env.status, "1");
        assert!(env.data.pois.is_empty());
    }
}
