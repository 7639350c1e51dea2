//! HTTP client for the AMap v3 web-service API.
//!
//! Every endpoint checks the `"status"` field of the JSON envelope and
//! surfaces API-level failures as [`AmapError::ApiError`]. Transient failures
//! are retried with back-off (see `retry`).

use std::time::Duration;

use addrgeo_core::{AdminMetadata, Candidate, CollaboratorError, Location, PlaceSearchProvider};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::AmapError;
use crate::retry::retry_with_backoff;
use crate::types::{Envelope, GeocodeResponse, PoisResponse, RegeoResponse, TipsResponse};

const DEFAULT_BASE_URL: &str = "https://restapi.amap.com/";

const INPUT_TIPS: &str = "v3/assistant/inputtips";
const PLACE_TEXT: &str = "v3/place/text";
const PLACE_AROUND: &str = "v3/place/around";
const GEOCODE: &str = "v3/geocode/geo";
const REGEO: &str = "v3/geocode/regeo";

const PLACE_TEXT_PAGE_SIZE: &str = "20";

/// Client for the AMap REST API.
///
/// Use [`AmapClient::new`] for production or [`AmapClient::with_base_url`] to
/// point at a mock server in tests.
pub struct AmapClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl AmapClient {
    /// Creates a client pointed at the production AMap API.
    ///
    /// # Errors
    ///
    /// Returns [`AmapError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, AmapError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AmapError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`AmapError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AmapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("addrgeo/0.1 (address-resolution)")
            .build()?;

        // Exactly one trailing slash so that `join` appends endpoint paths.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|e| AmapError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Retry transient failures up to `max_retries` more times.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Suggestion-style fuzzy search, restricted to `city` when non-empty.
    ///
    /// Tips without a location are dropped. A tip's address is its district
    /// followed by its street address.
    ///
    /// # Errors
    ///
    /// Returns [`AmapError`] on HTTP, API or decoding failure.
    pub async fn input_tips(
        &self,
        city: &str,
        keyword: &str,
        type_filter: &str,
    ) -> Result<Vec<Candidate>, AmapError> {
        let response: TipsResponse = self
            .get(
                INPUT_TIPS,
                &[
                    ("keywords", keyword),
                    ("city", city),
                    ("type", type_filter),
                    ("datatype", "all"),
                    ("citylimit", "true"),
                ],
            )
            .await?;

        let candidates: Vec<Candidate> = response
            .tips
            .into_iter()
            .filter_map(Candidate::from_raw)
            .filter(Candidate::has_location)
            .collect();
        tracing::debug!(city, keyword, count = candidates.len(), "AMap input tips");
        Ok(candidates)
    }

    /// POI text search (first page of 20, extended fields).
    ///
    /// # Errors
    ///
    /// Returns [`AmapError`] on HTTP, API or decoding failure.
    pub async fn poi_search(&self, city: &str, keyword: &str) -> Result<Vec<Candidate>, AmapError> {
        let response: PoisResponse = self
            .get(
                PLACE_TEXT,
                &[
                    ("keywords", keyword),
                    ("city", city),
                    ("types", ""),
                    ("offset", PLACE_TEXT_PAGE_SIZE),
                    ("page", "1"),
                    ("extensions", "all"),
                ],
            )
            .await?;
        Ok(response.pois.into_iter().filter_map(Candidate::from_raw).collect())
    }

    /// POIs matching `keyword` within `radius_m` metres of `location`.
    ///
    /// # Errors
    ///
    /// Returns [`AmapError`] on HTTP, API or decoding failure.
    pub async fn nearby_search(
        &self,
        location: &Location,
        keyword: &str,
        radius_m: u32,
    ) -> Result<Vec<Candidate>, AmapError> {
        let location = location.to_string();
        let radius = radius_m.to_string();
        let response: PoisResponse = self
            .get(
                PLACE_AROUND,
                &[
                    ("location", location.as_str()),
                    ("keywords", keyword),
                    ("radius", radius.as_str()),
                ],
            )
            .await?;
        Ok(response.pois.into_iter().filter_map(Candidate::from_raw).collect())
    }

    /// Coordinates of the first geocode match, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AmapError`] on HTTP, API or decoding failure.
    pub async fn geocode(&self, city: &str, address: &str) -> Result<Option<Location>, AmapError> {
        let response: GeocodeResponse = self
            .get(GEOCODE, &[("address", address), ("city", city)])
            .await?;

        let location = response
            .geocodes
            .into_iter()
            .next()
            .and_then(|g| g.location.as_str().and_then(Location::parse));
        if location.is_none() {
            tracing::debug!(city, address, "AMap geocode found nothing");
        }
        Ok(location)
    }

    /// Administrative metadata (`addressComponent`) around `location`.
    ///
    /// # Errors
    ///
    /// Returns [`AmapError`] on HTTP, API or decoding failure.
    pub async fn reverse_geocode(
        &self,
        location: &Location,
        radius_m: u32,
    ) -> Result<AdminMetadata, AmapError> {
        let location = location.to_string();
        let radius = radius_m.to_string();
        let response: RegeoResponse = self
            .get(
                REGEO,
                &[
                    ("location", location.as_str()),
                    ("poitype", ""),
                    ("radius", radius.as_str()),
                    ("extensions", "all"),
                    ("roadlevel", "0"),
                ],
            )
            .await?;

        Ok(response
            .regeocode
            .map(|r| AdminMetadata::new(r.admin_fields()))
            .unwrap_or_default())
    }

    /// Builds the full request URL with percent-encoded query parameters.
    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, AmapError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| AmapError::InvalidBaseUrl(format!("{}{endpoint}: {e}", self.base_url)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET `endpoint`, check the envelope status and decode the payload,
    /// retrying transient failures.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AmapError> {
        let url = self.build_url(endpoint, params)?;
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_json(endpoint, &url)
        })
        .await?;

        let envelope: Envelope<T> =
            serde_json::from_value(body).map_err(|e| AmapError::Deserialize {
                context: endpoint.to_string(),
                source: e,
            })?;
        Ok(envelope.data)
    }

    /// One GET attempt: 2xx status, JSON body, `"status": "1"`.
    async fn request_json(&self, endpoint: &str, url: &Url) -> Result<serde_json::Value, AmapError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        let body: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| AmapError::Deserialize {
                context: endpoint.to_string(),
                source: e,
            })?;
        Self::check_api_error(endpoint, &body)?;
        Ok(body)
    }

    fn check_api_error(endpoint: &str, body: &serde_json::Value) -> Result<(), AmapError> {
        let text = |key: &str| {
            body.get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        if text("status") != "1" {
            return Err(AmapError::ApiError {
                endpoint: endpoint.to_string(),
                info: text("info"),
                infocode: text("infocode"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlaceSearchProvider for AmapClient {
    async fn input_tips(
        &self,
        city: &str,
        keyword: &str,
        type_filter: &str,
    ) -> Result<Vec<Candidate>, CollaboratorError> {
        Ok(AmapClient::input_tips(self, city, keyword, type_filter).await?)
    }

    async fn poi_search(
        &self,
        city: &str,
        keyword: &str,
    ) -> Result<Vec<Candidate>, CollaboratorError> {
        Ok(AmapClient::poi_search(self, city, keyword).await?)
    }

    async fn nearby_search(
        &self,
        location: &Location,
        keyword: &str,
        radius_m: u32,
    ) -> Result<Vec<Candidate>, CollaboratorError> {
        Ok(AmapClient::nearby_search(self, location, keyword, radius_m).await?)
    }

    async fn geocode(
        &self,
        city: &str,
        address: &str,
    ) -> Result<Option<Location>, CollaboratorError> {
        Ok(AmapClient::geocode(self, city, address).await?)
    }

    async fn reverse_geocode(
        &self,
        location: &Location,
        radius_m: u32,
    ) -> Result<AdminMetadata, CollaboratorError> {
        Ok(AmapClient::reverse_geocode(self, location, radius_m).await?)
    }

    fn provider_name(&self) -> &str {
        "amap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> AmapClient {
        AmapClient::with_base_url("test-key", 10, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_joins_endpoint_and_encodes_params() {
        let client = test_client("https://restapi.amap.com");
        let url = client
            .build_url(GEOCODE, &[("address", "海淀区 六道口"), ("city", "北京市")])
            .unwrap();
        assert_eq!(url.path(), "/v3/geocode/geo");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [
                ("key".to_string(), "test-key".to_string()),
                ("address".to_string(), "海淀区 六道口".to_string()),
                ("city".to_string(), "北京市".to_string()),
            ]
        );
    }

    #[test]
    fn build_url_keeps_base_path() {
        let client = test_client("http://proxy.local/amap/");
        let url = client.build_url(PLACE_TEXT, &[]).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/amap/v3/place/text?key=test-key");
    }

    #[test]
    fn check_api_error_reads_info() {
        let body = serde_json::json!({"status": "0", "info": "INVALID_USER_KEY", "infocode": "10001"});
        let err = AmapClient::check_api_error(REGEO, &body).unwrap_err();
        assert!(matches!(
            err,
            AmapError::ApiError { ref info, ref infocode, .. } if info == "INVALID_USER_KEY" && infocode == "10001"
        ));
        assert!(AmapClient::check_api_error(REGEO, &serde_json::json!({"status": "1"})).is_ok());
        assert!(AmapClient::check_api_error(REGEO, &serde_json::json!({})).is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            AmapClient::with_base_url("k", 10, "not a url"),
            Err(AmapError::InvalidBaseUrl(_))
        ));
    }
}
