//! AMap (高德) web-service client.
//!
//! Implements [`addrgeo_core::PlaceSearchProvider`] over the v3 REST API:
//! input tips, POI text search, nearby search, geocoding and reverse geocoding.

pub mod client;
pub mod error;
pub mod types;

mod retry;

pub use client::AmapClient;
pub use error::AmapError;
