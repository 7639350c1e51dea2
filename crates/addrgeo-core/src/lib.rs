//! Shared domain model for the address resolver.
//!
//! Holds the candidate/field types, the capability traits that external
//! collaborators implement, and environment-driven configuration.

pub mod app_config;
pub mod capability;
pub mod config;
pub mod fields;
pub mod types;

mod error;

pub use app_config::{AppConfig, ExtractorKind, PipelineConfig, SimilarityWeights};
pub use capability::{AuxiliaryJudge, GazetteerLookup, PlaceSearchProvider, StructuredExtractor};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{CollaboratorError, ConfigError};
pub use fields::{Field, RawTags, StructuredFields};
pub use types::{normalize_poi_id, AdminMetadata, Candidate, Location, RawPoi};
