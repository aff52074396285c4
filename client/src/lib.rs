//! HTTP client for the BirdIA identification backend.

pub mod admin;
pub mod analyzer;
pub mod auth;
pub mod error;
pub mod http;
pub mod inference;
pub mod location;

pub use analyzer::{classify, AnalysisOutcome, Analyzer};
pub use auth::PasswordChange;
pub use error::ApiError;
pub use http::ApiClient;
pub use location::{locate_best_effort, provider_from_config, GeoPoint, LocationProvider};
