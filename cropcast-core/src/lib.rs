//! Core library for the `cropcast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather and crop-recommendation provider abstractions
//! - Shared domain models (readings, recommendations, fetch errors)
//! - The fixed-interval polling loop
//!
//! It is used by `cropcast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod model;
pub mod poll;
pub mod provider;

pub use config::{Config, ProviderConfig};
pub use model::{FetchError, Recommendation, RecommendationRequest, WeatherReading};
pub use poll::{CycleReport, FixedLocation, LocationSource, PollingLoop, Schedule, Sleeper};
pub use provider::{ProviderId, RecommendationProvider, WeatherProvider, providers_from_config};
