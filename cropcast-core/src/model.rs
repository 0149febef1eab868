use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Text shown in place of a recommendation when the generative provider fails.
pub const RECOMMENDATION_FALLBACK: &str = "Unable to fetch crop recommendations from AI.";

/// Normalized realtime observation for one location.
///
/// `temperature` and `humidity` stay `None` when the provider omits them;
/// only `rainfall` has a default (0 mm/hr).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Precipitation intensity, mm/hr.
    pub rainfall: f64,
    pub observed_at: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
}

impl WeatherReading {
    /// Temperature and humidity, when both are known.
    pub fn climate(&self) -> Option<(f64, f64)> {
        match (self.temperature, self.humidity) {
            (Some(t), Some(h)) => Some((t, h)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
}

impl RecommendationRequest {
    pub fn prompt(&self) -> String {
        crop_prompt(&self.location, self.temperature, self.humidity)
    }
}

/// Builds the single-turn prompt sent to the generative provider.
pub fn crop_prompt(location: &str, temperature: f64, humidity: f64) -> String {
    format!(
        "Based on the weather in {location}, with a temperature of {temperature}°C and humidity of {humidity}%, \
         recommend crops that are suitable for growing in this climate."
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    Generated(String),
    Fallback,
}

impl Recommendation {
    pub fn text(&self) -> &str {
        match self {
            Recommendation::Generated(text) => text,
            Recommendation::Fallback => RECOMMENDATION_FALLBACK,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Why a provider call produced no data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
