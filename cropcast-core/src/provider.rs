use crate::{
    Config,
    model::{FetchError, RecommendationRequest, WeatherReading},
    provider::{gemini::GeminiProvider, tomorrow::TomorrowProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod gemini;
pub mod tomorrow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Tomorrow,
    Gemini,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Tomorrow => "tomorrow",
            ProviderId::Gemini => "gemini",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Tomorrow, ProviderId::Gemini]
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::Tomorrow => "https://api.tomorrow.io",
            ProviderId::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    /// Environment variable that overrides the stored API key.
    pub fn env_var(&self) -> String {
        format!("CROPCAST_{}_API_KEY", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "tomorrow" => Ok(ProviderId::Tomorrow),
            "gemini" => Ok(ProviderId::Gemini),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: tomorrow, gemini."
            )),
        }
    }
}

/// Source of realtime weather readings.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, location: &str) -> Result<WeatherReading, FetchError>;
}

/// Source of free-form crop advice for a climate.
#[async_trait]
pub trait RecommendationProvider: Send + Sync + Debug {
    async fn recommend(&self, request: &RecommendationRequest) -> Result<String, FetchError>;
}

/// Construct both providers from config, failing if either key is missing.
pub fn providers_from_config(
    config: &Config,
) -> anyhow::Result<(Box<dyn WeatherProvider>, Box<dyn RecommendationProvider>)> {
    let weather = TomorrowProvider::new(
        config.require_api_key(ProviderId::Tomorrow)?.to_owned(),
        config.provider_base_url(ProviderId::Tomorrow),
        config.weather_timeout(),
    )?;

    let recommendation = GeminiProvider::new(
        config.require_api_key(ProviderId::Gemini)?.to_owned(),
        config.provider_base_url(ProviderId::Gemini),
        &config.gemini_model,
        config.recommendation_timeout(),
    )?;

    Ok((Box::new(weather), Box::new(recommendation)))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let parsed = ProviderId::try_from(id.as_str()).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn provider_id_parse_is_case_insensitive() {
        assert_eq!(ProviderId::try_from("Gemini").unwrap(), ProviderId::Gemini);
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("openweather").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn providers_from_config_errors_when_missing_api_key() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Tomorrow, "KEY".to_string());

        let err = providers_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider 'gemini'"));
    }

    #[test]
    fn providers_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Tomorrow, "T".to_string());
        cfg.upsert_provider_api_key(ProviderId::Gemini, "G".to_string());

        assert!(providers_from_config(&cfg).is_ok());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(250);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
