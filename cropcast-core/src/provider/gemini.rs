use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::model::{FetchError, RecommendationRequest};

use super::{RecommendationProvider, truncate_body};

/// Google Gemini `generateContent`, single turn.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            api_key,
            endpoint: format!(
                "{}/v1beta/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            http: builder.build()?,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, FetchError> {
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
        };

        tracing::debug!(endpoint = %self.endpoint, "requesting crop recommendation");

        let res = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&text) });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        parsed
            .into_text()
            .ok_or_else(|| FetchError::Decode("response contained no generated text".to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Live responses nest text under `candidates`; the top-level `contents`
/// shape is accepted as well for older gateways that echo it back.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    contents: Vec<Content>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let from_candidates = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next());

        from_candidates
            .or_else(|| self.contents.into_iter().next().and_then(|c| c.parts.into_iter().next()))
            .map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
    }
}

#[async_trait]
impl RecommendationProvider for GeminiProvider {
    async fn recommend(&self, request: &RecommendationRequest) -> Result<String, FetchError> {
        let result = self.generate(&request.prompt()).await;
        if let Err(err) = &result {
            tracing::warn!(location = %request.location, error = %err, "recommendation fetch failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(json: &str) -> Option<String> {
        serde_json::from_str::<GenerateResponse>(json)
            .expect("payload should decode")
            .into_text()
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: "hello".into() }] }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "contents": [{ "parts": [{ "text": "hello" }] }] }));
    }

    #[test]
    fn reads_candidates_first() {
        let text = text_of(
            r#"{
                "candidates": [{ "content": { "parts": [{ "text": "Rice and barley" }], "role": "model" } }],
                "contents": [{ "parts": [{ "text": "ignored" }] }]
            }"#,
        );
        assert_eq!(text.as_deref(), Some("Rice and barley"));
    }

    #[test]
    fn falls_back_to_top_level_contents() {
        let text = text_of(r#"{ "contents": [{ "parts": [{ "text": "Cabbage" }] }] }"#);
        assert_eq!(text.as_deref(), Some("Cabbage"));
    }

    #[test]
    fn empty_envelope_has_no_text() {
        assert_eq!(text_of(r#"{ "candidates": [] }"#), None);
        assert_eq!(text_of(r#"{ "candidates": [{ "finishReason": "SAFETY" }] }"#), None);
    }

    #[test]
    fn endpoint_includes_model() {
        let provider =
            GeminiProvider::new("K".into(), "http://localhost:1/", "gemini-2.0-flash", None).unwrap();
        assert_eq!(
            provider.endpoint,
            "http://localhost:1/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
