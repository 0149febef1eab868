use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{FetchError, WeatherReading};

use super::{WeatherProvider, truncate_body};

/// Tomorrow.io realtime weather.
#[derive(Debug, Clone)]
pub struct TomorrowProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl TomorrowProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_realtime(&self, location: &str) -> Result<WeatherReading, FetchError> {
        let url = format!("{}/v4/weather/realtime", self.base_url);

        tracing::debug!(location, "requesting realtime weather");

        let res = self
            .http
            .get(&url)
            .query(&[("location", location), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        let parsed: TmRealtimeResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_reading())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TmValues {
    temperature: Option<f64>,
    humidity: Option<f64>,
    precipitation_intensity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TmData {
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    values: TmValues,
}

#[derive(Debug, Deserialize)]
struct TmLocation {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmRealtimeResponse {
    #[serde(default)]
    data: TmData,
    location: Option<TmLocation>,
}

impl TmRealtimeResponse {
    fn into_reading(self) -> WeatherReading {
        let values = self.data.values;

        WeatherReading {
            temperature: values.temperature,
            humidity: values.humidity,
            rainfall: values.precipitation_intensity.unwrap_or(0.0),
            observed_at: self.data.time,
            location_name: self.location.and_then(|l| l.name),
        }
    }
}

#[async_trait]
impl WeatherProvider for TomorrowProvider {
    async fn current(&self, location: &str) -> Result<WeatherReading, FetchError> {
        let result = self.fetch_realtime(location).await;
        if let Err(err) = &result {
            tracing::warn!(location, error = %err, "weather fetch failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WeatherReading {
        serde_json::from_str::<TmRealtimeResponse>(json)
            .expect("payload should decode")
            .into_reading()
    }

    #[test]
    fn extracts_nested_values() {
        let reading = parse(
            r#"{
                "data": {
                    "time": "2024-05-01T06:00:00Z",
                    "values": { "temperature": 15.0, "humidity": 60, "precipitationIntensity": 1.5 }
                },
                "location": { "lat": 37.56, "lon": 126.97, "name": "Seoul, South Korea" }
            }"#,
        );

        assert_eq!(reading.temperature, Some(15.0));
        assert_eq!(reading.humidity, Some(60.0));
        assert_eq!(reading.rainfall, 1.5);
        assert_eq!(reading.location_name.as_deref(), Some("Seoul, South Korea"));
        assert!(reading.observed_at.is_some());
    }

    #[test]
    fn missing_precipitation_defaults_to_zero() {
        let reading = parse(r#"{ "data": { "values": { "temperature": 15, "humidity": 60 } } }"#);
        assert_eq!(reading.rainfall, 0.0);
        assert_eq!(reading.climate(), Some((15.0, 60.0)));
    }

    #[test]
    fn missing_fields_stay_absent() {
        let reading = parse(r#"{ "data": { "values": { "temperature": 15 } } }"#);
        assert_eq!(reading.temperature, Some(15.0));
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.climate(), None);
    }

    #[test]
    fn missing_data_object_yields_empty_reading() {
        let reading = parse(r#"{ "code": 400001, "type": "Invalid Body Parameters" }"#);
        assert_eq!(reading.climate(), None);
        assert_eq!(reading.rainfall, 0.0);
        assert_eq!(reading.location_name, None);
    }
}
