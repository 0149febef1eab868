//! The prompt → fetch → display → sleep driver.
//!
//! Time and operator input are injected ([`Sleeper`], [`LocationSource`]) so
//! the loop can be exercised without real delays or a terminal.

use std::{fmt, future::Future, io::Write, time::Duration};

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    Config,
    model::{FetchError, Recommendation, RecommendationRequest, WeatherReading},
    provider::{RecommendationProvider, WeatherProvider},
};

/// Fixed-interval polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    /// Stop after this many cycles; `None` polls until interrupted.
    pub max_cycles: Option<usize>,
}

impl Schedule {
    pub fn every(interval: Duration) -> Self {
        Self { interval, max_cycles: None }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::every(config.poll_interval())
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Supplies the location for each cycle. `Ok(None)` ends the loop.
#[async_trait]
pub trait LocationSource: Send {
    async fn next_location(&mut self) -> Result<Option<String>>;
}

/// Polls the same location every cycle.
#[derive(Debug, Clone)]
pub struct FixedLocation(String);

impl FixedLocation {
    pub fn new(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            anyhow::bail!("Location cannot be empty");
        }
        Ok(Self(location.to_string()))
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn next_location(&mut self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

/// Outcome of one fetch cycle, rendered with `Display`.
#[derive(Debug)]
pub enum CycleReport {
    Weather {
        location: String,
        reading: WeatherReading,
        climate: (f64, f64),
        recommendation: Recommendation,
        /// Why the recommendation fell back, if it did.
        recommendation_error: Option<FetchError>,
    },
    Unavailable {
        location: String,
        error: Option<FetchError>,
    },
}

impl CycleReport {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            CycleReport::Weather { recommendation, .. } => Some(recommendation),
            CycleReport::Unavailable { .. } => None,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleReport::Weather {
                location,
                reading,
                climate: (temperature, humidity),
                recommendation,
                recommendation_error,
            } => {
                write!(f, "\nWeather data for {location}")?;
                if let Some(name) = reading.location_name.as_deref().filter(|n| *n != location.as_str()) {
                    write!(f, " ({name})")?;
                }
                if let Some(at) = reading.observed_at {
                    write!(f, " at {}", at.format("%Y-%m-%d %H:%M UTC"))?;
                }
                writeln!(f, ":")?;
                writeln!(f, "Temperature: {temperature}°C")?;
                writeln!(f, "Humidity: {humidity}%")?;
                writeln!(f, "Rainfall: {} mm/hr", reading.rainfall)?;
                if let Some(err) = recommendation_error {
                    writeln!(f, "\nError fetching AI crop recommendations: {err}")?;
                }
                writeln!(f, "\nAI Crop Recommendations:")?;
                writeln!(f, "{recommendation}")
            }
            CycleReport::Unavailable { error, .. } => {
                if let Some(err) = error {
                    writeln!(f, "Failed to fetch weather data: {err}")?;
                }
                writeln!(f, "Could not fetch valid weather data.")
            }
        }
    }
}

pub struct PollingLoop {
    weather: Box<dyn WeatherProvider>,
    recommender: Box<dyn RecommendationProvider>,
    sleeper: Box<dyn Sleeper>,
    schedule: Schedule,
}

impl PollingLoop {
    pub fn new(
        weather: Box<dyn WeatherProvider>,
        recommender: Box<dyn RecommendationProvider>,
        schedule: Schedule,
    ) -> Self {
        Self { weather, recommender, sleeper: Box::new(TokioSleeper), schedule }
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fetch weather, then a recommendation only if temperature and humidity are both known.
    pub async fn run_cycle(&self, location: &str) -> CycleReport {
        let reading = match self.weather.current(location).await {
            Ok(reading) => reading,
            Err(err) => {
                return CycleReport::Unavailable { location: location.to_string(), error: Some(err) };
            }
        };

        let Some((temperature, humidity)) = reading.climate() else {
            tracing::info!(location, "weather response lacked temperature or humidity");
            return CycleReport::Unavailable { location: location.to_string(), error: None };
        };

        let request = RecommendationRequest { location: location.to_string(), temperature, humidity };
        let (recommendation, recommendation_error) = match self.recommender.recommend(&request).await {
            Ok(text) => (Recommendation::Generated(text), None),
            Err(err) => (Recommendation::Fallback, Some(err)),
        };

        CycleReport::Weather {
            location: location.to_string(),
            reading,
            climate: (temperature, humidity),
            recommendation,
            recommendation_error,
        }
    }

    /// Poll until the source runs dry, the schedule's cycle bound is hit, or `shutdown` resolves.
    pub async fn run<S, W, F>(&self, source: &mut S, out: &mut W, shutdown: F) -> Result<()>
    where
        S: LocationSource + ?Sized,
        W: Write,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let outcome = tokio::select! {
            res = self.drive(&mut *source, &mut *out) => res,
            () = &mut shutdown => {
                tracing::debug!("shutdown requested");
                Ok(())
            }
        };

        writeln!(out, "\nStopping monitoring.")?;
        out.flush()?;
        outcome
    }

    fn cycles_exhausted(&self, cycles: usize) -> bool {
        self.schedule.max_cycles.is_some_and(|max| cycles >= max)
    }

    async fn drive<S, W>(&self, source: &mut S, out: &mut W) -> Result<()>
    where
        S: LocationSource + ?Sized,
        W: Write,
    {
        let mut cycles = 0usize;

        loop {
            if self.cycles_exhausted(cycles) {
                out.flush()?;
                return Ok(());
            }

            let Some(location) = source.next_location().await? else {
                return Ok(());
            };
            let location = location.trim();
            if location.is_empty() {
                // Hand control back so a pending shutdown is still observed.
                tokio::task::yield_now().await;
                continue;
            }

            writeln!(out, "\nFetching weather data...")?;
            out.flush()?;

            let report = self.run_cycle(location).await;
            write!(out, "{report}")?;

            cycles += 1;
            if self.cycles_exhausted(cycles) {
                out.flush()?;
                return Ok(());
            }

            writeln!(out, "\n--- Refreshing in {} seconds ---", self.schedule.interval.as_secs())?;
            out.flush()?;

            self.sleeper.sleep(self.schedule.interval).await;
        }
    }
}
