use std::{io, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use cropcast_core::{
    Config, FixedLocation, LocationSource, PollingLoop, ProviderId, Schedule,
    providers_from_config,
};

use crate::prompt::{InteractiveLocation, read_api_key};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cropcast", version, about = "Weather-driven crop recommendations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider ("tomorrow" or "gemini").
    Configure {
        provider: String,
    },

    /// Poll weather and recommendations until interrupted.
    Watch {
        /// Poll this location every cycle instead of prompting.
        #[arg(long, value_parser = non_blank)]
        location: Option<String>,

        /// Seconds between cycles; defaults to the configured interval.
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<usize>,
    },

    /// Run a single cycle for a location.
    Show {
        #[arg(value_parser = non_blank)]
        location: String,
    },

    /// Print the config file location.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                let mut config = Config::load()?;

                let api_key = read_api_key(id.as_str())?;
                config.upsert_provider_api_key(id, api_key.trim().to_string());

                let path = config.save()?;
                println!("Saved {id} credentials to {}", path.display());
            }
            Command::Watch { location, interval, cycles } => {
                let config = Config::load()?;

                let mut schedule = Schedule::from_config(&config);
                if let Some(secs) = interval {
                    schedule.interval = Duration::from_secs(secs);
                }
                schedule.max_cycles = cycles;

                let mut source: Box<dyn LocationSource> = match location {
                    Some(location) => Box::new(FixedLocation::new(&location)?),
                    None => Box::new(InteractiveLocation),
                };

                watch(&config, schedule, source.as_mut()).await?;
            }
            Command::Show { location } => {
                let config = Config::load()?;
                let schedule = Schedule::from_config(&config).with_max_cycles(1);

                watch(&config, schedule, &mut FixedLocation::new(&location)?).await?;
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
            }
        }

        Ok(())
    }
}

fn non_blank(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("location cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

async fn watch(
    config: &Config,
    schedule: Schedule,
    source: &mut dyn LocationSource,
) -> anyhow::Result<()> {
    let (weather, recommender) = providers_from_config(config)?;
    let polling = PollingLoop::new(weather, recommender, schedule);

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let mut stdout = io::stdout().lock();
    polling
        .run(source, &mut stdout, shutdown)
        .await
        .context("Polling loop failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_locations_are_rejected() {
        assert!(Cli::try_parse_from(["cropcast", "show", "   "]).is_err());
        assert!(Cli::try_parse_from(["cropcast", "watch", "--location", ""]).is_err());
    }

    #[test]
    fn locations_are_trimmed() {
        let cli = Cli::try_parse_from(["cropcast", "watch", "--location", " Seoul ", "--cycles", "0"])
            .expect("valid arguments");

        match cli.command {
            Command::Watch { location, cycles, .. } => {
                assert_eq!(location.as_deref(), Some("Seoul"));
                assert_eq!(cycles, Some(0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
