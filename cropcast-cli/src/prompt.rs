use anyhow::{Context, Result};
use async_trait::async_trait;
use cropcast_core::LocationSource;
use inquire::{InquireError, Text};

/// Asks the operator for a location before every cycle.
#[derive(Debug, Default)]
pub struct InteractiveLocation;

#[async_trait]
impl LocationSource for InteractiveLocation {
    async fn next_location(&mut self) -> Result<Option<String>> {
        tokio::task::spawn_blocking(read_location)
            .await
            .context("Location prompt task failed")?
    }
}

fn read_location() -> Result<Option<String>> {
    let answer = Text::new("Enter location (e.g., Seoul, New York):")
        .with_validator(inquire::required!("Location cannot be empty"))
        .prompt();

    match answer {
        Ok(location) => Ok(Some(location)),
        Err(InquireError::OperationInterrupted | InquireError::OperationCanceled) => Ok(None),
        Err(err) => Err(err).context("Failed to read location"),
    }
}

/// Masked prompt for a provider API key.
pub fn read_api_key(provider: &str) -> Result<String> {
    inquire::Password::new(&format!("API key for {provider}:"))
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .with_validator(inquire::required!("API key cannot be empty"))
        .prompt()
        .context("Failed to read API key")
}
