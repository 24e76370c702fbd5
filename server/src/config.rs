use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
#[error("Invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    key: &'static str,
    value: String,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub resources_file: PathBuf,
    pub feedback_file: PathBuf,
}

impl Config {
    /// Reads the process environment. A `.env` file is honoured when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "5002")?,
            resources_file: try_load("RESOURCES_FILE", "data/resources.json")?,
            feedback_file: try_load("FEEDBACK_FILE", "data/feedback.json")?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError {
        key,
        reason: e.to_string(),
        value,
    })
}
