//! Typed configuration from environment variables and TOML.
//!
//! Loads once at startup and fails fast on malformed values. Every
//! variable is optional; anything unset falls back to the defaults of
//! the classic demo (2 producers, 3 consumers, 5 items each).

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::DelayRange;

#[derive(Debug)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub sim: SimConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let mut sim = SimConfig::default();
        if let Some(n) = parsed_var("ASYNCQ_PRODUCERS")? {
            sim.producers = n;
        }
        if let Some(n) = parsed_var("ASYNCQ_CONSUMERS")? {
            sim.consumers = n;
        }
        if let Some(n) = parsed_var("ASYNCQ_ITEMS_PER_PRODUCER")? {
            sim.items_per_producer = n;
        }
        if let Some(n) = parsed_var("ASYNCQ_QUEUE_CAPACITY")? {
            sim.queue_capacity = n;
        }

        Ok(Self {
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            sim,
        })
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Shape of one producer/consumer simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: u32,
    /// 0 = unbounded.
    pub queue_capacity: usize,
    /// Pause before each put.
    pub produce_delay: DelayRange,
    /// Simulated processing time per item.
    pub process_delay: DelayRange,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            consumers: 3,
            items_per_producer: 5,
            queue_capacity: 0,
            produce_delay: DelayRange::new(100, 500),
            process_delay: DelayRange::new(200, 400),
        }
    }
}

impl SimConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimConfig =
            toml::from_str(s).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Without at least one consumer nothing would drain the queue and the
    /// completion barrier would never return.
    pub fn validate(&self) -> Result<()> {
        if self.consumers == 0 {
            return Err(Error::Config("at least one consumer is required".into()));
        }
        self.produce_delay.validate("produce_delay")?;
        self.process_delay.validate("process_delay")?;
        Ok(())
    }
}
