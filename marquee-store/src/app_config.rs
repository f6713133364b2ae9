use serde::Deserialize;
use std::env;
use std::time::Duration;
use marquee_core::HoldSettings;
use crate::retry::RetryStrategy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub retry: RetryStrategy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub seat_hold_seconds: u64,
    #[serde(default = "default_min_wait_millis")]
    pub min_wait_millis: u64,
    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,
}

fn default_min_wait_millis() -> u64 { 1000 }
fn default_intake_capacity() -> usize { 1024 }

impl BusinessRules {
    pub fn hold_settings(&self) -> HoldSettings {
        HoldSettings {
            grace: Duration::from_secs(self.seat_hold_seconds),
            min_wait: Duration::from_millis(self.min_wait_millis),
            intake_capacity: self.intake_capacity,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `MARQUEE__BUSINESS_RULES__SEAT_HOLD_SECONDS=30`
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
