use crate::application::display_controller::{ControllerSettings, clamp_interval};
use crate::domain::airport::{AirportCode, InvalidAirportCode};
use crate::infrastructure::avwx_source::DEFAULT_BASE_URL;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no airport configured; pass an ICAO code such as KJFK")]
    MissingAirport,
    #[error(transparent)]
    InvalidAirport(#[from] InvalidAirportCode),
    #[error("{field} must be between {min} and {max}, got {value}")]
    InvalidNumericRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Raw configuration as layered from defaults, file, environment and CLI.
#[derive(Debug, Deserialize, Clone)]
pub struct HudConfig {
    pub airport: Option<String>,
    pub api_token: Option<String>,
    pub api_base_url: String,
    pub width: u32,
    pub height: u32,
    pub brightness: u32,
    pub update_interval: u64,
    pub mode_interval: u64,
    pub demo_interval: u64,
    pub frame_rate: u32,
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub airport: Option<String>,
    pub api_token: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub brightness: Option<u32>,
    pub update_interval: Option<u64>,
}

/// Validated settings ready to wire into the application.
#[derive(Debug, Clone)]
pub struct HudSettings {
    pub airport: AirportCode,
    pub api_token: Option<String>,
    pub api_base_url: String,
    pub width: u16,
    pub height: u16,
    pub brightness: u8,
    pub update_interval: Duration,
    pub mode_interval: Duration,
    pub demo_interval: Duration,
    pub frame_rate: u32,
}

impl HudSettings {
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings::new(self.airport.clone())
            .with_update_interval(self.update_interval)
            .with_mode_alternation(self.mode_interval)
            .with_demo_rotation(self.demo_interval)
    }
}

/// `HUD_`-prefixed variables, e.g. `HUD_API_TOKEN` or `HUD_MODE_INTERVAL`.
fn hud_environment() -> config::Environment {
    config::Environment::with_prefix("HUD").try_parsing(true)
}

pub fn load_hud_config(path: &Path, overrides: &ConfigOverrides) -> Result<HudConfig, ConfigError> {
    load_layers(path, hud_environment(), overrides)
}

fn load_layers(
    path: &Path,
    environment: config::Environment,
    overrides: &ConfigOverrides,
) -> Result<HudConfig, ConfigError> {
    let settings = config::Config::builder()
        .set_default("api_base_url", DEFAULT_BASE_URL)?
        .set_default("width", 64)?
        .set_default("height", 32)?
        .set_default("brightness", 75)?
        .set_default("update_interval", 300)?
        .set_default("mode_interval", 10)?
        .set_default("demo_interval", 30)?
        .set_default("frame_rate", 30)?
        .add_source(config::File::from(path).required(false))
        .add_source(environment)
        .set_override_option("airport", overrides.airport.clone())?
        .set_override_option("api_token", overrides.api_token.clone())?
        .set_override_option("width", overrides.width.map(i64::from))?
        .set_override_option("height", overrides.height.map(i64::from))?
        .set_override_option("brightness", overrides.brightness.map(i64::from))?
        .set_override_option("update_interval", overrides.update_interval.map(saturating_i64))?
        .build()?;

    Ok(settings.try_deserialize()?)
}

impl HudConfig {
    pub fn into_settings(self) -> Result<HudSettings, ConfigError> {
        let airport = match self.airport.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => AirportCode::parse(code)?,
            _ => return Err(ConfigError::MissingAirport),
        };
        let width = check_range("width", self.width.into(), 8, 256)? as u16;
        let height = check_range("height", self.height.into(), 8, 256)? as u16;
        let brightness = check_range("brightness", self.brightness.into(), 0, 100)? as u8;
        let frame_rate = check_range("frame_rate", self.frame_rate.into(), 1, 120)? as u32;

        let api_token = self.api_token.filter(|token| !token.trim().is_empty());
        if api_token.is_none() {
            tracing::warn!("No AVWX API token configured, showing demo weather");
        }

        Ok(HudSettings {
            airport,
            api_token,
            api_base_url: self.api_base_url,
            width,
            height,
            brightness,
            update_interval: interval("update_interval", self.update_interval),
            mode_interval: interval("mode_interval", self.mode_interval),
            demo_interval: interval("demo_interval", self.demo_interval),
            frame_rate,
        })
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<u64, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidNumericRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn interval(field: &str, secs: u64) -> Duration {
    let requested = Duration::from_secs(secs);
    let clamped = clamp_interval(requested);
    if clamped != requested {
        tracing::warn!("{} of {}s is too short, using {}s", field, secs, clamped.as_secs());
    }
    clamped
}
