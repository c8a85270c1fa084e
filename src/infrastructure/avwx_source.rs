// AVWX weather source implementation
use crate::application::weather_source::{FetchError, WeatherSource};
use crate::domain::airport::AirportCode;
use crate::domain::weather::{CloudCoverage, CloudLayer, Observation, WeatherSnapshot};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://avwx.rest/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const METERS_PER_STATUTE_MILE: f64 = 1609.344;
const INHG_PER_HPA: f64 = 0.02953;
const KNOTS_PER_MPS: f64 = 1.943_844;
const KNOTS_PER_KPH: f64 = 0.539_957;

#[derive(Debug, Clone)]
pub struct AvwxSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MetarResponse {
    #[serde(default)]
    station: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    time: Option<ReportTime>,
    #[serde(default)]
    units: Units,
    #[serde(default)]
    temperature: Option<Number>,
    #[serde(default)]
    dewpoint: Option<Number>,
    #[serde(default)]
    wind_direction: Option<Number>,
    #[serde(default)]
    wind_speed: Option<Number>,
    #[serde(default)]
    visibility: Option<Number>,
    #[serde(default)]
    altimeter: Option<Number>,
    #[serde(default)]
    clouds: Vec<Cloud>,
    #[serde(default)]
    wx_codes: Vec<WxCode>,
}

#[derive(Debug, Deserialize)]
struct ReportTime {
    #[serde(default)]
    dt: Option<DateTime<Utc>>,
}

/// Numeric field; `value` is null for variable or unreported values.
#[derive(Debug, Deserialize)]
struct Number {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Units {
    #[serde(default = "default_visibility_unit")]
    visibility: String,
    #[serde(default = "default_altimeter_unit")]
    altimeter: String,
    #[serde(default = "default_temperature_unit")]
    temperature: String,
    #[serde(default = "default_wind_speed_unit")]
    wind_speed: String,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            visibility: default_visibility_unit(),
            altimeter: default_altimeter_unit(),
            temperature: default_temperature_unit(),
            wind_speed: default_wind_speed_unit(),
        }
    }
}

fn default_visibility_unit() -> String {
    "sm".to_string()
}

fn default_altimeter_unit() -> String {
    "inHg".to_string()
}

fn default_temperature_unit() -> String {
    "C".to_string()
}

fn default_wind_speed_unit() -> String {
    "kt".to_string()
}

#[derive(Debug, Deserialize)]
struct Cloud {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    /// Hundreds of feet above ground.
    #[serde(default)]
    altitude: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WxCode {
    repr: String,
}

impl AvwxSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn metar_url(&self, airport: &AirportCode) -> String {
        format!(
            "{}/metar/{}",
            self.base_url,
            urlencoding::encode(airport.as_str())
        )
    }
}

#[async_trait]
impl WeatherSource for AvwxSource {
    async fn fetch(&self, airport: &AirportCode) -> Result<WeatherSnapshot, FetchError> {
        let url = self.metar_url(airport);
        tracing::debug!("Requesting METAR from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::NetworkUnavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("AVWX returned {}: {}", status, body);
            return Err(classify_status(status, airport));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkUnavailable(e.to_string()))?;
        parse_metar(&body, airport)
    }
}

fn classify_status(status: StatusCode, airport: &AirportCode) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            FetchError::InvalidAirportCode(airport.to_string())
        }
        StatusCode::NO_CONTENT => FetchError::MalformedResponse("empty report".to_string()),
        other => FetchError::NetworkUnavailable(format!("HTTP {}", other)),
    }
}

fn parse_metar(body: &str, airport: &AirportCode) -> Result<WeatherSnapshot, FetchError> {
    let response: MetarResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(FetchError::MalformedResponse(error));
    }
    if response.station.is_none() {
        return Err(FetchError::MalformedResponse("report has no station".to_string()));
    }

    let observation = into_observation(response)?;
    Ok(WeatherSnapshot::new(airport.clone(), observation, false))
}

fn into_observation(response: MetarResponse) -> Result<Observation, FetchError> {
    let units = &response.units;
    let value = |field: &Option<Number>| field.as_ref().and_then(|n| n.value);

    let temperature_c = value(&response.temperature).map(|t| to_celsius(t, &units.temperature));
    let dewpoint_c = value(&response.dewpoint).map(|t| to_celsius(t, &units.temperature));
    let wind_speed_kt = value(&response.wind_speed).map(|s| to_knots(s, &units.wind_speed));
    let wind_direction_deg = value(&response.wind_direction)
        .filter(|d| *d >= 0.0)
        .map(|d| (d.round() as u32 % 360) as u16);
    let visibility_sm = value(&response.visibility).map(|v| {
        if units.visibility.eq_ignore_ascii_case("m") {
            v / METERS_PER_STATUTE_MILE
        } else {
            v
        }
    });
    let altimeter_inhg = value(&response.altimeter).map(|a| {
        if units.altimeter.eq_ignore_ascii_case("hPa") {
            a * INHG_PER_HPA
        } else {
            a
        }
    });

    let cloud_layers = into_cloud_layers(&response.clouds)?;

    Ok(Observation {
        temperature_c,
        dewpoint_c,
        wind_speed_kt,
        wind_direction_deg,
        visibility_sm,
        altimeter_inhg,
        cloud_layers,
        phenomena: response.wx_codes.into_iter().map(|wx| wx.repr).collect(),
        observed_at: response.time.and_then(|t| t.dt),
    })
}

/// Layers with an unknown cover code or no altitude are skipped; an altitude
/// that does not fit in feet rejects the whole report.
fn into_cloud_layers(clouds: &[Cloud]) -> Result<Vec<CloudLayer>, FetchError> {
    let mut layers = Vec::with_capacity(clouds.len());
    for cloud in clouds {
        let coverage = cloud.kind.as_deref().and_then(CloudCoverage::from_code);
        let (Some(coverage), Some(hundreds)) = (coverage, cloud.altitude) else {
            continue;
        };
        let altitude_ft = hundreds.checked_mul(100).ok_or_else(|| {
            FetchError::MalformedResponse(format!("cloud altitude {} out of range", hundreds))
        })?;
        layers.push(CloudLayer::new(coverage, altitude_ft));
    }
    Ok(layers)
}

fn to_celsius(value: f64, unit: &str) -> i32 {
    let celsius = if unit.eq_ignore_ascii_case("F") {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    };
    celsius.round() as i32
}

fn to_knots(value: f64, unit: &str) -> u32 {
    let knots = match unit {
        "m/s" => value * KNOTS_PER_MPS,
        "km/h" => value * KNOTS_PER_KPH,
        _ => value,
    };
    knots.max(0.0).round() as u32
}
