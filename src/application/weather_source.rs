// Weather source trait for observation data access
use crate::domain::airport::AirportCode;
use crate::domain::weather::WeatherSnapshot;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("weather service unreachable: {0}")]
    NetworkUnavailable(String),
    #[error("weather service rate limit reached")]
    RateLimited,
    #[error("weather service does not know airport {0}")]
    InvalidAirportCode(String),
    #[error("malformed weather response: {0}")]
    MalformedResponse(String),
    #[error("weather service rejected the API token")]
    Unauthorized,
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the latest observation for an airport.
    /// Implementations never retry; the caller owns the retry cadence.
    async fn fetch(&self, airport: &AirportCode) -> Result<WeatherSnapshot, FetchError>;
}
