// Airport identifier domain model
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Four-character ICAO station identifier, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AirportCode(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("airport code must be a 4-character ICAO identifier, got {0:?}")]
pub struct InvalidAirportCode(pub String);

impl AirportCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidAirportCode> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(code))
        } else {
            Err(InvalidAirportCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AirportCode {
    type Err = InvalidAirportCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
