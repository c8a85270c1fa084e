// Demo weather source - Canned scenarios used when no live data is available
use crate::application::weather_source::{FetchError, WeatherSource};
use crate::domain::airport::AirportCode;
use crate::domain::weather::{CloudCoverage, CloudLayer, Observation, WeatherSnapshot};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Scenario {
    temperature_c: i32,
    dewpoint_c: i32,
    wind_speed_kt: u32,
    wind_direction_deg: u16,
    visibility_sm: f64,
    altimeter_inhg: f64,
    clouds: &'static [(CloudCoverage, u32)],
    phenomena: &'static [&'static str],
}

const SCENARIOS: [Scenario; 5] = [
    // VFR, clear
    Scenario {
        temperature_c: 22,
        dewpoint_c: 14,
        wind_speed_kt: 8,
        wind_direction_deg: 270,
        visibility_sm: 10.0,
        altimeter_inhg: 30.12,
        clouds: &[(CloudCoverage::Few, 5000)],
        phenomena: &[],
    },
    // MVFR, mist
    Scenario {
        temperature_c: 15,
        dewpoint_c: 12,
        wind_speed_kt: 12,
        wind_direction_deg: 180,
        visibility_sm: 5.0,
        altimeter_inhg: 29.92,
        clouds: &[(CloudCoverage::Broken, 2500)],
        phenomena: &["BR"],
    },
    // IFR, rain
    Scenario {
        temperature_c: 8,
        dewpoint_c: 7,
        wind_speed_kt: 18,
        wind_direction_deg: 90,
        visibility_sm: 2.0,
        altimeter_inhg: 29.75,
        clouds: &[(CloudCoverage::Overcast, 1200)],
        phenomena: &["RA"],
    },
    // VFR, thunderstorm
    Scenario {
        temperature_c: 27,
        dewpoint_c: 21,
        wind_speed_kt: 16,
        wind_direction_deg: 230,
        visibility_sm: 7.0,
        altimeter_inhg: 29.85,
        clouds: &[(CloudCoverage::Scattered, 4000), (CloudCoverage::Broken, 8000)],
        phenomena: &["+TSRA"],
    },
    // LIFR, snow
    Scenario {
        temperature_c: -2,
        dewpoint_c: -4,
        wind_speed_kt: 15,
        wind_direction_deg: 360,
        visibility_sm: 0.5,
        altimeter_inhg: 30.05,
        clouds: &[(CloudCoverage::Overcast, 400)],
        phenomena: &["SN"],
    },
];

/// Deterministic rotation of synthetic observations. Never fails and never touches the network.
///
/// Callers that track their own rotation use [`DemoSource::scenario`]; as a
/// [`WeatherSource`] each fetch returns the next scenario in turn.
#[derive(Debug, Default)]
pub struct DemoSource {
    cursor: AtomicUsize,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenario_count(&self) -> usize {
        SCENARIOS.len()
    }

    /// Scenario at `index` (wrapped), stamped with the configured airport.
    pub fn scenario(&self, index: usize, airport: &AirportCode) -> WeatherSnapshot {
        let scenario = &SCENARIOS[index % SCENARIOS.len()];
        let observation = Observation {
            temperature_c: Some(scenario.temperature_c),
            dewpoint_c: Some(scenario.dewpoint_c),
            wind_speed_kt: Some(scenario.wind_speed_kt),
            wind_direction_deg: Some(scenario.wind_direction_deg),
            visibility_sm: Some(scenario.visibility_sm),
            altimeter_inhg: Some(scenario.altimeter_inhg),
            cloud_layers: scenario
                .clouds
                .iter()
                .map(|&(coverage, altitude_ft)| CloudLayer::new(coverage, altitude_ft))
                .collect(),
            phenomena: scenario.phenomena.iter().map(|p| p.to_string()).collect(),
            observed_at: None,
        };
        WeatherSnapshot::new(airport.clone(), observation, true)
    }
}

#[async_trait]
impl WeatherSource for DemoSource {
    async fn fetch(&self, airport: &AirportCode) -> Result<WeatherSnapshot, FetchError> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Serving demo scenario {} for {}", index % SCENARIOS.len(), airport);
        Ok(self.scenario(index, airport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weather::{FlightRules, WeatherCondition};
    use std::collections::HashSet;

    #[test]
    fn test_scenarios_cover_categories_and_conditions() {
        let demo = DemoSource::new();
        let airport = AirportCode::parse("EGLL").unwrap();
        let snapshots: Vec<WeatherSnapshot> = (0..demo.scenario_count())
            .map(|i| demo.scenario(i, &airport))
            .collect();

        let rules: HashSet<FlightRules> = snapshots.iter().map(|s| s.flight_rules()).collect();
        let conditions: HashSet<WeatherCondition> =
            snapshots.iter().map(|s| s.weather_condition()).collect();

        assert_eq!(demo.scenario_count(), 5);
        assert_eq!(rules.len(), 4);
        assert!(conditions.len() >= 4);
        assert!(snapshots.iter().all(|s| s.is_demo()));
        assert!(snapshots.iter().all(|s| s.airport().as_str() == "EGLL"));
    }

    #[test]
    fn test_scenario_classification() {
        let demo = DemoSource::new();
        let airport = AirportCode::parse("KJFK").unwrap();
        let expected = [
            (FlightRules::Vfr, WeatherCondition::Clear),
            (FlightRules::Mvfr, WeatherCondition::Fog),
            (FlightRules::Ifr, WeatherCondition::Rain),
            (FlightRules::Vfr, WeatherCondition::Thunderstorm),
            (FlightRules::Lifr, WeatherCondition::Snow),
        ];
        for (i, (rules, condition)) in expected.into_iter().enumerate() {
            let snapshot = demo.scenario(i, &airport);
            assert_eq!(snapshot.flight_rules(), rules, "scenario {}", i);
            assert_eq!(snapshot.weather_condition(), condition, "scenario {}", i);
        }
    }

    #[test]
    fn test_scenarios_are_deterministic_and_wrap() {
        let demo = DemoSource::new();
        let airport = AirportCode::parse("KSFO").unwrap();
        assert_eq!(demo.scenario(2, &airport), demo.scenario(2, &airport));
        assert_eq!(demo.scenario(5, &airport), demo.scenario(0, &airport));
    }

    #[tokio::test]
    async fn test_fetch_rotates_through_scenarios() {
        let demo = DemoSource::new();
        let airport = AirportCode::parse("KDEN").unwrap();

        let mut fetched = Vec::new();
        for _ in 0..demo.scenario_count() + 1 {
            fetched.push(demo.fetch(&airport).await.unwrap());
        }

        for (i, snapshot) in fetched.iter().enumerate() {
            assert_eq!(snapshot, &demo.scenario(i, &airport));
            assert!(snapshot.is_demo());
        }
        assert_eq!(fetched[demo.scenario_count()], fetched[0]);
    }
}
