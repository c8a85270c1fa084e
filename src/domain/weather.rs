// Weather observation domain models
use super::airport::AirportCode;
use chrono::{DateTime, Utc};

/// Flight category, ordered from best to worst conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlightRules {
    Vfr,
    Mvfr,
    Ifr,
    Lifr,
}

impl FlightRules {
    pub fn label(&self) -> &'static str {
        match self {
            FlightRules::Vfr => "VFR",
            FlightRules::Mvfr => "MVFR",
            FlightRules::Ifr => "IFR",
            FlightRules::Lifr => "LIFR",
        }
    }

    fn from_ceiling(ceiling_ft: Option<u32>) -> Self {
        match ceiling_ft {
            None => FlightRules::Vfr,
            Some(ft) if ft >= 3000 => FlightRules::Vfr,
            Some(ft) if ft >= 1000 => FlightRules::Mvfr,
            Some(ft) if ft >= 500 => FlightRules::Ifr,
            Some(_) => FlightRules::Lifr,
        }
    }

    fn from_visibility(visibility_sm: Option<f64>) -> Self {
        match visibility_sm {
            Some(sm) if sm < 1.0 => FlightRules::Lifr,
            Some(sm) if sm < 3.0 => FlightRules::Ifr,
            Some(sm) if sm < 5.0 => FlightRules::Mvfr,
            _ => FlightRules::Vfr,
        }
    }
}

/// Classify a ceiling/visibility pair. The more restrictive of the two wins;
/// a missing value is treated as unlimited.
pub fn derive_flight_rules(ceiling_ft: Option<u32>, visibility_sm: Option<f64>) -> FlightRules {
    FlightRules::from_ceiling(ceiling_ft).max(FlightRules::from_visibility(visibility_sm))
}

/// Dominant weather condition, ordered by display precedence (last wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Fog,
    Rain,
    Snow,
    Thunderstorm,
}

impl WeatherCondition {
    /// Map a METAR present-weather group (e.g. `-RA`, `+TSRA`, `BR`) to a condition.
    pub fn from_phenomenon(code: &str) -> Option<Self> {
        let code = code.to_ascii_uppercase();
        if code.contains("TS") {
            Some(WeatherCondition::Thunderstorm)
        } else if ["SN", "SG", "PL", "GS"].iter().any(|c| code.contains(c)) {
            Some(WeatherCondition::Snow)
        } else if ["RA", "DZ", "SH"].iter().any(|c| code.contains(c)) {
            Some(WeatherCondition::Rain)
        } else if ["FG", "BR", "HZ"].iter().any(|c| code.contains(c)) {
            Some(WeatherCondition::Fog)
        } else {
            None
        }
    }
}

fn derive_condition(
    phenomena: &[String],
    ceiling_ft: Option<u32>,
    flight_rules: FlightRules,
) -> WeatherCondition {
    let fallback = if ceiling_ft.is_some() || flight_rules != FlightRules::Vfr {
        WeatherCondition::Cloudy
    } else {
        WeatherCondition::Clear
    };

    phenomena
        .iter()
        .filter_map(|code| WeatherCondition::from_phenomenon(code))
        .max()
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudCoverage {
    Few,
    Scattered,
    Broken,
    Overcast,
    VerticalVisibility,
}

impl CloudCoverage {
    /// Parse a METAR sky-cover code. Clear-sky codes (`SKC`, `CLR`, `NSC`) are not layers.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "FEW" => Some(CloudCoverage::Few),
            "SCT" => Some(CloudCoverage::Scattered),
            "BKN" => Some(CloudCoverage::Broken),
            "OVC" => Some(CloudCoverage::Overcast),
            "VV" => Some(CloudCoverage::VerticalVisibility),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CloudCoverage::Few => "FEW",
            CloudCoverage::Scattered => "SCT",
            CloudCoverage::Broken => "BKN",
            CloudCoverage::Overcast => "OVC",
            CloudCoverage::VerticalVisibility => "VV",
        }
    }

    pub fn forms_ceiling(&self) -> bool {
        matches!(
            self,
            CloudCoverage::Broken | CloudCoverage::Overcast | CloudCoverage::VerticalVisibility
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloudLayer {
    pub coverage: CloudCoverage,
    pub altitude_ft: u32,
}

impl CloudLayer {
    pub fn new(coverage: CloudCoverage, altitude_ft: u32) -> Self {
        Self {
            coverage,
            altitude_ft,
        }
    }
}

/// Raw observation values as reported by a weather source, before classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub temperature_c: Option<i32>,
    pub dewpoint_c: Option<i32>,
    pub wind_speed_kt: Option<u32>,
    pub wind_direction_deg: Option<u16>,
    pub visibility_sm: Option<f64>,
    pub altimeter_inhg: Option<f64>,
    pub cloud_layers: Vec<CloudLayer>,
    pub phenomena: Vec<String>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// One classified weather observation. Immutable once built; sources replace it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    airport: AirportCode,
    temperature_c: Option<i32>,
    dewpoint_c: Option<i32>,
    wind_speed_kt: Option<u32>,
    wind_direction_deg: Option<u16>,
    visibility_sm: Option<f64>,
    altimeter_inhg: Option<f64>,
    cloud_layers: Vec<CloudLayer>,
    observed_at: Option<DateTime<Utc>>,
    flight_rules: FlightRules,
    weather_condition: WeatherCondition,
    is_demo: bool,
}

impl WeatherSnapshot {
    pub fn new(airport: AirportCode, observation: Observation, is_demo: bool) -> Self {
        let mut cloud_layers = observation.cloud_layers;
        cloud_layers.sort_by_key(|layer| layer.altitude_ft);

        let ceiling_ft = ceiling_of(&cloud_layers);
        let flight_rules = derive_flight_rules(ceiling_ft, observation.visibility_sm);
        let weather_condition = derive_condition(&observation.phenomena, ceiling_ft, flight_rules);

        Self {
            airport,
            temperature_c: observation.temperature_c,
            dewpoint_c: observation.dewpoint_c,
            wind_speed_kt: observation.wind_speed_kt,
            wind_direction_deg: observation.wind_direction_deg.map(|deg| deg % 360),
            visibility_sm: observation.visibility_sm,
            altimeter_inhg: observation.altimeter_inhg,
            cloud_layers,
            observed_at: observation.observed_at,
            flight_rules,
            weather_condition,
            is_demo,
        }
    }

    pub fn airport(&self) -> &AirportCode {
        &self.airport
    }

    pub fn temperature_c(&self) -> Option<i32> {
        self.temperature_c
    }

    pub fn dewpoint_c(&self) -> Option<i32> {
        self.dewpoint_c
    }

    pub fn wind_speed_kt(&self) -> Option<u32> {
        self.wind_speed_kt
    }

    /// `None` means variable or calm.
    pub fn wind_direction_deg(&self) -> Option<u16> {
        self.wind_direction_deg
    }

    pub fn visibility_sm(&self) -> Option<f64> {
        self.visibility_sm
    }

    pub fn altimeter_inhg(&self) -> Option<f64> {
        self.altimeter_inhg
    }

    /// Layers sorted lowest to highest.
    pub fn cloud_layers(&self) -> &[CloudLayer] {
        &self.cloud_layers
    }

    pub fn ceiling_ft(&self) -> Option<u32> {
        ceiling_of(&self.cloud_layers)
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }

    pub fn flight_rules(&self) -> FlightRules {
        self.flight_rules
    }

    pub fn weather_condition(&self) -> WeatherCondition {
        self.weather_condition
    }

    pub fn is_demo(&self) -> bool {
        self.is_demo
    }
}

fn ceiling_of(layers: &[CloudLayer]) -> Option<u32> {
    layers
        .iter()
        .filter(|layer| layer.coverage.forms_ceiling())
        .map(|layer| layer.altitude_ft)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kjfk() -> AirportCode {
        AirportCode::parse("KJFK").unwrap()
    }

    #[test]
    fn test_flight_rules_thresholds() {
        assert_eq!(derive_flight_rules(None, None), FlightRules::Vfr);
        assert_eq!(derive_flight_rules(Some(3000), Some(5.0)), FlightRules::Vfr);
        assert_eq!(derive_flight_rules(Some(2999), Some(10.0)), FlightRules::Mvfr);
        assert_eq!(derive_flight_rules(Some(1000), Some(3.0)), FlightRules::Mvfr);
        assert_eq!(derive_flight_rules(Some(999), None), FlightRules::Ifr);
        assert_eq!(derive_flight_rules(None, Some(1.0)), FlightRules::Ifr);
        assert_eq!(derive_flight_rules(Some(499), Some(10.0)), FlightRules::Lifr);
        assert_eq!(derive_flight_rules(None, Some(0.25)), FlightRules::Lifr);
    }

    #[test]
    fn test_flight_rules_worst_component_wins() {
        assert_eq!(derive_flight_rules(Some(8000), Some(2.0)), FlightRules::Ifr);
        assert_eq!(derive_flight_rules(Some(400), Some(10.0)), FlightRules::Lifr);
    }

    #[test]
    fn test_flight_rules_monotonic() {
        let ceilings: Vec<Option<u32>> = std::iter::once(None)
            .chain((0..=60).rev().map(|h| Some(h * 100)))
            .collect();
        let visibilities: Vec<Option<f64>> = std::iter::once(None)
            .chain((0..=40).rev().map(|q| Some(q as f64 * 0.25)))
            .collect();

        // Each list runs from least to most restrictive; the category may only worsen.
        for vis in &visibilities {
            for pair in ceilings.windows(2) {
                assert!(derive_flight_rules(pair[1], *vis) >= derive_flight_rules(pair[0], *vis));
            }
        }
        for ceiling in &ceilings {
            for pair in visibilities.windows(2) {
                assert!(
                    derive_flight_rules(*ceiling, pair[1]) >= derive_flight_rules(*ceiling, pair[0])
                );
            }
        }
    }

    #[test]
    fn test_condition_precedence() {
        let obs = Observation {
            phenomena: vec!["BR".into(), "-RA".into(), "TS".into(), "SN".into()],
            ..Default::default()
        };
        let snapshot = WeatherSnapshot::new(kjfk(), obs, false);
        assert_eq!(snapshot.weather_condition(), WeatherCondition::Thunderstorm);

        let obs = Observation {
            phenomena: vec!["BR".into(), "-SHRA".into()],
            ..Default::default()
        };
        let snapshot = WeatherSnapshot::new(kjfk(), obs, false);
        assert_eq!(snapshot.weather_condition(), WeatherCondition::Rain);
    }

    #[test]
    fn test_condition_without_phenomena() {
        let clear = WeatherSnapshot::new(kjfk(), Observation::default(), false);
        assert_eq!(clear.weather_condition(), WeatherCondition::Clear);

        let obs = Observation {
            cloud_layers: vec![CloudLayer::new(CloudCoverage::Overcast, 4500)],
            ..Default::default()
        };
        let overcast = WeatherSnapshot::new(kjfk(), obs, false);
        assert_eq!(overcast.flight_rules(), FlightRules::Vfr);
        assert_eq!(overcast.weather_condition(), WeatherCondition::Cloudy);

        let obs = Observation {
            visibility_sm: Some(2.0),
            phenomena: vec!["VCSQ".into()],
            ..Default::default()
        };
        let hazy = WeatherSnapshot::new(kjfk(), obs, false);
        assert_eq!(hazy.weather_condition(), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_snapshot_sorts_layers_and_finds_ceiling() {
        let obs = Observation {
            cloud_layers: vec![
                CloudLayer::new(CloudCoverage::Overcast, 9000),
                CloudLayer::new(CloudCoverage::Few, 1500),
                CloudLayer::new(CloudCoverage::Broken, 2200),
            ],
            visibility_sm: Some(10.0),
            wind_direction_deg: Some(360),
            ..Default::default()
        };
        let snapshot = WeatherSnapshot::new(kjfk(), obs, false);

        let altitudes: Vec<u32> = snapshot.cloud_layers().iter().map(|l| l.altitude_ft).collect();
        assert_eq!(altitudes, vec![1500, 2200, 9000]);
        assert_eq!(snapshot.ceiling_ft(), Some(2200));
        assert_eq!(snapshot.flight_rules(), FlightRules::Mvfr);
        assert_eq!(snapshot.wind_direction_deg(), Some(0));
    }

    #[test]
    fn test_cloud_coverage_codes() {
        assert_eq!(CloudCoverage::from_code("bkn"), Some(CloudCoverage::Broken));
        assert_eq!(CloudCoverage::from_code("CLR"), None);
        assert!(CloudCoverage::VerticalVisibility.forms_ceiling());
        assert!(!CloudCoverage::Scattered.forms_ceiling());
    }
}
